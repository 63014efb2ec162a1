//! Core infrastructure plugins for Keystone.
//!
//! - [`TracingPlugin`] - Logging via the `tracing` crate
//! - [`EventsPlugin`] - The event registry (re-exported from `keystone_event`)
//! - [`DefaultPlugins`] - Logging and events
//! - [`MinimalPlugins`] - Events only, for tests and embedding
//!
//! # Example
//!
//! ```
//! use keystone_core_plugins::DefaultPlugins;
//! use keystone_event::registry::EventsAPI;
//! use keystone_system::plugin::PluginGroup;
//! use keystone_system::server::Server;
//!
//! let mut server = Server::new();
//! server.add_plugins(DefaultPlugins.build());
//! server.finish();
//!
//! assert!(server.contains_api::<EventsAPI>());
//! ```
//!
//! # Individual Plugin Usage
//!
//! ```
//! use keystone_core_plugins::{EventsPlugin, TracingPlugin};
//! use keystone_system::server::Server;
//! use tracing::Level;
//!
//! Server::new()
//!     .add_plugins(TracingPlugin::default().with_level(Level::DEBUG))
//!     .add_plugins(EventsPlugin)
//!     .run();
//! ```

mod tracing_plugin;

pub use keystone_event::plugin::EventsPlugin;
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};

use keystone_system::plugin::{PluginGroup, PluginGroupBuilder};

/// Plugins most Keystone applications want.
///
/// Includes:
/// - [`TracingPlugin`] from `RUST_LOG`, added first so every later plugin's
///   `ready()` is logged
/// - [`EventsPlugin`]
///
/// # Customization
///
/// ```ignore
/// Server::new()
///     .add_plugins(
///         DefaultPlugins
///             .build()
///             .disable::<TracingPlugin>()
///     )
///     .run();
/// ```
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TracingPlugin::from_env())
            .add(EventsPlugin)
    }
}

/// Plugins for tests and hosts that install their own subscriber.
///
/// Includes only [`EventsPlugin`].
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new().add(EventsPlugin)
    }
}
