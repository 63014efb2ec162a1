//! The foundational plugin framework for Keystone (Layer 1).
//!
//! `keystone_system` provides the primitives every extension builds on:
//!
//! - [`api`] - Capabilities plugins share through the server
//! - [`plugin`] - The extension trait and plugin groups
//! - [`server`] - Plugin lifecycle and API storage
//! - [`sorting`] - Deterministic dependency ordering with cycle reporting
//!
//! # Architecture
//!
//! - **Layer 1** (`keystone_system`): plugins, APIs, ordering (this crate)
//! - **Layer 2** (`keystone_event`): phase-ordered event dispatch
//! - **Layer 3** (plugins): extensions registering listeners
//!
//! # Example
//!
//! ```
//! use keystone_system::api::API;
//! use keystone_system::plugin::Plugin;
//! use keystone_system::server::Server;
//!
//! #[derive(Default)]
//! struct LootTablesAPI;
//! impl API for LootTablesAPI {}
//!
//! struct LootPlugin;
//!
//! impl Plugin for LootPlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_api(LootTablesAPI);
//!     }
//! }
//!
//! Server::new()
//!     .add_plugins(LootPlugin)
//!     .run();
//! ```

/// Shared capabilities.
pub mod api;

/// Extensions and plugin groups.
pub mod plugin;

/// Plugin lifecycle.
pub mod server;

/// Deterministic dependency ordering.
pub mod sorting;

/// Commonly used types.
pub mod prelude {
    pub use crate::api::API;
    pub use crate::plugin::{Plugin, PluginGroup, PluginGroupBuilder, PluginId, Plugins};
    pub use crate::server::{BuildError, Server};
    pub use crate::sorting::{DependencyGraph, SortedNodes};
}
