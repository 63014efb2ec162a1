//! Plugins: the unit of extension.
//!
//! Every extension that contributes listeners, phases or APIs to a
//! [`Server`] is a plugin. Plugins never call each other; they meet through
//! the APIs the server hosts, such as the event registry.
//!
//! ```
//! use keystone_system::plugin::{Plugin, PluginId};
//! use keystone_system::server::Server;
//!
//! struct TelemetryPlugin;
//! impl Plugin for TelemetryPlugin {
//!     fn build(&self, _server: &mut Server) {}
//! }
//!
//! struct WorldGenPlugin {
//!     seed: u64,
//! }
//!
//! impl Plugin for WorldGenPlugin {
//!     fn build(&self, _server: &mut Server) {
//!         // look up an API and register listeners here
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<TelemetryPlugin>()]
//!     }
//! }
//!
//! Server::new()
//!     .add_plugins(WorldGenPlugin { seed: 7 })
//!     .add_plugins(TelemetryPlugin)
//!     .run();
//! ```

use core::any::{TypeId, type_name};
use core::fmt;
use std::sync::Arc;

use crate::server::Server;

// ─────────────────────────────────────────────────────────────────────────────
// PluginId
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies a plugin by its concrete type.
///
/// Dependencies and group edits refer to plugins through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Returns the id of plugin type `P`.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
        }
    }

    /// The [`TypeId`] of the plugin type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The full path of the plugin type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

/// An extension that contributes to a [`Server`].
///
/// The server drives every plugin through three stages:
///
/// 1. `build()`, dependencies first
/// 2. `ready()`, once every plugin is built, in the same order
/// 3. `cleanup()`, in reverse
///
/// Plugins with no dependency between them keep the order they were added in.
///
/// ```ignore
/// pub struct FuelPlugin;
///
/// impl Plugin for FuelPlugin {
///     fn build(&self, server: &mut Server) {
///         let events = server.api::<EventsAPI>().expect("EventsAPI required");
///         events
///             .event::<FurnaceTick>()
///             .phase(&FUEL_PHASE)
///             .run_before(&DEFAULT_PHASE)
///             .register(Arc::new(|furnace: &mut Furnace| furnace.burn()));
///     }
///
///     fn dependencies(&self) -> Vec<PluginId> {
///         vec![PluginId::of::<EventsPlugin>()]
///     }
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Inserts APIs, registers listeners and phase orderings, or adds more
    /// plugins. Plugins added here are built right away.
    fn build(&self, server: &mut Server);

    /// Runs after every plugin is built.
    ///
    /// Every listener is registered by now, so this is the place to inspect
    /// the final configuration.
    fn ready(&self, _server: &mut Server) {}

    /// Runs at shutdown. Dependents clean up before their dependencies.
    fn cleanup(&self, _server: &mut Server) {}

    /// Name used in logs and errors. Defaults to the type name.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Plugins that must be built before this one.
    ///
    /// [`Server::try_finish`] fails if one of them was never added.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Whether adding a second instance of this type is an error.
    ///
    /// Defaults to `true`.
    fn is_unique(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins
// ─────────────────────────────────────────────────────────────────────────────

/// Anything [`Server::add_plugins`] accepts: a single [`Plugin`] or a
/// [`PluginGroupBuilder`].
pub trait Plugins {
    /// Hands the plugins over to `server`.
    fn add_to(self, server: &mut Server);
}

impl<P: Plugin> Plugins for P {
    fn add_to(self, server: &mut Server) {
        server.add_plugin_shared(PluginId::of::<P>(), Arc::new(self));
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to(self, server: &mut Server) {
        for entry in self.entries {
            server.add_plugin_shared(entry.id, entry.plugin);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A named bundle of plugins.
///
/// ```ignore
/// pub struct DefaultPlugins;
///
/// impl PluginGroup for DefaultPlugins {
///     fn build(self) -> PluginGroupBuilder {
///         PluginGroupBuilder::new()
///             .add(TracingPlugin::default())
///             .add(EventsPlugin)
///     }
/// }
///
/// Server::new()
///     .add_plugins(DefaultPlugins.build().disable::<TracingPlugin>())
///     .run();
/// ```
pub trait PluginGroup {
    /// Lists the bundled plugins, ready to be edited or added.
    fn build(self) -> PluginGroupBuilder;
}

struct GroupEntry {
    id: PluginId,
    plugin: Arc<dyn Plugin>,
}

impl GroupEntry {
    fn new<P: Plugin>(plugin: P) -> Self {
        Self {
            id: PluginId::of::<P>(),
            plugin: Arc::new(plugin),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroupBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// An editable, ordered list of plugins.
///
/// Positions only decide the build order of plugins that do not depend on
/// each other.
#[derive(Default)]
pub struct PluginGroupBuilder {
    entries: Vec<GroupEntry>,
}

impl PluginGroupBuilder {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position_of<P: Plugin>(&self) -> Option<usize> {
        let id = PluginId::of::<P>();
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn insert_at<P: Plugin>(mut self, position: usize, plugin: P) -> Self {
        self.entries.insert(position, GroupEntry::new(plugin));
        self
    }

    /// Appends a plugin.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "builder method, unrelated to std::ops::Add"
    )]
    pub fn add<P: Plugin>(self, plugin: P) -> Self {
        let end = self.entries.len();
        self.insert_at(end, plugin)
    }

    /// Inserts a plugin in front of `Target`, or first if `Target` is absent.
    #[must_use]
    pub fn add_before<P: Plugin, Target: Plugin>(self, plugin: P) -> Self {
        let position = self.position_of::<Target>().unwrap_or(0);
        self.insert_at(position, plugin)
    }

    /// Inserts a plugin behind `Target`, or last if `Target` is absent.
    #[must_use]
    pub fn add_after<P: Plugin, Target: Plugin>(self, plugin: P) -> Self {
        let position = self
            .position_of::<Target>()
            .map_or(self.entries.len(), |found| found + 1);
        self.insert_at(position, plugin)
    }

    /// Drops every plugin of type `P`.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let id = PluginId::of::<P>();
        self.entries.retain(|entry| entry.id != id);
        self
    }

    /// Returns true if a plugin of type `P` is in the group.
    #[must_use]
    pub fn contains<P: Plugin>(&self) -> bool {
        self.position_of::<P>().is_some()
    }

    /// Number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the plugins, in group order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.plugin.name()).collect()
    }
}

impl fmt::Debug for PluginGroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
