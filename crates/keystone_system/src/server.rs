//! The server: plugin lifecycle and shared APIs.
//!
//! The [`Server`] is the application context extensions share. It owns the
//! plugins and the [`API`]s they expose to one another, and nothing else.
//!
//! ```ignore
//! Server::new()
//!     .add_plugins(DefaultPlugins.build())
//!     .add_plugins(FuelPlugin)
//!     .add_plugins(SmeltingPlugin)
//!     .run();
//! ```
//!
//! # Lifecycle
//!
//! `finish()` checks that every declared dependency was added and orders
//! the plugins so each one is built after what it depends on. Every plugin
//! is then built, and once all of them are, readied in the same order.
//! `cleanup()` walks the list backwards.
//!
//! Dependency resolution uses the same [`DependencyGraph`] as event phases,
//! but a plugin cycle is a [`BuildError`] rather than something to break.

use core::any::{Any, TypeId};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::api::API;
use crate::plugin::{Plugin, PluginId, Plugins};
use crate::sorting::DependencyGraph;

// ─────────────────────────────────────────────────────────────────────────────
// BuildError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while assembling the server's plugins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// `finish()` was called on a server that is already built.
    #[error("Server::finish() was already called. Cannot build twice.")]
    AlreadyBuilt,

    /// A plugin declared a dependency that was never added.
    #[error(
        "plugin '{plugin}' requires '{dependency}' which was not added; \
         add {dependency} as well, or use a plugin group that includes it"
    )]
    MissingDependency {
        /// The dependent plugin.
        plugin: String,
        /// The missing dependency.
        dependency: String,
    },

    /// Plugins depend on each other in a cycle, or one depends on itself.
    #[error(
        "circular dependency detected among plugins: {plugins:?}; \
         extract the shared functionality into a separate plugin"
    )]
    CircularDependency {
        /// Names of the plugins forming the cycle, in insertion order.
        plugins: Vec<String>,
    },

    /// A unique plugin was added twice.
    #[error(
        "plugin '{0}' is unique and was already added; \
         return false from `is_unique()` to allow multiple instances"
    )]
    DuplicatePlugin(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// An API with its type erased, keyed by its `TypeId`.
type BoxedAPI = Box<dyn Any + Send + Sync>;

/// The build state of the server.
///
/// Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    NotStarted,
    /// `finish()` is executing; plugins added now are built immediately.
    Building,
    Built,
}

/// A plugin as the server tracks it.
struct PluginEntry {
    id: PluginId,
    /// Shared so lifecycle calls can receive `&mut Server` while the entry
    /// stays in the plugin list.
    plugin: Arc<dyn Plugin>,
    /// Cached for error messages.
    name: String,
}

/// Owns the plugins of an application and the APIs they share.
///
/// # Example
///
/// ```
/// use keystone_system::api::API;
/// use keystone_system::plugin::Plugin;
/// use keystone_system::server::Server;
///
/// #[derive(Default)]
/// struct RecipesAPI;
/// impl API for RecipesAPI {}
///
/// struct RecipesPlugin;
/// impl Plugin for RecipesPlugin {
///     fn build(&self, server: &mut Server) {
///         server.insert_api(RecipesAPI);
///     }
/// }
///
/// let mut server = Server::new();
/// server.add_plugins(RecipesPlugin);
/// server.finish();
///
/// assert!(server.contains_api::<RecipesAPI>());
/// ```
#[derive(Default)]
pub struct Server {
    /// APIs keyed by their type.
    apis: HashMap<TypeId, BoxedAPI>,

    /// Plugins waiting for `finish()`, in insertion order.
    pending_plugins: Vec<PluginEntry>,

    /// Plugins that have been built, in build order.
    built_plugins: Vec<PluginEntry>,

    /// Every id added so far, built or not.
    plugin_ids: HashSet<PluginId>,

    build_state: BuildState,
}

impl Server {
    /// Creates a server with no plugins and no APIs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Queues plugins for `finish()`.
    ///
    /// Accepts either a single [`Plugin`] or a
    /// [`PluginGroupBuilder`](crate::plugin::PluginGroupBuilder).
    ///
    /// # Panics
    ///
    /// Panics with [`BuildError::DuplicatePlugin`] when a unique plugin
    /// type is added a second time.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> &mut Self {
        plugins.add_to(self);
        self
    }

    /// Queues a plugin, or builds it right away while the server is building.
    pub(crate) fn add_plugin_shared(&mut self, id: PluginId, plugin: Arc<dyn Plugin>) {
        let name = plugin.name().to_string();

        if plugin.is_unique() && self.plugin_ids.contains(&id) {
            panic!("{}", BuildError::DuplicatePlugin(name));
        }
        self.plugin_ids.insert(id);

        let entry = PluginEntry {
            id,
            plugin,
            name,
        };

        if self.build_state == BuildState::Building {
            self.build_entry(entry);
        } else {
            self.pending_plugins.push(entry);
        }
    }

    /// Returns true once a plugin of type `P` was added.
    #[must_use]
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugin_ids.contains(&PluginId::of::<P>())
    }

    /// Returns the names of built plugins in build order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.built_plugins.iter().map(|p| p.name.as_str()).collect()
    }

    /// Returns whether the server has been built.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.build_state == BuildState::Built
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores `api` and returns the `A` it replaced, if any.
    pub fn insert_api<A: API>(&mut self, api: A) -> Option<A> {
        let previous = self.apis.insert(TypeId::of::<A>(), Box::new(api))?;
        previous.downcast::<A>().ok().map(|previous| *previous)
    }

    /// Gets a reference to an API, or `None` if it was never inserted.
    #[must_use]
    pub fn api<A: API>(&self) -> Option<&A> {
        self.apis
            .get(&TypeId::of::<A>())
            .and_then(|boxed| boxed.downcast_ref::<A>())
    }

    /// Returns true if an `A` is stored.
    #[must_use]
    pub fn contains_api<A: API>(&self) -> bool {
        self.apis.contains_key(&TypeId::of::<A>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Builds all plugins and prepares the server for use.
    ///
    /// # Panics
    ///
    /// Panics with the [`BuildError`] message if a dependency is missing,
    /// plugins depend on each other in a cycle, or the server was already
    /// built. Use [`try_finish()`](Self::try_finish) to handle these instead.
    pub fn finish(&mut self) {
        if let Err(error) = self.try_finish() {
            panic!("{error}");
        }
    }

    /// Orders the queued plugins by their dependencies, builds them, then
    /// readies them.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] before any plugin is built if resolution
    /// fails; the server is left untouched in that case.
    pub fn try_finish(&mut self) -> Result<(), BuildError> {
        if self.build_state != BuildState::NotStarted {
            return Err(BuildError::AlreadyBuilt);
        }

        let order = self.resolve_build_order()?;
        let mut pending: Vec<Option<PluginEntry>> = core::mem::take(&mut self.pending_plugins)
            .into_iter()
            .map(Some)
            .collect();

        self.build_state = BuildState::Building;
        for index in order {
            if let Some(entry) = pending[index].take() {
                self.build_entry(entry);
            }
        }

        // Indexed loop: plugins added from ready() are built immediately and
        // get their own ready() call further down the list.
        let mut index = 0;
        while index < self.built_plugins.len() {
            let plugin = Arc::clone(&self.built_plugins[index].plugin);
            plugin.ready(self);
            index += 1;
        }

        self.build_state = BuildState::Built;
        tracing::debug!(plugins = self.built_plugins.len(), "server built");
        Ok(())
    }

    fn build_entry(&mut self, entry: PluginEntry) {
        tracing::trace!(plugin = %entry.name, "building plugin");
        let plugin = Arc::clone(&entry.plugin);
        plugin.build(self);
        self.built_plugins.push(entry);
    }

    /// Builds and readies every plugin.
    ///
    /// # Panics
    ///
    /// Same as [`finish()`](Self::finish).
    pub fn run(&mut self) {
        self.finish();
    }

    /// Same as [`finish()`](Self::finish). Reads better in tests.
    pub fn run_once(&mut self) {
        self.finish();
    }

    /// Cleans up all plugins in reverse build order.
    pub fn cleanup(&mut self) {
        for index in (0..self.built_plugins.len()).rev() {
            let plugin = Arc::clone(&self.built_plugins[index].plugin);
            plugin.cleanup(self);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Build Order
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns indices into `pending_plugins` in build order.
    fn resolve_build_order(&self) -> Result<Vec<usize>, BuildError> {
        let mut graph = DependencyGraph::new();
        let mut instances: HashMap<PluginId, Vec<usize>> = HashMap::new();

        for (index, entry) in self.pending_plugins.iter().enumerate() {
            graph.add_node(index);
            instances.entry(entry.id).or_default().push(index);
        }

        for (index, entry) in self.pending_plugins.iter().enumerate() {
            for dependency in entry.plugin.dependencies() {
                if dependency == entry.id {
                    return Err(BuildError::CircularDependency {
                        plugins: vec![entry.name.clone()],
                    });
                }
                if let Some(providers) = instances.get(&dependency) {
                    for &provider in providers {
                        graph.add_edge(provider, index);
                    }
                } else if !self.built_plugins.iter().any(|p| p.id == dependency) {
                    return Err(BuildError::MissingDependency {
                        plugin: entry.name.clone(),
                        dependency: dependency.type_name().to_string(),
                    });
                }
            }
        }

        let sorted = graph.sort();
        if let Some(cycle) = sorted.cycles.first() {
            return Err(BuildError::CircularDependency {
                plugins: cycle
                    .iter()
                    .map(|&index| self.pending_plugins[index].name.clone())
                    .collect(),
            });
        }

        Ok(sorted.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, PartialEq)]
    struct CounterAPI(u32);
    impl API for CounterAPI {}

    struct Base;
    impl Plugin for Base {
        fn build(&self, _server: &mut Server) {}
    }

    struct NeedsBase;
    impl Plugin for NeedsBase {
        fn build(&self, _server: &mut Server) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Base>()]
        }
    }

    #[test]
    fn insert_api_replaces_and_returns_old() {
        let mut server = Server::new();
        assert!(server.insert_api(CounterAPI(1)).is_none());
        assert_eq!(server.insert_api(CounterAPI(2)), Some(CounterAPI(1)));
        assert_eq!(server.api::<CounterAPI>(), Some(&CounterAPI(2)));
    }

    #[test]
    fn missing_api_is_none() {
        let server = Server::new();
        assert!(server.api::<CounterAPI>().is_none());
        assert!(!server.contains_api::<CounterAPI>());
    }

    #[test]
    fn missing_dependency_is_reported_without_building() {
        let mut server = Server::new();
        server.add_plugins(NeedsBase);

        let error = server.try_finish().unwrap_err();
        assert!(matches!(error, BuildError::MissingDependency { .. }));
        assert!(!server.is_built());
        assert!(server.plugin_names().is_empty());
    }

    #[test]
    #[should_panic(expected = "is unique and was already added")]
    fn duplicate_unique_plugin_panics() {
        let mut server = Server::new();
        server.add_plugins(Base).add_plugins(Base);
    }

    #[test]
    fn second_finish_is_rejected() {
        let mut server = Server::new();
        server.finish();
        assert_eq!(server.try_finish(), Err(BuildError::AlreadyBuilt));
    }

    struct NeedsItself;
    impl Plugin for NeedsItself {
        fn build(&self, _server: &mut Server) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<NeedsItself>()]
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut server = Server::new();
        server.add_plugins(NeedsItself);

        let Err(BuildError::CircularDependency { plugins }) = server.try_finish() else {
            panic!("expected a circular dependency error");
        };
        assert_eq!(plugins.len(), 1);
        assert!(plugins[0].ends_with("NeedsItself"));
        assert!(!server.is_built());
    }

    #[test]
    fn run_once_builds_like_finish() {
        let mut server = Server::new();
        server.add_plugins(Base).add_plugins(NeedsBase);
        server.run_once();

        assert!(server.is_built());
        assert_eq!(server.plugin_names().len(), 2);
        assert_eq!(server.try_finish(), Err(BuildError::AlreadyBuilt));
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Plugin for Recorder {
        fn build(&self, _server: &mut Server) {
            self.log.lock().push(format!("build:{}", self.label));
        }
        fn ready(&self, _server: &mut Server) {
            self.log.lock().push(format!("ready:{}", self.label));
        }
        fn cleanup(&self, _server: &mut Server) {
            self.log.lock().push(format!("cleanup:{}", self.label));
        }
        fn is_unique(&self) -> bool {
            false
        }
    }

    #[test]
    fn lifecycle_runs_in_order_and_cleanup_reverses() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut server = Server::new();
        for label in ["first", "second"] {
            server.add_plugins(Recorder {
                label,
                log: Arc::clone(&log),
            });
        }
        server.finish();
        server.cleanup();

        assert_eq!(
            *log.lock(),
            vec![
                "build:first",
                "build:second",
                "ready:first",
                "ready:second",
                "cleanup:second",
                "cleanup:first",
            ]
        );
    }
}
