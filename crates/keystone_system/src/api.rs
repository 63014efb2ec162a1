//! Shared capabilities.
//!
//! An [`API`] is a value a plugin stores in the
//! [`Server`](crate::server::Server) for other plugins to find by type. The
//! event registry is one. Plugins look APIs up through `&Server`, so any
//! API that accepts registrations guards its own state:
//!
//! ```
//! use hashbrown::HashMap;
//! use parking_lot::RwLock;
//! use keystone_system::api::API;
//!
//! #[derive(Default)]
//! pub struct SpawnRulesAPI {
//!     weights: RwLock<HashMap<String, u32>>,
//! }
//!
//! impl API for SpawnRulesAPI {}
//!
//! impl SpawnRulesAPI {
//!     pub fn register(&self, biome: &str, weight: u32) {
//!         self.weights.write().insert(biome.into(), weight);
//!     }
//!
//!     pub fn weight(&self, biome: &str) -> Option<u32> {
//!         self.weights.read().get(biome).copied()
//!     }
//! }
//! ```

/// A capability stored in the server, at most one per type.
///
/// The plugin that provides an API inserts it during `build()`. Plugins
/// that use it list the provider in their dependencies so it is built
/// first:
///
/// ```ignore
/// impl Plugin for SpawnRulesPlugin {
///     fn build(&self, server: &mut Server) {
///         server.insert_api(SpawnRulesAPI::default());
///     }
/// }
///
/// impl Plugin for SwampPlugin {
///     fn build(&self, server: &mut Server) {
///         let rules = server.api::<SpawnRulesAPI>().expect("SpawnRulesAPI required");
///         rules.register("swamp", 4);
///     }
///
///     fn dependencies(&self) -> Vec<PluginId> {
///         vec![PluginId::of::<SpawnRulesPlugin>()]
///     }
/// }
/// ```
pub trait API: Send + Sync + 'static {}
