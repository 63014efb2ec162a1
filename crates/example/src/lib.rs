//! Example Keystone host.
//!
//! A host declares one event, [`WorldLoading`], and fires it while loading a
//! world. Four extensions, written without knowledge of each other, register
//! listeners in their own phases:
//!
//! ```text
//! worldgen:terrain ──▶ ores:veins ──▶ keystone:default ──▶ spawning:rules
//!   TerrainPlugin       OresPlugin      WeatherPlugin       CreaturesPlugin
//! ```
//!
//! The order holds whatever order the plugins are added in.

mod events;
mod extensions;

pub use events::{OnWorldLoading, SPAWNS, TERRAIN, WorldLoading, WorldSetup};
pub use extensions::{CreaturesPlugin, ORE_VEINS, OresPlugin, TerrainPlugin, WeatherPlugin};

use keystone_event::registry::EventsAPI;
use keystone_system::server::Server;

/// Fires [`WorldLoading`] and returns the completed setup.
///
/// Returns `None` if the server has no [`EventsAPI`].
#[must_use]
pub fn load_world(server: &Server, seed: u64) -> Option<WorldSetup> {
    let events = server.api::<EventsAPI>()?;
    let mut setup = WorldSetup::new(seed);
    (events.event::<WorldLoading>().invoker())(&mut setup);
    Some(setup)
}
