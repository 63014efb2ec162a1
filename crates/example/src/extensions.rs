//! Independent extensions listening to [`WorldLoading`].
//!
//! None of these plugins know about each other. Their listeners still run in
//! a fixed order because each one picks a phase and orders it against the
//! phases it cares about.

use std::sync::Arc;

use keystone_event::event::DEFAULT_PHASE;
use keystone_event::identifier::Identifier;
use keystone_event::plugin::EventsPlugin;
use keystone_event::registry::EventsAPI;
use keystone_system::plugin::{Plugin, PluginId};
use keystone_system::server::Server;

use crate::events::{SPAWNS, TERRAIN, WorldLoading, WorldSetup};

/// Ores are placed once terrain exists, but before default listeners.
pub const ORE_VEINS: Identifier = Identifier::from_static("ores", "veins");

fn events(server: &Server) -> &EventsAPI {
    server
        .api::<EventsAPI>()
        .expect("EventsPlugin must be added before world extensions")
}

/// Carves the terrain.
pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, server: &mut Server) {
        events(server)
            .event::<WorldLoading>()
            .phase(&TERRAIN)
            .register(Arc::new(|setup: &mut WorldSetup| {
                let step = format!("carved terrain from seed {}", setup.seed);
                setup.step(step);
            }));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<EventsPlugin>()]
    }
}

/// Places ore veins inside the terrain.
pub struct OresPlugin;

impl Plugin for OresPlugin {
    fn build(&self, server: &mut Server) {
        events(server)
            .event::<WorldLoading>()
            .phase(&ORE_VEINS)
            .run_after(&TERRAIN)
            .run_before(&DEFAULT_PHASE)
            .register(Arc::new(|setup: &mut WorldSetup| {
                setup.step("placed iron veins");
            }))
            .register(Arc::new(|setup: &mut WorldSetup| {
                setup.step("placed copper veins");
            }));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<EventsPlugin>()]
    }
}

/// Sets the weather. Has no ordering needs, so it uses the default phase.
pub struct WeatherPlugin;

impl Plugin for WeatherPlugin {
    fn build(&self, server: &mut Server) {
        events(server)
            .event::<WorldLoading>()
            .register(Arc::new(|setup: &mut WorldSetup| {
                setup.step("started the weather cycle");
            }));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<EventsPlugin>()]
    }
}

/// Registers creature spawn rules once the world is complete.
pub struct CreaturesPlugin;

impl Plugin for CreaturesPlugin {
    fn build(&self, server: &mut Server) {
        events(server)
            .event::<WorldLoading>()
            .phase(&SPAWNS)
            .register(Arc::new(|setup: &mut WorldSetup| {
                setup.step("registered creature spawn rules");
            }));
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<EventsPlugin>()]
    }
}
