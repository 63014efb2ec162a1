//! Loads a world with every example extension installed.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug world_loading [seed]
//! ```

use example::{CreaturesPlugin, OresPlugin, TerrainPlugin, WeatherPlugin, load_world};
use keystone_core_plugins::DefaultPlugins;
use keystone_system::plugin::PluginGroup;
use keystone_system::server::Server;

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(20_240_601);

    // Extensions are deliberately added out of phase order
    let mut server = Server::new();
    server
        .add_plugins(DefaultPlugins.build())
        .add_plugins(CreaturesPlugin)
        .add_plugins(WeatherPlugin)
        .add_plugins(TerrainPlugin)
        .add_plugins(OresPlugin);
    server.finish();

    match load_world(&server, seed) {
        Some(setup) => {
            for (position, step) in setup.steps.iter().enumerate() {
                tracing::info!(position, %step, "world loading");
            }
        }
        None => tracing::error!("no event registry installed"),
    }

    server.cleanup();
}
