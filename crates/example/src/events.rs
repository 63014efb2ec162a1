//! The world loading event and its phases.

use std::sync::Arc;

use keystone_event::event::{DEFAULT_PHASE, Event};
use keystone_event::identifier::Identifier;
use keystone_event::registry::EventKey;

/// Terrain is generated before anything else touches the world.
pub const TERRAIN: Identifier = Identifier::from_static("worldgen", "terrain");

/// Spawn rules need the final world, so they run last.
pub const SPAWNS: Identifier = Identifier::from_static("spawning", "rules");

/// State passed to every world loading listener.
#[derive(Debug, Default)]
pub struct WorldSetup {
    /// Seed of the world being loaded.
    pub seed: u64,
    /// Steps performed so far, in execution order.
    pub steps: Vec<String>,
}

impl WorldSetup {
    /// Creates setup state for a world.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            steps: Vec::new(),
        }
    }

    /// Records a completed step.
    pub fn step(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }
}

/// Listener shape of [`WorldLoading`].
pub type OnWorldLoading = dyn Fn(&mut WorldSetup) + Send + Sync;

/// Fired once while a world is loaded.
///
/// Declares three phases: [`TERRAIN`], the default phase, then [`SPAWNS`].
pub struct WorldLoading;

impl EventKey for WorldLoading {
    type Callback = OnWorldLoading;

    const ID: Identifier = Identifier::from_static("example", "world_loading");

    fn create() -> Event<OnWorldLoading> {
        let event = Event::new(fan_out).with_empty_invoker(Arc::new(|_: &mut WorldSetup| {}));
        event.add_phase_ordering(&TERRAIN, &DEFAULT_PHASE);
        event.add_phase_ordering(&DEFAULT_PHASE, &SPAWNS);
        event
    }
}

fn fan_out(listeners: &[Arc<OnWorldLoading>]) -> Arc<OnWorldLoading> {
    let listeners = listeners.to_vec();
    Arc::new(move |setup: &mut WorldSetup| {
        for listener in &listeners {
            listener(setup);
        }
    })
}
