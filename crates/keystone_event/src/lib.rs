//! Phase-ordered event dispatch for Keystone (Layer 2).
//!
//! Independent extensions register callbacks against a named event, group
//! them into ordered phases, and the event hands its owner one composed
//! callback that runs every listener in a deterministic order.
//!
//! - [`identifier`] - Namespaced `namespace:path` identifiers
//! - [`phase`] - Cycle-tolerant ordering of an event's phases
//! - [`event`] - Events, phase handles and the cached invoker
//! - [`registry`] - The [`EventsAPI`](registry::EventsAPI) shared through the server
//! - [`plugin`] - [`EventsPlugin`](plugin::EventsPlugin) installing the registry
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use keystone_event::prelude::*;
//!
//! type Tick = dyn Fn(&mut u32) + Send + Sync;
//!
//! fn fan_out(listeners: &[Arc<Tick>]) -> Arc<Tick> {
//!     let listeners = listeners.to_vec();
//!     Arc::new(move |count: &mut u32| listeners.iter().for_each(|l| l(count)))
//! }
//!
//! let event: Event<Tick> = Event::new(fan_out);
//! for _ in 0..3 {
//!     event.register(Arc::new(|count: &mut u32| *count += 1));
//! }
//!
//! let mut count = 0;
//! (event.invoker())(&mut count);
//! assert_eq!(count, 3);
//! ```

pub mod event;
pub mod identifier;
pub mod phase;
pub mod plugin;
pub mod registry;

/// Event types most plugins import.
pub mod prelude {
    pub use crate::event::{DEFAULT_PHASE, Event, EventError, PhaseHandle};
    pub use crate::identifier::{DEFAULT_NAMESPACE, Identifier, IdentifierError};
    pub use crate::phase::{PhaseGraph, PhaseNode};
    pub use crate::plugin::EventsPlugin;
    pub use crate::registry::{EventKey, EventSummary, EventsAPI, RegistryError};
}
