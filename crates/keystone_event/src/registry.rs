//! The event registry shared through the server.
//!
//! Events are declared as [`EventKey`] types and looked up in the
//! [`EventsAPI`], which creates each event on first access. Every plugin that
//! asks for the same key receives the same [`Event`] instance.
//!
//! ```
//! use std::sync::Arc;
//! use keystone_event::event::Event;
//! use keystone_event::identifier::Identifier;
//! use keystone_event::registry::{EventKey, EventsAPI};
//!
//! type OnStartup = dyn Fn(&str) + Send + Sync;
//!
//! struct ServerStarted;
//!
//! impl EventKey for ServerStarted {
//!     type Callback = OnStartup;
//!     const ID: Identifier = Identifier::from_static("demo", "server_started");
//!
//!     fn create() -> Event<OnStartup> {
//!         Event::new(|listeners: &[Arc<OnStartup>]| {
//!             let listeners = listeners.to_vec();
//!             Arc::new(move |name: &str| listeners.iter().for_each(|l| l(name)))
//!                 as Arc<OnStartup>
//!         })
//!     }
//! }
//!
//! let events = EventsAPI::new();
//! events.event::<ServerStarted>().register(Arc::new(|_name: &str| {}));
//! assert_eq!(events.event::<ServerStarted>().listener_count(), 1);
//! ```

use core::any::{Any, TypeId, type_name};
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use keystone_system::api::API;
use parking_lot::RwLock;

use crate::event::Event;
use crate::identifier::Identifier;

/// Declares an event that can be looked up in the [`EventsAPI`].
pub trait EventKey: 'static {
    /// The callback shape of the event's listeners.
    type Callback: ?Sized + Send + Sync + 'static;

    /// Unique identifier of the event.
    const ID: Identifier;

    /// Creates the event. Called at most once per registry.
    ///
    /// Must not access the registry it is being created in.
    fn create() -> Event<Self::Callback>;
}

/// Errors produced by event lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two different key types declare the same identifier.
    #[error("event '{id}' is registered by key '{registered}', cannot access it through '{requested}'")]
    KeyConflict {
        /// The contested identifier.
        id: Identifier,
        /// Type name of the key that created the event.
        registered: &'static str,
        /// Type name of the key used for the failing lookup.
        requested: &'static str,
    },
}

/// A snapshot of one registered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    /// Event identifier.
    pub id: Identifier,
    /// Type name of the declaring key.
    pub key: &'static str,
    /// Number of registered listeners.
    pub listeners: usize,
    /// Phases in execution order.
    pub phase_order: Vec<Identifier>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Type erasure
// ─────────────────────────────────────────────────────────────────────────────

trait ErasedEvent: Any {
    fn listener_count(&self) -> usize;
    fn phase_order(&self) -> Vec<Identifier>;
}

impl<T: ?Sized + Send + Sync + 'static> ErasedEvent for Event<T> {
    fn listener_count(&self) -> usize {
        Event::listener_count(self)
    }

    fn phase_order(&self) -> Vec<Identifier> {
        Event::phase_order(self)
    }
}

type SharedEvent = Arc<dyn ErasedEvent + Send + Sync>;

struct RegisteredEvent {
    id: Identifier,
    key: TypeId,
    key_name: &'static str,
    event: SharedEvent,
}

impl RegisteredEvent {
    fn downcast<K: EventKey>(&self) -> Result<Arc<Event<K::Callback>>, RegistryError> {
        let conflict = || RegistryError::KeyConflict {
            id: self.id.clone(),
            registered: self.key_name,
            requested: type_name::<K>(),
        };

        if self.key != TypeId::of::<K>() {
            return Err(conflict());
        }

        let shared: SharedEvent = Arc::clone(&self.event);
        let any: Arc<dyn Any + Send + Sync> = shared;
        any.downcast::<Event<K::Callback>>()
            .map_err(|_| conflict())
    }
}

#[derive(Default)]
struct EventTable {
    index: HashMap<Identifier, usize>,
    entries: Vec<RegisteredEvent>,
}

impl EventTable {
    fn get(&self, id: &Identifier) -> Option<&RegisteredEvent> {
        self.index.get(id).map(|&i| &self.entries[i])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventsAPI
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of every event known to a server.
///
/// Inserted by [`EventsPlugin`](crate::plugin::EventsPlugin). Plugins look
/// events up by key and register their listeners during `build`.
#[derive(Default)]
pub struct EventsAPI {
    table: RwLock<EventTable>,
}

impl API for EventsAPI {}

impl EventsAPI {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the event declared by `K`, creating it on first access.
    ///
    /// # Panics
    ///
    /// Panics if another key type already registered `K::ID`. Use
    /// [`try_event`](Self::try_event) to handle the conflict instead.
    #[track_caller]
    pub fn event<K: EventKey>(&self) -> Arc<Event<K::Callback>> {
        match self.try_event::<K>() {
            Ok(event) => event,
            Err(error) => panic!("{error}"),
        }
    }

    /// Returns the event declared by `K`, creating it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyConflict`] if another key type already
    /// registered `K::ID`.
    pub fn try_event<K: EventKey>(&self) -> Result<Arc<Event<K::Callback>>, RegistryError> {
        if let Some(entry) = self.table.read().get(&K::ID) {
            return entry.downcast::<K>();
        }

        let mut table = self.table.write();
        // Another thread may have created it between the two locks
        if let Some(entry) = table.get(&K::ID) {
            return entry.downcast::<K>();
        }

        let event = Arc::new(K::create());
        tracing::debug!(event = %K::ID, key = type_name::<K>(), "created event");

        let position = table.entries.len();
        table.index.insert(K::ID, position);
        table.entries.push(RegisteredEvent {
            id: K::ID,
            key: TypeId::of::<K>(),
            key_name: type_name::<K>(),
            event: Arc::clone(&event) as SharedEvent,
        });

        Ok(event)
    }

    /// Returns true if the event declared by `K` was created.
    #[must_use]
    pub fn contains<K: EventKey>(&self) -> bool {
        self.table.read().index.contains_key(&K::ID)
    }

    /// Returns the number of created events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    /// Returns true if no event was created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }

    /// Returns the identifiers of all created events, in creation order.
    #[must_use]
    pub fn ids(&self) -> Vec<Identifier> {
        self.table
            .read()
            .entries
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Returns a snapshot of every created event, in creation order.
    #[must_use]
    pub fn summaries(&self) -> Vec<EventSummary> {
        let entries: Vec<(Identifier, &'static str, SharedEvent)> = self
            .table
            .read()
            .entries
            .iter()
            .map(|entry| (entry.id.clone(), entry.key_name, Arc::clone(&entry.event)))
            .collect();

        // Event locks are taken after the table lock is released
        entries
            .into_iter()
            .map(|(id, key, event)| EventSummary {
                id,
                key,
                listeners: event.listener_count(),
                phase_order: event.phase_order(),
            })
            .collect()
    }
}

impl fmt::Debug for EventsAPI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventsAPI")
            .field("events", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    type Notify = dyn Fn(&mut u32) + Send + Sync;

    fn chain(listeners: &[Arc<Notify>]) -> Arc<Notify> {
        let listeners = listeners.to_vec();
        Arc::new(move |value: &mut u32| {
            for listener in &listeners {
                listener(value);
            }
        })
    }

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;
    impl EventKey for Counted {
        type Callback = Notify;
        const ID: Identifier = Identifier::from_static("test", "counted");
        fn create() -> Event<Notify> {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Event::new(chain)
        }
    }

    struct First;
    impl EventKey for First {
        type Callback = Notify;
        const ID: Identifier = Identifier::from_static("test", "shared");
        fn create() -> Event<Notify> {
            Event::new(chain)
        }
    }

    struct Impostor;
    impl EventKey for Impostor {
        type Callback = dyn Fn() + Send + Sync;
        const ID: Identifier = Identifier::from_static("test", "shared");
        fn create() -> Event<Self::Callback> {
            Event::new(|listeners: &[Arc<dyn Fn() + Send + Sync>]| {
                let listeners = listeners.to_vec();
                Arc::new(move || listeners.iter().for_each(|l| l())) as Arc<dyn Fn() + Send + Sync>
            })
        }
    }

    struct Other;
    impl EventKey for Other {
        type Callback = Notify;
        const ID: Identifier = Identifier::from_static("test", "other");
        fn create() -> Event<Notify> {
            Event::new(chain)
        }
    }

    #[test]
    fn lookup_returns_the_same_instance() {
        let events = EventsAPI::new();
        assert!(!events.contains::<First>());

        let a = events.event::<First>();
        let b = events.event::<First>();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(events.contains::<First>());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn existing_event_is_recovered_with_its_listeners() {
        let events = EventsAPI::new();
        events
            .event::<Other>()
            .register(Arc::new(|v: &mut u32| *v += 10));

        let again = events.try_event::<Other>().expect("same key resolves");
        assert_eq!(again.listener_count(), 1);

        let mut value = 1;
        (again.invoker())(&mut value);
        assert_eq!(value, 11);
    }

    #[test]
    fn create_runs_once_across_threads() {
        let events = Arc::new(EventsAPI::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let events = Arc::clone(&events);
                std::thread::spawn(move || events.event::<Counted>())
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.iter().all(|e| Arc::ptr_eq(e, &instances[0])));
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn conflicting_key_is_reported() {
        let events = EventsAPI::new();
        events.event::<First>();

        let Err(RegistryError::KeyConflict {
            id,
            registered,
            requested,
        }) = events.try_event::<Impostor>()
        else {
            panic!("expected a key conflict");
        };
        assert_eq!(id, First::ID);
        assert!(registered.ends_with("First"));
        assert!(requested.ends_with("Impostor"));
    }

    #[test]
    #[should_panic(expected = "cannot access it through")]
    fn conflicting_key_panics_through_event() {
        let events = EventsAPI::new();
        events.event::<First>();
        events.event::<Impostor>();
    }

    #[test]
    fn summaries_follow_creation_order() {
        let events = EventsAPI::new();
        events.event::<Other>().register(Arc::new(|v: &mut u32| *v += 1));
        events.event::<First>();

        assert_eq!(events.ids(), vec![Other::ID, First::ID]);

        let summaries = events.summaries();
        assert_eq!(summaries[0].listeners, 1);
        assert_eq!(summaries[1].listeners, 0);
        assert_eq!(summaries[0].phase_order, vec![crate::event::DEFAULT_PHASE]);
    }
}
