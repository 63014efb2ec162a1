//! Phase-ordered events with a cached invoker.
//!
//! An [`Event<T>`] collects listeners of one callback shape `T` and hands out
//! a single composed callback, the *invoker*, that the event's owner calls
//! directly. The invoker is produced by a factory supplied when the event is
//! created, from every listener flattened in phase order.
//!
//! # Phases
//!
//! Listeners are grouped into named phases. Within a phase listeners keep
//! their registration order; phases are ordered by the constraints declared
//! through [`Event::add_phase_ordering`] or a [`PhaseHandle`]. Listeners
//! registered without a phase land in [`DEFAULT_PHASE`].
//!
//! # Caching
//!
//! Every mutation marks the event dirty. The next call to
//! [`invoker`](Event::invoker) rebuilds and caches the composed callback;
//! later calls return the cached one until something changes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use keystone_event::event::{DEFAULT_PHASE, Event};
//! use keystone_event::identifier::Identifier;
//!
//! type Greet = dyn Fn(&mut Vec<String>) + Send + Sync;
//!
//! fn fan_out(listeners: &[Arc<Greet>]) -> Arc<Greet> {
//!     let listeners = listeners.to_vec();
//!     Arc::new(move |out: &mut Vec<String>| {
//!         for listener in &listeners {
//!             listener(out);
//!         }
//!     })
//! }
//!
//! const EARLY: Identifier = Identifier::from_static("demo", "early");
//!
//! let event: Event<Greet> = Event::new(fan_out);
//! event.register(Arc::new(|out: &mut Vec<String>| out.push("default".into())));
//! event
//!     .phase(&EARLY)
//!     .run_before(&DEFAULT_PHASE)
//!     .register(Arc::new(|out: &mut Vec<String>| out.push("early".into())));
//!
//! let mut out = Vec::new();
//! (event.invoker())(&mut out);
//! assert_eq!(out, ["early", "default"]);
//! ```

use core::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};

use crate::identifier::{DEFAULT_NAMESPACE, Identifier};
use crate::phase::PhaseGraph;

/// The phase listeners land in when registered without one.
pub const DEFAULT_PHASE: Identifier = Identifier::from_static(DEFAULT_NAMESPACE, "default");

/// Errors produced when creating an event with explicit phases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The phase list is empty.
    #[error("an event needs at least one phase")]
    NoPhases,

    /// A phase appears more than once in the phase list.
    #[error("phase '{0}' is declared more than once")]
    DuplicatePhase(Identifier),

    /// The phase list does not contain the default phase.
    #[error("the phase list must contain 'keystone:default'")]
    MissingDefaultPhase,
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

struct EventState<T: ?Sized> {
    phases: PhaseGraph,
    listeners: HashMap<Identifier, Vec<Arc<T>>>,
    listener_count: usize,
}

/// An extension point with phase-ordered listeners of callback shape `T`.
///
/// `T` is usually a trait object such as `dyn Fn(&Context) + Send + Sync`.
/// All methods take `&self`, so an event can be shared behind an [`Arc`] and
/// registered against from any thread.
///
/// # Locking
///
/// Mutations and rebuilds are serialized by one lock, so the phase order is
/// always resolved against a consistent graph. Once the invoker is cached,
/// [`invoker`](Self::invoker) only takes a shared read lock.
///
/// The factory runs while the event is locked for mutation. It must not
/// register listeners or phases on the same event.
pub struct Event<T: ?Sized + Send + Sync + 'static> {
    /// Builds one composed callback from listeners in execution order.
    factory: Box<dyn Fn(&[Arc<T>]) -> Arc<T> + Send + Sync>,
    empty_invoker: Option<Arc<T>>,
    state: Mutex<EventState<T>>,
    /// `None` while dirty. Locked after `state` whenever both are held.
    invoker: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> Event<T> {
    /// Creates an event with only the [`DEFAULT_PHASE`].
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&[Arc<T>]) -> Arc<T> + Send + Sync + 'static,
    {
        let mut phases = PhaseGraph::new();
        phases.get_or_create_phase(&DEFAULT_PHASE);
        Self::from_parts(phases, Box::new(factory))
    }

    /// Creates an event whose phases run in the given order.
    ///
    /// Each phase is ordered before the next one. More phases and constraints
    /// can be added later.
    ///
    /// # Errors
    ///
    /// Returns an [`EventError`] if the list is empty, repeats a phase, or
    /// does not contain [`DEFAULT_PHASE`].
    pub fn with_phases<I, F>(phases: I, factory: F) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = Identifier>,
        F: Fn(&[Arc<T>]) -> Arc<T> + Send + Sync + 'static,
    {
        let declared: Vec<Identifier> = phases.into_iter().collect();
        if declared.is_empty() {
            return Err(EventError::NoPhases);
        }

        let mut seen = HashSet::with_capacity(declared.len());
        for phase in &declared {
            if !seen.insert(phase) {
                return Err(EventError::DuplicatePhase(phase.clone()));
            }
        }
        if !seen.contains(&DEFAULT_PHASE) {
            return Err(EventError::MissingDefaultPhase);
        }

        let mut graph = PhaseGraph::new();
        for phase in &declared {
            graph.get_or_create_phase(phase);
        }
        for pair in declared.windows(2) {
            graph.add_ordering(&pair[0], &pair[1]);
        }

        Ok(Self::from_parts(graph, Box::new(factory)))
    }

    fn from_parts(
        phases: PhaseGraph,
        factory: Box<dyn Fn(&[Arc<T>]) -> Arc<T> + Send + Sync>,
    ) -> Self {
        Self {
            factory,
            empty_invoker: None,
            state: Mutex::new(EventState {
                phases,
                listeners: HashMap::new(),
                listener_count: 0,
            }),
            invoker: RwLock::new(None),
        }
    }

    /// Uses `invoker` while no listener is registered, instead of calling the
    /// factory with an empty slice.
    #[must_use]
    pub fn with_empty_invoker(mut self, invoker: Arc<T>) -> Self {
        self.empty_invoker = Some(invoker);
        self
    }

    /// Registers a listener in the [`DEFAULT_PHASE`].
    pub fn register(&self, listener: Arc<T>) {
        self.register_in(&DEFAULT_PHASE, listener);
    }

    /// Registers a listener in `phase`, creating the phase if needed.
    pub fn register_in(&self, phase: &Identifier, listener: Arc<T>) {
        let mut state = self.state.lock();
        state.phases.get_or_create_phase(phase);
        state
            .listeners
            .entry(phase.clone())
            .or_default()
            .push(listener);
        state.listener_count += 1;
        self.invalidate();
    }

    /// Orders `first` ahead of `second`, creating either phase if needed.
    ///
    /// Repeated and self-referential orderings are no-ops and keep the cached
    /// invoker.
    pub fn add_phase_ordering(&self, first: &Identifier, second: &Identifier) {
        let mut state = self.state.lock();
        if state.phases.add_ordering(first, second) {
            self.invalidate();
        }
    }

    /// Returns a handle to `phase`, creating the phase if needed.
    pub fn phase(&self, phase: &Identifier) -> PhaseHandle<'_, T> {
        let mut state = self.state.lock();
        let known = state.phases.len();
        state.phases.get_or_create_phase(phase);
        if state.phases.len() != known {
            self.invalidate();
        }

        PhaseHandle {
            event: self,
            id: phase.clone(),
        }
    }

    /// Returns the composed callback, rebuilding it if the event changed.
    pub fn invoker(&self) -> Arc<T> {
        if let Some(invoker) = self.invoker.read().as_ref() {
            return Arc::clone(invoker);
        }

        let mut state = self.state.lock();
        // Another thread may have rebuilt while we waited
        if let Some(invoker) = self.invoker.read().as_ref() {
            return Arc::clone(invoker);
        }

        let invoker = self.rebuild(&mut state);
        *self.invoker.write() = Some(Arc::clone(&invoker));
        invoker
    }

    fn rebuild(&self, state: &mut EventState<T>) -> Arc<T> {
        let EventState {
            phases,
            listeners,
            listener_count,
        } = state;
        let order = phases.resolve_order();

        if *listener_count == 0
            && let Some(empty) = &self.empty_invoker
        {
            tracing::trace!(phases = order.len(), "using empty event invoker");
            return Arc::clone(empty);
        }

        let mut flattened = Vec::with_capacity(*listener_count);
        for phase in order {
            if let Some(registered) = listeners.get(phase) {
                flattened.extend(registered.iter().cloned());
            }
        }

        tracing::trace!(
            phases = order.len(),
            listeners = flattened.len(),
            "rebuilding event invoker"
        );
        (self.factory)(&flattened)
    }

    /// Must be called with `state` locked.
    fn invalidate(&self) {
        *self.invoker.write() = None;
    }

    /// Returns the number of registered listeners across all phases.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.lock().listener_count
    }

    /// Returns every phase in execution order.
    #[must_use]
    pub fn phase_order(&self) -> Vec<Identifier> {
        self.state.lock().phases.resolve_order().to_vec()
    }

    /// Returns true if the phase exists.
    #[must_use]
    pub fn contains_phase(&self, phase: &Identifier) -> bool {
        self.state.lock().phases.contains(phase)
    }

    /// Returns true if the next [`invoker`](Self::invoker) call rebuilds.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.invoker.read().is_none()
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Event");
        debug.field("callback", &core::any::type_name::<T>());
        if let Some(state) = self.state.try_lock() {
            debug
                .field("phases", &state.phases.phases())
                .field("listeners", &state.listener_count);
        }
        debug
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PhaseHandle
// ─────────────────────────────────────────────────────────────────────────────

/// A handle scoped to one phase of an [`Event`].
///
/// Methods return the handle so calls chain:
///
/// ```ignore
/// event.phase(&LATE).run_after(&DEFAULT_PHASE).register(listener);
/// ```
pub struct PhaseHandle<'a, T: ?Sized + Send + Sync + 'static> {
    event: &'a Event<T>,
    id: Identifier,
}

impl<'a, T: ?Sized + Send + Sync + 'static> PhaseHandle<'a, T> {
    /// Returns the phase identifier.
    #[must_use]
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Registers a listener in this phase.
    pub fn register(&self, listener: Arc<T>) -> &Self {
        self.event.register_in(&self.id, listener);
        self
    }

    /// Orders this phase ahead of `other`.
    pub fn run_before(&self, other: &Identifier) -> &Self {
        self.event.add_phase_ordering(&self.id, other);
        self
    }

    /// Orders this phase after `other`.
    pub fn run_after(&self, other: &Identifier) -> &Self {
        self.event.add_phase_ordering(other, &self.id);
        self
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for PhaseHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseHandle").field("id", &self.id).finish()
    }
}
