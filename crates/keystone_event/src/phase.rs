//! Phase ordering for a single event.
//!
//! A [`PhaseGraph`] holds the named phases of one event and the
//! "runs before" constraints between them. The resolved order is memoised and
//! only recomputed after a new phase or a new constraint appears.
//!
//! Conflicting constraints never fail. When independent extensions request a
//! cycle, the cycle is broken deterministically and a warning is logged.
//!
//! ```
//! use keystone_event::identifier::Identifier;
//! use keystone_event::phase::PhaseGraph;
//!
//! let early = Identifier::from_static("demo", "early");
//! let late = Identifier::from_static("demo", "late");
//!
//! let mut graph = PhaseGraph::new();
//! graph.add_ordering(&late, &early);
//! graph.add_ordering(&early, &late);
//!
//! // Cycles still produce a total order
//! assert_eq!(graph.resolve_order(), &[late, early]);
//! ```

use keystone_system::sorting::DependencyGraph;

use crate::identifier::Identifier;

/// The phases of one event and their ordering constraints.
#[derive(Debug, Clone, Default)]
pub struct PhaseGraph {
    graph: DependencyGraph<Identifier>,
    /// Memoised result of [`resolve_order`](Self::resolve_order).
    resolved: Option<Vec<Identifier>>,
}

/// A read-only view of one phase in a [`PhaseGraph`].
#[derive(Debug, Clone, Copy)]
pub struct PhaseNode<'a> {
    id: &'a Identifier,
    graph: &'a DependencyGraph<Identifier>,
}

impl<'a> PhaseNode<'a> {
    /// Returns the phase identifier.
    #[must_use]
    pub fn id(&self) -> &'a Identifier {
        self.id
    }

    /// Returns the phases this phase must run before.
    #[must_use]
    pub fn runs_before(&self) -> Vec<&'a Identifier> {
        self.graph.successors(self.id)
    }

    /// Returns the phases this phase must run after.
    #[must_use]
    pub fn runs_after(&self) -> Vec<&'a Identifier> {
        self.graph.predecessors(self.id)
    }
}

impl PhaseGraph {
    /// Creates a graph with no phases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the phase named `id`, creating an unconstrained one if needed.
    pub fn get_or_create_phase(&mut self, id: &Identifier) -> PhaseNode<'_> {
        let known = self.graph.len();
        let index = self.graph.add_node(id.clone());
        if self.graph.len() != known {
            self.resolved = None;
        }

        PhaseNode {
            id: &self.graph.keys()[index],
            graph: &self.graph,
        }
    }

    /// Records that `before` must run ahead of `after`.
    ///
    /// Unknown phases are created. Repeating a constraint and ordering a phase
    /// against itself are both no-ops. Returns `true` if the graph changed.
    pub fn add_ordering(&mut self, before: &Identifier, after: &Identifier) -> bool {
        if before == after {
            tracing::debug!(phase = %before, "ignoring ordering of a phase against itself");
            return self.ensure_phase(before);
        }

        let known = self.graph.len();
        let added = self.graph.add_edge(before.clone(), after.clone());
        let changed = added || self.graph.len() != known;
        if changed {
            self.resolved = None;
        }
        changed
    }

    fn ensure_phase(&mut self, id: &Identifier) -> bool {
        if self.graph.contains(id) {
            return false;
        }
        self.graph.add_node(id.clone());
        self.resolved = None;
        true
    }

    /// Returns every phase in execution order, recomputing it if stale.
    pub fn resolve_order(&mut self) -> &[Identifier] {
        let graph = &self.graph;
        self.resolved.get_or_insert_with(|| {
            let sorted = graph.sort();
            for cycle in &sorted.cycles {
                let members: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                tracing::warn!(
                    phases = ?members,
                    "phase ordering contains a cycle, falling back to a deterministic order"
                );
            }
            sorted.order
        })
    }

    /// Returns true if the memoised order is current.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Returns true if the phase exists.
    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.graph.contains(id)
    }

    /// Returns true if `before` was directly ordered ahead of `after`.
    #[must_use]
    pub fn contains_ordering(&self, before: &Identifier, after: &Identifier) -> bool {
        self.graph.contains_edge(before, after)
    }

    /// Returns the number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns true if no phase exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Returns the phases in the order they were first referenced.
    #[must_use]
    pub fn phases(&self) -> &[Identifier] {
        self.graph.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Identifier = Identifier::from_static("test", "a");
    const B: Identifier = Identifier::from_static("test", "b");
    const C: Identifier = Identifier::from_static("test", "c");

    #[test]
    fn new_phase_invalidates_order() {
        let mut graph = PhaseGraph::new();
        graph.get_or_create_phase(&A);
        assert_eq!(graph.resolve_order(), &[A]);
        assert!(graph.is_resolved());

        graph.get_or_create_phase(&A);
        assert!(graph.is_resolved());

        graph.get_or_create_phase(&B);
        assert!(!graph.is_resolved());
        assert_eq!(graph.resolve_order(), &[A, B]);
    }

    #[test]
    fn phase_node_reports_edges() {
        let mut graph = PhaseGraph::new();
        graph.add_ordering(&A, &B);
        graph.add_ordering(&C, &B);

        let b = graph.get_or_create_phase(&B);
        assert_eq!(b.id(), &B);
        assert_eq!(b.runs_after(), vec![&A, &C]);
        assert!(b.runs_before().is_empty());
    }

    #[test]
    fn duplicate_ordering_keeps_memoised_order() {
        let mut graph = PhaseGraph::new();
        assert!(graph.add_ordering(&B, &A));
        assert_eq!(graph.resolve_order(), &[B, A]);

        assert!(!graph.add_ordering(&B, &A));
        assert!(graph.is_resolved());
    }

    #[test]
    fn self_ordering_only_creates_the_phase() {
        let mut graph = PhaseGraph::new();
        assert!(graph.add_ordering(&A, &A));
        assert!(!graph.add_ordering(&A, &A));
        assert_eq!(graph.len(), 1);
        assert!(!graph.contains_ordering(&A, &A));
        assert_eq!(graph.resolve_order(), &[A]);
    }

    #[test]
    fn ordering_against_new_phase_is_a_change() {
        let mut graph = PhaseGraph::new();
        graph.get_or_create_phase(&A);
        graph.resolve_order();

        assert!(graph.add_ordering(&C, &A));
        assert_eq!(graph.phases(), &[A, C]);
        assert_eq!(graph.resolve_order(), &[C, A]);
    }

    #[test]
    fn cycle_resolves_to_total_order() {
        let mut graph = PhaseGraph::new();
        graph.add_ordering(&A, &B);
        graph.add_ordering(&B, &C);
        graph.add_ordering(&C, &A);

        let order = graph.resolve_order().to_vec();
        assert_eq!(order.len(), 3);
        assert_eq!(order, vec![A, B, C]);
    }
}
