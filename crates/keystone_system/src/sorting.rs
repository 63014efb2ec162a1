//! Dependency ordering shared by plugins and event phases.
//!
//! [`DependencyGraph`] records keyed nodes in first-insertion order together
//! with `before -> after` edges. [`DependencyGraph::sort`] produces a total
//! order over every node and never fails: cycles are reported next to the
//! order, and each caller decides whether they are fatal. The server treats a
//! plugin cycle as a build error, while event phases tolerate them.
//!
//! # Algorithm
//!
//! 1. Strongly connected components are found with an iterative Tarjan pass.
//! 2. The component DAG is sorted with Kahn's algorithm. Whenever several
//!    components are ready, the one holding the earliest-inserted node wins.
//! 3. A component with more than one node is a cycle. Its members are placed
//!    by running Kahn's algorithm on the component's internal edges; when no
//!    member is ready, the member with the lowest remaining in-degree is
//!    forced, ties going to insertion order.
//!
//! Nodes that merely depend on a cycle are placed after the whole cycle.
//!
//! # Example
//!
//! ```
//! use keystone_system::sorting::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_edge("early", "default");
//! graph.add_edge("default", "late");
//!
//! let sorted = graph.sort();
//! assert_eq!(sorted.order, vec!["early", "default", "late"]);
//! assert!(sorted.is_acyclic());
//! ```

use core::hash::Hash;
use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

// ─────────────────────────────────────────────────────────────────────────────
// SortedNodes
// ─────────────────────────────────────────────────────────────────────────────

/// Result of [`DependencyGraph::sort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedNodes<K> {
    /// Every node of the graph, exactly once.
    pub order: Vec<K>,
    /// Each cycle that had to be broken, members in insertion order.
    ///
    /// Cycles appear in the order they were placed.
    pub cycles: Vec<Vec<K>>,
}

impl<K> SortedNodes<K> {
    /// Returns true if every edge of the graph is honored by [`order`](Self::order).
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DependencyGraph
// ─────────────────────────────────────────────────────────────────────────────

/// A directed graph of ordering constraints between keyed nodes.
///
/// Nodes are only ever added. An edge `before -> after` states that `before`
/// must be placed ahead of `after`. Duplicate edges and self-edges are
/// accepted and ignored.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    /// Node keys in first-insertion order. The position is the node index.
    keys: Vec<K>,
    /// Maps key to node index.
    index: HashMap<K, usize>,
    /// Outgoing edges per node, in insertion order.
    successors: Vec<Vec<usize>>,
    /// Incoming edges per node, in insertion order.
    predecessors: Vec<Vec<usize>>,
    /// Edge set for duplicate detection.
    edges: HashSet<(usize, usize)>,
}

impl<K> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            index: HashMap::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            edges: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> DependencyGraph<K> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node if it is not present yet and returns its insertion index.
    pub fn add_node(&mut self, key: K) -> usize {
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }

        let node = self.keys.len();
        self.index.insert(key.clone(), node);
        self.keys.push(key);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        node
    }

    /// Records that `before` must be placed ahead of `after`.
    ///
    /// Missing nodes are created. Returns `false` when the edge already
    /// existed or when both keys are the same node.
    pub fn add_edge(&mut self, before: K, after: K) -> bool {
        let from = self.add_node(before);
        let to = self.add_node(after);

        if from == to || !self.edges.insert((from, to)) {
            return false;
        }

        self.successors[from].push(to);
        self.predecessors[to].push(from);
        true
    }

    /// Returns the insertion index of `key`, if present.
    #[must_use]
    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Returns true if the graph contains `key`.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns true if the edge `before -> after` was recorded.
    #[must_use]
    pub fn contains_edge(&self, before: &K, after: &K) -> bool {
        match (self.index_of(before), self.index_of(after)) {
            (Some(from), Some(to)) => self.edges.contains(&(from, to)),
            _ => false,
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the node keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Returns the nodes that `key` must be placed ahead of.
    #[must_use]
    pub fn successors(&self, key: &K) -> Vec<&K> {
        self.neighbours(key, &self.successors)
    }

    /// Returns the nodes that must be placed ahead of `key`.
    #[must_use]
    pub fn predecessors(&self, key: &K) -> Vec<&K> {
        self.neighbours(key, &self.predecessors)
    }

    fn neighbours<'a>(&'a self, key: &K, adjacency: &'a [Vec<usize>]) -> Vec<&'a K> {
        self.index_of(key)
            .map(|node| adjacency[node].iter().map(|&n| &self.keys[n]).collect())
            .unwrap_or_default()
    }

    /// Produces a deterministic total order over every node.
    ///
    /// The order is a topological order whenever the graph is acyclic. See
    /// the [module documentation](self) for how cycles are broken.
    #[must_use]
    pub fn sort(&self) -> SortedNodes<K> {
        let component = strongly_connected_components(&self.successors);
        let component_count = component.iter().max().map_or(0, |max| max + 1);

        // Members are pushed in index order, so `members[c][0]` is the
        // earliest-inserted node of each component.
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); component_count];
        for (node, &c) in component.iter().enumerate() {
            members[c].push(node);
        }

        let mut component_successors: Vec<Vec<usize>> = vec![Vec::new(); component_count];
        let mut in_degree = vec![0usize; component_count];
        let mut seen = HashSet::new();
        for (from, successors) in self.successors.iter().enumerate() {
            for &to in successors {
                let (from_c, to_c) = (component[from], component[to]);
                if from_c != to_c && seen.insert((from_c, to_c)) {
                    component_successors[from_c].push(to_c);
                    in_degree[to_c] += 1;
                }
            }
        }

        // Kahn's algorithm over the component DAG, keyed by earliest member
        let mut ready: BTreeSet<(usize, usize)> = (0..component_count)
            .filter(|&c| in_degree[c] == 0)
            .map(|c| (members[c][0], c))
            .collect();

        let mut order = Vec::with_capacity(self.keys.len());
        let mut cycles = Vec::new();

        while let Some((_, c)) = ready.pop_first() {
            let group = &members[c];
            if let [single] = group.as_slice() {
                order.push(self.keys[*single].clone());
            } else {
                cycles.push(group.iter().map(|&n| self.keys[n].clone()).collect());
                order.extend(
                    self.place_cycle(group, &component, c)
                        .into_iter()
                        .map(|n| self.keys[n].clone()),
                );
            }

            for &next in &component_successors[c] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert((members[next][0], next));
                }
            }
        }

        SortedNodes { order, cycles }
    }

    /// Orders the members of one strongly connected component.
    fn place_cycle(&self, group: &[usize], component: &[usize], c: usize) -> Vec<usize> {
        let mut remaining: HashMap<usize, usize> = group
            .iter()
            .map(|&node| {
                let internal = self.predecessors[node]
                    .iter()
                    .filter(|&&p| component[p] == c)
                    .count();
                (node, internal)
            })
            .collect();

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&node, _)| node)
            .collect();

        let mut placed = Vec::with_capacity(group.len());

        while !remaining.is_empty() {
            let forced = || {
                remaining
                    .iter()
                    .min_by_key(|&(&node, &degree)| (degree, node))
                    .map(|(&node, _)| node)
            };
            let Some(node) = ready.pop_first().or_else(forced) else {
                break;
            };

            remaining.remove(&node);
            placed.push(node);

            for &next in &self.successors[node] {
                if let Some(degree) = remaining.get_mut(&next) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        placed
    }
}

/// Assigns a component number to every node (iterative Tarjan).
fn strongly_connected_components(successors: &[Vec<usize>]) -> Vec<usize> {
    const UNVISITED: usize = usize::MAX;

    let n = successors.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut component = vec![UNVISITED; n];
    let mut stack: Vec<usize> = Vec::new();
    // (node, position of the next successor to visit)
    let mut frames: Vec<(usize, usize)> = Vec::new();
    let mut next_index = 0;
    let mut next_component = 0;

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;

            if let Some(&next) = successors[node].get(frame.1) {
                frame.1 += 1;
                if index[next] == UNVISITED {
                    index[next] = next_index;
                    lowlink[next] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next] = true;
                    frames.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }

            if lowlink[node] == index[node] {
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component[member] = next_component;
                    if member == node {
                        break;
                    }
                }
                next_component += 1;
            }
        }
    }

    component
}
