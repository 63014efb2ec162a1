//! Property tests for listener ordering.
//!
//! Random sequences of registrations and phase orderings are applied to an
//! [`Event`] and, in parallel, to a plain [`DependencyGraph`]. The event must
//! invoke every listener exactly once, phase by phase in the graph's order.

use std::sync::Arc;

use hashbrown::HashMap;
use keystone_event::prelude::*;
use keystone_system::sorting::DependencyGraph;
use proptest::prelude::*;

type Listener = dyn Fn(&mut Vec<usize>) + Send + Sync;

fn fan_out(listeners: &[Arc<Listener>]) -> Arc<Listener> {
    let listeners = listeners.to_vec();
    Arc::new(move |log: &mut Vec<usize>| {
        for listener in &listeners {
            listener(log);
        }
    })
}

fn invoke(event: &Event<Listener>) -> Vec<usize> {
    let mut log = Vec::new();
    (event.invoker())(&mut log);
    log
}

#[derive(Debug, Clone)]
enum Op {
    Register { phase: u8 },
    Order { before: u8, after: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(|phase| Op::Register { phase }),
        (0u8..6, 0u8..6).prop_map(|(before, after)| Op::Order { before, after }),
    ]
}

/// Phase 0 is the default phase so constraints reach it too.
fn phase_id(n: u8) -> Identifier {
    if n == 0 {
        DEFAULT_PHASE
    } else {
        Identifier::new("prop", format!("phase{n}")).unwrap()
    }
}

struct Applied {
    event: Event<Listener>,
    model: DependencyGraph<Identifier>,
    by_phase: HashMap<Identifier, Vec<usize>>,
}

fn apply(ops: &[Op]) -> Applied {
    let event: Event<Listener> = Event::new(fan_out);
    let mut model = DependencyGraph::new();
    model.add_node(DEFAULT_PHASE);
    let mut by_phase: HashMap<Identifier, Vec<usize>> = HashMap::new();
    let mut serial = 0;

    for op in ops {
        match *op {
            Op::Register { phase } => {
                let id = phase_id(phase);
                let value = serial;
                serial += 1;

                event.register_in(&id, Arc::new(move |log: &mut Vec<usize>| log.push(value)));
                model.add_node(id.clone());
                by_phase.entry(id).or_default().push(value);
            }
            Op::Order { before, after } => {
                event.add_phase_ordering(&phase_id(before), &phase_id(after));
                model.add_edge(phase_id(before), phase_id(after));
            }
        }
    }

    Applied {
        event,
        model,
        by_phase,
    }
}

fn expected(applied: &Applied) -> Vec<usize> {
    applied
        .model
        .sort()
        .order
        .iter()
        .flat_map(|phase| applied.by_phase.get(phase).into_iter().flatten().copied())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Listeners run exactly once, grouped by the resolved phase order.
    #[test]
    fn listeners_follow_resolved_phase_order(ops in prop::collection::vec(op(), 0..40)) {
        let applied = apply(&ops);

        prop_assert_eq!(applied.event.phase_order(), applied.model.sort().order);

        let log = invoke(&applied.event);
        prop_assert_eq!(&log, &expected(&applied));

        let mut seen = log.clone();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..applied.event.listener_count()).collect::<Vec<_>>());
    }

    /// Repeated invocations without mutation behave identically.
    #[test]
    fn invocation_is_deterministic(ops in prop::collection::vec(op(), 0..40)) {
        let applied = apply(&ops);
        let first = invoke(&applied.event);
        for _ in 0..5 {
            prop_assert_eq!(invoke(&applied.event), first.clone());
        }
        prop_assert!(!applied.event.is_dirty());
    }

    /// Re-declaring an existing constraint keeps the cached invoker.
    #[test]
    fn repeated_constraint_is_a_no_op(
        ops in prop::collection::vec(op(), 1..40),
        pick in any::<prop::sample::Index>(),
    ) {
        let orderings: Vec<(u8, u8)> = ops
            .iter()
            .filter_map(|op| match *op {
                Op::Order { before, after } => Some((before, after)),
                Op::Register { .. } => None,
            })
            .collect();
        prop_assume!(!orderings.is_empty());

        let applied = apply(&ops);
        let before = invoke(&applied.event);
        let cached = applied.event.invoker();

        let &(a, b) = pick.get(&orderings);
        applied.event.add_phase_ordering(&phase_id(a), &phase_id(b));

        prop_assert!(!applied.event.is_dirty());
        prop_assert!(Arc::ptr_eq(&cached, &applied.event.invoker()));
        prop_assert_eq!(invoke(&applied.event), before);
    }
}
