//! Cut-to-landmark drivers.
//!
//! Given an abstraction and a query abstract state, repeated cut extraction
//! over the zero-cost/non-zero-cost transition partition enumerates
//! disjunctive action landmarks. The backward variant sweeps from the goal
//! states towards the query state; the forward variant sweeps from the query
//! state towards the goals. Consecutive cuts are connected by weak
//! orderings.

use std::collections::BTreeSet;

use crate::engine::abstraction::Abstraction;
use crate::engine::transition_system::{StateId, TransitionId, TransitionSystem};
use crate::landmarks::graph::{DisjunctiveActionLandmarkGraph, OrderingType};
use crate::task::OperatorId;

/// `result[s]` is true iff `s` is *not* forward-reachable from
/// `abstract_state_id`. Goal states are never expanded: a plan suffix ends
/// there, so anything only reachable through a goal does not matter.
fn forward_unreachable_states(ts: &TransitionSystem, abstract_state_id: StateId) -> Vec<bool> {
    let is_goal = ts.is_goal_mask();
    let mut unreachable = vec![true; ts.num_states];
    let mut queue = Vec::new();
    unreachable[abstract_state_id] = false;
    if !is_goal[abstract_state_id] {
        queue.push(abstract_state_id);
    }
    while let Some(state) = queue.pop() {
        for &t_id in ts.outgoing(state) {
            let succ = ts.transitions[t_id].dst;
            if unreachable[succ] {
                unreachable[succ] = false;
                if !is_goal[succ] {
                    queue.push(succ);
                }
            }
        }
    }
    unreachable
}

/// Marks the frontier as part of the zone and absorbs its backward
/// zero-cost closure; the frontier grows to the full closure.
fn process_backward_frontier(
    ts: &TransitionSystem,
    frontier: &mut BTreeSet<StateId>,
    zone: &mut [bool],
) {
    for &state in frontier.iter() {
        debug_assert!(!zone[state]);
        zone[state] = true;
    }
    let mut wave: Vec<StateId> = frontier.iter().copied().collect();
    while !wave.is_empty() {
        let mut expanded = BTreeSet::new();
        for &state in &wave {
            ts.zero_cost_predecessors(state, zone, &mut expanded);
        }
        for &state in &expanded {
            zone[state] = true;
        }
        frontier.extend(expanded.iter().copied());
        wave = expanded.into_iter().collect();
    }
}

/// Symmetric to [`process_backward_frontier`] along outgoing transitions.
fn process_forward_frontier(
    ts: &TransitionSystem,
    frontier: &mut BTreeSet<StateId>,
    zone: &mut [bool],
) {
    for &state in frontier.iter() {
        debug_assert!(!zone[state]);
        zone[state] = true;
    }
    let mut wave: Vec<StateId> = frontier.iter().copied().collect();
    while !wave.is_empty() {
        let mut expanded = BTreeSet::new();
        for &state in &wave {
            ts.zero_cost_successors(state, zone, &mut expanded);
        }
        for &state in &expanded {
            zone[state] = true;
        }
        frontier.extend(expanded.iter().copied());
        wave = expanded.into_iter().collect();
    }
}

fn collect_incoming_cut(
    abstraction: &Abstraction,
    frontier: &BTreeSet<StateId>,
    zone: &[bool],
) -> (BTreeSet<OperatorId>, BTreeSet<StateId>, BTreeSet<TransitionId>) {
    let ts = &abstraction.transition_system;
    let mut operators = BTreeSet::new();
    let mut predecessors = BTreeSet::new();
    let mut transition_ids = BTreeSet::new();
    for &frontier_state in frontier {
        for t_id in ts.nonzero_cost_incoming(frontier_state, zone) {
            let transition = &ts.transitions[t_id];
            operators.extend(
                abstraction
                    .function
                    .represented_operators(transition.label)
                    .iter()
                    .copied(),
            );
            predecessors.insert(transition.src);
            transition_ids.insert(t_id);
        }
    }
    (operators, predecessors, transition_ids)
}

/// Backward sweep: disjunctive goal-directed landmarks from
/// `abstract_state_id`, added to `graph` in goal-to-state order, each new
/// landmark weakly ordered before the previous one.
pub fn compute_backward_landmarks(
    abstraction: &Abstraction,
    abstract_state_id: StateId,
    graph: &mut DisjunctiveActionLandmarkGraph,
) {
    let ts = &abstraction.transition_system;
    let mut goal_zone = forward_unreachable_states(ts, abstract_state_id);
    let mut frontier: BTreeSet<StateId> = ts
        .goal_states
        .iter()
        .copied()
        .filter(|&goal| !goal_zone[goal])
        .collect();
    process_backward_frontier(ts, &mut frontier, &mut goal_zone);

    let mut previous_lm: Option<usize> = None;
    while !goal_zone[abstract_state_id] {
        let (landmark, mut next_frontier, _) =
            collect_incoming_cut(abstraction, &frontier, &goal_zone);
        debug_assert!(!landmark.is_empty(), "cut over an alive frontier");
        process_backward_frontier(ts, &mut next_frontier, &mut goal_zone);

        let current_lm = graph.add_node(landmark.into_iter().collect(), false);
        if let Some(previous) = previous_lm {
            // The newer cut is closer to the query state and must be
            // resolved before the previous one.
            graph.add_edge(current_lm, previous, OrderingType::Weak);
        }
        previous_lm = Some(current_lm);
        frontier = next_frontier;
    }
}

/// Forward sweep: landmarks from `abstract_state_id` towards the goals,
/// added in state-to-goal order with weak orderings along the sweep.
pub fn compute_forward_landmarks(
    abstraction: &Abstraction,
    abstract_state_id: StateId,
    graph: &mut DisjunctiveActionLandmarkGraph,
) {
    let ts = &abstraction.transition_system;
    let mut init_zone = vec![false; ts.num_states];
    let mut frontier: BTreeSet<StateId> = BTreeSet::new();
    frontier.insert(abstract_state_id);
    process_forward_frontier(ts, &mut frontier, &mut init_zone);

    let mut previous_lm: Option<usize> = None;
    while ts.goal_states.iter().all(|&goal| !init_zone[goal]) {
        let mut landmark = BTreeSet::new();
        let mut next_frontier = BTreeSet::new();
        for &frontier_state in &frontier {
            for t_id in ts.nonzero_cost_outgoing(frontier_state, &init_zone) {
                let transition = &ts.transitions[t_id];
                landmark.extend(
                    abstraction
                        .function
                        .represented_operators(transition.label)
                        .iter()
                        .copied(),
                );
                next_frontier.insert(transition.dst);
            }
        }
        debug_assert!(!landmark.is_empty(), "cut over an alive frontier");
        process_forward_frontier(ts, &mut next_frontier, &mut init_zone);

        let current_lm = graph.add_node(landmark.into_iter().collect(), false);
        if let Some(previous) = previous_lm {
            graph.add_edge(previous, current_lm, OrderingType::Weak);
        }
        previous_lm = Some(current_lm);
        frontier = next_frontier;
    }
}

/// Diagnostic variant of the backward sweep that reports transition ids
/// instead of operators. Pairs `(frontier after closure, cut transitions)`
/// are returned in state-to-goal order.
pub fn compute_backward_transition_landmarks(
    abstraction: &Abstraction,
    abstract_state_id: StateId,
) -> Vec<(Vec<StateId>, Vec<TransitionId>)> {
    let ts = &abstraction.transition_system;
    let mut goal_zone = forward_unreachable_states(ts, abstract_state_id);
    let mut frontier: BTreeSet<StateId> = ts
        .goal_states
        .iter()
        .copied()
        .filter(|&goal| !goal_zone[goal])
        .collect();
    process_backward_frontier(ts, &mut frontier, &mut goal_zone);

    let mut landmarks = Vec::new();
    while !goal_zone[abstract_state_id] {
        let (_, mut next_frontier, transition_ids) =
            collect_incoming_cut(abstraction, &frontier, &goal_zone);
        process_backward_frontier(ts, &mut next_frontier, &mut goal_zone);
        landmarks.push((
            next_frontier.iter().copied().collect(),
            transition_ids.into_iter().collect(),
        ));
        frontier = next_frontier;
    }
    landmarks.reverse();
    landmarks
}
