//! Immutable CSR transition systems over abstract states.
//!
//! A transition system stores one canonical transition array plus two sorted
//! index views: `backward` (grouped by destination) and `forward` (grouped by
//! source). Within each group, zero-cost transitions come first, so the
//! zero-cost plateau walks can stop at the first non-zero-cost entry.

use std::collections::{BTreeSet, VecDeque};

/// Abstract state id, `0..num_states`.
pub type StateId = usize;
/// Label id, `0..num_labels`. One label can represent several operators.
pub type LabelId = usize;
/// Transition id; equals the transition's index in the canonical array.
pub type TransitionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub src: StateId,
    pub label: LabelId,
    pub dst: StateId,
    pub zero_cost: bool,
}

impl Transition {
    pub fn new(src: StateId, label: LabelId, dst: StateId, zero_cost: bool) -> Self {
        Transition {
            src,
            label,
            dst,
            zero_cost,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionSystem {
    pub num_states: usize,
    pub num_labels: usize,

    /// Canonical transitions; a transition's id is its index here.
    pub transitions: Vec<Transition>,
    pub goal_states: Vec<StateId>,

    /// Transition ids sorted by `(dst, !zero_cost, src)`.
    backward: Vec<TransitionId>,
    backward_offsets: Vec<usize>,
    /// Transition ids sorted by `(src, !zero_cost, dst)`.
    forward: Vec<TransitionId>,
    forward_offsets: Vec<usize>,
}

fn group_offsets(
    num_states: usize,
    sorted: &[TransitionId],
    transitions: &[Transition],
    key: impl Fn(&Transition) -> StateId,
) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(num_states + 1);
    offsets.push(0);
    let mut index = 0;
    for state in 0..num_states {
        while index < sorted.len() && key(&transitions[sorted[index]]) == state {
            index += 1;
        }
        offsets.push(index);
    }
    offsets
}

impl TransitionSystem {
    pub fn new(
        num_states: usize,
        num_labels: usize,
        transitions: Vec<Transition>,
        goal_states: Vec<StateId>,
    ) -> Self {
        debug_assert!(transitions
            .iter()
            .all(|t| t.src < num_states && t.dst < num_states && t.label < num_labels));
        debug_assert!(goal_states.iter().all(|&s| s < num_states));

        let mut backward: Vec<TransitionId> = (0..transitions.len()).collect();
        backward.sort_by_key(|&id| {
            let t = &transitions[id];
            (t.dst, !t.zero_cost, t.src)
        });
        let backward_offsets = group_offsets(num_states, &backward, &transitions, |t| t.dst);

        let mut forward: Vec<TransitionId> = (0..transitions.len()).collect();
        forward.sort_by_key(|&id| {
            let t = &transitions[id];
            (t.src, !t.zero_cost, t.dst)
        });
        let forward_offsets = group_offsets(num_states, &forward, &transitions, |t| t.src);

        TransitionSystem {
            num_states,
            num_labels,
            transitions,
            goal_states,
            backward,
            backward_offsets,
            forward,
            forward_offsets,
        }
    }

    /// Ids of transitions with `dst == state`, zero-cost first.
    pub fn incoming(&self, state: StateId) -> &[TransitionId] {
        &self.backward[self.backward_offsets[state]..self.backward_offsets[state + 1]]
    }

    /// Ids of transitions with `src == state`, zero-cost first.
    pub fn outgoing(&self, state: StateId) -> &[TransitionId] {
        &self.forward[self.forward_offsets[state]..self.forward_offsets[state + 1]]
    }

    pub fn is_goal_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.num_states];
        for &goal in &self.goal_states {
            mask[goal] = true;
        }
        mask
    }

    /// Non-zero-cost transitions into `state` whose source is not excluded.
    pub fn nonzero_cost_incoming(
        &self,
        state: StateId,
        exclude_state: &[bool],
    ) -> Vec<TransitionId> {
        self.incoming(state)
            .iter()
            .copied()
            .filter(|&id| {
                let t = &self.transitions[id];
                debug_assert_eq!(t.dst, state);
                !t.zero_cost && !exclude_state[t.src]
            })
            .collect()
    }

    /// Non-zero-cost transitions out of `state` whose destination is not
    /// excluded.
    pub fn nonzero_cost_outgoing(
        &self,
        state: StateId,
        exclude_state: &[bool],
    ) -> Vec<TransitionId> {
        self.outgoing(state)
            .iter()
            .copied()
            .filter(|&id| {
                let t = &self.transitions[id];
                debug_assert_eq!(t.src, state);
                !t.zero_cost && !exclude_state[t.dst]
            })
            .collect()
    }

    /// Adds all sources of zero-cost transitions into `state` that are not
    /// excluded. Relies on zero-cost transitions sorting first.
    pub fn zero_cost_predecessors(
        &self,
        state: StateId,
        exclude_state: &[bool],
        predecessors: &mut BTreeSet<StateId>,
    ) {
        for &id in self.incoming(state) {
            let t = &self.transitions[id];
            if !t.zero_cost {
                return;
            }
            if !exclude_state[t.src] {
                predecessors.insert(t.src);
            }
        }
    }

    /// Symmetric to [`Self::zero_cost_predecessors`] over outgoing
    /// transitions.
    pub fn zero_cost_successors(
        &self,
        state: StateId,
        exclude_state: &[bool],
        successors: &mut BTreeSet<StateId>,
    ) {
        for &id in self.outgoing(state) {
            let t = &self.transitions[id];
            if !t.zero_cost {
                return;
            }
            if !exclude_state[t.dst] {
                successors.insert(t.dst);
            }
        }
    }
}

fn compute_reachability(initial_states: &[StateId], successors: &[Vec<StateId>]) -> Vec<bool> {
    let mut reachable = vec![false; successors.len()];
    let mut queue: VecDeque<StateId> = VecDeque::new();
    for &s in initial_states {
        if !reachable[s] {
            reachable[s] = true;
            queue.push_back(s);
        }
    }
    while let Some(s) = queue.pop_front() {
        for &succ in &successors[s] {
            if !reachable[succ] {
                reachable[succ] = true;
                queue.push_back(succ);
            }
        }
    }
    reachable
}

/// A state is alive iff it is forward-reachable from the initial state and
/// backward-reachable from some goal.
pub fn compute_alive_states(ts: &TransitionSystem, initial_state: StateId) -> Vec<bool> {
    let num_states = ts.num_states;
    let mut forward_successors: Vec<Vec<StateId>> = vec![Vec::new(); num_states];
    let mut backward_successors: Vec<Vec<StateId>> = vec![Vec::new(); num_states];
    for t in &ts.transitions {
        forward_successors[t.src].push(t.dst);
        backward_successors[t.dst].push(t.src);
    }
    for adjacency in forward_successors.iter_mut().chain(&mut backward_successors) {
        adjacency.sort_unstable();
        adjacency.dedup();
    }

    let forward_reachable = compute_reachability(&[initial_state], &forward_successors);
    let backward_reachable = compute_reachability(&ts.goal_states, &backward_successors);
    (0..num_states)
        .map(|s| forward_reachable[s] && backward_reachable[s])
        .collect()
}

/// A label is alive iff some transition between alive states carries it.
pub fn compute_alive_labels(ts: &TransitionSystem, state_alive: &[bool]) -> Vec<bool> {
    let mut label_alive = vec![false; ts.num_labels];
    for t in &ts.transitions {
        if state_alive[t.src] && state_alive[t.dst] {
            label_alive[t.label] = true;
        }
    }
    label_alive
}

/// Computes the coarsened transition system that maps state `s` to
/// `new_state_ids[s]` and label `l` to `new_label_ids[l]`; states and labels
/// mapped to `None` are removed, together with their transitions.
///
/// When any label is pruned, one fresh trailing label id is reserved to group
/// the pruned operators under; it carries no transitions.
pub fn prune_transition_system(
    ts: &TransitionSystem,
    new_state_ids: &[Option<StateId>],
    new_label_ids: &[Option<LabelId>],
) -> TransitionSystem {
    let new_goal_states: Vec<StateId> = ts
        .goal_states
        .iter()
        .filter_map(|&s| new_state_ids[s])
        .collect();
    assert!(
        !new_goal_states.is_empty(),
        "pruning must preserve at least one goal state"
    );

    let new_transitions: Vec<Transition> = ts
        .transitions
        .iter()
        .filter_map(|t| {
            match (
                new_state_ids[t.src],
                new_label_ids[t.label],
                new_state_ids[t.dst],
            ) {
                (Some(src), Some(label), Some(dst)) => {
                    Some(Transition::new(src, label, dst, t.zero_cost))
                }
                _ => None,
            }
        })
        .collect();

    let num_states = new_state_ids.iter().flatten().max().map_or(0, |&s| s + 1);
    let mut num_labels = new_label_ids.iter().flatten().max().map_or(0, |&l| l + 1);
    if new_label_ids.iter().any(Option::is_none) {
        // Pruned labels are grouped under one trailing label without
        // transitions; see AbstractionFunction::coarsen.
        num_labels += 1;
    }

    TransitionSystem::new(num_states, num_labels, new_transitions, new_goal_states)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -a-> 1 -b-> 2 with a zero-cost shortcut 0 -c-> 2.
    fn diamond() -> TransitionSystem {
        TransitionSystem::new(
            3,
            3,
            vec![
                Transition::new(0, 0, 1, false),
                Transition::new(1, 1, 2, false),
                Transition::new(0, 2, 2, true),
            ],
            vec![2],
        )
    }

    #[test]
    fn test_csr_groups_match_endpoints() {
        let ts = diamond();
        for state in 0..ts.num_states {
            for &id in ts.incoming(state) {
                assert_eq!(ts.transitions[id].dst, state);
            }
            for &id in ts.outgoing(state) {
                assert_eq!(ts.transitions[id].src, state);
            }
        }
    }

    #[test]
    fn test_zero_cost_sorts_first() {
        let ts = diamond();
        let outgoing: Vec<bool> = ts
            .outgoing(0)
            .iter()
            .map(|&id| ts.transitions[id].zero_cost)
            .collect();
        assert_eq!(outgoing, vec![true, false]);
        let incoming: Vec<bool> = ts
            .incoming(2)
            .iter()
            .map(|&id| ts.transitions[id].zero_cost)
            .collect();
        assert_eq!(incoming, vec![true, false]);
    }

    #[test]
    fn test_nonzero_cost_incoming_respects_exclusion() {
        let ts = diamond();
        let none_excluded = vec![false; 3];
        let ids = ts.nonzero_cost_incoming(2, &none_excluded);
        assert_eq!(ids.len(), 1);
        assert_eq!(ts.transitions[ids[0]].src, 1);

        let exclude_one = vec![false, true, false];
        assert!(ts.nonzero_cost_incoming(2, &exclude_one).is_empty());
    }

    #[test]
    fn test_zero_cost_predecessors_stop_at_first_nonzero() {
        let ts = diamond();
        let mut predecessors = BTreeSet::new();
        ts.zero_cost_predecessors(2, &vec![false; 3], &mut predecessors);
        assert_eq!(predecessors.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_alive_states_and_labels() {
        // State 3 is unreachable, state 4 cannot reach the goal.
        let ts = TransitionSystem::new(
            5,
            3,
            vec![
                Transition::new(0, 0, 1, false),
                Transition::new(1, 1, 2, false),
                Transition::new(3, 2, 1, false),
                Transition::new(1, 2, 4, false),
            ],
            vec![2],
        );
        let alive = compute_alive_states(&ts, 0);
        assert_eq!(alive, vec![true, true, true, false, false]);
        let label_alive = compute_alive_labels(&ts, &alive);
        assert_eq!(label_alive, vec![true, true, false]);
    }

    #[test]
    fn test_prune_renumbers_and_reserves_sentinel_label() {
        let ts = TransitionSystem::new(
            5,
            3,
            vec![
                Transition::new(0, 0, 1, false),
                Transition::new(1, 1, 2, false),
                Transition::new(3, 2, 1, false),
                Transition::new(1, 2, 4, false),
            ],
            vec![2],
        );
        let alive = compute_alive_states(&ts, 0);
        let mut next = 0;
        let new_state_ids: Vec<Option<StateId>> = alive
            .iter()
            .map(|&keep| {
                keep.then(|| {
                    let id = next;
                    next += 1;
                    id
                })
            })
            .collect();
        let label_alive = compute_alive_labels(&ts, &alive);
        let mut next_label = 0;
        let new_label_ids: Vec<Option<LabelId>> = label_alive
            .iter()
            .map(|&keep| {
                keep.then(|| {
                    let id = next_label;
                    next_label += 1;
                    id
                })
            })
            .collect();

        let pruned = prune_transition_system(&ts, &new_state_ids, &new_label_ids);
        assert_eq!(pruned.num_states, 3);
        // Two surviving labels plus the pruned-labels sentinel.
        assert_eq!(pruned.num_labels, 3);
        assert_eq!(pruned.transitions.len(), 2);
        assert_eq!(pruned.goal_states, vec![2]);
        assert!(pruned.transitions.iter().all(|t| t.label < 2));
    }
}
