//! Projection abstractions: pattern selection, perfect-hash ranking,
//! operator grouping, transition enumeration, and dead-part pruning.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::engine::abstraction::{Abstraction, AbstractionFunction};
use crate::engine::transition_system::{
    compute_alive_labels, compute_alive_states, prune_transition_system, LabelId, StateId,
    Transition, TransitionSystem,
};
use crate::errors::BuildError;
use crate::task::projected::ProjectedTask;
use crate::task::{FactList, FactPair, OperatorId, PlanningTask};

fn rank_state(hash_multipliers: &[usize], state: &[usize]) -> usize {
    hash_multipliers
        .iter()
        .zip(state)
        .map(|(&multiplier, &value)| multiplier * value)
        .sum()
}

fn multiply_out_rec(
    partial_state: &[FactPair],
    domain_sizes: &[usize],
    state: &mut Vec<usize>,
    var: usize,
    partial_state_pos: usize,
    callback: &mut impl FnMut(&[usize]),
) {
    if var == domain_sizes.len() {
        callback(state);
    } else if partial_state_pos < partial_state.len()
        && partial_state[partial_state_pos].var == var
    {
        state[var] = partial_state[partial_state_pos].value;
        multiply_out_rec(
            partial_state,
            domain_sizes,
            state,
            var + 1,
            partial_state_pos + 1,
            callback,
        );
    } else {
        for value in 0..domain_sizes[var] {
            state[var] = value;
            multiply_out_rec(
                partial_state,
                domain_sizes,
                state,
                var + 1,
                partial_state_pos,
                callback,
            );
        }
    }
}

/// Invokes `callback` for every full assignment consistent with
/// `partial_state` (which must be sorted by variable).
fn multiply_out(
    partial_state: &[FactPair],
    domain_sizes: &[usize],
    callback: &mut impl FnMut(&[usize]),
) {
    debug_assert!(partial_state.windows(2).all(|w| w[0].var < w[1].var));
    let mut state = vec![0; domain_sizes.len()];
    multiply_out_rec(partial_state, domain_sizes, &mut state, 0, 0, callback);
}

fn rank_goal_states(
    goals: &[FactPair],
    domain_sizes: &[usize],
    hash_multipliers: &[usize],
    num_states: usize,
) -> Vec<StateId> {
    if goals.is_empty() {
        // In a projection to non-goal variables every state is a goal state.
        (0..num_states).collect()
    } else {
        let mut goal_states = Vec::new();
        multiply_out(goals, domain_sizes, &mut |state| {
            goal_states.push(rank_state(hash_multipliers, state));
        });
        goal_states
    }
}

type GroupKey = (FactList, FactList, bool);

/// Groups operators with identical projected preconditions, projected
/// effects, and zero-cost flag; each group becomes one label. Groups are
/// sorted by key so label ids are deterministic.
fn group_equivalent_operators(projection: &ProjectedTask) -> Vec<(GroupKey, Vec<OperatorId>)> {
    let mut groups: FxHashMap<GroupKey, Vec<OperatorId>> = FxHashMap::default();
    for op in 0..projection.num_operators() {
        let key = (
            projection.operator_preconditions(op).iter().copied().collect(),
            projection.operator_effects(op).iter().copied().collect(),
            projection.operator_cost(op) == 0,
        );
        groups.entry(key).or_default().push(op);
    }
    let mut groups: Vec<(GroupKey, Vec<OperatorId>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
}

fn enumerate_transitions(
    projection: &ProjectedTask,
    domain_sizes: &[usize],
    hash_multipliers: &[usize],
) -> (Vec<Transition>, Vec<Vec<OperatorId>>) {
    let mut transitions = Vec::new();
    let mut inverse_label_mapping: Vec<Vec<OperatorId>> = Vec::new();
    for ((preconditions, effects, zero_cost), operator_ids) in
        group_equivalent_operators(projection)
    {
        if effects.is_empty() {
            // Operators without effect on the pattern self-loop everywhere.
            continue;
        }
        let label: LabelId = inverse_label_mapping.len();
        inverse_label_mapping.push(operator_ids);
        multiply_out(&preconditions, domain_sizes, &mut |state| {
            let src = rank_state(hash_multipliers, state);
            let mut successor = state.to_vec();
            for eff in &effects {
                successor[eff.var] = eff.value;
            }
            let dst = rank_state(hash_multipliers, &successor);
            if src != dst {
                transitions.push(Transition::new(src, label, dst, zero_cost));
            }
        });
    }
    (transitions, inverse_label_mapping)
}

/// Builds the projection of `task` onto `pattern`, without pruning.
pub fn project_task(
    task: &dyn PlanningTask,
    pattern: &[usize],
) -> Result<Abstraction, BuildError> {
    let projection = ProjectedTask::new(task, pattern);

    let num_variables = projection.num_variables();
    let domain_sizes: Vec<usize> = (0..num_variables)
        .map(|var| projection.variable_domain_size(var))
        .collect();
    let mut num_states: usize = 1;
    let mut hash_multipliers = Vec::with_capacity(num_variables);
    for &size in &domain_sizes {
        hash_multipliers.push(num_states);
        num_states = num_states
            .checked_mul(size)
            .ok_or_else(|| BuildError::DomainTooLarge {
                pattern: pattern.to_vec(),
            })?;
    }

    let goal_states = rank_goal_states(
        projection.goal_facts(),
        &domain_sizes,
        &hash_multipliers,
        num_states,
    );

    let (transitions, inverse_label_mapping) =
        enumerate_transitions(&projection, &domain_sizes, &hash_multipliers);
    let num_labels = inverse_label_mapping.len();

    let alpha = AbstractionFunction::new(
        pattern.to_vec(),
        hash_multipliers,
        inverse_label_mapping,
    );
    let ts = TransitionSystem::new(num_states, num_labels, transitions, goal_states);
    Ok(Abstraction::new(alpha, ts))
}

/// Removes all states that are unreachable from the initial abstract state
/// or cannot reach a goal, and all labels left without transitions.
///
/// `initial_state` is a full state of the *original* task. Fails with
/// [`BuildError::UnsolvableTask`] when the initial abstract state itself is
/// dead.
pub fn prune_dead_parts(
    abstraction: Abstraction,
    initial_state: &[usize],
) -> Result<Abstraction, BuildError> {
    let Abstraction {
        function,
        transition_system: ts,
    } = abstraction;
    let initial_id = function
        .abstract_state_id(initial_state)
        .expect("fresh projections have no pruned states");
    let state_alive = compute_alive_states(&ts, initial_id);
    if !state_alive[initial_id] {
        return Err(BuildError::UnsolvableTask);
    }

    let mut next_state = 0;
    let new_state_ids: Vec<Option<StateId>> = state_alive
        .iter()
        .map(|&alive| {
            alive.then(|| {
                let id = next_state;
                next_state += 1;
                id
            })
        })
        .collect();

    let label_alive = compute_alive_labels(&ts, &state_alive);
    let mut next_label = 0;
    let new_label_ids: Vec<Option<LabelId>> = label_alive
        .iter()
        .map(|&alive| {
            alive.then(|| {
                let id = next_label;
                next_label += 1;
                id
            })
        })
        .collect();

    debug!(
        pattern = ?function.pattern(),
        states_before = ts.num_states,
        states_after = next_state,
        labels_before = ts.num_labels,
        labels_after = next_label,
        "pruned dead parts"
    );

    let new_ts = prune_transition_system(&ts, &new_state_ids, &new_label_ids);
    let new_alpha = function.coarsen(&new_state_ids, &new_label_ids);
    Ok(Abstraction::new(new_alpha, new_ts))
}

/// Creates the projection to `pattern` with dead parts removed.
pub fn create_abstraction(
    task: &dyn PlanningTask,
    pattern: &[usize],
) -> Result<Abstraction, BuildError> {
    prune_dead_parts(project_task(task, pattern)?, &task.initial_state_values())
}

/// All non-empty variable subsets of size at most `max_size`, in
/// lexicographic order. The default pattern collection when none is given.
pub fn systematic_patterns(task: &dyn PlanningTask, max_size: usize) -> Vec<Vec<usize>> {
    let num_variables = task.num_variables();
    let mut patterns = Vec::new();
    if max_size >= 1 {
        for var in 0..num_variables {
            patterns.push(vec![var]);
        }
    }
    if max_size >= 2 {
        for first in 0..num_variables {
            for second in first + 1..num_variables {
                patterns.push(vec![first, second]);
            }
        }
    }
    patterns
}
