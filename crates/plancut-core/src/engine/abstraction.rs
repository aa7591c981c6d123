//! Abstraction functions and the abstraction bundle.
//!
//! An abstraction function maps concrete states to abstract state ids via a
//! perfect hash over the pattern variables, optionally composed with a
//! compaction mapping produced by dead-part pruning. It also maps each label
//! of the abstract transition system back to the original operators the
//! label represents.

use crate::engine::transition_system::{LabelId, StateId, TransitionSystem};
use crate::task::OperatorId;

#[derive(Debug, Clone)]
pub struct AbstractionFunction {
    /// Variable ids of the original task, in hash order.
    pattern: Vec<usize>,
    /// `hash_multipliers[i]` is the product of the domain sizes of
    /// `pattern[..i]`; the perfect hash of a state is
    /// `Σ hash_multipliers[i] · state[pattern[i]]`.
    hash_multipliers: Vec<usize>,
    /// Maps perfect-hash ids to compacted abstract ids; `None` marks a
    /// pruned state. Empty means the identity mapping.
    state_mapping: Vec<Option<StateId>>,
    /// Maps each label to the non-empty set of operators it represents.
    /// Operators not represented by any label only induce self-loops and are
    /// intentionally absent. After pruning, one trailing entry may hold all
    /// pruned operators; it has no transitions.
    inverse_label_mapping: Vec<Vec<OperatorId>>,
}

impl AbstractionFunction {
    pub fn new(
        pattern: Vec<usize>,
        hash_multipliers: Vec<usize>,
        inverse_label_mapping: Vec<Vec<OperatorId>>,
    ) -> Self {
        debug_assert_eq!(pattern.len(), hash_multipliers.len());
        AbstractionFunction {
            pattern,
            hash_multipliers,
            state_mapping: Vec::new(),
            inverse_label_mapping,
        }
    }

    /// The degenerate function used for justification-graph abstractions:
    /// every concrete state maps to abstract state 0.
    pub fn identity_at_origin(inverse_label_mapping: Vec<Vec<OperatorId>>) -> Self {
        AbstractionFunction::new(Vec::new(), Vec::new(), inverse_label_mapping)
    }

    /// Coarsening constructor: composes with the state and label
    /// renumberings produced by pruning. The perfect-hash keyspace and the
    /// pattern never change.
    pub fn coarsen(
        self,
        new_state_ids: &[Option<StateId>],
        new_label_ids: &[Option<LabelId>],
    ) -> Self {
        let state_mapping: Vec<Option<StateId>> = if self.state_mapping.is_empty() {
            new_state_ids.to_vec()
        } else {
            self.state_mapping
                .iter()
                .map(|entry| entry.and_then(|id| new_state_ids[id]))
                .collect()
        };

        let num_kept = new_label_ids.iter().flatten().max().map_or(0, |&l| l + 1);
        let mut inverse_label_mapping: Vec<Vec<OperatorId>> = vec![Vec::new(); num_kept];
        let mut pruned_operators: Vec<OperatorId> = Vec::new();
        for (label, mapped) in new_label_ids.iter().enumerate() {
            let operators = &self.inverse_label_mapping[label];
            match mapped {
                Some(new_label) => {
                    inverse_label_mapping[*new_label] = operators.clone();
                }
                None => pruned_operators.extend_from_slice(operators),
            }
        }
        // All pruned operators share one trailing label.
        if !pruned_operators.is_empty() {
            inverse_label_mapping.push(pruned_operators);
        }

        AbstractionFunction {
            pattern: self.pattern,
            hash_multipliers: self.hash_multipliers,
            state_mapping,
            inverse_label_mapping,
        }
    }

    /// Maps a concrete state (full variable assignment of the original task)
    /// to its abstract state, or `None` if the state projects onto a pruned
    /// abstract state and is therefore a dead end.
    pub fn abstract_state_id(&self, state: &[usize]) -> Option<StateId> {
        let index: usize = self
            .pattern
            .iter()
            .zip(&self.hash_multipliers)
            .map(|(&var, &multiplier)| multiplier * state[var])
            .sum();
        if self.state_mapping.is_empty() {
            Some(index)
        } else {
            self.state_mapping[index]
        }
    }

    pub fn represented_operators(&self, label: LabelId) -> &[OperatorId] {
        &self.inverse_label_mapping[label]
    }

    pub fn num_labels(&self) -> usize {
        self.inverse_label_mapping.len()
    }

    pub fn pattern(&self) -> &[usize] {
        &self.pattern
    }
}

/// An abstraction exclusively owns one abstraction function and the
/// transition system it induces.
#[derive(Debug)]
pub struct Abstraction {
    pub function: AbstractionFunction,
    pub transition_system: TransitionSystem,
}

impl Abstraction {
    pub fn new(function: AbstractionFunction, transition_system: TransitionSystem) -> Self {
        Abstraction {
            function,
            transition_system,
        }
    }
}
