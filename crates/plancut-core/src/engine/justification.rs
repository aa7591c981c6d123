//! Justification-graph abstractions.
//!
//! At the start of each lm-cut iteration, the relaxed supporter graph is
//! materialised as a transition system: states are the relaxed propositions
//! reachable from the artificial precondition along h_max-supporter edges,
//! transitions carry one label per task operator, and the single goal state
//! is the artificial goal. A synthetic init transition (reserved label 0,
//! zero cost) connects the artificial precondition to every initial fact.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::engine::abstraction::{Abstraction, AbstractionFunction};
use crate::engine::lmcut::{LmCutEngine, PropId};
use crate::engine::transition_system::{StateId, Transition, TransitionSystem};
use crate::task::OperatorId;

impl LmCutEngine {
    /// BFS over the current h_max supporter edges. Proposition ids are
    /// assigned consecutively in discovery order; id 0 is the artificial
    /// precondition.
    pub(crate) fn build_justification_graph(&self, state: &[usize]) -> Abstraction {
        let mut queue: VecDeque<PropId> = VecDeque::new();
        let mut state_ids: FxHashMap<PropId, StateId> = FxHashMap::default();
        let mut transitions: Vec<Transition> = Vec::new();
        // Label 0 is reserved for the synthetic init transitions and the
        // artificial goal operator; it represents no task operator.
        let mut label_ids: FxHashMap<Option<OperatorId>, usize> = FxHashMap::default();
        label_ids.insert(None, 0);
        let mut label_mapping: Vec<Vec<OperatorId>> = vec![Vec::new()];
        let mut goal_state: Option<StateId> = None;

        fn discover(
            prop: PropId,
            state_ids: &mut FxHashMap<PropId, StateId>,
            queue: &mut VecDeque<PropId>,
        ) -> StateId {
            let next_id = state_ids.len();
            *state_ids.entry(prop).or_insert_with(|| {
                queue.push_back(prop);
                next_id
            })
        }

        let init_id = discover(self.artificial_precondition, &mut state_ids, &mut queue);
        debug_assert_eq!(init_id, 0);
        for (var, &value) in state.iter().enumerate() {
            let prop = self.fact_prop(var, value);
            let prop_id = discover(prop, &mut state_ids, &mut queue);
            transitions.push(Transition::new(init_id, 0, prop_id, true));
        }

        while let Some(prop) = queue.pop_front() {
            let src_id = state_ids[&prop];
            for &op_id in &self.propositions[prop].precondition_of {
                let op = &self.operators[op_id];
                if op.h_max_supporter != Some(prop) {
                    continue;
                }
                let label = *label_ids.entry(op.original_op_id).or_insert_with(|| {
                    let label = label_mapping.len();
                    label_mapping.push(vec![op
                        .original_op_id
                        .expect("only the artificial operator maps to label 0")]);
                    label
                });
                let zero_cost = op.base_cost == 0;
                for &effect in &op.effects {
                    let effect_id = discover(effect, &mut state_ids, &mut queue);
                    transitions.push(Transition::new(src_id, label, effect_id, zero_cost));
                    if effect == self.artificial_goal {
                        goal_state.get_or_insert(effect_id);
                    }
                }
            }
        }

        let num_states = state_ids.len();
        let num_labels = label_mapping.len();
        let goal_state =
            goal_state.expect("the artificial goal is reachable whenever h_max is finite");
        let ts = TransitionSystem::new(num_states, num_labels, transitions, vec![goal_state]);
        let alpha = AbstractionFunction::identity_at_origin(label_mapping);
        Abstraction::new(alpha, ts)
    }

    /// Runs lm-cut from `state` and captures each iteration's justification
    /// graph as an abstraction. Returns `None` when the relaxed goal is
    /// unreachable. With `single`, only the first iteration is captured.
    pub fn compute_justification_graphs(
        &mut self,
        state: &[usize],
        single: bool,
    ) -> Option<Vec<Abstraction>> {
        self.reset_costs();
        self.first_exploration(state);
        if self.goal_unreached() {
            return None;
        }
        let mut abstractions = Vec::new();
        while self.goal_h_max() != 0 {
            abstractions.push(self.build_justification_graph(state));
            if single {
                break;
            }
            self.mark_goal_plateau();
            self.second_exploration(state);
            let _ = self.reduce_cut_costs();
            self.first_exploration_incremental();
            self.reset_zone_markings();
        }
        Some(abstractions)
    }
}
