//! The relaxed-exploration engine behind lm-cut.
//!
//! Models the delete-relaxation of a task as two index arenas: one of
//! relaxed propositions (one per fact, plus an artificial precondition and
//! an artificial goal) and one of relaxed operators. Each lm-cut iteration
//! runs an h_max exploration, marks the zero-cost goal plateau, extracts a
//! cut of positive-cost operators by a second exploration, reduces their
//! costs, and re-explores incrementally.
//!
//! The arenas, the priority queue, and the second-exploration scratch are
//! allocated once and reused across iterations and queries.

use smallvec::SmallVec;
use tracing::trace;

use crate::engine::queue::AdaptiveQueue;
use crate::errors::BuildError;
use crate::task::{validate_task_shape, Cost, OperatorId, PlanningTask};

/// Relaxed proposition id.
pub type PropId = usize;
/// Relaxed operator id.
pub type RelaxedOpId = usize;

const COST_UNREACHED: Cost = Cost::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropStatus {
    Unreached,
    Reached,
    GoalZone,
    BeforeGoalZone,
}

#[derive(Debug)]
pub(crate) struct RelaxedProposition {
    pub(crate) status: PropStatus,
    pub(crate) h_max_cost: Cost,
    /// Operators with this proposition among their preconditions.
    pub(crate) precondition_of: Vec<RelaxedOpId>,
    /// Operators with this proposition among their effects.
    pub(crate) effect_of: Vec<RelaxedOpId>,
}

impl RelaxedProposition {
    fn new() -> Self {
        RelaxedProposition {
            status: PropStatus::Unreached,
            h_max_cost: COST_UNREACHED,
            precondition_of: Vec::new(),
            effect_of: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct RelaxedOperator {
    pub(crate) preconditions: SmallVec<[PropId; 4]>,
    pub(crate) effects: SmallVec<[PropId; 4]>,
    /// `None` for the artificial goal operator, so its id can never be
    /// mistaken for a task operator.
    pub(crate) original_op_id: Option<OperatorId>,
    pub(crate) base_cost: Cost,
    /// Current cost under the accumulated cut reductions.
    pub(crate) cost: Cost,
    pub(crate) unsatisfied_preconditions: usize,
    /// The precondition that determines this operator's h_max supporter
    /// cost; `None` until all preconditions are reached.
    pub(crate) h_max_supporter: Option<PropId>,
    pub(crate) h_max_supporter_cost: Cost,
}

/// The shared engine under the lm-cut landmark factory and the
/// justification-graph factory.
pub struct LmCutEngine {
    /// Proposition id of fact `(var, value)` is `fact_offsets[var] + value`.
    fact_offsets: Vec<usize>,
    pub(crate) propositions: Vec<RelaxedProposition>,
    pub(crate) operators: Vec<RelaxedOperator>,
    pub(crate) artificial_precondition: PropId,
    pub(crate) artificial_goal: PropId,
    pub(crate) num_propositions: usize,

    priority_queue: AdaptiveQueue<PropId>,
    second_exploration_stack: Vec<PropId>,
    plateau_stack: Vec<PropId>,
    cut: Vec<RelaxedOpId>,
}

impl LmCutEngine {
    pub fn new(task: &dyn PlanningTask) -> Result<Self, BuildError> {
        validate_task_shape(task)?;

        let num_variables = task.num_variables();
        let mut fact_offsets = Vec::with_capacity(num_variables);
        let mut num_fact_props = 0;
        for var in 0..num_variables {
            fact_offsets.push(num_fact_props);
            num_fact_props += task.variable_domain_size(var);
        }
        let artificial_precondition = num_fact_props;
        let artificial_goal = num_fact_props + 1;
        let num_propositions = num_fact_props + 2;
        let mut propositions: Vec<RelaxedProposition> =
            (0..num_propositions).map(|_| RelaxedProposition::new()).collect();

        let prop_of_fact =
            |var: usize, value: usize| -> PropId { fact_offsets[var] + value };

        let mut operators = Vec::with_capacity(task.num_operators() + 1);
        for op in 0..task.num_operators() {
            let mut preconditions: SmallVec<[PropId; 4]> = task
                .operator_preconditions(op)
                .iter()
                .map(|fact| prop_of_fact(fact.var, fact.value))
                .collect();
            if preconditions.is_empty() {
                preconditions.push(artificial_precondition);
            }
            let effects: SmallVec<[PropId; 4]> = task
                .operator_effects(op)
                .iter()
                .map(|fact| prop_of_fact(fact.var, fact.value))
                .collect();
            let cost = task.operator_cost(op);
            operators.push(RelaxedOperator {
                preconditions,
                effects,
                original_op_id: Some(op),
                base_cost: cost,
                cost,
                unsatisfied_preconditions: 0,
                h_max_supporter: None,
                h_max_supporter_cost: COST_UNREACHED,
            });
        }

        // The artificial goal operator requires all goal facts and achieves
        // the artificial goal at cost 0.
        let mut goal_preconditions: SmallVec<[PropId; 4]> = task
            .goal_facts()
            .iter()
            .map(|fact| prop_of_fact(fact.var, fact.value))
            .collect();
        if goal_preconditions.is_empty() {
            goal_preconditions.push(artificial_precondition);
        }
        operators.push(RelaxedOperator {
            preconditions: goal_preconditions,
            effects: SmallVec::from_slice(&[artificial_goal]),
            original_op_id: None,
            base_cost: 0,
            cost: 0,
            unsatisfied_preconditions: 0,
            h_max_supporter: None,
            h_max_supporter_cost: COST_UNREACHED,
        });

        // Cross-reference operators and propositions.
        for (op_id, op) in operators.iter().enumerate() {
            for &pre in &op.preconditions {
                propositions[pre].precondition_of.push(op_id);
            }
            for &eff in &op.effects {
                propositions[eff].effect_of.push(op_id);
            }
        }

        Ok(LmCutEngine {
            fact_offsets,
            propositions,
            operators,
            artificial_precondition,
            artificial_goal,
            num_propositions,
            priority_queue: AdaptiveQueue::new(),
            second_exploration_stack: Vec::new(),
            plateau_stack: Vec::new(),
            cut: Vec::new(),
        })
    }

    pub(crate) fn fact_prop(&self, var: usize, value: usize) -> PropId {
        self.fact_offsets[var] + value
    }

    fn enqueue_if_necessary(&mut self, prop: PropId, cost: Cost) {
        let proposition = &mut self.propositions[prop];
        if proposition.status == PropStatus::Unreached || proposition.h_max_cost > cost {
            proposition.status = PropStatus::Reached;
            proposition.h_max_cost = cost;
            self.priority_queue.push(cost as usize, prop);
        }
    }

    fn setup_exploration_queue(&mut self) {
        self.priority_queue.clear();
        for proposition in &mut self.propositions {
            proposition.status = PropStatus::Unreached;
        }
        for op in &mut self.operators {
            op.unsatisfied_preconditions = op.preconditions.len();
            op.h_max_supporter = None;
            op.h_max_supporter_cost = COST_UNREACHED;
        }
    }

    fn setup_exploration_queue_state(&mut self, state: &[usize]) {
        for (var, &value) in state.iter().enumerate() {
            let prop = self.fact_prop(var, value);
            self.enqueue_if_necessary(prop, 0);
        }
        let artificial_precondition = self.artificial_precondition;
        self.enqueue_if_necessary(artificial_precondition, 0);
    }

    /// Full h_max Dijkstra from `state`.
    pub(crate) fn first_exploration(&mut self, state: &[usize]) {
        debug_assert!(self.priority_queue.is_empty());
        self.setup_exploration_queue();
        self.setup_exploration_queue_state(state);
        while let Some((popped_cost, prop)) = self.priority_queue.pop() {
            let prop_cost = self.propositions[prop].h_max_cost;
            debug_assert!(prop_cost as usize <= popped_cost);
            if (prop_cost as usize) < popped_cost {
                continue;
            }
            for i in 0..self.propositions[prop].precondition_of.len() {
                let op_id = self.propositions[prop].precondition_of[i];
                let op = &mut self.operators[op_id];
                op.unsatisfied_preconditions -= 1;
                if op.unsatisfied_preconditions == 0 {
                    // The last precondition to arrive carries the maximal
                    // cost, so it is the h_max supporter.
                    op.h_max_supporter = Some(prop);
                    op.h_max_supporter_cost = prop_cost;
                    let target_cost = prop_cost + op.cost;
                    for j in 0..self.operators[op_id].effects.len() {
                        let effect = self.operators[op_id].effects[j];
                        self.enqueue_if_necessary(effect, target_cost);
                    }
                }
            }
        }
    }

    fn update_h_max_supporter(&mut self, op_id: RelaxedOpId) {
        let op = &self.operators[op_id];
        debug_assert_eq!(op.unsatisfied_preconditions, 0);
        let supporter = op
            .preconditions
            .iter()
            .copied()
            .max_by_key(|&pre| self.propositions[pre].h_max_cost)
            .expect("operators have at least one precondition");
        let cost = self.propositions[supporter].h_max_cost;
        let op = &mut self.operators[op_id];
        op.h_max_supporter = Some(supporter);
        op.h_max_supporter_cost = cost;
    }

    /// Re-explores after the operators in the cut got cheaper. Only
    /// propagates where an h_max supporter actually improved.
    pub(crate) fn first_exploration_incremental(&mut self) {
        debug_assert!(self.priority_queue.is_empty());
        // Pretend the queue has seen as many pushes as there are
        // propositions so it stays bucket-backed through the incremental
        // rounds of unit-cost tasks.
        self.priority_queue.add_virtual_pushes(self.num_propositions);
        for i in 0..self.cut.len() {
            let op_id = self.cut[i];
            let op = &self.operators[op_id];
            let cost = op.h_max_supporter_cost + op.cost;
            for j in 0..self.operators[op_id].effects.len() {
                let effect = self.operators[op_id].effects[j];
                self.enqueue_if_necessary(effect, cost);
            }
        }
        while let Some((popped_cost, prop)) = self.priority_queue.pop() {
            let prop_cost = self.propositions[prop].h_max_cost;
            if (prop_cost as usize) < popped_cost {
                continue;
            }
            for i in 0..self.propositions[prop].precondition_of.len() {
                let op_id = self.propositions[prop].precondition_of[i];
                if self.operators[op_id].h_max_supporter != Some(prop) {
                    continue;
                }
                let old_supporter_cost = self.operators[op_id].h_max_supporter_cost;
                if old_supporter_cost > prop_cost {
                    self.update_h_max_supporter(op_id);
                    let new_supporter_cost = self.operators[op_id].h_max_supporter_cost;
                    if new_supporter_cost != old_supporter_cost {
                        debug_assert!(new_supporter_cost < old_supporter_cost);
                        let target_cost = new_supporter_cost + self.operators[op_id].cost;
                        for j in 0..self.operators[op_id].effects.len() {
                            let effect = self.operators[op_id].effects[j];
                            self.enqueue_if_necessary(effect, target_cost);
                        }
                    }
                }
            }
        }
    }

    /// Marks every proposition backward-reachable from the artificial goal
    /// through zero-cost achievers as part of the goal zone.
    pub(crate) fn mark_goal_plateau(&mut self) {
        debug_assert!(self.plateau_stack.is_empty());
        let mut stack = std::mem::take(&mut self.plateau_stack);
        stack.push(self.artificial_goal);
        while let Some(prop) = stack.pop() {
            if self.propositions[prop].status == PropStatus::GoalZone {
                continue;
            }
            self.propositions[prop].status = PropStatus::GoalZone;
            for i in 0..self.propositions[prop].effect_of.len() {
                let achiever = self.propositions[prop].effect_of[i];
                if self.operators[achiever].cost == 0 {
                    // The supporter can be unset when a zero-cost achiever
                    // is relaxed-unreachable; such branches end here.
                    if let Some(supporter) = self.operators[achiever].h_max_supporter {
                        stack.push(supporter);
                    }
                }
            }
        }
        self.plateau_stack = stack;
    }

    /// DFS along h_max supporters from the initial facts; operators whose
    /// effect touches the goal zone form the cut.
    pub(crate) fn second_exploration(&mut self, state: &[usize]) {
        debug_assert!(self.second_exploration_stack.is_empty());
        debug_assert!(self.cut.is_empty());
        let mut stack = std::mem::take(&mut self.second_exploration_stack);

        let artificial_precondition = self.artificial_precondition;
        self.propositions[artificial_precondition].status = PropStatus::BeforeGoalZone;
        stack.push(artificial_precondition);
        for (var, &value) in state.iter().enumerate() {
            let prop = self.fact_prop(var, value);
            self.propositions[prop].status = PropStatus::BeforeGoalZone;
            stack.push(prop);
        }

        while let Some(prop) = stack.pop() {
            for i in 0..self.propositions[prop].precondition_of.len() {
                let op_id = self.propositions[prop].precondition_of[i];
                if self.operators[op_id].h_max_supporter != Some(prop) {
                    continue;
                }
                let reached_goal_zone = self.operators[op_id]
                    .effects
                    .iter()
                    .any(|&effect| self.propositions[effect].status == PropStatus::GoalZone);
                if reached_goal_zone {
                    debug_assert!(self.operators[op_id].cost > 0);
                    self.cut.push(op_id);
                } else {
                    for j in 0..self.operators[op_id].effects.len() {
                        let effect = self.operators[op_id].effects[j];
                        if self.propositions[effect].status != PropStatus::BeforeGoalZone {
                            debug_assert_eq!(
                                self.propositions[effect].status,
                                PropStatus::Reached
                            );
                            self.propositions[effect].status = PropStatus::BeforeGoalZone;
                            stack.push(effect);
                        }
                    }
                }
            }
        }
        self.second_exploration_stack = stack;
    }

    pub(crate) fn reset_costs(&mut self) {
        for op in &mut self.operators {
            op.cost = op.base_cost;
        }
    }

    pub(crate) fn goal_unreached(&self) -> bool {
        self.propositions[self.artificial_goal].status == PropStatus::Unreached
    }

    pub(crate) fn goal_h_max(&self) -> Cost {
        self.propositions[self.artificial_goal].h_max_cost
    }

    /// Reduces the cut operators' costs by the cut's minimum cost and
    /// returns `(sorted original operator ids, minimum cost)`.
    pub(crate) fn reduce_cut_costs(&mut self) -> (Vec<OperatorId>, Cost) {
        debug_assert!(!self.cut.is_empty(), "cut must be non-empty");
        let cut_cost = self
            .cut
            .iter()
            .map(|&op| self.operators[op].cost)
            .min()
            .expect("cut is non-empty");
        debug_assert!(cut_cost > 0);
        let mut landmark: Vec<OperatorId> = Vec::with_capacity(self.cut.len());
        for &op_id in &self.cut {
            landmark.push(
                self.operators[op_id]
                    .original_op_id
                    .expect("the artificial goal operator has cost 0 and cannot be cut"),
            );
        }
        for &op_id in &self.cut {
            self.operators[op_id].cost -= cut_cost;
        }
        landmark.sort_unstable();
        landmark.dedup();
        (landmark, cut_cost)
    }

    /// Resets the per-iteration zone markings; everything that was part of
    /// a zone is still reached.
    pub(crate) fn reset_zone_markings(&mut self) {
        for proposition in &mut self.propositions {
            if proposition.status == PropStatus::GoalZone
                || proposition.status == PropStatus::BeforeGoalZone
            {
                proposition.status = PropStatus::Reached;
            }
        }
        self.cut.clear();
    }

    /// Runs lm-cut from `state`, invoking `callback` with each landmark
    /// (sorted original operator ids) and its cost. Returns `true` iff the
    /// relaxed goal is unreachable, in which case no landmark is produced.
    pub fn compute_landmarks(
        &mut self,
        state: &[usize],
        mut callback: impl FnMut(&[OperatorId], Cost),
    ) -> bool {
        self.reset_costs();
        self.first_exploration(state);
        if self.goal_unreached() {
            return true;
        }
        let mut iterations = 0;
        while self.goal_h_max() != 0 {
            self.mark_goal_plateau();
            self.second_exploration(state);
            let (landmark, cut_cost) = self.reduce_cut_costs();
            callback(&landmark, cut_cost);
            self.first_exploration_incremental();
            self.reset_zone_markings();
            iterations += 1;
        }
        trace!(iterations, "lm-cut finished");
        false
    }
}
