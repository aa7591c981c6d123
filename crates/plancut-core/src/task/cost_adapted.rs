//! Operator-cost adaptation applied before building abstractions.

use crate::task::{Cost, FactPair, OperatorId, PlanningTask};

/// How operator costs are transformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperatorCost {
    /// Use the task's costs unchanged.
    #[default]
    Normal,
    /// Treat every operator as unit cost.
    One,
    /// Add one to every cost, making zero-cost operators visible to the cut
    /// engine.
    PlusOne,
}

impl OperatorCost {
    pub fn adapt(self, cost: Cost) -> Cost {
        match self {
            OperatorCost::Normal => cost,
            OperatorCost::One => 1,
            OperatorCost::PlusOne => cost + 1,
        }
    }
}

/// A task view with adapted operator costs; everything else delegates.
pub struct CostAdaptedTask<'a> {
    parent: &'a dyn PlanningTask,
    cost_type: OperatorCost,
}

impl<'a> CostAdaptedTask<'a> {
    pub fn new(parent: &'a dyn PlanningTask, cost_type: OperatorCost) -> Self {
        CostAdaptedTask { parent, cost_type }
    }
}

impl PlanningTask for CostAdaptedTask<'_> {
    fn num_variables(&self) -> usize {
        self.parent.num_variables()
    }

    fn variable_domain_size(&self, var: usize) -> usize {
        self.parent.variable_domain_size(var)
    }

    fn num_operators(&self) -> usize {
        self.parent.num_operators()
    }

    fn operator_preconditions(&self, op: OperatorId) -> &[FactPair] {
        self.parent.operator_preconditions(op)
    }

    fn operator_effects(&self, op: OperatorId) -> &[FactPair] {
        self.parent.operator_effects(op)
    }

    fn operator_cost(&self, op: OperatorId) -> Cost {
        self.cost_type.adapt(self.parent.operator_cost(op))
    }

    fn goal_facts(&self) -> &[FactPair] {
        self.parent.goal_facts()
    }

    fn initial_state_values(&self) -> Vec<usize> {
        self.parent.initial_state_values()
    }

    fn num_axioms(&self) -> usize {
        self.parent.num_axioms()
    }

    fn has_conditional_effects(&self) -> bool {
        self.parent.has_conditional_effects()
    }
}
