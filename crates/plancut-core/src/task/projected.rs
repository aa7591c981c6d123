//! A task view restricted to a pattern of variables.
//!
//! Variables are renumbered to their positions in the pattern; preconditions,
//! effects and goals are filtered down to pattern variables. Costs and
//! operator identity are untouched, so operator ids remain valid in the
//! parent task.

use crate::task::{Cost, FactList, FactPair, OperatorId, PlanningTask};

pub struct ProjectedTask<'a> {
    parent: &'a dyn PlanningTask,
    pattern: Vec<usize>,
    goals: Vec<FactPair>,
    operator_preconditions: Vec<FactList>,
    operator_effects: Vec<FactList>,
}

impl<'a> ProjectedTask<'a> {
    /// Restricts `parent` to the variables of `pattern`.
    ///
    /// The caller is responsible for having validated the parent's shape;
    /// the projection itself cannot introduce axioms or conditional effects.
    pub fn new(parent: &'a dyn PlanningTask, pattern: &[usize]) -> Self {
        let mut parent_var_to_local = vec![None; parent.num_variables()];
        for (local, &var) in pattern.iter().enumerate() {
            parent_var_to_local[var] = Some(local);
        }
        // Renumbering can reorder facts when the pattern is not ascending,
        // so the localized lists are re-sorted to keep the trait contract.
        let localize = |facts: &[FactPair]| -> FactList {
            let mut localized: FactList = facts
                .iter()
                .filter_map(|fact| {
                    parent_var_to_local[fact.var]
                        .map(|local| FactPair::new(local, fact.value))
                })
                .collect();
            localized.sort();
            localized
        };

        let goals = localize(parent.goal_facts()).into_vec();
        let num_operators = parent.num_operators();
        let mut operator_preconditions = Vec::with_capacity(num_operators);
        let mut operator_effects = Vec::with_capacity(num_operators);
        for op in 0..num_operators {
            operator_preconditions.push(localize(parent.operator_preconditions(op)));
            operator_effects.push(localize(parent.operator_effects(op)));
        }

        ProjectedTask {
            parent,
            pattern: pattern.to_vec(),
            goals,
            operator_preconditions,
            operator_effects,
        }
    }

    pub fn pattern(&self) -> &[usize] {
        &self.pattern
    }

    /// Converts a parent-task state into this projection's variable order.
    pub fn project_state(&self, parent_values: &[usize]) -> Vec<usize> {
        self.pattern.iter().map(|&var| parent_values[var]).collect()
    }
}

impl PlanningTask for ProjectedTask<'_> {
    fn num_variables(&self) -> usize {
        self.pattern.len()
    }

    fn variable_domain_size(&self, var: usize) -> usize {
        self.parent.variable_domain_size(self.pattern[var])
    }

    fn num_operators(&self) -> usize {
        self.operator_preconditions.len()
    }

    fn operator_preconditions(&self, op: OperatorId) -> &[FactPair] {
        &self.operator_preconditions[op]
    }

    fn operator_effects(&self, op: OperatorId) -> &[FactPair] {
        &self.operator_effects[op]
    }

    fn operator_cost(&self, op: OperatorId) -> Cost {
        self.parent.operator_cost(op)
    }

    fn goal_facts(&self) -> &[FactPair] {
        &self.goals
    }

    fn initial_state_values(&self) -> Vec<usize> {
        self.project_state(&self.parent.initial_state_values())
    }
}
