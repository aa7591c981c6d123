//! The minimal task contract consumed by the landmark core.
//!
//! A planning task has finite-domain variables, a single initial state, a
//! conjunctive goal, and operators with fact preconditions, one unconditional
//! effect per affected variable, and non-negative integer costs. The outer
//! planner owns parsing and preprocessing; this crate only requires the
//! operations of [`PlanningTask`].

pub mod cost_adapted;
pub mod projected;

use smallvec::SmallVec;

use crate::errors::BuildError;

/// Non-negative operator cost.
pub type Cost = u32;

/// Operator id in the original task.
pub type OperatorId = usize;

/// A fact: a variable paired with one value from its domain.
///
/// Facts order lexicographically by `(var, value)`, which is the key order
/// used for operator grouping and goal ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactPair {
    pub var: usize,
    pub value: usize,
}

impl FactPair {
    pub fn new(var: usize, value: usize) -> Self {
        FactPair { var, value }
    }
}

/// Fact lists are short in almost every benchmark domain; keep them inline.
pub type FactList = SmallVec<[FactPair; 4]>;

/// The operations the landmark core needs from the surrounding planner's
/// task representation.
///
/// Implementations must describe a task without axioms or conditional
/// effects; [`validate_task_shape`] enforces this at construction time.
pub trait PlanningTask {
    fn num_variables(&self) -> usize;
    fn variable_domain_size(&self, var: usize) -> usize;

    fn num_operators(&self) -> usize;
    /// Preconditions of `op`, sorted by `(var, value)`.
    fn operator_preconditions(&self, op: OperatorId) -> &[FactPair];
    /// Effects of `op`, sorted by variable, at most one per variable.
    fn operator_effects(&self, op: OperatorId) -> &[FactPair];
    fn operator_cost(&self, op: OperatorId) -> Cost;

    /// The conjunctive goal, sorted by `(var, value)`.
    fn goal_facts(&self) -> &[FactPair];
    /// One value per variable.
    fn initial_state_values(&self) -> Vec<usize>;

    fn num_axioms(&self) -> usize {
        0
    }
    fn has_conditional_effects(&self) -> bool {
        false
    }
}

/// Rejects tasks outside the supported shape.
///
/// Axioms and conditional effects change the semantics of projections and of
/// the delete-relaxation, so both fail construction rather than silently
/// producing unsound landmarks.
pub fn validate_task_shape(task: &dyn PlanningTask) -> Result<(), BuildError> {
    if task.num_axioms() > 0 {
        return Err(BuildError::UnsupportedTaskShape(
            "axioms are not supported".to_string(),
        ));
    }
    if task.has_conditional_effects() {
        return Err(BuildError::UnsupportedTaskShape(
            "conditional effects are not supported".to_string(),
        ));
    }
    for op in 0..task.num_operators() {
        let effects = task.operator_effects(op);
        for pair in effects.windows(2) {
            if pair[0].var == pair[1].var {
                return Err(BuildError::UnsupportedTaskShape(format!(
                    "operator {op} has two effects on variable {}",
                    pair[0].var
                )));
            }
        }
    }
    Ok(())
}

/// An operator of an [`ExplicitTask`].
#[derive(Debug, Clone)]
pub struct OperatorData {
    pub preconditions: FactList,
    pub effects: FactList,
    pub cost: Cost,
}

impl OperatorData {
    pub fn new(
        preconditions: impl IntoIterator<Item = FactPair>,
        effects: impl IntoIterator<Item = FactPair>,
        cost: Cost,
    ) -> Self {
        let mut preconditions: FactList = preconditions.into_iter().collect();
        let mut effects: FactList = effects.into_iter().collect();
        preconditions.sort();
        effects.sort();
        OperatorData {
            preconditions,
            effects,
            cost,
        }
    }
}

/// A self-contained task representation.
///
/// Embedders that already have a task facade implement [`PlanningTask`]
/// directly; `ExplicitTask` exists for construction from plain data and for
/// the test suites.
#[derive(Debug, Clone)]
pub struct ExplicitTask {
    domain_sizes: Vec<usize>,
    operators: Vec<OperatorData>,
    goals: Vec<FactPair>,
    initial_state: Vec<usize>,
}

impl ExplicitTask {
    /// Builds and validates a task.
    ///
    /// Checks variable/value bounds on every fact, the one-effect-per-variable
    /// rule, and that the initial state assigns one in-domain value per
    /// variable.
    pub fn new(
        domain_sizes: Vec<usize>,
        operators: Vec<OperatorData>,
        mut goals: Vec<FactPair>,
        initial_state: Vec<usize>,
    ) -> Result<Self, BuildError> {
        let in_bounds = |fact: &FactPair| {
            fact.var < domain_sizes.len() && fact.value < domain_sizes[fact.var]
        };
        for (op_id, op) in operators.iter().enumerate() {
            if !op.preconditions.iter().all(in_bounds) || !op.effects.iter().all(in_bounds) {
                return Err(BuildError::UnsupportedTaskShape(format!(
                    "operator {op_id} references a fact outside the variable domains"
                )));
            }
        }
        if !goals.iter().all(in_bounds) {
            return Err(BuildError::UnsupportedTaskShape(
                "goal references a fact outside the variable domains".to_string(),
            ));
        }
        if initial_state.len() != domain_sizes.len()
            || initial_state
                .iter()
                .zip(&domain_sizes)
                .any(|(&value, &size)| value >= size)
        {
            return Err(BuildError::UnsupportedTaskShape(
                "initial state does not assign one in-domain value per variable".to_string(),
            ));
        }
        goals.sort();
        let task = ExplicitTask {
            domain_sizes,
            operators,
            goals,
            initial_state,
        };
        validate_task_shape(&task)?;
        Ok(task)
    }
}

impl PlanningTask for ExplicitTask {
    fn num_variables(&self) -> usize {
        self.domain_sizes.len()
    }

    fn variable_domain_size(&self, var: usize) -> usize {
        self.domain_sizes[var]
    }

    fn num_operators(&self) -> usize {
        self.operators.len()
    }

    fn operator_preconditions(&self, op: OperatorId) -> &[FactPair] {
        &self.operators[op].preconditions
    }

    fn operator_effects(&self, op: OperatorId) -> &[FactPair] {
        &self.operators[op].effects
    }

    fn operator_cost(&self, op: OperatorId) -> Cost {
        self.operators[op].cost
    }

    fn goal_facts(&self) -> &[FactPair] {
        &self.goals
    }

    fn initial_state_values(&self) -> Vec<usize> {
        self.initial_state.clone()
    }
}
