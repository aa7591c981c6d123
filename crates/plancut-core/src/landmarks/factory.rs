//! Landmark-graph factories.
//!
//! A factory turns a task into a disjunctive action landmark graph. Three
//! variants exist: cuts over abstractions (projections or lm-cut
//! justification graphs), plain lm-cut landmarks, and translation of an
//! externally produced fact-landmark graph.

use tracing::{debug, info};

use crate::engine::abstraction::Abstraction;
use crate::engine::cuts::{compute_backward_landmarks, compute_forward_landmarks};
use crate::engine::lmcut::LmCutEngine;
use crate::engine::projection::{create_abstraction, systematic_patterns};
use crate::errors::BuildError;
use crate::landmarks::graph::DisjunctiveActionLandmarkGraph;
use crate::landmarks::translator::{translate_fact_landmark_graph, FactLandmarkGraph};
use crate::task::cost_adapted::{CostAdaptedTask, OperatorCost};
use crate::task::{validate_task_shape, PlanningTask};

/// Options of [`AbstractionCutFactory`], mirroring its planner-side
/// configuration surface.
#[derive(Debug, Clone)]
pub struct AbstractionCutOptions {
    /// Patterns to project onto; `None` selects all variable subsets of
    /// size at most 2. Ignored when `justification_graph` is set.
    pub patterns: Option<Vec<Vec<usize>>>,
    /// Emit backward landmarks.
    pub backward_lms: bool,
    /// Emit forward landmarks.
    pub forward_lms: bool,
    /// Cut over lm-cut justification graphs instead of projections.
    pub justification_graph: bool,
    /// Only capture the first lm-cut iteration's justification graph.
    pub single_justification_graph: bool,
    /// Cost transformation applied before building abstractions.
    pub transform: OperatorCost,
}

impl Default for AbstractionCutOptions {
    fn default() -> Self {
        AbstractionCutOptions {
            patterns: None,
            backward_lms: true,
            forward_lms: false,
            justification_graph: true,
            single_justification_graph: false,
            transform: OperatorCost::Normal,
        }
    }
}

/// Builds abstractions once, then derives a landmark graph per query state.
pub struct AbstractionCutFactory {
    abstractions: Vec<Abstraction>,
    backward_lms: bool,
    forward_lms: bool,
    justification_graph: bool,
    /// Set when the relaxed goal was unreachable at construction; every
    /// produced graph is then a dead end.
    dead_end_at_init: bool,
}

impl AbstractionCutFactory {
    pub fn new(
        task: &dyn PlanningTask,
        options: AbstractionCutOptions,
    ) -> Result<Self, BuildError> {
        validate_task_shape(task)?;
        let transformed = CostAdaptedTask::new(task, options.transform);
        let task: &dyn PlanningTask = &transformed;

        let mut abstractions = Vec::new();
        let mut dead_end_at_init = false;
        if options.justification_graph {
            let mut engine = LmCutEngine::new(task)?;
            match engine.compute_justification_graphs(
                &task.initial_state_values(),
                options.single_justification_graph,
            ) {
                Some(graphs) => abstractions = graphs,
                None => dead_end_at_init = true,
            }
        } else {
            let patterns = match options.patterns {
                Some(patterns) => patterns,
                None => systematic_patterns(task, 2),
            };
            abstractions.reserve(patterns.len());
            for pattern in &patterns {
                abstractions.push(create_abstraction(task, pattern)?);
            }
        }
        info!(count = abstractions.len(), "built abstractions");

        Ok(AbstractionCutFactory {
            abstractions,
            backward_lms: options.backward_lms,
            forward_lms: options.forward_lms,
            justification_graph: options.justification_graph,
            dead_end_at_init,
        })
    }

    pub fn num_abstractions(&self) -> usize {
        self.abstractions.len()
    }

    /// Derives the landmark graph for `state` (a full assignment of the
    /// original task's variables).
    pub fn get_landmark_graph(&self, state: &[usize]) -> DisjunctiveActionLandmarkGraph {
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        if self.dead_end_at_init {
            graph.mark_as_dead_end();
            return graph;
        }
        for abstraction in &self.abstractions {
            let abstract_state_id = if self.justification_graph {
                // The initial node of a justification graph has id 0.
                Some(0)
            } else {
                abstraction.function.abstract_state_id(state)
            };
            let Some(abstract_state_id) = abstract_state_id else {
                graph.mark_as_dead_end();
                break;
            };
            if self.backward_lms {
                compute_backward_landmarks(abstraction, abstract_state_id, &mut graph);
            }
            if self.forward_lms {
                compute_forward_landmarks(abstraction, abstract_state_id, &mut graph);
            }
        }
        log_graph_stats(&graph);
        graph
    }

    pub fn compute_landmark_graph(
        &self,
        task: &dyn PlanningTask,
    ) -> DisjunctiveActionLandmarkGraph {
        self.get_landmark_graph(&task.initial_state_values())
    }
}

/// Landmark graphs straight from lm-cut cuts, without orderings.
#[derive(Debug, Default)]
pub struct LmCutFactory;

impl LmCutFactory {
    pub fn compute_landmark_graph(
        &self,
        task: &dyn PlanningTask,
    ) -> Result<DisjunctiveActionLandmarkGraph, BuildError> {
        let mut engine = LmCutEngine::new(task)?;
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        let dead_end = engine.compute_landmarks(&task.initial_state_values(), |ops, _cost| {
            graph.add_node(ops.to_vec(), false);
        });
        if dead_end {
            graph.mark_as_dead_end();
        } else if graph.num_landmarks() == 0 {
            // A solvable state without landmarks still gets one resolved
            // sentinel node.
            let id = graph.add_node(Vec::new(), true);
            debug_assert_eq!(id, 0);
        }
        log_graph_stats(&graph);
        Ok(graph)
    }
}

/// Dispatch over the landmark-graph factory variants.
pub enum LandmarkGraphFactory {
    AbstractionCut(AbstractionCutFactory),
    FactTranslator(FactLandmarkGraph),
    LmCut(LmCutFactory),
}

impl LandmarkGraphFactory {
    pub fn compute_landmark_graph(
        &self,
        task: &dyn PlanningTask,
    ) -> Result<DisjunctiveActionLandmarkGraph, BuildError> {
        match self {
            LandmarkGraphFactory::AbstractionCut(factory) => {
                Ok(factory.compute_landmark_graph(task))
            }
            LandmarkGraphFactory::FactTranslator(fact_graph) => {
                let graph = translate_fact_landmark_graph(
                    fact_graph,
                    &task.initial_state_values(),
                    task.goal_facts(),
                );
                log_graph_stats(&graph);
                Ok(graph)
            }
            LandmarkGraphFactory::LmCut(factory) => factory.compute_landmark_graph(task),
        }
    }
}

fn log_graph_stats(graph: &DisjunctiveActionLandmarkGraph) {
    debug!(
        landmarks = graph.num_landmarks(),
        orderings = graph.num_orderings(),
        strong = graph.num_strong_orderings(),
        weak = graph.num_weak_orderings(),
        dead_end = graph.is_dead_end(),
        "landmark graph built"
    );
}
