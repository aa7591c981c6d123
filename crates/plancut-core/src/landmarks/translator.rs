//! Translation of fact-landmark graphs into disjunctive action landmark
//! graphs.
//!
//! A delete-relaxation landmark generator (external to this crate) produces
//! landmarks over *facts* with typed orderings. Each fact landmark becomes a
//! node holding its possible achievers; orderings carry over as strong for
//! natural-or-stronger types and weak for reasonable ones. Orderings whose
//! endpoint action sets overlap are dropped: one shared operator would
//! resolve both landmarks and the ordering in a single step, a special case
//! the progression rules cannot exploit.

use crate::landmarks::graph::{DisjunctiveActionLandmarkGraph, OrderingType};
use crate::task::{FactPair, OperatorId};

/// Ordering types of fact-landmark graphs, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FactOrderingKind {
    Reasonable,
    Natural,
    GreedyNecessary,
    Necessary,
}

/// A landmark over facts: disjunctive (some fact must hold) by default,
/// conjunctive (all facts must hold) when flagged.
#[derive(Debug, Clone)]
pub struct FactLandmark {
    pub facts: Vec<FactPair>,
    pub conjunctive: bool,
    /// Operators with an effect that can make the landmark true.
    pub possible_achievers: Vec<OperatorId>,
}

impl FactLandmark {
    pub fn is_true_in_state(&self, state: &[usize]) -> bool {
        let holds = |fact: &FactPair| state[fact.var] == fact.value;
        if self.conjunctive {
            self.facts.iter().all(holds)
        } else {
            self.facts.iter().any(holds)
        }
    }
}

#[derive(Debug, Clone)]
pub struct FactLandmarkNode {
    pub landmark: FactLandmark,
    /// Orderings `self -> child`.
    pub children: Vec<(usize, FactOrderingKind)>,
}

/// The fact-landmark graph handed over by the external generator.
#[derive(Debug, Clone, Default)]
pub struct FactLandmarkGraph {
    pub nodes: Vec<FactLandmarkNode>,
}

impl FactLandmarkGraph {
    fn parent_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.nodes.len()];
        for node in &self.nodes {
            for &(child, _) in &node.children {
                counts[child] += 1;
            }
        }
        counts
    }
}

/// Converts `fact_graph` into a disjunctive action landmark graph relative
/// to `initial_state`.
///
/// Fact landmarks already true initially are skipped unless they have
/// parents (their orderings may still matter for cycles). Single-fact goal
/// landmarks are recorded as goal achievers; greedy-necessary orderings are
/// recorded as precondition achievers for the status manager.
pub fn translate_fact_landmark_graph(
    fact_graph: &FactLandmarkGraph,
    initial_state: &[usize],
    goal_facts: &[FactPair],
) -> DisjunctiveActionLandmarkGraph {
    let mut graph = DisjunctiveActionLandmarkGraph::new();
    let parent_counts = fact_graph.parent_counts();

    // Node pass.
    let mut fact_to_action_lm: Vec<Option<usize>> = Vec::with_capacity(fact_graph.nodes.len());
    for (index, node) in fact_graph.nodes.iter().enumerate() {
        if !node.landmark.is_true_in_state(initial_state) || parent_counts[index] > 0 {
            let id = graph.add_node(node.landmark.possible_achievers.clone(), false);
            fact_to_action_lm.push(Some(id));
            if let [fact] = node.landmark.facts[..] {
                if goal_facts.contains(&fact) {
                    graph.set_goal_achiever(fact, id);
                }
            }
        } else {
            fact_to_action_lm.push(None);
        }
    }

    // Edge pass.
    for (index, node) in fact_graph.nodes.iter().enumerate() {
        if node.landmark.is_true_in_state(initial_state) {
            // Orderings out of initially true facts are already resolved.
            continue;
        }
        let from_id = fact_to_action_lm[index].expect("initially false landmarks were added");
        for &(child, kind) in &node.children {
            let to_id =
                fact_to_action_lm[child].expect("ordered landmarks have parents and were added");
            if graph.landmarks_overlap(from_id, to_id) {
                continue;
            }
            let ordering = if kind >= FactOrderingKind::Natural {
                OrderingType::Strong
            } else {
                OrderingType::Weak
            };
            graph.add_edge(from_id, to_id, ordering);
            if kind == FactOrderingKind::GreedyNecessary {
                graph.add_precondition_achiever(
                    fact_graph.nodes[index].landmark.facts.clone(),
                    from_id,
                    to_id,
                );
            }
        }
    }

    graph
}
