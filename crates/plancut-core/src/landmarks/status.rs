//! Per-state landmark status tracking.
//!
//! For every ancestor state on a search path the manager keeps two bitsets:
//! `past` (some operator of the landmark has been applied on the path) and
//! `future` (some operator is still required on every continuation). New
//! rows default to all-past/none-future; progression across transitions
//! only ever *removes* past bits and *adds* future bits, so information
//! from multiple paths to the same state intersects correctly.

use rustc_hash::FxHashMap;

use crate::landmarks::graph::{DisjunctiveActionLandmarkGraph, OrderingType};
use crate::task::OperatorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkStatus {
    Past,
    Future,
    PastAndFuture,
}

/// Progression toggles; everything defaults to enabled. The uaa progression
/// only has an effect when the graph carries uaa entries.
#[derive(Debug, Clone, Copy)]
pub struct StatusManagerOptions {
    pub progress_goals: bool,
    pub progress_greedy_necessary_orderings: bool,
    pub progress_weak_orderings: bool,
    pub uaa_progression: bool,
}

impl Default for StatusManagerOptions {
    fn default() -> Self {
        StatusManagerOptions {
            progress_goals: true,
            progress_greedy_necessary_orderings: true,
            progress_weak_orderings: true,
            uaa_progression: true,
        }
    }
}

#[derive(Debug, Clone)]
struct StatusRow {
    past: Vec<bool>,
    future: Vec<bool>,
}

pub struct DisjunctiveActionLandmarkStatusManager<'a> {
    graph: &'a DisjunctiveActionLandmarkGraph,
    options: StatusManagerOptions,
    rows: FxHashMap<Vec<usize>, StatusRow>,
}

impl<'a> DisjunctiveActionLandmarkStatusManager<'a> {
    pub fn new(graph: &'a DisjunctiveActionLandmarkGraph, options: StatusManagerOptions) -> Self {
        DisjunctiveActionLandmarkStatusManager {
            graph,
            options,
            rows: FxHashMap::default(),
        }
    }

    /// All landmarks past and none future: the neutral element for the
    /// intersection over paths.
    fn default_row(&self) -> StatusRow {
        StatusRow {
            past: vec![true; self.graph.num_landmarks()],
            future: vec![false; self.graph.num_landmarks()],
        }
    }

    fn row_mut(&mut self, state: &[usize]) -> &mut StatusRow {
        if !self.rows.contains_key(state) {
            let row = self.default_row();
            self.rows.insert(state.to_vec(), row);
        }
        self.rows.get_mut(state).expect("row was just inserted")
    }

    pub fn process_initial_state(&mut self, initial_state: &[usize]) {
        let num_landmarks = self.graph.num_landmarks();
        let mut row = StatusRow {
            past: vec![false; num_landmarks],
            future: vec![true; num_landmarks],
        };
        for id in 0..num_landmarks {
            if self.graph.is_initially_past(id) {
                row.past[id] = true;
                row.future[id] = false;
            }
        }
        if self.options.progress_weak_orderings {
            progress_weak(self.graph, &mut row);
        }
        self.rows.insert(initial_state.to_vec(), row);
    }

    pub fn process_state_transition(
        &mut self,
        parent_state: &[usize],
        op: OperatorId,
        state: &[usize],
    ) {
        let parent_row = self
            .rows
            .get(parent_state)
            .cloned()
            .unwrap_or_else(|| self.default_row());
        let options = self.options;
        let graph = self.graph;
        let row = self.row_mut(state);

        progress_basic(graph, &parent_row, row, op);
        if options.progress_goals {
            progress_goal(graph, state, row);
        }
        if options.progress_greedy_necessary_orderings {
            progress_greedy_necessary(graph, state, row);
        }
        if options.progress_weak_orderings {
            progress_weak(graph, row);
        }
        if options.uaa_progression {
            if let Some(lm) = graph.uaa_landmark_for_operator(op) {
                row.future[lm] = true;
            }
        }
    }

    pub fn get_landmark_status(&self, state: &[usize], id: usize) -> LandmarkStatus {
        debug_assert!(id < self.graph.num_landmarks());
        let (past, future) = match self.rows.get(state) {
            Some(row) => (row.past[id], row.future[id]),
            None => (true, false),
        };
        if !past {
            debug_assert!(future);
            LandmarkStatus::Future
        } else if !future {
            LandmarkStatus::Past
        } else {
            LandmarkStatus::PastAndFuture
        }
    }

    pub fn is_past(&self, state: &[usize], id: usize) -> bool {
        self.rows.get(state).map_or(true, |row| row.past[id])
    }

    pub fn is_future(&self, state: &[usize], id: usize) -> bool {
        self.rows.get(state).map_or(false, |row| row.future[id])
    }
}

/// A landmark not past at the parent stays past at the child only if the
/// applied operator belongs to it; otherwise the inherited past bit is an
/// artifact and the landmark is still future.
fn progress_basic(
    graph: &DisjunctiveActionLandmarkGraph,
    parent_row: &StatusRow,
    row: &mut StatusRow,
    op: OperatorId,
) {
    for lm in 0..graph.num_landmarks() {
        if !parent_row.past[lm] {
            debug_assert!(parent_row.future[lm]);
            if row.past[lm] && !graph.contains_action(lm, op) {
                row.past[lm] = false;
                row.future[lm] = true;
            }
        }
    }
}

/// A goal achiever whose fact does not hold is still needed.
fn progress_goal(graph: &DisjunctiveActionLandmarkGraph, state: &[usize], row: &mut StatusRow) {
    for (fact, lm) in graph.goal_achievers() {
        if state[fact.var] != fact.value {
            row.future[lm] = true;
        }
    }
}

/// While a preconditioned landmark is not past and none of the achiever's
/// facts holds, the achiever is still needed.
fn progress_greedy_necessary(
    graph: &DisjunctiveActionLandmarkGraph,
    state: &[usize],
    row: &mut StatusRow,
) {
    for entry in graph.precondition_achievers() {
        if !row.past[entry.preconditioned_lm]
            && entry
                .facts
                .iter()
                .all(|fact| state[fact.var] != fact.value)
        {
            row.future[entry.achiever_lm] = true;
        }
    }
}

/// A weak ordering `a -> b` with `a` not past forces `b` future.
fn progress_weak(graph: &DisjunctiveActionLandmarkGraph, row: &mut StatusRow) {
    for id in 0..graph.num_landmarks() {
        for (dependency, ordering) in graph.dependencies(id) {
            if ordering == OrderingType::Weak && !row.past[dependency] {
                row.future[id] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two landmarks {0} and {1} with a weak ordering {0} -> {1}.
    fn chain_graph() -> DisjunctiveActionLandmarkGraph {
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        let a = graph.add_node(vec![0], false);
        let b = graph.add_node(vec![1], false);
        graph.add_edge(a, b, OrderingType::Weak);
        graph
    }

    #[test]
    fn test_initial_state_is_all_future() {
        let graph = chain_graph();
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0, 0]);
        assert_eq!(manager.get_landmark_status(&[0, 0], 0), LandmarkStatus::Future);
        assert_eq!(manager.get_landmark_status(&[0, 0], 1), LandmarkStatus::Future);
    }

    #[test]
    fn test_applying_a_member_discharges_the_landmark() {
        let graph = chain_graph();
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0, 0]);
        manager.process_state_transition(&[0, 0], 0, &[1, 0]);
        assert_eq!(manager.get_landmark_status(&[1, 0], 0), LandmarkStatus::Past);
        // Landmark 1 is untouched by operator 0 and stays future.
        assert_eq!(manager.get_landmark_status(&[1, 0], 1), LandmarkStatus::Future);
    }

    #[test]
    fn test_unrelated_operator_resets_inherited_past() {
        let graph = chain_graph();
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0, 0]);
        // Operator 7 belongs to neither landmark; the default-past child row
        // must lose both bits.
        manager.process_state_transition(&[0, 0], 7, &[0, 1]);
        assert_eq!(manager.get_landmark_status(&[0, 1], 0), LandmarkStatus::Future);
        assert_eq!(manager.get_landmark_status(&[0, 1], 1), LandmarkStatus::Future);
    }

    #[test]
    fn test_weak_ordering_keeps_successor_future() {
        let graph = chain_graph();
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0, 0]);
        // Applying operator 1 first discharges landmark 1, but landmark 0 is
        // still missing and the weak ordering re-marks landmark 1 future.
        manager.process_state_transition(&[0, 0], 1, &[0, 1]);
        assert_eq!(
            manager.get_landmark_status(&[0, 1], 1),
            LandmarkStatus::PastAndFuture
        );
    }

    #[test]
    fn test_goal_progression() {
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        let lm = graph.add_node(vec![0], false);
        graph.set_goal_achiever(crate::task::FactPair::new(0, 1), lm);
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0]);
        manager.process_state_transition(&[0], 0, &[1]);
        assert_eq!(manager.get_landmark_status(&[1], 0), LandmarkStatus::Past);
        // Operator 5 undoes the goal fact, so the achiever is needed again
        // even though it is past.
        manager.process_state_transition(&[1], 5, &[2]);
        assert_eq!(manager.get_landmark_status(&[2], 0), LandmarkStatus::PastAndFuture);
    }

    #[test]
    fn test_greedy_necessary_progression() {
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        let achiever = graph.add_node(vec![0], false);
        let preconditioned = graph.add_node(vec![1], false);
        graph.add_precondition_achiever(
            vec![crate::task::FactPair::new(0, 1)],
            achiever,
            preconditioned,
        );
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0, 0]);
        // Apply the achiever, then an unrelated operator that undoes its
        // fact: the preconditioned landmark is still future and none of the
        // precondition facts holds, so the achiever is needed once more.
        manager.process_state_transition(&[0, 0], 0, &[1, 0]);
        manager.process_state_transition(&[1, 0], 5, &[0, 1]);
        assert_eq!(
            manager.get_landmark_status(&[0, 1], achiever),
            LandmarkStatus::PastAndFuture
        );
    }

    #[test]
    fn test_uaa_progression() {
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        let lm = graph.add_node(vec![3], false);
        graph.set_uaa_landmark(3, lm);
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0]);
        manager.process_state_transition(&[0], 3, &[1]);
        // The operator discharged the landmark but uaa forces it future
        // again.
        assert_eq!(manager.get_landmark_status(&[1], lm), LandmarkStatus::PastAndFuture);
    }

    #[test]
    fn test_initially_past_sentinel() {
        let mut graph = DisjunctiveActionLandmarkGraph::new();
        graph.add_node(vec![], true);
        let mut manager =
            DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
        manager.process_initial_state(&[0]);
        assert_eq!(manager.get_landmark_status(&[0], 0), LandmarkStatus::Past);
    }
}
