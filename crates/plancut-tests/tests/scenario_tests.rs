//! End-to-end scenarios: factory construction, landmark extraction, and
//! status progression over concrete tasks.

use plancut_core::landmarks::factory::{
    AbstractionCutFactory, AbstractionCutOptions, LandmarkGraphFactory, LmCutFactory,
};
use plancut_core::landmarks::graph::OrderingType;
use plancut_core::landmarks::status::{
    DisjunctiveActionLandmarkStatusManager, LandmarkStatus, StatusManagerOptions,
};
use plancut_core::task::{ExplicitTask, FactPair, OperatorData, PlanningTask};
use plancut_core::BuildError;

fn fact(var: usize, value: usize) -> FactPair {
    FactPair::new(var, value)
}

fn projection_options(patterns: Vec<Vec<usize>>) -> AbstractionCutOptions {
    AbstractionCutOptions {
        patterns: Some(patterns),
        justification_graph: false,
        ..AbstractionCutOptions::default()
    }
}

#[test]
fn trivial_one_operator_task() {
    let task = ExplicitTask::new(
        vec![2],
        vec![OperatorData::new([], [fact(0, 1)], 3)],
        vec![fact(0, 1)],
        vec![0],
    )
    .unwrap();
    let factory = AbstractionCutFactory::new(&task, projection_options(vec![vec![0]])).unwrap();
    let graph = factory.compute_landmark_graph(&task);
    assert_eq!(graph.num_landmarks(), 1);
    assert_eq!(graph.actions(0), &[0]);
    assert_eq!(graph.num_orderings(), 0);
    assert!(!graph.is_dead_end());
}

#[test]
fn two_parallel_operators_form_one_disjunction() {
    let task = ExplicitTask::new(
        vec![2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([], [fact(0, 1)], 2),
        ],
        vec![fact(0, 1)],
        vec![0],
    )
    .unwrap();
    let factory = AbstractionCutFactory::new(&task, projection_options(vec![vec![0]])).unwrap();
    let graph = factory.compute_landmark_graph(&task);
    assert_eq!(graph.num_landmarks(), 1);
    assert_eq!(graph.actions(0), &[0, 1]);
}

#[test]
fn sequential_chain_produces_weakly_ordered_landmarks() {
    let task = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([fact(0, 1)], [fact(1, 1)], 1),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();
    let factory =
        AbstractionCutFactory::new(&task, projection_options(vec![vec![0, 1]])).unwrap();
    let graph = factory.compute_landmark_graph(&task);
    assert_eq!(graph.num_landmarks(), 2);
    let ob = 0; // first landmark: nearest the goal
    let oa = 1;
    assert_eq!(graph.actions(ob), &[1]);
    assert_eq!(graph.actions(oa), &[0]);
    assert_eq!(
        graph.outgoing(oa).collect::<Vec<_>>(),
        vec![(ob, OrderingType::Weak)]
    );
}

#[test]
fn zero_cost_operators_vanish_into_the_goal_zone() {
    let task = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 0),
            OperatorData::new([fact(0, 1)], [fact(1, 1)], 5),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();
    let factory =
        AbstractionCutFactory::new(&task, projection_options(vec![vec![0, 1]])).unwrap();
    let graph = factory.compute_landmark_graph(&task);
    assert_eq!(graph.num_landmarks(), 1);
    assert_eq!(graph.actions(0), &[1]);
}

#[test]
fn dead_end_query_state_marks_the_graph() {
    // Value 3 of the variable is disconnected, so its abstract state is
    // pruned; querying a state that projects onto it is a dead end.
    let task = ExplicitTask::new(
        vec![4],
        vec![
            OperatorData::new([fact(0, 0)], [fact(0, 1)], 1),
            OperatorData::new([fact(0, 1)], [fact(0, 2)], 1),
        ],
        vec![fact(0, 2)],
        vec![0],
    )
    .unwrap();
    let factory = AbstractionCutFactory::new(&task, projection_options(vec![vec![0]])).unwrap();

    let alive = factory.get_landmark_graph(&[0]);
    assert!(!alive.is_dead_end());
    assert_eq!(alive.num_landmarks(), 2);

    let dead = factory.get_landmark_graph(&[3]);
    assert!(dead.is_dead_end());
    assert_eq!(dead.num_landmarks(), 0);

    // The status manager still answers for the (empty) graph.
    let mut manager =
        DisjunctiveActionLandmarkStatusManager::new(&dead, StatusManagerOptions::default());
    manager.process_initial_state(&[3]);
    assert!(dead.is_dead_end());
}

#[test]
fn justification_graphs_iterate_lmcut_twice() {
    // On the sequential chain, lm-cut iterates exactly twice; every
    // iteration's justification graph contributes two weakly ordered
    // landmarks.
    let task = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([fact(0, 1)], [fact(1, 1)], 1),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();
    let factory = AbstractionCutFactory::new(&task, AbstractionCutOptions::default()).unwrap();
    assert_eq!(factory.num_abstractions(), 2);
    let graph = factory.compute_landmark_graph(&task);
    assert!(!graph.is_dead_end());
    // Node ids concatenate across abstractions: {o1}, {o0} per graph.
    assert_eq!(graph.num_landmarks(), 4);
    assert_eq!(graph.num_weak_orderings(), 2);
    assert_eq!(graph.num_strong_orderings(), 0);
    // Every landmark intersects the only plan [0, 1].
    for id in 0..graph.num_landmarks() {
        let actions = graph.actions(id);
        assert!(
            actions.contains(&0) || actions.contains(&1),
            "landmark {actions:?} misses the plan"
        );
    }

    // Alternative supporters still drive multiple iterations even when
    // each sweep stops after one cut.
    let alternatives = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([fact(0, 1)], [fact(1, 1)], 1),
            OperatorData::new([], [fact(1, 1)], 2),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();
    let factory =
        AbstractionCutFactory::new(&alternatives, AbstractionCutOptions::default()).unwrap();
    assert_eq!(factory.num_abstractions(), 2);
    let graph = factory.compute_landmark_graph(&alternatives);
    for id in 0..graph.num_landmarks() {
        let actions = graph.actions(id);
        assert!(actions.contains(&2), "landmark {actions:?} misses plan [2]");
        assert!(
            actions.contains(&0) || actions.contains(&1),
            "landmark {actions:?} misses plan [0, 1]"
        );
    }
}

#[test]
fn status_progression_along_a_plan() {
    let task = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([fact(0, 1)], [fact(1, 1)], 1),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();
    let factory =
        AbstractionCutFactory::new(&task, projection_options(vec![vec![0, 1]])).unwrap();
    let graph = factory.compute_landmark_graph(&task);
    let ob = 0;
    let oa = 1;

    let mut manager =
        DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
    manager.process_initial_state(&[0, 0]);
    assert_eq!(manager.get_landmark_status(&[0, 0], oa), LandmarkStatus::Future);
    assert_eq!(manager.get_landmark_status(&[0, 0], ob), LandmarkStatus::Future);

    manager.process_state_transition(&[0, 0], 0, &[1, 0]);
    assert_eq!(manager.get_landmark_status(&[1, 0], oa), LandmarkStatus::Past);
    assert_eq!(manager.get_landmark_status(&[1, 0], ob), LandmarkStatus::Future);

    manager.process_state_transition(&[1, 0], 1, &[1, 1]);
    assert_eq!(manager.get_landmark_status(&[1, 1], oa), LandmarkStatus::Past);
    assert_eq!(manager.get_landmark_status(&[1, 1], ob), LandmarkStatus::Past);
}

#[test]
fn weak_ordering_blocks_out_of_order_resolution() {
    let task = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([], [fact(1, 1)], 1),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();
    // Hand-build a graph {0} -> {1} to exercise the progression without
    // depending on sweep order.
    let mut graph = plancut_core::DisjunctiveActionLandmarkGraph::new();
    let a = graph.add_node(vec![0], false);
    let b = graph.add_node(vec![1], false);
    graph.add_edge(a, b, OrderingType::Weak);

    let mut manager =
        DisjunctiveActionLandmarkStatusManager::new(&graph, StatusManagerOptions::default());
    manager.process_initial_state(&task.initial_state_values());
    // Applying operator 1 first: b is past, but the weak ordering from the
    // unresolved a forces it future again.
    manager.process_state_transition(&[0, 0], 1, &[0, 1]);
    assert_eq!(
        manager.get_landmark_status(&[0, 1], b),
        LandmarkStatus::PastAndFuture
    );
    assert_eq!(manager.get_landmark_status(&[0, 1], a), LandmarkStatus::Future);
}

#[test]
fn factory_dispatch_variants_agree_on_landmark_count() {
    let task = ExplicitTask::new(
        vec![2, 2],
        vec![
            OperatorData::new([], [fact(0, 1)], 1),
            OperatorData::new([fact(0, 1)], [fact(1, 1)], 1),
        ],
        vec![fact(1, 1)],
        vec![0, 0],
    )
    .unwrap();

    let projection = LandmarkGraphFactory::AbstractionCut(
        AbstractionCutFactory::new(&task, projection_options(vec![vec![0, 1]])).unwrap(),
    );
    let lmcut = LandmarkGraphFactory::LmCut(LmCutFactory);

    let projection_graph = projection.compute_landmark_graph(&task).unwrap();
    let lmcut_graph = lmcut.compute_landmark_graph(&task).unwrap();
    assert_eq!(projection_graph.num_landmarks(), lmcut_graph.num_landmarks());
}

#[test]
fn axioms_and_conditional_effects_are_rejected() {
    struct AxiomTask(ExplicitTask);
    impl PlanningTask for AxiomTask {
        fn num_variables(&self) -> usize {
            self.0.num_variables()
        }
        fn variable_domain_size(&self, var: usize) -> usize {
            self.0.variable_domain_size(var)
        }
        fn num_operators(&self) -> usize {
            self.0.num_operators()
        }
        fn operator_preconditions(&self, op: usize) -> &[FactPair] {
            self.0.operator_preconditions(op)
        }
        fn operator_effects(&self, op: usize) -> &[FactPair] {
            self.0.operator_effects(op)
        }
        fn operator_cost(&self, op: usize) -> u32 {
            self.0.operator_cost(op)
        }
        fn goal_facts(&self) -> &[FactPair] {
            self.0.goal_facts()
        }
        fn initial_state_values(&self) -> Vec<usize> {
            self.0.initial_state_values()
        }
        fn num_axioms(&self) -> usize {
            1
        }
    }

    let inner = ExplicitTask::new(
        vec![2],
        vec![OperatorData::new([], [fact(0, 1)], 1)],
        vec![fact(0, 1)],
        vec![0],
    )
    .unwrap();
    let task = AxiomTask(inner);
    let result = AbstractionCutFactory::new(&task, AbstractionCutOptions::default());
    assert!(matches!(result, Err(BuildError::UnsupportedTaskShape(_))));
}
