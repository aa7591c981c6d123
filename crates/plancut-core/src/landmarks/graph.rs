//! The disjunctive action landmark graph.
//!
//! Nodes are non-empty sets of operators such that every plan applies at
//! least one member; edges are orderings typed strong or weak. The graph
//! additionally carries the indices the status manager progresses over:
//! goal achievers, precondition achievers, and unique-achiever actions.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::task::{FactPair, OperatorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderingType {
    Weak,
    Strong,
}

#[derive(Debug, Clone)]
struct LandmarkNode {
    /// Sorted, deduplicated operator ids.
    actions: Vec<OperatorId>,
    initially_past: bool,
}

/// A greedy-necessary relationship: as long as `preconditioned_lm` is not
/// past and none of `facts` holds, the achiever landmark is still needed.
#[derive(Debug, Clone)]
pub struct PreconditionAchiever {
    pub achiever_lm: usize,
    pub preconditioned_lm: usize,
    pub facts: Vec<FactPair>,
}

#[derive(Debug, Default)]
pub struct DisjunctiveActionLandmarkGraph {
    nodes: Vec<LandmarkNode>,
    /// `outgoing[from]` maps `to` to the strongest known ordering type.
    outgoing: Vec<BTreeMap<usize, OrderingType>>,
    /// Mirror of `outgoing`: `dependencies[to]` maps `from` to the type.
    dependencies: Vec<BTreeMap<usize, OrderingType>>,

    /// Goal fact to the unique landmark achieving it, where recorded.
    goal_achiever_lms: BTreeMap<FactPair, usize>,
    precondition_achiever_lms: Vec<PreconditionAchiever>,
    /// Operator to its unique-achiever-action landmark, where recorded.
    uaa_landmarks: FxHashMap<OperatorId, usize>,

    dead_end: bool,
}

impl DisjunctiveActionLandmarkGraph {
    pub fn new() -> Self {
        DisjunctiveActionLandmarkGraph::default()
    }

    /// Adds a landmark node and returns its id.
    ///
    /// Empty action sets are rejected except as the very first node: an
    /// otherwise empty graph may hold one empty sentinel node (typically
    /// marked initially past) so that downstream consumers see a well-formed
    /// graph.
    pub fn add_node(&mut self, mut actions: Vec<OperatorId>, initially_past: bool) -> usize {
        debug_assert!(
            !actions.is_empty() || self.nodes.is_empty(),
            "only an otherwise empty graph may hold an empty sentinel node"
        );
        actions.sort_unstable();
        actions.dedup();
        self.nodes.push(LandmarkNode {
            actions,
            initially_past,
        });
        self.outgoing.push(BTreeMap::new());
        self.dependencies.push(BTreeMap::new());
        self.nodes.len() - 1
    }

    /// Adds (or strengthens) the ordering `from -> to`. A strong addition
    /// upgrades an existing weak edge; a weak addition never downgrades.
    pub fn add_edge(&mut self, from: usize, to: usize, ordering: OrderingType) {
        debug_assert!(from < self.nodes.len() && to < self.nodes.len());
        debug_assert_ne!(from, to);
        let entry = self.outgoing[from].entry(to).or_insert(ordering);
        *entry = (*entry).max(ordering);
        let mirror = self.dependencies[to].entry(from).or_insert(ordering);
        *mirror = (*mirror).max(ordering);
    }

    pub fn num_landmarks(&self) -> usize {
        self.nodes.len()
    }

    pub fn actions(&self, id: usize) -> &[OperatorId] {
        &self.nodes[id].actions
    }

    pub fn contains_action(&self, id: usize, op: OperatorId) -> bool {
        self.nodes[id].actions.binary_search(&op).is_ok()
    }

    /// True iff the action sets of `a` and `b` intersect.
    pub fn landmarks_overlap(&self, a: usize, b: usize) -> bool {
        let (mut left, mut right) = (
            self.nodes[a].actions.iter().peekable(),
            self.nodes[b].actions.iter().peekable(),
        );
        while let (Some(&&x), Some(&&y)) = (left.peek(), right.peek()) {
            match x.cmp(&y) {
                std::cmp::Ordering::Less => {
                    left.next();
                }
                std::cmp::Ordering::Greater => {
                    right.next();
                }
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    pub fn is_initially_past(&self, id: usize) -> bool {
        self.nodes[id].initially_past
    }

    pub fn mark_initially_past(&mut self, id: usize) {
        self.nodes[id].initially_past = true;
    }

    pub fn mark_as_dead_end(&mut self) {
        self.dead_end = true;
    }

    pub fn is_dead_end(&self) -> bool {
        self.dead_end
    }

    /// Orderings leaving `id`, in ascending target order.
    pub fn outgoing(&self, id: usize) -> impl Iterator<Item = (usize, OrderingType)> + '_ {
        self.outgoing[id].iter().map(|(&to, &ordering)| (to, ordering))
    }

    /// Orderings entering `id`, in ascending source order.
    pub fn dependencies(&self, id: usize) -> impl Iterator<Item = (usize, OrderingType)> + '_ {
        self.dependencies[id]
            .iter()
            .map(|(&from, &ordering)| (from, ordering))
    }

    pub fn num_orderings(&self) -> usize {
        self.outgoing.iter().map(BTreeMap::len).sum()
    }

    pub fn num_strong_orderings(&self) -> usize {
        self.outgoing
            .iter()
            .flat_map(BTreeMap::values)
            .filter(|&&ordering| ordering == OrderingType::Strong)
            .count()
    }

    pub fn num_weak_orderings(&self) -> usize {
        self.num_orderings() - self.num_strong_orderings()
    }

    /// Records `id` as the unique landmark achieving the goal fact.
    pub fn set_goal_achiever(&mut self, fact: FactPair, id: usize) {
        debug_assert!(id < self.nodes.len());
        self.goal_achiever_lms.insert(fact, id);
    }

    pub fn goal_achievers(&self) -> impl Iterator<Item = (FactPair, usize)> + '_ {
        self.goal_achiever_lms.iter().map(|(&fact, &id)| (fact, id))
    }

    pub fn add_precondition_achiever(
        &mut self,
        facts: Vec<FactPair>,
        achiever_lm: usize,
        preconditioned_lm: usize,
    ) {
        debug_assert!(achiever_lm < self.nodes.len() && preconditioned_lm < self.nodes.len());
        self.precondition_achiever_lms.push(PreconditionAchiever {
            achiever_lm,
            preconditioned_lm,
            facts,
        });
    }

    pub fn precondition_achievers(&self) -> &[PreconditionAchiever] {
        &self.precondition_achiever_lms
    }

    pub fn set_uaa_landmark(&mut self, op: OperatorId, id: usize) {
        debug_assert!(id < self.nodes.len());
        self.uaa_landmarks.insert(op, id);
    }

    pub fn uaa_landmark_for_operator(&self, op: OperatorId) -> Option<usize> {
        self.uaa_landmarks.get(&op).copied()
    }

    pub fn has_uaa_landmarks(&self) -> bool {
        !self.uaa_landmarks.is_empty()
    }

    /// Renders the graph in graphviz dot syntax; weak orderings are dashed.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph dalm {\n");
        for (id, node) in self.nodes.iter().enumerate() {
            let _ = writeln!(out, "  lm{id} [label=\"{:?}\"];", node.actions);
        }
        for (from, targets) in self.outgoing.iter().enumerate() {
            for (&to, &ordering) in targets {
                let style = match ordering {
                    OrderingType::Strong => "solid",
                    OrderingType::Weak => "dashed",
                };
                let _ = writeln!(out, "  lm{from} -> lm{to} [style={style}];");
            }
        }
        out.push_str("}\n");
        out
    }
}
