//! Dual-tree search for each component's closest outside point.
//!
//! One Borůvka round traverses query subtrees against the whole tree. Query
//! subtrees are disjoint, so every per-node bound is written by exactly one
//! task; per-component candidates are collected in task-local overlays and
//! merged once the round's tasks have finished.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use rayon::prelude::*;

use super::{
    MstError,
    tracker::{Candidate, ClosestDistanceTracker},
};
use crate::{
    distance::{Metric, checked_distance},
    execution::{ExecutionContext, Stage},
    kdtree::{KdNode, KdTree, ROOT},
    points::PointSource,
};

/// Query subtrees handed to each worker in a parallel round.
const PARTITIONS_PER_WORKER: usize = 4;

/// Upper bound, per tree node, on the best candidate distance of any point
/// below it. Stored as `f64` bits.
pub(super) struct NodeBounds {
    bits: Vec<AtomicU64>,
}

impl NodeBounds {
    pub(super) fn new(nodes: usize) -> Self {
        Self {
            bits: (0..nodes)
                .map(|_| AtomicU64::new(f64::INFINITY.to_bits()))
                .collect(),
        }
    }

    fn get(&self, node: usize) -> f64 {
        f64::from_bits(self.bits[node].load(Ordering::Relaxed))
    }

    fn set(&self, node: usize, value: f64) {
        self.bits[node].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Recomputes every bound from the seeded candidates of a new round.
    pub(super) fn reset(&self, tree: &KdTree, component_of: &[usize], seed: &ClosestDistanceTracker) {
        for node in tree.nodes().iter().rev() {
            let bound = match node.children() {
                Some((left, right)) => self.get(left).max(self.get(right)),
                None => tree
                    .nodes_contained(node)
                    .iter()
                    .map(|&point| seed.best(component_of[point]).distance())
                    .fold(f64::NEG_INFINITY, f64::max),
            };
            self.set(node.id(), bound);
        }
    }
}

/// Smallest core distance below each node.
pub(super) fn node_min_cores(tree: &KdTree, cores: &[f64]) -> Vec<f64> {
    let mut min_core = vec![f64::INFINITY; tree.tree_node_count()];
    for node in tree.nodes().iter().rev() {
        min_core[node.id()] = match node.children() {
            Some((left, right)) => min_core[left].min(min_core[right]),
            None => tree
                .nodes_contained(node)
                .iter()
                .map(|&point| cores[point])
                .fold(f64::INFINITY, f64::min),
        };
    }
    min_core
}

/// The component shared by every point below each node, if any.
///
/// Recomputed at the start of every round, after the previous round's merges.
pub(super) fn single_components(tree: &KdTree, component_of: &[usize]) -> Vec<Option<usize>> {
    let mut single = vec![None; tree.tree_node_count()];
    for node in tree.nodes().iter().rev() {
        single[node.id()] = match node.children() {
            Some((left, right)) => match (single[left], single[right]) {
                (Some(a), Some(b)) if a == b => Some(a),
                _ => None,
            },
            None => {
                let mut points = tree.nodes_contained(node).iter();
                points.next().and_then(|&first| {
                    let component = component_of[first];
                    points
                        .all(|&point| component_of[point] == component)
                        .then_some(component)
                })
            }
        };
    }
    single
}

/// Splits the tree into at least `target` disjoint query subtrees when it has
/// enough internal nodes, always splitting the largest remaining subtree.
pub(super) fn partition_queries(tree: &KdTree, target: usize) -> Vec<usize> {
    let mut frontier = vec![ROOT];
    while frontier.len() < target {
        let Some(index) = frontier
            .iter()
            .enumerate()
            .filter(|&(_, &node)| !tree.node(node).is_leaf())
            .max_by_key(|&(_, &node)| tree.node(node).len())
            .map(|(index, _)| index)
        else {
            break;
        };
        let node = frontier.swap_remove(index);
        if let Some((left, right)) = tree.node(node).children() {
            frontier.push(left);
            frontier.push(right);
        }
    }
    frontier
}

/// Counters reported once per round.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct TraversalStats {
    pub(super) base_cases: u64,
    pub(super) pruned_pairs: u64,
}

impl TraversalStats {
    fn absorb(&mut self, other: Self) {
        self.base_cases += other.base_cases;
        self.pruned_pairs += other.pruned_pairs;
    }
}

/// Read-only state of one Borůvka round.
pub(super) struct Round<'a, P: ?Sized, M: ?Sized> {
    pub(super) points: &'a P,
    pub(super) tree: &'a KdTree,
    pub(super) metric: &'a M,
    pub(super) cores: &'a [f64],
    pub(super) min_core: &'a [f64],
    pub(super) component_of: &'a [usize],
    pub(super) single: &'a [Option<usize>],
    pub(super) seed: &'a ClosestDistanceTracker,
    pub(super) bounds: &'a NodeBounds,
    pub(super) ctx: &'a ExecutionContext<'a>,
}

impl<P, M> Round<'_, P, M>
where
    P: PointSource + ?Sized,
    M: Metric + ?Sized,
{
    /// Runs the round and returns every improved candidate with the round's
    /// counters.
    pub(super) fn run(&self) -> Result<(Vec<(usize, Candidate)>, TraversalStats), MstError> {
        let locals = if self.ctx.is_parallel() {
            let target = self.ctx.concurrency().get() * PARTITIONS_PER_WORKER;
            partition_queries(self.tree, target)
                .into_par_iter()
                .map(|query| self.search(query))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![self.search(ROOT)?]
        };

        let mut candidates = Vec::new();
        let mut stats = TraversalStats::default();
        for traversal in locals {
            candidates.extend(traversal.local);
            stats.absorb(traversal.stats);
        }
        Ok((candidates, stats))
    }

    fn search(&self, query: usize) -> Result<Traversal<'_, '_, P, M>, MstError> {
        self.ctx.ensure_running(Stage::SpanningTree)?;
        let mut traversal = Traversal {
            round: self,
            local: HashMap::new(),
            stats: TraversalStats::default(),
        };
        traversal.traverse(query, ROOT)?;
        Ok(traversal)
    }
}

struct Traversal<'r, 'a, P: ?Sized, M: ?Sized> {
    round: &'r Round<'a, P, M>,
    local: HashMap<usize, Candidate>,
    stats: TraversalStats,
}

impl<P, M> Traversal<'_, '_, P, M>
where
    P: PointSource + ?Sized,
    M: Metric + ?Sized,
{
    fn best(&self, component: usize) -> Candidate {
        self.local
            .get(&component)
            .copied()
            .unwrap_or_else(|| self.round.seed.best(component))
    }

    fn consider(&mut self, component: usize, candidate: Candidate) -> bool {
        if candidate.precedes(&self.best(component)) {
            self.local.insert(component, candidate);
            true
        } else {
            false
        }
    }

    /// Lower bound on the mutual reachability between any point of `query`
    /// and any point of `reference`.
    fn lower_bound(&self, query: &KdNode, reference: &KdNode) -> f64 {
        let round = self.round;
        round
            .metric
            .box_to_box(query.aabb(), reference.aabb())
            .max(round.min_core[query.id()])
            .max(round.min_core[reference.id()])
    }

    fn prunes(&self, query: &KdNode, reference: &KdNode) -> bool {
        let single = self.round.single;
        if let (Some(left), Some(right)) = (single[query.id()], single[reference.id()])
            && left == right
        {
            return true;
        }
        self.lower_bound(query, reference) > self.round.bounds.get(query.id())
    }

    /// Orders two reference children nearest first.
    fn nearest_first(&self, query: &KdNode, left: usize, right: usize) -> (usize, usize) {
        let tree = self.round.tree;
        let left_bound = self.lower_bound(query, tree.node(left));
        let right_bound = self.lower_bound(query, tree.node(right));
        if right_bound < left_bound {
            (right, left)
        } else {
            (left, right)
        }
    }

    fn traverse(&mut self, query_id: usize, reference_id: usize) -> Result<(), MstError> {
        let tree = self.round.tree;
        let query = tree.node(query_id);
        let reference = tree.node(reference_id);
        if self.prunes(query, reference) {
            self.stats.pruned_pairs += 1;
            return Ok(());
        }
        match (query.children(), reference.children()) {
            (None, None) => {
                self.base_case(query, reference)?;
                self.refresh_leaf_bound(query);
            }
            (None, Some((left, right))) => {
                let (first, second) = self.nearest_first(query, left, right);
                self.traverse(query_id, first)?;
                self.traverse(query_id, second)?;
            }
            (Some((query_left, query_right)), None) => {
                self.traverse(query_left, reference_id)?;
                self.traverse(query_right, reference_id)?;
                self.refresh_internal_bound(query_id, query_left, query_right);
            }
            (Some((query_left, query_right)), Some((left, right))) => {
                for child in [query_left, query_right] {
                    let (first, second) = self.nearest_first(tree.node(child), left, right);
                    self.traverse(child, first)?;
                    self.traverse(child, second)?;
                }
                self.refresh_internal_bound(query_id, query_left, query_right);
            }
        }
        Ok(())
    }

    fn base_case(&mut self, query: &KdNode, reference: &KdNode) -> Result<(), MstError> {
        let round = self.round;
        round.ctx.ensure_running(Stage::SpanningTree)?;
        let reference_single = round.single[reference.id()];
        let reference_points = round.tree.nodes_contained(reference);
        for &point in round.tree.nodes_contained(query) {
            let component = round.component_of[point];
            if reference_single == Some(component) {
                continue;
            }
            let core = round.cores[point];
            let mut best = self.best(component).distance();
            let reach_to_box = round
                .metric
                .point_to_box(round.points.point(point), reference.aabb())
                .max(core)
                .max(round.min_core[reference.id()]);
            if reach_to_box > best {
                continue;
            }
            for &other in reference_points {
                if round.component_of[other] == component {
                    continue;
                }
                let core_floor = core.max(round.cores[other]);
                if core_floor > best {
                    continue;
                }
                self.stats.base_cases += 1;
                let reach = checked_distance(round.points, round.metric, point, other)?.max(core_floor);
                if self.consider(component, Candidate::new(reach, point, other)) {
                    best = reach;
                }
            }
        }
        Ok(())
    }

    fn refresh_leaf_bound(&self, query: &KdNode) {
        let round = self.round;
        let bound = round
            .tree
            .nodes_contained(query)
            .iter()
            .map(|&point| self.best(round.component_of[point]).distance())
            .fold(f64::NEG_INFINITY, f64::max);
        round.bounds.set(query.id(), bound);
    }

    fn refresh_internal_bound(&self, query: usize, left: usize, right: usize) {
        let bounds = self.round.bounds;
        bounds.set(query, bounds.get(left).max(bounds.get(right)));
    }
}
