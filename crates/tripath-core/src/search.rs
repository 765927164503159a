//! Generic A* over any [`Topology`].

use core::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, TryLockError};

use crate::error::{Endpoint, Result, SearchError};
use crate::open_list::{HeapItem, HeapOrder, OpenList};
use crate::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable node identifier (`0..node_count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A directed, weighted edge between two nodes.
pub trait Route {
    fn cost(&self) -> f32;
    fn origin(&self) -> NodeId;
    fn dest(&self) -> NodeId;
}

/// Graph contract consumed by [`PathFinder`].
pub trait Topology {
    type Route: Route;

    fn node_count(&self) -> usize;

    /// Resolve a world point to the node containing it.
    fn query(&self, point: Vec3) -> Option<NodeId>;

    /// Lower bound on the remaining cost from `from` to `to`.
    ///
    /// Must never overestimate for the returned path to be optimal.
    fn estimate(&self, from: NodeId, to: NodeId) -> f32;

    fn routes(&self, node: NodeId) -> Option<&[Self::Route]>;
}

/// Receives a found path, one step at a time, walking back from the goal.
///
/// A step is the node arrived at plus the route used to reach it; the origin itself is never
/// reported. The sink is cleared first and reversed last, so it ends in forward order.
pub trait PathSink<R> {
    fn clear(&mut self);
    fn push_step(&mut self, node: NodeId, route: &R);
    fn reverse(&mut self);
}

/// Collects the node sequence (goal included, origin excluded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    pub nodes: Vec<NodeId>,
}

impl<R> PathSink<R> for NodePath {
    fn clear(&mut self) {
        self.nodes.clear();
    }

    fn push_step(&mut self, node: NodeId, _route: &R) {
        self.nodes.push(node);
    }

    fn reverse(&mut self) {
        self.nodes.reverse();
    }
}

/// Collects the route sequence from origin to goal.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePath<R> {
    pub routes: Vec<R>,
}

impl<R> Default for RoutePath<R> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<R: Clone> PathSink<R> for RoutePath<R> {
    fn clear(&mut self) {
        self.routes.clear();
    }

    fn push_step(&mut self, _node: NodeId, route: &R) {
        self.routes.push(route.clone());
    }

    fn reverse(&mut self) {
        self.routes.reverse();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Abort once this many nodes have been expanded.
    pub max_expansions: usize,
    /// Initial node-arena / open-list capacity.
    pub initial_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_expansions: usize::MAX,
            initial_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    pub expansions: usize,
    /// Closed nodes pushed back onto the open list after a cheaper route turned up.
    pub reopened: usize,
    /// Number of steps handed to the sink.
    pub steps: usize,
}

/// Compare total costs by the ceiling of their difference.
///
/// Costs whose difference rounds up to zero compare equal, which absorbs float jitter.
pub fn compare_total_cost(a: f32, b: f32) -> Ordering {
    let diff = (a - b).ceil();
    if diff > 0.0 {
        Ordering::Greater
    } else if diff < 0.0 {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NodeCategory {
    #[default]
    Unvisited,
    Opened,
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct Incoming {
    origin: NodeId,
    slot: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct SearchNode {
    generation: u32,
    category: NodeCategory,
    cost: f32,
    estimate: f32,
    incoming: Option<Incoming>,
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    node: NodeId,
    total: f32,
}

impl HeapItem for OpenEntry {
    fn heap_id(&self) -> usize {
        self.node.index()
    }
}

#[derive(Debug)]
struct SearchState {
    nodes: Vec<SearchNode>,
    open: OpenList<OpenEntry>,
    generation: u32,
}

impl SearchState {
    fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            open: OpenList::with_comparator(HeapOrder::Minimum, |a: &OpenEntry, b: &OpenEntry| {
                compare_total_cost(a.total, b.total)
            })
            .with_capacity(capacity),
            generation: 0,
        }
    }

    fn begin(&mut self, node_count: usize) {
        if self.generation == u32::MAX {
            self.invalidate();
        }
        self.generation += 1;
        self.open.clear(false);
        if self.nodes.len() < node_count {
            self.nodes.reserve(node_count - self.nodes.len());
        }
    }

    fn invalidate(&mut self) {
        self.generation = 0;
        for node in &mut self.nodes {
            node.generation = 0;
        }
        self.open.clear(false);
    }

    /// Node record for `id`, reset first if it belongs to an earlier search.
    fn touch(&mut self, id: NodeId) -> &mut SearchNode {
        let idx = id.index();
        if idx >= self.nodes.len() {
            self.nodes.resize(idx + 1, SearchNode::default());
        }
        let generation = self.generation;
        let node = &mut self.nodes[idx];
        if node.generation != generation {
            *node = SearchNode {
                generation,
                ..SearchNode::default()
            };
        }
        node
    }

    fn open(&mut self, id: NodeId) {
        let node = self.touch(id);
        node.category = NodeCategory::Opened;
        let total = node.cost + node.estimate;
        self.open.push(OpenEntry { node: id, total });
    }

    fn run<T>(
        &mut self,
        topology: &T,
        origin: NodeId,
        dest: NodeId,
        config: &SearchConfig,
    ) -> Result<SearchStats>
    where
        T: Topology + ?Sized,
    {
        self.begin(topology.node_count());
        let mut stats = SearchStats::default();

        let estimate = topology.estimate(origin, dest);
        let start = self.touch(origin);
        start.cost = 0.0;
        start.estimate = estimate;
        self.open(origin);

        while let Some(entry) = self.open.pop() {
            let current = entry.node;
            let node = self.touch(current);
            node.category = NodeCategory::Closed;
            let cost = node.cost;

            if current == dest {
                return Ok(stats);
            }

            stats.expansions += 1;
            if stats.expansions > config.max_expansions {
                return Err(SearchError::ExpansionLimit(config.max_expansions));
            }

            let Some(routes) = topology.routes(current) else {
                continue;
            };

            for (slot, route) in routes.iter().enumerate() {
                let next = route.dest();
                let candidate = cost + route.cost();

                let neighbor = self.touch(next);
                match neighbor.category {
                    NodeCategory::Opened => {
                        if candidate >= neighbor.cost {
                            continue;
                        }
                        self.open.remove(next.index());
                    }
                    NodeCategory::Closed => {
                        if candidate >= neighbor.cost {
                            continue;
                        }
                        stats.reopened += 1;
                    }
                    NodeCategory::Unvisited => {}
                }

                let estimate = topology.estimate(next, dest);
                let neighbor = self.touch(next);
                neighbor.cost = candidate;
                neighbor.estimate = estimate;
                neighbor.incoming = Some(Incoming {
                    origin: current,
                    slot: slot as u32,
                });
                self.open(next);
            }
        }

        Err(SearchError::Exhausted)
    }

    /// Walk back-links from `dest` to `origin`, feeding `sink`. Returns the step count.
    fn reconstruct<T, S>(&self, topology: &T, origin: NodeId, dest: NodeId, sink: &mut S) -> usize
    where
        T: Topology + ?Sized,
        S: PathSink<T::Route> + ?Sized,
    {
        sink.clear();
        let mut current = dest;
        let mut steps = 0;
        while current != origin {
            let incoming = self
                .nodes
                .get(current.index())
                .filter(|n| n.generation == self.generation)
                .and_then(|n| n.incoming);
            debug_assert!(incoming.is_some(), "node {current:?} has no back-link");
            let Some(incoming) = incoming else { break };

            let route = topology
                .routes(incoming.origin)
                .and_then(|routes| routes.get(incoming.slot as usize));
            debug_assert!(route.is_some(), "back-link of {current:?} names a missing route");
            let Some(route) = route else { break };

            sink.push_step(current, route);
            current = incoming.origin;
            steps += 1;

            debug_assert!(steps <= self.nodes.len(), "back-links form a cycle");
            if steps > self.nodes.len() {
                break;
            }
        }
        sink.reverse();
        steps
    }
}

/// A reusable A* engine.
///
/// Node bookkeeping lives in an arena indexed by [`NodeId`] and is invalidated lazily with a
/// generation counter, so consecutive searches never pay for a full reset.
///
/// One engine runs one search at a time: a call made while another is in flight returns
/// [`SearchError::Busy`] immediately. Run independent engines for parallel searches.
#[derive(Debug)]
pub struct PathFinder {
    config: SearchConfig,
    state: Mutex<SearchState>,
}

impl Default for PathFinder {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl PathFinder {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            state: Mutex::new(SearchState::new(config.initial_capacity)),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search and report only success; failures are logged.
    pub fn search<T, S>(&self, topology: &T, from: Vec3, to: Vec3, sink: &mut S) -> bool
    where
        T: Topology + ?Sized,
        S: PathSink<T::Route> + ?Sized,
    {
        match self.try_search(topology, from, to, sink) {
            Ok(_) => true,
            Err(SearchError::Busy) => {
                tracing::debug!("search rejected: engine busy");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, ?from, ?to, "path search failed");
                false
            }
        }
    }

    pub fn try_search<T, S>(
        &self,
        topology: &T,
        from: Vec3,
        to: Vec3,
        sink: &mut S,
    ) -> Result<SearchStats>
    where
        T: Topology + ?Sized,
        S: PathSink<T::Route> + ?Sized,
    {
        let origin = topology.query(from).ok_or(SearchError::Unresolved {
            endpoint: Endpoint::Origin,
            point: from,
        })?;
        let dest = topology.query(to).ok_or(SearchError::Unresolved {
            endpoint: Endpoint::Destination,
            point: to,
        })?;

        let mut state = self.try_state()?;
        let mut stats = state.run(topology, origin, dest, &self.config)?;
        stats.steps = state.reconstruct(topology, origin, dest, sink);

        tracing::trace!(
            origin = origin.0,
            dest = dest.0,
            expansions = stats.expansions,
            reopened = stats.reopened,
            steps = stats.steps,
            "path found"
        );
        Ok(stats)
    }

    /// Forget all node state. Blocks until any running search finishes.
    pub fn reset(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.invalidate();
    }

    fn try_state(&self) -> Result<MutexGuard<'_, SearchState>> {
        match self.state.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(SearchError::Busy),
            // A panicking search leaves stale records only; the next generation ignores them.
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_cost_comparison_buckets_by_ceiling() {
        assert_eq!(compare_total_cost(3.0, 1.0), Ordering::Greater);
        assert_eq!(compare_total_cost(1.0, 3.0), Ordering::Less);
        assert_eq!(compare_total_cost(2.0, 2.0), Ordering::Equal);
        // -0.25 rounds up to zero.
        assert_eq!(compare_total_cost(1.75, 2.0), Ordering::Equal);
    }

    #[test]
    fn touch_resets_records_from_older_generations() {
        let mut state = SearchState::new(4);
        state.begin(4);
        state.touch(NodeId(2)).cost = 7.0;
        state.touch(NodeId(2)).category = NodeCategory::Closed;

        state.begin(4);
        let node = state.touch(NodeId(2));
        assert_eq!(node.category, NodeCategory::Unvisited);
        assert_eq!(node.cost, 0.0);
    }

    #[test]
    fn generation_wraparound_invalidates_everything() {
        let mut state = SearchState::new(2);
        state.begin(2);
        state.touch(NodeId(0)).category = NodeCategory::Closed;
        state.generation = u32::MAX;
        state.nodes[0].generation = 1;

        state.begin(2);
        assert_eq!(state.generation, 1);
        assert_eq!(state.touch(NodeId(0)).category, NodeCategory::Unvisited);
    }
}
