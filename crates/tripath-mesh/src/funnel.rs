//! Funnel (string-pulling) smoothing of a triangle corridor into waypoints.

use std::time::{Duration, Instant};

use tripath_core::{NodeId, PathSink, PlaneProjection, Vec2, Vec3};

use crate::triangle::SharedEdge;

/// How often the wall clock is consulted, in funnel iterations.
const CLOCK_STRIDE: usize = 64;

/// Limits on one funnel pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelBudget {
    /// Hard cap on scan steps; `None` scales with the corridor length squared.
    pub max_iterations: Option<usize>,
    /// Wall-clock fallback.
    pub timeout: Duration,
}

impl Default for FunnelBudget {
    fn default() -> Self {
        Self {
            max_iterations: None,
            timeout: Duration::from_millis(1000),
        }
    }
}

impl FunnelBudget {
    pub fn iteration_limit(&self, portals: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| (portals + 2).saturating_pow(2).saturating_mul(2))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunnelOutcome {
    /// Starts at the origin and ends at the destination.
    pub waypoints: Vec<Vec3>,
    /// The pass ran out of budget; waypoints past the last committed corner are dropped.
    pub timed_out: bool,
    pub iterations: usize,
}

/// Corridor of shared edges collected from a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrianglePath {
    routes: Vec<SharedEdge>,
}

impl TrianglePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[SharedEdge] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// String-pull the corridor between `origin` and `dest`.
    pub fn waypoints(
        &self,
        origin: Vec3,
        dest: Vec3,
        projection: &PlaneProjection,
        budget: &FunnelBudget,
    ) -> FunnelOutcome {
        let mut portals = Vec::with_capacity(self.routes.len() + 2);
        portals.push((origin, origin));
        portals.extend(self.routes.iter().map(|r| (r.left, r.right)));
        portals.push((dest, dest));
        string_pull(&portals, projection, budget)
    }
}

impl PathSink<SharedEdge> for TrianglePath {
    fn clear(&mut self) {
        self.routes.clear();
    }

    fn push_step(&mut self, _node: NodeId, route: &SharedEdge) {
        self.routes.push(*route);
    }

    fn reverse(&mut self) {
        self.routes.reverse();
    }
}

#[derive(Debug, Clone, Copy)]
struct FunnelPoint {
    flat: Vec2,
    world: Vec3,
}

impl FunnelPoint {
    fn new(world: Vec3, projection: &PlaneProjection) -> Self {
        Self {
            flat: projection.project(world),
            world,
        }
    }
}

/// Simple stupid funnel over `(left, right)` portals.
///
/// The first and last portals are the zero-width origin and destination. Left endpoints lie
/// counter-clockwise of right endpoints as seen from the previous portal.
pub fn string_pull(
    portals: &[(Vec3, Vec3)],
    projection: &PlaneProjection,
    budget: &FunnelBudget,
) -> FunnelOutcome {
    let mut outcome = FunnelOutcome::default();
    if portals.is_empty() {
        return outcome;
    }

    let points: Vec<(FunnelPoint, FunnelPoint)> = portals
        .iter()
        .map(|&(l, r)| (FunnelPoint::new(l, projection), FunnelPoint::new(r, projection)))
        .collect();
    let origin = points[0].0;
    let dest = points[points.len() - 1].0;

    let limit = budget.iteration_limit(portals.len());
    let started = Instant::now();

    let mut corners = vec![origin];
    let mut apex = origin;
    let mut left = apex;
    let mut right = apex;
    let (mut left_index, mut right_index) = (0usize, 0usize);

    let mut i = 1;
    while i < points.len() {
        outcome.iterations += 1;
        if outcome.iterations > limit
            || (outcome.iterations % CLOCK_STRIDE == 0 && started.elapsed() > budget.timeout)
        {
            outcome.timed_out = true;
            tracing::warn!(
                portals = portals.len(),
                iterations = outcome.iterations,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "FunnelTimeout: corridor smoothing aborted"
            );
            break;
        }

        let (pl, pr) = points[i];
        let a = apex.flat;

        if (right.flat - a).perp_dot(pr.flat - a) >= 0.0 {
            if a == right.flat || (left.flat - a).perp_dot(pr.flat - a) < 0.0 {
                right = pr;
                right_index = i;
            } else {
                push_corner(&mut corners, left);
                apex = left;
                right = apex;
                right_index = left_index;
                i = left_index + 1;
                continue;
            }
        }

        if (left.flat - a).perp_dot(pl.flat - a) <= 0.0 {
            if a == left.flat || (right.flat - a).perp_dot(pl.flat - a) > 0.0 {
                left = pl;
                left_index = i;
            } else {
                push_corner(&mut corners, right);
                apex = right;
                left = apex;
                left_index = right_index;
                i = right_index + 1;
                continue;
            }
        }

        i += 1;
    }

    push_corner(&mut corners, dest);
    outcome.waypoints = corners.into_iter().map(|c| c.world).collect();
    outcome
}

/// Sine of the turn below which a corner counts as straight.
const STRAIGHT_TURN: f32 = 1e-5;

/// Append `p`, skipping repeats and replacing the last corner when it lies on the way from the
/// one before it to `p`.
fn push_corner(corners: &mut Vec<FunnelPoint>, p: FunnelPoint) {
    if corners.last().is_some_and(|last| last.world == p.world) {
        return;
    }
    if let [.., before, last] = corners.as_slice() {
        let (d0, d1) = (last.flat - before.flat, p.flat - last.flat);
        let straight = d0.perp_dot(d1).abs() <= STRAIGHT_TURN * d0.length() * d1.length();
        if straight && d0.dot(d1) > 0.0 {
            corners.pop();
        }
    }
    corners.push(p);
}
