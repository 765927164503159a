//! Binary space partition over projected triangles, used for point location.
//!
//! Each internal node splits its fragments with the supporting line of one of their edges.
//! Triangles straddling that line are clipped, and every piece keeps the id of the triangle it
//! came from, so a leaf lookup can answer with the original triangle.

use tripath_core::math::{cross2, point_in_polygon, segment_line_intersection};
use tripath_core::Vec2;

/// Nodes deeper than this are always leaves.
pub const MAX_DEPTH: usize = 20;
/// Sets this small are not split further.
pub const LEAF_FRAGMENTS: usize = 3;

const SIDE_EPSILON: f32 = 4.0 * f32::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub p0: Vec2,
    pub p1: Vec2,
}

impl Segment {
    pub fn new(p0: Vec2, p1: Vec2) -> Self {
        Self { p0, p1 }
    }

    pub fn vector(&self) -> Vec2 {
        self.p1 - self.p0
    }

    /// Negative on the left, positive on the right, zero on the line.
    pub fn side_value(&self, p: Vec2) -> f32 {
        cross2(self.vector(), p - self.p0)
    }

    fn is_degenerate(&self) -> bool {
        self.p0 == self.p1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    /// Straddles the line.
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub id: u32,
    pub vertices: [Vec2; 3],
}

impl Fragment {
    pub fn new(id: u32, vertices: [Vec2; 3]) -> Self {
        Self { id, vertices }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        point_in_polygon(&self.vertices, p)
    }

    fn side_of(&self, line: &Segment) -> Side {
        let mut pos = false;
        let mut neg = false;
        for v in self.vertices {
            let s = line.side_value(v);
            let tolerance = side_tolerance(line, v);
            pos |= s > tolerance;
            neg |= s < -tolerance;
        }
        match (pos, neg) {
            (true, true) => Side::Over,
            (true, false) => Side::Right,
            // Fragments lying on the line go left.
            _ => Side::Left,
        }
    }
}

#[derive(Debug, Clone)]
enum BspNode {
    Leaf {
        depth: usize,
        fragments: Vec<Fragment>,
    },
    Split {
        line: Segment,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BspStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub fragments: usize,
    pub max_leaf_fragments: usize,
    /// Leaves holding more than [`LEAF_FRAGMENTS`] fragments at or above [`MAX_DEPTH`], because
    /// no edge produced a usable split.
    pub unsplittable_leaves: usize,
}

#[derive(Debug, Clone)]
pub struct BspTree {
    // Root at index 0.
    nodes: Vec<BspNode>,
}

impl Default for BspTree {
    fn default() -> Self {
        Self::build(std::iter::empty())
    }
}

impl BspTree {
    /// Build from projected triangles; ids are their positions in the iterator.
    pub fn build(triangles: impl IntoIterator<Item = [Vec2; 3]>) -> Self {
        let fragments = triangles
            .into_iter()
            .enumerate()
            .map(|(id, tri)| Fragment::new(id as u32, tri))
            .collect();
        Self::from_fragments(fragments)
    }

    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build_node(fragments, 0);
        tree
    }

    /// Id of the triangle containing `p`, if any.
    pub fn query(&self, p: Vec2) -> Option<u32> {
        if self.nodes.is_empty() {
            return None;
        }
        self.query_node(0, p)
    }

    pub fn stats(&self) -> BspStats {
        let mut stats = BspStats {
            nodes: self.nodes.len(),
            ..BspStats::default()
        };
        for node in &self.nodes {
            if let BspNode::Leaf { depth, fragments } = node {
                stats.leaves += 1;
                stats.max_depth = stats.max_depth.max(*depth);
                stats.fragments += fragments.len();
                stats.max_leaf_fragments = stats.max_leaf_fragments.max(fragments.len());
                if fragments.len() > LEAF_FRAGMENTS && *depth <= MAX_DEPTH {
                    stats.unsplittable_leaves += 1;
                }
            }
        }
        stats
    }

    fn query_node(&self, idx: usize, p: Vec2) -> Option<u32> {
        match &self.nodes[idx] {
            BspNode::Leaf { fragments, .. } => {
                fragments.iter().find(|f| f.contains(p)).map(|f| f.id)
            }
            BspNode::Split { line, left, right } => {
                let s = line.side_value(p);
                let (near, far) = if s < 0.0 {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                // Close to the line the sign may be wrong, and so may the clipped fragment edges.
                self.query_node(near, p).or_else(|| {
                    if s.abs() <= 2.0 * side_tolerance(line, p) {
                        self.query_node(far, p)
                    } else {
                        None
                    }
                })
            }
        }
    }

    fn build_node(&mut self, fragments: Vec<Fragment>, depth: usize) -> usize {
        let idx = self.nodes.len();
        if fragments.len() <= LEAF_FRAGMENTS || depth > MAX_DEPTH {
            self.nodes.push(BspNode::Leaf { depth, fragments });
            return idx;
        }

        let Some(line) = select_split(&fragments) else {
            self.nodes.push(BspNode::Leaf { depth, fragments });
            return idx;
        };

        // Reserve the slot; children are appended after it.
        self.nodes.push(BspNode::Leaf {
            depth,
            fragments: Vec::new(),
        });

        let mut left = Vec::new();
        let mut right = Vec::new();
        for fragment in fragments {
            match fragment.side_of(&line) {
                Side::Left => left.push(fragment),
                Side::Right => right.push(fragment),
                Side::Over => clip(&line, &fragment, &mut left, &mut right),
            }
        }

        let left = self.build_node(left, depth + 1);
        let right = self.build_node(right, depth + 1);
        self.nodes[idx] = BspNode::Split { line, left, right };
        idx
    }
}

/// Rounding bound on `line.side_value(p)`.
///
/// Grows with the absolute coordinates involved, not just with the distance to `p0`, so it
/// stays meaningful for meshes far from the origin.
fn side_tolerance(line: &Segment, p: Vec2) -> f32 {
    let v = line.vector();
    v.length() * (line.p0.length() + p.length() + v.length()) * SIDE_EPSILON
}

/// Best splitting line among all fragment edges, or `None` if every edge leaves all fragments
/// on one side.
fn select_split(fragments: &[Fragment]) -> Option<Segment> {
    let mut best: Option<(i64, Segment)> = None;
    let count = fragments.len();

    for fragment in fragments {
        for i in 0..3 {
            let candidate = Segment::new(fragment.vertices[i], fragment.vertices[(i + 1) % 3]);
            if candidate.is_degenerate() {
                continue;
            }

            let (mut left, mut right, mut over) = (0i64, 0i64, 0i64);
            for other in fragments {
                match other.side_of(&candidate) {
                    Side::Left => left += 1,
                    Side::Right => right += 1,
                    Side::Over => over += 1,
                }
            }

            if (left == 0 || right == 0) && (left + right) as usize == count {
                continue;
            }

            let score = left.min(right) * 3 - (left - right).abs() - over * 2;
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, candidate));
            }
        }
    }

    best.map(|(_, line)| line)
}

/// Clip a straddling fragment against `line`, appending the pieces to each side.
///
/// Slivers whose halves both collapse are dropped.
fn clip(line: &Segment, fragment: &Fragment, left: &mut Vec<Fragment>, right: &mut Vec<Fragment>) {
    let left_poly = clip_half(line, &fragment.vertices, Side::Left);
    let right_poly = clip_half(line, &fragment.vertices, Side::Right);
    fan(fragment.id, &left_poly, left);
    fan(fragment.id, &right_poly, right);
}

/// Sutherland–Hodgman against one closed half-plane. Returns at most four vertices.
fn clip_half(line: &Segment, tri: &[Vec2; 3], keep: Side) -> Vec<Vec2> {
    let inside = |s: f32| match keep {
        Side::Left => s <= 0.0,
        _ => s >= 0.0,
    };

    let mut out: Vec<Vec2> = Vec::with_capacity(4);
    let push = |p: Vec2, out: &mut Vec<Vec2>| {
        if out.last() != Some(&p) {
            out.push(p);
        }
    };

    let mut a = tri[2];
    let mut sa = line.side_value(a);
    for &b in tri {
        let sb = line.side_value(b);
        if inside(sb) {
            if !inside(sa) {
                push(segment_line_intersection(line.p0, line.p1, a, b), &mut out);
            }
            push(b, &mut out);
        } else if inside(sa) {
            push(segment_line_intersection(line.p0, line.p1, a, b), &mut out);
        }
        a = b;
        sa = sb;
    }

    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn fan(id: u32, poly: &[Vec2], out: &mut Vec<Fragment>) {
    if poly.len() < 3 {
        return;
    }
    debug_assert!(poly.len() <= 4, "clipped triangle has {} vertices", poly.len());
    for k in 1..poly.len() - 1 {
        let tri = [poly[0], poly[k], poly[k + 1]];
        if cross2(tri[1] - tri[0], tri[2] - tri[0]) != 0.0 {
            out.push(Fragment::new(id, tri));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn area(f: &Fragment) -> f32 {
        let [a, b, c] = f.vertices;
        cross2(b - a, c - a).abs() * 0.5
    }

    #[test]
    fn clipping_preserves_area_and_parent_id() {
        let line = Segment::new(v(0.5, -1.0), v(0.5, 2.0));
        let tri = Fragment::new(7, [v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)]);
        assert_eq!(tri.side_of(&line), Side::Over);

        let mut left = Vec::new();
        let mut right = Vec::new();
        clip(&line, &tri, &mut left, &mut right);

        assert!(!left.is_empty() && !right.is_empty());
        assert!(left.iter().chain(right.iter()).all(|f| f.id == 7));
        let total: f32 = left.iter().chain(right.iter()).map(area).sum();
        assert!((total - area(&tri)).abs() < 1e-5);
    }

    #[test]
    fn clipping_through_a_vertex_yields_two_triangles() {
        // The line passes through (0,0) and splits the opposite edge.
        let line = Segment::new(v(0.0, 0.0), v(1.0, 1.0));
        let tri = Fragment::new(1, [v(0.0, 0.0), v(2.0, 0.0), v(0.0, 2.0)]);
        let mut left = Vec::new();
        let mut right = Vec::new();
        clip(&line, &tri, &mut left, &mut right);
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 1);
    }

    #[test]
    fn vertices_within_rounding_of_the_line_do_not_straddle() {
        let line = Segment::new(v(0.0, 0.0), v(1.0, 1.0));
        // The middle vertex sits one ulp below the line.
        let sliver = Fragment::new(3, [v(0.0, 2.0), v(3.0, 2.999_999_8), v(4.0, 4.0)]);
        assert!(line.side_value(sliver.vertices[1]) < 0.0);
        assert_eq!(sliver.side_of(&line), Side::Right);
    }

    #[test]
    fn collapsed_sliver_is_dropped_by_clipping() {
        let line = Segment::new(v(2.0, 9.0), v(2.960_47, 9.888_31));
        let sliver = Fragment::new(
            9,
            [v(2.3595, 9.7517), v(2.960_47, 9.888_31), v(2.960_47, 9.888_31)],
        );
        let mut left = Vec::new();
        let mut right = Vec::new();
        clip(&line, &sliver, &mut left, &mut right);
        assert!(left.iter().chain(right.iter()).all(|f| area(f) > 0.0));
    }

    #[test]
    fn point_near_a_split_far_from_the_origin_is_found() {
        let origin = v(1000.0, 1000.0);
        let mut tris = Vec::new();
        for x in 0..4 {
            let x0 = x as f32;
            let at = |dx: f32, dy: f32| origin + v(x0 + dx, dy);
            tris.push([at(0.0, 0.0), at(1.0, 0.0), at(1.0, 1.0)]);
            tris.push([at(0.0, 0.0), at(1.0, 1.0), at(0.0, 1.0)]);
        }
        let tree = BspTree::build(tris.iter().copied());
        // Just off each cell diagonal, on the lower triangle's side.
        for x in 0..4 {
            let q = origin + v(x as f32 + 0.5, 0.499);
            assert_eq!(tree.query(q), Some(2 * x as u32), "cell {x}");
        }
    }

    #[test]
    fn small_sets_stay_leaves() {
        let tree = BspTree::build([
            [v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)],
            [v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)],
        ]);
        let stats = tree.stats();
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.leaves, 1);
        assert_eq!(tree.query(v(0.2, 0.2)), Some(0));
        assert_eq!(tree.query(v(0.8, 0.8)), Some(1));
        assert_eq!(tree.query(v(3.0, 3.0)), None);
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let tree = BspTree::default();
        assert_eq!(tree.query(v(0.0, 0.0)), None);
        assert_eq!(tree.stats().leaves, 1);
    }

    #[test]
    fn split_is_chosen_for_larger_sets() {
        let mut tris = Vec::new();
        for x in 0..4 {
            let x0 = x as f32;
            tris.push([v(x0, 0.0), v(x0 + 1.0, 0.0), v(x0 + 1.0, 1.0)]);
            tris.push([v(x0, 0.0), v(x0 + 1.0, 1.0), v(x0, 1.0)]);
        }
        let tree = BspTree::build(tris);
        let stats = tree.stats();
        assert!(stats.nodes > 1);
        assert!(stats.max_leaf_fragments <= LEAF_FRAGMENTS);
        assert_eq!(tree.query(v(2.7, 0.2)), Some(4));
        assert_eq!(tree.query(v(2.2, 0.7)), Some(5));
    }
}
