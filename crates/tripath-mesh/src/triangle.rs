use tripath_core::math::triangle_normal;
use tripath_core::{NodeId, Route, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    id: NodeId,
    vertices: [Vec3; 3],
    normal: Vec3,
}

impl Triangle {
    pub fn new(id: NodeId, v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            id,
            vertices: [v0, v1, v2],
            normal: triangle_normal(v0, v1, v2),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn v0(&self) -> Vec3 {
        self.vertices[0]
    }

    pub fn v1(&self) -> Vec3 {
        self.vertices[1]
    }

    pub fn v2(&self) -> Vec3 {
        self.vertices[2]
    }

    /// Unit normal, or zero for a degenerate triangle.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }

    /// Midpoints of the edges `v0v1`, `v1v2`, `v2v0`.
    pub fn edge_midpoints(&self) -> [Vec3; 3] {
        let [a, b, c] = self.vertices;
        [(a + b) * 0.5, (b + c) * 0.5, (c + a) * 0.5]
    }

    /// Largest distance between two of the edge midpoints (half the longest edge).
    pub fn midpoint_spread(&self) -> f32 {
        let [m0, m1, m2] = self.edge_midpoints();
        m0.distance(m1).max(m1.distance(m2)).max(m2.distance(m0))
    }
}

/// Directed crossing from one triangle into an adjacent one.
///
/// `left`/`right` are the shared edge's endpoints as seen walking from `origin` into `dest`
/// (left is counter-clockwise in the projected plane). The reverse route carries the same
/// points swapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedEdge {
    pub left: Vec3,
    pub right: Vec3,
    origin: NodeId,
    dest: NodeId,
    cost: f32,
}

impl SharedEdge {
    pub fn new(left: Vec3, right: Vec3, origin: NodeId, dest: NodeId, cost: f32) -> Self {
        Self {
            left,
            right,
            origin,
            dest,
            cost,
        }
    }

    pub fn reversed(&self, cost: f32) -> Self {
        Self::new(self.right, self.left, self.dest, self.origin, cost)
    }
}

impl Route for SharedEdge {
    fn cost(&self) -> f32 {
        self.cost
    }

    fn origin(&self) -> NodeId {
        self.origin
    }

    fn dest(&self) -> NodeId {
        self.dest
    }
}
