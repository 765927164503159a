use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tripath_core::{NodeId, PlaneProjection, Topology, Vec2, Vec3};

use crate::bsp::BspTree;
use crate::triangle::{SharedEdge, Triangle};

/// How a crossing between two triangles is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteCost {
    /// Every crossing costs 1.
    #[default]
    Unit,
    /// Entering a triangle costs half its longest edge.
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("index {index} at position {position} is out of range for {vertices} vertices")]
    IndexOutOfRange {
        position: usize,
        index: i64,
        vertices: usize,
    },

    #[error("mesh data has no {0}")]
    Missing(&'static str),
}

/// Walkable triangle mesh: triangles, their adjacency, and a point-location tree.
///
/// Read-only once built; share it between engines through an `Arc`.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    faces: Vec<[u32; 3]>,
    routes: Vec<Vec<SharedEdge>>,
    islands: Vec<NodeId>,
    projection: PlaneProjection,
    cost_mode: RouteCost,
    bsp: BspTree,
}

impl TriangleMesh {
    /// Build from flat index triples into `vertices`.
    pub fn new(
        indices: &[u32],
        vertices: &[Vec3],
        projection: PlaneProjection,
        cost_mode: RouteCost,
    ) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }
        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, i)| **i as usize >= vertices.len())
        {
            return Err(MeshError::IndexOutOfRange {
                position,
                index: i64::from(index),
                vertices: vertices.len(),
            });
        }

        let faces: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let triangles: Vec<Triangle> = faces
            .iter()
            .enumerate()
            .map(|(id, f)| {
                Triangle::new(
                    NodeId(id as u32),
                    vertices[f[0] as usize],
                    vertices[f[1] as usize],
                    vertices[f[2] as usize],
                )
            })
            .collect();

        let routes = build_routes(&faces, vertices, &triangles, &projection, cost_mode);

        let islands: Vec<NodeId> = routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_empty())
            .map(|(id, _)| NodeId(id as u32))
            .collect();
        if triangles.len() > 1 {
            for island in &islands {
                tracing::warn!(triangle = island.0, "triangle has no neighbor; unreachable island");
            }
        }

        let bsp = BspTree::build(
            triangles
                .iter()
                .map(|t| t.vertices().map(|v| projection.project(v))),
        );

        let mesh = Self {
            triangles,
            faces,
            routes,
            islands,
            projection,
            cost_mode,
            bsp,
        };
        tracing::debug!(
            triangles = mesh.triangles.len(),
            routes = mesh.route_count(),
            islands = mesh.islands.len(),
            bsp_nodes = mesh.bsp.stats().nodes,
            "triangle mesh built"
        );
        Ok(mesh)
    }

    /// Build from free-standing triangles; identical positions become shared vertices.
    pub fn from_triangles(
        triangles: &[[Vec3; 3]],
        projection: PlaneProjection,
        cost_mode: RouteCost,
    ) -> Result<Self, MeshError> {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        struct VertexKey(u32, u32, u32);

        impl VertexKey {
            fn from_vec3(p: Vec3) -> Self {
                Self(p.x.to_bits(), p.y.to_bits(), p.z.to_bits())
            }
        }

        let mut lookup: BTreeMap<VertexKey, u32> = BTreeMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::with_capacity(triangles.len() * 3);
        for tri in triangles {
            for &v in tri {
                let index = *lookup.entry(VertexKey::from_vec3(v)).or_insert_with(|| {
                    vertices.push(v);
                    (vertices.len() - 1) as u32
                });
                indices.push(index);
            }
        }
        Self::new(&indices, &vertices, projection, cost_mode)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, id: NodeId) -> Option<&Triangle> {
        self.triangles.get(id.index())
    }

    /// Vertex indices of a triangle, in input order.
    pub fn face(&self, id: NodeId) -> Option<[u32; 3]> {
        self.faces.get(id.index()).copied()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.iter().map(Vec::len).sum()
    }

    /// Triangles without any neighbor.
    pub fn islands(&self) -> &[NodeId] {
        &self.islands
    }

    pub fn bsp(&self) -> &BspTree {
        &self.bsp
    }

    pub fn projection(&self) -> &PlaneProjection {
        &self.projection
    }

    pub fn cost_mode(&self) -> RouteCost {
        self.cost_mode
    }

    pub fn project(&self, point: Vec3) -> Vec2 {
        self.projection.project(point)
    }
}

impl Topology for TriangleMesh {
    type Route = SharedEdge;

    fn node_count(&self) -> usize {
        self.triangles.len()
    }

    fn query(&self, point: Vec3) -> Option<NodeId> {
        self.bsp.query(self.projection.project(point)).map(NodeId)
    }

    fn estimate(&self, from: NodeId, to: NodeId) -> f32 {
        let (Some(a), Some(b)) = (self.triangle(from), self.triangle(to)) else {
            return 0.0;
        };
        let mut best = f32::INFINITY;
        for ma in a.edge_midpoints() {
            for mb in b.edge_midpoints() {
                best = best.min(ma.distance_squared(mb));
            }
        }
        best.sqrt()
    }

    fn routes(&self, node: NodeId) -> Option<&[SharedEdge]> {
        self.routes.get(node.index()).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy)]
enum EdgeSlot {
    /// Seen once, in the winding order of `tri`.
    Open { tri: usize, a: u32, b: u32 },
    Matched,
}

fn build_routes(
    faces: &[[u32; 3]],
    vertices: &[Vec3],
    triangles: &[Triangle],
    projection: &PlaneProjection,
    cost_mode: RouteCost,
) -> Vec<Vec<SharedEdge>> {
    let mut routes: Vec<Vec<SharedEdge>> = vec![Vec::new(); faces.len()];
    let mut edges: BTreeMap<(u32, u32), EdgeSlot> = BTreeMap::new();

    let cost_of = |tri: usize| match cost_mode {
        RouteCost::Unit => 1.0,
        RouteCost::Metric => triangles[tri].midpoint_spread(),
    };

    for (tri, face) in faces.iter().enumerate() {
        for i in 0..3 {
            let (a, b) = (face[i], face[(i + 1) % 3]);
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            match edges.get(&key).copied() {
                None => {
                    edges.insert(key, EdgeSlot::Open { tri, a, b });
                }
                Some(EdgeSlot::Open { tri: other, a: oa, b: ob }) => {
                    if other == tri {
                        continue;
                    }
                    edges.insert(key, EdgeSlot::Matched);
                    if routes[other].len() >= 3 || routes[tri].len() >= 3 {
                        tracing::warn!(
                            triangle = tri,
                            neighbor = other,
                            "triangle already has 3 neighbors; skipping shared edge"
                        );
                        continue;
                    }
                    let forward = oriented_route(
                        &triangles[other],
                        vertices[oa as usize],
                        vertices[ob as usize],
                        NodeId(tri as u32),
                        projection,
                        cost_of(tri),
                    );
                    routes[tri].push(forward.reversed(cost_of(other)));
                    routes[other].push(forward);
                }
                Some(EdgeSlot::Matched) => {
                    tracing::warn!(
                        triangle = tri,
                        edge = ?key,
                        "non-manifold edge shared by more than two triangles; skipping"
                    );
                }
            }
        }
    }

    debug_assert!(
        routes.iter().all(|r| r.len() <= 3),
        "triangle reports more than 3 neighbors"
    );
    routes
}

/// Route out of `origin` through the edge `p0..p1`, with the left point counter-clockwise from
/// the right one as seen from the origin's projected centroid.
fn oriented_route(
    origin: &Triangle,
    p0: Vec3,
    p1: Vec3,
    dest: NodeId,
    projection: &PlaneProjection,
    cost: f32,
) -> SharedEdge {
    let c = projection.project(origin.centroid());
    let (f0, f1) = (projection.project(p0), projection.project(p1));
    let (left, right) = if (f0 - c).perp_dot(f1 - c) > 0.0 {
        (p1, p0)
    } else {
        (p0, p1)
    };
    SharedEdge::new(left, right, origin.id(), dest, cost)
}
