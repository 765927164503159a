use std::sync::Arc;

use tripath_core::{NodeId, PathFinder, Route, SearchError, SearchStats, Topology, Vec3};

use crate::config::PathfindingConfig;
use crate::funnel::{FunnelBudget, TrianglePath};
use crate::mesh::{MeshError, TriangleMesh};
use crate::mesh_data::TriangleMeshData;

/// Everything one successful query produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// From the query origin to the destination, both exact.
    pub waypoints: Vec<Vec3>,
    /// Triangles entered after the origin triangle.
    pub corridor: Vec<NodeId>,
    pub stats: SearchStats,
    pub funnel_timed_out: bool,
}

/// Mesh, search engine, and smoother bundled for point-to-point queries.
///
/// Clones share the mesh and the engine, so a clone searching while another is busy is
/// rejected with [`SearchError::Busy`].
#[derive(Debug, Clone)]
pub struct TriangleMeshPathFinding {
    mesh: Arc<TriangleMesh>,
    finder: Arc<PathFinder>,
    budget: FunnelBudget,
}

impl TriangleMeshPathFinding {
    pub fn new(mut data: TriangleMeshData, config: &PathfindingConfig) -> Result<Self, MeshError> {
        if config.merge.enabled {
            data.merge_vertices(config.merge.gap, config.merge.degenerate_epsilon);
        }
        let mesh = data.to_mesh(config.projection(), config.route_cost)?;
        Ok(Self::from_mesh(Arc::new(mesh), config))
    }

    pub fn from_mesh(mesh: Arc<TriangleMesh>, config: &PathfindingConfig) -> Self {
        Self {
            mesh,
            finder: Arc::new(PathFinder::new(config.search_config())),
            budget: config.funnel_budget(),
        }
    }

    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    pub fn budget(&self) -> &FunnelBudget {
        &self.budget
    }

    pub fn find_path(&self, from: Vec3, to: Vec3) -> Result<PathResult, SearchError> {
        let mut path = TrianglePath::new();
        let stats = self.finder.try_search(self.mesh.as_ref(), from, to, &mut path)?;
        let funnel = path.waypoints(from, to, self.mesh.projection(), &self.budget);
        Ok(PathResult {
            waypoints: funnel.waypoints,
            corridor: path.routes().iter().map(Route::dest).collect(),
            stats,
            funnel_timed_out: funnel.timed_out,
        })
    }

    pub fn try_search(&self, from: Vec3, to: Vec3) -> Result<Vec<Vec3>, SearchError> {
        self.find_path(from, to).map(|result| result.waypoints)
    }

    /// Waypoints, or `None` after logging why the search failed.
    pub fn search(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        match self.try_search(from, to) {
            Ok(waypoints) => Some(waypoints),
            Err(SearchError::Busy) => {
                tracing::debug!("search rejected: engine busy");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, ?from, ?to, "path search failed");
                None
            }
        }
    }

    /// Run one search on the blocking pool.
    pub async fn search_async(&self, from: Vec3, to: Vec3) -> Result<Vec<Vec3>, SearchError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.try_search(from, to))
            .await
            .map_err(|err| SearchError::Worker(err.to_string()))?
    }

    /// Resolve a point to its triangle.
    pub fn locate(&self, point: Vec3) -> Option<NodeId> {
        self.mesh.query(point)
    }
}
