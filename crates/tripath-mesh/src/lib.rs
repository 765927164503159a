//! Triangle navmesh backend (adjacency graph, point location, corridor smoothing, facade).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bsp;
pub mod config;
pub mod funnel;
pub mod mesh;
pub mod mesh_data;
pub mod pathfinding;
pub mod triangle;

pub use bsp::{BspStats, BspTree};
pub use config::PathfindingConfig;
pub use funnel::{string_pull, FunnelBudget, FunnelOutcome, TrianglePath};
pub use mesh::{MeshError, RouteCost, TriangleMesh};
pub use mesh_data::{MergeReport, MeshDataError, TriangleMeshData};
pub use pathfinding::{PathResult, TriangleMeshPathFinding};
pub use triangle::{SharedEdge, Triangle};
