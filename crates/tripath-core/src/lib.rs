//! Engine-agnostic path search primitives: geometry kernel, indexed open list, and a reusable
//! A* engine over any [`Topology`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod error;
pub mod math;
pub mod open_list;
pub mod search;

pub use error::{Endpoint, SearchError};
pub use math::{PlaneProjection, ProjectionPlane, Vec2, Vec3};
pub use open_list::{HeapItem, HeapOrder, OpenList};
pub use search::{
    compare_total_cost, NodeId, NodePath, PathFinder, PathSink, Route, RoutePath, SearchConfig,
    SearchStats, Topology,
};
