//! Pathfinding configuration, loaded from YAML.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tripath_core::{PlaneProjection, ProjectionPlane, SearchConfig, Vec3};

use crate::funnel::FunnelBudget;
use crate::mesh::RouteCost;
use crate::mesh_data::{DEGENERATE_EPSILON, MERGE_GAP};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Working plane the mesh is projected onto
    pub projection: ProjectionConfig,

    /// Pricing of triangle crossings
    pub route_cost: RouteCost,

    pub search: SearchLimits,

    /// Corridor smoothing budget
    pub funnel: FunnelConfig,

    /// Vertex merging applied before the mesh is built
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub plane: ProjectionPlane,

    /// Explicit rotation in degrees; overrides `plane` when set
    pub euler_degrees: Option<Vec3>,
}

impl ProjectionConfig {
    pub fn projection(&self) -> PlaneProjection {
        match self.euler_degrees {
            Some(euler) => PlaneProjection::from_euler_degrees(euler),
            None => PlaneProjection::from_plane(self.plane),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLimits {
    /// Expansion cap; unlimited when absent
    #[serde(default)]
    pub max_expansions: Option<usize>,

    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

fn default_initial_capacity() -> usize {
    SearchConfig::default().initial_capacity
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_expansions: None,
            initial_capacity: default_initial_capacity(),
        }
    }
}

impl From<&SearchLimits> for SearchConfig {
    fn from(limits: &SearchLimits) -> Self {
        SearchConfig {
            max_expansions: limits.max_expansions.unwrap_or(usize::MAX),
            initial_capacity: limits.initial_capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default)]
    pub max_iterations: Option<usize>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl From<&FunnelConfig> for FunnelBudget {
    fn from(config: &FunnelConfig) -> Self {
        FunnelBudget {
            max_iterations: config.max_iterations,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_gap")]
    pub gap: f32,

    #[serde(default = "default_degenerate_epsilon")]
    pub degenerate_epsilon: f32,
}

fn default_gap() -> f32 {
    MERGE_GAP
}
fn default_degenerate_epsilon() -> f32 {
    DEGENERATE_EPSILON
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gap: default_gap(),
            degenerate_epsilon: default_degenerate_epsilon(),
        }
    }
}

impl PathfindingConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    pub fn projection(&self) -> PlaneProjection {
        self.projection.projection()
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::from(&self.search)
    }

    pub fn funnel_budget(&self) -> FunnelBudget {
        FunnelBudget::from(&self.funnel)
    }
}
