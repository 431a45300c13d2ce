//! Board scenario files: bounds, obstacles and anchor pairs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use trace_core::{
    BoardBounds, FrameChain, ObstacleRect, OccupancyGrid, RectObstacles, RouteScheduler,
    RouterConfig, SurfaceAnchor, SurfacePoint, TraceId,
};

/// A board to route, as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub bounds: BoardBounds,
    /// Overrides the environment config when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RouterConfig>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleRect>,
    pub traces: Vec<TraceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSpec {
    pub name: String,
    pub origin: AnchorSpec,
    pub destination: AnchorSpec,
}

/// Either a plain surface position or a parent chain down to the anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnchorSpec {
    Point([f64; 2]),
    Frames(FrameChain),
}

impl SurfaceAnchor for AnchorSpec {
    fn surface_position(&self) -> SurfacePoint {
        match self {
            AnchorSpec::Point(xy) => SurfacePoint::from(*xy),
            AnchorSpec::Frames(chain) => chain.surface_position(),
        }
    }
}

/// A scheduler loaded with every trace of a scenario, not yet routed.
pub struct LoadedBoard {
    pub scheduler: RouteScheduler,
    /// Scenario names in file order
    pub traces: Vec<(String, TraceId)>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).with_context(|| format!("failed to write scenario {}", path.display()))
    }

    /// Sample the obstacles into a fresh grid and register every trace.
    pub fn build(&self, fallback: RouterConfig) -> Result<LoadedBoard> {
        let config = self.config.clone().unwrap_or(fallback);
        let sampler = RectObstacles::new(self.obstacles.clone());
        let grid = OccupancyGrid::from_bounds(self.bounds, &config, &sampler)
            .context("failed to build occupancy grid")?;
        tracing::info!(
            width = grid.width(),
            height = grid.height(),
            obstacles = self.obstacles.len(),
            traces = self.traces.len(),
            "board loaded"
        );

        let scheduler = RouteScheduler::new(grid, config);
        let mut traces = Vec::with_capacity(self.traces.len());
        for entry in &self.traces {
            let id = scheduler.register_labeled(
                entry.name.clone(),
                entry.origin.surface_position(),
                entry.destination.surface_position(),
            )?;
            traces.push((entry.name.clone(), id));
        }
        Ok(LoadedBoard { scheduler, traces })
    }
}
