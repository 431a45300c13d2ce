//! Router configuration.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{Result, RouteError};

/// Default cell size in surface units (one trace width).
pub const DEFAULT_STEP: f64 = 0.0075;
pub const DEFAULT_BORDER_CELLS: i32 = 1;
pub const DEFAULT_LEG_BUDGET: usize = 20;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Tunables for grid construction and routing passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Cell size in surface units
    pub step: f64,
    /// Width of the reserved border, in cells
    pub border_cells: i32,
    /// Maximum number of legs a single trace may use
    pub leg_budget: usize,
    /// Router invocations per trace per pass
    pub max_attempts: u32,
    /// Release the cells of a trace that ends up failed
    pub release_failed_cells: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            border_cells: DEFAULT_BORDER_CELLS,
            leg_budget: DEFAULT_LEG_BUDGET,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            release_failed_cells: true,
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by `TRACE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(step) = lookup("TRACE_STEP").and_then(|s| s.parse().ok()) {
            self.step = step;
        }
        if let Some(border) = lookup("TRACE_BORDER_CELLS").and_then(|s| s.parse().ok()) {
            self.border_cells = border;
        }
        if let Some(budget) = lookup("TRACE_LEG_BUDGET").and_then(|s| s.parse().ok()) {
            self.leg_budget = budget;
        }
        if let Some(attempts) = lookup("TRACE_MAX_ATTEMPTS").and_then(|s| s.parse().ok()) {
            self.max_attempts = attempts;
        }
        if let Some(release) = lookup("TRACE_RELEASE_FAILED").and_then(|s| s.parse().ok()) {
            self.release_failed_cells = release;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(RouteError::InvalidConfig(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if self.border_cells < 0 {
            return Err(RouteError::InvalidConfig(format!(
                "border_cells must not be negative, got {}",
                self.border_cells
            )));
        }
        if self.leg_budget == 0 {
            return Err(RouteError::InvalidConfig("leg_budget must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(RouteError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}
