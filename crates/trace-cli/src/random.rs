//! Random board generation for stress runs.

use rand::Rng;

use trace_core::{BoardBounds, ObstacleRect, RouterConfig};

use crate::scenario::{AnchorSpec, Scenario, TraceSpec};

/// Largest obstacle edge, in cells.
const MAX_OBSTACLE_CELLS: i32 = 6;

#[derive(Debug, Clone)]
pub struct RandomBoard {
    pub width: i32,
    pub height: i32,
    pub traces: usize,
    pub obstacles: usize,
}

/// Build a board of `width` x `height` cells centred on the surface origin, with random
/// rectangular obstacles and random anchor pairs inside the routable area. Anchors are
/// placed on cell positions so they map back to exact cells.
pub fn random_scenario<R: Rng + ?Sized>(
    board: &RandomBoard,
    config: &RouterConfig,
    rng: &mut R,
) -> Scenario {
    let step = config.step;
    let bounds = BoardBounds::centered(board.width, board.height, step);
    let lo = config.border_cells;
    let hi_x = (board.width - config.border_cells).max(lo + 1);
    let hi_y = (board.height - config.border_cells).max(lo + 1);

    let cell_to_surface = |x: i32, y: i32| -> [f64; 2] {
        [
            bounds.min_x + x as f64 * step,
            bounds.min_y + y as f64 * step,
        ]
    };

    let obstacles = (0..board.obstacles)
        .map(|_| {
            let x = rng.random_range(lo..hi_x);
            let y = rng.random_range(lo..hi_y);
            let w = rng.random_range(1..=MAX_OBSTACLE_CELLS);
            let h = rng.random_range(1..=MAX_OBSTACLE_CELLS);
            let [min_x, min_y] = cell_to_surface(x, y);
            let [max_x, max_y] = cell_to_surface(x + w - 1, y + h - 1);
            let pad = step / 4.0;
            ObstacleRect::new(min_x - pad, min_y - pad, max_x + pad, max_y + pad)
        })
        .collect();

    let traces = (0..board.traces)
        .map(|i| {
            let origin = cell_to_surface(rng.random_range(lo..hi_x), rng.random_range(lo..hi_y));
            let destination =
                cell_to_surface(rng.random_range(lo..hi_x), rng.random_range(lo..hi_y));
            TraceSpec {
                name: format!("net{:03}", i),
                origin: AnchorSpec::Point(origin),
                destination: AnchorSpec::Point(destination),
            }
        })
        .collect();

    Scenario {
        bounds,
        config: Some(config.clone()),
        obstacles,
        traces,
    }
}
