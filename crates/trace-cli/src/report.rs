//! Run summaries for the command line.

use serde::Serialize;
use std::fmt::Write as _;

use trace_core::{path_length, FailureReason, RouteScheduler, RoutingReport, TraceState};

use crate::scenario::LoadedBoard;

#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub name: String,
    pub id: u32,
    pub state: TraceState,
    pub legs: usize,
    pub length: f64,
    /// Final path when routed, otherwise the partial walk of the last attempt
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub report: RoutingReport,
    pub traces: Vec<TraceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascii: Option<String>,
}

impl RunSummary {
    pub fn collect(board: &LoadedBoard, report: RoutingReport, with_ascii: bool) -> anyhow::Result<Self> {
        let traces = board
            .traces
            .iter()
            .filter_map(|(name, id)| {
                let state = board.scheduler.trace_state(*id)?;
                let points = board
                    .scheduler
                    .get_path(*id)
                    .or_else(|| board.scheduler.partial_path(*id))
                    .unwrap_or_default();
                Some(TraceSummary {
                    name: name.clone(),
                    id: id.raw(),
                    state,
                    legs: points.len().saturating_sub(1),
                    length: path_length(&points),
                    points: points.iter().map(|p| [p.x, p.y]).collect(),
                })
            })
            .collect();
        let ascii = if with_ascii {
            Some(render_grid(&board.scheduler)?)
        } else {
            None
        };
        Ok(Self {
            report,
            traces,
            ascii,
        })
    }

    pub fn routed_count(&self) -> usize {
        self.traces
            .iter()
            .filter(|t| t.state == TraceState::Routed)
            .count()
    }
}

fn render_grid(scheduler: &RouteScheduler) -> anyhow::Result<String> {
    Ok(scheduler.grid_snapshot()?.render_ascii())
}

fn state_label(state: &TraceState) -> String {
    match state {
        TraceState::Pending => "pending".to_string(),
        TraceState::Routed => "routed".to_string(),
        TraceState::Failed(reason) => format!("FAILED ({})", reason),
    }
}

/// Human readable summary, one line per trace.
pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    let elapsed = summary.report.finished_at - summary.report.started_at;
    let _ = writeln!(
        out,
        "Routed {}/{} traces in {} attempts ({} ms)",
        summary.routed_count(),
        summary.traces.len(),
        summary.report.attempts,
        elapsed.num_milliseconds()
    );
    if !summary.report.destroyed.is_empty() {
        let torn: Vec<String> = summary
            .report
            .destroyed
            .iter()
            .map(|id| id.to_string())
            .collect();
        let _ = writeln!(out, "Torn down: {}", torn.join(", "));
    }
    let _ = writeln!(out);

    let width = summary
        .traces
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);
    for trace in &summary.traces {
        let _ = writeln!(
            out,
            "  {:<width$}  {:<28} legs={:<3} length={:.4}",
            trace.name,
            state_label(&trace.state),
            trace.legs,
            trace.length,
            width = width
        );
    }

    let deadlocks = summary
        .report
        .failed
        .iter()
        .filter(|(_, reason)| *reason == FailureReason::UnresolvedDeadlock)
        .count();
    if deadlocks > 0 {
        let _ = writeln!(out, "\n{} trace(s) left in deadlock", deadlocks);
    }

    if let Some(ascii) = &summary.ascii {
        let _ = writeln!(out);
        out.push_str(ascii);
    }
    out
}
