//! Printable snapshot of a replayed frame.

use std::fmt;

use crystals_vs_trucks_system_replay::SimulationContext;
use crystals_vs_trucks_world::query;
use serde::Serialize;

/// Final frame of a headless replay.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct FrameReport {
    pub(crate) clock_seconds: f64,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) grid: Vec<Vec<u32>>,
    pub(crate) trucks: Vec<TruckReport>,
    /// Ignored scenario lines followed by the rejections of this frame.
    pub(crate) diagnostics: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct TruckReport {
    pub(crate) id: u32,
    pub(crate) column: u32,
    pub(crate) row: u32,
}

impl FrameReport {
    pub(crate) fn capture(context: &SimulationContext) -> Self {
        let state = context.state();
        let dimensions = query::dimensions(state);
        let diagnostics = context
            .scenario()
            .diagnostics()
            .iter()
            .chain(context.diagnostics())
            .map(ToString::to_string)
            .collect();

        Self {
            clock_seconds: context.clock().as_secs_f64(),
            width: dimensions.width(),
            height: dimensions.height(),
            grid: query::grid(state).rows().to_vec(),
            trucks: query::trucks(state)
                .iter()
                .map(|truck| TruckReport {
                    id: truck.id().get(),
                    column: truck.cell().column(),
                    row: truck.cell().row(),
                })
                .collect(),
            diagnostics,
        }
    }
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "clock {:.3}s, grid {}x{}",
            self.clock_seconds, self.width, self.height
        )?;
        for row in &self.grid {
            for count in row {
                write!(f, "{count}")?;
            }
            writeln!(f)?;
        }
        for truck in &self.trucks {
            writeln!(f, "truck {} at ({}, {})", truck.id, truck.column, truck.row)?;
        }
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
