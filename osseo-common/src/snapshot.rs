use serde::{Serialize, Deserialize};

/// One point of the bone-modulus curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemodelingSample {
    pub step: usize,
    /// Mechanical stimulus (normalized strain energy density) at this step.
    pub stimulus: f64,
    /// Effective bone modulus in GPa.
    pub modulus: f64,
}

/// Aggregate migration metrics at a given simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub time: f64,
    pub cells_reached: u32,
    pub bone_formation: f64,
}

/// Final analysis of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_cells: u32,
    pub cells_reached: u32,
    /// `cells_reached / total_cells * 100`, or 0 when there are no cells.
    pub percent_reached: f64,
    pub bone_volume: f64,
    pub elapsed_time: f64,
}

impl RunSummary {
    pub fn new(total_cells: u32, cells_reached: u32, bone_volume: f64, elapsed_time: f64) -> Self {
        let percent_reached = if total_cells > 0 {
            cells_reached as f64 / total_cells as f64 * 100.0
        } else {
            0.0
        };
        RunSummary { total_cells, cells_reached, percent_reached, bone_volume, elapsed_time }
    }
}

/// Everything the engine saves for a run; read back by the visualizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub remodeling_rate: f64,
    pub remodeling: Vec<RemodelingSample>,
    pub cells_series: Vec<(f64, u32)>,
    pub bone_series: Vec<(f64, f64)>,
    /// Absent when the run was halted before completing.
    pub summary: Option<RunSummary>,
}
