use osseo_common::{MetricSample, RunSummary};
use log::trace;

// Absorbs the rounding drift of accumulated tick increments.
const TIME_EPSILON: f64 = 1e-9;

/// Collects the cells-reached and bone-volume time series of a migration run
/// at a bounded cadence, and produces the final summary.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    total_cells: u32,
    sample_interval: f64,
    last_sample_time: Option<f64>,
    cells_series: Vec<(f64, u32)>,
    bone_series: Vec<(f64, f64)>,
    latest: MetricSample,
}

impl MetricsAggregator {
    pub fn new(total_cells: u32, sample_interval: f64) -> Self {
        Self {
            total_cells,
            sample_interval,
            last_sample_time: None,
            cells_series: Vec::new(),
            bone_series: Vec::new(),
            latest: MetricSample { time: 0.0, cells_reached: 0, bone_formation: 0.0 },
        }
    }

    /// Clears all series for a new run.
    pub fn reset(&mut self, total_cells: u32) {
        *self = Self::new(total_cells, self.sample_interval);
    }

    /// Appends one sample to both series.
    pub fn record(&mut self, time: f64, cells_reached: u32, bone_formation: f64) {
        trace!("Metrics sample t={:.2}: cells={} bone={:.2}", time, cells_reached, bone_formation);
        self.cells_series.push((time, cells_reached));
        self.bone_series.push((time, bone_formation));
        self.last_sample_time = Some(time);
        self.latest = MetricSample { time, cells_reached, bone_formation };
    }

    /// True once `sample_interval` has passed since the last recorded sample.
    /// The first sample is due one interval after time zero.
    pub fn sample_due(&self, time: f64) -> bool {
        let since = self.last_sample_time.unwrap_or(0.0);
        time - since >= self.sample_interval - TIME_EPSILON
    }

    /// Records `sample` if it is due, or unconditionally when `force` is set.
    /// Returns whether it was recorded.
    pub fn observe(&mut self, sample: MetricSample, force: bool) -> bool {
        let due = force || self.sample_due(sample.time);
        if due {
            self.record(sample.time, sample.cells_reached, sample.bone_formation);
        }
        due
    }

    pub fn cells_series(&self) -> &[(f64, u32)] {
        &self.cells_series
    }

    pub fn bone_series(&self) -> &[(f64, f64)] {
        &self.bone_series
    }

    pub fn total_cells(&self) -> u32 {
        self.total_cells
    }

    /// Summary of the latest recorded sample. Authoritative once the run is complete.
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.total_cells,
            self.latest.cells_reached,
            self.latest.bone_formation,
            self.latest.time,
        )
    }
}
