use osseo_common::{MetricSample, Vec3};
use serde::{Deserialize, Serialize};

/// Static site in the bone matrix from which one osteoblast originates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pore {
    pub position: Vec3,
    pub radius: f64,
}

/// A migrating bone-forming cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Osteoblast {
    pub id: usize,
    pub position: Vec3,
    /// Unit vector from the originating pore toward the implant axis. Fixed for the run.
    pub direction: Vec3,
    /// Point on the implant axis level with the originating pore.
    pub target: Vec3,
    /// Set once on docking and never cleared within a run.
    pub docked: bool,
}

impl Osteoblast {
    pub fn distance_to_target(&self) -> f64 {
        self.position.distance(self.target)
    }
}

/// New bone spawned where an osteoblast docked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneGrowthUnit {
    pub osteoblast_id: usize,
    pub position: Vec3,
    pub radius: f64,
}

/// Global lifecycle of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Complete,
}

/// Aggregate counters of a run. Reset by every `start()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub elapsed_time: f64,
    pub ticks: u64,
    pub cells_reached: u32,
    pub bone_formation: f64,
    pub run_state: RunState,
}

impl SimulationState {
    pub fn new() -> Self {
        Self {
            elapsed_time: 0.0,
            ticks: 0,
            cells_reached: 0,
            bone_formation: 0.0,
            run_state: RunState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    /// Current `(time, cells_reached, bone_formation)` tuple.
    pub fn sample(&self) -> MetricSample {
        MetricSample {
            time: self.elapsed_time,
            cells_reached: self.cells_reached,
            bone_formation: self.bone_formation,
        }
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new()
    }
}
