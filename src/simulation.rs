use crate::geometry::{clamp_to_sphere, layout_pores, spawn_osteoblasts};
use crate::state::{BoneGrowthUnit, Osteoblast, Pore, RunState, SimulationState};
use osseo_common::{validate_growth_rate, MetricSample, MigrationParams, RunSummary, SimResult};
use log::{info, debug, trace};
use rayon::prelude::*;

// Tolerance for agents sitting exactly on the bone boundary after a clamp.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// What a call to [`MigrationSimulation::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The run is not in the `Running` state; nothing changed.
    Inactive,
    /// Time advanced; `docked` agents docked during this tick.
    Advanced { docked: u32 },
    /// Every agent has docked; the run is now `Complete`.
    Completed(RunSummary),
}

/// Agent-based model of osteoblasts migrating from pores in the bone matrix
/// toward the implant, forming new bone where they dock.
///
/// The simulation owns all agents, pores, growth units and counters. Drivers
/// call [`start`](Self::start) and then [`tick`](Self::tick) until the run completes.
pub struct MigrationSimulation {
    params: MigrationParams,
    state: SimulationState,
    pores: Vec<Pore>,
    osteoblasts: Vec<Osteoblast>,
    growth_units: Vec<BoneGrowthUnit>,
    summary: Option<RunSummary>,
}

impl MigrationSimulation {
    /// Creates an idle simulation. Parameters are validated here.
    pub fn new(params: MigrationParams) -> SimResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            state: SimulationState::new(),
            pores: Vec::new(),
            osteoblasts: Vec::new(),
            growth_units: Vec::new(),
            summary: None,
        })
    }

    /// Resets every counter, rebuilds pores and agents and enters `Running`.
    /// A layout without pores completes immediately.
    ///
    /// On error the previous state is left untouched.
    pub fn start(&mut self) -> SimResult<()> {
        self.params.validate()?;
        let pores = layout_pores(&self.params);
        let osteoblasts = spawn_osteoblasts(&pores, &self.params)?;

        self.pores = pores;
        self.osteoblasts = osteoblasts;
        self.growth_units.clear();
        self.summary = None;
        self.state = SimulationState::new();
        self.state.run_state = RunState::Running;

        info!(
            "Migration run started: {} rings x {} pores = {} osteoblasts, growth rate {:.3}",
            self.params.ring_count,
            self.params.pores_per_ring(),
            self.osteoblasts.len(),
            self.params.growth_rate
        );

        if self.osteoblasts.is_empty() {
            self.complete();
        }
        Ok(())
    }

    /// Cooperative cancellation: leaves `Running` without producing a summary.
    pub fn halt(&mut self) {
        if self.state.is_running() {
            info!("Migration run halted at t={:.1}", self.state.elapsed_time);
            self.state.run_state = RunState::Idle;
        }
    }

    /// Changes the per-tick step size, also mid-run.
    pub fn set_growth_rate(&mut self, growth_rate: f64) -> SimResult<()> {
        validate_growth_rate(growth_rate, self.params.docking_threshold)?;
        self.params.growth_rate = growth_rate;
        Ok(())
    }

    /// Advances every migrating agent by one tick.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running() {
            return TickOutcome::Inactive;
        }

        // --- 1. Move agents (Parallel) ---
        // Agents are independent while moving; docked ones are never touched again.
        let params = &self.params;
        let arrivals: Vec<usize> = self
            .osteoblasts
            .par_iter_mut()
            .filter_map(|cell| {
                if cell.docked || cell.distance_to_target() <= params.arrival_threshold {
                    return None;
                }
                move_within_bone(cell, params);
                if cell.distance_to_target() < params.docking_threshold {
                    cell.docked = true;
                    Some(cell.id)
                } else {
                    None
                }
            })
            .collect();

        // --- 2. Apply docking events (Serial, agent order) ---
        for &id in &arrivals {
            let position = self.osteoblasts[id].position;
            self.growth_units.push(BoneGrowthUnit {
                osteoblast_id: id,
                position,
                radius: self.params.growth_unit_radius,
            });
            self.state.cells_reached += 1;
            self.state.bone_formation += self.params.bone_increment;
            debug!(
                "Osteoblast {} docked at ({:.3}, {:.3}, {:.3}), t={:.1}",
                id, position.x, position.y, position.z, self.state.elapsed_time
            );
        }

        let all_done = self.osteoblasts.iter().all(|cell| cell.docked);
        self.state.elapsed_time += self.params.tick_dt;
        self.state.ticks += 1;
        trace!(
            "Tick {} (t={:.1}): {} docked this tick, {}/{} reached",
            self.state.ticks,
            self.state.elapsed_time,
            arrivals.len(),
            self.state.cells_reached,
            self.osteoblasts.len()
        );

        if all_done {
            TickOutcome::Completed(self.complete())
        } else {
            TickOutcome::Advanced { docked: arrivals.len() as u32 }
        }
    }

    // Running -> Complete; the only place a summary is produced.
    fn complete(&mut self) -> RunSummary {
        self.state.run_state = RunState::Complete;
        let summary = RunSummary::new(
            self.osteoblasts.len() as u32,
            self.state.cells_reached,
            self.state.bone_formation,
            self.state.elapsed_time,
        );
        info!(
            "Osseointegration complete: {}/{} cells reached ({:.1}%), bone volume {:.1} units, time {:.1} s",
            summary.cells_reached,
            summary.total_cells,
            summary.percent_reached,
            summary.bone_volume,
            summary.elapsed_time
        );
        self.summary = Some(summary);
        summary
    }

    pub fn params(&self) -> &MigrationParams {
        &self.params
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    pub fn pores(&self) -> &[Pore] {
        &self.pores
    }

    pub fn osteoblasts(&self) -> &[Osteoblast] {
        &self.osteoblasts
    }

    pub fn growth_units(&self) -> &[BoneGrowthUnit] {
        &self.growth_units
    }

    pub fn total_cells(&self) -> u32 {
        self.osteoblasts.len() as u32
    }

    /// Current `(time, cells_reached, bone_formation)`.
    pub fn sample(&self) -> MetricSample {
        self.state.sample()
    }

    /// Final analysis, present only once the run is `Complete`.
    pub fn summary(&self) -> Option<RunSummary> {
        self.summary
    }
}

/// Steps `cell` along its inward direction while it is within the bone region
/// around the origin; a cell found outside is put back on the region boundary
/// along its direction from the origin instead.
fn move_within_bone(cell: &mut Osteoblast, params: &MigrationParams) {
    if cell.position.length() <= params.bone_radius + BOUNDARY_EPSILON {
        cell.position = cell.position + cell.direction * params.growth_rate;
    } else {
        cell.position = clamp_to_sphere(cell.position, params.bone_radius);
    }
}
