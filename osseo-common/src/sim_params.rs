use serde::{Deserialize, Serialize};
use crate::error::{ensure_non_negative, ensure_positive, OsseoError, SimResult};

/// Parameters of the bone-remodeling model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemodelingParams {
    pub step_count: usize,
    pub initial_modulus: f64, // GPa
    pub max_modulus: f64,     // GPa
    pub remodeling_rate: f64,
}

impl RemodelingParams {
    pub fn validate(&self) -> SimResult<()> {
        if self.step_count == 0 {
            return Err(OsseoError::invalid("step_count", "must be at least 1"));
        }
        if !self.initial_modulus.is_finite() || !self.max_modulus.is_finite() {
            return Err(OsseoError::invalid("initial_modulus", "moduli must be finite"));
        }
        if self.max_modulus < self.initial_modulus {
            return Err(OsseoError::invalid(
                "max_modulus",
                format!("{} is below initial_modulus {}", self.max_modulus, self.initial_modulus),
            ));
        }
        ensure_non_negative("remodeling_rate", self.remodeling_rate)
    }
}

/// Parameters of the osteoblast migration simulation, used every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationParams {
    // Inputs
    pub growth_rate: f64, // Distance moved per tick
    pub ring_count: u32,
    pub density: u32,

    // Geometry
    pub bone_radius: f64,      // Radius of the bone region, measured from the origin
    pub bone_half_height: f64, // Pore rings span [-half, half) along the implant axis
    pub pore_ring_radius: f64,
    pub pore_radius: f64,
    pub start_offset: f64, // Agent start distance behind its pore

    // Thresholds & increments
    pub arrival_threshold: f64,
    pub docking_threshold: f64,
    pub tick_dt: f64,
    pub bone_increment: f64,
    pub growth_unit_radius: f64,
}

/// Checks a per-tick step size against the docking threshold.
pub fn validate_growth_rate(growth_rate: f64, docking_threshold: f64) -> SimResult<()> {
    ensure_positive("growth_rate", growth_rate)?;
    // A larger step could carry an agent across the axis without ever docking.
    if growth_rate > docking_threshold {
        return Err(OsseoError::invalid(
            "growth_rate",
            format!("{} exceeds docking_threshold {}", growth_rate, docking_threshold),
        ));
    }
    Ok(())
}

/// Pores per ring for a given density slider value.
pub fn pores_per_ring(density: u32) -> u32 {
    density / 3
}

impl MigrationParams {
    /// Reference geometry with the given inputs.
    pub fn with_inputs(growth_rate: f64, ring_count: u32, density: u32) -> Self {
        MigrationParams {
            growth_rate,
            ring_count,
            density,
            ..Self::default()
        }
    }

    pub fn pores_per_ring(&self) -> u32 {
        pores_per_ring(self.density)
    }

    pub fn total_pores(&self) -> usize {
        self.ring_count as usize * self.pores_per_ring() as usize
    }

    /// Radial distance at which agents start.
    pub fn start_radius(&self) -> f64 {
        self.pore_ring_radius.abs() + self.start_offset
    }

    /// Height of pore ring `index` along the implant axis.
    pub fn ring_height(&self, index: u32) -> f64 {
        let spacing = 2.0 * self.bone_half_height / self.ring_count as f64;
        -self.bone_half_height + index as f64 * spacing
    }

    /// Largest distance from the origin at which any agent starts.
    pub fn max_start_distance(&self) -> f64 {
        let start_radius = self.start_radius();
        (0..self.ring_count)
            .map(|i| start_radius.hypot(self.ring_height(i)))
            .fold(0.0, f64::max)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.ring_count == 0 {
            return Err(OsseoError::invalid("ring_count", "must be at least 1"));
        }
        if self.density == 0 {
            return Err(OsseoError::invalid("density", "must be at least 1"));
        }
        ensure_positive("bone_radius", self.bone_radius)?;
        ensure_positive("bone_half_height", self.bone_half_height)?;
        ensure_non_negative("pore_ring_radius", self.pore_ring_radius)?;
        ensure_non_negative("pore_radius", self.pore_radius)?;
        ensure_non_negative("start_offset", self.start_offset)?;
        ensure_positive("arrival_threshold", self.arrival_threshold)?;
        ensure_positive("docking_threshold", self.docking_threshold)?;
        ensure_positive("tick_dt", self.tick_dt)?;
        ensure_non_negative("bone_increment", self.bone_increment)?;
        ensure_non_negative("growth_unit_radius", self.growth_unit_radius)?;

        if self.arrival_threshold >= self.docking_threshold {
            return Err(OsseoError::invalid(
                "arrival_threshold",
                format!("must be below docking_threshold {}", self.docking_threshold),
            ));
        }
        validate_growth_rate(self.growth_rate, self.docking_threshold)?;
        // Inward steps at a fixed height only shrink the distance from the origin,
        // so agents that start inside the bone region never leave it.
        if self.max_start_distance() > self.bone_radius {
            return Err(OsseoError::invalid(
                "start_offset",
                format!(
                    "agents would start {} from the origin, outside the bone radius {}",
                    self.max_start_distance(),
                    self.bone_radius
                ),
            ));
        }
        if self.start_radius() <= self.docking_threshold {
            return Err(OsseoError::invalid(
                "start_offset",
                format!("agents would start docked at radius {}", self.start_radius()),
            ));
        }
        Ok(())
    }
}

impl Default for MigrationParams {
    fn default() -> Self {
        MigrationParams {
            growth_rate: 0.01,
            ring_count: 12,
            density: 40,
            bone_radius: 3.0,
            bone_half_height: 2.0,
            pore_ring_radius: 0.75,
            pore_radius: 0.04,
            start_offset: 1.0,
            arrival_threshold: 0.1,
            docking_threshold: 0.5,
            tick_dt: 0.1,
            bone_increment: 0.2,
            growth_unit_radius: 0.1,
        }
    }
}
