use serde::{Deserialize, Serialize};
use anyhow::Result;
use log::{info, warn};
use crate::error::{ensure_positive, SimResult};
use crate::scoring::{remodeling_rate_from_score, PatientProfile, FALLBACK_SCORE};
use crate::sim_params::{MigrationParams, RemodelingParams};
use std::path::Path;

// Configuration for the bone-remodeling model
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RemodelingConfig {
    pub time_steps: usize,
    pub initial_modulus_gpa: f64,
    pub max_modulus_gpa: f64,
    // Overrides the rate derived from [patient] when set
    #[serde(default)]
    pub remodeling_rate: Option<f64>,
}

// Configuration for osteoblast migration
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MigrationConfig {
    pub growth_rate: f64,
    pub density: u32,
    #[serde(default = "default_ring_count")]
    pub ring_count: u32,

    #[serde(default = "default_bone_radius")]
    pub bone_radius: f64,
    #[serde(default = "default_bone_half_height")]
    pub bone_half_height: f64,
    #[serde(default = "default_pore_ring_radius")]
    pub pore_ring_radius: f64,
    #[serde(default = "default_pore_radius")]
    pub pore_radius: f64,
    #[serde(default = "default_start_offset")]
    pub start_offset: f64,

    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f64,
    #[serde(default = "default_docking_threshold")]
    pub docking_threshold: f64,
    #[serde(default = "default_tick_dt")]
    pub tick_dt: f64,
    #[serde(default = "default_bone_increment")]
    pub bone_increment: f64,
    #[serde(default = "default_growth_unit_radius")]
    pub growth_unit_radius: f64,
    // Driver safety net; a valid run completes well before this.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

// Configuration for metric sampling
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_sample_interval")]
    pub sample_interval: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig { sample_interval: default_sample_interval() }
    }
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    #[serde(default)]
    pub save_series_csv: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub remodeling: RemodelingConfig,
    #[serde(default)]
    pub patient: Option<PatientProfile>,
    pub migration: MigrationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        info!("Loaded configuration from {}", path_ref.display());
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    /// Unrecognized patient labels are reported here, once per load.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        for (name, label) in config.fallback_labels() {
            warn!(
                "Unrecognized {} '{}', using fallback score {:.1}.",
                name, label, FALLBACK_SCORE
            );
        }
        config.validate()?;
        Ok(config)
    }

    /// Patient inputs that fell back to the default score. Empty without a profile.
    pub fn fallback_labels(&self) -> Vec<(&'static str, &str)> {
        self.patient
            .as_ref()
            .map(|profile| profile.unrecognized_factors())
            .unwrap_or_default()
    }

    /// Checks every derived parameter set so bad values fail before any run starts.
    pub fn validate(&self) -> SimResult<()> {
        self.get_remodeling_params().validate()?;
        self.get_migration_params().validate()?;
        ensure_positive("sample_interval", self.metrics.sample_interval)
    }

    /// Remodeling rate: explicit value, else derived from the patient profile,
    /// else the rate of an all-fallback profile.
    pub fn remodeling_rate(&self) -> f64 {
        match (self.remodeling.remodeling_rate, &self.patient) {
            (Some(rate), _) => rate,
            (None, Some(profile)) => profile.remodeling_rate(),
            (None, None) => remodeling_rate_from_score(FALLBACK_SCORE),
        }
    }

    pub fn get_remodeling_params(&self) -> RemodelingParams {
        RemodelingParams {
            step_count: self.remodeling.time_steps,
            initial_modulus: self.remodeling.initial_modulus_gpa,
            max_modulus: self.remodeling.max_modulus_gpa,
            remodeling_rate: self.remodeling_rate(),
        }
    }

    pub fn get_migration_params(&self) -> MigrationParams {
        let m = &self.migration;
        MigrationParams {
            growth_rate: m.growth_rate,
            ring_count: m.ring_count,
            density: m.density,
            bone_radius: m.bone_radius,
            bone_half_height: m.bone_half_height,
            pore_ring_radius: m.pore_ring_radius,
            pore_radius: m.pore_radius,
            start_offset: m.start_offset,
            arrival_threshold: m.arrival_threshold,
            docking_threshold: m.docking_threshold,
            tick_dt: m.tick_dt,
            bone_increment: m.bone_increment,
            growth_unit_radius: m.growth_unit_radius,
        }
    }
}

// Defaults mirror MigrationParams::default()
fn default_ring_count() -> u32 { 12 }
fn default_bone_radius() -> f64 { 3.0 }
fn default_bone_half_height() -> f64 { 2.0 }
fn default_pore_ring_radius() -> f64 { 0.75 }
fn default_pore_radius() -> f64 { 0.04 }
fn default_start_offset() -> f64 { 1.0 }
fn default_arrival_threshold() -> f64 { 0.1 }
fn default_docking_threshold() -> f64 { 0.5 }
fn default_tick_dt() -> f64 { 0.1 }
fn default_bone_increment() -> f64 { 0.2 }
fn default_growth_unit_radius() -> f64 { 0.1 }
fn default_max_ticks() -> u64 { 100_000 }

fn default_sample_interval() -> f64 {
    0.5 // Twice per simulated second
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{BoneQuality, ImplantMaterial};
    use approx::assert_relative_eq;

    const MINIMAL: &str = r#"
        [remodeling]
        time_steps = 100
        initial_modulus_gpa = 1.0
        max_modulus_gpa = 20.0

        [migration]
        growth_rate = 0.01
        density = 40

        [output]
        base_filename = "osseo_run"
        save_stats = false
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        let params = config.get_migration_params();
        assert_eq!(params, MigrationParams::default());
        assert_relative_eq!(config.metrics.sample_interval, 0.5);
        assert_eq!(config.migration.max_ticks, 100_000);
        // No rate and no profile: every factor at the fallback score.
        assert_relative_eq!(config.remodeling_rate(), 0.055, epsilon = 1e-12);
    }

    #[test]
    fn test_patient_profile_drives_rate() {
        let text = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [patient]
            bone_quality = "Good"
            patient_health = "Healthy"
            age_years = 20
            implant_material = "Zirconia"
            surface_energy = "High"
            osteoblast_activity = "High"
            "#
        );
        let config = SimulationConfig::from_toml_str(&text).unwrap();
        let profile = config.patient.as_ref().unwrap();
        assert_eq!(profile.bone_quality, BoneQuality::Good);
        assert_eq!(profile.implant_material, ImplantMaterial::Zirconia);
        assert_relative_eq!(config.get_remodeling_params().remodeling_rate, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_patient_label_reported_once_and_scored_as_fallback() {
        let text = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [patient]
            bone_quality = "Excellent"
            patient_health = "Average"
            age_years = 40
            implant_material = "Titanium"
            surface_energy = "Low"
            osteoblast_activity = "Moderate"
            "#
        );
        let config = SimulationConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.fallback_labels(), vec![("bone_quality", "Excellent")]);

        // Resolving the rate repeatedly is pure and always gives the same value.
        let mean = (FALLBACK_SCORE + 0.6 + 0.7 + 0.9 + 0.4 + 0.6) / 6.0;
        config.validate().unwrap();
        assert_relative_eq!(config.remodeling_rate(), 0.01 + 0.09 * mean, epsilon = 1e-12);
        assert_relative_eq!(config.get_remodeling_params().remodeling_rate, config.remodeling_rate());

        let plain = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        assert!(plain.fallback_labels().is_empty());
    }

    #[test]
    fn test_explicit_rate_wins() {
        let text = MINIMAL.replace("max_modulus_gpa = 20.0", "max_modulus_gpa = 20.0\nremodeling_rate = 0.3");
        let config = SimulationConfig::from_toml_str(&text).unwrap();
        assert_relative_eq!(config.remodeling_rate(), 0.3);
    }

    #[test]
    fn test_invalid_values_are_rejected_at_load() {
        let inverted = MINIMAL.replace("max_modulus_gpa = 20.0", "max_modulus_gpa = 0.5");
        assert!(SimulationConfig::from_toml_str(&inverted).is_err());

        let zero_steps = MINIMAL.replace("time_steps = 100", "time_steps = 0");
        assert!(SimulationConfig::from_toml_str(&zero_steps).is_err());

        let stalled = MINIMAL.replace("growth_rate = 0.01", "growth_rate = 0.0");
        assert!(SimulationConfig::from_toml_str(&stalled).is_err());

        // Lower rings would start outside a bone region of radius 2.
        let small_region = MINIMAL.replace("density = 40", "density = 40\nbone_radius = 2.0");
        assert!(SimulationConfig::from_toml_str(&small_region).is_err());
    }

    #[test]
    fn test_missing_section_fails_to_parse() {
        let text = MINIMAL.replace("[migration]", "[unused]");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
    }
}
