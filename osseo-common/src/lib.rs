pub mod config;
pub mod error;
pub mod scoring;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, RemodelingConfig, MigrationConfig, MetricsConfig, OutputConfig};
pub use error::{OsseoError, SimResult};
pub use scoring::PatientProfile;
pub use sim_params::{validate_growth_rate, MigrationParams, RemodelingParams};
pub use snapshot::{MetricSample, RemodelingSample, RunRecord, RunSummary};
pub use vecmath::{Vec3, ring_point};
