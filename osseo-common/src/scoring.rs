//! Maps the qualitative patient/implant profile onto a remodeling rate.
//!
//! Every categorical input is an explicit enum. Labels that match none of the
//! known categories become `Unrecognized` and score [`FALLBACK_SCORE`]; the
//! configuration loader logs each substitution once, right after parsing.

use serde::{Deserialize, Serialize};

/// Score used for any category label that is not recognized.
pub const FALLBACK_SCORE: f64 = 0.5;
/// Remodeling rate produced by a combined score of 0.
pub const MIN_REMODELING_RATE: f64 = 0.01;
/// Width of the remodeling rate range; a combined score of 1 yields 0.1.
pub const REMODELING_RATE_SPAN: f64 = 0.09;

/// A categorical factor with a fixed score in [0, 1].
pub trait Factor {
    /// Name of the input, used in log messages.
    const NAME: &'static str;

    fn score(&self) -> f64;

    /// Raw label if this value fell back to [`FALLBACK_SCORE`].
    fn unrecognized_label(&self) -> Option<&str>;
}

fn normalize_label(label: &str) -> String {
    label.trim().to_ascii_lowercase().replace(['_', '-'], " ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoneQuality {
    Poor,
    Average,
    Good,
    Unrecognized(String),
}

impl From<String> for BoneQuality {
    fn from(label: String) -> Self {
        match normalize_label(&label).as_str() {
            "poor" => BoneQuality::Poor,
            "average" => BoneQuality::Average,
            "good" => BoneQuality::Good,
            _ => BoneQuality::Unrecognized(label),
        }
    }
}

impl From<BoneQuality> for String {
    fn from(value: BoneQuality) -> Self {
        match value {
            BoneQuality::Poor => "Poor".into(),
            BoneQuality::Average => "Average".into(),
            BoneQuality::Good => "Good".into(),
            BoneQuality::Unrecognized(label) => label,
        }
    }
}

impl Factor for BoneQuality {
    const NAME: &'static str = "bone_quality";

    fn score(&self) -> f64 {
        match self {
            BoneQuality::Poor => 0.3,
            BoneQuality::Average => 0.6,
            BoneQuality::Good => 1.0,
            BoneQuality::Unrecognized(_) => FALLBACK_SCORE,
        }
    }

    fn unrecognized_label(&self) -> Option<&str> {
        match self {
            BoneQuality::Unrecognized(label) => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatientHealth {
    Compromised,
    Average,
    Healthy,
    Unrecognized(String),
}

impl From<String> for PatientHealth {
    fn from(label: String) -> Self {
        match normalize_label(&label).as_str() {
            "compromised" => PatientHealth::Compromised,
            "average" => PatientHealth::Average,
            "healthy" => PatientHealth::Healthy,
            _ => PatientHealth::Unrecognized(label),
        }
    }
}

impl From<PatientHealth> for String {
    fn from(value: PatientHealth) -> Self {
        match value {
            PatientHealth::Compromised => "Compromised".into(),
            PatientHealth::Average => "Average".into(),
            PatientHealth::Healthy => "Healthy".into(),
            PatientHealth::Unrecognized(label) => label,
        }
    }
}

impl Factor for PatientHealth {
    const NAME: &'static str = "patient_health";

    fn score(&self) -> f64 {
        match self {
            PatientHealth::Compromised => 0.3,
            PatientHealth::Average => 0.6,
            PatientHealth::Healthy => 1.0,
            PatientHealth::Unrecognized(_) => FALLBACK_SCORE,
        }
    }

    fn unrecognized_label(&self) -> Option<&str> {
        match self {
            PatientHealth::Unrecognized(label) => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImplantMaterial {
    StainlessSteel,
    Titanium,
    Zirconia,
    Unrecognized(String),
}

impl From<String> for ImplantMaterial {
    fn from(label: String) -> Self {
        match normalize_label(&label).as_str() {
            "stainless steel" => ImplantMaterial::StainlessSteel,
            "titanium" => ImplantMaterial::Titanium,
            "zirconia" => ImplantMaterial::Zirconia,
            _ => ImplantMaterial::Unrecognized(label),
        }
    }
}

impl From<ImplantMaterial> for String {
    fn from(value: ImplantMaterial) -> Self {
        match value {
            ImplantMaterial::StainlessSteel => "Stainless Steel".into(),
            ImplantMaterial::Titanium => "Titanium".into(),
            ImplantMaterial::Zirconia => "Zirconia".into(),
            ImplantMaterial::Unrecognized(label) => label,
        }
    }
}

impl Factor for ImplantMaterial {
    const NAME: &'static str = "implant_material";

    fn score(&self) -> f64 {
        match self {
            ImplantMaterial::StainlessSteel => 0.5,
            ImplantMaterial::Titanium => 0.9,
            ImplantMaterial::Zirconia => 1.0,
            ImplantMaterial::Unrecognized(_) => FALLBACK_SCORE,
        }
    }

    fn unrecognized_label(&self) -> Option<&str> {
        match self {
            ImplantMaterial::Unrecognized(label) => Some(label),
            _ => None,
        }
    }
}

/// Low / Moderate / High scale shared by surface energy and osteoblast activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Low,
    Moderate,
    High,
    Unrecognized(String),
}

impl From<String> for Level {
    fn from(label: String) -> Self {
        match normalize_label(&label).as_str() {
            "low" => Level::Low,
            "moderate" => Level::Moderate,
            "high" => Level::High,
            _ => Level::Unrecognized(label),
        }
    }
}

impl From<Level> for String {
    fn from(value: Level) -> Self {
        match value {
            Level::Low => "Low".into(),
            Level::Moderate => "Moderate".into(),
            Level::High => "High".into(),
            Level::Unrecognized(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceEnergy(pub Level);

impl Factor for SurfaceEnergy {
    const NAME: &'static str = "surface_energy";

    fn score(&self) -> f64 {
        match self.0 {
            Level::Low => 0.4,
            Level::Moderate => 0.7,
            Level::High => 1.0,
            Level::Unrecognized(_) => FALLBACK_SCORE,
        }
    }

    fn unrecognized_label(&self) -> Option<&str> {
        match &self.0 {
            Level::Unrecognized(label) => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsteoblastActivity(pub Level);

impl Factor for OsteoblastActivity {
    const NAME: &'static str = "osteoblast_activity";

    fn score(&self) -> f64 {
        match self.0 {
            Level::Low => 0.3,
            Level::Moderate => 0.6,
            Level::High => 1.0,
            Level::Unrecognized(_) => FALLBACK_SCORE,
        }
    }

    fn unrecognized_label(&self) -> Option<&str> {
        match &self.0 {
            Level::Unrecognized(label) => Some(label),
            _ => None,
        }
    }
}

/// Age bracket score: young adults heal fastest.
pub fn age_to_score(age_years: u32) -> f64 {
    if age_years <= 25 {
        1.0
    } else if age_years <= 50 {
        0.7
    } else {
        0.4
    }
}

/// Qualitative description of a patient and implant, as collected by a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub bone_quality: BoneQuality,
    pub patient_health: PatientHealth,
    pub age_years: u32,
    pub implant_material: ImplantMaterial,
    pub surface_energy: SurfaceEnergy,
    pub osteoblast_activity: OsteoblastActivity,
}

fn unrecognized<F: Factor>(factor: &F) -> Option<(&'static str, &str)> {
    factor.unrecognized_label().map(|label| (F::NAME, label))
}

impl PatientProfile {
    /// Individual factor scores in declaration order.
    pub fn scores(&self) -> [f64; 6] {
        [
            self.bone_quality.score(),
            self.patient_health.score(),
            age_to_score(self.age_years),
            self.implant_material.score(),
            self.surface_energy.score(),
            self.osteoblast_activity.score(),
        ]
    }

    /// `(input name, raw label)` of every factor scored with [`FALLBACK_SCORE`].
    pub fn unrecognized_factors(&self) -> Vec<(&'static str, &str)> {
        [
            unrecognized(&self.bone_quality),
            unrecognized(&self.patient_health),
            unrecognized(&self.implant_material),
            unrecognized(&self.surface_energy),
            unrecognized(&self.osteoblast_activity),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Arithmetic mean of all factor scores.
    pub fn combined_score(&self) -> f64 {
        let scores = self.scores();
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// Remodeling rate in [0.01, 0.1].
    pub fn remodeling_rate(&self) -> f64 {
        remodeling_rate_from_score(self.combined_score())
    }
}

/// Maps a combined score in [0, 1] into a remodeling rate in [0.01, 0.1].
pub fn remodeling_rate_from_score(combined: f64) -> f64 {
    MIN_REMODELING_RATE + REMODELING_RATE_SPAN * combined.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn best_profile() -> PatientProfile {
        PatientProfile {
            bone_quality: BoneQuality::Good,
            patient_health: PatientHealth::Healthy,
            age_years: 22,
            implant_material: ImplantMaterial::Zirconia,
            surface_energy: SurfaceEnergy(Level::High),
            osteoblast_activity: OsteoblastActivity(Level::High),
        }
    }

    #[test]
    fn test_best_profile_reaches_max_rate() {
        assert_relative_eq!(best_profile().remodeling_rate(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_mixed_profile_rate() {
        let profile = PatientProfile {
            bone_quality: BoneQuality::Poor,
            patient_health: PatientHealth::Average,
            age_years: 40,
            implant_material: ImplantMaterial::Titanium,
            surface_energy: SurfaceEnergy(Level::Low),
            osteoblast_activity: OsteoblastActivity(Level::Moderate),
        };
        let mean = (0.3 + 0.6 + 0.7 + 0.9 + 0.4 + 0.6) / 6.0;
        assert_relative_eq!(profile.combined_score(), mean, epsilon = 1e-12);
        assert_relative_eq!(profile.remodeling_rate(), 0.01 + 0.09 * mean, epsilon = 1e-12);
    }

    #[test]
    fn test_labels_parse_case_insensitively() {
        assert_eq!(ImplantMaterial::from("stainless_steel".to_string()), ImplantMaterial::StainlessSteel);
        assert_eq!(ImplantMaterial::from("Stainless Steel".to_string()), ImplantMaterial::StainlessSteel);
        assert_eq!(Level::from(" HIGH ".to_string()), Level::High);
    }

    #[test]
    fn test_unknown_label_uses_fallback() {
        let quality = BoneQuality::from("Excellent".to_string());
        assert_eq!(quality, BoneQuality::Unrecognized("Excellent".to_string()));
        assert_relative_eq!(quality.score(), FALLBACK_SCORE);
        assert_eq!(quality.unrecognized_label(), Some("Excellent"));
    }

    #[test]
    fn test_age_brackets() {
        assert_relative_eq!(age_to_score(25), 1.0);
        assert_relative_eq!(age_to_score(26), 0.7);
        assert_relative_eq!(age_to_score(50), 0.7);
        assert_relative_eq!(age_to_score(51), 0.4);
    }

    #[test]
    fn test_profile_deserializes_from_labels() {
        let profile: PatientProfile = toml::from_str(
            r#"
            bone_quality = "Average"
            patient_health = "Compromised"
            age_years = 60
            implant_material = "Titanium"
            surface_energy = "Moderate"
            osteoblast_activity = "unknown"
            "#,
        )
        .unwrap();
        assert_eq!(profile.surface_energy, SurfaceEnergy(Level::Moderate));
        assert_eq!(profile.osteoblast_activity.unrecognized_label(), Some("unknown"));
        assert_eq!(profile.unrecognized_factors(), vec![("osteoblast_activity", "unknown")]);
    }

    #[test]
    fn test_known_profile_has_no_fallbacks() {
        assert!(best_profile().unrecognized_factors().is_empty());
    }
}
