use thiserror::Error;

/// Result alias for fallible model construction.
pub type SimResult<T> = std::result::Result<T, OsseoError>;

/// Errors surfaced synchronously when building or starting a model.
///
/// Stepping a valid model never fails, so neither `tick` nor `advance`
/// return this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OsseoError {
    /// A parameter is out of its admissible range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A pore lies on the implant axis, so it has no inward direction.
    #[error("degenerate geometry: pore {pore_index} lies on the implant axis")]
    DegenerateGeometry { pore_index: usize },
}

impl OsseoError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        OsseoError::InvalidParameter { name, reason: reason.into() }
    }
}

/// Fails with `InvalidParameter` unless `value` is finite and strictly positive.
pub fn ensure_positive(name: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OsseoError::invalid(name, format!("must be a positive finite number, got {}", value)))
    }
}

/// Fails with `InvalidParameter` unless `value` is finite and not negative.
pub fn ensure_non_negative(name: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(OsseoError::invalid(name, format!("must be a non-negative finite number, got {}", value)))
    }
}
