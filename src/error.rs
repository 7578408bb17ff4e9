//! Error taxonomy for the layout engine.

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Invalid {parameter}: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid grant {id}: {reason}")]
    InvalidRecord { id: i64, reason: String },
    #[error("Unknown layout mode: {0}")]
    UnknownMode(String),
}

impl LayoutError {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Reject NaN and infinities.
pub(crate) fn ensure_finite(parameter: &'static str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayoutError::config(parameter, format!("{value} is not finite")))
    }
}

/// Require a finite, strictly positive value.
pub(crate) fn ensure_positive(parameter: &'static str, value: f64) -> Result<(), LayoutError> {
    ensure_finite(parameter, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::config(parameter, format!("{value} must be positive")))
    }
}

/// Require a finite value that is zero or greater.
pub(crate) fn ensure_non_negative(parameter: &'static str, value: f64) -> Result<(), LayoutError> {
    ensure_finite(parameter, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::config(parameter, format!("{value} must not be negative")))
    }
}
