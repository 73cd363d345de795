//! Settings errors shared by the claims crates

use thiserror::Error;

/// A setting that loads fine but cannot be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("{setting} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        setting: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{setting} must be positive")]
    NotPositive { setting: String },
}

impl CoreError {
    pub fn out_of_range(setting: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        CoreError::OutOfRange {
            setting: setting.into(),
            min,
            max,
            value,
        }
    }

    pub fn not_positive(setting: impl Into<String>) -> Self {
        CoreError::NotPositive {
            setting: setting.into(),
        }
    }

    /// Name of the offending setting
    pub fn setting(&self) -> &str {
        match self {
            CoreError::OutOfRange { setting, .. } | CoreError::NotPositive { setting } => setting,
        }
    }
}
