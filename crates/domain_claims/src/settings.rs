//! Tunable thresholds for the processing pipeline

use serde::{Deserialize, Serialize};

use core_kernel::CoreError;

/// Pipeline thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Classifications below this confidence are flagged
    pub classification_threshold: f64,
    /// Upper bound on fields kept per document
    pub extraction_max_fields: usize,
    /// Evaluations below this confidence need manual review
    pub evaluation_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            classification_threshold: 0.8,
            extraction_max_fields: 20,
            evaluation_threshold: 0.75,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("classification_threshold", self.classification_threshold),
            ("evaluation_threshold", self.evaluation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::out_of_range(name, 0.0, 1.0, value));
            }
        }

        if self.extraction_max_fields == 0 {
            return Err(CoreError::not_positive("extraction_max_fields"));
        }
        Ok(())
    }
}
