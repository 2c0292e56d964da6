//! Error taxonomy for artifact loading and prediction

use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the inference pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required artifact file does not exist at any of the checked locations
    #[error("{artifact} artifact not found (looked at: {})", display_paths(.attempted))]
    ArtifactNotFound {
        artifact: String,
        attempted: Vec<PathBuf>,
    },

    /// The artifact exists but could not be deserialized
    #[error("{artifact} artifact at {} is corrupt: {reason}", .path.display())]
    ArtifactCorrupt {
        artifact: String,
        path: PathBuf,
        reason: String,
    },

    /// Feature vector or model output does not have the expected shape
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Neither configuration nor artifact metadata names the disease class
    #[error("cannot determine which probability index means disease for {artifact}")]
    ClassIndexUnresolved { artifact: String },

    /// A record field is outside its accepted range
    #[error("invalid value {value} for {field} (expected {min}..={max})")]
    InvalidRecord {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The model produced a probability outside [0, 1]
    #[error("model returned an invalid probability: {0}")]
    InvalidOutput(f64),

    /// A configured value can never be satisfied
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tier bands leave a gap, overlap or are empty
    #[error("invalid risk tier policy: {0}")]
    InvalidTierPolicy(String),

    /// The inference backend failed while running the model
    #[error("inference failed: {0}")]
    Inference(String),
}

impl PipelineError {
    /// Whether this error comes from artifact loading (and so disables the form)
    pub fn is_artifact_error(&self) -> bool {
        matches!(
            self,
            PipelineError::ArtifactNotFound { .. }
                | PipelineError::ArtifactCorrupt { .. }
                | PipelineError::ClassIndexUnresolved { .. }
        )
    }

    /// Stable, non-technical message for display next to the form
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ArtifactNotFound { attempted, .. } => format!(
                "Error: Model files not found! Looking at: {}\n\
                 Check that the 'models' folder contains your model files.",
                display_paths(attempted)
            ),
            PipelineError::ArtifactCorrupt { artifact, path, .. } => format!(
                "Error: The {} file at {} could not be read. Please replace it with a valid export.",
                artifact,
                path.display()
            ),
            PipelineError::ClassIndexUnresolved { artifact } => format!(
                "Error: The {} does not say which output means heart disease. \
                 Set 'disease_class_index' in the configuration.",
                artifact
            ),
            PipelineError::InvalidRecord {
                field, min, max, ..
            } => format!(
                "Please check the value entered for '{}': it must be between {} and {}.",
                field, min, max
            ),
            PipelineError::ShapeMismatch(_) => {
                "Error: The loaded model does not match the expected patient features.".to_string()
            }
            PipelineError::InvalidOutput(_) | PipelineError::Inference(_) => {
                "Error: The risk could not be calculated for this patient. Please try again."
                    .to_string()
            }
            PipelineError::InvalidConfiguration(reason) => {
                format!("Error: The configuration is invalid: {}.", reason)
            }
            PipelineError::InvalidTierPolicy(_) => {
                "Error: The risk levels are misconfigured.".to_string()
            }
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_every_path() {
        let err = PipelineError::ArtifactNotFound {
            artifact: "model".to_string(),
            attempted: vec![
                PathBuf::from("models/heart_disease_model.onnx"),
                PathBuf::from("../models/heart_disease_model.onnx"),
            ],
        };

        let message = err.user_message();
        assert!(message.starts_with("Error: Model files not found!"));
        assert!(message.contains("models/heart_disease_model.onnx, ../models/heart_disease_model.onnx"));
        assert!(err.is_artifact_error());
    }

    #[test]
    fn test_record_error_is_not_artifact_error() {
        let err = PipelineError::InvalidRecord {
            field: "age",
            value: 0.0,
            min: 1.0,
            max: 110.0,
        };

        assert!(!err.is_artifact_error());
        assert!(err.user_message().contains("'age'"));
        assert_eq!(err.to_string(), "invalid value 0 for age (expected 1..=110)");
    }

    #[test]
    fn test_configuration_error_message() {
        let err = PipelineError::InvalidConfiguration("thal_range 3..=1 is empty".to_string());

        assert!(!err.is_artifact_error());
        assert_eq!(
            err.user_message(),
            "Error: The configuration is invalid: thal_range 3..=1 is empty."
        );
    }
}
