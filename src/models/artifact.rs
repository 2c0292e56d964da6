//! Artifact interfaces shared by every model format

use crate::error::PipelineError;
use serde::Deserialize;

/// Contract details an artifact may carry about the data it was trained on
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArtifactMetadata {
    /// Index of the "disease" class in the probability distribution
    #[serde(default)]
    pub disease_class_index: Option<usize>,
    /// Accepted thal codes (inclusive)
    #[serde(default)]
    pub thal_range: Option<(i32, i32)>,
    /// Column order used at training time
    #[serde(default)]
    pub feature_order: Option<Vec<String>>,
}

impl ArtifactMetadata {
    /// Parse the string form used in ONNX custom metadata.
    ///
    /// `thal_range` is `"lo,hi"` and `feature_order` is comma separated.
    pub fn from_custom_fields(
        disease_class_index: Option<&str>,
        thal_range: Option<&str>,
        feature_order: Option<&str>,
    ) -> Result<Self, String> {
        let disease_class_index = disease_class_index
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|e| format!("disease_class_index '{}': {}", raw, e))
            })
            .transpose()?;

        let thal_range = thal_range
            .map(|raw| {
                let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
                match parts.as_slice() {
                    [lo, hi] => {
                        let lo = lo.parse::<i32>().map_err(|e| format!("thal_range '{}': {}", raw, e))?;
                        let hi = hi.parse::<i32>().map_err(|e| format!("thal_range '{}': {}", raw, e))?;
                        Ok((lo, hi))
                    }
                    _ => Err(format!("thal_range '{}' must look like 'lo,hi'", raw)),
                }
            })
            .transpose()?;

        let feature_order = feature_order.map(|raw| {
            raw.split(',')
                .map(|column| column.trim().to_string())
                .filter(|column| !column.is_empty())
                .collect()
        });

        Ok(Self {
            disease_class_index,
            thal_range,
            feature_order,
        })
    }
    /// Reject contract details that cannot describe any trained model
    pub fn validate(&self) -> Result<(), String> {
        if let Some((lo, hi)) = self.thal_range {
            if lo > hi {
                return Err(format!("thal_range {}..={} is empty", lo, hi));
            }
        }
        Ok(())
    }
}

/// A trained binary classifier.
///
/// Implementations must not mutate observable state when predicting, so a
/// single loaded instance can serve every request.
pub trait Classifier: Send + Sync {
    /// Human readable artifact name used in logs
    fn name(&self) -> &str;

    /// Probability distribution over the classes for a single row
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError>;

    /// Input width the artifact was exported with, when it is fixed
    fn input_width(&self) -> Option<usize> {
        None
    }

    fn metadata(&self) -> &ArtifactMetadata;
}

/// A fitted normalisation transform applied before the classifier
pub trait FeatureScaler: Send + Sync {
    fn name(&self) -> &str;

    fn transform(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError>;

    /// Number of columns the scaler was fitted on, when it is fixed
    fn input_width(&self) -> Option<usize> {
        None
    }
}
