//! JSON exports of a logistic regression classifier and a standard scaler

use crate::error::PipelineError;
use crate::models::artifact::{ArtifactMetadata, Classifier, FeatureScaler};
use serde::Deserialize;

/// Logistic regression exported as plain coefficients.
///
/// The distribution is `[P(class 0), P(class 1)]`, with class 1 being the
/// positive label of the training run.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    #[serde(skip)]
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(flatten)]
    metadata: ArtifactMetadata,
}

impl LinearClassifier {
    pub fn new(name: &str, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.to_string(),
            coefficients,
            intercept,
            metadata: ArtifactMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let mut model: Self = serde_json::from_str(json)?;
        model.name = name.to_string();
        Ok(model)
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} expects {} features, got {}",
                self.name,
                self.coefficients.len(),
                features.len()
            )));
        }

        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, &x)| w * x as f64)
                .sum::<f64>();
        let positive = 1.0 / (1.0 + (-z).exp());

        Ok(vec![(1.0 - positive) as f32, positive as f32])
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }
}

/// Standard scaler: `(x - mean) / scale` per column
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    #[serde(skip)]
    name: String,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(name: &str, mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            mean,
            scale,
        }
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, String> {
        let mut scaler: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        if scaler.mean.len() != scaler.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                scaler.mean.len(),
                scaler.scale.len()
            ));
        }
        scaler.name = name.to_string();
        Ok(scaler)
    }
}

impl FeatureScaler for StandardScaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError> {
        if features.len() != self.mean.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} was fitted on {} features, got {}",
                self.name,
                self.mean.len(),
                features.len()
            )));
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (mean, scale))| {
                // Constant columns are exported with a zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                ((x as f64 - mean) / scale) as f32
            })
            .collect())
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.mean.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_weights_give_even_odds() {
        let model = LinearClassifier::new("flat", vec![0.0; 3], 0.0);
        let probs = model.predict_proba(&[1.0, 2.0, 3.0]).unwrap();

        assert_eq!(probs.len(), 2);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let model = LinearClassifier::new("lr", vec![0.8, -1.2], 0.3);
        let probs = model.predict_proba(&[2.0, 0.5]).unwrap();

        assert!((probs[0] + probs[1] - 1.0).abs() < 1e-6);
        // z = 0.3 + 1.6 - 0.6 = 1.3
        let expected = 1.0 / (1.0 + (-1.3f64).exp());
        assert!((probs[1] as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn test_width_mismatch() {
        let model = LinearClassifier::new("lr", vec![1.0; 13], 0.0);
        assert!(matches!(
            model.predict_proba(&[1.0; 12]),
            Err(PipelineError::ShapeMismatch(_))
        ));
        assert_eq!(model.input_width(), Some(13));
    }

    #[test]
    fn test_classifier_json_with_metadata() {
        let json = r#"{
            "coefficients": [0.1, 0.2],
            "intercept": -0.5,
            "disease_class_index": 0,
            "thal_range": [1, 3]
        }"#;
        let model = LinearClassifier::from_json("heart_disease_model", json).unwrap();

        assert_eq!(model.name(), "heart_disease_model");
        assert_eq!(model.metadata().disease_class_index, Some(0));
        assert_eq!(model.metadata().thal_range, Some((1, 3)));
        assert_eq!(model.metadata().feature_order, None);
    }

    #[test]
    fn test_metadata_attached_in_code() {
        let model = LinearClassifier::new("lr", vec![0.0; 13], 0.0).with_metadata(ArtifactMetadata {
            disease_class_index: Some(0),
            ..ArtifactMetadata::default()
        });
        assert_eq!(model.metadata().disease_class_index, Some(0));
    }

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler::new("scaler", vec![10.0, 5.0, 1.0], vec![2.0, 0.0, 0.5]);
        let scaled = scaler.transform(&[14.0, 7.0, 2.0]).unwrap();

        assert_eq!(scaled, vec![2.0, 2.0, 2.0]);
        assert!(scaler.transform(&[1.0]).is_err());
        assert_eq!(scaler.input_width(), Some(3));
    }

    #[test]
    fn test_scaler_json_lengths_must_agree() {
        assert!(StandardScaler::from_json("s", r#"{"mean": [1.0], "scale": [1.0, 2.0]}"#).is_err());
        assert!(StandardScaler::from_json("s", r#"{"mean": [1.0], "scale": [2.0]}"#).is_ok());
    }
}
