//! Inference pipeline for heart disease risk

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::feature_extractor::FeatureLayout;
use crate::models::artifact::{Classifier, FeatureScaler};
use crate::models::loader::{ArtifactLoader, LoadedArtifacts};
use crate::types::patient::{PatientRecord, DEFAULT_THAL_RANGE, FEATURE_COUNT};
use crate::types::risk::{RiskResult, TierPolicy};
use std::path::PathBuf;
use tracing::{debug, info};

/// Settings that override what the artifacts say about themselves
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub disease_class_index: Option<usize>,
    pub thal_range: Option<(i32, i32)>,
    pub feature_order: Option<Vec<String>>,
    pub policy: TierPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            disease_class_index: config.models.disease_class_index,
            thal_range: config.models.thal_range.map(|[lo, hi]| (lo, hi)),
            feature_order: config.models.feature_order.clone(),
            policy: config.risk.policy()?,
        })
    }
}

/// Loaded classifier, optional scaler and the contract they were trained with.
///
/// Built once at startup and shared by reference; `predict` never mutates it.
pub struct InferencePipeline {
    classifier: Box<dyn Classifier>,
    scaler: Option<Box<dyn FeatureScaler>>,
    layout: FeatureLayout,
    disease_class_index: usize,
    thal_range: (i32, i32),
    policy: TierPolicy,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("classifier", &self.classifier.name())
            .field("scaler", &self.scaler.as_ref().map(|s| s.name()))
            .field("disease_class_index", &self.disease_class_index)
            .field("thal_range", &self.thal_range)
            .finish()
    }
}

impl InferencePipeline {
    /// Load artifacts named in the configuration and build the pipeline
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let settings = PipelineSettings::from_config(config)?;
        let loader = ArtifactLoader::with_threads(config.models.onnx_threads);
        let artifacts = loader.load_configured(&config.models)?;
        Self::new(artifacts, settings)
    }

    /// Build a pipeline from already loaded artifacts.
    ///
    /// Configuration wins over artifact metadata. The disease class index has
    /// no fallback: if neither source names it, construction fails.
    pub fn new(artifacts: LoadedArtifacts, settings: PipelineSettings) -> Result<Self, PipelineError> {
        let LoadedArtifacts { classifier, scaler } = artifacts;
        let metadata = classifier.metadata().clone();

        let disease_class_index = settings
            .disease_class_index
            .or(metadata.disease_class_index)
            .ok_or_else(|| PipelineError::ClassIndexUnresolved {
                artifact: classifier.name().to_string(),
            })?;

        let thal_range = match settings.thal_range {
            Some((lo, hi)) if lo > hi => {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "thal_range {}..={} is empty",
                    lo, hi
                )));
            }
            Some(range) => range,
            None => {
                metadata.validate().map_err(|reason| PipelineError::ArtifactCorrupt {
                    artifact: "model".to_string(),
                    path: PathBuf::from(classifier.name()),
                    reason,
                })?;
                metadata.thal_range.unwrap_or(DEFAULT_THAL_RANGE)
            }
        };

        let layout = match settings.feature_order.or(metadata.feature_order) {
            Some(columns) => FeatureLayout::from_columns(&columns)?,
            None => FeatureLayout::canonical(),
        };

        if let Some(width) = classifier.input_width() {
            if width != FEATURE_COUNT {
                return Err(PipelineError::ShapeMismatch(format!(
                    "{} expects {} features, records provide {}",
                    classifier.name(),
                    width,
                    FEATURE_COUNT
                )));
            }
        }

        if let Some(scaler) = &scaler {
            if let Some(width) = scaler.input_width() {
                if width != FEATURE_COUNT {
                    return Err(PipelineError::ShapeMismatch(format!(
                        "{} was fitted on {} features, records provide {}",
                        scaler.name(),
                        width,
                        FEATURE_COUNT
                    )));
                }
            }
        }

        info!(
            model = %classifier.name(),
            scaler = ?scaler.as_ref().map(|s| s.name()),
            disease_class_index,
            thal_min = thal_range.0,
            thal_max = thal_range.1,
            bands = ?settings.policy.bands(),
            "Inference pipeline ready"
        );

        Ok(Self {
            classifier,
            scaler,
            layout,
            disease_class_index,
            thal_range,
            policy: settings.policy,
        })
    }

    /// Score one patient record
    pub fn predict(&self, record: &PatientRecord) -> Result<RiskResult, PipelineError> {
        record.validate(self.thal_range)?;

        let raw = self.layout.extract(record)?;

        let features = match &self.scaler {
            Some(scaler) => {
                let scaled = scaler.transform(&raw)?;
                if scaled.len() != raw.len() {
                    return Err(PipelineError::ShapeMismatch(format!(
                        "{} returned {} features for {} inputs",
                        scaler.name(),
                        scaled.len(),
                        raw.len()
                    )));
                }
                scaled
            }
            None => raw,
        };

        let probs = self.classifier.predict_proba(&features)?;
        let probability = probs.get(self.disease_class_index).copied().ok_or_else(|| {
            PipelineError::ShapeMismatch(format!(
                "{} returned {} class probabilities, disease index is {}",
                self.classifier.name(),
                probs.len(),
                self.disease_class_index
            ))
        })? as f64;

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PipelineError::InvalidOutput(probability));
        }

        let percentage = probability * 100.0;
        let tier = self.policy.tier_for(percentage);

        debug!(
            model = %self.classifier.name(),
            percentage,
            tier = ?tier,
            "Prediction complete"
        );

        Ok(RiskResult { percentage, tier })
    }

    /// Score several records independently
    pub fn predict_batch(&self, records: &[PatientRecord]) -> Vec<Result<RiskResult, PipelineError>> {
        records.iter().map(|record| self.predict(record)).collect()
    }

    pub fn disease_class_index(&self) -> usize {
        self.disease_class_index
    }

    pub fn thal_range(&self) -> (i32, i32) {
        self.thal_range
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }
}
