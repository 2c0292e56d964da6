//! Screening form boundary.
//!
//! The form owns the loaded pipeline (or the reason it could not be loaded)
//! and turns every failure into a message for the user. Nothing past this
//! point returns an error.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::models::inference::InferencePipeline;
use crate::types::patient::PatientRecord;
use crate::types::risk::RiskAssessment;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of submitting the form
#[derive(Debug, Clone)]
pub enum FormOutcome {
    /// The record was scored
    Assessed(RiskAssessment),
    /// The record was rejected; the message says which field to fix
    Rejected(String),
    /// The record was valid but the model could not score it
    Failed(String),
    /// The form is disabled because the artifacts could not be loaded
    Unavailable(String),
}

impl FormOutcome {
    /// Text shown in the result area
    pub fn message(&self) -> String {
        match self {
            FormOutcome::Assessed(assessment) => assessment.message(),
            FormOutcome::Rejected(message)
            | FormOutcome::Failed(message)
            | FormOutcome::Unavailable(message) => message.clone(),
        }
    }
}

enum FormState {
    Ready(Arc<InferencePipeline>),
    Disabled(String),
}

/// Heart disease screening form
pub struct RiskForm {
    state: FormState,
}

impl RiskForm {
    /// Load the artifacts named in `config`.
    ///
    /// Loading problems do not fail: the form opens disabled and carries
    /// the message to show in place of the result area.
    pub fn open(config: &AppConfig) -> Self {
        match InferencePipeline::from_config(config) {
            Ok(pipeline) => Self::with_pipeline(Arc::new(pipeline)),
            Err(e) if e.is_artifact_error() => {
                error!(error = %e, "Artifacts unavailable, form disabled");
                Self::disabled(&e)
            }
            Err(e) => {
                error!(error = %e, "Pipeline misconfigured, form disabled");
                Self::disabled(&e)
            }
        }
    }

    /// Form backed by an already built pipeline
    pub fn with_pipeline(pipeline: Arc<InferencePipeline>) -> Self {
        Self {
            state: FormState::Ready(pipeline),
        }
    }

    /// Disabled form showing the message for `reason`
    pub fn disabled(reason: &PipelineError) -> Self {
        Self {
            state: FormState::Disabled(reason.user_message()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, FormState::Ready(_))
    }

    /// Message explaining why the form is disabled, if it is
    pub fn status_message(&self) -> Option<&str> {
        match &self.state {
            FormState::Ready(_) => None,
            FormState::Disabled(message) => Some(message.as_str()),
        }
    }

    /// Shared handle to the pipeline when the form is enabled
    pub fn pipeline(&self) -> Option<Arc<InferencePipeline>> {
        match &self.state {
            FormState::Ready(pipeline) => Some(pipeline.clone()),
            FormState::Disabled(_) => None,
        }
    }

    /// Submit one record
    pub fn submit(&self, record: &PatientRecord) -> FormOutcome {
        let pipeline = match &self.state {
            FormState::Ready(pipeline) => pipeline,
            FormState::Disabled(message) => return FormOutcome::Unavailable(message.clone()),
        };

        match pipeline.predict(record) {
            Ok(result) => {
                let assessment = RiskAssessment::new(result);
                info!(
                    assessment_id = %assessment.assessment_id,
                    percentage = assessment.result.percentage,
                    tier = ?assessment.result.tier,
                    "Risk assessed"
                );
                FormOutcome::Assessed(assessment)
            }
            Err(e @ PipelineError::InvalidRecord { .. }) => {
                warn!(error = %e, "Record rejected");
                FormOutcome::Rejected(e.user_message())
            }
            Err(e) => {
                error!(error = %e, "Prediction failed");
                FormOutcome::Failed(e.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::tests::{example_record, FixedClassifier};
    use crate::models::inference::PipelineSettings;
    use crate::models::loader::LoadedArtifacts;
    use crate::types::risk::RiskTier;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn ready_form(probs: Vec<f32>) -> RiskForm {
        let artifacts = LoadedArtifacts {
            classifier: Box::new(FixedClassifier::new(probs, Some(0))),
            scaler: None,
        };
        let pipeline = InferencePipeline::new(artifacts, PipelineSettings::default()).unwrap();
        RiskForm::with_pipeline(Arc::new(pipeline))
    }

    #[test]
    fn test_missing_artifacts_disable_form() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.models.models_dir = dir.path().join("models");
        config.models.base_dir = None;

        let form = RiskForm::open(&config);
        assert!(!form.is_enabled());
        assert!(form.pipeline().is_none());

        let status = form.status_message().unwrap();
        assert!(status.starts_with("Error: Model files not found! Looking at: "));
        assert!(status.contains("heart_disease_model.onnx"));

        match form.submit(&example_record()) {
            FormOutcome::Unavailable(message) => assert_eq!(message, status),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_open_with_json_artifacts() {
        let dir = TempDir::new().unwrap();
        let models_dir = dir.path().join("models");
        fs::create_dir_all(&models_dir).unwrap();
        fs::write(
            models_dir.join("heart_disease_model.json"),
            r#"{"coefficients": [0,0,0,0,0,0,0,0,0,0,0,0,0], "intercept": 0.0}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.models.models_dir = models_dir;
        config.models.base_dir = None;
        config.models.model_file = "heart_disease_model.json".to_string();
        config.models.scaler_file = None;
        config.models.disease_class_index = Some(1);

        let form = RiskForm::open(&config);
        assert!(form.is_enabled());
        assert_eq!(form.status_message(), None);

        match form.submit(&example_record()) {
            FormOutcome::Assessed(assessment) => {
                assert!((assessment.result.percentage - 50.0).abs() < 1e-4);
                assert_eq!(assessment.result.tier, RiskTier::Moderate);
                assert_eq!(
                    assessment.message(),
                    "Moderate Risk: 50.0% probability of heart disease."
                );
            }
            other => panic!("expected Assessed, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_class_index_disables_form() {
        let dir = TempDir::new().unwrap();
        let models_dir = dir.path().join("models");
        fs::create_dir_all(&models_dir).unwrap();
        fs::write(
            models_dir.join("m.json"),
            r#"{"coefficients": [0,0,0,0,0,0,0,0,0,0,0,0,0], "intercept": 0.0}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.models.models_dir = PathBuf::from(&models_dir);
        config.models.model_file = "m.json".to_string();
        config.models.scaler_file = None;

        let form = RiskForm::open(&config);
        assert!(!form.is_enabled());
        assert!(form.status_message().unwrap().contains("disease_class_index"));
    }

    #[test]
    fn test_narrow_scaler_disables_form() {
        let dir = TempDir::new().unwrap();
        let models_dir = dir.path().join("models");
        fs::create_dir_all(&models_dir).unwrap();
        fs::write(
            models_dir.join("m.json"),
            r#"{"coefficients": [0,0,0,0,0,0,0,0,0,0,0,0,0], "intercept": 0.0, "disease_class_index": 1}"#,
        )
        .unwrap();
        fs::write(
            models_dir.join("s.json"),
            r#"{"mean": [0,0,0,0,0,0,0,0,0,0,0,0], "scale": [1,1,1,1,1,1,1,1,1,1,1,1]}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.models.models_dir = models_dir;
        config.models.base_dir = None;
        config.models.model_file = "m.json".to_string();
        config.models.scaler_file = Some("s.json".to_string());

        let form = RiskForm::open(&config);
        assert!(!form.is_enabled());
        assert!(matches!(
            form.submit(&example_record()),
            FormOutcome::Unavailable(_)
        ));
    }

    #[test]
    fn test_model_failure_is_not_a_rejection() {
        let form = ready_form(vec![1.5, -0.5]);

        match form.submit(&example_record()) {
            FormOutcome::Failed(message) => {
                assert_eq!(
                    message,
                    "Error: The risk could not be calculated for this patient. Please try again."
                );
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_record_is_rejected_with_message() {
        let form = ready_form(vec![0.9, 0.1]);
        let record = PatientRecord {
            trestbps: 250,
            ..example_record()
        };

        match form.submit(&record) {
            FormOutcome::Rejected(message) => {
                assert!(message.contains("'trestbps'"));
                assert!(message.contains("between 80 and 200"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_high_risk_outcome() {
        let form = ready_form(vec![0.85, 0.15]);
        let outcome = form.submit(&example_record());

        assert!(matches!(outcome, FormOutcome::Assessed(_)));
        assert_eq!(
            outcome.message(),
            "High Risk Detected: 85.0% probability of heart disease."
        );
    }
}
