//! Heart Disease Risk Pipeline Library
//!
//! Scores a thirteen-measurement patient record with a pre-trained
//! classifier (and optional feature scaler) and maps the disease
//! probability to a LOW / MODERATE / HIGH risk tier.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod form;
pub mod models;
pub mod types;

pub use config::AppConfig;
pub use error::PipelineError;
pub use feature_extractor::FeatureLayout;
pub use form::{FormOutcome, RiskForm};
pub use models::inference::InferencePipeline;
pub use types::{patient::PatientRecord, risk::RiskResult, risk::RiskTier};
