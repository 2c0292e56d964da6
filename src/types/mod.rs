//! Type definitions for the heart risk pipeline

pub mod patient;
pub mod risk;

pub use patient::PatientRecord;
pub use risk::{RiskAssessment, RiskResult, RiskTier, TierBand, TierPolicy, TierPreset};
