//! Risk tiers, tiering policy and assessment results

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    /// Traffic-light colour used by the result area
    pub fn severity(&self) -> &'static str {
        match self {
            RiskTier::Low => "green",
            RiskTier::Moderate => "amber",
            RiskTier::High => "red",
        }
    }
}

/// One band of a tier policy: percentages at or above `lower_bound` map to `tier`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    /// Inclusive lower bound in percent
    pub lower_bound: f64,
    pub tier: RiskTier,
}

impl TierBand {
    pub fn new(lower_bound: f64, tier: RiskTier) -> Self {
        Self { lower_bound, tier }
    }
}

/// Named cut points observed in deployed screening forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TierPreset {
    /// HIGH >= 70, MODERATE >= 30
    #[default]
    A,
    /// HIGH >= 60, MODERATE >= 30
    B,
    /// HIGH >= 70, MODERATE >= 40
    C,
}

impl TierPreset {
    pub fn bands(&self) -> Vec<TierBand> {
        let (high, moderate) = match self {
            TierPreset::A => (70.0, 30.0),
            TierPreset::B => (60.0, 30.0),
            TierPreset::C => (70.0, 40.0),
        };
        vec![
            TierBand::new(high, RiskTier::High),
            TierBand::new(moderate, RiskTier::Moderate),
            TierBand::new(0.0, RiskTier::Low),
        ]
    }
}

/// Maps a percentage to a risk tier.
///
/// Bands are kept sorted by descending lower bound and evaluated
/// highest-threshold-first. The lowest band must start at or below 0 so
/// that every percentage in [0, 100] lands in exactly one band.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPolicy {
    bands: Vec<TierBand>,
}

impl TierPolicy {
    pub fn new(mut bands: Vec<TierBand>) -> Result<Self, PipelineError> {
        if bands.is_empty() {
            return Err(PipelineError::InvalidTierPolicy(
                "at least one band is required".to_string(),
            ));
        }
        if let Some(band) = bands.iter().find(|b| !b.lower_bound.is_finite()) {
            return Err(PipelineError::InvalidTierPolicy(format!(
                "lower bound {} is not a finite number",
                band.lower_bound
            )));
        }

        bands.sort_by(|a, b| b.lower_bound.total_cmp(&a.lower_bound));

        if let Some(pair) = bands
            .windows(2)
            .find(|pair| pair[0].lower_bound == pair[1].lower_bound)
        {
            return Err(PipelineError::InvalidTierPolicy(format!(
                "two bands share the lower bound {}",
                pair[0].lower_bound
            )));
        }

        // Sorted descending, so the last band is the lowest
        let lowest = bands[bands.len() - 1].lower_bound;
        if lowest > 0.0 {
            return Err(PipelineError::InvalidTierPolicy(format!(
                "percentages below {} have no tier",
                lowest
            )));
        }

        Ok(Self { bands })
    }

    pub fn from_preset(preset: TierPreset) -> Self {
        Self {
            bands: preset.bands(),
        }
    }

    /// Tier for a percentage in [0, 100]
    pub fn tier_for(&self, percentage: f64) -> RiskTier {
        self.bands
            .iter()
            .find(|band| percentage >= band.lower_bound)
            .map(|band| band.tier)
            // Only reachable for negative or NaN input
            .unwrap_or(self.bands[self.bands.len() - 1].tier)
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::from_preset(TierPreset::default())
    }
}

/// Output of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Disease probability as a percentage (0.0 - 100.0)
    pub percentage: f64,
    pub tier: RiskTier,
}

/// A prediction prepared for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Unique assessment identifier
    pub assessment_id: String,

    #[serde(flatten)]
    pub result: RiskResult,

    /// Traffic-light colour for the tier
    pub severity: String,

    /// Time the assessment was produced
    pub timestamp: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn new(result: RiskResult) -> Self {
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            severity: result.tier.severity().to_string(),
            result,
            timestamp: Utc::now(),
        }
    }

    /// Message shown in the result area
    pub fn message(&self) -> String {
        let p = self.result.percentage;
        match self.result.tier {
            RiskTier::High => format!("High Risk Detected: {:.1}% probability of heart disease.", p),
            RiskTier::Moderate => format!("Moderate Risk: {:.1}% probability of heart disease.", p),
            RiskTier::Low => format!(
                "Low Risk: {:.1}% probability. Indicators are within healthy ranges.",
                p
            ),
        }
    }
}
