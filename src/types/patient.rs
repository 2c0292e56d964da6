//! Patient record submitted by the screening form

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Number of clinical measurements in a record
pub const FEATURE_COUNT: usize = 13;

/// Canonical column order used when the classifier was trained
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Accepted thal codes when the artifact does not narrow them
pub const DEFAULT_THAL_RANGE: (i32, i32) = (0, 3);

/// Form ranges for every field except thal, whose range depends on the artifact
const FIELD_RANGES: [(&str, f64, f64); FEATURE_COUNT - 1] = [
    ("age", 1.0, 110.0),
    ("sex", 0.0, 1.0),
    ("cp", 0.0, 3.0),
    ("trestbps", 80.0, 200.0),
    ("chol", 100.0, 500.0),
    ("fbs", 0.0, 1.0),
    ("restecg", 0.0, 2.0),
    ("thalach", 60.0, 220.0),
    ("exang", 0.0, 1.0),
    ("oldpeak", 0.0, 6.0),
    ("slope", 0.0, 2.0),
    ("ca", 0.0, 3.0),
];

/// The thirteen clinical measurements of one patient.
///
/// Fields are addressed by name; the order of the struct (or of keys in a
/// JSON payload) carries no meaning. Feature vectors are assembled through
/// [`crate::feature_extractor::FeatureLayout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientRecord {
    /// Age in years
    pub age: i32,

    /// Sex (1 = male, 0 = female)
    pub sex: i32,

    /// Chest pain type (0-3)
    pub cp: i32,

    /// Resting blood pressure in mmHg
    pub trestbps: i32,

    /// Serum cholesterol in mg/dl
    pub chol: i32,

    /// Fasting blood sugar > 120 mg/dl (1 = true)
    pub fbs: i32,

    /// Resting ECG result (0-2)
    pub restecg: i32,

    /// Maximum heart rate achieved
    pub thalach: i32,

    /// Exercise induced angina (1 = yes)
    pub exang: i32,

    /// ST depression induced by exercise relative to rest
    pub oldpeak: f64,

    /// Slope of the peak exercise ST segment (0-2)
    pub slope: i32,

    /// Number of major vessels colored by fluoroscopy (0-3)
    pub ca: i32,

    /// Thalassemia code
    pub thal: i32,
}

impl PatientRecord {
    /// Look up a measurement by its column name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        let value = match name {
            "age" => self.age as f64,
            "sex" => self.sex as f64,
            "cp" => self.cp as f64,
            "trestbps" => self.trestbps as f64,
            "chol" => self.chol as f64,
            "fbs" => self.fbs as f64,
            "restecg" => self.restecg as f64,
            "thalach" => self.thalach as f64,
            "exang" => self.exang as f64,
            "oldpeak" => self.oldpeak,
            "slope" => self.slope as f64,
            "ca" => self.ca as f64,
            "thal" => self.thal as f64,
            _ => return None,
        };
        Some(value)
    }

    /// Check every field against its accepted range.
    ///
    /// `thal_range` comes from the loaded artifact since thal encodings
    /// differ between training runs.
    pub fn validate(&self, thal_range: (i32, i32)) -> Result<(), PipelineError> {
        for (field, min, max) in FIELD_RANGES {
            // Every name in FIELD_RANGES is a known column
            let value = self.value_of(field).unwrap_or(f64::NAN);
            if !value.is_finite() || value < min || value > max {
                return Err(PipelineError::InvalidRecord {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }

        let (thal_min, thal_max) = thal_range;
        if self.thal < thal_min || self.thal > thal_max {
            return Err(PipelineError::InvalidRecord {
                field: "thal",
                value: self.thal as f64,
                min: thal_min as f64,
                max: thal_max as f64,
            });
        }

        Ok(())
    }
}

impl Default for PatientRecord {
    /// Values the form is pre-filled with
    fn default() -> Self {
        Self {
            age: 50,
            sex: 0,
            cp: 0,
            trestbps: 120,
            chol: 200,
            fbs: 0,
            restecg: 0,
            thalach: 150,
            exang: 0,
            oldpeak: 1.0,
            slope: 0,
            ca: 0,
            thal: 2,
        }
    }
}
