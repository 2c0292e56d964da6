//! Feature assembly for heart disease model inference.
//!
//! Turns a named-field [`PatientRecord`] into the fixed-order vector the
//! trained artifact expects. Columns are always looked up by name, so a
//! record can never be fed to the model in the wrong order.

use crate::error::PipelineError;
use crate::types::patient::{PatientRecord, FEATURE_COUNT, FEATURE_NAMES};
use std::collections::HashSet;

/// Column order of the model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    columns: Vec<String>,
}

impl FeatureLayout {
    /// Layout matching the canonical training order.
    pub fn canonical() -> Self {
        Self {
            columns: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Layout from an explicit column list.
    ///
    /// The list must name each of the thirteen record fields exactly once.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Result<Self, PipelineError> {
        if columns.len() != FEATURE_COUNT {
            return Err(PipelineError::ShapeMismatch(format!(
                "feature order lists {} columns, expected {}",
                columns.len(),
                FEATURE_COUNT
            )));
        }

        let mut seen = HashSet::with_capacity(FEATURE_COUNT);
        for column in columns {
            let column = column.as_ref();
            if !FEATURE_NAMES.contains(&column) {
                return Err(PipelineError::ShapeMismatch(format!(
                    "unknown feature column '{}'",
                    column
                )));
            }
            if !seen.insert(column) {
                return Err(PipelineError::ShapeMismatch(format!(
                    "feature column '{}' listed twice",
                    column
                )));
            }
        }

        Ok(Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        })
    }

    /// Assemble the feature vector for a record.
    pub fn extract(&self, record: &PatientRecord) -> Result<Vec<f32>, PipelineError> {
        let mut features = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = record.value_of(column).ok_or_else(|| {
                PipelineError::ShapeMismatch(format!("unknown feature column '{}'", column))
            })?;
            features.push(value as f32);
        }

        if features.len() != FEATURE_COUNT {
            return Err(PipelineError::ShapeMismatch(format!(
                "assembled {} features, expected {}",
                features.len(),
                FEATURE_COUNT
            )));
        }

        Ok(features)
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in model order.
    pub fn feature_names(&self) -> &[String] {
        &self.columns
    }
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self::canonical()
    }
}
