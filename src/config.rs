//! Configuration management for the heart risk pipeline

use crate::error::PipelineError;
use crate::types::risk::{TierBand, TierPolicy, TierPreset};
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub models: ModelsConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the artifacts, relative to the working directory
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    /// Fallback base directory searched when the artifacts are not under the
    /// working directory
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Classifier file name (`.onnx` or `.json`)
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// Optional scaler file name (`.onnx` or `.json`)
    #[serde(default)]
    pub scaler_file: Option<String>,
    /// Index of the disease class in the model's probability output.
    /// Overrides artifact metadata.
    #[serde(default)]
    pub disease_class_index: Option<usize>,
    /// Accepted thal codes as `[min, max]`. Overrides artifact metadata.
    #[serde(default)]
    pub thal_range: Option<[i32; 2]>,
    /// Column order used at training time. Overrides artifact metadata.
    #[serde(default)]
    pub feature_order: Option<Vec<String>>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_model_file() -> String {
    "heart_disease_model.onnx".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl ModelsConfig {
    /// Locations checked for an artifact file, in order
    pub fn candidate_paths(&self, file: &str) -> Vec<PathBuf> {
        let file = Path::new(file);
        if file.is_absolute() {
            return vec![file.to_path_buf()];
        }

        let mut candidates = vec![self.models_dir.join(file)];
        if let Some(base_dir) = &self.base_dir {
            let fallback = base_dir.join(&self.models_dir).join(file);
            if !candidates.contains(&fallback) {
                candidates.push(fallback);
            }
        }
        candidates
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            base_dir: Some(PathBuf::from("..")),
            model_file: default_model_file(),
            scaler_file: Some("data_scaler.onnx".to_string()),
            disease_class_index: None,
            thal_range: None,
            feature_order: None,
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Risk tier configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RiskConfig {
    /// Named cut points: "a", "b" or "c"
    #[serde(default)]
    pub preset: TierPreset,
    /// Explicit bands; override the preset when present
    #[serde(default)]
    pub bands: Option<Vec<TierBand>>,
}

impl RiskConfig {
    pub fn policy(&self) -> Result<TierPolicy, PipelineError> {
        match &self.bands {
            Some(bands) => TierPolicy::new(bands.clone()),
            None => Ok(TierPolicy::from_preset(self.preset)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Default configuration file location
    pub const DEFAULT_PATH: &'static str = "config/config.toml";

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::DEFAULT_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            risk: RiskConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::risk::RiskTier;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.models.models_dir, PathBuf::from("models"));
        assert_eq!(config.models.model_file, "heart_disease_model.onnx");
        assert_eq!(config.models.disease_class_index, None);
        assert_eq!(config.risk.preset, TierPreset::A);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_candidate_paths_try_working_dir_first() {
        let models = ModelsConfig::default();
        let candidates = models.candidate_paths("heart_disease_model.onnx");

        assert_eq!(
            candidates,
            vec![
                PathBuf::from("models/heart_disease_model.onnx"),
                PathBuf::from("../models/heart_disease_model.onnx"),
            ]
        );
    }

    #[test]
    fn test_candidate_paths_without_base_dir() {
        let models = ModelsConfig {
            base_dir: None,
            ..ModelsConfig::default()
        };
        assert_eq!(models.candidate_paths("m.json").len(), 1);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[models]
models_dir = "artifacts"
model_file = "heart_disease_model.json"
scaler_file = "data_scaler.json"
disease_class_index = 1
thal_range = [1, 3]

[risk]
preset = "c"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.models.models_dir, PathBuf::from("artifacts"));
        assert_eq!(config.models.scaler_file.as_deref(), Some("data_scaler.json"));
        assert_eq!(config.models.disease_class_index, Some(1));
        assert_eq!(config.models.thal_range, Some([1, 3]));
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.risk.preset, TierPreset::C);
        assert_eq!(config.logging.format, "json");

        let policy = config.risk.policy().unwrap();
        assert_eq!(policy.tier_for(35.0), RiskTier::Low);
    }

    #[test]
    fn test_explicit_bands_override_preset() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[models]
model_file = "heart_disease_model.json"

[risk]
preset = "a"
bands = [
    {{ lower_bound = 0.0, tier = "low" }},
    {{ lower_bound = 50.0, tier = "high" }},
]
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        let policy = config.risk.policy().unwrap();
        assert_eq!(policy.tier_for(55.0), RiskTier::High);
        assert_eq!(policy.tier_for(45.0), RiskTier::Low);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load_from_path("does/not/exist.toml").is_err());
    }
}
