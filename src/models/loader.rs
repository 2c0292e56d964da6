//! Artifact loader: resolves paths and deserializes classifier and scaler

use crate::config::ModelsConfig;
use crate::error::PipelineError;
use crate::models::artifact::{Classifier, FeatureScaler};
use crate::models::linear::{LinearClassifier, StandardScaler};
use crate::models::onnx::{OnnxClassifier, OnnxScaler};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Classifier plus optional scaler, as read from disk
pub struct LoadedArtifacts {
    pub classifier: Box<dyn Classifier>,
    pub scaler: Option<Box<dyn FeatureScaler>>,
}

/// Serialized formats understood by the loader, keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactFormat {
    Onnx,
    Json,
}

impl ArtifactFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => Some(ArtifactFormat::Onnx),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(ArtifactFormat::Json),
            _ => None,
        }
    }
}

/// Loader for model artifacts
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a new loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Resolve and load the artifacts named in the configuration.
    ///
    /// Each file is looked up under the working directory first, then under
    /// the configured base directory.
    pub fn load_configured(&self, models: &ModelsConfig) -> Result<LoadedArtifacts, PipelineError> {
        let model_path = resolve("model", &models.candidate_paths(&models.model_file))?;
        let scaler_path = models
            .scaler_file
            .as_ref()
            .map(|file| resolve("scaler", &models.candidate_paths(file)))
            .transpose()?;

        self.load_artifacts(&model_path, scaler_path.as_deref())
    }

    /// Load the classifier and, when given, the scaler from explicit paths
    pub fn load_artifacts(
        &self,
        model_path: &Path,
        scaler_path: Option<&Path>,
    ) -> Result<LoadedArtifacts, PipelineError> {
        // Check both files before the (slower) deserialization of either
        ensure_exists("model", model_path)?;
        if let Some(path) = scaler_path {
            ensure_exists("scaler", path)?;
        }

        let classifier = self.load_classifier(model_path)?;
        classifier
            .metadata()
            .validate()
            .map_err(|reason| corrupt("model", model_path, reason))?;
        let scaler = scaler_path.map(|path| self.load_scaler(path)).transpose()?;

        info!(
            model = %model_path.display(),
            scaler = ?scaler_path.map(|p| p.display().to_string()),
            "Artifacts loaded"
        );

        Ok(LoadedArtifacts { classifier, scaler })
    }

    /// Load a classifier, picking the backend from the file extension
    pub fn load_classifier(&self, path: &Path) -> Result<Box<dyn Classifier>, PipelineError> {
        ensure_exists("model", path)?;
        let name = artifact_name(path);

        match format_of("model", path)? {
            ArtifactFormat::Onnx => {
                let model = OnnxClassifier::load(path, &name, self.onnx_threads)
                    .map_err(|e| corrupt("model", path, format!("{:#}", e)))?;
                Ok(Box::new(model))
            }
            ArtifactFormat::Json => {
                let raw = read_to_string("model", path)?;
                let model = LinearClassifier::from_json(&name, &raw)
                    .map_err(|e| corrupt("model", path, e.to_string()))?;
                info!(model = %name, path = %path.display(), "Linear model loaded");
                Ok(Box::new(model))
            }
        }
    }

    /// Load a scaler, picking the backend from the file extension
    pub fn load_scaler(&self, path: &Path) -> Result<Box<dyn FeatureScaler>, PipelineError> {
        ensure_exists("scaler", path)?;
        let name = artifact_name(path);

        match format_of("scaler", path)? {
            ArtifactFormat::Onnx => {
                let scaler = OnnxScaler::load(path, &name, self.onnx_threads)
                    .map_err(|e| corrupt("scaler", path, format!("{:#}", e)))?;
                Ok(Box::new(scaler))
            }
            ArtifactFormat::Json => {
                let raw = read_to_string("scaler", path)?;
                let scaler = StandardScaler::from_json(&name, &raw)
                    .map_err(|reason| corrupt("scaler", path, reason))?;
                info!(scaler = %name, path = %path.display(), "Standard scaler loaded");
                Ok(Box::new(scaler))
            }
        }
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// First candidate that is a regular file
fn resolve(artifact: &str, candidates: &[PathBuf]) -> Result<PathBuf, PipelineError> {
    for path in candidates {
        if path.is_file() {
            return Ok(path.clone());
        }
        warn!(artifact = %artifact, path = %path.display(), "Artifact file not found");
    }

    Err(PipelineError::ArtifactNotFound {
        artifact: artifact.to_string(),
        attempted: candidates.to_vec(),
    })
}

fn ensure_exists(artifact: &str, path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::ArtifactNotFound {
            artifact: artifact.to_string(),
            attempted: vec![path.to_path_buf()],
        })
    }
}

fn format_of(artifact: &str, path: &Path) -> Result<ArtifactFormat, PipelineError> {
    ArtifactFormat::from_path(path).ok_or_else(|| {
        corrupt(
            artifact,
            path,
            "unsupported artifact format (expected .onnx or .json)".to_string(),
        )
    })
}

fn read_to_string(artifact: &str, path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|e| corrupt(artifact, path, e.to_string()))
}

fn corrupt(artifact: &str, path: &Path, reason: String) -> PipelineError {
    PipelineError::ArtifactCorrupt {
        artifact: artifact.to_string(),
        path: path.to_path_buf(),
        reason,
    }
}

fn artifact_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("artifact")
        .to_string()
}
