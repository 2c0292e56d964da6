//! Model artifacts and the inference pipeline

pub mod artifact;
pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;

pub use artifact::{ArtifactMetadata, Classifier, FeatureScaler};
pub use inference::{InferencePipeline, PipelineSettings};
pub use loader::{ArtifactLoader, LoadedArtifacts};
