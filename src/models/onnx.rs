//! ONNX Runtime backed classifier and scaler

use crate::error::PipelineError;
use crate::models::artifact::{ArtifactMetadata, Classifier, FeatureScaler};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{
    DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor, ValueType,
};
use std::ops::Deref;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// ONNX session with resolved input/output names
struct OnnxSession {
    /// Session needs exclusive access to run
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_width: Option<usize>,
}

impl OnnxSession {
    fn open(path: &Path, name: &str, onnx_threads: usize) -> Result<(Self, ArtifactMetadata)> {
        // Only the first commit configures the environment; later ones return false
        ort::init()
            .with_name("heart_risk")
            .commit()
            .context("Failed to initialize ONNX Runtime")?;

        info!(artifact = %name, path = %path.display(), threads = onnx_threads, "Loading ONNX artifact");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load ONNX artifact from {:?}", path))?;

        let input = session
            .inputs
            .first()
            .context("model has no inputs")?;
        let input_name = input.name.clone();

        // Only a fixed trailing dimension tells us the width; -1 is dynamic
        let input_width = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape
                .iter()
                .copied()
                .last()
                .filter(|&dim| dim > 0)
                .map(|dim| dim as usize),
            _ => None,
        };

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("variable"))
            .map(|o| o.name.clone())
            .or_else(|| session.outputs.last().map(|o| o.name.clone()))
            .context("model has no outputs")?;

        let metadata = read_metadata(&session)?;

        info!(
            artifact = %name,
            input = %input_name,
            output = %output_name,
            input_width = ?input_width,
            "ONNX artifact loaded"
        );

        Ok((
            Self {
                session: Mutex::new(session),
                input_name,
                output_name,
                input_width,
            },
            metadata,
        ))
    }

    /// Run one row and hand the outputs to `extract` while the session is held
    fn run<T>(
        &self,
        features: &[f32],
        extract: impl FnOnce(&SessionOutputs, &str) -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| PipelineError::Inference(format!("failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PipelineError::Inference(format!("lock error: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        extract(&outputs, &self.output_name)
    }
}

fn read_metadata(session: &Session) -> Result<ArtifactMetadata> {
    let metadata = session.metadata()?;
    let custom = |key: &str| metadata.custom(key).ok().flatten();

    let class_index = custom("disease_class_index");
    let thal_range = custom("thal_range");
    let feature_order = custom("feature_order");

    ArtifactMetadata::from_custom_fields(
        class_index.as_deref(),
        thal_range.as_deref(),
        feature_order.as_deref(),
    )
    .map_err(|e| anyhow::anyhow!("Invalid artifact metadata: {}", e))
}

/// Classifier exported to ONNX
pub struct OnnxClassifier {
    name: String,
    inner: OnnxSession,
    metadata: ArtifactMetadata,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(path: P, name: &str, onnx_threads: usize) -> Result<Self> {
        let (inner, metadata) = OnnxSession::open(path.as_ref(), name, onnx_threads)?;
        Ok(Self {
            name: name.to_string(),
            inner,
            metadata,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError> {
        let probs = self
            .inner
            .run(features, |outputs, output_name| extract_distribution(outputs, output_name))?;
        debug!(artifact = %self.name, probs = ?probs, "ONNX classifier run");
        Ok(probs)
    }

    fn input_width(&self) -> Option<usize> {
        self.inner.input_width
    }

    fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }
}

/// Scaler exported to ONNX
pub struct OnnxScaler {
    name: String,
    inner: OnnxSession,
}

impl OnnxScaler {
    pub fn load<P: AsRef<Path>>(path: P, name: &str, onnx_threads: usize) -> Result<Self> {
        let (inner, _) = OnnxSession::open(path.as_ref(), name, onnx_threads)?;
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }
}

impl FeatureScaler for OnnxScaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, features: &[f32]) -> Result<Vec<f32>, PipelineError> {
        self.inner.run(features, |outputs, output_name| {
            let output = outputs
                .get(output_name)
                .ok_or_else(|| PipelineError::Inference(format!("missing output '{}'", output_name)))?;
            let (_, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Inference(e.to_string()))?;
            Ok(data.to_vec())
        })
    }

    fn input_width(&self) -> Option<usize> {
        self.inner.input_width
    }
}

/// Class distribution from classifier outputs.
///
/// Handles plain probability tensors and the seq(map(int64, float)) form
/// produced when class labels are zipped into a map.
fn extract_distribution(
    outputs: &SessionOutputs,
    output_name: &str,
) -> Result<Vec<f32>, PipelineError> {
    select_distribution(output_name, outputs.iter())
}

/// Distribution from `preferred` if it holds one, else from the first other
/// output that is not the label
fn select_distribution<'a, V: Deref<Target = DynValue>>(
    preferred: &str,
    outputs: impl IntoIterator<Item = (&'a str, V)>,
) -> Result<Vec<f32>, PipelineError> {
    let outputs: Vec<(&str, V)> = outputs.into_iter().collect();

    if let Some((_, output)) = outputs.iter().find(|(name, _)| *name == preferred) {
        if let Some(probs) = distribution_from_value(output) {
            return Ok(probs);
        }
    }

    for (name, output) in &outputs {
        if *name == preferred || name.contains("label") {
            continue;
        }
        if let Some(probs) = distribution_from_value(output) {
            debug!(output = %name, "Distribution taken from fallback output");
            return Ok(probs);
        }
    }

    Err(PipelineError::ShapeMismatch(
        "no probability output found in ONNX model".to_string(),
    ))
}

fn distribution_from_value(output: &DynValue) -> Option<Vec<f32>> {
    let dtype = output.dtype();

    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        // [batch, classes] or [classes]; batch is always 1 here
        let classes = shape.iter().copied().last().unwrap_or(0).max(0) as usize;
        if classes > 0 && data.len() >= classes {
            return Some(data[..classes].to_vec());
        }
        return None;
    }

    if DynSequenceValueType::can_downcast(dtype) {
        return extract_from_sequence_map(output).ok();
    }

    None
}

/// Distribution indexed by class id from a seq(map(int64, float)) output
fn extract_from_sequence_map(output: &DynValue) -> Result<Vec<f32>, PipelineError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| PipelineError::Inference(format!("failed to downcast to sequence: {}", e)))?;

    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(|e| PipelineError::Inference(e.to_string()))?;

    // Batch size is 1, so only the first map matters
    let map_value = maps
        .first()
        .ok_or_else(|| PipelineError::Inference("empty sequence".to_string()))?;

    let kv_pairs = map_value
        .try_extract_key_values::<i64, f32>()
        .map_err(|e| PipelineError::Inference(e.to_string()))?;

    let max_class = kv_pairs
        .iter()
        .map(|(class_id, _)| *class_id)
        .max()
        .ok_or_else(|| PipelineError::Inference("empty probability map".to_string()))?;
    if max_class < 0 || kv_pairs.iter().any(|(class_id, _)| *class_id < 0) {
        return Err(PipelineError::ShapeMismatch(
            "negative class id in probability map".to_string(),
        ));
    }

    let mut probs = vec![0.0_f32; max_class as usize + 1];
    for (class_id, prob) in &kv_pairs {
        probs[*class_id as usize] = *prob;
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ort::value::{Map, Sequence};

    fn tensor(shape: Vec<i64>, data: Vec<f32>) -> DynValue {
        Tensor::from_array((shape, data)).unwrap().into_dyn()
    }

    fn zipmap(pairs: Vec<(i64, f32)>) -> DynValue {
        let map = Map::<i64, f32>::new(pairs).unwrap();
        Sequence::new(vec![map]).unwrap().into_dyn()
    }

    #[test]
    fn test_tensor_keeps_class_order() {
        let batched = tensor(vec![1, 2], vec![0.3, 0.7]);
        assert_eq!(distribution_from_value(&batched), Some(vec![0.3, 0.7]));

        let flat = tensor(vec![3], vec![0.2, 0.5, 0.3]);
        assert_eq!(distribution_from_value(&flat), Some(vec![0.2, 0.5, 0.3]));
    }

    #[test]
    fn test_non_float_tensor_is_not_a_distribution() {
        let labels = Tensor::from_array((vec![1_i64], vec![1_i64])).unwrap().into_dyn();
        assert_eq!(distribution_from_value(&labels), None);
    }

    #[test]
    fn test_zipmap_indexed_by_class_id() {
        // Map iteration order is not class order
        let output = zipmap(vec![(1, 0.8), (0, 0.2)]);

        assert_eq!(extract_from_sequence_map(&output).unwrap(), vec![0.2, 0.8]);
        assert_eq!(distribution_from_value(&output), Some(vec![0.2, 0.8]));
    }

    #[test]
    fn test_zipmap_rejects_negative_class_id() {
        let output = zipmap(vec![(-1, 0.4), (0, 0.6)]);
        assert!(matches!(
            extract_from_sequence_map(&output),
            Err(PipelineError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_preferred_output_wins() {
        let label = Tensor::from_array((vec![1_i64], vec![0_i64])).unwrap().into_dyn();
        let probabilities = tensor(vec![1, 2], vec![0.9, 0.1]);
        let logits = tensor(vec![1, 2], vec![4.0, -4.0]);

        let outputs = vec![
            ("output_label", &label),
            ("logits", &logits),
            ("output_probability", &probabilities),
        ];
        assert_eq!(
            select_distribution("output_probability", outputs).unwrap(),
            vec![0.9, 0.1]
        );
    }

    #[test]
    fn test_falls_back_past_label_output() {
        let label = tensor(vec![1, 1], vec![1.0]);
        let probabilities = zipmap(vec![(0, 0.35), (1, 0.65)]);

        let outputs = vec![("output_label", &label), ("output_probability", &probabilities)];
        assert_eq!(
            select_distribution("missing", outputs).unwrap(),
            vec![0.35, 0.65]
        );
    }

    #[test]
    fn test_no_distribution_is_shape_mismatch() {
        let label = Tensor::from_array((vec![1_i64], vec![1_i64])).unwrap().into_dyn();
        let outputs = vec![("output_label", &label)];

        assert!(matches!(
            select_distribution("output_label", outputs),
            Err(PipelineError::ShapeMismatch(_))
        ));
    }
}
