//! CLIP ViT-B/32 ONNX session management and scoring.
//!
//! Loads the visual and text encoders exported to ONNX format plus the BPE
//! tokenizer, and scores images against candidate labels: cosine similarity
//! of L2-normalized embeddings, scaled by CLIP's temperature, then softmax.

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;

use crate::error::ScoreError;
use crate::math;

use super::{preprocess, LabelScorer};

/// CLIP's learned temperature (`logit_scale.exp()`), saturated at 100.0 in
/// the released ViT-B/32 weights. Amplifies cosine differences into logits
/// the softmax can separate.
const LOGIT_SCALE: f32 = 100.0;

/// Expected local filenames inside the model directory.
const VISUAL_MODEL_FILE: &str = "visual.onnx";
const TEXT_MODEL_FILE: &str = "text_model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Production scorer backed by CLIP ONNX sessions.
///
/// Uses `Mutex<Session>` because `Session::run` requires `&mut self`; the
/// mutexes serialize inference across connection workers.
pub struct ClipScorer {
    visual: Mutex<Session>,
    text: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    /// Name of the visual input tensor (detected from model metadata).
    visual_input_name: String,
    /// Whether the text encoder declares an attention_mask input.
    text_wants_mask: bool,
    image_size: u32,
    context_length: usize,
}

impl ClipScorer {
    /// Load the visual encoder, text encoder, and tokenizer from `model_dir`.
    ///
    /// Expects `visual.onnx`, `text_model.onnx`, and `tokenizer.json`.
    pub fn load(
        model_dir: &Path,
        image_size: u32,
        context_length: usize,
    ) -> Result<Self, ScoreError> {
        let visual_path = model_dir.join(VISUAL_MODEL_FILE);
        let text_path = model_dir.join(TEXT_MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        for (path, what) in [
            (&visual_path, "Visual encoder"),
            (&text_path, "Text encoder"),
            (&tokenizer_path, "Tokenizer"),
        ] {
            if !path.exists() {
                return Err(ScoreError::Model {
                    message: format!(
                        "{} not found at {:?}. Run `iris models download` first.",
                        what, path
                    ),
                });
            }
        }

        let visual = Session::builder()
            .map_err(|e| ScoreError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&visual_path)
            .map_err(|e| ScoreError::Model {
                message: format!("Failed to load visual encoder: {e}"),
            })?;

        let text = Session::builder()
            .map_err(|e| ScoreError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&text_path)
            .map_err(|e| ScoreError::Model {
                message: format!("Failed to load text encoder: {e}"),
            })?;

        let tokenizer =
            tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| ScoreError::Model {
                message: format!("Failed to load tokenizer: {e}"),
            })?;

        // Detect tensor names from model metadata rather than hardcoding.
        let visual_input_name = visual
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());
        let text_wants_mask = text.inputs().iter().any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP encoders from {:?} (visual input: {:?}, text inputs: {:?})",
            model_dir,
            visual_input_name,
            text.inputs().iter().map(|i| i.name()).collect::<Vec<_>>()
        );

        Ok(Self {
            visual: Mutex::new(visual),
            text: Mutex::new(text),
            tokenizer,
            visual_input_name,
            text_wants_mask,
            image_size,
            context_length,
        })
    }

    /// Check whether the model files exist in `model_dir`.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join(VISUAL_MODEL_FILE).exists()
            && model_dir.join(TEXT_MODEL_FILE).exists()
            && model_dir.join(TOKENIZER_FILE).exists()
    }

    /// Encode a batch of label strings to normalized text embeddings.
    fn encode_labels(&self, labels: &[String]) -> Result<Vec<Vec<f32>>, ScoreError> {
        let batch_size = labels.len();
        let max_length = self.context_length;

        let encodings = self
            .tokenizer
            .encode_batch(labels.to_vec(), true)
            .map_err(|e| ScoreError::Model {
                message: format!("Tokenization failed: {e}"),
            })?;

        // Flat [batch, context_length] tensors, zero-padded. CLIP's EOT
        // pooling locates the end-of-text token by argmax over ids, which
        // zero padding preserves.
        let mut input_ids = vec![0i64; batch_size * max_length];
        let mut attention_mask = vec![0i64; batch_size * max_length];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            for (j, &id) in ids.iter().take(max_length).enumerate() {
                input_ids[i * max_length + j] = id as i64;
                attention_mask[i * max_length + j] = 1;
            }
        }

        let tensor_shape = vec![batch_size as i64, max_length as i64];
        let input_ids_value =
            Value::from_array((tensor_shape.clone(), input_ids)).map_err(|e| {
                ScoreError::Model {
                    message: format!("Failed to create input tensor: {e}"),
                }
            })?;

        let mut session = self.text.lock().map_err(|e| ScoreError::Model {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let run_result = if self.text_wants_mask {
            let mask_value = Value::from_array((tensor_shape, attention_mask)).map_err(|e| {
                ScoreError::Model {
                    message: format!("Failed to create attention mask tensor: {e}"),
                }
            })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => mask_value,
            ])
        } else {
            session.run(ort::inputs!["input_ids" => input_ids_value])
        };

        let outputs = run_result.map_err(|e| ScoreError::Inference {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        // Extract text_embeds by name: the projected cross-modal embedding.
        let text_embeds = outputs
            .iter()
            .find(|(name, _)| *name == "text_embeds")
            .ok_or_else(|| ScoreError::Inference {
                message: "Text encoder did not produce text_embeds".to_string(),
            })?;

        let (shape, data) =
            text_embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| ScoreError::Inference {
                    message: format!("Failed to extract text_embeds tensor: {e}"),
                })?;

        // text_embeds is [N, dim]; derive the embedding width from the
        // output shape instead of hardcoding it.
        let embedding_dim = match shape.len() {
            1 => data.len(),
            2 => shape[1] as usize,
            _ => {
                return Err(ScoreError::Inference {
                    message: format!("Unexpected text_embeds shape: {:?}", shape),
                });
            }
        };

        let embeddings: Vec<Vec<f32>> = data
            .chunks(embedding_dim)
            .take(batch_size)
            .map(math::l2_normalize)
            .collect();

        Ok(embeddings)
    }
}

impl LabelScorer for ClipScorer {
    /// Run visual inference and return the L2-normalized image embedding.
    ///
    /// Input shape: \[1, 3, image_size, image_size\] (NCHW, CLIP-normalized).
    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, ScoreError> {
        let preprocessed = preprocess(image, self.image_size);

        // Convert ndarray to (shape, flat_data) for ort (avoids ndarray feature dependency).
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| ScoreError::Model {
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![self.visual_input_name.as_str() => input_value];

        let mut session = self.visual.lock().map_err(|e| ScoreError::Model {
            message: format!("Visual encoder lock poisoned: {e}"),
        })?;

        let outputs = session.run(inputs).map_err(|e| ScoreError::Inference {
            message: format!("Visual encoder inference failed: {e}"),
        })?;

        // Extract image_embeds by name: the projected cross-modal embedding.
        // last_hidden_state is NOT aligned across modalities and must not be
        // scored against text embeddings.
        let image_embeds = outputs
            .iter()
            .find(|(name, _)| *name == "image_embeds")
            .ok_or_else(|| ScoreError::Inference {
                message: "Visual encoder did not produce image_embeds".to_string(),
            })?;

        let (shape, data) =
            image_embeds
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| ScoreError::Inference {
                    message: format!("Failed to extract image_embeds tensor: {e}"),
                })?;

        // image_embeds is [1, dim]; extract the single embedding vector.
        let mut raw = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim].to_vec()
            }
            _ => {
                return Err(ScoreError::Inference {
                    message: format!("Unexpected image_embeds shape: {:?}", shape),
                });
            }
        };

        math::l2_normalize_in_place(&mut raw);
        Ok(raw)
    }

    /// Score an image embedding against candidate labels.
    ///
    /// Both sides are L2-normalized, so dot product = cosine similarity.
    /// Logits are `cosine × LOGIT_SCALE`; the returned distribution is their
    /// softmax, aligned positionally with `labels`.
    fn score(&self, image_embedding: &[f32], labels: &[String]) -> Result<Vec<f32>, ScoreError> {
        let text_embeddings = self.encode_labels(labels)?;

        let logits: Vec<f32> = text_embeddings
            .iter()
            .map(|text_embedding| {
                let cosine: f32 = image_embedding
                    .iter()
                    .zip(text_embedding.iter())
                    .map(|(a, b)| a * b)
                    .sum();
                cosine * LOGIT_SCALE
            })
            .collect();

        Ok(math::softmax(&logits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_exists_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!ClipScorer::model_exists(dir.path()));
    }

    #[test]
    fn test_model_exists_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VISUAL_MODEL_FILE), b"stub").unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), b"stub").unwrap();
        // Missing text encoder
        assert!(!ClipScorer::model_exists(dir.path()));

        std::fs::write(dir.path().join(TEXT_MODEL_FILE), b"stub").unwrap();
        assert!(ClipScorer::model_exists(dir.path()));
    }

    #[test]
    fn test_logit_scaling_separates_close_cosines() {
        // Cosine similarities from CLIP typically live in a narrow band;
        // the temperature must spread them enough for softmax to rank.
        let logits = [0.28 * LOGIT_SCALE, 0.25 * LOGIT_SCALE];
        let probs = math::softmax(&logits);
        assert!(probs[0] > 0.9, "scaled 0.03 cosine gap should dominate");
    }
}
