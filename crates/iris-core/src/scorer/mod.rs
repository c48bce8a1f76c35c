//! Label scoring against a shared vision-language embedding space.
//!
//! The [`LabelScorer`] trait is the seam between the classification engine
//! and the model runtime: the engine encodes the image once and scores the
//! resulting embedding against each category's candidate labels. The
//! production implementation is [`ClipScorer`] (CLIP ViT-B/32 via ONNX
//! Runtime); tests substitute deterministic fakes.

mod clip;
mod preprocess;

pub use clip::ClipScorer;
pub use preprocess::preprocess;

use image::DynamicImage;

use crate::error::ScoreError;

/// Scores candidate labels against an image.
///
/// Implementations must be shareable across connection workers
/// (`Arc<dyn LabelScorer>`), so interior locking is the implementor's
/// responsibility.
pub trait LabelScorer: Send + Sync {
    /// Encode a decoded image into an embedding vector.
    ///
    /// Called once per request; the embedding is reused across categories.
    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<f32>, ScoreError>;

    /// Score an image embedding against a list of candidate labels.
    ///
    /// Returns a probability distribution aligned positionally with
    /// `labels`: non-negative entries summing to 1.0 within float
    /// tolerance.
    fn score(&self, image_embedding: &[f32], labels: &[String]) -> Result<Vec<f32>, ScoreError>;
}
