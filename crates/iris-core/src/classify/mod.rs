//! Classification engine: one image plus per-category candidate labels in,
//! one ranked result per category out.
//!
//! The image is decoded and encoded exactly once per request; the embedding
//! is reused across every category's scoring pass.

pub mod decode;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ClassifyError, ScoreError};
use crate::scorer::LabelScorer;
use crate::types::{CategoryResult, LabelScore};

/// Runs the classification procedure against an injected scorer.
pub struct Classifier {
    scorer: Arc<dyn LabelScorer>,
    max_image_dimension: u32,
}

impl Classifier {
    /// Create a classifier around a scorer capability.
    pub fn new(scorer: Arc<dyn LabelScorer>, max_image_dimension: u32) -> Self {
        Self {
            scorer,
            max_image_dimension,
        }
    }

    /// Classify an image against per-category candidate labels.
    ///
    /// Returns one [`CategoryResult`] per input category. The labels mapping
    /// must be non-empty and every category must carry at least one label.
    pub fn classify(
        &self,
        image_bytes: Vec<u8>,
        labels: &BTreeMap<String, Vec<String>>,
    ) -> Result<BTreeMap<String, CategoryResult>, ClassifyError> {
        if labels.is_empty() {
            return Err(ClassifyError::NoCategories);
        }
        for (category, candidates) in labels {
            if candidates.is_empty() {
                return Err(ClassifyError::EmptyCategory {
                    category: category.clone(),
                });
            }
        }

        let decoded = decode::decode_image(image_bytes, self.max_image_dimension)?;
        tracing::debug!(
            width = decoded.width,
            height = decoded.height,
            format = %decode::format_to_string(decoded.format),
            categories = labels.len(),
            "decoded image"
        );

        // One visual encoding per request, shared by all categories.
        let embedding = self.scorer.encode_image(&decoded.image)?;

        let mut results = BTreeMap::new();
        for (category, candidates) in labels {
            let distribution = self.scorer.score(&embedding, candidates)?;
            if distribution.len() != candidates.len() {
                return Err(ClassifyError::Scoring(ScoreError::Inference {
                    message: format!(
                        "Scorer returned {} scores for {} labels in category {:?}",
                        distribution.len(),
                        candidates.len(),
                        category
                    ),
                }));
            }
            results.insert(category.clone(), rank(candidates, &distribution));
        }

        Ok(results)
    }
}

/// Build a [`CategoryResult`] from a label list and its score distribution.
///
/// The top label is the argmax (first maximum on ties). Alternatives keep
/// only strictly positive scores, sorted descending; the sort is stable so
/// equal scores preserve original label order.
fn rank(candidates: &[String], distribution: &[f32]) -> CategoryResult {
    let mut best_idx = 0;
    for (i, &score) in distribution.iter().enumerate() {
        if score > distribution[best_idx] {
            best_idx = i;
        }
    }

    let mut alternatives: Vec<LabelScore> = candidates
        .iter()
        .zip(distribution.iter())
        .filter(|(_, &score)| score > 0.0)
        .map(|(label, &score)| LabelScore::new(label.clone(), score))
        .collect();
    alternatives.sort_by(|a, b| b.score.total_cmp(&a.score));

    CategoryResult {
        label: candidates[best_idx].clone(),
        score: distribution[best_idx],
        alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic scorer: label "cat" always wins, scores otherwise
    /// assigned by a fixed table, normalized to a distribution.
    struct FakeScorer {
        encode_calls: AtomicUsize,
    }

    impl FakeScorer {
        fn new() -> Self {
            Self {
                encode_calls: AtomicUsize::new(0),
            }
        }

        fn weight(label: &str) -> f32 {
            match label {
                "cat" => 8.0,
                "dog" => 2.0,
                "indoor" => 5.0,
                "outdoor" => 5.0,
                _ => 0.0,
            }
        }
    }

    impl LabelScorer for FakeScorer {
        fn encode_image(&self, _image: &DynamicImage) -> Result<Vec<f32>, ScoreError> {
            self.encode_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0, 0.0])
        }

        fn score(
            &self,
            _image_embedding: &[f32],
            labels: &[String],
        ) -> Result<Vec<f32>, ScoreError> {
            let weights: Vec<f32> = labels.iter().map(|l| Self::weight(l)).collect();
            let total: f32 = weights.iter().sum();
            if total == 0.0 {
                // Uniform fallback when no label is known.
                return Ok(vec![1.0 / labels.len() as f32; labels.len()]);
            }
            Ok(weights.into_iter().map(|w| w / total).collect())
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(16, 16);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn labels(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(cat, ls)| {
                (
                    cat.to_string(),
                    ls.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(FakeScorer::new()), 10_000)
    }

    #[test]
    fn test_classify_rejects_empty_labels() {
        let result = classifier().classify(png_bytes(), &BTreeMap::new());
        assert!(matches!(result, Err(ClassifyError::NoCategories)));
    }

    #[test]
    fn test_classify_rejects_empty_category() {
        let result = classifier().classify(png_bytes(), &labels(&[("animal", &[])]));
        match result {
            Err(ClassifyError::EmptyCategory { category }) => assert_eq!(category, "animal"),
            other => panic!("Expected EmptyCategory, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_classify_rejects_undecodable_image() {
        let result = classifier().classify(
            b"not an image".to_vec(),
            &labels(&[("animal", &["cat", "dog"])]),
        );
        assert!(matches!(result, Err(ClassifyError::Decode { .. })));
    }

    #[test]
    fn test_top_label_is_argmax() {
        let results = classifier()
            .classify(png_bytes(), &labels(&[("animal", &["dog", "cat"])]))
            .unwrap();
        let animal = &results["animal"];
        assert_eq!(animal.label, "cat");
        assert!((animal.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let results = classifier()
            .classify(png_bytes(), &labels(&[("animal", &["cat", "dog"])]))
            .unwrap();
        let total: f32 = results["animal"].alternatives.iter().map(|a| a.score).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_alternatives_sorted_descending_with_stable_ties() {
        let results = classifier()
            .classify(
                png_bytes(),
                &labels(&[("setting", &["outdoor", "indoor", "cat"])]),
            )
            .unwrap();
        let alts = &results["setting"];
        // cat (8/18) first, then the tied 5/18 pair in original order.
        assert_eq!(alts.alternatives[0].label, "cat");
        assert_eq!(alts.alternatives[1].label, "outdoor");
        assert_eq!(alts.alternatives[2].label, "indoor");
        assert!(alts.alternatives[1].score >= alts.alternatives[2].score);
    }

    #[test]
    fn test_zero_scores_excluded_from_alternatives() {
        let results = classifier()
            .classify(
                png_bytes(),
                &labels(&[("animal", &["cat", "dog", "unrecognized-zebra"])]),
            )
            .unwrap();
        let alts = &results["animal"].alternatives;
        assert_eq!(alts.len(), 2);
        assert!(alts.iter().all(|a| a.label != "unrecognized-zebra"));
    }

    #[test]
    fn test_top_label_included_in_alternatives() {
        let results = classifier()
            .classify(png_bytes(), &labels(&[("animal", &["cat", "dog"])]))
            .unwrap();
        let animal = &results["animal"];
        assert!(animal.alternatives.iter().any(|a| a.label == animal.label));
    }

    #[test]
    fn test_image_encoded_once_across_categories() {
        let scorer = Arc::new(FakeScorer::new());
        let classifier = Classifier::new(scorer.clone(), 10_000);
        classifier
            .classify(
                png_bytes(),
                &labels(&[
                    ("animal", &["cat", "dog"]),
                    ("setting", &["indoor", "outdoor"]),
                    ("mood", &["calm"]),
                ]),
            )
            .unwrap();
        assert_eq!(scorer.encode_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_category_answered() {
        let results = classifier()
            .classify(
                png_bytes(),
                &labels(&[("animal", &["cat", "dog"]), ("setting", &["indoor"])]),
            )
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.contains_key("animal"));
        assert!(results.contains_key("setting"));
    }

    #[test]
    fn test_rank_first_max_wins_ties() {
        let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank(&candidates, &[0.4, 0.4, 0.2]);
        assert_eq!(ranked.label, "a");
    }
}
