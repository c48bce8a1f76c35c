//! Core data types for the iris classification service.
//!
//! These types form the wire data model: the classify request parameters
//! and the per-category results returned to clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters of a `classify` call.
///
/// Request-scoped: parsed from the RPC params, immutable once built, dropped
/// after the response is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyParams {
    /// Base64-encoded image bytes (opaque until decoded)
    pub image: String,

    /// Category name → ordered candidate label list.
    ///
    /// `BTreeMap` keeps category iteration deterministic; label order within
    /// a category is preserved and breaks score ties.
    pub labels: BTreeMap<String, Vec<String>>,
}

/// A candidate label with its probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    /// The candidate label text
    pub label: String,

    /// Softmax probability from 0.0 to 1.0
    pub score: f32,
}

impl LabelScore {
    /// Create a new label/score pair.
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// The classification outcome for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    /// Best-matching label (argmax over the category's distribution)
    pub label: String,

    /// Probability of the best-matching label
    pub score: f32,

    /// Labels with score > 0, sorted by score descending; equal scores keep
    /// their original label order. Includes the top label when non-zero.
    pub alternatives: Vec<LabelScore>,
}
