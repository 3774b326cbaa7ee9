//! Nearest-neighbor retrieval with oversampling.

use serde_json::{Map, Value};
use tracing::debug;

use crate::clients::{IndexQueryResult, VectorIndex};
use crate::error::{CareerError, Result};

/// Metadata stored alongside a vector in the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchMetadata(Map<String, Value>);

impl MatchMetadata {
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Numeric field; numeric strings are accepted, non-finite values are not.
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = match self.0.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Text field; numbers and booleans are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn estimated_min(&self) -> Option<f64> {
        self.number("estimated_min")
    }

    pub fn estimated_max(&self) -> Option<f64> {
        self.number("estimated_max")
    }

    pub fn salary_original(&self) -> Option<String> {
        self.text("salary_original")
    }

    pub fn experience_level(&self) -> Option<String> {
        self.text("experience_level")
    }

    pub fn skills(&self) -> Option<String> {
        self.text("skills")
    }
}

/// One neighbor returned by the index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    /// Lower is more similar.
    pub distance: f64,
    pub metadata: MatchMetadata,
}

/// Wraps a [`VectorIndex`] and applies the oversampling policy.
pub struct VectorRetriever<V> {
    index: V,
    oversample_factor: usize,
}

impl<V: VectorIndex> VectorRetriever<V> {
    pub fn new(index: V, oversample_factor: usize) -> Self {
        Self {
            index,
            oversample_factor: oversample_factor.max(1),
        }
    }

    /// Number of neighbors fetched for a request of `k`.
    pub const fn candidate_count(&self, k: usize) -> usize {
        k.saturating_mul(self.oversample_factor)
    }

    /// Fetch the oversampled neighbor list for `embedding`, best first.
    pub async fn retrieve(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        let n_results = self.candidate_count(k);
        let raw = self.index.query(embedding, n_results).await?;
        let matches = into_matches(raw)?;
        debug!(requested = n_results, returned = matches.len(), "retrieved candidates");
        Ok(matches)
    }
}

fn into_matches(raw: IndexQueryResult) -> Result<Vec<VectorMatch>> {
    let IndexQueryResult {
        ids,
        distances,
        metadatas,
    } = raw;

    if distances.len() != ids.len() {
        return Err(CareerError::VectorIndex(format!(
            "index returned {} ids but {} distances",
            ids.len(),
            distances.len()
        )));
    }
    if !metadatas.is_empty() && metadatas.len() != ids.len() {
        return Err(CareerError::VectorIndex(format!(
            "index returned {} ids but {} metadata entries",
            ids.len(),
            metadatas.len()
        )));
    }

    let mut metadatas = metadatas.into_iter();
    let mut matches = Vec::with_capacity(ids.len());
    for (id, distance) in ids.into_iter().zip(distances) {
        if !distance.is_finite() {
            return Err(CareerError::VectorIndex(format!(
                "non-finite distance for {id}"
            )));
        }
        let metadata = metadatas.next().flatten().map(MatchMetadata::new).unwrap_or_default();
        matches.push(VectorMatch {
            id,
            distance,
            metadata,
        });
    }

    // Stable: equal distances keep the index's order.
    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(matches)
}
