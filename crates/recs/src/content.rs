//! Content Similarity Engine
//!
//! Dense cosine similarity over product text embeddings. The embedding
//! model lives behind the [`EmbeddingProvider`] trait so the engine can
//! ask whether the collaborator is available instead of probing
//! sentinel values; an unavailable provider degrades the run to
//! collaborative-only scoring.

use std::collections::HashMap;

use anyhow::Context;
use ndarray::{Array2, Axis};
use serde::Deserialize;
use tracing::error;

use shopmind_core::error::Result;
use shopmind_core::models::ProductFeatures;

use crate::collaborative::{rank_neighbors, NeighborMap};

/// Fixed noise floor for content similarity. Unlike the collaborative
/// cosine threshold this is not a tunable parameter: it only strips
/// numerically-zero pairs, so cold items always keep their content
/// neighbors.
pub const NOISE_THRESHOLD: f32 = 1e-6;

/// Embedding model collaborator.
pub trait EmbeddingProvider: Send + Sync {
    /// Whether the provider can serve embeddings right now.
    fn is_ready(&self) -> bool;

    /// Embed one vector per input text, row-aligned with the input.
    fn embed(&self, texts: &[String]) -> Result<Array2<f32>>;
}

/// Product embeddings for one run. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProductEmbeddings {
    pub product_ids: Vec<i64>,
    pub vectors: Array2<f32>,
}

/// Embed the feature text of every product.
///
/// Returns `Ok(None)` when the provider reports itself unavailable;
/// the caller continues without content similarity.
pub fn embed_products(
    provider: &dyn EmbeddingProvider,
    features: &[ProductFeatures],
) -> Result<Option<ProductEmbeddings>> {
    if !provider.is_ready() {
        error!("embedding provider unavailable, content similarity will be skipped");
        return Ok(None);
    }
    if features.is_empty() {
        return Ok(None);
    }
    let texts: Vec<String> = features.iter().map(|f| f.features_text.clone()).collect();
    let vectors = provider.embed(&texts)?;
    Ok(Some(ProductEmbeddings {
        product_ids: features.iter().map(|f| f.product_id).collect(),
        vectors,
    }))
}

/// Full pairwise cosine matrix over product embeddings.
///
/// Computed once per run; per-trial neighbor lists with different
/// `top_k` / noise thresholds are derived from it without re-embedding.
#[derive(Debug, Clone)]
pub struct ContentSimilarityMatrix {
    product_ids: Vec<i64>,
    sims: Array2<f32>,
}

impl ContentSimilarityMatrix {
    pub fn compute(embeddings: &ProductEmbeddings) -> Self {
        let mut normed = embeddings.vectors.clone();
        for mut row in normed.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }
        let sims = normed.dot(&normed.t());
        Self {
            product_ids: embeddings.product_ids.clone(),
            sims,
        }
    }

    /// Derive ranked neighbor lists for one trial. Self-similarity is
    /// excluded; similarities at or below `noise_threshold` are
    /// dropped as noise.
    pub fn top_k_neighbors(&self, top_k: usize, noise_threshold: f32) -> NeighborMap {
        let n = self.product_ids.len();
        let mut map = NeighborMap::with_capacity(n);
        for i in 0..n {
            let mut neighbors: Vec<(i64, f32)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (self.product_ids[j], self.sims[[i, j]]))
                .filter(|&(_, sim)| sim > noise_threshold)
                .collect();
            rank_neighbors(&mut neighbors, top_k);
            map.insert(self.product_ids[i], neighbors);
        }
        map
    }
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider backed by an HTTP embedding service.
///
/// Blocking client: embedding happens once per run before the async
/// pipeline stages, wrapped in `spawn_blocking` by the caller.
pub struct HttpEmbeddingProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint,
        }
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn is_ready(&self) -> bool {
        self.client
            .get(format!("{}/health", self.endpoint))
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    fn embed(&self, texts: &[String]) -> Result<Array2<f32>> {
        let response: EmbedResponse = self
            .client
            .post(format!("{}/embed", self.endpoint))
            .json(&serde_json::json!({ "texts": texts }))
            .send()
            .and_then(|resp| resp.error_for_status())
            .context("embedding service request failed")
            .map_err(shopmind_core::ShopmindError::from)?
            .json()
            .context("embedding service returned malformed payload")
            .map_err(shopmind_core::ShopmindError::from)?;

        let rows = response.embeddings.len();
        let cols = response.embeddings.first().map_or(0, Vec::len);
        let flat: Vec<f32> = response.embeddings.into_iter().flatten().collect();
        Array2::from_shape_vec((rows, cols), flat)
            .context("embedding rows have inconsistent dimensions")
            .map_err(shopmind_core::ShopmindError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn embeddings() -> ProductEmbeddings {
        // Products 1 and 2 identical, product 3 orthogonal.
        ProductEmbeddings {
            product_ids: vec![1, 2, 3],
            vectors: array![[1.0, 0.0], [2.0, 0.0], [0.0, 1.0]],
        }
    }

    #[test]
    fn identical_texts_have_similarity_one() {
        let matrix = ContentSimilarityMatrix::compute(&embeddings());
        let map = matrix.top_k_neighbors(10, 0.0);
        let neighbors = &map[&1];
        assert_eq!(neighbors[0].0, 2);
        assert!((neighbors[0].1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn noise_threshold_drops_orthogonal_pairs() {
        let matrix = ContentSimilarityMatrix::compute(&embeddings());
        let map = matrix.top_k_neighbors(10, 0.1);
        assert!(map[&3].is_empty());
        assert_eq!(map[&1].len(), 1);
    }

    #[test]
    fn self_similarity_is_excluded() {
        let matrix = ContentSimilarityMatrix::compute(&embeddings());
        let map = matrix.top_k_neighbors(10, -1.0);
        for (item, neighbors) in &map {
            assert!(neighbors.iter().all(|(n, _)| n != item));
        }
    }

    struct OfflineProvider;

    impl EmbeddingProvider for OfflineProvider {
        fn is_ready(&self) -> bool {
            false
        }
        fn embed(&self, _texts: &[String]) -> Result<Array2<f32>> {
            unreachable!("embed must not be called when not ready")
        }
    }

    #[test]
    fn unavailable_provider_skips_embedding() {
        let features = vec![ProductFeatures {
            product_id: 1,
            features_text: "acme widget".to_string(),
        }];
        let result = embed_products(&OfflineProvider, &features).unwrap();
        assert!(result.is_none());
    }
}
