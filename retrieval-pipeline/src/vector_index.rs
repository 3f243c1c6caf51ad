use std::{collections::HashMap, path::Path};

use common::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    corpus_store::CorpusStore,
    scoring::{cosine_similarity, sort_by_score_desc},
};

/// In-memory cosine-similarity index over corpus positions.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    model_code: String,
    entries: Vec<IndexedVector>,
}

#[derive(Debug, Clone)]
struct IndexedVector {
    position: usize,
    vector: Vec<f32>,
}

/// On-disk form of the index. Chunks are referenced by id, not position, so a snapshot
/// survives corpus reordering.
#[derive(Debug, Serialize, Deserialize)]
struct IndexSnapshot {
    model_code: String,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    chunk_id: String,
    vector: Vec<f32>,
}

impl VectorIndex {
    pub fn new(model_code: impl Into<String>) -> Self {
        Self {
            model_code: model_code.into(),
            entries: Vec::new(),
        }
    }

    pub fn model_code(&self) -> &str {
        &self.model_code
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, position: usize, vector: Vec<f32>) {
        self.entries.push(IndexedVector { position, vector });
    }

    /// Returns up to `k` `(position, similarity)` pairs with positive similarity, best first.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry.position, cosine_similarity(query, &entry.vector)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        sort_by_score_desc(&mut scored);
        scored.truncate(k);
        scored
    }

    /// Loads a previously persisted index built with `model_code`.
    ///
    /// Returns `Ok(None)` when no snapshot exists or it was built by a different model.
    /// Vectors whose chunk is no longer in the corpus are dropped.
    pub async fn load(
        path: &Path,
        model_code: &str,
        corpus: &CorpusStore,
    ) -> Result<Option<Self>, AppError> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(None);
        }

        let raw = tokio::fs::read(path).await?;
        let snapshot: IndexSnapshot = serde_json::from_slice(&raw)?;
        if snapshot.model_code != model_code {
            debug!(
                stored = %snapshot.model_code,
                requested = %model_code,
                "Ignoring vector index built by another model"
            );
            return Ok(None);
        }

        let positions: HashMap<&str, usize> = corpus
            .chunks()
            .iter()
            .enumerate()
            .map(|(position, chunk)| (chunk.id.as_str(), position))
            .collect();

        let mut index = Self::new(snapshot.model_code);
        for entry in snapshot.entries {
            if let Some(position) = positions.get(entry.chunk_id.as_str()) {
                index.insert(*position, entry.vector);
            }
        }

        Ok(Some(index))
    }

    pub async fn save(&self, path: &Path, corpus: &CorpusStore) -> Result<(), AppError> {
        let snapshot = IndexSnapshot {
            model_code: self.model_code.clone(),
            entries: self
                .entries
                .iter()
                .filter_map(|entry| {
                    corpus.get(entry.position).map(|chunk| SnapshotEntry {
                        chunk_id: chunk.id.clone(),
                        vector: entry.vector.clone(),
                    })
                })
                .collect(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, serde_json::to_vec(&snapshot)?).await?;
        Ok(())
    }
}
