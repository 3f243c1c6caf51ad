use std::{path::Path, sync::Arc, time::Duration};

use common::{
    error::AppError,
    utils::embedding::{Embedder, EmbedderFactory},
};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{info, instrument, warn};

use crate::{corpus_store::CorpusStore, vector_index::VectorIndex, RetrievalSource, RetrievedChunk};

/// Text sent to each embedding candidate to check that it answers at all.
const PROBE_TEXT: &str = "test";

/// Number of chunks sent per embedding request while building the index.
const EMBED_BATCH_SIZE: usize = 64;

/// Outcome of adapter initialization, reported by the readiness surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterState {
    pub vector_backend_ready: bool,
    pub model: Option<String>,
    pub indexed_chunks: usize,
}

struct VectorBackend {
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
}

/// Vector-similarity retrieval that degrades to keyword search whenever embeddings are
/// unavailable, so an embedding outage lowers retrieval quality but never availability.
pub struct EmbeddingRetrievalAdapter {
    corpus: Arc<CorpusStore>,
    vector: Option<VectorBackend>,
}

impl EmbeddingRetrievalAdapter {
    /// Adapter that only ever uses keyword search.
    pub fn keyword_only(corpus: Arc<CorpusStore>) -> Self {
        Self {
            corpus,
            vector: None,
        }
    }

    /// Adopts the first embedding candidate that answers a probe and indexes the corpus with it.
    ///
    /// A snapshot at `index_path` built by the same model is reused instead of re-embedding.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn initialize(
        corpus: Arc<CorpusStore>,
        factory: &dyn EmbedderFactory,
        candidates: &[String],
        index_path: Option<&Path>,
    ) -> Self {
        let Some((candidate, embedder)) = probe_candidates(factory, candidates).await else {
            warn!("No embedding candidate responded; retrieval will use keyword search");
            return Self::keyword_only(corpus);
        };

        match build_index(&corpus, embedder.as_ref(), index_path).await {
            Ok(index) if !index.is_empty() => {
                info!(
                    %candidate,
                    indexed_chunks = index.len(),
                    "Vector retrieval ready"
                );
                Self {
                    corpus,
                    vector: Some(VectorBackend { embedder, index }),
                }
            }
            Ok(_) => {
                warn!(%candidate, "Corpus produced no vectors; retrieval will use keyword search");
                Self::keyword_only(corpus)
            }
            Err(err) => {
                warn!(
                    %candidate,
                    error = %err,
                    "Failed to build vector index; retrieval will use keyword search"
                );
                Self::keyword_only(corpus)
            }
        }
    }

    pub fn state(&self) -> AdapterState {
        match &self.vector {
            Some(backend) => AdapterState {
                vector_backend_ready: true,
                model: Some(backend.index.model_code().to_owned()),
                indexed_chunks: backend.index.len(),
            },
            None => AdapterState {
                vector_backend_ready: false,
                model: None,
                indexed_chunks: 0,
            },
        }
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    /// Returns the `k` most similar chunks, or keyword matches when vectors are unavailable.
    pub async fn search(&self, query: &str, k: usize) -> Vec<RetrievedChunk<'_>> {
        let Some(backend) = &self.vector else {
            return self.corpus.search(query, k);
        };

        match backend.embedder.embed(query).await {
            Ok(query_vector) => backend
                .index
                .nearest(&query_vector, k)
                .into_iter()
                .filter_map(|(position, score)| {
                    self.corpus.get(position).map(|chunk| RetrievedChunk {
                        chunk,
                        score,
                        source: RetrievalSource::Vector,
                    })
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "Query embedding failed; using keyword search");
                self.corpus.search(query, k)
            }
        }
    }
}

/// Tries candidates in preference order and stops at the first one whose probe succeeds.
pub async fn probe_candidates(
    factory: &dyn EmbedderFactory,
    candidates: &[String],
) -> Option<(String, Arc<dyn Embedder>)> {
    for candidate in candidates {
        let embedder = match factory.build_embedder(candidate).await {
            Ok(embedder) => embedder,
            Err(err) => {
                warn!(%candidate, error = %err, "Embedding candidate unavailable");
                continue;
            }
        };

        match embedder.embed(PROBE_TEXT).await {
            Ok(vector) if !vector.is_empty() => {
                info!(%candidate, dimension = vector.len(), "Embedding candidate adopted");
                return Some((candidate.clone(), embedder));
            }
            Ok(_) => warn!(%candidate, "Embedding probe returned an empty vector"),
            Err(err) => warn!(%candidate, error = %err, "Embedding probe failed"),
        }
    }
    None
}

async fn build_index(
    corpus: &CorpusStore,
    embedder: &dyn Embedder,
    index_path: Option<&Path>,
) -> Result<VectorIndex, AppError> {
    let model_code = embedder.model_code();

    if let Some(path) = index_path {
        match VectorIndex::load(path, &model_code, corpus).await {
            Ok(Some(index)) if !index.is_empty() => {
                info!(
                    path = %path.display(),
                    vectors = index.len(),
                    "Reusing persisted vector index"
                );
                return Ok(index);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Unreadable vector index; rebuilding");
            }
        }
    }

    info!(chunks = corpus.len(), model = %model_code, "Embedding corpus");
    let mut index = VectorIndex::new(model_code);
    for (batch_number, batch) in corpus.chunks().chunks(EMBED_BATCH_SIZE).enumerate() {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(3);

        let vectors = Retry::spawn(retry_strategy, || embedder.embed_batch(texts.clone())).await?;

        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "expected {} vectors, received {}",
                batch.len(),
                vectors.len()
            )));
        }

        let offset = batch_number.saturating_mul(EMBED_BATCH_SIZE);
        for (i, vector) in vectors.into_iter().enumerate() {
            index.insert(offset.saturating_add(i), vector);
        }
    }

    if let Some(path) = index_path {
        if let Err(err) = index.save(path, corpus).await {
            warn!(path = %path.display(), error = %err, "Failed to persist vector index");
        }
    }

    Ok(index)
}
