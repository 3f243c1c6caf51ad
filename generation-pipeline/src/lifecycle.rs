use std::{path::PathBuf, sync::Arc};

use common::{
    types::answer::{Answer, ChatRequest},
    utils::config::AppConfig,
};
use retrieval_pipeline::{CorpusStore, EmbeddingRetrievalAdapter};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    cache::normalize_query,
    canned::{greeting_reply, warming_up_answer},
    catalog::BackendFactory,
    config::AnswerTuning,
    model_pool::ModelPool,
    orchestrator::Orchestrator,
};

/// Startup inputs for the answer service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub embedding_models: Vec<String>,
    pub generation_models: Vec<String>,
    pub index_path: Option<PathBuf>,
    pub tuning: AnswerTuning,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            embedding_models: config.embedding_models.clone(),
            generation_models: config.generation_models.clone(),
            index_path: Some(config.vector_index_path()),
            tuning: AnswerTuning::from_config(config),
        }
    }
}

/// Snapshot of what the service is running with, as reported by the readiness probe.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub ready: bool,
    pub corpus_chunks: usize,
    pub vector_retrieval: bool,
    pub embedding_model: Option<String>,
    pub indexed_chunks: usize,
    pub generation_models: Vec<String>,
}

/// Owns the slow startup work and answers requests before, during and after it.
pub struct AnswerService {
    corpus: Arc<CorpusStore>,
    providers: Arc<dyn BackendFactory>,
    settings: ServiceSettings,
    orchestrator: OnceCell<Orchestrator>,
}

impl AnswerService {
    pub fn new(
        corpus: Arc<CorpusStore>,
        providers: Arc<dyn BackendFactory>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            corpus,
            providers,
            settings,
            orchestrator: OnceCell::new(),
        }
    }

    /// Probes embedding candidates, indexes the corpus and assembles the model pool.
    ///
    /// Runs at most once; concurrent callers wait for the same initialization.
    pub async fn initialize(&self) -> &Orchestrator {
        self.orchestrator
            .get_or_init(|| async {
                info!(
                    corpus_chunks = self.corpus.len(),
                    "Initializing answer service"
                );

                let retrieval = EmbeddingRetrievalAdapter::initialize(
                    Arc::clone(&self.corpus),
                    self.providers.embedders(),
                    &self.settings.embedding_models,
                    self.settings.index_path.as_deref(),
                )
                .await;
                if !retrieval.state().vector_backend_ready {
                    warn!("Retrieval unavailable; serving keyword matches only");
                }

                let pool = ModelPool::assemble(&self.settings.generation_models, |candidate| {
                    self.providers.build_generator(candidate)
                });
                if pool.is_empty() {
                    warn!("No generation model configured; answers will be extractive");
                }

                info!(
                    vector_retrieval = retrieval.state().vector_backend_ready,
                    generation_models = pool.len(),
                    "Answer service ready"
                );
                Orchestrator::new(retrieval, pool, self.settings.tuning.clone())
            })
            .await
    }

    pub fn is_ready(&self) -> bool {
        self.orchestrator.initialized()
    }

    /// Answers through the orchestrator, or with a warming-up notice until it exists.
    /// Greetings are answered either way.
    pub async fn answer(&self, request: &ChatRequest) -> Answer {
        match self.orchestrator.get() {
            Some(orchestrator) => orchestrator.answer(request).await,
            None => greeting_reply(&normalize_query(&request.query))
                .unwrap_or_else(warming_up_answer),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        let Some(orchestrator) = self.orchestrator.get() else {
            return ServiceStatus {
                ready: false,
                corpus_chunks: self.corpus.len(),
                vector_retrieval: false,
                embedding_model: None,
                indexed_chunks: 0,
                generation_models: Vec::new(),
            };
        };

        let retrieval = orchestrator.retrieval().state();
        ServiceStatus {
            ready: true,
            corpus_chunks: self.corpus.len(),
            vector_retrieval: retrieval.vector_backend_ready,
            embedding_model: retrieval.model,
            indexed_chunks: retrieval.indexed_chunks,
            generation_models: orchestrator.pool().names(),
        }
    }
}
