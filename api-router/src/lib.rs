use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{chat::chat, liveness::live, readiness::ready};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes for k8s/systemd
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let chat_routes = Router::new()
        .route("/chat", post(chat))
        .route("/chat/", post(chat));

    probes.merge(chat_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use common::{
        corpus::CorpusChunk,
        error::AppError,
        utils::embedding::{Embedder, EmbedderFactory},
    };
    use generation_pipeline::{
        AnswerService, AnswerTuning, GenerationBackend, GeneratorFactory, ServiceSettings,
    };
    use retrieval_pipeline::CorpusStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// No credentials at all: keyword retrieval and extractive answers only.
    struct Offline;

    #[async_trait]
    impl EmbedderFactory for Offline {
        async fn build_embedder(&self, candidate: &str) -> Result<Arc<dyn Embedder>, AppError> {
            Err(AppError::NotFound(format!("no credential for {candidate}")))
        }
    }

    impl GeneratorFactory for Offline {
        fn build_generator(&self, candidate: &str) -> Result<Arc<dyn GenerationBackend>, AppError> {
            Err(AppError::NotFound(format!("no credential for {candidate}")))
        }
    }

    fn service() -> Arc<AnswerService> {
        let corpus = Arc::new(CorpusStore::new(vec![
            CorpusChunk::new("data/fees.txt", "B.Tech fees are ₹80,000/year."),
            CorpusChunk::new("data/hostel.txt", "Hostel curfew is 10 PM."),
        ]));
        let settings = ServiceSettings {
            embedding_models: vec!["openai:text-embedding-3-small".into()],
            generation_models: vec!["google:gemini-2.0-flash".into()],
            index_path: None,
            tuning: AnswerTuning::default(),
        };
        Arc::new(AnswerService::new(corpus, Arc::new(Offline), settings))
    }

    fn app(service: Arc<AnswerService>) -> Router {
        Router::new()
            .nest("/api/v1", api_routes_v1())
            .with_state(ApiState::new(service))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn test_probes_follow_initialization() {
        let service = service();
        let app = app(service.clone());

        let live = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/live").body(Body::empty()).expect("request"))
            .await
            .expect("live response");
        assert_eq!(live.status(), StatusCode::OK);

        let warming = app
            .clone()
            .oneshot(Request::builder().uri("/api/v1/ready").body(Body::empty()).expect("request"))
            .await
            .expect("ready response");
        assert_eq!(warming.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(warming).await["status"], "warming_up");

        service.initialize().await;

        let ready = app
            .oneshot(Request::builder().uri("/api/v1/ready").body(Body::empty()).expect("request"))
            .await
            .expect("ready response");
        assert_eq!(ready.status(), StatusCode::OK);
        let body = json_body(ready).await;
        assert_eq!(body["checks"]["vector_retrieval"], false);
        assert_eq!(body["checks"]["generation_models"], json!([]));
    }

    #[tokio::test]
    async fn test_chat_returns_answer_shape() {
        let service = service();
        service.initialize().await;

        let response = app(service)
            .oneshot(post_json("/api/v1/chat", &json!({ "query": "hostel curfew" })))
            .await
            .expect("chat response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["sources"], json!(["data/hostel.txt"]));
        assert_eq!(body["detected_language"], "en");
        assert!(body["response"].as_str().is_some_and(|text| text.contains("Hostel curfew")));
    }

    #[tokio::test]
    async fn test_chat_before_initialization_reports_warming_up() {
        let response = app(service())
            .oneshot(post_json("/api/v1/chat/", &json!({ "query": "What are the fees?" })))
            .await
            .expect("chat response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["sources"], json!([]));
        assert!(body["response"].as_str().is_some_and(|text| text.contains("warming up")));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let response = app(service())
            .oneshot(post_json("/api/v1/chat", &json!({ "query": "   " })))
            .await
            .expect("chat response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
