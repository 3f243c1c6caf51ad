use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError,
    utils::{
        config::AppConfig,
        embedding::{Embedder, EmbedderFactory, EmbeddingProvider},
    },
};
use tracing::info;

use crate::backend::{openai_client, GenerationBackend, OpenAiGenerator};

const DEFAULT_HASHED_DIMENSION: usize = 384;

/// Builds generation backends from candidate identifiers.
pub trait GeneratorFactory: Send + Sync {
    fn build_generator(&self, candidate: &str) -> Result<Arc<dyn GenerationBackend>, AppError>;
}

/// Everything the answer service needs to construct its backends.
pub trait BackendFactory: EmbedderFactory + GeneratorFactory {
    fn embedders(&self) -> &dyn EmbedderFactory;
}

impl<T: EmbedderFactory + GeneratorFactory> BackendFactory for T {
    fn embedders(&self) -> &dyn EmbedderFactory {
        self
    }
}

/// Provider families a candidate identifier can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFamily {
    OpenAi,
    Google,
    FastEmbed,
    Hashed,
}

/// Splits `family:model` into its parts. A bare name is an OpenAI model.
pub fn parse_candidate(candidate: &str) -> Result<(BackendFamily, &str), AppError> {
    let candidate = candidate.trim();
    let (family, model) = match candidate.split_once(':') {
        Some((family, model)) => (family.trim(), model.trim()),
        None if candidate == "fastembed" || candidate == "hashed" => (candidate, ""),
        None => ("openai", candidate),
    };

    let family = match family.to_ascii_lowercase().as_str() {
        "openai" => BackendFamily::OpenAi,
        "google" | "gemini" => BackendFamily::Google,
        "fastembed" => BackendFamily::FastEmbed,
        "hashed" => BackendFamily::Hashed,
        other => {
            return Err(AppError::Validation(format!(
                "unknown backend family '{other}' in candidate '{candidate}'"
            )))
        }
    };

    if model.is_empty() && matches!(family, BackendFamily::OpenAi | BackendFamily::Google) {
        return Err(AppError::Validation(format!(
            "candidate '{candidate}' does not name a model"
        )));
    }

    Ok((family, model))
}

#[derive(Debug, Clone)]
struct Credential {
    api_key: String,
    api_base: String,
}

/// Resolves which provider families are usable from the configured credentials and
/// constructs backends for them.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    openai: Option<Credential>,
    google: Option<Credential>,
    embedding_dimensions: Option<u32>,
    temperature: f32,
}

impl ProviderCatalog {
    pub fn from_config(config: &AppConfig) -> Self {
        let openai = config.openai_credential().map(|key| Credential {
            api_key: key.to_owned(),
            api_base: config.openai_base_url.clone(),
        });
        let google = config.google_credential().map(|key| Credential {
            api_key: key.to_owned(),
            api_base: config.google_base_url.clone(),
        });

        info!(
            openai = openai.is_some(),
            google = google.is_some(),
            "Resolved provider credentials"
        );

        Self {
            openai,
            google,
            embedding_dimensions: config.embedding_dimensions,
            temperature: config.temperature,
        }
    }

    pub fn has_generation_credentials(&self) -> bool {
        self.openai.is_some() || self.google.is_some()
    }

    fn credential(&self, family: BackendFamily) -> Result<&Credential, AppError> {
        let (credential, label) = match family {
            BackendFamily::OpenAi => (self.openai.as_ref(), "openai"),
            BackendFamily::Google => (self.google.as_ref(), "google"),
            BackendFamily::FastEmbed | BackendFamily::Hashed => (None, "local"),
        };
        credential.ok_or_else(|| AppError::NotFound(format!("no usable {label} credential")))
    }
}

impl GeneratorFactory for ProviderCatalog {
    fn build_generator(&self, candidate: &str) -> Result<Arc<dyn GenerationBackend>, AppError> {
        let (family, model) = parse_candidate(candidate)?;
        match family {
            BackendFamily::OpenAi | BackendFamily::Google => {
                let credential = self.credential(family)?;
                Ok(Arc::new(OpenAiGenerator::new(
                    &credential.api_key,
                    &credential.api_base,
                    model,
                    self.temperature,
                )))
            }
            BackendFamily::FastEmbed | BackendFamily::Hashed => Err(AppError::Validation(format!(
                "'{candidate}' is an embedding backend, not a generation model"
            ))),
        }
    }
}

#[async_trait]
impl EmbedderFactory for ProviderCatalog {
    async fn build_embedder(&self, candidate: &str) -> Result<Arc<dyn Embedder>, AppError> {
        let (family, model) = parse_candidate(candidate)?;
        let provider = match family {
            BackendFamily::OpenAi | BackendFamily::Google => {
                let credential = self.credential(family)?;
                EmbeddingProvider::new_openai(
                    Arc::new(openai_client(&credential.api_key, &credential.api_base)),
                    model.to_owned(),
                    self.embedding_dimensions,
                )
            }
            BackendFamily::FastEmbed => {
                let model = (!model.is_empty()).then(|| model.to_owned());
                EmbeddingProvider::new_fastembed(model).await?
            }
            BackendFamily::Hashed => {
                let dimension = if model.is_empty() {
                    DEFAULT_HASHED_DIMENSION
                } else {
                    model.parse().map_err(|_| {
                        AppError::Validation(format!("invalid hashed dimension in '{candidate}'"))
                    })?
                };
                EmbeddingProvider::new_hashed(dimension)
            }
        };
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(openai: Option<&str>, google: Option<&str>) -> ProviderCatalog {
        ProviderCatalog::from_config(&AppConfig {
            openai_api_key: openai.map(str::to_owned),
            google_api_key: google.map(str::to_owned),
            ..AppConfig::default()
        })
    }

    #[test]
    fn test_parse_candidate_families() {
        assert_eq!(
            parse_candidate("google:gemini-2.0-flash").expect("parse"),
            (BackendFamily::Google, "gemini-2.0-flash")
        );
        assert_eq!(
            parse_candidate("gpt-4o-mini").expect("parse"),
            (BackendFamily::OpenAi, "gpt-4o-mini")
        );
        assert_eq!(parse_candidate("hashed").expect("parse"), (BackendFamily::Hashed, ""));
        assert_eq!(
            parse_candidate("fastembed:BAAI/bge-small-en-v1.5").expect("parse").0,
            BackendFamily::FastEmbed
        );
        assert!(parse_candidate("cohere:command").is_err());
        assert!(parse_candidate("openai:").is_err());
    }

    #[test]
    fn test_generators_require_a_usable_credential() {
        let catalog = catalog_with(None, Some("your_google_api_key_placeholder"));
        assert!(!catalog.has_generation_credentials());
        assert!(catalog.build_generator("google:gemini-2.0-flash").is_err());
        assert!(catalog.build_generator("openai:gpt-4o-mini").is_err());

        let catalog = catalog_with(Some("sk-test"), None);
        assert!(catalog.has_generation_credentials());
        assert!(catalog.build_generator("openai:gpt-4o-mini").is_ok());
        assert!(catalog.build_generator("google:gemini-2.0-flash").is_err());
        assert!(catalog.build_generator("hashed").is_err());
    }

    #[tokio::test]
    async fn test_hashed_embedder_needs_no_credential() {
        let catalog = catalog_with(None, None);
        let embedder = catalog.build_embedder("hashed:16").await.expect("hashed");
        assert_eq!(embedder.model_code(), "hashed:16");
        assert_eq!(embedder.embed("fees").await.expect("embed").len(), 16);

        assert!(catalog.build_embedder("hashed:many").await.is_err());
        assert!(catalog.build_embedder("openai:text-embedding-3-small").await.is_err());
    }
}
