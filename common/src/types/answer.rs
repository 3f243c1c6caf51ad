use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::error::AppError;

/// Script-level language tag reported alongside every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Gu,
}

impl Language {
    pub const fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Gu => "gu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Incoming question plus optional conversation metadata.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<Message>,
    /// Client supplied language override, passed to the model as a preference.
    #[serde(default)]
    pub language: Option<String>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            language: None,
        }
    }

    /// Rejects requests that carry nothing to answer.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.query.trim().is_empty() {
            return Err(AppError::Validation("query must not be empty".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Finalized response returned to the caller and optionally cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<String>,
    pub detected_language: Language,
}

impl Answer {
    /// Builds an answer, dropping repeated source labels while keeping first-seen order.
    pub fn new<I, S>(response: impl Into<String>, sources: I, detected_language: Language) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for source in sources {
            let source = source.into();
            if !unique.contains(&source) {
                unique.push(source);
            }
        }

        Self {
            response: response.into(),
            sources: unique,
            detected_language,
        }
    }
}
