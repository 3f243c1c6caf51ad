use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};
use tracing::{info, warn};

use crate::error::AppError;

/// Immutable span of corpus text together with the label of the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusChunk {
    pub id: String,
    pub source: String,
    pub text: String,
}

impl CorpusChunk {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        let text = text.into();
        Self {
            id: chunk_digest(&source, &text),
            source,
            text,
        }
    }
}

/// Stable identifier for a chunk, so persisted vectors can be matched back to their text.
fn chunk_digest(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(16)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Character-window settings used when splitting documents into chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Loads every `.txt` and `.md` file directly inside `data_dir` and splits it into chunks.
///
/// Files are visited in name order so the resulting corpus order is stable across restarts.
/// A missing directory yields an empty corpus; unreadable files are skipped with a warning.
pub async fn load_corpus(
    data_dir: &Path,
    options: ChunkingOptions,
) -> Result<Vec<CorpusChunk>, AppError> {
    if !tokio::fs::try_exists(data_dir).await? {
        warn!(dir = %data_dir.display(), "Corpus directory does not exist; starting with an empty corpus");
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(data_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && document_kind(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();

    let mut chunks = Vec::new();
    for path in files {
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Skipping unreadable corpus file");
                continue;
            }
        };
        let source = path.display().to_string();
        let pieces = split_document(&path, &text, options)?;
        chunks.extend(pieces.into_iter().map(|piece| CorpusChunk::new(&source, piece)));
    }

    info!(
        dir = %data_dir.display(),
        chunks = chunks.len(),
        "Loaded knowledge corpus"
    );

    Ok(chunks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Markdown,
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("txt") => Some(DocumentKind::Text),
        Some("md" | "markdown") => Some(DocumentKind::Markdown),
        _ => None,
    }
}

fn split_document(
    path: &Path,
    text: &str,
    options: ChunkingOptions,
) -> Result<Vec<String>, AppError> {
    if options.chunk_size == 0 {
        return Err(AppError::Validation("chunk_size must be greater than zero".into()));
    }

    let config = ChunkConfig::new(options.chunk_size)
        .with_overlap(options.chunk_overlap)
        .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;

    let pieces: Vec<String> = match document_kind(path) {
        Some(DocumentKind::Markdown) => MarkdownSplitter::new(config)
            .chunks(text)
            .map(str::to_owned)
            .collect(),
        _ => TextSplitter::new(config)
            .chunks(text)
            .map(str::to_owned)
            .collect(),
    };

    Ok(pieces
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .collect())
}
