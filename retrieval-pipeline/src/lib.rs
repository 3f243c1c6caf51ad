pub mod adapter;
pub mod corpus_store;
pub mod scoring;
pub mod vector_index;

use common::corpus::CorpusChunk;

pub use adapter::{AdapterState, EmbeddingRetrievalAdapter};
pub use corpus_store::CorpusStore;

/// Which retrieval path produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalSource {
    Vector,
    Keyword,
}

// A borrowed corpus chunk plus the score it was ranked by; results never own corpus text.
#[derive(Debug, Clone, Copy)]
pub struct RetrievedChunk<'a> {
    pub chunk: &'a CorpusChunk,
    pub score: f32,
    pub source: RetrievalSource,
}
