use common::corpus::CorpusChunk;

use crate::{
    scoring::{keyword_overlap, query_terms, sort_by_score_desc},
    RetrievalSource, RetrievedChunk,
};

/// Owns the retrievable chunks for the lifetime of the process and answers keyword searches.
///
/// This is the retrieval path that is always available: it is synchronous, touches no
/// network, and cannot fail.
#[derive(Debug, Default)]
pub struct CorpusStore {
    chunks: Vec<CorpusChunk>,
}

impl CorpusStore {
    pub fn new(chunks: Vec<CorpusChunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[CorpusChunk] {
        &self.chunks
    }

    pub fn get(&self, position: usize) -> Option<&CorpusChunk> {
        self.chunks.get(position)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Ranks chunks by how many distinct query terms they contain.
    ///
    /// Only chunks matching at least one term are returned; ties keep corpus order.
    pub fn search(&self, query: &str, k: usize) -> Vec<RetrievedChunk<'_>> {
        let terms = query_terms(query);
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(position, chunk)| {
                let hits = keyword_overlap(&terms, &chunk.text);
                (hits > 0).then_some((position, hits as f32))
            })
            .collect();

        sort_by_score_desc(&mut scored);

        scored
            .into_iter()
            .take(k)
            .filter_map(|(position, score)| {
                self.chunks.get(position).map(|chunk| RetrievedChunk {
                    chunk,
                    score,
                    source: RetrievalSource::Keyword,
                })
            })
            .collect()
    }
}
