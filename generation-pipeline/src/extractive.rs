use common::corpus::CorpusChunk;
use retrieval_pipeline::{
    scoring::{keyword_overlap, query_terms},
    RetrievedChunk,
};

pub static DEGRADED_PREFIX: &str =
    "⚠️ Our AI assistant is busy right now, so here is the most relevant excerpt from our records:";

/// A degraded answer assembled from retrieved text alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub text: String,
    pub source: String,
}

/// Picks the chunk sharing the most distinct terms with the query; when nothing overlaps,
/// the top-ranked chunk. Ties go to the better-ranked chunk.
pub fn select_chunk<'a>(query: &str, chunks: &[RetrievedChunk<'a>]) -> Option<&'a CorpusChunk> {
    let terms = query_terms(query);
    let mut best: Option<(&'a CorpusChunk, usize)> = None;

    for retrieved in chunks {
        let overlap = keyword_overlap(&terms, &retrieved.chunk.text);
        if overlap > best.map_or(0, |(_, top)| top) {
            best = Some((retrieved.chunk, overlap));
        }
    }

    best.map(|(chunk, _)| chunk)
        .or_else(|| chunks.first().map(|retrieved| retrieved.chunk))
}

/// First `max_chars` characters of `text`, with an ellipsis when anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_owned(),
    }
}

pub fn extractive_answer(query: &str, chunks: &[RetrievedChunk<'_>], max_chars: usize) -> Option<Extract> {
    let chunk = select_chunk(query, chunks)?;
    Some(Extract {
        text: format!("{DEGRADED_PREFIX}\n\n{}", excerpt(&chunk.text, max_chars)),
        source: chunk.source.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval_pipeline::RetrievalSource;

    fn ranked<'a>(chunks: &'a [CorpusChunk]) -> Vec<RetrievedChunk<'a>> {
        chunks
            .iter()
            .map(|chunk| RetrievedChunk {
                chunk,
                score: 0.5,
                source: RetrievalSource::Vector,
            })
            .collect()
    }

    #[test]
    fn test_prefers_keyword_overlap_over_rank() {
        let chunks = vec![
            CorpusChunk::new("data/hostel.txt", "Hostel curfew is 10 PM."),
            CorpusChunk::new("data/fees.txt", "B.Tech fees are ₹80,000/year."),
        ];
        let selected = select_chunk("what are the fees", &ranked(&chunks)).expect("chunk");
        assert_eq!(selected.source, "data/fees.txt");
    }

    #[test]
    fn test_falls_back_to_top_ranked_chunk() {
        let chunks = vec![
            CorpusChunk::new("data/hostel.txt", "Hostel curfew is 10 PM."),
            CorpusChunk::new("data/fees.txt", "B.Tech fees are ₹80,000/year."),
        ];
        let selected = select_chunk("placement record", &ranked(&chunks)).expect("chunk");
        assert_eq!(selected.source, "data/hostel.txt");
        assert!(select_chunk("anything", &[]).is_none());
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundaries() {
        assert_eq!(excerpt("फीस ₹80,000 है", 3), "फीस…");
        assert_eq!(excerpt("short", 400), "short");
        assert_eq!(excerpt("  padded text  ", 6), "padded…");
    }

    #[test]
    fn test_extractive_answer_carries_prefix_and_single_source() {
        let chunks = vec![CorpusChunk::new("data/fees.txt", "B.Tech fees are ₹80,000/year.")];
        let extract = extractive_answer("fees", &ranked(&chunks), 400).expect("extract");
        assert!(extract.text.starts_with(DEGRADED_PREFIX));
        assert!(extract.text.ends_with("B.Tech fees are ₹80,000/year."));
        assert_eq!(extract.source, "data/fees.txt");
    }
}
