use std::{cmp::Ordering, collections::HashSet};

/// Splits text on whitespace, lower-cases each term and trims surrounding punctuation.
///
/// Interior punctuation is kept so terms like `b.tech` or `₹80,000/year` survive intact.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

/// Distinct query terms in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    terms(query).filter(|term| seen.insert(term.clone())).collect()
}

/// Number of distinct query terms that also appear among the text's terms.
pub fn keyword_overlap(query_terms: &[String], text: &str) -> usize {
    if query_terms.is_empty() {
        return 0;
    }
    let text_terms: HashSet<String> = terms(text).collect();
    query_terms
        .iter()
        .filter(|term| text_terms.contains(term.as_str()))
        .count()
}

pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Cosine similarity mapped to `[0, 1]`; mismatched or degenerate vectors score zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON || !dot.is_finite() {
        return 0.0;
    }
    clamp_unit(dot / denom)
}

/// Sorts `(position, score)` pairs by score, highest first; equal scores keep corpus order.
pub fn sort_by_score_desc(items: &mut [(usize, f32)]) {
    items.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}
