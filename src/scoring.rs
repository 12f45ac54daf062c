//! Term-overlap scoring for documents

use crate::types::{Document, ScoredDocument};
use std::sync::Arc;

/// Split a query into lower-cased whitespace terms.
///
/// No stemming and no stopword removal; repeated terms are kept.
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Number of query terms found anywhere in the document text.
///
/// Matching is plain substring search over the lower-cased text, so `cat`
/// also hits `category`. Each query term contributes at most once
/// regardless of how often it appears in the document.
pub fn score_document(terms: &[String], text: &str) -> usize {
    if terms.is_empty() {
        return 0;
    }
    let haystack = text.to_lowercase();
    terms.iter().filter(|term| haystack.contains(term.as_str())).count()
}

/// Score every document and order by score descending.
///
/// The sort is stable: equal scores keep store order.
pub fn rank_documents(terms: &[String], documents: &[Arc<Document>]) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = documents
        .iter()
        .map(|doc| ScoredDocument {
            document: Arc::clone(doc),
            score: score_document(terms, &doc.text),
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
