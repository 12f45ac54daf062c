//! Top-k selection with store-order fallback

use crate::types::{Document, ScoredDocument};
use std::sync::Arc;

/// Documents chosen for a query's context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub documents: Vec<ScoredDocument>,
    pub fallback: bool,
}

/// Pick up to `top_k` ranked documents with a positive score.
///
/// When nothing scores above zero, the first `top_k` documents of the store
/// are returned instead, each with score 0, and the selection is flagged as
/// a fallback.
pub fn select_top_k(ranked: Vec<ScoredDocument>, store: &[Arc<Document>], top_k: usize) -> Selection {
    let matched: Vec<ScoredDocument> = ranked
        .into_iter()
        .filter(|s| s.score > 0)
        .take(top_k)
        .collect();

    if !matched.is_empty() {
        return Selection {
            documents: matched,
            fallback: false,
        };
    }

    tracing::debug!("No document matched; falling back to first {} in store order", top_k);

    Selection {
        documents: store
            .iter()
            .take(top_k)
            .map(|doc| ScoredDocument {
                document: Arc::clone(doc),
                score: 0,
            })
            .collect(),
        fallback: true,
    }
}
