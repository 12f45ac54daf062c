//! Lexical retriever: scores the store against a query and formats the
//! selected documents into a bounded, cited context block

use crate::error::RetrievalError;
use crate::scoring::{rank_documents, tokenize_query};
use crate::selection::select_top_k;
use crate::types::{ContextResult, Document, ScoredDocument};
use std::sync::Arc;
use tracing::{debug, error};

pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub top_k: usize,
    /// Characters of each document copied into the context
    pub max_doc_chars: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_doc_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexicalRetriever {
    config: RetrieverConfig,
}

impl LexicalRetriever {
    pub fn new(config: RetrieverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Build the context for `query` from the full document snapshot.
    ///
    /// Never fails: any internal fault yields an empty context.
    pub fn score_and_select(&self, query: &str, documents: &[Arc<Document>]) -> ContextResult {
        match self.try_score_and_select(query, documents) {
            Ok(result) => result,
            Err(e) => ContextResult::from_error(e),
        }
    }

    fn try_score_and_select(
        &self,
        query: &str,
        documents: &[Arc<Document>],
    ) -> Result<ContextResult, RetrievalError> {
        let terms = tokenize_query(query);
        let ranked = rank_documents(&terms, documents);
        let selection = select_top_k(ranked, documents, self.config.top_k);

        let blocks = selection
            .documents
            .iter()
            .enumerate()
            .map(|(index, scored)| self.format_block(index, scored))
            .collect::<Result<Vec<_>, _>>()?;

        let context_text = render_instructions(&blocks.join(DOCUMENT_SEPARATOR));
        let prompt_token_estimate = context_text.split_whitespace().count();

        debug!(
            "Context built: {} documents, ~{} tokens, fallback={}",
            selection.documents.len(),
            prompt_token_estimate,
            selection.fallback
        );

        Ok(ContextResult {
            context_text,
            matched_documents: selection.documents,
            prompt_token_estimate,
            fallback: selection.fallback,
        })
    }

    fn format_block(&self, index: usize, scored: &ScoredDocument) -> Result<String, RetrievalError> {
        let metadata = &scored.document.metadata;
        if metadata.source.as_os_str().is_empty() {
            return Err(RetrievalError::MalformedDocument {
                index,
                reason: "missing source path".to_string(),
            });
        }

        Ok(format!(
            "Source: {}\nRelevance Score: {}\nContent: {}",
            metadata.source.display(),
            scored.score,
            truncate_chars(&scored.document.text, self.config.max_doc_chars)
        ))
    }
}

impl ContextResult {
    /// Error-to-result mapping for the retrieval boundary
    pub fn from_error(err: RetrievalError) -> Self {
        error!("Error building context: {}", err);
        ContextResult::empty()
    }
}

/// First `max_chars` characters, cut without regard to word boundaries
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn render_instructions(context: &str) -> String {
    format!(
        "You are a helpful assistant. Use the following context to answer the user's question.\n\
         If you cannot find relevant information in the context, use your general knowledge to provide a helpful response.\n\
         \n\
         Context:\n\
         {}\n\
         \n\
         Answer the question based on the above context and your knowledge. If using information from the context,\n\
         cite the source in your response.",
        context
    )
}
