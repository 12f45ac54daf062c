//! Core type definitions for document search and generation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A loaded text document. Immutable once it enters the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: PathBuf,   // relative to the docs root
    pub filename: String,
    pub folder: String,    // name of the containing directory
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let filename = source
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = source
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source,
                filename,
                folder,
            },
        }
    }
}

/// Document paired with its lexical score for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredDocument {
    pub document: Arc<Document>,
    pub score: usize,
}

/// Retrieved and formatted context for one query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextResult {
    pub context_text: String,
    pub matched_documents: Vec<ScoredDocument>,
    pub prompt_token_estimate: usize,
    /// True when nothing matched and the store prefix was used instead.
    pub fallback: bool,
}

impl ContextResult {
    /// Empty context: "no signal", not a failure.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "SYSTEM",
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.95,
            repetition_penalty: 1.0,
        }
    }
}

impl GenerationParams {
    pub fn with_overrides(mut self, overrides: &ParamOverrides) -> Self {
        if let Some(v) = overrides.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = overrides.temperature {
            self.temperature = v;
        }
        if let Some(v) = overrides.top_p {
            self.top_p = v;
        }
        if let Some(v) = overrides.repetition_penalty {
            self.repetition_penalty = v;
        }
        self
    }
}

/// Caller-supplied parameter overrides; `None` keeps the engine default
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ParamOverrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub repetition_penalty: Option<f32>,
}

/// Outcome of one generation call.
///
/// `NoResult` means the server produced nothing usable (refused connection,
/// timeout, error status). `Complete(String::new())` is a successful but
/// empty generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Complete(String),
    /// Stream broke after some tokens arrived; holds what was received.
    Partial(String),
    NoResult,
}

impl Generation {
    pub fn text(&self) -> Option<&str> {
        match self {
            Generation::Complete(text) | Generation::Partial(text) => Some(text),
            Generation::NoResult => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Generation::Complete(text) | Generation::Partial(text) => Some(text),
            Generation::NoResult => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Generation::Partial(_))
    }
}

/// Derived numbers reported with every search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchMetrics {
    pub context_tokens: usize,
    pub response_tokens: usize,
    pub matched_documents: usize,
    pub total_context_length: usize,
    pub query_length: usize,
}

impl SearchMetrics {
    /// Name/value view, in display order
    pub fn entries(&self) -> [(&'static str, usize); 5] {
        [
            ("context_tokens", self.context_tokens),
            ("response_tokens", self.response_tokens),
            ("matched_documents", self.matched_documents),
            ("total_context_length", self.total_context_length),
            ("query_length", self.query_length),
        ]
    }
}

/// Final answer for one query, on both the success and failure paths
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub response_text: String,
    pub context_text: String,
    pub metrics: SearchMetrics,
    pub success: bool,
    pub matched_document_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    /// Error-to-result mapping for the search boundary
    pub fn failure(err: impl fmt::Display) -> Self {
        let message = err.to_string();
        Self {
            response_text: format!("An error occurred while processing your query: {}", message),
            context_text: String::new(),
            metrics: SearchMetrics::default(),
            success: false,
            matched_document_count: 0,
            error: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_metadata_from_path() {
        let doc = Document::new("body", "notes/rust/ownership.md");
        assert_eq!(doc.metadata.filename, "ownership.md");
        assert_eq!(doc.metadata.folder, "rust");

        let top = Document::new("body", "a.md");
        assert_eq!(top.metadata.folder, "");
    }

    #[test]
    fn test_overrides_only_replace_given_fields() {
        let params = GenerationParams::default().with_overrides(&ParamOverrides {
            max_tokens: Some(50),
            temperature: None,
            top_p: Some(0.5),
            repetition_penalty: None,
        });
        assert_eq!(params.max_tokens, 50);
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.top_p, 0.5);
        assert_eq!(params.repetition_penalty, 1.0);
    }

    #[test]
    fn test_no_result_is_not_empty_success() {
        assert_eq!(Generation::Complete(String::new()).text(), Some(""));
        assert_eq!(Generation::NoResult.text(), None);
        assert_ne!(Generation::Complete(String::new()), Generation::NoResult);
    }

    #[test]
    fn test_failure_result() {
        let result = SearchResult::failure("boom");
        assert!(!result.success);
        assert_eq!(result.response_text, "An error occurred while processing your query: boom");
        assert_eq!(result.metrics, SearchMetrics::default());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
