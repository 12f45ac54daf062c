//! Search orchestrator: retrieval, prompt assembly, generation, metrics

use crate::context_builder::LexicalRetriever;
use crate::generators::TextGenerator;
use crate::store::SharedDocumentStore;
use crate::tokenizer::Tokenizer;
use crate::types::*;
use anyhow::Result;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const APOLOGY: &str =
    "I apologize, but I was unable to generate a response. Please try rephrasing your question.";

const SYSTEM_PREAMBLE: &str = "You are a helpful AI assistant. Your task is to provide accurate \
     and relevant information based on the context provided. If the context \
     contains relevant information, use it in your response. If not, provide \
     a general response based on your knowledge.";

const DIRECT_PREAMBLE: &str =
    "You are a helpful assistant that provides accurate and relevant information based on the given context.";

/// Default sampling for searches
pub fn default_search_params() -> GenerationParams {
    GenerationParams {
        max_tokens: 1500,
        temperature: 0.0,
        top_p: 0.95,
        repetition_penalty: 1.0,
    }
}

/// Main search engine (thread-safe via Arc)
pub struct SearchEngine {
    store: SharedDocumentStore,
    retriever: LexicalRetriever,
    generator: Arc<dyn TextGenerator>,
    tokenizer: Arc<dyn Tokenizer>,
    params: GenerationParams,
}

pub type SharedSearchEngine = Arc<SearchEngine>;

impl SearchEngine {
    pub fn new(
        store: SharedDocumentStore,
        retriever: LexicalRetriever,
        generator: Arc<dyn TextGenerator>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        Self {
            store,
            retriever,
            generator,
            tokenizer,
            params: default_search_params(),
        }
    }

    /// Replace the default sampling parameters
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn store(&self) -> &SharedDocumentStore {
        &self.store
    }

    pub async fn search(&self, query: &str) -> SearchResult {
        self.search_with(query, &ParamOverrides::default()).await
    }

    /// Answer `query` from the document store.
    ///
    /// Never fails: errors and panics anywhere in the path come back as a
    /// result with `success == false`.
    pub async fn search_with(&self, query: &str, overrides: &ParamOverrides) -> SearchResult {
        let attempt = AssertUnwindSafe(self.try_search(query, overrides)).catch_unwind().await;

        match attempt {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Error in search: {:?}", e);
                SearchResult::failure(e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Search panicked: {}", message);
                SearchResult::failure(message)
            }
        }
    }

    async fn try_search(&self, query: &str, overrides: &ParamOverrides) -> Result<SearchResult> {
        if query.trim().is_empty() {
            anyhow::bail!("query is empty");
        }
        let start = Instant::now();

        let context = self.retriever.score_and_select(query, self.store.documents());
        if context.context_text.is_empty() {
            warn!("No context found for query");
        }
        debug!("Generated context: {}", preview(&context.context_text, 500));

        let messages = vec![
            Message::system(format!("{}\n\n{}", SYSTEM_PREAMBLE, context.context_text)),
            Message::user(query),
        ];
        let params = self.params.with_overrides(overrides);

        info!("Generating answer: query='{}', documents={}", query, context.matched_documents.len());

        let generation = self.generator.generate(&messages, &params).await;
        if generation.is_partial() {
            warn!("Answer built from a partial token stream");
        }

        let (response_text, success) = match generation.into_text() {
            Some(text) if !text.trim().is_empty() => (text.trim().to_string(), true),
            _ => {
                error!("LLM returned empty response");
                (APOLOGY.to_string(), false)
            }
        };

        let matched = context.matched_documents.len();
        let metrics = SearchMetrics {
            context_tokens: self.tokenizer.count(&context.context_text),
            response_tokens: self.tokenizer.count(&response_text),
            matched_documents: matched,
            total_context_length: context.context_text.chars().count(),
            query_length: query.chars().count(),
        };

        info!(
            "Search complete in {}ms: success={}, {} response tokens",
            start.elapsed().as_millis(),
            success,
            metrics.response_tokens
        );

        Ok(SearchResult {
            response_text,
            context_text: context.context_text,
            metrics,
            success,
            matched_document_count: matched,
            error: None,
        })
    }

    /// Answer without retrieval, for comparison with the augmented answer
    pub async fn direct(&self, query: &str, overrides: &ParamOverrides) -> Option<String> {
        let messages = vec![Message::system(DIRECT_PREAMBLE), Message::user(query)];
        let params = self.params.with_overrides(overrides);
        self.generator
            .generate_text(&messages, &params)
            .await
            .filter(|text| !text.trim().is_empty())
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    crate::context_builder::truncate_chars(text, max_chars)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::MockGenerator;
    use crate::store::DocumentStore;
    use crate::tokenizer::WhitespaceTokenizer;
    use async_trait::async_trait;

    fn sky_store() -> SharedDocumentStore {
        Arc::new(DocumentStore::new(vec![
            Document::new("The sky is blue", "a.md"),
            Document::new("Grass is green", "b.md"),
        ]))
    }

    fn engine(generator: Arc<dyn TextGenerator>) -> SearchEngine {
        SearchEngine::new(
            sky_store(),
            LexicalRetriever::default(),
            generator,
            Arc::new(WhitespaceTokenizer),
        )
    }

    #[tokio::test]
    async fn test_search_success() {
        let gen = Arc::new(MockGenerator::new(Generation::Complete("  The sky is blue [a.md]. ".into())));
        let result = engine(gen.clone()).search("sky blue").await;

        assert!(result.success);
        assert_eq!(result.response_text, "The sky is blue [a.md].");
        assert_eq!(result.matched_document_count, 1);
        assert!(result.context_text.contains("a.md"));
        assert!(result.context_text.contains("blue"));
        assert_eq!(result.metrics.matched_documents, 1);
        assert_eq!(result.metrics.query_length, 8);
        assert_eq!(result.metrics.response_tokens, 5);
        assert_eq!(result.metrics.total_context_length, result.context_text.chars().count());
        assert!(result.error.is_none());
        assert_eq!(gen.calls(), 1);
    }

    #[tokio::test]
    async fn test_messages_and_params() {
        let gen = Arc::new(MockGenerator::new(Generation::Complete("ok".into())));
        let overrides = ParamOverrides {
            max_tokens: Some(64),
            ..Default::default()
        };
        engine(gen.clone()).search_with("sky", &overrides).await;

        let (messages, params) = gen.last_request().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with(SYSTEM_PREAMBLE));
        assert!(messages[0].content.contains("Source: a.md"));
        assert_eq!(messages[1], Message::user("sky"));
        assert_eq!(params.max_tokens, 64);
        assert_eq!(params.temperature, 0.0);
    }

    #[tokio::test]
    async fn test_no_result_substitutes_apology() {
        let gen = Arc::new(MockGenerator::new(Generation::NoResult));
        let result = engine(gen.clone()).search("sky").await;

        assert!(!result.success);
        assert_eq!(result.response_text, APOLOGY);
        assert!(!result.context_text.is_empty());
        assert!(result.error.is_none());
        assert_eq!(gen.calls(), 1, "no internal retry");
    }

    #[tokio::test]
    async fn test_blank_generation_is_not_success() {
        let gen = Arc::new(MockGenerator::new(Generation::Complete("   ".into())));
        let result = engine(gen).search("sky").await;
        assert!(!result.success);
        assert_eq!(result.response_text, APOLOGY);
    }

    #[tokio::test]
    async fn test_partial_generation_counts_as_answer() {
        let gen = Arc::new(MockGenerator::new(Generation::Partial("The sky".into())));
        let result = engine(gen).search("sky").await;
        assert!(result.success);
        assert_eq!(result.response_text, "The sky");
    }

    struct PanickingGenerator;

    #[async_trait]
    impl TextGenerator for PanickingGenerator {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn generate(&self, _messages: &[Message], _params: &GenerationParams) -> Generation {
            panic!("backend exploded")
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_result() {
        let result = engine(Arc::new(PanickingGenerator)).search("sky").await;

        assert!(!result.success);
        assert_eq!(
            result.response_text,
            "An error occurred while processing your query: backend exploded"
        );
        assert_eq!(result.metrics, SearchMetrics::default());
        assert_eq!(result.matched_document_count, 0);
        assert!(result.context_text.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_is_failed_result() {
        let gen = Arc::new(MockGenerator::new(Generation::Complete("unused".into())));
        let result = engine(gen.clone()).search("   ").await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("query is empty"));
        assert_eq!(gen.calls(), 0);
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let gen = Arc::new(MockGenerator::new(Generation::Complete("Rayleigh scattering".into())));
        let answer = engine(gen.clone()).direct("why blue?", &ParamOverrides::default()).await;
        assert_eq!(answer.as_deref(), Some("Rayleigh scattering"));

        let (messages, _) = gen.last_request().unwrap();
        assert_eq!(messages[0].content, DIRECT_PREAMBLE);
    }
}
