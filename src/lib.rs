//! mdsearch - question answering over local markdown notes
//!
//! - Lexical retrieval: term-overlap scoring, stable top-k, cited context
//! - Streaming generation against a text-generation-inference server
//! - Failures reported as data, never raised past the public entry points

pub mod types;
pub mod error;
pub mod store;
pub mod ingest;
pub mod scoring;
pub mod selection;
pub mod context_builder;
pub mod sse;
pub mod generators;
pub mod http_generator;
pub mod tokenizer;
pub mod search_engine;
pub mod server;
pub mod config;
pub mod telemetry;

pub use types::*;
pub use error::{GenerationError, IngestError, RetrievalError};
pub use store::{DocumentStore, SharedDocumentStore};
pub use context_builder::{LexicalRetriever, RetrieverConfig};
pub use generators::{generate_once_stream, MockGenerator, TextGenerator};
pub use http_generator::{GeneratorConfig, TgiGenerator};
pub use tokenizer::{BpeTokenizer, Tokenizer, WhitespaceTokenizer};
pub use search_engine::{SearchEngine, SharedSearchEngine};
