//! Text generation backends

use crate::types::*;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Trait for pluggable text generators.
///
/// Implementations never return errors: every failure is folded into
/// [`Generation::NoResult`] or [`Generation::Partial`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, messages: &[Message], params: &GenerationParams) -> Generation;

    /// `None` when the backend produced no result
    async fn generate_text(&self, messages: &[Message], params: &GenerationParams) -> Option<String> {
        self.generate(messages, params).await.into_text()
    }
}

/// Run one full generation and expose it as a stream.
///
/// This is single-shot: the stream yields the whole response as one item
/// (or nothing on no result) once the generation has finished. It does not
/// deliver tokens as they arrive.
pub fn generate_once_stream<'a>(
    generator: &'a dyn TextGenerator,
    messages: &'a [Message],
    params: &'a GenerationParams,
) -> BoxStream<'a, String> {
    stream::once(async move { generator.generate_text(messages, params).await })
        .filter_map(|text| async move { text })
        .boxed()
}

/// Scripted generator for testing
pub struct MockGenerator {
    outcomes: Mutex<VecDeque<Generation>>,
    fallback: Generation,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<(Vec<Message>, GenerationParams)>>,
}

impl MockGenerator {
    /// Always answer with `outcome`
    pub fn new(outcome: Generation) -> Self {
        Self::scripted(vec![], outcome)
    }

    /// Answer with `outcomes` in order, then with `fallback`
    pub fn scripted(outcomes: Vec<Generation>, fallback: Generation) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(Vec<Message>, GenerationParams)> {
        self.last_prompt.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, messages: &[Message], params: &GenerationParams) -> Generation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some((messages.to_vec(), *params));
        }
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}
