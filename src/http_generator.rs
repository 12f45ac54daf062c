//! Streaming generation client for a text-generation-inference server

use crate::error::GenerationError;
use crate::generators::TextGenerator;
use crate::sse::{decode_line, LineBuffer, SseLine};
use crate::types::*;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const STREAM_PATH: &str = "/generate_stream";
const PROBE_MESSAGE: &str = "Hello, are you working?";

/// Request body for the streaming endpoint
#[derive(Debug, Serialize)]
struct StreamRequest<'a> {
    inputs: &'a str,
    parameters: StreamParameters,
}

#[derive(Debug, Serialize)]
struct StreamParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    do_sample: bool,
    repetition_penalty: f32,
}

impl From<&GenerationParams> for StreamParameters {
    fn from(params: &GenerationParams) -> Self {
        Self {
            max_new_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            do_sample: true,
            repetition_penalty: params.repetition_penalty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    /// Bound on the whole call: connect, status and body streaming
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Tokens received so far plus the error that ended the stream, if any
struct StreamOutcome {
    text: String,
    tokens: usize,
    failure: Option<GenerationError>,
}

/// HTTP generator speaking the TGI `generate_stream` protocol
pub struct TgiGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

impl TgiGenerator {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_config(GeneratorConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GenerationError::Client)?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), STREAM_PATH)
    }

    /// Check that the server answers a short prompt
    pub async fn probe(&self) -> bool {
        let params = GenerationParams {
            max_tokens: 20,
            ..Default::default()
        };
        match self.generate(&[Message::user(PROBE_MESSAGE)], &params).await {
            Generation::Complete(text) | Generation::Partial(text) => !text.trim().is_empty(),
            Generation::NoResult => false,
        }
    }

    /// One request, one pass over the stream. No retries.
    async fn stream_tokens(&self, prompt: &str, params: &GenerationParams) -> Result<StreamOutcome, GenerationError> {
        let body = StreamRequest {
            inputs: prompt,
            parameters: params.into(),
        };

        debug!(
            "Sending request to LLM with payload: {}",
            serde_json::to_string(&body).unwrap_or_default()
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from_send)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let mut chunks = response.bytes_stream();
        let mut lines = LineBuffer::new();
        let mut outcome = StreamOutcome {
            text: String::new(),
            tokens: 0,
            failure: None,
        };

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for line in lines.push(&bytes) {
                        outcome.append(decode_line(&line));
                    }
                }
                Err(e) => {
                    outcome.failure = Some(if e.is_timeout() {
                        GenerationError::Timeout
                    } else {
                        GenerationError::Stream(e)
                    });
                    return Ok(outcome);
                }
            }
        }

        if let Some(line) = lines.finish() {
            outcome.append(decode_line(&line));
        }

        Ok(outcome)
    }
}

impl StreamOutcome {
    fn append(&mut self, line: SseLine) {
        if let SseLine::Token(text) = line {
            self.text.push_str(&text);
            self.tokens += 1;
        }
    }
}

impl Generation {
    /// Error-to-result mapping for the generation boundary
    pub fn from_error(err: GenerationError, partial: String) -> Self {
        match &err {
            GenerationError::Status { status, body } => {
                error!("Error from LLM server (status {}): {}", status, body);
            }
            GenerationError::Timeout => error!("Request to LLM timed out"),
            other => error!("{}", other),
        }

        if partial.is_empty() {
            Generation::NoResult
        } else {
            warn!("Returning partial response ({} chars) after stream failure", partial.len());
            Generation::Partial(partial)
        }
    }
}

/// Flatten chat messages into a single completion prompt
pub fn build_prompt(messages: &[Message]) -> String {
    let mut prompt = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push('\n');
    prompt.push_str(Role::Assistant.label());
    prompt.push(':');
    prompt
}

#[async_trait]
impl TextGenerator for TgiGenerator {
    fn name(&self) -> &'static str {
        "tgi_stream"
    }

    async fn generate(&self, messages: &[Message], params: &GenerationParams) -> Generation {
        let prompt = build_prompt(messages);

        match self.stream_tokens(&prompt, params).await {
            Ok(StreamOutcome { text, tokens, failure: None }) => {
                info!("Generation complete: {} tokens, {} chars", tokens, text.len());
                Generation::Complete(text)
            }
            Ok(StreamOutcome { text, failure: Some(err), .. }) => Generation::from_error(err, text),
            Err(err) => Generation::from_error(err, String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt() {
        let messages = vec![Message::system("Be brief."), Message::user("Why is the sky blue?")];
        assert_eq!(
            build_prompt(&messages),
            "SYSTEM: Be brief.\nUSER: Why is the sky blue?\nASSISTANT:"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let params = GenerationParams {
            max_tokens: 42,
            temperature: 0.5,
            top_p: 0.9,
            repetition_penalty: 1.1,
        };
        let body = StreamRequest {
            inputs: "USER: hi\nASSISTANT:",
            parameters: (&params).into(),
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["inputs"], "USER: hi\nASSISTANT:");
        assert_eq!(value["parameters"]["max_new_tokens"], 42);
        assert_eq!(value["parameters"]["do_sample"], true);
        assert_eq!(value["parameters"]["temperature"], 0.5);
        assert!(value["parameters"].get("repetition_penalty").is_some());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let gen = TgiGenerator::new("http://localhost:8080/").unwrap();
        assert_eq!(gen.endpoint(), "http://localhost:8080/generate_stream");
    }

    #[test]
    fn test_from_error_partial_vs_none() {
        assert_eq!(
            Generation::from_error(GenerationError::Timeout, String::new()),
            Generation::NoResult
        );
        assert_eq!(
            Generation::from_error(GenerationError::Timeout, "The sky".into()),
            Generation::Partial("The sky".into())
        );
    }
}
