//! Server-sent-event decoding for the token stream

use serde::Deserialize;
use tracing::{debug, warn};

const DATA_FIELD: &str = "data:";

/// One `data:` payload from the generation stream
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    token: Option<StreamToken>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamToken {
    text: String,
}

/// Classification of a single stream line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Token(String),
    /// Blank lines, comments, non-data fields, events without a token
    Ignored,
    /// A data line whose payload could not be decoded
    Malformed,
}

/// Decode one line of the event stream. Malformed payloads are logged and
/// reported, never raised.
pub fn decode_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(DATA_FIELD) else {
        return SseLine::Ignored;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(StreamEvent { token: Some(token), .. }) => SseLine::Token(token.text),
        Ok(StreamEvent { error: Some(message), .. }) => {
            warn!("Inference server reported an error event: {}", message);
            SseLine::Ignored
        }
        Ok(_) => {
            debug!("Stream event without token: {}", payload);
            SseLine::Ignored
        }
        Err(e) => {
            warn!("Failed to decode token: {}", e);
            SseLine::Malformed
        }
    }
}

/// Reassembles lines from arbitrarily split byte chunks.
///
/// Bytes are buffered until a `\n` arrives, so a multi-byte character or a
/// line split across chunks is decoded only once complete.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_utf8(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Trailing line left without a terminating newline, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode_utf8(&raw))
    }
}

fn decode_utf8(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_token_line() {
        let line = r#"data: {"token": {"id": 1, "text": " blue", "logprob": -0.1, "special": false}, "generated_text": null}"#;
        assert_eq!(decode_line(line), SseLine::Token(" blue".to_string()));
    }

    #[test]
    fn test_decode_without_space_after_field() {
        assert_eq!(
            decode_line(r#"data:{"token":{"text":"x"}}"#),
            SseLine::Token("x".to_string())
        );
    }

    #[test]
    fn test_decode_ignores_non_data_lines() {
        assert_eq!(decode_line(""), SseLine::Ignored);
        assert_eq!(decode_line(": keep-alive"), SseLine::Ignored);
        assert_eq!(decode_line("event: message"), SseLine::Ignored);
        assert_eq!(decode_line(r#"data: {"generated_text": "done"}"#), SseLine::Ignored);
        assert_eq!(decode_line(r#"data: {"error": "overloaded", "error_type": "generation"}"#), SseLine::Ignored);
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(decode_line("data: {not json"), SseLine::Malformed);
        assert_eq!(decode_line(r#"data: {"token": {"id": 3}}"#), SseLine::Malformed);
    }

    #[test]
    fn test_malformed_line_does_not_break_assembly() {
        let lines = [
            r#"data: {"token": {"text": "The"}}"#,
            r#"data: {"token": {"text": " sky"#,
            r#"data: {"token": {"text": " is"}}"#,
            r#"data: {"token": {"text": " blue"}}"#,
        ];
        let assembled: String = lines
            .iter()
            .filter_map(|l| match decode_line(l) {
                SseLine::Token(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(assembled, "The is blue");
    }

    #[test]
    fn test_line_buffer_reassembles_split_chunks() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: {\"tok").is_empty());
        let lines = buf.push(b"en\"}\r\n\ndata: x");
        assert_eq!(lines, vec!["data: {\"token\"}".to_string(), String::new()]);
        assert_eq!(buf.finish(), Some("data: x".to_string()));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_buffer_split_multibyte_char() {
        let bytes = "data: é\n".as_bytes();
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..7]).is_empty());
        assert_eq!(buf.push(&bytes[7..]), vec!["data: é".to_string()]);
    }
}
