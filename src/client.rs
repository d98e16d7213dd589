use crate::config::Settings;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use tracing::{debug, trace};

/// Narrow interface to the remote text-completion service.
///
/// Implementations deliver the model's output as an ordered stream of
/// text fragments through `on_fragment`. The callback may block (file
/// appends do); the producer must not request more output until the
/// callback returns, so backpressure is implicit. Fragment ordering is
/// the implementation's responsibility to preserve.
pub trait CompletionClient {
    /// Streams a completion for `prompt`, invoking `on_fragment` for each
    /// fragment as it arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the stream is interrupted,
    /// or the callback itself fails. Fragments already delivered before
    /// the error stand.
    fn stream_completion(
        &self,
        prompt: &str,
        on_fragment: &mut dyn FnMut(&str) -> Result<()>,
    ) -> Result<()>;
}

/// Completion request body.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    stream: bool,
}

/// One server-sent chunk of a streamed completion.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

/// Choice within a streamed chunk.
#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    text: String,
}

/// One parsed server-sent event line.
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    /// A text fragment from the model
    Fragment(String),
    /// Normal end of generation
    Done,
}

/// Parses a single SSE line from the completions stream.
///
/// Returns `None` for blank lines and anything that is not a `data:`
/// payload (comments, event names).
fn parse_sse_line(line: &str) -> Result<Option<SseEvent>> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| Error::completion(format!("malformed stream chunk: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .map(|choice| SseEvent::Fragment(choice.text)))
}

/// Completion client backed by the OpenAI completions endpoint.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

impl OpenAiClient {
    /// Creates a client from the run settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            endpoint: settings.api_endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
        }
    }
}

impl CompletionClient for OpenAiClient {
    fn stream_completion(
        &self,
        prompt: &str,
        on_fragment: &mut dyn FnMut(&str) -> Result<()>,
    ) -> Result<()> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            stream: true,
        };

        debug!("Requesting completion ({} prompt bytes)", prompt.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::completion(format!(
                "completion endpoint returned {status}: {body}"
            )));
        }

        // The body is consumed line by line as it arrives; each fragment
        // is handed to the consumer before the next line is read.
        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line =
                line.map_err(|e| Error::completion(format!("stream read failed: {e}")))?;

            match parse_sse_line(&line)? {
                Some(SseEvent::Done) => break,
                Some(SseEvent::Fragment(text)) => {
                    if !text.is_empty() {
                        trace!("Received fragment ({} bytes)", text.len());
                        on_fragment(&text)?;
                    }
                }
                None => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_line() {
        let event = parse_sse_line(r#"data: {"choices":[{"text":"hello"}]}"#).unwrap();
        assert_eq!(event, Some(SseEvent::Fragment("hello".to_string())));
    }

    #[test]
    fn test_parse_done_line() {
        let event = parse_sse_line("data: [DONE]").unwrap();
        assert_eq!(event, Some(SseEvent::Done));
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_sse_line("event: ping").unwrap(), None);
    }

    #[test]
    fn test_chunk_without_choices_yields_nothing() {
        let event = parse_sse_line(r#"data: {"choices":[]}"#).unwrap();
        assert_eq!(event, None);
    }

    #[test]
    fn test_malformed_chunk_is_an_error() {
        let result = parse_sse_line("data: {not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_text_field_defaults_empty() {
        let event = parse_sse_line(r#"data: {"choices":[{"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(event, Some(SseEvent::Fragment(String::new())));
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo-instruct",
            prompt: "Explain .py code:",
            max_tokens: 1024,
            temperature: 0.2,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stream: true,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo-instruct");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["stream"], true);
    }
}
