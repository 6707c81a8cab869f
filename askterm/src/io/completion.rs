//! Chat-completion backend: request construction and fragment streaming.
//!
//! The stream is consumed by blocking iteration. Each `next()` call may block
//! on the network until the next fragment or the end of the reply arrives.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::history::{ChatMessage, Role};
use crate::io::credentials::ApiConfig;
use crate::io::sse::{SseStreamParser, StreamEvent};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of the completion source during a turn.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid API key")]
    Unauthorized,

    #[error("invalid model name: {0}")]
    BadRequest(String),

    #[error("invalid base URL")]
    NotFound,

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl StreamError {
    /// True when the failure points at the configured credentials rather than
    /// the network or the provider.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            StreamError::Unauthorized | StreamError::BadRequest(_) | StreamError::NotFound
        )
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}

/// Finite, non-restartable sequence of reply fragments.
pub type FragmentStream<'a> = Box<dyn Iterator<Item = Result<String, StreamError>> + 'a>;

/// A service that turns a conversation into a streamed reply.
pub trait CompletionSource {
    fn stream<'a>(
        &'a self,
        api: &ApiConfig,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream<'a>, StreamError>;

    /// Cheap request used to validate credentials.
    fn ping(&self, api: &ApiConfig) -> Result<(), StreamError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: Client,
}

impl ChatCompletionsClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .context("build http client")?;
        Ok(Self { http })
    }

    fn send(&self, api: &ApiConfig, request: &ChatRequest<'_>) -> Result<Response, StreamError> {
        let response = self
            .http
            .post(endpoint(&api.base_url))
            .bearer_auth(&api.api_key)
            .json(request)
            .send()?;
        check_status(response)
    }
}

impl CompletionSource for ChatCompletionsClient {
    #[instrument(skip_all, fields(model = %api.model, messages = messages.len()))]
    fn stream<'a>(
        &'a self,
        api: &ApiConfig,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream<'a>, StreamError> {
        info!("requesting completion stream");
        let response = self.send(
            api,
            &ChatRequest {
                model: &api.model,
                messages,
                stream: true,
                max_tokens: None,
            },
        )?;
        Ok(Box::new(SseFragments::new(response)))
    }

    #[instrument(skip_all, fields(model = %api.model))]
    fn ping(&self, api: &ApiConfig) -> Result<(), StreamError> {
        let probe = [ChatMessage {
            role: Role::User,
            content: "ping".to_string(),
        }];
        self.send(
            api,
            &ChatRequest {
                model: &api.model,
                messages: &probe,
                stream: false,
                max_tokens: Some(1),
            },
        )?;
        debug!("credentials accepted");
        Ok(())
    }
}

fn endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn check_status(response: Response) -> Result<Response, StreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    warn!(status = status.as_u16(), "completion request rejected");
    Err(match status {
        StatusCode::UNAUTHORIZED => StreamError::Unauthorized,
        StatusCode::BAD_REQUEST => StreamError::BadRequest(body),
        StatusCode::NOT_FOUND => StreamError::NotFound,
        _ => StreamError::Status {
            code: status.as_u16(),
            body,
        },
    })
}

/// Adapts an SSE byte stream into reply fragments.
///
/// Ends at the first finish reason, the `[DONE]` sentinel, or end of input.
pub struct SseFragments<R> {
    reader: R,
    parser: SseStreamParser,
    pending: VecDeque<Result<String, StreamError>>,
    finished: bool,
}

impl<R: Read> SseFragments<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: SseStreamParser::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn absorb(&mut self, events: Vec<StreamEvent>) {
        for event in events {
            match event {
                StreamEvent::Delta {
                    content,
                    finish_reason,
                } => {
                    if !content.is_empty() {
                        self.pending.push_back(Ok(content));
                    }
                    if let Some(reason) = finish_reason {
                        if reason != "stop" {
                            warn!(reason = %reason, "completion ended early");
                        }
                        self.finished = true;
                    }
                }
                StreamEvent::Done => self.finished = true,
                StreamEvent::Error { message } => {
                    self.pending.push_back(Err(StreamError::Provider(message)));
                    self.finished = true;
                }
            }
            if self.finished {
                break;
            }
        }
    }
}

impl<R: Read> Iterator for SseFragments<R> {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.finished {
                return None;
            }
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    debug!("completion stream closed");
                    self.finished = true;
                }
                Ok(n) => {
                    let events = self.parser.feed(&buf[..n]);
                    self.absorb(events);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.finished = true;
                    return Some(Err(StreamError::Transport(err.to_string())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}, "finish_reason": null}]})
        )
    }

    fn collect(body: String) -> Vec<Result<String, String>> {
        SseFragments::new(Cursor::new(body.into_bytes()))
            .map(|item| item.map_err(|err| err.to_string()))
            .collect()
    }

    #[test]
    fn yields_fragments_until_stop() {
        let body = format!(
            "{}{}data: {}\n\n{}",
            frame("Hello "),
            frame("world"),
            serde_json::json!({"choices": [{"delta": {}, "finish_reason": "stop"}]}),
            frame("ignored"),
        );
        assert_eq!(
            collect(body),
            vec![Ok("Hello ".to_string()), Ok("world".to_string())]
        );
    }

    #[test]
    fn done_sentinel_ends_stream() {
        let body = format!("{}data: [DONE]\n\n{}", frame("a"), frame("b"));
        assert_eq!(collect(body), vec![Ok("a".to_string())]);
    }

    #[test]
    fn provider_error_surfaces_after_earlier_fragments() {
        let body = format!(
            "{}data: {}\n\n",
            frame("partial"),
            serde_json::json!({"error": {"message": "overloaded"}})
        );
        assert_eq!(
            collect(body),
            vec![
                Ok("partial".to_string()),
                Err("provider error: overloaded".to_string())
            ]
        );
    }

    #[test]
    fn end_of_input_without_stop_ends_stream() {
        assert_eq!(collect(frame("only")), vec![Ok("only".to_string())]);
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(
            endpoint("https://api.example.com/v1/"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn credential_errors_are_classified() {
        assert!(StreamError::Unauthorized.is_credential_error());
        assert!(StreamError::NotFound.is_credential_error());
        assert!(!StreamError::Transport("reset".to_string()).is_credential_error());
    }
}
