//! Incremental parser for chat-completion server-sent events.

use serde_json::Value;

/// One decoded event from the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A content delta, possibly empty, with the finish reason if the frame
    /// carried one.
    Delta {
        content: String,
        finish_reason: Option<String>,
    },
    /// `[DONE]` sentinel.
    Done,
    /// In-band provider error.
    Error { message: String },
}

/// Buffers raw bytes and yields complete events.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes and drain every complete event.
    ///
    /// Bytes are kept raw until a frame is complete, so multi-byte
    /// characters split across reads decode correctly.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some((end, sep_len)) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + sep_len).take(end).collect();
            let frame = String::from_utf8_lossy(&frame);
            if let Some(payload) = extract_data_payload(&frame) {
                if payload == "[DONE]" {
                    events.push(StreamEvent::Done);
                    continue;
                }
                if let Ok(value) = serde_json::from_str::<Value>(&payload)
                    && let Some(event) = map_event(&value)
                {
                    events.push(event);
                }
            }
        }

        events
    }

    /// Parse a complete SSE body in one shot.
    pub fn parse_frames(input: &str) -> Vec<StreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_event(value: &Value) -> Option<StreamEvent> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| error.to_string());
        return Some(StreamEvent::Error { message });
    }

    let choice = value.get("choices")?.get(0)?;
    let content = choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    Some(StreamEvent::Delta {
        content,
        finish_reason,
    })
}
