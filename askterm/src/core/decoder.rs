//! Stream decoding: display buffering and action payload isolation.
//!
//! A model reply arrives as a lazy sequence of text fragments. The decoder
//! batches fragments into display chunks and stops emitting chunks as soon as
//! an action start marker shows up, so the payload never reaches the
//! conversational transcript. Once the stream is exhausted the full raw text
//! is returned together with the first framed payload, if any.

/// Record separator; opens an action payload.
pub const ACTION_START: char = '\u{1e}';
/// Unit separator; closes an action payload.
pub const ACTION_END: char = '\u{1f}';

pub const DEFAULT_FRAGMENT_THRESHOLD: usize = 5;
pub const DEFAULT_CHAR_THRESHOLD: usize = 200;

/// Flush points for the [`OutputBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferThresholds {
    /// Flush after this many fragments.
    pub fragments: usize,
    /// Flush once the buffered text reaches this many characters.
    pub chars: usize,
}

impl Default for BufferThresholds {
    fn default() -> Self {
        Self {
            fragments: DEFAULT_FRAGMENT_THRESHOLD,
            chars: DEFAULT_CHAR_THRESHOLD,
        }
    }
}

/// Accumulates fragments until a threshold is met, then yields one chunk.
#[derive(Debug)]
pub struct OutputBuffer {
    thresholds: BufferThresholds,
    text: String,
    fragments: usize,
    chars: usize,
}

impl OutputBuffer {
    pub fn new(thresholds: BufferThresholds) -> Self {
        Self {
            thresholds,
            text: String::new(),
            fragments: 0,
            chars: 0,
        }
    }

    /// Buffer `fragment`; returns a chunk when either threshold is reached.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.append(fragment);
        if self.fragments >= self.thresholds.fragments || self.chars >= self.thresholds.chars {
            return self.take();
        }
        None
    }

    /// Drain whatever is buffered. Empty buffers yield nothing.
    pub fn take(&mut self) -> Option<String> {
        self.fragments = 0;
        self.chars = 0;
        if self.text.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.text))
    }

    fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
        self.chars += fragment.chars().count();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Display,
    Payload,
}

/// Everything the decoder learned from one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTurn {
    /// Complete reply text, markers included.
    pub raw: String,
    /// Trimmed text between the first start marker and the next end marker.
    pub payload: Option<String>,
}

/// Incremental decoder for a single turn.
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: OutputBuffer,
    state: DecoderState,
    raw: String,
}

impl StreamDecoder {
    pub fn new(thresholds: BufferThresholds) -> Self {
        Self {
            buffer: OutputBuffer::new(thresholds),
            state: DecoderState::Display,
            raw: String::new(),
        }
    }

    /// Feed one fragment; returns a chunk ready for display, if any.
    pub fn feed(&mut self, fragment: &str) -> Option<String> {
        self.raw.push_str(fragment);
        if self.state == DecoderState::Payload {
            return None;
        }

        match fragment.find(ACTION_START) {
            Some(idx) => {
                self.state = DecoderState::Payload;
                self.buffer.append(&fragment[..idx]);
                self.buffer.take()
            }
            None => self.buffer.push(fragment),
        }
    }

    /// Flush the remaining display text at stream end.
    pub fn flush(&mut self) -> Option<String> {
        if self.state == DecoderState::Payload {
            return None;
        }
        self.buffer.take()
    }

    /// Consume the decoder. Call [`StreamDecoder::flush`] first.
    pub fn finish(self) -> DecodedTurn {
        let payload = extract_action(&self.raw).map(str::to_string);
        DecodedTurn {
            raw: self.raw,
            payload,
        }
    }
}

/// Drain `fragments`, sending display chunks to `display` as they form.
///
/// The first error aborts decoding and is returned unchanged.
pub fn decode_stream<I, E, F>(
    fragments: I,
    thresholds: BufferThresholds,
    mut display: F,
) -> Result<DecodedTurn, E>
where
    I: IntoIterator<Item = Result<String, E>>,
    F: FnMut(&str),
{
    let mut decoder = StreamDecoder::new(thresholds);
    for fragment in fragments {
        let fragment = fragment?;
        if let Some(chunk) = decoder.feed(&fragment) {
            display(&chunk);
        }
    }
    if let Some(chunk) = decoder.flush() {
        display(&chunk);
    }
    Ok(decoder.finish())
}

/// Return the trimmed payload framed by the first start marker and the first
/// end marker after it. A start marker without an end marker yields `None`.
pub fn extract_action(raw: &str) -> Option<&str> {
    let start = raw.find(ACTION_START)?;
    let rest = &raw[start + ACTION_START.len_utf8()..];
    let end = rest.find(ACTION_END)?;
    Some(rest[..end].trim())
}
