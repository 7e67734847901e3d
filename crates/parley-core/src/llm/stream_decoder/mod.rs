//! Decoder for completion API responses
//!
//! The API answers either with one JSON payload (buffered mode) or with a
//! line-oriented event stream (incremental mode). Incremental lines look like:
//!
//! ```text
//! data: {"generated_text": "Hel"}
//! event: ping
//! 2024-05-01 10:22:31.123456
//! data: {"generated_text": "lo"}
//! data: [DONE]
//! ```
//!
//! Only records carrying generated text or a function call produce events.
//! Heartbeats, blank lines and records without content are skipped.

mod line;

pub use line::LineDecoder;

use crate::error::{ParleyError, ParleyResult};
use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;

/// Literal token that ends an incremental response
pub const DONE_TOKEN: &str = "[DONE]";

static TIMESTAMP_HEARTBEAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6}$").expect("valid heartbeat regex")
});

/// One decoded piece of model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Generated text
    Text(String),
    /// A piece of a function call. Pieces of one call arrive in order and are
    /// concatenated by the consumer.
    FunctionCall {
        name: Option<String>,
        arguments: String,
    },
}

/// What a single incremental line amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Skip,
    Done,
    Events(Vec<StreamEvent>),
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    generated_text: Option<String>,
    #[serde(default)]
    function_call: Option<RecordFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct RecordFunctionCall {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<serde_json::Value>,
}

impl Record {
    fn into_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(text) = self.generated_text.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::Text(text));
        }
        if let Some(call) = self.function_call {
            let arguments = match call.arguments {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            events.push(StreamEvent::FunctionCall {
                name: call.name.filter(|n| !n.is_empty()),
                arguments,
            });
        }
        events
    }

    fn has_content(&self) -> bool {
        self.generated_text.is_some() || self.function_call.is_some()
    }
}

/// Classify and decode one line of an incremental response
pub fn decode_line(raw: &str) -> ParleyResult<LineOutcome> {
    let line = raw.trim_end_matches('\r');
    let line = match line.strip_prefix("data:") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    };
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Ok(LineOutcome::Skip);
    }
    if trimmed == DONE_TOKEN {
        return Ok(LineOutcome::Done);
    }
    if trimmed.starts_with("event:")
        || trimmed.starts_with("id:")
        || trimmed.starts_with("retry:")
        || trimmed.starts_with(':')
    {
        return Ok(LineOutcome::Skip);
    }
    if TIMESTAMP_HEARTBEAT.is_match(trimmed) {
        return Ok(LineOutcome::Skip);
    }

    match serde_json::from_str::<Record>(trimmed) {
        Ok(record) => Ok(LineOutcome::Events(record.into_events())),
        Err(e) if trimmed.contains("generated_text") => Err(ParleyError::decode_line(
            format!("malformed content record: {}", e),
            trimmed,
        )),
        Err(e) => {
            tracing::warn!("Skipping undecodable stream line ({}): {}", e, trimmed);
            Ok(LineOutcome::Skip)
        }
    }
}

/// Decode a complete buffered response payload
pub fn decode_buffered(payload: &str) -> ParleyResult<Vec<StreamEvent>> {
    let record: Record = serde_json::from_str(payload.trim())
        .map_err(|e| ParleyError::decode(format!("malformed response payload: {}", e)))?;
    if !record.has_content() {
        return Err(ParleyError::decode(
            "response payload has no generated_text field",
        ));
    }
    Ok(record.into_events())
}

/// Boxed stream of decoded events
pub type EventStream = Pin<Box<dyn Stream<Item = ParleyResult<StreamEvent>> + Send>>;

struct IncrementalState<S> {
    /// Released once the response is finished
    bytes: Option<Pin<Box<S>>>,
    decoder: LineDecoder,
    pending: VecDeque<ParleyResult<StreamEvent>>,
    finished: bool,
}

impl<S> IncrementalState<S> {
    fn absorb(&mut self, lines: Vec<String>) {
        for line in lines {
            match decode_line(&line) {
                Ok(LineOutcome::Skip) => {}
                Ok(LineOutcome::Done) => {
                    self.finished = true;
                    return;
                }
                Ok(LineOutcome::Events(events)) => self.pending.extend(events.into_iter().map(Ok)),
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Turn a raw byte stream into a lazy stream of events.
///
/// The byte stream is dropped as soon as the terminator arrives, an error is
/// yielded, or the returned stream itself is dropped.
pub fn decode_incremental<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ParleyError> + Send,
{
    let state = IncrementalState {
        bytes: Some(Box::pin(bytes)),
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                state.bytes = None;
            }
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            let Some(bytes) = state.bytes.as_mut() else {
                return None;
            };
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.feed(chunk.as_ref());
                    state.absorb(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    let rest = state.decoder.finish();
                    state.absorb(rest.into_iter().collect());
                    state.finished = true;
                }
            }
        }
    }))
}
