//! SSE decoding for streaming gateway responses.
//!
//! The gateway answers with a `text/event-stream`-style body: blank lines,
//! `data: <JSON>` lines, and a final `data: [DONE]` terminator. Transport
//! chunk boundaries do not align with line boundaries, so the decoder keeps
//! any unterminated trailing line buffered and prepends it to the next
//! chunk before re-splitting; a line is never processed incomplete or
//! twice.
//!
//! Line splitting happens at the byte level. `\n` (0x0A) never occurs
//! inside a UTF-8 multi-byte sequence, so a character split across two
//! transport chunks is reassembled before text decoding.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use crate::ports::GatewayError;

/// Prefix of payload-bearing lines.
const DATA_PREFIX: &str = "data: ";

/// Sentinel payload marking the end of the completion.
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder from transport chunks to text deltas.
///
/// Feed raw chunks with [`SseDecoder::feed`]; call [`SseDecoder::finish`]
/// once the transport ends to flush an unterminated trailing line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Creates a decoder with an empty carry-over buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the termination sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consumes one transport chunk and returns the deltas decoded from
    /// the complete lines it closed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }

        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            let line = String::from_utf8_lossy(&line);
            self.process_line(&line, &mut deltas);
            if self.done {
                break;
            }
        }
        deltas
    }

    /// Flushes the trailing unterminated line, if any, at end of input.
    pub fn finish(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done || self.buffer.is_empty() {
            return deltas;
        }
        let line: Vec<u8> = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&line);
        self.process_line(&line, &mut deltas);
        deltas
    }

    fn process_line(&mut self, line: &str, deltas: &mut Vec<String>) {
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        let data = rest.trim();
        if data == DONE_SENTINEL {
            self.done = true;
            self.buffer.clear();
            return;
        }

        match serde_json::from_str::<StreamPayload>(data) {
            Ok(payload) => {
                let content = payload
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content);
                if let Some(content) = content {
                    if !content.is_empty() {
                        deltas.push(content);
                    }
                }
            }
            Err(err) => {
                // A single bad line never aborts the stream.
                tracing::debug!(error = %err, "Skipping malformed stream payload");
            }
        }
    }
}

/// Per-line payload; only the first choice's incremental text is of
/// interest.
#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Lifts an [`SseDecoder`] over a fallible chunk stream.
///
/// Yields each decoded delta in order. The output ends at the termination
/// sentinel or when the input ends; a transport error yields exactly one
/// `Err` and then ends the output.
pub fn delta_stream<S, B, E>(chunks: S) -> impl Stream<Item = Result<String, GatewayError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    struct DecodeState<S> {
        chunks: Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<Result<String, GatewayError>>,
        finished: bool,
    }

    let state = DecodeState {
        chunks: Box::pin(chunks),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    state
                        .pending
                        .extend(state.decoder.feed(chunk.as_ref()).into_iter().map(Ok));
                    if state.decoder.is_done() {
                        state.finished = true;
                    }
                }
                Some(Err(err)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(GatewayError::stream(err.to_string())));
                }
                None => {
                    state.finished = true;
                    state
                        .pending
                        .extend(state.decoder.finish().into_iter().map(Ok));
                }
            }
        }
    })
}
