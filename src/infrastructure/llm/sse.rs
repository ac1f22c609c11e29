use std::collections::VecDeque;
use std::pin::Pin;

use futures::{stream, Stream, StreamExt};
use serde::Deserialize;

use crate::domain::{ports::FragmentStream, DomainError};

const DONE_SENTINEL: &str = "[DONE]";

/// Splits an event-stream body into `data:` payloads, holding back partial
/// lines until the rest arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    line.strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    Delta(String),
    Empty,
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Option<Vec<StreamChoice>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Parses one `data:` payload. An in-stream `error` object, or a chunk with
/// no `choices`, ends the stream as a failure.
pub fn parse_chunk(payload: &str) -> Result<ChunkEvent, DomainError> {
    if payload == DONE_SENTINEL {
        return Ok(ChunkEvent::Done);
    }
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| DomainError::malformed(format!("bad stream chunk: {e}")))?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(DomainError::external(format!("stream error: {message}")));
    }
    let choices = chunk
        .choices
        .ok_or_else(|| DomainError::malformed("stream chunk without choices"))?;

    Ok(choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map_or(ChunkEvent::Empty, ChunkEvent::Delta))
}

struct DeltaState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, DomainError>>,
    finished: bool,
}

impl<S> DeltaState<S> {
    /// Queues the fragments of the given payloads. Returns false once the
    /// stream has ended, either by sentinel or by a bad chunk.
    fn absorb(&mut self, payloads: Vec<String>) -> bool {
        for payload in payloads {
            match parse_chunk(&payload) {
                Ok(ChunkEvent::Delta(text)) => self.pending.push_back(Ok(text)),
                Ok(ChunkEvent::Empty) => {}
                Ok(ChunkEvent::Done) => return false,
                Err(e) => {
                    self.pending.push_back(Err(e));
                    return false;
                }
            }
        }
        true
    }
}

/// Turns an OpenAI-style event-stream body into delta-content fragments.
///
/// Yields fragments in arrival order; a transport or parse error is yielded
/// once and ends the stream.
pub fn delta_stream<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<DomainError> + Send + 'static,
{
    let state = DeltaState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.feed(bytes.as_ref());
                    state.finished = !state.absorb(payloads);
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(e.into()));
                    state.finished = true;
                }
                None => {
                    let tail = state.decoder.finish().into_iter().collect();
                    state.absorb(tail);
                    state.finished = true;
                }
            }
        }
    }))
}
