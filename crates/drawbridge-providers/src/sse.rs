//! SSE (Server-Sent Events) framing.
//!
//! [`SseDecoder`] is a pure incremental line decoder, so framing is testable
//! without HTTP; [`sse_stream`] wires it to a `reqwest::Response` body.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::Stream;
use tokio_stream::StreamExt;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder. Feed it body chunks; it yields complete events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a body chunk and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim_end_matches('\r').to_string();
            self.buffer.drain(..=newline);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
            } else if let Some(value) = line.strip_prefix("event:") {
                self.event = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.trim_start().to_string());
            }
            // Comments (`:`) and unknown fields (`id:`, `retry:`) are ignored.
        }
        events
    }

    /// Flush any event left when the body ends without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

struct SseStreamState {
    body: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    done: bool,
}

/// Decode a `reqwest::Response` body as a stream of SSE events.
pub fn sse_stream(
    response: reqwest::Response,
) -> impl Stream<Item = anyhow::Result<SseEvent>> + Send {
    let state = SseStreamState {
        body: Box::pin(response.bytes_stream()),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    state.pending.extend(state.decoder.feed(&chunk));
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(anyhow::anyhow!("SSE stream error: {e}")), state));
                }
                None => {
                    state.done = true;
                    if let Some(event) = state.decoder.finish() {
                        state.pending.push_back(event);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event_framing() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: message_start\ndata: {\"a\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_start"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: content_block_delta\nda").is_empty());
        let events = decoder.feed(b"ta: {\"text\":\"hi\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"text\":\"hi\"}");
    }

    #[test]
    fn test_multiline_data_joined_with_newline() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b": keep-alive\n\n\n").is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: x\r\n\r\n");
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail\n").is_empty());
        let event = decoder.finish().expect("pending event");
        assert_eq!(event.data, "tail");
        assert!(decoder.finish().is_none());
    }
}
