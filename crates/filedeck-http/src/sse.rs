//! Server-sent events decoding.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::trace;

use filedeck_core::Result;
use filedeck_core::error::SubscriptionError;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    /// Event name; `message` when the server sent none.
    pub event: String,
    pub data: String,
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Chunks may split lines and events anywhere; partial input is buffered
/// until its line ends.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => trace!(field, "Ignoring event stream field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            id: self.id.clone(),
            event: event.unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Stream of decoded events.
pub(crate) type EventStream = Pin<Box<dyn Stream<Item = Result<SseEvent>> + Send>>;

/// Decodes a streaming response body into events.
pub(crate) fn events(response: reqwest::Response) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(SubscriptionError::Stream {
                        message: e.to_string(),
                    }
                    .into());
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"id:abc\nevent:PB_CONNECT\ndata:{\"clientId\":\"abc\"}\n\n");

        assert_eq!(
            events,
            vec![SseEvent {
                id: Some("abc".into()),
                event: "PB_CONNECT".into(),
                data: "{\"clientId\":\"abc\"}".into(),
            }]
        );
    }

    #[test]
    fn events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: files/*\r\nda").is_empty());
        assert!(decoder.push(b"ta: {\"a\":1}\r\n").is_empty());

        let events = decoder.push(b"\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "files/*");
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn multiline_data_and_default_name() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: one\ndata: two\n\n");
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "one\ntwo");
    }

    #[test]
    fn comments_and_empty_events_are_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keepalive\n\nevent: lonely\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn multibyte_text_survives_chunking() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: informe-año.pdf\n\n".as_bytes();
        let (a, b) = bytes.split_at(15);
        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b)[0].data, "informe-año.pdf");
    }
}
