//! Incremental rewrite of an Anthropic event stream into chat-completion
//! chunks.
//!
//! The transcoder is fed network chunks as they arrive. Bytes are buffered
//! only until the next line break, so every complete event is re-emitted
//! immediately. Upstream events map as follows:
//!
//! - `content_block_delta` with non-empty text: one delta chunk
//! - `message_stop`: one finish chunk (`finish_reason: "stop"`) then `[DONE]`;
//!   every later event is dropped
//! - anything else, or an unparsable line: dropped

use crate::adapter::ByteStream;
use async_stream::try_stream;
use bytes::Bytes;
use futures::StreamExt;
use gateway_core::{ChatChunk, FinishReason, DONE_FRAME};
use serde::Deserialize;
use tracing::{trace, warn};

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<EventDelta>,
}

#[derive(Debug, Deserialize)]
struct EventDelta {
    #[serde(default)]
    text: Option<String>,
}

/// Line-buffering stream transcoder for one response
#[derive(Debug)]
pub struct StreamTranscoder {
    model: String,
    buffer: Vec<u8>,
    finished: bool,
}

impl StreamTranscoder {
    /// Transcoder labelling chunks with `model`
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Consume one network chunk, returning the frames it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, &mut frames);
        }
        frames
    }

    /// Flush a trailing unterminated line once the upstream closes
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut frames = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut frames);
        }
        frames
    }

    /// Whether the terminal frame has been emitted
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn decode_line(&mut self, line: &[u8], frames: &mut Vec<Bytes>) {
        // Nothing may follow [DONE].
        if self.finished {
            return;
        }
        let Ok(line) = std::str::from_utf8(line) else {
            trace!("Skipping non-UTF-8 stream line");
            return;
        };
        let Some(payload) = line.trim().strip_prefix("data:") else {
            // `event:` lines, comments and blank separators carry nothing we need.
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            return;
        }

        let event = match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                trace!(error = %e, "Skipping unparsable stream line");
                return;
            }
        };

        match event.event_type.as_str() {
            "content_block_delta" => {
                let Some(text) = event.delta.and_then(|d| d.text) else {
                    return;
                };
                if text.is_empty() {
                    return;
                }
                self.push(ChatChunk::delta(self.model.as_str(), text), frames);
            }
            "message_stop" => {
                self.push(ChatChunk::finish(self.model.as_str(), FinishReason::Stop), frames);
                frames.push(Bytes::from_static(DONE_FRAME));
                self.finished = true;
            }
            _ => {}
        }
    }

    fn push(&self, chunk: ChatChunk, frames: &mut Vec<Bytes>) {
        match chunk.to_sse_frame() {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!(error = %e, "Failed to encode stream chunk"),
        }
    }
}

/// Wrap an upstream byte stream so it yields exposed-format frames
pub fn transcode_stream(upstream: ByteStream, model: String) -> ByteStream {
    let mut upstream = upstream;
    Box::pin(try_stream! {
        let mut transcoder = StreamTranscoder::new(model);
        while let Some(chunk) = upstream.next().await {
            let chunk = chunk?;
            for frame in transcoder.feed(&chunk) {
                yield frame;
            }
        }
        for frame in transcoder.finish() {
            yield frame;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use gateway_core::GatewayError;
    use serde_json::Value;

    fn event(data: &str) -> String {
        let event_type = serde_json::from_str::<Value>(data)
            .ok()
            .and_then(|v| v["type"].as_str().map(str::to_owned))
            .unwrap_or_default();
        format!("event: {event_type}\ndata: {data}\n\n")
    }

    fn delta(text: &str) -> String {
        event(
            &serde_json::json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": text}
            })
            .to_string(),
        )
    }

    fn stop() -> String {
        event(r#"{"type":"message_stop"}"#)
    }

    fn parse_frame(frame: &Bytes) -> Option<Value> {
        let text = std::str::from_utf8(frame).expect("utf8");
        assert!(text.starts_with("data: "), "{text}");
        assert!(text.ends_with("\n\n"), "{text}");
        serde_json::from_str(text.trim_start_matches("data: ").trim_end()).ok()
    }

    #[test]
    fn test_deltas_then_finish_then_done() {
        let mut transcoder = StreamTranscoder::new("claude-3-5-sonnet");
        let input = [
            event(r#"{"type":"message_start","message":{"id":"msg_1"}}"#),
            event(r#"{"type":"content_block_start","index":0}"#),
            delta("Hi"),
            delta(" there"),
            event(r#"{"type":"content_block_stop","index":0}"#),
            event(r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#),
            stop(),
        ]
        .concat();

        let frames = transcoder.feed(input.as_bytes());
        assert_eq!(frames.len(), 4);

        let first = parse_frame(&frames[0]).expect("json");
        assert_eq!(first["choices"][0]["delta"]["content"], "Hi");
        assert!(first["choices"][0]["finish_reason"].is_null());
        assert_eq!(first["model"], "claude-3-5-sonnet");

        let second = parse_frame(&frames[1]).expect("json");
        assert_eq!(second["choices"][0]["delta"]["content"], " there");

        let finish = parse_frame(&frames[2]).expect("json");
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert_eq!(finish["choices"][0]["delta"], serde_json::json!({}));

        assert_eq!(frames[3], Bytes::from_static(DONE_FRAME));
        assert!(transcoder.is_finished());
    }

    #[test]
    fn test_events_after_stop_are_dropped() {
        let mut transcoder = StreamTranscoder::new("m");
        let frames = transcoder.feed([delta("a"), stop(), delta("late"), stop()].concat().as_bytes());

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], Bytes::from_static(DONE_FRAME));

        assert!(transcoder.feed(delta("later").as_bytes()).is_empty());
        assert!(transcoder.feed(b"data: {\"type\":\"content_block_delta\"").is_empty());
        assert!(transcoder.finish().is_empty());
    }

    #[test]
    fn test_events_split_across_chunks() {
        let mut transcoder = StreamTranscoder::new("m");
        let input = [delta("Hello"), stop()].concat();
        let bytes = input.as_bytes();

        let mut frames = Vec::new();
        for piece in bytes.chunks(7) {
            frames.extend(transcoder.feed(piece));
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(
            parse_frame(&frames[0]).expect("json")["choices"][0]["delta"]["content"],
            "Hello"
        );
    }

    #[test]
    fn test_multibyte_text_split_mid_character() {
        let mut transcoder = StreamTranscoder::new("m");
        let input = delta("héllo wörld");
        let bytes = input.as_bytes();
        let split = input.find('é').expect("contains é") + 1;

        let mut frames = transcoder.feed(&bytes[..split]);
        frames.extend(transcoder.feed(&bytes[split..]));

        assert_eq!(frames.len(), 1);
        assert_eq!(
            parse_frame(&frames[0]).expect("json")["choices"][0]["delta"]["content"],
            "héllo wörld"
        );
    }

    #[test]
    fn test_unparsable_and_empty_deltas_are_skipped() {
        let mut transcoder = StreamTranscoder::new("m");
        let input = [
            "data: {not json}\n\n".to_string(),
            delta(""),
            "data: {\"type\":\"ping\"}\n\n".to_string(),
            delta("ok"),
        ]
        .concat();

        let frames = transcoder.feed(input.as_bytes());
        assert_eq!(frames.len(), 1);
        assert!(!transcoder.is_finished());
    }

    #[test]
    fn test_trailing_line_is_decoded_on_finish() {
        let mut transcoder = StreamTranscoder::new("m");
        let frames = transcoder.feed(b"data: {\"type\":\"message_stop\"}");
        assert!(frames.is_empty());

        let frames = transcoder.finish();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], Bytes::from_static(DONE_FRAME));
    }

    #[test]
    fn test_chunk_ids_are_fresh_per_chunk() {
        let mut transcoder = StreamTranscoder::new("m");
        let frames = transcoder.feed([delta("a"), delta("b")].concat().as_bytes());

        let a = parse_frame(&frames[0]).expect("json");
        let b = parse_frame(&frames[1]).expect("json");
        assert_ne!(a["id"], b["id"]);
    }

    #[tokio::test]
    async fn test_transcode_stream_propagates_upstream_errors() {
        let upstream: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(delta("partial"))),
            Err(GatewayError::internal("connection reset")),
            Ok(Bytes::from(stop())),
        ]));

        let results: Vec<_> = transcode_stream(upstream, "m".to_string()).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
