//! Server-Sent Events (SSE) processing for conversation listen streams.
//!
//! This module turns the raw byte stream of a `/conversations/{id}/listen`
//! response into a lazy sequence of normalized display-text chunks. Literal
//! `ping` frames are heartbeats and are skipped; frames that fail to parse
//! are dropped without aborting the stream; a stream or connection failure
//! yields exactly one final error item, after which the stream ends.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability::{STREAM_ERRORS, STREAM_EVENTS};
use crate::render::payload_to_markdown;
use crate::types::ConversationEvent;

/// Process a stream of bytes into a stream of normalized text chunks.
///
/// The input stream's errors must already be converted to [`Error`]; the
/// client does this at the transport boundary.
pub fn process_listen_stream<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin + 'static,
{
    let buffer = String::new();

    stream::unfold(
        (byte_stream, buffer, false),
        move |(mut stream, mut buffer, failed)| async move {
            if failed {
                return None;
            }
            loop {
                // Drain complete frames before reading more data.
                while let Some((data, rest)) = extract_frame(&buffer) {
                    buffer = rest;
                    STREAM_EVENTS.click();
                    if let Some(chunk) = chunk_from_frame(&data) {
                        return Some((Ok(chunk), (stream, buffer, false)));
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => buffer.push_str(&text),
                        Err(err) => {
                            STREAM_ERRORS.click();
                            return Some((
                                Err(Error::encoding(
                                    format!("Invalid UTF-8 in stream: {err}"),
                                    Some(Box::new(err)),
                                )),
                                (stream, buffer, true),
                            ));
                        }
                    },
                    Some(Err(err)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(err), (stream, buffer, true)));
                    }
                    None => {
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract one complete SSE frame's data from the buffer.
///
/// Frames are delimited by blank lines. The returned string joins the
/// frame's `data:` lines; frames without one yield an empty string, which
/// the caller drops.
fn extract_frame(buffer: &str) -> Option<(String, String)> {
    let (frame, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    let mut data = String::new();
    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.trim());
        }
    }
    Some((data, rest))
}

/// Convert one frame's data into a display chunk.
///
/// Returns `None` for heartbeats, malformed frames, non-message events, and
/// payloads that normalize to nothing.
fn chunk_from_frame(data: &str) -> Option<String> {
    if data == "ping" {
        return None;
    }
    let event = serde_json::from_str::<ConversationEvent>(data).ok()?;
    let payload = event.payload()?;
    let chunk = payload_to_markdown(payload);
    if chunk.is_empty() { None } else { Some(chunk) }
}
