//! Line-framed SSE decoding for the relayed completion stream
//!
//! The relay forwards the completion API's event stream verbatim: lines of
//! `data: <payload>` separated by newlines. The transport gives no framing
//! guarantee, so one payload may span several network chunks and one chunk
//! may carry several payloads. The decoder buffers partial lines and
//! partial UTF-8 sequences across feeds and only ever emits complete
//! payloads, in arrival order.

use serde_json::Value;

/// Sentinel payload marking the logical end of a stream, not an error
pub const STREAM_TERMINATOR: &str = "[DONE]";

/// Prefix of a payload-bearing line
const DATA_PREFIX: &str = "data:";

/// Buffered decoder turning arbitrary byte chunks into `data:` payloads
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    /// Text of the current, not-yet-terminated line
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    partial_utf8: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every payload it completed, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_chunk(chunk);

        let mut payloads = Vec::new();
        for piece in text.split_inclusive('\n') {
            match piece.strip_suffix('\n') {
                Some(rest) => {
                    self.pending.push_str(rest);
                    let line = std::mem::take(&mut self.pending);
                    if let Some(payload) = payload_of(&line) {
                        payloads.push(payload.to_string());
                    }
                }
                None => self.pending.push_str(piece),
            }
        }
        payloads
    }

    /// Decode as much of the chunk as is valid UTF-8.
    ///
    /// A multi-byte character cut off by the chunk boundary is carried over
    /// to the next feed; genuinely invalid bytes are dropped with a warning
    /// instead of poisoning the stream.
    fn decode_chunk(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, tail) = rest.split_at(error.valid_up_to());
                    // valid_up_to is always a char boundary
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match error.error_len() {
                        // Sequence runs past the end of the chunk; finish it
                        // with the next feed
                        None => {
                            self.partial_utf8 = tail.to_vec();
                            break;
                        }
                        Some(len) => {
                            tracing::warn!(
                                "dropping {} invalid UTF-8 byte(s) from stream",
                                len
                            );
                            rest = &tail[len..];
                        }
                    }
                }
            }
        }
        text
    }

    /// True if a partial line or partial UTF-8 sequence is still buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.partial_utf8.is_empty()
    }

    /// Drop any buffered partial data
    pub fn clear(&mut self) {
        self.pending.clear();
        self.partial_utf8.clear();
    }
}

/// Extract the payload of a `data:` line; other lines carry no content
fn payload_of(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.trim_start().strip_prefix(DATA_PREFIX)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.is_empty() {
        return None;
    }
    Some(payload)
}

/// Check for the end-of-stream sentinel
pub fn is_terminator(payload: &str) -> bool {
    payload.trim() == STREAM_TERMINATOR
}

/// Extract the incremental text fragment from one payload.
///
/// Payloads are completion-API delta JSON (`choices[0].delta.content`). A
/// payload that fails to parse is returned verbatim so content survives
/// upstream framing drift; valid JSON without a content delta (role
/// announcements, finish chunks) yields nothing.
pub fn delta_fragment(payload: &str) -> Option<String> {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => value["choices"][0]["delta"]["content"]
            .as_str()
            .map(str::to_string),
        Err(_) => Some(payload.to_string()),
    }
}
