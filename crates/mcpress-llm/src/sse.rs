//! SSE Frame Decoding
//!
//! Incremental decoder for server-sent-event byte streams. Network reads
//! do not line up with frame boundaries, so bytes are buffered until a
//! blank line completes a frame; one completed frame yields the payload
//! of its `data:` lines.

use bytes::{Buf, BytesMut};

/// Stateful SSE frame decoder. Feed it raw reads with
/// [`FrameDecoder::push`] in arrival order.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

struct Boundary {
    at: usize,
    len: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the data payload of every frame the buffer
    /// now completes, in order. Frames without `data:` lines (comments,
    /// event-only frames) yield nothing.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(frame) = self.next_frame() {
            if let Some(payload) = data_payload(&frame) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Bytes buffered without a terminating blank line yet.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn next_frame(&mut self) -> Option<String> {
        let boundary = find_boundary(&self.buf)?;
        let frame = self.buf.split_to(boundary.at);
        self.buf.advance(boundary.len);
        Some(String::from_utf8_lossy(&frame).into_owned())
    }
}

/// First blank-line boundary in `buf`: `\n\n` or `\r\n\r\n` (seen here as
/// `\n\r\n` once the preceding line's `\r` is counted into the frame).
fn find_boundary(buf: &[u8]) -> Option<Boundary> {
    for (i, byte) in buf.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        if buf.get(i + 1) == Some(&b'\n') {
            return Some(Boundary { at: i, len: 2 });
        }
        if buf.get(i + 1) == Some(&b'\r') && buf.get(i + 2) == Some(&b'\n') {
            return Some(Boundary { at: i, len: 3 });
        }
    }
    None
}

/// Concatenated `data:` payloads of one frame, joined with newlines per
/// the SSE spec. Tolerates both `data:` and `data: ` spacing.
fn data_payload(frame: &str) -> Option<String> {
    let mut payload: Option<String> = None;
    for line in frame.split('\n') {
        let line = line.trim_end_matches('\r');
        let Some(rest) = line.strip_prefix("data:") else {
            continue;
        };
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        match payload.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => payload = Some(value.to_string()),
        }
    }
    payload
}
