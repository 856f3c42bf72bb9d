//! SSE frame reassembly.
//!
//! Network reads do not respect frame boundaries: a single
//! `data: {...}\n\n` frame may arrive split across two reads, and a read may
//! even end in the middle of a UTF-8 sequence. The buffer keeps the trailing
//! partial line across pushes and re-splits once the line terminator arrives,
//! so every frame is surfaced exactly once, in order.

/// Incremental line-reassembly buffer for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    buf: Vec<u8>,
}

impl SseFrameBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns the `data:` payloads of every line the
    /// read completed, in order. Lines without the `data: ` prefix (comments,
    /// blank keep-alive lines) are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            // A complete line never splits a UTF-8 sequence: multi-byte
            // continuation bytes cannot equal b'\n'.
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data: ") {
                payloads.push(data.to_owned());
            }
        }
        payloads
    }

    /// Bytes currently held back waiting for a line terminator.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn whole_frame_in_one_read() {
        let mut buf = SseFrameBuffer::new();
        let out = buf.push(b"data: {\"text\":\"hi\"}\n\n");
        assert_eq!(out, vec!["{\"text\":\"hi\"}".to_owned()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn frame_split_across_two_reads_parses_once() {
        let mut buf = SseFrameBuffer::new();
        let first = buf.push(b"data: {\"text\":\"Hel");
        assert!(first.is_empty());
        let second = buf.push(b"lo\"}\n\n");
        assert_eq!(second, vec!["{\"text\":\"Hello\"}".to_owned()]);
    }

    #[test]
    fn multiple_frames_in_one_read_stay_ordered() {
        let mut buf = SseFrameBuffer::new();
        let out = buf.push(b"data: one\n\ndata: two\n\ndata: [DONE]\n\n");
        assert_eq!(out, vec!["one", "two", "[DONE]"]);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut buf = SseFrameBuffer::new();
        let out = buf.push(b"data: payload\r\n\r\n");
        assert_eq!(out, vec!["payload"]);
    }

    #[test]
    fn non_data_lines_are_dropped() {
        let mut buf = SseFrameBuffer::new();
        let out = buf.push(b": keep-alive comment\n\ndata: real\n\n");
        assert_eq!(out, vec!["real"]);
    }

    #[test]
    fn read_ending_mid_utf8_sequence_is_retained() {
        let mut buf = SseFrameBuffer::new();
        let full = "data: {\"text\":\"caf\u{e9}\"}\n".as_bytes();
        // Split inside the two-byte é sequence.
        let split = full.len() - 4;
        assert!(buf.push(&full[..split]).is_empty());
        let out = buf.push(&full[split..]);
        assert_eq!(out, vec!["{\"text\":\"caf\u{e9}\"}".to_owned()]);
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let mut buf = SseFrameBuffer::new();
        let mut collected = Vec::new();
        for byte in b"data: a\n\ndata: b\n\n" {
            collected.extend(buf.push(&[*byte]));
        }
        assert_eq!(collected, vec!["a", "b"]);
    }
}
