//! Incremental frame decoding for the agent stream.
//!
//! The server writes one event per frame: a literal prefix (`data: `), a
//! JSON payload, and a blank line.  Network reads split that text
//! anywhere, including inside the `\n\n` delimiter and inside multi-byte
//! UTF-8 characters, so the decoder keeps two pieces of state between
//! calls: the undecoded tail bytes and the unterminated tail text.

/// Frames are separated by a blank line.
pub const DELIMITER: &str = "\n\n";

/// One complete frame, prefix already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: String,
}

/// Stateful splitter from raw chunks to [`Frame`]s.
///
/// Decoding the same bytes in one chunk or in any number of smaller chunks
/// yields the same frames in the same order.
#[derive(Debug)]
pub struct FrameDecoder {
    prefix: String,
    /// Decoded text not yet terminated by a delimiter.
    buffer: String,
    /// Leading bytes of a UTF-8 sequence cut off by the last chunk.
    partial: Vec<u8>,
    dropped: usize,
}

impl FrameDecoder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            buffer: String::new(),
            partial: Vec::new(),
            dropped: 0,
        }
    }

    /// Decode one chunk and return every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.decode_into_buffer(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find(DELIMITER) {
            let block: String = self.buffer.drain(..pos).collect();
            self.buffer.drain(..DELIMITER.len());
            if let Some(frame) = self.strip_prefix(&block) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush at end of stream.
    ///
    /// Whatever is left is tried once as a final frame and then discarded,
    /// whether or not it turns out to be a frame.
    pub fn finish(&mut self) -> Option<Frame> {
        if !self.partial.is_empty() {
            let tail = std::mem::take(&mut self.partial);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            return None;
        }
        self.strip_prefix(&rest)
    }

    /// Bytes held back waiting for more input.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.partial.len()
    }

    /// Number of non-blank blocks discarded for lacking the prefix.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn decode_into_buffer(&mut self, chunk: &[u8]) {
        let mut pending = std::mem::take(&mut self.partial);
        pending.extend_from_slice(chunk);

        let mut rest: &[u8] = &pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Invalid sequence in the middle: replace and move on.
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Truncated sequence at the end: wait for the next chunk.
                        None => {
                            self.partial = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn strip_prefix(&mut self, block: &str) -> Option<Frame> {
        match block.strip_prefix(self.prefix.as_str()) {
            Some(payload) => Some(Frame {
                payload: payload.to_string(),
            }),
            None => {
                if !block.trim().is_empty() {
                    self.dropped += 1;
                    tracing::debug!(
                        chars = block.len(),
                        "dropping frame without data prefix"
                    );
                }
                None
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new("data: ")
    }

    fn payloads(frames: Vec<Frame>) -> Vec<String> {
        frames.into_iter().map(|f| f.payload).collect()
    }

    #[test]
    fn single_complete_frame() {
        let mut dec = decoder();
        let frames = dec.feed(b"data: {\"type\":\"done\"}\n\n");
        assert_eq!(payloads(frames), vec!["{\"type\":\"done\"}"]);
        assert_eq!(dec.buffered_len(), 0);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut dec = decoder();
        let frames = dec.feed(b"data: first\n\ndata: second\n\n");
        assert_eq!(payloads(frames), vec!["first", "second"]);
    }

    #[test]
    fn partial_frame_stays_buffered() {
        let mut dec = decoder();
        let frames = dec.feed(b"data: complete\n\ndata: partial");
        assert_eq!(payloads(frames), vec!["complete"]);
        assert_eq!(dec.buffered_len(), "data: partial".len());

        let frames = dec.feed(b" rest\n\n");
        assert_eq!(payloads(frames), vec!["partial rest"]);
    }

    #[test]
    fn delimiter_split_across_chunks() {
        let mut dec = decoder();
        assert!(dec.feed(b"data: a\n").is_empty());
        let frames = dec.feed(b"\ndata: b\n\n");
        assert_eq!(payloads(frames), vec!["a", "b"]);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        // "é" is 0xC3 0xA9; "数" is three bytes.
        let text = "data: café 数据\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut dec = decoder();
        assert!(dec.feed(&text[..split]).is_empty());
        let frames = dec.feed(&text[split..]);
        assert_eq!(payloads(frames), vec!["café 数据"]);
    }

    #[test]
    fn byte_at_a_time() {
        let text = "data: ñandú\n\ndata: two\n\n".as_bytes();
        let mut dec = decoder();
        let mut frames = Vec::new();
        for b in text {
            frames.extend(dec.feed(std::slice::from_ref(b)));
        }
        assert_eq!(payloads(frames), vec!["ñandú", "two"]);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_char() {
        let mut dec = decoder();
        let frames = dec.feed(b"data: a\xFFb\n\n");
        assert_eq!(payloads(frames), vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn frames_without_prefix_are_dropped() {
        let mut dec = decoder();
        let frames = dec.feed(b": keep-alive\n\nevent: ping\n\ndata: kept\n\n");
        assert_eq!(payloads(frames), vec!["kept"]);
        assert_eq!(dec.dropped(), 2);
    }

    #[test]
    fn blank_blocks_are_not_counted_as_dropped() {
        let mut dec = decoder();
        let frames = dec.feed(b"data: a\n\n\n\ndata: b\n\n");
        assert_eq!(payloads(frames), vec!["a", "b"]);
        assert_eq!(dec.dropped(), 0);
    }

    #[test]
    fn prefix_is_literal() {
        // No space after the colon: not our prefix.
        let mut dec = decoder();
        assert!(dec.feed(b"data:{}\n\n").is_empty());
        assert_eq!(dec.dropped(), 1);
    }

    #[test]
    fn finish_flushes_unterminated_frame() {
        let mut dec = decoder();
        assert!(dec.feed(b"data: {\"type\":\"done\"}").is_empty());
        let last = dec.finish().unwrap();
        assert_eq!(last.payload, "{\"type\":\"done\"}");
        assert_eq!(dec.buffered_len(), 0);
    }

    #[test]
    fn finish_is_attempted_once() {
        let mut dec = decoder();
        dec.feed(b"data: tail");
        assert!(dec.finish().is_some());
        assert!(dec.finish().is_none());
    }

    #[test]
    fn finish_discards_non_frame_tail() {
        let mut dec = decoder();
        dec.feed(b"garbage");
        assert!(dec.finish().is_none());
        assert_eq!(dec.buffered_len(), 0);
    }

    #[test]
    fn finish_ignores_whitespace_tail() {
        let mut dec = decoder();
        dec.feed(b"data: a\n\n\n");
        assert!(dec.finish().is_none());
        assert_eq!(dec.dropped(), 0);
    }

    #[test]
    fn finish_lossily_decodes_truncated_char() {
        let mut dec = decoder();
        dec.feed(b"data: x\xE6\x95");
        let last = dec.finish().unwrap();
        assert!(last.payload.starts_with('x'));
        assert!(last.payload.contains('\u{FFFD}'));
    }

    #[test]
    fn custom_prefix() {
        let mut dec = FrameDecoder::new("evt>");
        let frames = dec.feed(b"evt>{}\n\ndata: {}\n\n");
        assert_eq!(payloads(frames), vec!["{}"]);
    }
}
