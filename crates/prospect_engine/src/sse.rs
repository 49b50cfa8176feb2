//! Incremental Server-Sent Events framing.
//!
//! Only `data:` lines carry meaning for the analysis service; an `event:` line
//! is remembered on the event but never used for routing. `id:` and `retry:`
//! are ignored.

use encoding_rs::{CoderResult, Decoder, UTF_8};

/// One frame taken from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// `data:` lines of the frame joined with `\n`.
    pub payload: String,
    pub event_name: Option<String>,
}

/// Turns arbitrarily chunked bytes into frames.
pub struct SseFramer {
    decoder: Decoder,
    buffer: String,
}

impl Default for SseFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SseFramer {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            buffer: String::new(),
        }
    }

    /// Feeds one network chunk and returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode(chunk, false);
        self.drain_frames()
    }

    /// Flushes the decoder at end of body. Content after the last blank line is
    /// treated as a final frame, since servers do not always terminate it.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.decode(&[], true);
        let mut events = self.drain_frames();
        let rest = std::mem::take(&mut self.buffer);
        events.extend(parse_frame(&rest));
        events
    }

    fn decode(&mut self, mut src: &[u8], last: bool) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 3 + 4);
            self.buffer.reserve(needed);
            let (result, read, _had_errors) =
                self.decoder.decode_to_string(src, &mut self.buffer, last);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }

    fn drain_frames(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some((frame_end, next_start)) = find_blank_line(&self.buffer) {
            let frame = self.buffer[..frame_end].to_string();
            self.buffer.drain(..next_start);
            events.extend(parse_frame(&frame));
        }
        events
    }
}

/// Locates the first blank line. Returns the end of the frame before it and
/// the start of whatever follows it. `\n` and `\r\n` endings may be mixed.
fn find_blank_line(buffer: &str) -> Option<(usize, usize)> {
    let bytes = buffer.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        let mut j = i + 1;
        if bytes.get(j) == Some(&b'\r') {
            j += 1;
        }
        if bytes.get(j) == Some(&b'\n') {
            let frame_end = if i > 0 && bytes[i - 1] == b'\r' { i - 1 } else { i };
            return Some((frame_end, j + 1));
        }
    }
    None
}

fn parse_frame(frame: &str) -> Option<StreamEvent> {
    let mut data = Vec::new();
    let mut event_name = None;
    for line in frame.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(value) = line.strip_prefix("data:") {
            data.push(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_name = Some(value.trim().to_string());
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(StreamEvent {
        payload: data.join("\n"),
        event_name,
    })
}
