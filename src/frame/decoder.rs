//! Incremental SSE event splitter.

/// End-of-stream sentinel payload; not JSON and never emitted as a frame.
const DONE_SENTINEL: &str = "[DONE]";

/// Split wire text into complete event payloads plus a new tail.
///
/// `tail` is the unconsumed suffix from the previous call; chaining tails
/// across calls yields the same frame sequence as decoding the whole
/// stream at once, regardless of where chunk boundaries fall.
///
/// Events end at a blank line. Within one event, every `data:` line is
/// stripped of its prefix and concatenated: the transport may re-wrap one
/// logical JSON document across several prefixed lines, so the stripped
/// contents are joined with no separator. Comment lines (`:` prefix) and
/// non-data fields (`event:`, `id:`, `retry:`) are skipped. The `[DONE]`
/// sentinel is recognized and dropped.
pub fn decode(input: &str, tail: &str) -> (Vec<String>, String) {
    let mut combined = String::with_capacity(tail.len() + input.len());
    combined.push_str(tail);
    combined.push_str(input);

    let mut frames = Vec::new();
    let mut rest = combined.as_str();
    while let Some((end, skip)) = find_event_boundary(rest) {
        if let Some(payload) = assemble_payload(&rest[..end]) {
            frames.push(payload);
        }
        rest = &rest[end + skip..];
    }

    (frames, rest.to_string())
}

/// Find the first blank-line event boundary.
///
/// Returns the byte offset of the newline that ends the event's last line,
/// and the number of bytes to skip past the blank line. Handles both `\n`
/// and `\r\n` line endings.
fn find_event_boundary(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            if j < bytes.len() && bytes[j] == b'\r' {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'\n' {
                return Some((i, j + 1 - i));
            }
        }
        i += 1;
    }
    None
}

/// Reassemble one event's payload from its `data:` lines.
///
/// Returns `None` for events with no data lines (comments, keep-alives)
/// and for the end-of-stream sentinel.
fn assemble_payload(segment: &str) -> Option<String> {
    let mut payload = String::new();
    let mut saw_data = false;

    for raw_line in segment.lines() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            payload.push_str(value.strip_prefix(' ').unwrap_or(value));
            saw_data = true;
        }
    }

    if !saw_data || payload.trim() == DONE_SENTINEL {
        return None;
    }
    Some(payload)
}

/// Stateful frame decoder for one logical streamed call.
///
/// Owns the tail buffer carried between chunks. Each call owns its own
/// decoder; nothing is shared across requests.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    tail: String,
}

impl FrameDecoder {
    /// Create a new decoder with an empty tail
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of wire text and return any complete frames
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let (frames, tail) = decode(chunk, &self.tail);
        self.tail = tail;
        if !frames.is_empty() {
            tracing::trace!(frames = frames.len(), tail_len = self.tail.len(), "decoded frames");
        }
        frames
    }

    /// The unconsumed suffix awaiting more input
    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// Whether unconsumed input is still buffered
    pub fn has_pending(&self) -> bool {
        !self.tail.is_empty()
    }
}
