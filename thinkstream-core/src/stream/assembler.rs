/// Streaming line assembler (handles lines split across any number of writes).
///
/// Buffering happens on bytes, so a UTF-8 sequence cut in half by a pipe
/// read is reassembled before the line is decoded.
#[derive(Debug, Default, Clone)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text fragment; returns every line it completed, in order.
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        self.feed_bytes(fragment.as_bytes())
    }

    /// Feed raw bytes (pipe output); returns every line it completed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            out.push(decode_line(&self.pending));
            self.pending.clear();
            rest = &rest[pos + 1..];
        }

        self.pending.extend_from_slice(rest);
        out
    }

    /// Emit the unterminated tail (if any) as a complete line.
    pub fn drain(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }

        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    // CRLF producers (Windows consoles, some test harnesses)
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
