//! Line reassembly across network chunks

/// Splits a byte stream into text lines.
///
/// Handles lines split across chunks and UTF-8 sequences split across chunk
/// boundaries.
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Text after the last newline seen so far
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    incomplete_utf8: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every line completed by them, without the
    /// line terminator
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let bytes = if self.incomplete_utf8.is_empty() {
            chunk.to_vec()
        } else {
            let mut combined = std::mem::take(&mut self.incomplete_utf8);
            combined.extend_from_slice(chunk);
            combined
        };

        let (text, remainder) = decode_utf8_with_remainder(&bytes);
        self.incomplete_utf8 = remainder;
        self.buffer.push_str(&text);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Flush whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if !self.incomplete_utf8.is_empty() {
            let bytes = std::mem::take(&mut self.incomplete_utf8);
            self.buffer.push_str(&String::from_utf8_lossy(&bytes));
        }
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Decode bytes as UTF-8, returning the valid text and any trailing bytes of an
/// incomplete sequence
fn decode_utf8_with_remainder(bytes: &[u8]) -> (String, Vec<u8>) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), Vec::new()),
        Err(e) => {
            let valid_up_to = e.valid_up_to();
            let valid = String::from_utf8_lossy(&bytes[..valid_up_to]).into_owned();
            match e.error_len() {
                // Truncated sequence at the end: keep it for the next chunk
                None => (valid, bytes[valid_up_to..].to_vec()),
                Some(len) => {
                    tracing::warn!(
                        "Invalid UTF-8 in stream at byte {}, replacing",
                        valid_up_to
                    );
                    let (rest, remainder) = decode_utf8_with_remainder(&bytes[valid_up_to + len..]);
                    (format!("{}\u{FFFD}{}", valid, rest), remainder)
                }
            }
        }
    }
}
