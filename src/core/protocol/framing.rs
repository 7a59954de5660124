//! Line framing
//!
//! Turns arbitrary byte chunks into complete, trimmed text lines. Any
//! unterminated tail is kept for the next call.

use tracing::{trace, warn};

/// Default cap on buffered residue without a newline (64 KiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

const LF: u8 = b'\n';

/// Output of the framer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerEvent {
    /// A complete line, newline stripped and surrounding whitespace trimmed
    Line(String),
    /// Residue exceeded the cap and was thrown away
    Overflow {
        /// Number of bytes discarded
        discarded: usize,
    },
}

/// Stateful line framer
#[derive(Debug)]
pub struct LineFramer {
    residue: Vec<u8>,
    max_line_bytes: usize,
    /// Dropping bytes until the next newline after an overflow
    skipping: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineFramer {
    /// Create a framer with a residue cap
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            residue: Vec::with_capacity(max_line_bytes.min(256)),
            max_line_bytes: max_line_bytes.max(1),
            skipping: false,
        }
    }

    /// Bytes currently buffered
    pub fn pending_len(&self) -> usize {
        self.residue.len()
    }

    /// Drop buffered residue
    pub fn clear(&mut self) {
        self.residue.clear();
        self.skipping = false;
    }

    /// Feed a chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FramerEvent> {
        trace!(chunk_len = chunk.len(), pending = self.residue.len(), "Framing chunk");
        let mut events = Vec::new();
        let mut rest = chunk;

        while !rest.is_empty() {
            match rest.iter().position(|&b| b == LF) {
                Some(pos) => {
                    let (head, tail) = rest.split_at(pos);
                    rest = &tail[1..];

                    if self.skipping {
                        self.skipping = false;
                        continue;
                    }

                    if self.residue.len() + head.len() > self.max_line_bytes {
                        let discarded = self.residue.len() + head.len();
                        self.residue.clear();
                        warn!(discarded, max = self.max_line_bytes, "Dropping oversized line");
                        events.push(FramerEvent::Overflow { discarded });
                        continue;
                    }

                    let line = if self.residue.is_empty() {
                        decode_line(head)
                    } else {
                        self.residue.extend_from_slice(head);
                        let line = decode_line(&self.residue);
                        self.residue.clear();
                        line
                    };
                    events.push(FramerEvent::Line(line));
                }
                None => {
                    if !self.skipping {
                        self.residue.extend_from_slice(rest);
                        if self.residue.len() > self.max_line_bytes {
                            let discarded = self.residue.len();
                            self.residue.clear();
                            self.skipping = true;
                            warn!(
                                discarded,
                                max = self.max_line_bytes,
                                "Dropping unterminated residue"
                            );
                            events.push(FramerEvent::Overflow { discarded });
                        }
                    }
                    break;
                }
            }
        }

        events
    }
}

/// Best-effort decode: invalid UTF-8 is dropped, not replaced
fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.contains(char::REPLACEMENT_CHARACTER) {
        trimmed
            .chars()
            .filter(|&c| c != char::REPLACEMENT_CHARACTER)
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(events: Vec<FramerEvent>) -> Vec<String> {
        events
            .into_iter()
            .filter_map(|e| match e {
                FramerEvent::Line(l) => Some(l),
                FramerEvent::Overflow { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::default();
        let out = lines(framer.push(b"a\nb\r\n  c  \n"));
        assert_eq!(out, vec!["a", "b", "c"]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_partial_line_across_chunks() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"---SIGNAL_ORIGINAL_STAR").is_empty());
        assert_eq!(framer.pending_len(), 23);

        let out = lines(framer.push(b"T---\n0.0,1.0\n"));
        assert_eq!(out, vec!["---SIGNAL_ORIGINAL_START---", "0.0,1.0"]);
    }

    #[test]
    fn test_split_crlf() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"1.0,2.0\r").is_empty());
        assert_eq!(lines(framer.push(b"\n")), vec!["1.0,2.0"]);
    }

    #[test]
    fn test_empty_lines_are_reported() {
        let mut framer = LineFramer::default();
        assert_eq!(lines(framer.push(b"\n\n")), vec!["", ""]);
    }

    #[test]
    fn test_invalid_utf8_dropped() {
        let mut framer = LineFramer::default();
        let out = lines(framer.push(b"1.0,\xFF2.0\n"));
        assert_eq!(out, vec!["1.0,2.0"]);
    }

    #[test]
    fn test_unterminated_residue_capped() {
        let mut framer = LineFramer::new(8);
        let events = framer.push(b"0123456789");
        assert_eq!(events, vec![FramerEvent::Overflow { discarded: 10 }]);
        assert_eq!(framer.pending_len(), 0);

        // Rest of the oversized line is skipped, the next one is intact
        assert!(framer.push(b"abc").is_empty());
        assert_eq!(lines(framer.push(b"def\nok\n")), vec!["ok"]);
    }

    #[test]
    fn test_oversized_terminated_line() {
        let mut framer = LineFramer::new(4);
        let events = framer.push(b"abcdef\nxy\n");
        assert_eq!(
            events,
            vec![
                FramerEvent::Overflow { discarded: 6 },
                FramerEvent::Line("xy".to_string()),
            ]
        );
    }

    #[test]
    fn test_clear_discards_residue() {
        let mut framer = LineFramer::default();
        framer.push(b"0.5,");
        framer.clear();
        assert_eq!(lines(framer.push(b"1.0,2.0\n")), vec!["1.0,2.0"]);
    }
}
