//! UTF-8 code point stream with error-recovery skipping and line events.
//!
//! The decoder is a nearly-branchless table-driven scheme (after Christopher
//! Wellons' branchless UTF-8 work): the first byte's high bits select an
//! expected sequence length, up to four bytes are loaded, and all error
//! conditions (non-canonical encoding, surrogate halves, out-of-range code
//! points, bad continuation bits) are accumulated into one flag word.
//! Malformed input yields code point 0 and consumes only the bytes that were
//! structurally consistent — decoding always makes forward progress.

use std::ops::Range;

/// Expected sequence length indexed by the first byte's top five bits.
/// 0 marks an invalid leading byte.
const LENGTHS: [u8; 32] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 3, 3, 4,
    0,
];
const MASKS: [u32; 5] = [0x00, 0x7f, 0x1f, 0x0f, 0x07];
const MINS: [u32; 5] = [0x0040_0000, 0, 0x80, 0x800, 0x1_0000];
const SHIFT_CP: [u32; 5] = [0, 18, 12, 6, 0];
const SHIFT_ERR: [u32; 5] = [0, 6, 4, 2, 0];

/// Decode one code point from the front of `bytes`.
///
/// Returns `(code_point, bytes_consumed)`. Malformed sequences return code
/// point 0 and consume at least 1 and at most the declared sequence length,
/// stopping at the buffer end or an embedded NUL. `bytes` must be non-empty.
pub fn decode(bytes: &[u8]) -> (u32, usize) {
    assert!(!bytes.is_empty());
    let len = LENGTHS[(bytes[0] >> 3) as usize] as usize;
    let mut wanted = len + usize::from(len == 0);

    // Load up to four bytes; positions past the end read as 0.
    let s = [
        bytes[0],
        bytes.get(1).copied().unwrap_or(0),
        bytes.get(2).copied().unwrap_or(0),
        bytes.get(3).copied().unwrap_or(0),
    ];

    // Assume a four-byte sequence; unused bits are shifted out.
    let mut cp = (u32::from(s[0]) & MASKS[len]) << 18;
    cp |= (u32::from(s[1]) & 0x3f) << 12;
    cp |= (u32::from(s[2]) & 0x3f) << 6;
    cp |= u32::from(s[3]) & 0x3f;
    cp >>= SHIFT_CP[len];

    // Accumulate error conditions.
    let mut e = u32::from(cp < MINS[len]) << 6; // non-canonical encoding
    e |= u32::from((cp >> 11) == 0x1b) << 7; // surrogate half
    e |= u32::from(cp > 0x0010_FFFF) << 8; // out of range
    e |= u32::from(s[1] & 0xc0) >> 2;
    e |= u32::from(s[2] & 0xc0) >> 4;
    e |= u32::from(s[3]) >> 6;
    e ^= 0x2a; // top two bits of each tail byte correct?
    e >>= SHIFT_ERR[len];

    if e != 0 {
        // Consume only the structurally consistent prefix: every byte of the
        // sequence that was actually present (non-NUL, in-bounds), at least 1.
        let available = s.iter().filter(|&&b| b != 0).count();
        wanted = wanted.min(available).max(1);
        cp = 0;
    }

    (cp, wanted)
}

/// Whether `byte` is a UTF-8 continuation byte.
pub fn is_trail(byte: u8) -> bool {
    (byte >> 6) == 0b10
}

/// Byte offset of the code point preceding `pos`, or `None` at the start.
pub fn prev_boundary(bytes: &[u8], pos: usize) -> Option<usize> {
    if pos == 0 || pos > bytes.len() {
        return None;
    }
    let mut p = pos;
    loop {
        p -= 1;
        if !is_trail(bytes[p]) {
            return Some(p);
        }
        if p == 0 {
            return None;
        }
    }
}

/// One decoded code point plus its position within the current line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePointEvent {
    /// Decoded scalar value; 0 for malformed input, `'\n'` for line breaks
    /// (including a collapsed `\r\n`).
    pub code_point: u32,
    /// True when this event terminates a line.
    pub is_newline: bool,
    /// Byte span of the current line. For newline events this excludes the
    /// line terminator; otherwise it covers the line up to and including
    /// this code point.
    pub line: Range<usize>,
    /// Byte span of this code point. Empty only for the trailing empty-line
    /// event emitted when the buffer ends exactly on a newline.
    pub bytes: Range<usize>,
}

impl CodePointEvent {
    pub fn byte_len(&self) -> usize {
        self.bytes.end - self.bytes.start
    }
}

/// Lazy forward-only stream of [`CodePointEvent`]s over a byte buffer.
///
/// Not restartable: a fresh stream must be created to decode again. When
/// `use_crlf` is set, `\r\n` collapses into a single newline event; a lone
/// `\r` is then an ordinary code point.
pub struct CodePointStream<'a> {
    bytes: &'a [u8],
    pos: usize,
    line_start: usize,
    use_crlf: bool,
    pending_final_line: bool,
}

impl<'a> CodePointStream<'a> {
    pub fn new(bytes: &'a [u8], use_crlf: bool) -> Self {
        Self {
            bytes,
            pos: 0,
            line_start: 0,
            use_crlf,
            pending_final_line: false,
        }
    }
}

impl Iterator for CodePointStream<'_> {
    type Item = CodePointEvent;

    fn next(&mut self) -> Option<CodePointEvent> {
        if self.pending_final_line {
            // The buffer ended exactly on a newline: emit the trailing empty
            // final line so consumers see every line boundary.
            self.pending_final_line = false;
            let end = self.bytes.len();
            return Some(CodePointEvent {
                code_point: u32::from('\n'),
                is_newline: true,
                line: end..end,
                bytes: end..end,
            });
        }
        if self.pos >= self.bytes.len() {
            return None;
        }

        let decode_start = self.pos;
        let (mut cp, mut step) = decode(&self.bytes[self.pos..]);

        let new_line = if self.use_crlf && cp == u32::from('\r') {
            let rest = &self.bytes[self.pos + step..];
            if !rest.is_empty() {
                let (next_cp, next_step) = decode(rest);
                if next_cp == u32::from('\n') {
                    step += next_step;
                    cp = next_cp;
                    true
                } else {
                    false
                }
            } else {
                false
            }
        } else {
            cp == u32::from('\n')
        };

        if new_line {
            let line = self.line_start..decode_start;
            let bytes = decode_start..decode_start + step;
            self.pos += step;
            self.line_start = self.pos;
            if self.pos == self.bytes.len() {
                self.pending_final_line = true;
            }
            Some(CodePointEvent {
                code_point: cp,
                is_newline: true,
                line,
                bytes,
            })
        } else {
            self.pos += step;
            Some(CodePointEvent {
                code_point: cp,
                is_newline: false,
                line: self.line_start..self.pos,
                bytes: decode_start..self.pos,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> (Vec<u32>, usize) {
        let mut cps = Vec::new();
        let mut consumed = 0;
        while consumed < bytes.len() {
            let (cp, step) = decode(&bytes[consumed..]);
            cps.push(cp);
            consumed += step;
        }
        (cps, consumed)
    }

    #[test]
    fn round_trip_valid_utf8() {
        let text = "héllo wörld 🦀 漢字\n";
        let (cps, consumed) = decode_all(text.as_bytes());
        assert_eq!(consumed, text.len());
        let rebuilt: String = cps
            .iter()
            .map(|&cp| char::from_u32(cp).expect("valid scalar"))
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn recovery_skips_overlong_sequence() {
        // 0xC0 0x80 is an overlong encoding of NUL. The branchless decoder
        // consumes the whole two-byte sequence as one error.
        let (cps, consumed) = decode_all(b"A\xC0\x80B");
        assert_eq!(consumed, 4);
        assert_eq!(cps, vec![u32::from('A'), 0, u32::from('B')]);
    }

    #[test]
    fn recovery_rejects_surrogate_half() {
        // 0xED 0xA0 0x80 encodes U+D800 (UTF-16 surrogate).
        let (cps, consumed) = decode_all(b"\xED\xA0\x80");
        assert_eq!(consumed, 3);
        assert_eq!(cps, vec![0]);
    }

    #[test]
    fn recovery_lone_continuation_byte() {
        let (cps, consumed) = decode_all(b"\x80z");
        assert_eq!(consumed, 2);
        assert_eq!(cps, vec![0, u32::from('z')]);
    }

    #[test]
    fn recovery_truncated_tail_makes_progress() {
        // 0xE2 declares a 3-byte sequence but the buffer ends after 1 byte.
        let (cps, consumed) = decode_all(b"\xE2");
        assert_eq!(consumed, 1);
        assert_eq!(cps, vec![0]);
    }

    #[test]
    fn stream_splits_lines() {
        let events: Vec<_> = CodePointStream::new(b"ab\ncd", false).collect();
        assert_eq!(events.len(), 5);
        let nl = &events[2];
        assert!(nl.is_newline);
        assert_eq!(nl.line, 0..2);
        assert_eq!(nl.bytes, 2..3);
        // `cd` opens the next line.
        assert_eq!(events[3].line, 3..4);
        assert_eq!(events[4].line, 3..5);
    }

    #[test]
    fn stream_trailing_newline_emits_empty_final_line() {
        let events: Vec<_> = CodePointStream::new(b"x\n", false).collect();
        assert_eq!(events.len(), 3);
        assert!(events[1].is_newline);
        let last = &events[2];
        assert!(last.is_newline);
        assert_eq!(last.byte_len(), 0);
        assert_eq!(last.line, 2..2);
    }

    #[test]
    fn stream_collapses_crlf() {
        let events: Vec<_> = CodePointStream::new(b"a\r\nb", true).collect();
        assert_eq!(events.len(), 3);
        assert!(events[1].is_newline);
        assert_eq!(events[1].bytes, 1..3);
        assert_eq!(events[2].code_point, u32::from('b'));
    }

    #[test]
    fn stream_keeps_cr_and_lf_separate_without_crlf_mode() {
        let events: Vec<_> = CodePointStream::new(b"a\r\nb", false).collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].code_point, u32::from('\r'));
        assert!(!events[1].is_newline);
        assert!(events[2].is_newline);
    }

    #[test]
    fn stream_lone_cr_is_not_a_newline_in_crlf_mode() {
        let events: Vec<_> = CodePointStream::new(b"a\rb", true).collect();
        assert_eq!(events.len(), 3);
        assert!(!events[1].is_newline);
        assert_eq!(events[1].code_point, u32::from('\r'));
    }

    #[test]
    fn prev_boundary_steps_over_multibyte() {
        let text = "a€b";
        let bytes = text.as_bytes();
        assert_eq!(prev_boundary(bytes, bytes.len()), Some(4));
        assert_eq!(prev_boundary(bytes, 4), Some(1));
        assert_eq!(prev_boundary(bytes, 1), Some(0));
        assert_eq!(prev_boundary(bytes, 0), None);
    }
}
