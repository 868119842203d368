//! Streaming UTF-8 decoding for printable text
//!
//! Characters may arrive split across any number of `feed` calls.

/// Replacement for invalid input
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// UTF-8 decoder state
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    /// Code point bits collected so far
    code_point: u32,
    /// Continuation bytes still expected
    remaining: u8,
    /// Smallest code point the current lead byte may encode
    min: u32,
}

/// Result of feeding a byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    /// Successfully decoded a character
    Char(char),
    /// Invalid sequence
    Invalid,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.code_point = 0;
        self.remaining = 0;
        self.min = 0;
    }

    /// Check if decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    /// Feed a byte to the decoder
    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        if self.remaining == 0 {
            return self.lead(byte);
        }

        if byte & 0xC0 != 0x80 {
            self.reset();
            return Utf8Result::Invalid;
        }

        self.code_point = (self.code_point << 6) | u32::from(byte & 0x3F);
        self.remaining -= 1;
        if self.remaining > 0 {
            return Utf8Result::Pending;
        }

        let (code_point, min) = (self.code_point, self.min);
        self.reset();
        // Overlong encodings and surrogates are rejected by these two checks
        if code_point < min {
            return Utf8Result::Invalid;
        }
        char::from_u32(code_point).map_or(Utf8Result::Invalid, Utf8Result::Char)
    }

    fn lead(&mut self, byte: u8) -> Utf8Result {
        let (bits, remaining, min) = match byte {
            0x00..=0x7F => return Utf8Result::Char(char::from(byte)),
            0xC0..=0xDF => (byte & 0x1F, 1, 0x80),
            0xE0..=0xEF => (byte & 0x0F, 2, 0x800),
            0xF0..=0xF7 => (byte & 0x07, 3, 0x1_0000),
            _ => return Utf8Result::Invalid,
        };
        self.code_point = u32::from(bits);
        self.remaining = remaining;
        self.min = min;
        Utf8Result::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Utf8Result> {
        let mut decoder = Utf8Decoder::new();
        bytes.iter().map(|&b| decoder.feed(b)).collect()
    }

    #[test]
    fn test_ascii() {
        assert_eq!(decode(b"Az"), [Utf8Result::Char('A'), Utf8Result::Char('z')]);
    }

    #[test]
    fn test_multibyte() {
        // 'é' = 0xC3 0xA9
        assert_eq!(decode(&[0xC3, 0xA9])[1], Utf8Result::Char('é'));
        // '中' = 0xE4 0xB8 0xAD
        assert_eq!(decode(&[0xE4, 0xB8, 0xAD])[2], Utf8Result::Char('中'));
        // '😀' = 0xF0 0x9F 0x98 0x80
        assert_eq!(decode(&[0xF0, 0x9F, 0x98, 0x80])[3], Utf8Result::Char('😀'));
    }

    #[test]
    fn test_invalid_start() {
        assert_eq!(decode(&[0xFF]), [Utf8Result::Invalid]);
        assert_eq!(decode(&[0x80]), [Utf8Result::Invalid]);
    }

    #[test]
    fn test_invalid_continuation() {
        assert_eq!(decode(&[0xC3, 0x41]), [Utf8Result::Pending, Utf8Result::Invalid]);
    }

    #[test]
    fn test_overlong_and_surrogate() {
        assert_eq!(decode(&[0xC1, 0x81])[1], Utf8Result::Invalid);
        // U+D800 encoded directly
        assert_eq!(decode(&[0xED, 0xA0, 0x80])[2], Utf8Result::Invalid);
        // Beyond U+10FFFF
        assert_eq!(decode(&[0xF4, 0x90, 0x80, 0x80])[3], Utf8Result::Invalid);
    }

    #[test]
    fn test_reset() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(0xC3), Utf8Result::Pending);
        assert!(decoder.is_pending());
        decoder.reset();
        assert!(!decoder.is_pending());
    }
}
