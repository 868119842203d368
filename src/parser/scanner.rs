//! Byte classification
//!
//! The scanner looks at one byte and the context it arrived in and says
//! what kind of input unit it is. It never fails: every byte has a class.

/// Where the parser stands when a byte arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanContext {
    /// Plain text
    Ground,
    /// Right after ESC
    Escape,
    /// Inside a CSI sequence
    Sequence,
    /// Inside an OSC payload
    String,
}

/// Kind of input unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// Text, a sequence parameter/final byte, or payload
    Printable,
    /// C0 control (0x00-0x1F except ESC) or DEL
    C0Control,
    /// ESC (0x1B)
    Esc,
    /// `[` after ESC
    CsiIntroducer,
    /// `]` after ESC
    OscIntroducer,
    /// BEL inside a string, or `\` after ESC
    StringTerminator,
}

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;
const DEL: u8 = 0x7F;

/// CAN and SUB cancel a sequence without it counting as malformed
pub const CAN: u8 = 0x18;
pub const SUB: u8 = 0x1A;

/// Classify `byte` in `context`
#[inline]
pub fn classify(byte: u8, context: ScanContext) -> ByteClass {
    if byte == ESC {
        return ByteClass::Esc;
    }
    match context {
        ScanContext::String if byte == BEL => ByteClass::StringTerminator,
        ScanContext::String if byte < 0x20 => ByteClass::C0Control,
        ScanContext::String => ByteClass::Printable,
        ScanContext::Escape => match byte {
            b'[' => ByteClass::CsiIntroducer,
            b']' => ByteClass::OscIntroducer,
            b'\\' => ByteClass::StringTerminator,
            _ => control_or_printable(byte),
        },
        ScanContext::Ground | ScanContext::Sequence => control_or_printable(byte),
    }
}

#[inline]
fn control_or_printable(byte: u8) -> ByteClass {
    if byte < 0x20 || byte == DEL {
        ByteClass::C0Control
    } else {
        ByteClass::Printable
    }
}

/// True for the bytes that cancel a sequence silently
pub fn is_cancel(byte: u8) -> bool {
    byte == CAN || byte == SUB
}

/// C0 controls that mean something outside escape sequences.
/// Everything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    /// BEL - Bell
    Bell,
    /// BS - Backspace
    Backspace,
    /// HT - Horizontal Tab
    Tab,
    /// LF - Line Feed (VT and FF fold into this)
    LineFeed,
    /// CR - Carriage Return
    CarriageReturn,
}

impl ControlCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x07 => Some(ControlCode::Bell),
            0x08 => Some(ControlCode::Backspace),
            0x09 => Some(ControlCode::Tab),
            0x0A..=0x0C => Some(ControlCode::LineFeed),
            0x0D => Some(ControlCode::CarriageReturn),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            ControlCode::Bell => 0x07,
            ControlCode::Backspace => 0x08,
            ControlCode::Tab => 0x09,
            ControlCode::LineFeed => 0x0A,
            ControlCode::CarriageReturn => 0x0D,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground() {
        assert_eq!(classify(b'A', ScanContext::Ground), ByteClass::Printable);
        assert_eq!(classify(0xE4, ScanContext::Ground), ByteClass::Printable);
        assert_eq!(classify(0x0A, ScanContext::Ground), ByteClass::C0Control);
        assert_eq!(classify(0x7F, ScanContext::Ground), ByteClass::C0Control);
        assert_eq!(classify(0x1B, ScanContext::Ground), ByteClass::Esc);
        // Introducers only count after ESC
        assert_eq!(classify(b'[', ScanContext::Ground), ByteClass::Printable);
    }

    #[test]
    fn test_after_escape() {
        assert_eq!(classify(b'[', ScanContext::Escape), ByteClass::CsiIntroducer);
        assert_eq!(classify(b']', ScanContext::Escape), ByteClass::OscIntroducer);
        assert_eq!(classify(b'\\', ScanContext::Escape), ByteClass::StringTerminator);
        assert_eq!(classify(b'7', ScanContext::Escape), ByteClass::Printable);
    }

    #[test]
    fn test_string() {
        assert_eq!(classify(0x07, ScanContext::String), ByteClass::StringTerminator);
        assert_eq!(classify(b';', ScanContext::String), ByteClass::Printable);
        assert_eq!(classify(b'[', ScanContext::String), ByteClass::Printable);
        assert_eq!(classify(0x0A, ScanContext::String), ByteClass::C0Control);
        assert_eq!(classify(0x1B, ScanContext::String), ByteClass::Esc);
    }

    #[test]
    fn test_bel_outside_string_is_control() {
        assert_eq!(classify(0x07, ScanContext::Ground), ByteClass::C0Control);
        assert_eq!(classify(0x07, ScanContext::Sequence), ByteClass::C0Control);
    }

    #[test]
    fn test_control_policy() {
        assert_eq!(ControlCode::from_byte(0x07), Some(ControlCode::Bell));
        assert_eq!(ControlCode::from_byte(0x0C), Some(ControlCode::LineFeed));
        assert_eq!(ControlCode::from_byte(0x00), None);
        assert_eq!(ControlCode::from_byte(0x0E), None);
        assert_eq!(ControlCode::CarriageReturn.as_byte(), 0x0D);
        assert!(is_cancel(0x18));
        assert!(!is_cancel(0x0A));
    }
}
