//! Actions produced by the parser
//!
//! Every completed sequence is resolved once into one of these variants, so
//! consumers match exhaustively instead of re-inspecting final bytes.

use crate::core::SgrCommand;
use crate::osc::OscCommand;
use crate::parser::params::Params;
use crate::parser::scanner::ControlCode;
use crate::rpc::RpcSequence;

/// Actions produced by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print a character
    Print(char),

    /// Execute a meaningful C0 control
    Control(ControlCode),

    /// ESC sequence (non-CSI)
    Esc(EscAction),

    /// `CSI ... m`, already translated
    Sgr(Vec<SgrCommand>),

    /// Cursor positioning CSI
    Cursor(CursorMove),

    /// Erase CSI
    Erase(Erase),

    /// Any other CSI, parsed structurally
    Csi(CsiAction),

    /// Completed OSC string
    Osc(OscCommand),

    /// `CSI > ... F|Q|R|E`, not yet validated
    Rpc(RpcSequence),
}

/// ESC sequence actions (non-CSI)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscAction {
    /// ESC 7 - Save cursor (DECSC)
    SaveCursor,
    /// ESC 8 - Restore cursor (DECRC)
    RestoreCursor,
    /// ESC D - Index (IND)
    Index,
    /// ESC M - Reverse Index (RI)
    ReverseIndex,
    /// ESC E - Next Line (NEL)
    NextLine,
    /// ESC H - Horizontal Tab Set (HTS)
    HorizontalTabSet,
    /// ESC c - Full Reset (RIS)
    FullReset,
    /// ESC = - Application Keypad Mode (DECKPAM)
    ApplicationKeypad,
    /// ESC > - Normal Keypad Mode (DECKPNM)
    NormalKeypad,
    /// ESC ( C - Designate G0 Character Set
    DesignateG0(char),
    /// ESC ) C - Designate G1 Character Set
    DesignateG1(char),
    /// ESC * C - Designate G2 Character Set
    DesignateG2(char),
    /// ESC + C - Designate G3 Character Set
    DesignateG3(char),
    /// ESC # 8 - DEC Screen Alignment Test (DECALN)
    DecAlignmentTest,
    /// Unknown ESC sequence
    Unknown(Vec<u8>),
}

/// Cursor movement, 1-based as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// CUU
    Up(u32),
    /// CUD
    Down(u32),
    /// CUF
    Forward(u32),
    /// CUB
    Backward(u32),
    /// CNL
    NextLine(u32),
    /// CPL
    PreviousLine(u32),
    /// CHA
    Column(u32),
    /// VPA
    Row(u32),
    /// CUP / HVP
    Position { row: u32, col: u32 },
}

/// Which part of a line or display to erase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    ToEnd,
    ToStart,
    All,
    /// ED 3 only
    Scrollback,
}

/// Erase operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Erase {
    /// ED
    Display(EraseMode),
    /// EL
    Line(EraseMode),
    /// ECH
    Chars(u32),
}

/// CSI sequence not resolved into a dedicated variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiAction {
    /// Parameters (semicolon-separated numbers)
    pub params: Params,
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Final byte (0x40-0x7E)
    pub final_byte: u8,
    /// Marker right after `[`: `?`, `>`, `<` or `=`
    pub marker: Option<u8>,
}

impl CsiAction {
    /// Get a parameter, with a default for absent or 0
    pub fn param(&self, index: usize, default: u32) -> u32 {
        self.params.get_or(index, default)
    }

    /// Check if this is a specific plain CSI sequence
    pub fn is(&self, final_byte: u8) -> bool {
        self.final_byte == final_byte && self.intermediates.is_empty() && self.marker.is_none()
    }

    /// Check if this is a specific DEC private (`?`) sequence
    pub fn is_private(&self, final_byte: u8) -> bool {
        self.final_byte == final_byte
            && self.intermediates.is_empty()
            && self.marker == Some(b'?')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csi(values: &[u32], final_byte: u8, marker: Option<u8>) -> CsiAction {
        CsiAction {
            params: Params::from_slice(values),
            intermediates: vec![],
            final_byte,
            marker,
        }
    }

    #[test]
    fn test_csi_action_param() {
        let action = csi(&[10, 0], b'r', None);
        assert_eq!(action.param(0, 1), 10);
        assert_eq!(action.param(1, 24), 24);
        assert_eq!(action.param(5, 99), 99);
    }

    #[test]
    fn test_csi_action_is() {
        let plain = csi(&[], b'n', None);
        assert!(plain.is(b'n'));
        assert!(!plain.is(b'h'));
        assert!(!plain.is_private(b'n'));

        let private = csi(&[25], b'h', Some(b'?'));
        assert!(private.is_private(b'h'));
        assert!(!private.is(b'h'));
    }
}
