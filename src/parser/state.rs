//! Parser State Machine
//!
//! A reduced VT500-series state machine. The parser handles arbitrary chunk
//! boundaries: all state lives in the struct, so feeding one byte per call
//! dispatches exactly what feeding the whole stream at once would.
//!
//! States:
//! - Ground: Normal text processing
//! - Escape: After ESC, waiting for the next byte
//! - CsiParam: After `ESC [`, collecting marker, parameters, intermediates
//! - OscString: After `ESC ]`, collecting the payload
//!
//! Faults never escape: a C0 control in the middle of a sequence cancels it
//! and is then handled as if it arrived in Ground, and a sequence that
//! outgrows the configured limits is dropped. Both are counted in
//! [`ParseStats`].
//!
//! Reference: https://vt100.net/emu/dec_ansi_parser

use serde::{Deserialize, Serialize};

use crate::config::ParserConfig;
use crate::core::sgr;
use crate::diagnostics::ParseStats;
use crate::osc::OscCommand;
use crate::parser::action::{Action, CsiAction, CursorMove, Erase, EraseMode, EscAction};
use crate::parser::params::{Params, ParamsBuilder};
use crate::parser::scanner::{self, ByteClass, ControlCode, ScanContext};
use crate::parser::utf8::{Utf8Decoder, Utf8Result, REPLACEMENT_CHAR};
use crate::rpc::{RpcFrameType, RpcSequence};

/// Maximum length for intermediate bytes
const MAX_INTERMEDIATES: usize = 4;

/// Why the rest of a sequence is being swallowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    Malformed,
    Overflow,
}

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParserState {
    /// Normal text processing
    Ground,
    /// After ESC
    Escape,
    /// Collecting CSI parameters
    CsiParam,
    /// After ESC ]
    OscString,
}

/// The escape-sequence parser
#[derive(Debug, Clone)]
pub struct Parser {
    state: ParserState,
    limits: ParserConfig,
    utf8: Utf8Decoder,
    /// CSI parameters being collected
    params: ParamsBuilder,
    /// CSI intermediate bytes
    intermediates: Vec<u8>,
    /// Marker byte right after `[`
    marker: Option<u8>,
    /// Bytes seen since `ESC [`
    sequence_len: usize,
    /// Current sequence is invalid, consume until it ends
    discard: Option<Discard>,
    /// Pending ESC intermediate (charset designation, `#`)
    esc_intermediate: Option<u8>,
    /// OSC payload
    osc_data: Vec<u8>,
    stats: ParseStats,
}

impl Parser {
    /// Create a parser with default limits
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(limits: ParserConfig) -> Self {
        Self {
            state: ParserState::Ground,
            limits,
            utf8: Utf8Decoder::new(),
            params: ParamsBuilder::new(limits.max_params),
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            marker: None,
            sequence_len: 0,
            discard: None,
            esc_intermediate: None,
            osc_data: Vec::with_capacity(256),
            stats: ParseStats::default(),
        }
    }

    /// Get current parser state
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True while inside `CSI >`, i.e. an RPC frame is being assembled
    pub fn private_marker(&self) -> bool {
        self.state == ParserState::CsiParam && self.marker == Some(b'>')
    }

    /// Faults absorbed so far
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Reset parser to ground state, dropping any partial sequence
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.utf8.reset();
        self.clear_sequence();
    }

    /// Parse a chunk of bytes, calling the callback for each action
    pub fn parse<F>(&mut self, data: &[u8], mut callback: F)
    where
        F: FnMut(Action),
    {
        for &byte in data {
            self.advance(byte, &mut callback);
        }
    }

    /// Parse a chunk and collect actions into a vector
    pub fn parse_collect(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse(data, |action| actions.push(action));
        actions
    }

    /// Advance the parser by one byte
    fn advance<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match self.state {
            ParserState::Ground => self.handle_ground(byte, callback),
            ParserState::Escape => self.handle_escape(byte, callback),
            ParserState::CsiParam => self.handle_csi(byte, callback),
            ParserState::OscString => self.handle_osc(byte, callback),
        }
    }

    fn handle_ground<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        if self.utf8.is_pending() {
            if byte & 0xC0 == 0x80 {
                self.feed_utf8(byte, callback);
                return;
            }
            // Truncated character; the byte that cut it short starts afresh
            self.utf8.reset();
            callback(Action::Print(REPLACEMENT_CHAR));
        }

        match scanner::classify(byte, ScanContext::Ground) {
            ByteClass::Printable if byte < 0x80 => callback(Action::Print(char::from(byte))),
            ByteClass::Printable => self.feed_utf8(byte, callback),
            ByteClass::Esc => self.enter_escape(),
            ByteClass::C0Control => match ControlCode::from_byte(byte) {
                Some(code) => callback(Action::Control(code)),
                None => self.stats.dropped_controls += 1,
            },
            // Introducers and terminators only exist after ESC or in strings
            ByteClass::CsiIntroducer | ByteClass::OscIntroducer | ByteClass::StringTerminator => {}
        }
    }

    fn feed_utf8<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match self.utf8.feed(byte) {
            Utf8Result::Char(c) => callback(Action::Print(c)),
            Utf8Result::Invalid => callback(Action::Print(REPLACEMENT_CHAR)),
            Utf8Result::Pending => {}
        }
    }

    fn enter_escape(&mut self) {
        self.clear_sequence();
        self.state = ParserState::Escape;
    }

    fn handle_escape<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        let class = scanner::classify(byte, ScanContext::Escape);

        if byte == 0x7F {
            return;
        }

        if let Some(intermediate) = self.esc_intermediate {
            match byte {
                0x30..=0x7E => {
                    self.state = ParserState::Ground;
                    self.esc_intermediate = None;
                    callback(Action::Esc(esc_with_intermediate(intermediate, byte)));
                }
                _ if matches!(class, ByteClass::C0Control | ByteClass::Esc) => {
                    self.interrupt(byte, callback)
                }
                _ => self.abort("invalid byte after ESC intermediate"),
            }
            return;
        }

        match class {
            ByteClass::CsiIntroducer => {
                self.clear_sequence();
                self.state = ParserState::CsiParam;
            }
            ByteClass::OscIntroducer => {
                self.clear_sequence();
                self.state = ParserState::OscString;
            }
            // ST with no string open
            ByteClass::StringTerminator => self.state = ParserState::Ground,
            ByteClass::Esc | ByteClass::C0Control => self.interrupt(byte, callback),
            ByteClass::Printable => match byte {
                0x20..=0x2F => self.esc_intermediate = Some(byte),
                0x30..=0x7E => {
                    self.state = ParserState::Ground;
                    callback(Action::Esc(esc_final(byte)));
                }
                _ => self.abort("non-ASCII byte after ESC"),
            },
        }
    }

    fn handle_csi<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        let class = scanner::classify(byte, ScanContext::Sequence);
        if matches!(class, ByteClass::Esc | ByteClass::C0Control) {
            // DEL is ignored inside sequences
            if byte != 0x7F {
                self.interrupt(byte, callback);
            }
            return;
        }

        self.sequence_len += 1;
        if self.sequence_len > self.limits.max_sequence_len {
            self.overflow("CSI longer than max_sequence_len");
            return;
        }

        match byte {
            0x40..=0x7E => {
                self.state = ParserState::Ground;
                match self.discard {
                    Some(reason) => {
                        self.count_discard(reason);
                        tracing::debug!(?reason, "Discarding CSI ending in {:?}", char::from(byte));
                        self.clear_sequence();
                    }
                    None => self.dispatch_csi(byte, callback),
                }
            }
            _ if self.discard.is_some() => {}
            b'0'..=b'9' if self.intermediates.is_empty() => self.params.digit(byte),
            b';' | b':' if self.intermediates.is_empty() => {
                let within_limit = if byte == b';' {
                    self.params.next_param()
                } else {
                    self.params.next_subparam()
                };
                if !within_limit {
                    self.discard = Some(Discard::Overflow);
                }
            }
            b'<' | b'=' | b'>' | b'?' if self.sequence_len == 1 => self.marker = Some(byte),
            0x20..=0x2F if self.intermediates.len() < MAX_INTERMEDIATES => {
                self.intermediates.push(byte)
            }
            // Marker out of place, parameter after intermediate, non-ASCII
            _ => self.discard = Some(Discard::Malformed),
        }
    }

    fn dispatch_csi<F>(&mut self, final_byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        let Some(params) = self.params.finish() else {
            self.overflow("CSI has more than max_params parameters");
            return;
        };
        let intermediates = std::mem::take(&mut self.intermediates);
        let marker = self.marker.take();

        let rpc = match (marker, intermediates.is_empty()) {
            (Some(b'>'), true) => RpcFrameType::from_final(final_byte),
            _ => None,
        };
        if let Some(frame_type) = rpc {
            tracing::trace!(?frame_type, "RPC frame");
            callback(Action::Rpc(RpcSequence::new(params, frame_type)));
            return;
        }

        let action = match (marker, intermediates.is_empty(), final_byte) {
            (None, true, b'm') => {
                let translation = sgr::translate(&params);
                self.stats.unsupported_sgr += translation.unsupported as u64;
                Action::Sgr(translation.commands)
            }
            (None, true, _) => match resolve_plain_csi(&params, final_byte) {
                Some(action) => action,
                None => Action::Csi(CsiAction {
                    params,
                    intermediates,
                    final_byte,
                    marker,
                }),
            },
            _ => Action::Csi(CsiAction {
                params,
                intermediates,
                final_byte,
                marker,
            }),
        };
        tracing::trace!(?action, "CSI dispatch");
        callback(action);
    }

    fn handle_osc<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        match scanner::classify(byte, ScanContext::String) {
            ByteClass::StringTerminator => {
                self.state = ParserState::Ground;
                self.finish_osc(callback);
            }
            ByteClass::Esc => {
                // ESC \ - the backslash is consumed by the Escape state
                self.finish_osc(callback);
                self.state = ParserState::Escape;
            }
            ByteClass::C0Control => self.interrupt(byte, callback),
            _ if self.osc_data.len() >= self.limits.max_osc_len => {
                self.overflow("OSC longer than max_osc_len");
            }
            _ => self.osc_data.push(byte),
        }
    }

    fn finish_osc<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Action),
    {
        let data = std::mem::take(&mut self.osc_data);
        let (kind, payload) = match data.iter().position(|&b| b == b';') {
            Some(sep) => (&data[..sep], &data[sep + 1..]),
            None => (&data[..], &[][..]),
        };

        let kind = std::str::from_utf8(kind)
            .ok()
            .filter(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|k| k.parse::<u32>().ok());

        match kind {
            Some(kind) => {
                let command = OscCommand {
                    kind,
                    payload: String::from_utf8_lossy(payload).into_owned(),
                };
                tracing::trace!(kind, "OSC dispatch");
                callback(Action::Osc(command));
            }
            None => {
                self.stats.malformed += 1;
                tracing::debug!("Discarding OSC without numeric kind");
            }
        }
        self.osc_data = data;
        self.osc_data.clear();
    }

    /// A control byte arrived in the middle of a sequence.
    ///
    /// CAN and SUB just cancel. Anything else counts as malformed and is then
    /// processed as if in Ground, so a stray LF still moves the cursor and a
    /// new ESC starts a new sequence.
    fn interrupt<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Action),
    {
        if scanner::is_cancel(byte) {
            self.state = ParserState::Ground;
            self.clear_sequence();
            return;
        }
        self.abort("control byte inside sequence");
        self.handle_ground(byte, callback);
    }

    fn abort(&mut self, reason: &str) {
        self.stats.malformed += 1;
        tracing::debug!("Discarding malformed sequence: {}", reason);
        self.state = ParserState::Ground;
        self.clear_sequence();
    }

    fn count_discard(&mut self, reason: Discard) {
        match reason {
            Discard::Malformed => self.stats.malformed += 1,
            Discard::Overflow => self.stats.overflowed += 1,
        }
    }

    fn overflow(&mut self, reason: &str) {
        self.stats.overflowed += 1;
        tracing::debug!("Discarding sequence: {}", reason);
        self.state = ParserState::Ground;
        self.clear_sequence();
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.marker = None;
        self.sequence_len = 0;
        self.discard = None;
        self.esc_intermediate = None;
        self.osc_data.clear();
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn esc_final(byte: u8) -> EscAction {
    match byte {
        b'7' => EscAction::SaveCursor,
        b'8' => EscAction::RestoreCursor,
        b'D' => EscAction::Index,
        b'M' => EscAction::ReverseIndex,
        b'E' => EscAction::NextLine,
        b'H' => EscAction::HorizontalTabSet,
        b'c' => EscAction::FullReset,
        b'=' => EscAction::ApplicationKeypad,
        b'>' => EscAction::NormalKeypad,
        _ => EscAction::Unknown(vec![byte]),
    }
}

fn esc_with_intermediate(intermediate: u8, final_byte: u8) -> EscAction {
    let c = char::from(final_byte);
    match (intermediate, final_byte) {
        (b'(', _) => EscAction::DesignateG0(c),
        (b')', _) => EscAction::DesignateG1(c),
        (b'*', _) => EscAction::DesignateG2(c),
        (b'+', _) => EscAction::DesignateG3(c),
        (b'#', b'8') => EscAction::DecAlignmentTest,
        _ => EscAction::Unknown(vec![intermediate, final_byte]),
    }
}

/// Cursor and erase finals get their own variants
fn resolve_plain_csi(params: &Params, final_byte: u8) -> Option<Action> {
    let n = params.get_or(0, 1);
    let action = match final_byte {
        b'A' => Action::Cursor(CursorMove::Up(n)),
        b'B' => Action::Cursor(CursorMove::Down(n)),
        b'C' => Action::Cursor(CursorMove::Forward(n)),
        b'D' => Action::Cursor(CursorMove::Backward(n)),
        b'E' => Action::Cursor(CursorMove::NextLine(n)),
        b'F' => Action::Cursor(CursorMove::PreviousLine(n)),
        b'G' => Action::Cursor(CursorMove::Column(n)),
        b'd' => Action::Cursor(CursorMove::Row(n)),
        b'H' | b'f' => Action::Cursor(CursorMove::Position {
            row: n,
            col: params.get_or(1, 1),
        }),
        b'J' => Action::Erase(Erase::Display(erase_mode(params.raw(0), true)?)),
        b'K' => Action::Erase(Erase::Line(erase_mode(params.raw(0), false)?)),
        b'X' => Action::Erase(Erase::Chars(n)),
        _ => return None,
    };
    Some(action)
}

fn erase_mode(mode: u32, display: bool) -> Option<EraseMode> {
    match mode {
        0 => Some(EraseMode::ToEnd),
        1 => Some(EraseMode::ToStart),
        2 => Some(EraseMode::All),
        3 if display => Some(EraseMode::Scrollback),
        _ => None,
    }
}
