//! Escape sequence parser
//!
//! A stateful, streaming parser that converts bytes into [`Action`]s.
//! Based on the VT500-series parser model from <https://vt100.net/emu/dec_ansi_parser>

mod action;
pub mod params;
pub mod scanner;
mod state;
mod utf8;

pub use action::{Action, CsiAction, CursorMove, Erase, EraseMode, EscAction};
pub use params::Params;
pub use scanner::{classify, ByteClass, ControlCode, ScanContext};
pub use state::{Parser, ParserState};
pub use utf8::REPLACEMENT_CHAR;
