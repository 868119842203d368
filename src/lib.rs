//! caTTY escape-sequence engine
//!
//! The protocol half of an embedded terminal: bytes in, structured terminal
//! operations out. This crate provides:
//!
//! - `parser`: streaming VT/xterm escape sequence parser
//! - `core`: graphic rendition state and SGR translation
//! - `osc`: OSC payload dispatch
//! - `rpc`: private host/terminal RPC over `CSI >` frames
//! - `session`: one of each, wired together for a host
//!
//! Rendering, PTY management and input handling live elsewhere.
//!
//! ```no_run
//! use catty::{EngineConfig, Output, Session};
//!
//! let mut session = Session::new(EngineConfig::default())?;
//! for output in session.feed(b"\x1b[1mhello\x1b[0m") {
//!     if let Output::Text(run) = output {
//!         println!("{} bold={}", run.text, run.attrs.bold);
//!     }
//! }
//! # Ok::<(), catty::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod osc;
pub mod parser;
pub mod rpc;
pub mod session;

pub use config::{EngineConfig, OscConfig, ParserConfig, RpcConfig, UnknownOscPolicy};
pub use core::{Color, ColorSlot, GraphicRenditionState, SgrCommand, UnderlineStyle};
pub use diagnostics::{Diagnostics, ParseStats, RpcStats};
pub use error::{Error, Result, RpcError};
pub use osc::{OscCommand, OscDispatcher, OscEvent};
pub use parser::{Action, Parser, ParserState};
pub use rpc::{QueryHandle, Responder, RpcClient, RpcFrame, RpcFrameType};
pub use session::{Output, Session, SessionSnapshot, TextRun};
