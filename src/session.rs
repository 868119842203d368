//! Session
//!
//! One parser, one rendition, one OSC dispatcher and one RPC endpoint,
//! driven together. The host feeds raw bytes in and gets [`Output`]s back;
//! printable characters are grouped into runs that carry a copy of the
//! rendition they were printed with.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use crate::config::EngineConfig;
use crate::core::GraphicRenditionState;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, RpcError};
use crate::osc::{OscCommand, OscDispatcher, OscEvent};
use crate::parser::{
    Action, ControlCode, CsiAction, CursorMove, Erase, EscAction, Parser, ParserState,
};
use crate::rpc::{QueryHandle, Responder, RpcClient, RpcEndpoint, RpcFrame};

/// Printable text sharing one rendition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub attrs: GraphicRenditionState,
    /// Display width in cells
    pub width: usize,
}

impl TextRun {
    fn new(attrs: GraphicRenditionState) -> Self {
        Self {
            text: String::new(),
            attrs,
            width: 0,
        }
    }

    fn push(&mut self, c: char) {
        self.text.push(c);
        self.width += c.width().unwrap_or(0);
    }
}

/// What a session hands back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Text(TextRun),
    Control(ControlCode),
    Cursor(CursorMove),
    Erase(Erase),
    Esc(EscAction),
    /// CSI without a dedicated variant, e.g. modes and DA
    Csi(CsiAction),
    /// OSC 0 or 2
    Title(String),
    /// Any other OSC
    Osc(OscEvent),
}

/// Serializable view of a session for debugging and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub parser_state: ParserState,
    pub rendition: GraphicRenditionState,
    pub title: String,
    pub pending_queries: Vec<u16>,
    pub diagnostics: Diagnostics,
}

/// The engine's single entry point
#[derive(Debug)]
pub struct Session {
    parser: Parser,
    rendition: GraphicRenditionState,
    osc: OscDispatcher,
    rpc: RpcEndpoint,
    title: String,
    disposed: bool,
}

impl Session {
    /// Create a session. Starts the RPC timeout sweeper unless disabled.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let rpc = RpcEndpoint::new(&config.rpc)?;
        tracing::debug!(
            protocol_version = config.rpc.protocol_version,
            "Created session"
        );
        Ok(Self {
            parser: Parser::with_config(config.parser),
            rendition: GraphicRenditionState::new(),
            osc: OscDispatcher::new(config.osc),
            rpc,
            title: String::new(),
            disposed: false,
        })
    }

    /// Process a chunk of bytes and collect the outputs
    pub fn feed(&mut self, data: &[u8]) -> Vec<Output> {
        let mut outputs = Vec::new();
        self.feed_with(data, |output| outputs.push(output));
        outputs
    }

    /// Process a chunk of bytes, calling `sink` for each output in order
    pub fn feed_with<F>(&mut self, data: &[u8], mut sink: F)
    where
        F: FnMut(Output),
    {
        // Parse the whole chunk before applying it, so OSC and RPC handlers
        // run after parsing and may call back into the client freely
        let mut actions = Vec::new();
        self.parser.parse(data, |action| actions.push(action));

        let mut run: Option<TextRun> = None;
        for action in actions {
            match action {
                Action::Print(c) => {
                    let mut current = match run.take() {
                        Some(current) if current.attrs == self.rendition => current,
                        Some(previous) => {
                            sink(Output::Text(previous));
                            TextRun::new(self.rendition)
                        }
                        None => TextRun::new(self.rendition),
                    };
                    current.push(c);
                    run = Some(current);
                }
                // Rendition changes only split runs when text follows
                Action::Sgr(commands) => self.rendition.apply_all(commands),
                other => {
                    if let Some(previous) = run.take() {
                        sink(Output::Text(previous));
                    }
                    if let Some(output) = self.handle_action(other) {
                        sink(output);
                    }
                }
            }
        }
        if let Some(last) = run {
            sink(Output::Text(last));
        }
    }

    fn handle_action(&mut self, action: Action) -> Option<Output> {
        match action {
            Action::Control(code) => Some(Output::Control(code)),
            Action::Cursor(movement) => Some(Output::Cursor(movement)),
            Action::Erase(erase) => Some(Output::Erase(erase)),
            Action::Esc(esc) => {
                if esc == EscAction::FullReset {
                    self.rendition.reset();
                }
                Some(Output::Esc(esc))
            }
            Action::Csi(csi) => Some(Output::Csi(csi)),
            Action::Osc(command) => Some(self.handle_osc(command)),
            Action::Rpc(sequence) => {
                // Already counted and logged by the endpoint
                let _ = self.rpc.receive(&sequence);
                None
            }
            Action::Print(_) | Action::Sgr(_) => None,
        }
    }

    fn handle_osc(&mut self, command: OscCommand) -> Output {
        let event = self.osc.dispatch(command);
        match event.title() {
            Some(title) => {
                self.title = title.to_string();
                Output::Title(self.title.clone())
            }
            None => Output::Osc(event),
        }
    }

    /// Current rendition
    pub fn rendition(&self) -> &GraphicRenditionState {
        &self.rendition
    }

    /// Last title set by OSC 0 or 2
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parser_state(&self) -> ParserState {
        self.parser.state()
    }

    /// Register the handler for inbound command `command_id`
    pub fn on_command<F>(&mut self, command_id: u16, handler: F)
    where
        F: FnMut(&RpcFrame) + Send + 'static,
    {
        self.rpc.on_command(command_id, handler);
    }

    /// Register the handler for inbound query `command_id`
    pub fn on_query<F>(&mut self, command_id: u16, handler: F)
    where
        F: FnMut(&RpcFrame, Responder) + Send + 'static,
    {
        self.rpc.on_query(command_id, handler);
    }

    /// Register the handler for OSC `kind`
    pub fn on_osc<F>(&mut self, kind: u32, handler: F)
    where
        F: FnMut(&OscCommand) + Send + 'static,
    {
        self.osc.register(kind, handler);
    }

    /// Handle for sending from other threads
    pub fn rpc_client(&self) -> RpcClient {
        self.rpc.client()
    }

    pub fn send_command(&self, command_id: u16, params: &[u32]) -> std::result::Result<(), RpcError> {
        self.rpc.client().send_command(command_id, params)
    }

    pub fn send_query(&self, command_id: u16, params: &[u32]) -> std::result::Result<QueryHandle, RpcError> {
        self.rpc.client().send_query(command_id, params)
    }

    /// Take the encoded RPC frames waiting to go to the peer
    pub fn take_outgoing(&self) -> Vec<Vec<u8>> {
        self.rpc.outbox().take()
    }

    /// Unknown OSC commands held so far
    pub fn drain_unhandled_osc(&mut self) -> Vec<OscCommand> {
        self.osc.drain_unhandled()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            parse: *self.parser.stats(),
            rpc: *self.rpc.stats(),
            stored_osc: self.osc.stored_count(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            parser_state: self.parser.state(),
            rendition: self.rendition,
            title: self.title.clone(),
            pending_queries: self.rpc.client().pending_ids(),
            diagnostics: self.diagnostics(),
        }
    }

    /// Cancel pending queries and stop the sweeper. Idempotent; also runs
    /// on drop.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.rpc.close();
        tracing::debug!("Disposed session");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcConfig;
    use crate::core::{Color, UnderlineStyle};

    fn session() -> Session {
        let config = EngineConfig {
            rpc: RpcConfig {
                sweep_interval_ms: 0,
                ..RpcConfig::default()
            },
            ..EngineConfig::default()
        };
        Session::new(config).unwrap()
    }

    fn texts(outputs: &[Output]) -> Vec<&TextRun> {
        outputs
            .iter()
            .filter_map(|o| match o {
                Output::Text(run) => Some(run),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_runs_group_by_rendition() {
        let mut s = session();
        let outputs = s.feed(b"ab\x1b[1mcd\x1b[1mef\x1b[0mg");
        let runs = texts(&outputs);

        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text, "ab");
        assert!(runs[0].attrs.is_default());
        // A redundant SGR does not split the run
        assert_eq!(runs[1].text, "cdef");
        assert!(runs[1].attrs.bold);
        assert_eq!(runs[2].text, "g");
        assert!(runs[2].attrs.is_default());
    }

    #[test]
    fn test_run_width() {
        let mut s = session();
        let outputs = s.feed("a世".as_bytes());
        assert_eq!(texts(&outputs)[0].width, 3);
    }

    #[test]
    fn test_controls_split_runs() {
        let mut s = session();
        let outputs = s.feed(b"ab\r\ncd");
        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[1], Output::Control(ControlCode::CarriageReturn));
        assert_eq!(outputs[2], Output::Control(ControlCode::LineFeed));
    }

    #[test]
    fn test_underline_color_scenario() {
        let mut s = session();
        let mut outputs = s.feed(b"\x1b[4:3m");
        outputs.extend(s.feed(b"\x1b[58;2;0;0;255m"));
        outputs.extend(s.feed(b"X"));
        outputs.extend(s.feed(b"\x1b[0m"));

        let runs = texts(&outputs);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].attrs.underline_style, UnderlineStyle::Curly);
        assert_eq!(runs[0].attrs.underline_color, Color::rgb(0, 0, 255));
        assert!(s.rendition().is_default());
    }

    #[test]
    fn test_title() {
        let mut s = session();
        let outputs = s.feed(b"\x1b]2;hello\x07\x1b]7;file:///tmp\x07");
        assert_eq!(outputs[0], Output::Title("hello".into()));
        assert_eq!(
            outputs[1],
            Output::Osc(OscEvent::SetCurrentDirectory("file:///tmp".into()))
        );
        assert_eq!(s.title(), "hello");
    }

    #[test]
    fn test_full_reset_clears_rendition() {
        let mut s = session();
        s.feed(b"\x1b[1;31m");
        let outputs = s.feed(b"\x1bc");
        assert_eq!(outputs, vec![Output::Esc(EscAction::FullReset)]);
        assert!(s.rendition().is_default());
    }

    #[test]
    fn test_rpc_produces_no_output() {
        let mut s = session();
        let outputs = s.feed(b"a\x1b[>1001;1Fb");
        assert_eq!(outputs.len(), 2);
        assert_eq!(s.diagnostics().rpc.unhandled, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut s = session();
        let _handle = s.send_query(2001, &[]).unwrap();
        s.feed(b"\x1b]0;t\x07\x1b[1m\x1b[31");

        let snapshot = s.snapshot();
        assert_eq!(snapshot.parser_state, ParserState::CsiParam);
        assert_eq!(snapshot.pending_queries, vec![2001]);
        assert_eq!(snapshot.title, "t");

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["rendition"]["bold"], true);
        assert_eq!(json["pending_queries"][0], 2001);
    }

    #[test]
    fn test_dispose_cancels() {
        let mut s = session();
        let handle = s.send_query(2001, &[]).unwrap();
        s.dispose();
        assert!(s.is_disposed());
        assert_eq!(handle.wait(), Err(RpcError::Cancelled(2001)));
        // Second dispose is a no-op
        s.dispose();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.parser.max_params = 0;
        assert!(Session::new(config).is_err());
    }
}
