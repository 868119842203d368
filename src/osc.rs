//! OSC dispatch
//!
//! A completed `ESC ] kind ; payload` string is routed two ways: to a handler
//! the host registered for its kind, and into a closed [`OscEvent`] for the
//! kinds every terminal knows about. Kinds that are neither known nor
//! handled are kept in a bounded queue or dropped, per [`UnknownOscPolicy`].

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::{OscConfig, UnknownOscPolicy};

/// A completed OSC string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscCommand {
    /// Numeric kind before the first `;`
    pub kind: u32,
    /// Everything after the first `;`, uninterpreted
    pub payload: String,
}

/// Well-known OSC kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscEvent {
    /// OSC 0 - Set icon name and window title
    SetIconAndTitle(String),
    /// OSC 1 - Set icon name
    SetIconName(String),
    /// OSC 2 - Set window title
    SetTitle(String),
    /// OSC 4 - Set palette color
    SetColor { index: u8, color: String },
    /// OSC 7 - Set current directory
    SetCurrentDirectory(String),
    /// OSC 8 - Hyperlink; an empty uri closes the link
    Hyperlink { params: String, uri: String },
    /// OSC 10
    SetForegroundColor(String),
    /// OSC 11
    SetBackgroundColor(String),
    /// OSC 12
    SetCursorColor(String),
    /// OSC 52 - Clipboard
    Clipboard { clipboard: String, data: String },
    /// OSC 104 - Reset one palette entry, or all of them
    ResetColor(Option<u8>),
    /// OSC 110
    ResetForegroundColor,
    /// OSC 111
    ResetBackgroundColor,
    /// OSC 112
    ResetCursorColor,
    /// Any other kind, or a known kind with an unusable payload
    Unknown(OscCommand),
}

impl OscEvent {
    /// Resolve a command into its event
    pub fn from_command(command: &OscCommand) -> Self {
        let payload = command.payload.clone();
        match command.kind {
            0 => OscEvent::SetIconAndTitle(payload),
            1 => OscEvent::SetIconName(payload),
            2 => OscEvent::SetTitle(payload),
            4 => match split_pair(&payload) {
                Some((index, color)) => match index.parse::<u8>() {
                    Ok(index) => OscEvent::SetColor {
                        index,
                        color: color.to_string(),
                    },
                    Err(_) => OscEvent::Unknown(command.clone()),
                },
                None => OscEvent::Unknown(command.clone()),
            },
            7 => OscEvent::SetCurrentDirectory(payload),
            8 => match split_pair(&payload) {
                Some((params, uri)) => OscEvent::Hyperlink {
                    params: params.to_string(),
                    uri: uri.to_string(),
                },
                None => OscEvent::Hyperlink {
                    params: String::new(),
                    uri: payload,
                },
            },
            10 => OscEvent::SetForegroundColor(payload),
            11 => OscEvent::SetBackgroundColor(payload),
            12 => OscEvent::SetCursorColor(payload),
            52 => match split_pair(&payload) {
                Some((clipboard, data)) => OscEvent::Clipboard {
                    clipboard: clipboard.to_string(),
                    data: data.to_string(),
                },
                None => OscEvent::Clipboard {
                    clipboard: String::new(),
                    data: payload,
                },
            },
            104 => OscEvent::ResetColor(payload.parse::<u8>().ok()),
            110 => OscEvent::ResetForegroundColor,
            111 => OscEvent::ResetBackgroundColor,
            112 => OscEvent::ResetCursorColor,
            _ => OscEvent::Unknown(command.clone()),
        }
    }

    /// New window title, if this event sets one
    pub fn title(&self) -> Option<&str> {
        match self {
            OscEvent::SetIconAndTitle(title) | OscEvent::SetTitle(title) => Some(title),
            _ => None,
        }
    }
}

fn split_pair(payload: &str) -> Option<(&str, &str)> {
    payload.split_once(';')
}

/// Callback for one OSC kind
pub type OscHandler = Box<dyn FnMut(&OscCommand) + Send>;

/// Routes completed OSC strings to registered handlers
pub struct OscDispatcher {
    handlers: HashMap<u32, OscHandler>,
    policy: UnknownOscPolicy,
    max_stored: usize,
    unhandled: VecDeque<OscCommand>,
}

impl OscDispatcher {
    pub fn new(config: OscConfig) -> Self {
        Self {
            handlers: HashMap::new(),
            policy: config.unknown_policy,
            max_stored: config.max_stored,
            unhandled: VecDeque::new(),
        }
    }

    /// Register the handler for `kind`, replacing any previous one
    pub fn register<F>(&mut self, kind: u32, handler: F)
    where
        F: FnMut(&OscCommand) + Send + 'static,
    {
        if self.handlers.insert(kind, Box::new(handler)).is_some() {
            tracing::debug!(kind, "Replaced OSC handler");
        }
    }

    /// Remove the handler for `kind`
    pub fn unregister(&mut self, kind: u32) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    /// Run the handler for this command and resolve it into an event
    pub fn dispatch(&mut self, command: OscCommand) -> OscEvent {
        let event = OscEvent::from_command(&command);
        let handled = match self.handlers.get_mut(&command.kind) {
            Some(handler) => {
                handler(&command);
                true
            }
            None => false,
        };

        if !handled && matches!(event, OscEvent::Unknown(_)) {
            self.store_unknown(command);
        }
        event
    }

    fn store_unknown(&mut self, command: OscCommand) {
        match self.policy {
            UnknownOscPolicy::Ignore => {
                tracing::debug!(kind = command.kind, "Ignoring unknown OSC");
            }
            UnknownOscPolicy::Store => {
                if self.max_stored == 0 {
                    return;
                }
                if self.unhandled.len() >= self.max_stored {
                    self.unhandled.pop_front();
                }
                tracing::debug!(kind = command.kind, "Storing unknown OSC");
                self.unhandled.push_back(command);
            }
        }
    }

    /// Unknown commands held so far, oldest first
    pub fn unhandled(&self) -> impl Iterator<Item = &OscCommand> + '_ {
        self.unhandled.iter()
    }

    /// Take every stored unknown command
    pub fn drain_unhandled(&mut self) -> Vec<OscCommand> {
        self.unhandled.drain(..).collect()
    }

    pub fn stored_count(&self) -> usize {
        self.unhandled.len()
    }
}

impl Default for OscDispatcher {
    fn default() -> Self {
        Self::new(OscConfig::default())
    }
}

impl std::fmt::Debug for OscDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort_unstable();
        f.debug_struct("OscDispatcher")
            .field("handlers", &kinds)
            .field("policy", &self.policy)
            .field("stored", &self.unhandled.len())
            .finish()
    }
}
