//! SGR (Select Graphic Rendition) translation
//!
//! Turns the parameters of a completed `CSI ... m` into [`SgrCommand`]s.
//! Colon subparameter forms and the legacy semicolon forms produce the same
//! commands.
//!
//! Extended colors (38/48/58) in semicolon form consume exactly their fixed
//! arity - `;5;N` or `;2;r;g;b` - and iteration then carries on with the
//! next parameter. In colon form everything lives in one parameter:
//! `38:5:N`, `38:2:r:g:b`, `38:2::r:g:b` or `38:2:cs:r:g:b`.
//!
//! Reference: https://invisible-island.net/xterm/ctlseqs/ctlseqs.html#h4-Functions-using-CSI-_-ordered-by-the-final-character-lparen-s-rparen:CSI-Pm-m.1CA7

use serde::{Deserialize, Serialize};

use crate::core::color::{Color, ColorSlot};
use crate::core::rendition::UnderlineStyle;
use crate::parser::Params;

/// One decoded rendition change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SgrCommand {
    /// SGR 0 - everything back to default
    Reset,
    Bold(bool),
    Faint(bool),
    Italic(bool),
    Blink(bool),
    Inverse(bool),
    Hidden(bool),
    Strikethrough(bool),
    Underline(UnderlineStyle),
    Color(ColorSlot, Color),
}

/// Result of translating one SGR sequence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SgrTranslation {
    /// Commands in application order
    pub commands: Vec<SgrCommand>,
    /// Codes that were skipped because they are unknown or malformed
    pub unsupported: usize,
}

/// Translate SGR parameters into commands
pub fn translate(params: &Params) -> SgrTranslation {
    let mut out = SgrTranslation::default();

    if params.is_empty() {
        out.commands.push(SgrCommand::Reset);
        return out;
    }

    let mut i = 0;
    while i < params.len() {
        let code = params.raw(i);
        let sub = params.subparams(i);
        i += 1;

        match code {
            4 => match sub {
                [] => out.commands.push(SgrCommand::Underline(UnderlineStyle::Single)),
                [style] => match UnderlineStyle::from_subparam(*style) {
                    Some(style) => out.commands.push(SgrCommand::Underline(style)),
                    None => out.skip(code),
                },
                _ => out.skip(code),
            },
            38 | 48 | 58 => {
                let slot = match code {
                    38 => ColorSlot::Foreground,
                    48 => ColorSlot::Background,
                    _ => ColorSlot::UnderlineColor,
                };
                let color = if sub.is_empty() {
                    let (consumed, color) = semicolon_color(params, i);
                    i += consumed;
                    color
                } else {
                    colon_color(sub)
                };
                match color {
                    Some(color) => out.commands.push(SgrCommand::Color(slot, color)),
                    None => out.skip(code),
                }
            }
            _ if !sub.is_empty() => out.skip(code),
            0 => out.commands.push(SgrCommand::Reset),
            1 => out.commands.push(SgrCommand::Bold(true)),
            2 => out.commands.push(SgrCommand::Faint(true)),
            3 => out.commands.push(SgrCommand::Italic(true)),
            5 | 6 => out.commands.push(SgrCommand::Blink(true)),
            7 => out.commands.push(SgrCommand::Inverse(true)),
            8 => out.commands.push(SgrCommand::Hidden(true)),
            9 => out.commands.push(SgrCommand::Strikethrough(true)),
            21 => out.commands.push(SgrCommand::Underline(UnderlineStyle::Double)),
            22 => {
                out.commands.push(SgrCommand::Bold(false));
                out.commands.push(SgrCommand::Faint(false));
            }
            23 => out.commands.push(SgrCommand::Italic(false)),
            24 => out.commands.push(SgrCommand::Underline(UnderlineStyle::None)),
            25 => out.commands.push(SgrCommand::Blink(false)),
            27 => out.commands.push(SgrCommand::Inverse(false)),
            28 => out.commands.push(SgrCommand::Hidden(false)),
            29 => out.commands.push(SgrCommand::Strikethrough(false)),
            30..=37 => out.push_indexed(ColorSlot::Foreground, code - 30),
            39 => out.commands.push(SgrCommand::Color(ColorSlot::Foreground, Color::Default)),
            40..=47 => out.push_indexed(ColorSlot::Background, code - 40),
            49 => out.commands.push(SgrCommand::Color(ColorSlot::Background, Color::Default)),
            59 => out
                .commands
                .push(SgrCommand::Color(ColorSlot::UnderlineColor, Color::Default)),
            90..=97 => out.push_indexed(ColorSlot::Foreground, code - 90 + 8),
            100..=107 => out.push_indexed(ColorSlot::Background, code - 100 + 8),
            _ => out.skip(code),
        }
    }

    out
}

impl SgrTranslation {
    fn push_indexed(&mut self, slot: ColorSlot, index: u32) {
        // Callers only pass 0-15
        self.commands
            .push(SgrCommand::Color(slot, Color::Indexed(index as u8)));
    }

    fn skip(&mut self, code: u32) {
        tracing::debug!("Unsupported SGR parameter: {}", code);
        self.unsupported += 1;
    }
}

/// Extended color in semicolon form, starting at the selector.
///
/// Returns how many parameters were consumed after the introducer. A
/// truncated form swallows the rest of the sequence; an unknown selector
/// consumes nothing so the selector is read as an ordinary code.
fn semicolon_color(params: &Params, at: usize) -> (usize, Option<Color>) {
    let remaining = params.len().saturating_sub(at);
    match params.raw(at) {
        5 if remaining >= 2 => (2, byte(params.raw(at + 1)).map(Color::Indexed)),
        2 if remaining >= 4 => (
            4,
            rgb(params.raw(at + 1), params.raw(at + 2), params.raw(at + 3)),
        ),
        5 | 2 => (remaining, None),
        _ => (0, None),
    }
}

/// Extended color from the subparameters of a single 38/48/58
fn colon_color(sub: &[u32]) -> Option<Color> {
    match sub {
        [5, index] => byte(*index).map(Color::Indexed),
        [2, r, g, b] => rgb(*r, *g, *b),
        // Second field is the color space id, usually left empty
        [2, _, r, g, b] => rgb(*r, *g, *b),
        _ => None,
    }
}

fn byte(value: u32) -> Option<u8> {
    u8::try_from(value).ok()
}

fn rgb(r: u32, g: u32, b: u32) -> Option<Color> {
    Some(Color::rgb(byte(r)?, byte(g)?, byte(b)?))
}
