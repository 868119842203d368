//! Graphic rendition state
//!
//! The cumulative text style applied to subsequently printed characters.
//! It only changes by applying an [`SgrCommand`]; the renderer gets a value
//! copy with every printable run.

use serde::{Deserialize, Serialize};

use crate::core::color::{Color, ColorSlot};
use crate::core::sgr::SgrCommand;

/// Underline style variants (SGR 4:x subparameters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    /// Map an SGR `4:n` subparameter
    pub fn from_subparam(n: u32) -> Option<Self> {
        match n {
            0 => Some(UnderlineStyle::None),
            1 => Some(UnderlineStyle::Single),
            2 => Some(UnderlineStyle::Double),
            3 => Some(UnderlineStyle::Curly),
            4 => Some(UnderlineStyle::Dotted),
            5 => Some(UnderlineStyle::Dashed),
            _ => None,
        }
    }

    fn sgr(self) -> &'static str {
        match self {
            UnderlineStyle::None => "24",
            UnderlineStyle::Single => "4",
            UnderlineStyle::Double => "4:2",
            UnderlineStyle::Curly => "4:3",
            UnderlineStyle::Dotted => "4:4",
            UnderlineStyle::Dashed => "4:5",
        }
    }
}

/// Live text attributes of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphicRenditionState {
    /// Bold text (SGR 1)
    pub bold: bool,
    /// Faint/dim text (SGR 2)
    pub faint: bool,
    /// Italic text (SGR 3)
    pub italic: bool,
    /// Blinking text (SGR 5)
    pub blink: bool,
    /// Hidden/invisible text (SGR 8)
    pub hidden: bool,
    /// Underline style (SGR 4, 4:0-4:5, 21, 24)
    pub underline_style: UnderlineStyle,
    /// Strikethrough text (SGR 9)
    pub strikethrough: bool,
    /// Inverse/reverse video (SGR 7)
    pub inverse: bool,
    /// Foreground color
    pub foreground: Color,
    /// Background color
    pub background: Color,
    /// Underline color (SGR 58)
    pub underline_color: Color,
}

impl GraphicRenditionState {
    /// Create new default attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all attributes to default
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when every attribute is at its default
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply one decoded SGR command in place.
    ///
    /// Turning the underline off leaves `underline_color` alone, so a later
    /// `4` brings the old color back.
    pub fn apply(&mut self, command: SgrCommand) {
        match command {
            SgrCommand::Reset => self.reset(),
            SgrCommand::Bold(on) => self.bold = on,
            SgrCommand::Faint(on) => self.faint = on,
            SgrCommand::Italic(on) => self.italic = on,
            SgrCommand::Blink(on) => self.blink = on,
            SgrCommand::Inverse(on) => self.inverse = on,
            SgrCommand::Hidden(on) => self.hidden = on,
            SgrCommand::Strikethrough(on) => self.strikethrough = on,
            SgrCommand::Underline(style) => self.underline_style = style,
            SgrCommand::Color(ColorSlot::Foreground, color) => self.foreground = color,
            SgrCommand::Color(ColorSlot::Background, color) => self.background = color,
            SgrCommand::Color(ColorSlot::UnderlineColor, color) => self.underline_color = color,
        }
    }

    /// Apply a batch in order; later commands win
    pub fn apply_all<I>(&mut self, commands: I)
    where
        I: IntoIterator<Item = SgrCommand>,
    {
        for command in commands {
            self.apply(command);
        }
    }

    /// Get effective foreground color (accounting for inverse)
    pub fn effective_fg(&self) -> Color {
        if self.inverse {
            self.background
        } else {
            self.foreground
        }
    }

    /// Get effective background color (accounting for inverse)
    pub fn effective_bg(&self) -> Color {
        if self.inverse {
            self.foreground
        } else {
            self.background
        }
    }

    /// Encode this state as one SGR sequence that recreates it from default.
    ///
    /// Starts with `0` so the result is valid whatever state the receiver
    /// is in.
    pub fn to_sgr(&self) -> String {
        let mut params = vec!["0".to_string()];
        let flags = [
            (self.bold, "1"),
            (self.faint, "2"),
            (self.italic, "3"),
            (self.blink, "5"),
            (self.inverse, "7"),
            (self.hidden, "8"),
            (self.strikethrough, "9"),
        ];
        params.extend(flags.iter().filter(|(on, _)| *on).map(|(_, code)| code.to_string()));
        if self.underline_style != UnderlineStyle::None {
            params.push(self.underline_style.sgr().to_string());
        }
        let colors = [
            (self.foreground, ColorSlot::Foreground),
            (self.background, ColorSlot::Background),
            (self.underline_color, ColorSlot::UnderlineColor),
        ];
        for (color, slot) in colors {
            if color != Color::Default {
                color.write_sgr(slot, &mut params);
            }
        }
        format!("\x1b[{}m", params.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_toggles() {
        let mut attrs = GraphicRenditionState::new();
        attrs.apply(SgrCommand::Bold(true));
        attrs.apply(SgrCommand::Italic(true));
        attrs.apply(SgrCommand::Strikethrough(true));
        assert!(attrs.bold && attrs.italic && attrs.strikethrough);

        attrs.apply(SgrCommand::Bold(false));
        assert!(!attrs.bold);
        assert!(attrs.italic);
    }

    #[test]
    fn test_underline_color_survives_underline_off() {
        let mut attrs = GraphicRenditionState::new();
        attrs.apply(SgrCommand::Underline(UnderlineStyle::Curly));
        attrs.apply(SgrCommand::Color(ColorSlot::UnderlineColor, Color::rgb(0, 0, 255)));
        attrs.apply(SgrCommand::Underline(UnderlineStyle::None));

        assert_eq!(attrs.underline_style, UnderlineStyle::None);
        assert_eq!(attrs.underline_color, Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut attrs = GraphicRenditionState::new();
        attrs.apply_all([
            SgrCommand::Bold(true),
            SgrCommand::Underline(UnderlineStyle::Dashed),
            SgrCommand::Color(ColorSlot::Background, Color::indexed(4)),
            SgrCommand::Color(ColorSlot::UnderlineColor, Color::indexed(9)),
        ]);
        attrs.apply(SgrCommand::Reset);
        assert!(attrs.is_default());
    }

    #[test]
    fn test_attributes_inverse() {
        let mut attrs = GraphicRenditionState::new();
        attrs.foreground = Color::Indexed(1);
        attrs.background = Color::Indexed(0);
        attrs.inverse = true;

        assert_eq!(attrs.effective_fg(), Color::Indexed(0));
        assert_eq!(attrs.effective_bg(), Color::Indexed(1));
    }

    #[test]
    fn test_to_sgr() {
        assert_eq!(GraphicRenditionState::new().to_sgr(), "\x1b[0m");

        let mut attrs = GraphicRenditionState::new();
        attrs.bold = true;
        attrs.underline_style = UnderlineStyle::Curly;
        attrs.foreground = Color::indexed(2);
        attrs.underline_color = Color::rgb(0, 0, 255);
        assert_eq!(attrs.to_sgr(), "\x1b[0;1;4:3;32;58;2;0;0;255m");
    }

    #[test]
    fn test_underline_from_subparam() {
        assert_eq!(UnderlineStyle::from_subparam(3), Some(UnderlineStyle::Curly));
        assert_eq!(UnderlineStyle::from_subparam(5), Some(UnderlineStyle::Dashed));
        assert_eq!(UnderlineStyle::from_subparam(6), None);
    }
}
