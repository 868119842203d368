//! Color representation for graphic rendition
//!
//! Supports:
//! - Default foreground/background/underline color
//! - 256-color palette (0-255), which includes the 16 ANSI colors
//! - 24-bit true color (RGB)

use serde::{Deserialize, Serialize};

/// Color value of one rendition slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// Whatever the renderer's theme says
    #[default]
    Default,
    /// Indexed color (0-255)
    /// 0-7: standard colors
    /// 8-15: bright colors
    /// 16-231: 6x6x6 color cube
    /// 232-255: grayscale
    Indexed(u8),
    /// 24-bit RGB color
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    /// Standard ANSI color indices
    pub const BLACK: u8 = 0;
    pub const RED: u8 = 1;
    pub const GREEN: u8 = 2;
    pub const YELLOW: u8 = 3;
    pub const BLUE: u8 = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8 = 6;
    pub const WHITE: u8 = 7;

    /// Create a new indexed color
    pub fn indexed(index: u8) -> Self {
        Color::Indexed(index)
    }

    /// Create a new RGB color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Write the SGR parameters selecting this color into `out`.
    ///
    /// Uses the short codes (30-37, 90-97, ...) where they exist and the
    /// semicolon extended form otherwise.
    pub(crate) fn write_sgr(&self, slot: ColorSlot, out: &mut Vec<String>) {
        match (*self, slot) {
            (Color::Default, ColorSlot::Foreground) => out.push("39".into()),
            (Color::Default, ColorSlot::Background) => out.push("49".into()),
            (Color::Default, ColorSlot::UnderlineColor) => out.push("59".into()),
            (Color::Indexed(i @ 0..=7), ColorSlot::Foreground) => out.push((30 + i).to_string()),
            (Color::Indexed(i @ 8..=15), ColorSlot::Foreground) => {
                out.push((90 + i - 8).to_string())
            }
            (Color::Indexed(i @ 0..=7), ColorSlot::Background) => out.push((40 + i).to_string()),
            (Color::Indexed(i @ 8..=15), ColorSlot::Background) => {
                out.push((100 + i - 8).to_string())
            }
            (Color::Indexed(i), slot) => {
                out.push(format!("{};5;{}", slot.extended_code(), i));
            }
            (Color::Rgb { r, g, b }, slot) => {
                out.push(format!("{};2;{};{};{}", slot.extended_code(), r, g, b));
            }
        }
    }
}

/// Which color of the rendition an SGR code targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSlot {
    Foreground,
    Background,
    UnderlineColor,
}

impl ColorSlot {
    /// The extended-color introducer (38, 48 or 58)
    pub fn extended_code(self) -> u32 {
        match self {
            ColorSlot::Foreground => 38,
            ColorSlot::Background => 48,
            ColorSlot::UnderlineColor => 58,
        }
    }
}
