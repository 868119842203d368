//! Attribute Model
//!
//! Cumulative "graphic rendition" state and the SGR commands that mutate it:
//! - Color values and the slot they target
//! - The rendition record itself
//! - Translation of `CSI ... m` parameters into commands
//!
//! The model is deterministic: applying the same commands to the same state
//! always yields the same state.

mod color;
mod rendition;
pub mod sgr;

pub use color::{Color, ColorSlot};
pub use rendition::{GraphicRenditionState, UnderlineStyle};
pub use sgr::{SgrCommand, SgrTranslation};
