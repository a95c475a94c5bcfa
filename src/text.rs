//! Text coordinate utilities.
//!
//! This module provides the position model shared by every feature:
//! - `Position`/`Range` with UTF-16 character columns
//! - `LineDocument`, a line-indexed view that keeps original line breaks

pub mod document;
pub mod position;

pub use document::{LineBreak, LineDocument};
pub use position::{
    Position, Range, convert_byte_to_utf16_in_line, convert_utf16_to_byte_in_line, utf16_len,
};
