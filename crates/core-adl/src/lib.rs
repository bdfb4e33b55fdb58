//! Display file format (ADL).
//!
//! A bracketed text format: named blocks containing `key=value` pairs,
//! nested blocks and point lists. Strings are double-quoted with
//! backslash escapes; colors are palette indices; composites nest via
//! a `children` block.
//!
//! The writer emits a canonical form (fixed key order, tab
//! indentation, defaults omitted) so that parsing a written file and
//! writing it again is byte-identical, and writing a parsed model and
//! re-parsing it is structurally identical.
//!
//! Unknown blocks and keys are tolerated and skipped with a warning:
//! a display authored by a newer tool still loads, minus what this
//! build does not understand.

mod keywords;
mod lexer;
mod node;
mod parse;
mod read;
mod write;

pub use node::{Block, PairValue};
pub use parse::{parse_display, AdlError};
pub use write::write_display;

use std::path::Path;

use core_model::Display;

/// Read and parse a display file from disk.
pub fn load_display(path: &Path) -> Result<Display, AdlError> {
    let text = std::fs::read_to_string(path)
        .map_err(|error| AdlError::Io(path.display().to_string(), error.to_string()))?;
    let mut display = parse_display(&text)?;
    if display.file_name.is_empty() {
        display.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    Ok(display)
}

/// Serialize and write a display file to disk.
pub fn save_display(path: &Path, display: &Display) -> Result<(), AdlError> {
    std::fs::write(path, write_display(display))
        .map_err(|error| AdlError::Io(path.display().to_string(), error.to_string()))
}
