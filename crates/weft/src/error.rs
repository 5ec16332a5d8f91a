//! Structured errors for the compile pipeline.
//!
//! Every failure in the lexer, parser, executor, or hydration pass carries a
//! kind, a human-readable message, and a source location (byte offset plus
//! file id). Errors unwind immediately to the engine boundary; there is no
//! partial-result recovery within a single compile or execute call.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Identifier of a source file registered with the engine's source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Result type alias for operations that can produce a compile error.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories raised across the pipeline.
///
/// Uses strum derives for automatic `Display` and `Into<&'static str>`; the
/// string representation matches the variant name exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    // Lexical errors
    UnterminatedString,
    UnterminatedTextNode,
    UnterminatedRawBlock,

    // Parse errors
    UnexpectedToken,
    ExpectedToken,
    ExpectedComparison,
    UnknownModule,
    UnknownController,
    ControllerImport,
    UnknownExport,
    AmbiguousExport,
    RecursiveTag,
    ImportCycle,

    // Variable resolution errors
    UndefinedVariable,
    NotAProperty,
    PropsOutsideTag,

    // Execution errors
    PathConflict,
    ArrayKey,
    IndexRange,
    NotIterable,

    // Hydration codegen errors
    NestedController,

    /// Failures from the file-access collaborator, surfaced like any other
    /// compile error for the current request.
    Io,
}

/// A compile or execution failure with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// Byte offset into the source text of `file`.
    pub pos: usize,
    pub file: FileId,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>, pos: usize, file: FileId) -> Self {
        Self {
            kind,
            message: message.into(),
            pos,
            file,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

/// Renders the source line containing `pos` with a line-number gutter and a
/// caret under the offending column.
///
/// Used by the engine's error boundary to format diagnostics; hosts mapping
/// offsets to line/column themselves can ignore it.
#[must_use]
pub fn excerpt(source: &str, pos: usize) -> String {
    let mut pos = pos.min(source.len());
    while pos > 0 && !source.is_char_boundary(pos) {
        pos -= 1;
    }
    let line_no = source[..pos].matches('\n').count() + 1;
    let line_start = source[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[pos..].find('\n').map_or(source.len(), |i| pos + i);
    let line = &source[line_start..line_end];

    let mut buf = String::new();
    let _ = writeln!(buf, "{line_no}| {line}");
    // Pad up to the caret column; tabs are preserved so the caret stays aligned.
    let gutter = line_no.to_string().len() + 2;
    let mut pad = " ".repeat(gutter);
    for ch in source[line_start..pos].chars() {
        pad.push(if ch == '\t' { '\t' } else { ' ' });
    }
    buf.push_str(&pad);
    buf.push_str("^\n");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_points_at_offset() {
        let src = "first line\nsecond line\n";
        let out = excerpt(src, src.find("second").unwrap() + 7);
        assert_eq!(out, "2| second line\n          ^\n");
    }

    #[test]
    fn test_excerpt_clamps_out_of_range() {
        let out = excerpt("abc", 100);
        assert!(out.starts_with("1| abc"));
    }
}
