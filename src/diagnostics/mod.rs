//! Diagnostic types shared by the lexer, parser, preprocessor, scopes,
//! and validator.
//!
//! Every recoverable problem in the pipeline becomes a [`Diagnostic`];
//! public operations never bubble user-source problems as errors.

pub mod messages;

use std::fmt;

use crate::base::{Position, Range};

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

/// Related location information for a diagnostic, e.g. "first declaration
/// here" pointing at the other duplicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    /// pkg-path of the file containing the related location
    pub pkg_path: String,
    pub range: Range,
    pub message: String,
}

/// A diagnostic with a stable integer code and a source range.
///
/// `file_pkg_path` is filled in by the layer that knows the owning file
/// (the file object for parse diagnostics, the scope for validation
/// diagnostics).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable integer code (see [`messages`])
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    pub range: Range,
    /// pkg-path of the owning file, when known
    pub file_pkg_path: Option<String>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn new(code: u32, severity: Severity, message: impl Into<String>, range: Range) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            range,
            file_pkg_path: None,
            related: Vec::new(),
        }
    }

    pub fn error(code: u32, message: impl Into<String>, range: Range) -> Self {
        Self::new(code, Severity::Error, message, range)
    }

    pub fn warning(code: u32, message: impl Into<String>, range: Range) -> Self {
        Self::new(code, Severity::Warning, message, range)
    }

    pub fn info(code: u32, message: impl Into<String>, range: Range) -> Self {
        Self::new(code, Severity::Info, message, range)
    }

    /// Attach the owning file's pkg-path
    pub fn in_file(mut self, pkg_path: impl Into<String>) -> Self {
        self.file_pkg_path = Some(pkg_path.into());
        self
    }

    /// Add a related location
    pub fn with_related(
        mut self,
        pkg_path: impl Into<String>,
        range: Range,
        message: impl Into<String>,
    ) -> Self {
        self.related.push(RelatedInfo {
            pkg_path: pkg_path.into(),
            range,
            message: message.into(),
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {} @ {}:{}",
            self.code,
            self.severity.as_str(),
            self.message,
            self.range.start.line,
            self.range.start.column
        )
    }
}

/// A whole-file range used for diagnostics that cannot be localised
/// (critical parser failures).
pub fn whole_file_range() -> Range {
    Range::new(Position::new(0, 0), Position::new(0, u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_position() {
        let d = Diagnostic::error(1102, "oops", Range::from_coords(3, 4, 3, 8));
        assert_eq!(d.to_string(), "1102(error) oops @ 3:4");
    }
}
