//! Language-service queries: completion, hover, definition, references,
//! signature help, and document/workspace symbols.
//!
//! All queries are read-only views over the Program's most recent state
//! and poll the optional cancellation token between scope iterations.

mod completion;
mod definition;
mod hover;
mod references;
mod signature_help;

pub use completion::{CompletionItem, CompletionKind, completions};
pub use definition::definition;
pub use hover::{Hover, hover};
pub use references::references;
pub use signature_help::{SignatureInfo, signature_help};

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::base::{Position, Range};
use crate::files::{DocumentSymbol, WorkspaceSymbol};
use crate::lexer::Lexer;
use crate::parser::References;
use crate::program::Program;

/// A resolved source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub pkg_path: String,
    pub range: Range,
}

/// The identifier-like token containing a position, from a fresh lex of
/// the file text
pub(crate) fn identifier_at(source: &str, position: Position) -> Option<(String, Range)> {
    let lexed = Lexer::scan(source);
    lexed
        .tokens
        .iter()
        .find(|t| t.kind.is_identifier_like() && t.range.contains(position))
        .map(|t| (t.text.to_string(), t.range))
}

/// The innermost function expression whose range contains a position
pub(crate) fn enclosing_function_id(references: &References, position: Position) -> Option<u32> {
    references
        .function_expressions
        .iter()
        .filter(|f| f.range.contains(position))
        .max_by_key(|f| (f.range.start.line, f.range.start.column))
        .map(|f| f.id)
}

pub(crate) fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.is_some_and(|token| token.is_cancelled())
}

// ============================================================================
// Program API surface
// ============================================================================

impl Program {
    pub fn get_completions(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Vec<CompletionItem> {
        self.get_completions_cancellable(path, position, None)
    }

    pub fn get_completions_cancellable(
        &self,
        path: impl AsRef<Path>,
        position: Position,
        cancel: Option<&CancellationToken>,
    ) -> Vec<CompletionItem> {
        match self.key_for_path(path.as_ref()) {
            Some(key) => completions(self, &key, position, cancel),
            None => Vec::new(),
        }
    }

    pub fn get_hover(&self, path: impl AsRef<Path>, position: Position) -> Option<Hover> {
        let key = self.key_for_path(path.as_ref())?;
        hover(self, &key, position)
    }

    pub fn get_definition(&self, path: impl AsRef<Path>, position: Position) -> Vec<Location> {
        match self.key_for_path(path.as_ref()) {
            Some(key) => definition(self, &key, position),
            None => Vec::new(),
        }
    }

    pub fn get_references(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Vec<Location> {
        match self.key_for_path(path.as_ref()) {
            Some(key) => references(self, &key, position, None),
            None => Vec::new(),
        }
    }

    pub fn get_signature_help(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Option<SignatureInfo> {
        let key = self.key_for_path(path.as_ref())?;
        signature_help(self, &key, position)
    }

    pub fn get_document_symbols(&mut self, path: impl AsRef<Path>) -> Vec<DocumentSymbol> {
        let Some(key) = self.key_for_path(path.as_ref()) else {
            return Vec::new();
        };
        match self.source_file_mut(&key) {
            Some(file) => file.document_symbols(),
            None => Vec::new(),
        }
    }

    pub fn get_workspace_symbols(&mut self) -> Vec<WorkspaceSymbol> {
        let mut symbols = Vec::new();
        for key in self.file_keys() {
            if let Some(file) = self.source_file_mut(&key) {
                symbols.extend(file.workspace_symbols());
            }
        }
        symbols
    }
}
