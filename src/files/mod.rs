//! File representations: classic/extended source files and component
//! files, plus the per-file caches the language services read.

mod comment_flags;
mod component;
mod source_file;

pub use comment_flags::CommentFlag;
pub use component::{ComponentFile, ScriptImport};
pub use source_file::{FunctionCall, FunctionCallArg, NewInfo, ParsedUnit, SourceFile};

use crate::base::Range;

/// Convert a script-import uri to a pkg-path (`pkg:/source/a.brs` →
/// `source/a.brs`). pkg-paths are always forward-slash.
pub fn pkg_path_from_uri(uri: &str) -> String {
    let trimmed = uri.trim();
    let without_scheme = trimmed
        .strip_prefix("pkg:/")
        .or_else(|| trimmed.strip_prefix("libpkg:/"))
        .unwrap_or(trimmed);
    without_scheme.trim_start_matches('/').replace('\\', "/")
}

/// LSP-shaped symbol kinds used by document/workspace symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKindTag {
    Function,
    Method,
    Field,
    Class,
    Namespace,
}

#[derive(Debug, Clone)]
pub struct DocumentSymbol {
    pub name: String,
    pub detail: Option<String>,
    pub kind: SymbolKindTag,
    pub range: Range,
    pub selection_range: Range,
    pub children: Vec<DocumentSymbol>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceSymbol {
    pub name: String,
    pub container_name: Option<String>,
    pub kind: SymbolKindTag,
    pub pkg_path: String,
    pub range: Range,
}

/// Any file the Program can own
pub enum File {
    Source(SourceFile),
    Component(ComponentFile),
}

impl File {
    pub fn pkg_path(&self) -> &str {
        match self {
            File::Source(f) => &f.pkg_path,
            File::Component(f) => &f.pkg_path,
        }
    }

    pub fn src_path(&self) -> &std::path::Path {
        match self {
            File::Source(f) => &f.src_path,
            File::Component(f) => &f.src_path,
        }
    }

    /// The graph key: lowercased pkg-path
    pub fn dependency_graph_key(&self) -> String {
        self.pkg_path().to_lowercase()
    }

    pub fn as_source(&self) -> Option<&SourceFile> {
        match self {
            File::Source(f) => Some(f),
            File::Component(_) => None,
        }
    }

    pub fn as_source_mut(&mut self) -> Option<&mut SourceFile> {
        match self {
            File::Source(f) => Some(f),
            File::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentFile> {
        match self {
            File::Component(f) => Some(f),
            File::Source(_) => None,
        }
    }
}
