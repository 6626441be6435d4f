//! Lexer for the classic and extended dialects.
//!
//! Tokenization runs in two layers, the same split the logos-based lexer
//! uses elsewhere in this codebase's lineage:
//!
//! 1. a [`logos`]-generated raw layer recognising lexemes by regex
//!    (identifiers with type-designator suffixes, typed numeric literals,
//!    strings with `""` escapes, punctuation, whole template strings), and
//! 2. a wrapper pass that routes identifiers to keywords
//!    (case-insensitively), joins multi-word tokens (`end if`, `for each`,
//!    `#end if`, …), absorbs `_`-newline line continuations, folds `rem`
//!    comments, and decomposes template strings into quasi/interpolation
//!    tokens (recursively lexing the interpolation slices).
//!
//! Byte offsets from logos are converted to line/column ranges through a
//! [`LineIndex`](crate::base::LineIndex) built once per source text.

mod lexer;
mod token;

pub use lexer::{LexResult, Lexer, LexerOptions};
pub use token::{Token, TokenKind, is_reserved_word, keyword_kind, keyword_text, kind_to_name};
