//! # luster-base
//!
//! Core library for the classic/extended set-top scripting dialects:
//! lexing, parsing, cross-file scope analysis, validation, transpilation,
//! and the queries behind a language server.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide          → language-service queries (completion, hover, goto-def)
//!   ↓
//! program      → the Program: owns files, scopes, graph, plugins
//!   ↓
//! scope        → scope engine, namespaces, callables, validator
//!   ↓
//! files        → source/component file representations, typedef linkage
//!   ↓
//! parser       → recursive-descent parser, references index
//!   ↓
//! ast          → Statement/Expression sums, bitmask-driven walker
//!   ↓
//! lexer        → Logos token layer + dialect-aware wrapper
//!   ↓
//! base         → primitives (Position, Range, LineIndex)
//! ```

/// Foundation types: Position, Range, LineIndex
pub mod base;

/// Diagnostics: severity, wire shape, stable code table
pub mod diagnostics;

/// Lexer: logos token layer, keyword routing, template strings
pub mod lexer;

/// Preprocessor: `#const` / `#if` conditional compilation
pub mod preprocessor;

/// AST: statement/expression variants, walker, visitor
pub mod ast;

/// Parser: tokens → AST + references index, classic/extended modes
pub mod parser;

/// Lightweight type model used for hover/completion inference
pub mod types;

/// Symbol tables with parent-chain lookup
pub mod symbols;

/// File representations: source files, components, comment flags
pub mod files;

/// Dependency graph with change subscriptions
pub mod graph;

/// Scope engine: file aggregation, namespaces, callables, stdlib
pub mod scope;

/// Scope-level validation passes
pub mod validator;

/// Transpiler: extended AST → classic source + source maps
pub mod transpiler;

/// Plugin bus: ordered lifecycle observers
pub mod plugins;

/// The Program: the persistent shared store and public API
pub mod program;

/// Language-service queries
pub mod ide;

pub use base::{LineIndex, Position, Range};
pub use diagnostics::{Diagnostic, Severity};
pub use program::{Program, ProgramOptions};
