//! Recursive-descent parser: tokens → AST + references index + parse
//! diagnostics.
//!
//! Two modes share one grammar: [`ParseMode::Classic`] rejects the
//! extended-dialect constructs (classes, namespaces, imports, template
//! strings, ternary, try/catch, annotations) with a diagnostic but still
//! parses them for recovery, so downstream layers always receive a
//! complete AST.
//!
//! The parser never panics: errors become diagnostics and parsing resumes
//! from the next statement boundary (newline, colon, `end`-family
//! keyword, or EOF).

mod expressions;
mod references;
mod statements;

pub use references::{
    AssignmentInfo, ClassDecl, ClassMemberDecl, FunctionDecl, FunctionExprInfo, ImportDecl,
    LibraryDecl, LocalVar, MemberKind, NamespaceDecl, ParamInfo, References,
};

use crate::ast::BodyStatement;
use crate::base::Range;
use crate::diagnostics::{Diagnostic, messages};
use crate::lexer::{Token, TokenKind, kind_to_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Classic,
    Extended,
    /// Extended syntax, declaration-only: functions and methods carry no
    /// bodies (`.d.bs` typedef files)
    Typedef,
}

#[derive(Debug)]
pub struct ParseResult {
    pub body: BodyStatement,
    pub references: References,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    mode: ParseMode,
    diagnostics: Vec<Diagnostic>,
    references: References,
    next_function_id: u32,
    pub(crate) function_stack: Vec<u32>,
    pub(crate) namespace_stack: Vec<String>,
    seen_main_statement: bool,
    pending_doc: Option<String>,
}

impl Parser {
    /// Parse a whole token stream (as produced by the lexer, optionally
    /// filtered by the preprocessor).
    pub fn parse(tokens: Vec<Token>, mode: ParseMode) -> ParseResult {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .collect();
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let range = tokens.last().map(|t| t.range).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", range));
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            mode,
            diagnostics: Vec::new(),
            references: References::default(),
            next_function_id: 0,
            function_stack: Vec::new(),
            namespace_stack: Vec::new(),
            seen_main_statement: false,
            pending_doc: None,
        };
        let body = parser.parse_body();
        ParseResult {
            body,
            references: parser.references,
            diagnostics: parser.diagnostics,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn kind(&self) -> TokenKind {
        self.current().kind
    }

    pub(crate) fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn peek(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// At a statement separator (newline, colon, or EOF)
    pub(crate) fn at_separator(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::Colon | TokenKind::Eof
        )
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            let found = kind_to_name(self.kind());
            let range = self.current().range;
            self.diagnostics
                .push(messages::expected_token(kind_to_name(kind), found, range));
            None
        }
    }

    /// An identifier in declaration/variable position. A few extended
    /// keywords double as plain identifiers here so classic sources that
    /// use them as variable names keep parsing.
    pub(crate) fn expect_identifier(&mut self) -> Option<Token> {
        match self.kind() {
            TokenKind::Identifier => Some(self.advance()),
            TokenKind::Public
            | TokenKind::Protected
            | TokenKind::Private
            | TokenKind::Override => {
                let mut token = self.advance();
                token.kind = TokenKind::Identifier;
                Some(token)
            }
            _ => {
                let found = kind_to_name(self.kind());
                let range = self.current().range;
                self.diagnostics
                    .push(messages::expected_identifier(found, range));
                None
            }
        }
    }

    /// An identifier in key/property position, where reserved words are
    /// allowed (`m.end`, `{ for: 1 }`)
    pub(crate) fn expect_identifier_like(&mut self) -> Option<Token> {
        if self.current().kind.is_identifier_like() {
            Some(self.advance())
        } else {
            let found = kind_to_name(self.kind());
            let range = self.current().range;
            self.diagnostics
                .push(messages::expected_identifier(found, range));
            None
        }
    }

    /// Skip newlines and colons between statements
    pub(crate) fn skip_separators(&mut self) {
        while matches!(self.kind(), TokenKind::Newline | TokenKind::Colon) {
            self.advance();
        }
    }

    /// Skip newlines only (inside bracketed constructs)
    pub(crate) fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Advance to the next statement boundary after an error
    pub(crate) fn synchronize(&mut self) {
        while !self.at_eof() {
            match self.kind() {
                TokenKind::Newline | TokenKind::Colon => return,
                TokenKind::EndIf
                | TokenKind::EndFor
                | TokenKind::EndWhile
                | TokenKind::EndFunction
                | TokenKind::EndSub
                | TokenKind::EndClass
                | TokenKind::EndNamespace
                | TokenKind::EndTry => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // =========================================================================
    // Diagnostics and mode gating
    // =========================================================================

    pub(crate) fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn unexpected_token(&mut self) {
        let token = self.current().clone();
        self.diagnostics
            .push(messages::unexpected_token(&token.text, token.range));
    }

    /// Report an extended-only construct in a classic file. Parsing
    /// continues (recovery), the diagnostic marks the file as invalid.
    pub(crate) fn gate_extended(&mut self, feature: &str, range: Range) {
        if self.mode == ParseMode::Classic {
            self.diagnostic(messages::feature_not_supported_in_classic_files(
                feature, range,
            ));
        }
    }

    pub(crate) fn mode(&self) -> ParseMode {
        self.mode
    }

    // =========================================================================
    // References bookkeeping
    // =========================================================================

    pub(crate) fn references_mut(&mut self) -> &mut References {
        &mut self.references
    }

    pub(crate) fn allocate_function_id(&mut self) -> u32 {
        let id = self.next_function_id;
        self.next_function_id += 1;
        id
    }

    pub(crate) fn current_function_id(&self) -> Option<u32> {
        self.function_stack.last().copied()
    }

    pub(crate) fn current_namespace(&self) -> Option<String> {
        self.namespace_stack.last().cloned()
    }

    pub(crate) fn mark_main_statement(&mut self) {
        self.seen_main_statement = true;
    }

    pub(crate) fn in_file_prologue(&self) -> bool {
        !self.seen_main_statement
    }

    pub(crate) fn set_pending_doc(&mut self, doc: Option<String>) {
        self.pending_doc = doc;
    }

    pub(crate) fn take_pending_doc(&mut self) -> Option<String> {
        self.pending_doc.take()
    }
}
