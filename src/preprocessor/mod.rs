//! Conditional-compilation preprocessor.
//!
//! Runs between the lexer and parser: consumes `#const`, `#if`,
//! `#else if`, `#else`, and `#end if` directives, evaluating conditions
//! against `#const` bindings and the project manifest. Tokens inside a
//! false branch are dropped entirely, including ill-formed text.

use rustc_hash::FxHashMap;

use crate::diagnostics::{Diagnostic, messages};
use crate::lexer::{Token, TokenKind};

/// The project manifest: a flat `key=value` file whose keys are available
/// to `#if` predicates.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    values: FxHashMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` lines. Blank lines and `#`-prefixed lines are
    /// skipped.
    pub fn parse(text: &str) -> Self {
        let mut values = FxHashMap::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }
        Self { values }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// A manifest value participates in `#if` only when it spells a boolean
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(v) if v.eq_ignore_ascii_case("true") => Some(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreprocessResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Preprocessor;

impl Preprocessor {
    /// Filter a token stream against the manifest. The stream keeps its
    /// EOF terminator; directive lines and false branches are removed.
    pub fn process(tokens: Vec<Token>, manifest: &Manifest) -> PreprocessResult {
        let mut state = State {
            tokens,
            pos: 0,
            out: Vec::new(),
            diagnostics: Vec::new(),
            consts: FxHashMap::default(),
            manifest,
        };
        state.run();
        PreprocessResult {
            tokens: state.out,
            diagnostics: state.diagnostics,
        }
    }
}

struct State<'a> {
    tokens: Vec<Token>,
    pos: usize,
    out: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    consts: FxHashMap<String, bool>,
    manifest: &'a Manifest,
}

impl State<'_> {
    fn current_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn run(&mut self) {
        while self.pos < self.tokens.len() {
            match self.current_kind() {
                TokenKind::HashConst => self.hash_const(true),
                TokenKind::HashIf => self.hash_if(),
                TokenKind::HashElseIf | TokenKind::HashElse | TokenKind::HashEndIf => {
                    let token = self.tokens[self.pos].clone();
                    self.diagnostics
                        .push(messages::unexpected_token(&token.text, token.range));
                    self.skip_line(false);
                }
                _ => {
                    self.out.push(self.tokens[self.pos].clone());
                    self.pos += 1;
                }
            }
        }
    }

    /// `#const NAME = (true|false|IDENTIFIER)`. When `bind` is false the
    /// directive sits in a dropped branch and is only skipped.
    fn hash_const(&mut self, bind: bool) {
        let directive_range = self.tokens[self.pos].range;
        self.pos += 1;
        if !bind {
            self.skip_line(false);
            return;
        }

        let name = match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::Identifier => {
                let name = t.text.to_ascii_lowercase();
                self.pos += 1;
                Some(name)
            }
            Some(t) if t.kind.is_identifier_like() => {
                self.diagnostics
                    .push(messages::const_name_cannot_be_reserved_word(
                        &t.text, t.range,
                    ));
                self.pos += 1;
                None
            }
            _ => {
                self.diagnostics
                    .push(messages::invalid_hash_const_value("", directive_range));
                None
            }
        };

        if self.current_kind() == TokenKind::Equal {
            self.pos += 1;
        }

        let value = match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::True => Some(true),
            Some(t) if t.kind == TokenKind::False => Some(false),
            Some(t) if t.kind == TokenKind::Identifier => {
                let value = self.consts.get(&t.text.to_ascii_lowercase()).copied();
                if value.is_none() {
                    self.diagnostics
                        .push(messages::invalid_hash_const_value(&t.text, t.range));
                }
                value
            }
            Some(t) => {
                self.diagnostics
                    .push(messages::invalid_hash_const_value(&t.text, t.range));
                None
            }
            None => None,
        };
        if self.tokens.get(self.pos).is_some() {
            self.pos += 1;
        }

        if let (Some(name), Some(value)) = (name, value) {
            self.consts.insert(name, value);
        }
        self.skip_line(true);
    }

    /// `#if` … (`#else if` …)* (`#else` …)? `#end if`
    fn hash_if(&mut self) {
        let mut taken = false;
        loop {
            let directive = self.current_kind();
            self.pos += 1;
            let condition = match directive {
                TokenKind::HashIf | TokenKind::HashElseIf => self.read_condition(),
                _ => true,
            };
            self.skip_line(false);

            let include = condition && !taken;
            if include {
                taken = true;
            }

            loop {
                match self.current_kind() {
                    TokenKind::HashIf => {
                        if include {
                            self.hash_if();
                        } else {
                            self.skip_nested_if();
                        }
                    }
                    TokenKind::HashConst => self.hash_const(include),
                    TokenKind::HashElseIf | TokenKind::HashElse => break,
                    TokenKind::HashEndIf => {
                        self.pos += 1;
                        self.skip_line(include);
                        return;
                    }
                    TokenKind::Eof => {
                        let range = self
                            .tokens
                            .get(self.pos)
                            .map(|t| t.range)
                            .unwrap_or_default();
                        self.diagnostics
                            .push(messages::expected_token("'#end if'", "end of file", range));
                        return;
                    }
                    _ => {
                        if include {
                            self.out.push(self.tokens[self.pos].clone());
                        }
                        self.pos += 1;
                    }
                }
            }
        }
    }

    /// Skip a `#if`…`#end if` region inside an already-dropped branch
    fn skip_nested_if(&mut self) {
        let mut depth = 0usize;
        while self.pos < self.tokens.len() {
            match self.current_kind() {
                TokenKind::HashIf => depth += 1,
                TokenKind::HashEndIf => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        self.skip_line(false);
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn read_condition(&mut self) -> bool {
        match self.tokens.get(self.pos) {
            Some(t) if t.kind == TokenKind::True => {
                self.pos += 1;
                true
            }
            Some(t) if t.kind == TokenKind::False => {
                self.pos += 1;
                false
            }
            Some(t) if t.kind == TokenKind::Identifier => {
                let token = t.clone();
                self.pos += 1;
                let lower = token.text.to_ascii_lowercase();
                if let Some(&value) = self.consts.get(&lower) {
                    value
                } else if let Some(value) = self.manifest.get_bool(&lower) {
                    value
                } else {
                    self.diagnostics
                        .push(messages::invalid_hash_if_value(&token.text, token.range));
                    false
                }
            }
            Some(t) => {
                let token = t.clone();
                self.diagnostics
                    .push(messages::invalid_hash_if_value(&token.text, token.range));
                false
            }
            None => false,
        }
    }

    /// Advance past the rest of the current line. The terminating newline
    /// is re-emitted when `keep_newline` so statement separation survives
    /// directive removal.
    fn skip_line(&mut self, keep_newline: bool) {
        while self.pos < self.tokens.len() {
            match self.current_kind() {
                TokenKind::Newline => {
                    if keep_newline {
                        self.out.push(self.tokens[self.pos].clone());
                    }
                    self.pos += 1;
                    return;
                }
                TokenKind::Eof => return,
                _ => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn preprocess(source: &str, manifest: &Manifest) -> PreprocessResult {
        let lexed = Lexer::scan(source);
        assert!(lexed.diagnostics.is_empty(), "{:?}", lexed.diagnostics);
        Preprocessor::process(lexed.tokens, manifest)
    }

    fn identifier_texts(result: &PreprocessResult) -> Vec<String> {
        result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.text.to_string())
            .collect()
    }

    #[test]
    fn const_binding_selects_branch() {
        let result = preprocess(
            "#const debug = true\n#if debug\nyes\n#else\nno\n#end if",
            &Manifest::new(),
        );
        assert!(result.diagnostics.is_empty());
        assert_eq!(identifier_texts(&result), vec!["yes"]);
    }

    #[test]
    fn manifest_key_selects_branch() {
        let mut manifest = Manifest::new();
        manifest.set("enable_beta", "true");
        let result = preprocess("#if enable_beta\nbeta\n#end if", &manifest);
        assert!(result.diagnostics.is_empty());
        assert_eq!(identifier_texts(&result), vec!["beta"]);
    }

    #[test]
    fn else_if_chain_takes_first_true_branch() {
        let result = preprocess(
            "#const a = false\n#const b = true\n#if a\none\n#else if b\ntwo\n#else\nthree\n#end if",
            &Manifest::new(),
        );
        assert_eq!(identifier_texts(&result), vec!["two"]);
    }

    #[test]
    fn false_branch_tolerates_ill_formed_tokens() {
        // the dropped branch would never parse; it must still preprocess
        let result = preprocess(
            "#if false\nfunction function end if (((\n#end if\nok",
            &Manifest::new(),
        );
        assert_eq!(identifier_texts(&result), vec!["ok"]);
    }

    #[test]
    fn reserved_word_const_name_is_reported() {
        let result = preprocess("#const function = true", &Manifest::new());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].code,
            messages::CONST_NAME_CANNOT_BE_RESERVED_WORD
        );
    }

    #[test]
    fn undefined_const_rhs_is_reported() {
        let result = preprocess("#const a = nope", &Manifest::new());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].code,
            messages::INVALID_HASH_CONST_VALUE
        );
    }

    #[test]
    fn undefined_if_identifier_is_reported_and_false() {
        let result = preprocess("#if mystery\nhidden\n#end if\nafter", &Manifest::new());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, messages::INVALID_HASH_IF_VALUE);
        assert_eq!(identifier_texts(&result), vec!["after"]);
    }

    #[test]
    fn nested_ifs_resolve_independently() {
        let result = preprocess(
            "#const outer = true\n#const inner = false\n#if outer\na\n#if inner\nb\n#end if\nc\n#end if",
            &Manifest::new(),
        );
        assert_eq!(identifier_texts(&result), vec!["a", "c"]);
    }
}
