//! The two-layer lexer: logos raw tokens plus the dialect-aware wrapper.

use logos::Logos;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{LineIndex, Range};
use crate::diagnostics::{Diagnostic, messages};

use super::token::{Token, TokenKind, keyword_kind};

/// Lexer options. Whitespace is attached to the following token as
/// leading trivia unless `include_whitespace` asks for standalone tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerOptions {
    pub include_whitespace: bool,
}

/// The product of a lex: a token list always terminated by EOF, plus any
/// lexical diagnostics (unterminated strings, invalid characters, invalid
/// numeric literals).
#[derive(Debug, Clone)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Lexer;

impl Lexer {
    /// Tokenize an entire source text.
    pub fn scan(source: &str) -> LexResult {
        Self::scan_with_options(source, LexerOptions::default())
    }

    pub fn scan_with_options(source: &str, options: LexerOptions) -> LexResult {
        let line_index = LineIndex::new(source);
        let mut state = LexState {
            source,
            line_index: &line_index,
            options,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            pending_whitespace: None,
        };
        state.lex_slice(source, 0);
        let eof_offset = TextSize::new(source.len() as u32);
        let eof_range = Range::at(line_index.position(eof_offset));
        state.emit(TokenKind::Eof, "", eof_range);
        LexResult {
            tokens: state.tokens,
            diagnostics: state.diagnostics,
        }
    }
}

// ============================================================================
// RAW LAYER (logos)
// ============================================================================

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"[ \t]+")]
    Whitespace,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"'[^\r\n]*")]
    Comment,

    #[regex(r#""([^"\r\n]|"")*""#, priority = 6)]
    String,

    // Loses to String whenever a closing quote exists on the line
    #[regex(r#""([^"\r\n]|"")*"#, priority = 5)]
    UnterminatedString,

    // A single trailing type designator is part of the identifier
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*[$%!#&]?")]
    Identifier,

    #[regex(r"&[hH][0-9a-fA-F]+&?")]
    HexLiteral,

    // `&h` with no digits
    #[regex(r"&[hH]")]
    BadHexLiteral,

    #[regex(r"[0-9]+\.?[0-9]*([eE][+-]?[0-9]+)?[%!#&]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[%!#&]?")]
    #[regex(r"[0-9]+\.?[0-9]*[dD][+-]?[0-9]+")]
    #[regex(r"\.[0-9]+[dD][+-]?[0-9]+")]
    Number,

    // Consumes the whole template string including interpolations; the
    // wrapper decomposes it
    #[token("`", template_string_callback)]
    TemplateString,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("\\")]
    Backslash,
    #[token("^")]
    Caret,
    #[token("=")]
    Equal,
    #[token("<>")]
    LessGreater,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<<")]
    LeftShift,
    #[token(">>")]
    RightShift,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("*=")]
    StarEqual,
    #[token("/=")]
    SlashEqual,
    #[token("\\=")]
    BackslashEqual,
    #[token("<<=")]
    LeftShiftEqual,
    #[token(">>=")]
    RightShiftEqual,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("?")]
    Question,
    #[token("@.")]
    CallfuncOp,
    #[token("@")]
    At,
    #[token("#")]
    Hash,
}

enum TemplateMode {
    Template,
    Interp { depth: u32 },
}

/// Consume a whole template string starting just after the opening
/// backtick. Tracks nested `${…}` interpolations (which may themselves
/// contain template strings and string literals with braces).
fn template_string_callback(lex: &mut logos::Lexer<'_, RawToken>) {
    let rem = lex.remainder();
    let mut stack: Vec<TemplateMode> = vec![TemplateMode::Template];
    let mut chars = rem.char_indices().peekable();
    let mut consumed = rem.len();
    while let Some((i, ch)) = chars.next() {
        match stack.last_mut() {
            Some(TemplateMode::Template) => match ch {
                '`' => {
                    stack.pop();
                    if stack.is_empty() {
                        consumed = i + 1;
                        break;
                    }
                }
                '$' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        stack.push(TemplateMode::Interp { depth: 0 });
                    }
                }
                _ => {}
            },
            Some(TemplateMode::Interp { depth }) => match ch {
                '`' => stack.push(TemplateMode::Template),
                '"' => skip_string_literal(&mut chars),
                '{' => *depth += 1,
                '}' => {
                    if *depth == 0 {
                        stack.pop();
                    } else {
                        *depth -= 1;
                    }
                }
                _ => {}
            },
            None => break,
        }
    }
    lex.bump(consumed);
}

/// Advance past a string literal body (after the opening quote), honouring
/// the `""` escape. Stops at the closing quote or end of line.
fn skip_string_literal(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) {
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => {
                if matches!(chars.peek(), Some((_, '"'))) {
                    chars.next();
                } else {
                    break;
                }
            }
            '\n' => break,
            _ => {}
        }
    }
}

// ============================================================================
// WRAPPER LAYER
// ============================================================================

/// (first word, second word) pairs that fuse into one token
fn joined_kind(first: &str, second: &str) -> Option<TokenKind> {
    let kind = match (first, second) {
        ("end", "if") => TokenKind::EndIf,
        ("end", "for") => TokenKind::EndFor,
        ("end", "while") => TokenKind::EndWhile,
        ("end", "function") => TokenKind::EndFunction,
        ("end", "sub") => TokenKind::EndSub,
        ("end", "class") => TokenKind::EndClass,
        ("end", "namespace") => TokenKind::EndNamespace,
        ("end", "try") => TokenKind::EndTry,
        ("else", "if") => TokenKind::ElseIf,
        ("exit", "for") => TokenKind::ExitFor,
        ("exit", "while") => TokenKind::ExitWhile,
        ("for", "each") => TokenKind::ForEach,
        ("continue", "for") => TokenKind::ContinueFor,
        ("continue", "while") => TokenKind::ContinueWhile,
        _ => return None,
    };
    Some(kind)
}

struct LexState<'a> {
    source: &'a str,
    line_index: &'a LineIndex,
    options: LexerOptions,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    pending_whitespace: Option<SmolStr>,
}

impl<'a> LexState<'a> {
    fn range_at(&self, bias: usize, span: std::ops::Range<usize>) -> Range {
        let start = TextSize::new((bias + span.start) as u32);
        let end = TextSize::new((bias + span.end) as u32);
        self.line_index.range(TextRange::new(start, end))
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<SmolStr>, range: Range) {
        let mut token = Token::new(kind, text, range);
        token.leading_whitespace = self.pending_whitespace.take();
        self.tokens.push(token);
    }

    fn last_emitted_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    /// Lex one slice of the original source. `bias` is the slice's byte
    /// offset within the full text so ranges stay absolute; template
    /// interpolations recurse through here.
    fn lex_slice(&mut self, slice: &str, bias: usize) {
        let mut lexer = RawToken::lexer(slice);
        let mut raws: Vec<(Result<RawToken, ()>, std::ops::Range<usize>)> = Vec::new();
        while let Some(result) = lexer.next() {
            raws.push((result, lexer.span()));
        }

        let mut i = 0;
        while i < raws.len() {
            let (ref result, ref span) = raws[i];
            let text = &slice[span.clone()];
            let range = self.range_at(bias, span.clone());
            match result {
                Err(()) => {
                    let ch = text.chars().next().unwrap_or('\u{fffd}');
                    self.diagnostics
                        .push(messages::unexpected_character(ch, range));
                    i += 1;
                }
                Ok(RawToken::Whitespace) => {
                    if self.options.include_whitespace {
                        self.emit(TokenKind::Whitespace, text, range);
                    } else {
                        self.pending_whitespace = Some(SmolStr::new(text));
                    }
                    i += 1;
                }
                Ok(RawToken::Newline) => {
                    self.emit(TokenKind::Newline, text, range);
                    i += 1;
                }
                Ok(RawToken::Comment) => {
                    self.emit(TokenKind::Comment, text, range);
                    i += 1;
                }
                Ok(RawToken::String) => {
                    self.emit(TokenKind::StringLiteral, text, range);
                    i += 1;
                }
                Ok(RawToken::UnterminatedString) => {
                    self.diagnostics.push(messages::unterminated_string(range));
                    // still tokenized so the parser can keep going
                    self.emit(TokenKind::StringLiteral, text, range);
                    i += 1;
                }
                Ok(RawToken::Number) => {
                    self.emit(classify_number(text), text, range);
                    i += 1;
                }
                Ok(RawToken::HexLiteral) => {
                    let kind = if text.ends_with('&') {
                        TokenKind::LongIntegerLiteral
                    } else {
                        TokenKind::IntegerLiteral
                    };
                    self.emit(kind, text, range);
                    i += 1;
                }
                Ok(RawToken::BadHexLiteral) => {
                    self.diagnostics
                        .push(messages::invalid_numeric_literal(text, range));
                    self.emit(TokenKind::IntegerLiteral, text, range);
                    i += 1;
                }
                Ok(RawToken::Identifier) => {
                    i = self.lex_identifier(slice, bias, &raws, i);
                }
                Ok(RawToken::Hash) => {
                    i = self.lex_directive(slice, bias, &raws, i);
                }
                Ok(RawToken::TemplateString) => {
                    self.decompose_template(text, bias + span.start);
                    i += 1;
                }
                Ok(raw) => {
                    if let Some(kind) = punctuation_kind(*raw) {
                        self.emit(kind, text, range);
                    }
                    i += 1;
                }
            }
        }
    }

    /// Identifier handling: line continuation, `rem` comments, keyword
    /// routing, and multi-word joining.
    fn lex_identifier(
        &mut self,
        slice: &str,
        bias: usize,
        raws: &[(Result<RawToken, ()>, std::ops::Range<usize>)],
        i: usize,
    ) -> usize {
        let span = raws[i].1.clone();
        let text = &slice[span.clone()];
        let range = self.range_at(bias, span.clone());

        // line continuation: `_` directly before a newline is absorbed
        // along with the newline
        if text == "_" {
            if let Some(j) = next_significant(raws, i + 1) {
                if raws[j].0 == Ok(RawToken::Newline) {
                    self.pending_whitespace = None;
                    return j + 1;
                }
            }
        }

        let lower = text.to_ascii_lowercase();

        // `rem` opens a comment when in statement position
        if lower == "rem"
            && matches!(
                self.last_emitted_kind(),
                None | Some(TokenKind::Newline) | Some(TokenKind::Colon)
            )
        {
            let mut j = i;
            while j + 1 < raws.len() && raws[j + 1].0 != Ok(RawToken::Newline) {
                j += 1;
            }
            let end = raws[j].1.end;
            let comment_range = self.range_at(bias, span.start..end);
            self.emit(TokenKind::Comment, &slice[span.start..end], comment_range);
            return j + 1;
        }

        // multi-word joining: the two words fuse when separated only by
        // blank space on the same line
        if let Some(j) = next_significant(raws, i + 1) {
            if raws[j].0 == Ok(RawToken::Identifier) {
                let second = slice[raws[j].1.clone()].to_ascii_lowercase();
                if let Some(kind) = joined_kind(&lower, &second) {
                    let end = raws[j].1.end;
                    let joined_range = self.range_at(bias, span.start..end);
                    self.emit(kind, &slice[span.start..end], joined_range);
                    return j + 1;
                }
            }
        }

        let kind = keyword_kind(&lower).unwrap_or(TokenKind::Identifier);
        self.emit(kind, text, range);
        i + 1
    }

    /// `#const`, `#if`, `#else if`, `#else`, `#end if`
    fn lex_directive(
        &mut self,
        slice: &str,
        bias: usize,
        raws: &[(Result<RawToken, ()>, std::ops::Range<usize>)],
        i: usize,
    ) -> usize {
        let hash_span = raws[i].1.clone();
        let Some(j) = next_significant(raws, i + 1) else {
            let range = self.range_at(bias, hash_span);
            self.diagnostics.push(messages::unexpected_token("#", range));
            return i + 1;
        };
        if raws[j].0 != Ok(RawToken::Identifier) {
            let range = self.range_at(bias, hash_span);
            self.diagnostics.push(messages::unexpected_token("#", range));
            return i + 1;
        }
        let word = slice[raws[j].1.clone()].to_ascii_lowercase();
        let mut end = raws[j].1.end;
        let mut next = j + 1;

        // `#else if` and `#end if` absorb the trailing `if`
        let trailing_if = next_significant(raws, j + 1).filter(|&k| {
            raws[k].0 == Ok(RawToken::Identifier)
                && slice[raws[k].1.clone()].eq_ignore_ascii_case("if")
        });

        let kind = match word.as_str() {
            "const" => TokenKind::HashConst,
            "if" => TokenKind::HashIf,
            "elseif" => TokenKind::HashElseIf,
            "endif" => TokenKind::HashEndIf,
            "else" => match trailing_if {
                Some(k) => {
                    end = raws[k].1.end;
                    next = k + 1;
                    TokenKind::HashElseIf
                }
                None => TokenKind::HashElse,
            },
            "end" => match trailing_if {
                Some(k) => {
                    end = raws[k].1.end;
                    next = k + 1;
                    TokenKind::HashEndIf
                }
                None => {
                    let range = self.range_at(bias, hash_span.start..end);
                    self.diagnostics
                        .push(messages::unexpected_token("#end", range));
                    TokenKind::HashEndIf
                }
            },
            other => {
                let range = self.range_at(bias, hash_span.start..end);
                self.diagnostics
                    .push(messages::unexpected_token(&format!("#{other}"), range));
                return next;
            }
        };
        let range = self.range_at(bias, hash_span.start..end);
        self.emit(kind, &slice[hash_span.start..end], range);
        next
    }

    /// Split a whole-template raw token into backtick, quasi, and
    /// interpolation tokens. Interpolation bodies are re-lexed through
    /// [`LexState::lex_slice`].
    fn decompose_template(&mut self, text: &str, abs_start: usize) {
        let open_range = self.range_at(abs_start, 0..1);
        self.emit(TokenKind::BackTick, "`", open_range);

        let bytes = text.as_bytes();
        let mut i = 1;
        loop {
            // quasi: everything up to `${`, the closing backtick, or EOF
            let quasi_start = i;
            while i < text.len() {
                match bytes[i] {
                    b'`' => break,
                    b'$' if i + 1 < text.len() && bytes[i + 1] == b'{' => break,
                    _ => {
                        i += utf8_len(bytes[i]);
                    }
                }
            }
            let quasi_range = self.range_at(abs_start, quasi_start..i);
            self.emit(TokenKind::TemplateQuasi, &text[quasi_start..i], quasi_range);

            if i >= text.len() {
                let whole = self.range_at(abs_start, 0..text.len());
                self.diagnostics.push(messages::unterminated_string(whole));
                return;
            }
            if bytes[i] == b'`' {
                let close_range = self.range_at(abs_start, i..i + 1);
                self.emit(TokenKind::BackTick, "`", close_range);
                return;
            }

            // `${` … `}` interpolation
            let begin_range = self.range_at(abs_start, i..i + 2);
            self.emit(TokenKind::TemplateExprBegin, "${", begin_range);
            i += 2;
            let expr_start = i;
            let Some(expr_end) = find_interpolation_end(text, i) else {
                let whole = self.range_at(abs_start, 0..text.len());
                self.diagnostics.push(messages::unterminated_string(whole));
                return;
            };
            self.lex_slice(&text[expr_start..expr_end], abs_start + expr_start);
            self.pending_whitespace = None;
            let end_range = self.range_at(abs_start, expr_end..expr_end + 1);
            self.emit(TokenKind::TemplateExprEnd, "}", end_range);
            i = expr_end + 1;
        }
    }
}

/// Index of the next raw token that is not plain whitespace
fn next_significant(
    raws: &[(Result<RawToken, ()>, std::ops::Range<usize>)],
    from: usize,
) -> Option<usize> {
    let mut i = from;
    while i < raws.len() {
        if raws[i].0 != Ok(RawToken::Whitespace) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Byte position of the `}` closing the interpolation opened just before
/// `from`, skipping strings and balanced braces and nested templates
fn find_interpolation_end(text: &str, from: usize) -> Option<usize> {
    let mut stack: Vec<TemplateMode> = vec![TemplateMode::Interp { depth: 0 }];
    let mut chars = text[from..].char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        match stack.last_mut() {
            Some(TemplateMode::Interp { depth }) => match ch {
                '`' => stack.push(TemplateMode::Template),
                '"' => skip_string_literal(&mut chars),
                '{' => *depth += 1,
                '}' => {
                    if *depth == 0 {
                        stack.pop();
                        if stack.is_empty() {
                            return Some(from + i);
                        }
                    } else {
                        *depth -= 1;
                    }
                }
                _ => {}
            },
            Some(TemplateMode::Template) => match ch {
                '`' => {
                    stack.pop();
                }
                '$' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        stack.push(TemplateMode::Interp { depth: 0 });
                    }
                }
                _ => {}
            },
            None => break,
        }
    }
    None
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        _ => 2,
    }
}

/// Numeric literal classification by designator and shape
fn classify_number(text: &str) -> TokenKind {
    match text.as_bytes().last() {
        Some(b'&') => TokenKind::LongIntegerLiteral,
        Some(b'%') => TokenKind::IntegerLiteral,
        Some(b'!') => TokenKind::FloatLiteral,
        Some(b'#') => TokenKind::DoubleLiteral,
        _ => {
            if text.bytes().any(|b| b == b'd' || b == b'D') {
                TokenKind::DoubleLiteral
            } else if text.bytes().any(|b| b == b'.' || b == b'e' || b == b'E') {
                TokenKind::FloatLiteral
            } else {
                TokenKind::IntegerLiteral
            }
        }
    }
}

fn punctuation_kind(raw: RawToken) -> Option<TokenKind> {
    let kind = match raw {
        RawToken::LeftParen => TokenKind::LeftParen,
        RawToken::RightParen => TokenKind::RightParen,
        RawToken::LeftBracket => TokenKind::LeftBracket,
        RawToken::RightBracket => TokenKind::RightBracket,
        RawToken::LeftBrace => TokenKind::LeftBrace,
        RawToken::RightBrace => TokenKind::RightBrace,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Backslash => TokenKind::Backslash,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Equal => TokenKind::Equal,
        RawToken::LessGreater => TokenKind::LessGreater,
        RawToken::Less => TokenKind::Less,
        RawToken::Greater => TokenKind::Greater,
        RawToken::LessEqual => TokenKind::LessEqual,
        RawToken::GreaterEqual => TokenKind::GreaterEqual,
        RawToken::LeftShift => TokenKind::LeftShift,
        RawToken::RightShift => TokenKind::RightShift,
        RawToken::PlusEqual => TokenKind::PlusEqual,
        RawToken::MinusEqual => TokenKind::MinusEqual,
        RawToken::StarEqual => TokenKind::StarEqual,
        RawToken::SlashEqual => TokenKind::SlashEqual,
        RawToken::BackslashEqual => TokenKind::BackslashEqual,
        RawToken::LeftShiftEqual => TokenKind::LeftShiftEqual,
        RawToken::RightShiftEqual => TokenKind::RightShiftEqual,
        RawToken::PlusPlus => TokenKind::PlusPlus,
        RawToken::MinusMinus => TokenKind::MinusMinus,
        RawToken::Question => TokenKind::Question,
        RawToken::At => TokenKind::At,
        RawToken::CallfuncOp => TokenKind::Callfunc,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::scan(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("If THEN eLsE"),
            vec![
                TokenKind::If,
                TokenKind::Then,
                TokenKind::Else,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn multi_word_tokens_join_across_whitespace() {
        let result = Lexer::scan("end   if");
        assert_eq!(result.tokens[0].kind, TokenKind::EndIf);
        assert_eq!(result.tokens[0].text.as_str(), "end   if");
        assert_eq!(result.tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn multi_word_tokens_do_not_join_across_newlines() {
        assert_eq!(
            kinds("end\nif"),
            vec![
                TokenKind::End,
                TokenKind::Newline,
                TokenKind::If,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn identifier_type_designators_stay_attached() {
        let result = Lexer::scan("name$ count% ratio!");
        assert_eq!(result.tokens[0].text.as_str(), "name$");
        assert_eq!(result.tokens[1].text.as_str(), "count%");
        assert_eq!(result.tokens[2].text.as_str(), "ratio!");
        assert!(
            result.tokens[..3]
                .iter()
                .all(|t| t.kind == TokenKind::Identifier)
        );
    }

    #[test]
    fn numeric_literals_classify_by_designator() {
        let result = Lexer::scan("1 2% 3! 4# 5& 6.5 7e3 1d3 &hFF &hFF&");
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::FloatLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::LongIntegerLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::LongIntegerLiteral,
                TokenKind::Eof
            ]
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn trailing_dot_number_is_accepted() {
        let result = Lexer::scan("3.");
        assert_eq!(result.tokens[0].kind, TokenKind::FloatLiteral);
        assert_eq!(result.tokens[0].text.as_str(), "3.");
    }

    #[test]
    fn string_escape_is_doubled_quote() {
        let result = Lexer::scan(r#""say ""hi""""#);
        assert_eq!(result.tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(result.tokens[0].text.as_str(), r#""say ""hi""""#);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn unterminated_string_reports_and_recovers() {
        let result = Lexer::scan("a = \"oops\nb = 1");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].code,
            messages::UNTERMINATED_STRING
        );
        // the erroneous content is still tokenized
        assert!(
            result
                .tokens
                .iter()
                .any(|t| t.kind == TokenKind::StringLiteral)
        );
    }

    #[test]
    fn line_continuation_absorbs_newline() {
        let result = Lexer::scan("a = 1 + _\n 2");
        assert!(!result.tokens.iter().any(|t| t.kind == TokenKind::Newline));
    }

    #[test]
    fn rem_comment_runs_to_end_of_line() {
        let result = Lexer::scan("rem hello world\na = 1");
        assert_eq!(result.tokens[0].kind, TokenKind::Comment);
        assert_eq!(result.tokens[0].text.as_str(), "rem hello world");
    }

    #[test]
    fn rem_is_a_property_after_dot() {
        let result = Lexer::scan("x = m.rem");
        assert!(!result.tokens.iter().any(|t| t.kind == TokenKind::Comment));
    }

    #[test]
    fn directive_tokens_join() {
        let result = Lexer::scan("#const a = true\n#if a\n#else if b\n#end if");
        let directive_kinds: Vec<_> = result
            .tokens
            .iter()
            .filter(|t| {
                matches!(
                    t.kind,
                    TokenKind::HashConst
                        | TokenKind::HashIf
                        | TokenKind::HashElseIf
                        | TokenKind::HashEndIf
                )
            })
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            directive_kinds,
            vec![
                TokenKind::HashConst,
                TokenKind::HashIf,
                TokenKind::HashElseIf,
                TokenKind::HashEndIf
            ]
        );
    }

    #[test]
    fn template_string_decomposes_into_quasis_and_interpolations() {
        let result = Lexer::scan("`a${name}b`");
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::BackTick,
                TokenKind::TemplateQuasi,
                TokenKind::TemplateExprBegin,
                TokenKind::Identifier,
                TokenKind::TemplateExprEnd,
                TokenKind::TemplateQuasi,
                TokenKind::BackTick,
                TokenKind::Eof
            ]
        );
        assert_eq!(result.tokens[1].text.as_str(), "a");
        assert_eq!(result.tokens[3].text.as_str(), "name");
        assert_eq!(result.tokens[5].text.as_str(), "b");
    }

    #[test]
    fn template_string_preserves_newlines() {
        let result = Lexer::scan("`line1\nline2`");
        assert_eq!(result.tokens[1].kind, TokenKind::TemplateQuasi);
        assert_eq!(result.tokens[1].text.as_str(), "line1\nline2");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn nested_template_strings() {
        let result = Lexer::scan("`a${`inner${x}`}b`");
        assert!(result.diagnostics.is_empty());
        let backticks = result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::BackTick)
            .count();
        assert_eq!(backticks, 4);
    }

    #[test]
    fn reparse_is_deterministic() {
        let source = "sub main()\n  a = `x${1 + 2}`\nend sub";
        let first = Lexer::scan(source);
        let second = Lexer::scan(source);
        assert_eq!(first.tokens, second.tokens);
    }

    #[test]
    fn ranges_are_zero_based_line_col() {
        let result = Lexer::scan("a\nbb");
        assert_eq!(result.tokens[0].range, Range::from_coords(0, 0, 0, 1));
        assert_eq!(result.tokens[2].range, Range::from_coords(1, 0, 1, 2));
    }

    #[test]
    fn whitespace_is_leading_trivia_by_default() {
        let result = Lexer::scan("a  b");
        assert_eq!(
            result.tokens[1].leading_whitespace.as_deref(),
            Some("  ")
        );
    }

    #[test]
    fn whitespace_tokens_when_requested() {
        let result = Lexer::scan_with_options(
            "a b",
            LexerOptions {
                include_whitespace: true,
            },
        );
        assert!(
            result
                .tokens
                .iter()
                .any(|t| t.kind == TokenKind::Whitespace)
        );
    }
}
