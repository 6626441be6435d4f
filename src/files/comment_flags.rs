//! Inline diagnostic-suppression directives.
//!
//! A line comment containing `bs:disable-line[: code, code]` suppresses
//! diagnostics on its own line; `bs:disable-next-line[: …]` suppresses on
//! the following line. An empty code list disables every diagnostic in
//! the affected range.

use crate::base::{Position, Range};
use crate::diagnostics::{Diagnostic, messages};
use crate::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub struct CommentFlag {
    pub affected_range: Range,
    /// `None` disables all codes
    pub codes: Option<Vec<u32>>,
}

impl CommentFlag {
    pub fn suppresses(&self, diagnostic: &Diagnostic) -> bool {
        if !self.affected_range.contains(diagnostic.range.start) {
            return false;
        }
        match &self.codes {
            None => true,
            Some(codes) => codes.contains(&diagnostic.code),
        }
    }
}

/// Scan comment tokens for disable directives. Unknown numeric codes
/// produce an `unknownDiagnosticCode` diagnostic at the comment.
pub fn extract_comment_flags(
    comments: &[Token],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<CommentFlag> {
    let mut flags = Vec::new();
    for token in comments {
        let text = token.text.trim_start_matches('\'').trim();
        let (directive_line, rest) = if let Some(rest) = strip_directive(text, "bs:disable-next-line")
        {
            (token.range.start.line + 1, rest)
        } else if let Some(rest) = strip_directive(text, "bs:disable-line") {
            (token.range.start.line, rest)
        } else {
            continue;
        };

        let codes = parse_code_list(rest, token, diagnostics);
        flags.push(CommentFlag {
            affected_range: Range::new(
                Position::new(directive_line, 0),
                Position::new(directive_line, u32::MAX),
            ),
            codes,
        });
    }
    flags
}

fn strip_directive<'a>(text: &'a str, directive: &str) -> Option<&'a str> {
    let stripped = text.strip_prefix(directive)?;
    // the directive must be the whole word: either nothing, or a code list
    if stripped.is_empty() {
        Some("")
    } else {
        stripped.strip_prefix(':')
    }
}

fn parse_code_list(
    rest: &str,
    token: &Token,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<u32>> {
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    let mut codes = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<u32>() {
            Ok(code) => {
                if messages::is_known_code(code) {
                    codes.push(code);
                } else {
                    diagnostics.push(messages::unknown_diagnostic_code(code, token.range));
                }
            }
            Err(_) => {
                diagnostics.push(messages::unexpected_token(part, token.range));
            }
        }
    }
    // a supplied-but-unrecognised list suppresses nothing rather than
    // everything
    Some(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn comment(text: &str, line: u32) -> Token {
        Token::new(
            TokenKind::Comment,
            text,
            Range::from_coords(line, 10, line, 10 + text.len() as u32),
        )
    }

    #[test]
    fn disable_line_affects_own_line() {
        let mut diagnostics = Vec::new();
        let flags = extract_comment_flags(&[comment("'bs:disable-line", 4)], &mut diagnostics);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].codes.is_none());
        assert!(flags[0]
            .affected_range
            .contains(Position::new(4, 0)));
        assert!(!flags[0]
            .affected_range
            .contains(Position::new(5, 0)));
    }

    #[test]
    fn disable_next_line_affects_following_line() {
        let mut diagnostics = Vec::new();
        let flags =
            extract_comment_flags(&[comment("'bs:disable-next-line: 1102", 2)], &mut diagnostics);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].codes, Some(vec![1102]));
        assert!(flags[0]
            .affected_range
            .contains(Position::new(3, 7)));
    }

    #[test]
    fn unknown_code_is_reported() {
        let mut diagnostics = Vec::new();
        let flags =
            extract_comment_flags(&[comment("'bs:disable-line: 9999", 0)], &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, messages::UNKNOWN_DIAGNOSTIC_CODE);
        // the flag survives but suppresses nothing
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].codes, Some(vec![]));
    }

    #[test]
    fn suppression_respects_code_list() {
        let flag = CommentFlag {
            affected_range: Range::from_coords(3, 0, 3, u32::MAX),
            codes: Some(vec![1102]),
        };
        let suppressed = Diagnostic::error(1102, "dup", Range::from_coords(3, 4, 3, 8));
        let kept = Diagnostic::error(1100, "unknown", Range::from_coords(3, 4, 3, 8));
        assert!(flag.suppresses(&suppressed));
        assert!(!flag.suppresses(&kept));
    }
}
