//! Expression-level grammar: precedence climbing with postfix chains.

use crate::ast::{
    AAMember, AALiteralExpression, ArrayLiteralExpression, BinaryExpression, CallExpression,
    CallfuncExpression, CommentExpression, DottedGetExpression, EscapedCharCodeLiteralExpression,
    Expression, GroupingExpression, IndexedGetExpression, LiteralExpression,
    NamespacedVariableNameExpression, NewExpression, SourceLiteralExpression, SourceLiteralKind,
    TaggedTemplateStringExpression, TemplateStringExpression, TemplateStringQuasiExpression,
    TernaryExpression, TypeExpression, UnaryExpression, VariableExpression,
    XmlAttributeGetExpression,
};
use crate::lexer::{Token, TokenKind};

use super::Parser;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Option<Expression> {
        self.parse_ternary_expression()
    }

    fn parse_ternary_expression(&mut self) -> Option<Expression> {
        let condition = self.parse_or_expression()?;
        if self.check(TokenKind::Question) {
            let question = self.advance();
            self.gate_extended("ternary operator", question.range);
            self.skip_newlines();
            let consequent = self.parse_ternary_expression()?;
            self.skip_newlines();
            self.expect(TokenKind::Colon)?;
            self.skip_newlines();
            let alternate = self.parse_ternary_expression()?;
            let range = condition.range().cover(&alternate.range());
            return Some(Expression::Ternary(TernaryExpression {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
                range,
            }));
        }
        Some(condition)
    }

    fn parse_or_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_and_expression()?;
        while self.check(TokenKind::Or) {
            let operator = self.advance();
            let right = self.parse_and_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_and_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_not_expression()?;
        while self.check(TokenKind::And) {
            let operator = self.advance();
            let right = self.parse_not_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_not_expression(&mut self) -> Option<Expression> {
        if self.check(TokenKind::Not) {
            let operator = self.advance();
            let operand = self.parse_not_expression()?;
            let range = operator.range.cover(&operand.range());
            return Some(Expression::Unary(UnaryExpression {
                operator,
                operand: Box::new(operand),
                range,
            }));
        }
        self.parse_comparison_expression()
    }

    fn parse_comparison_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_shift_expression()?;
        while matches!(
            self.kind(),
            TokenKind::Equal
                | TokenKind::LessGreater
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
        ) {
            let operator = self.advance();
            let right = self.parse_shift_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_shift_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_additive_expression()?;
        while matches!(self.kind(), TokenKind::LeftShift | TokenKind::RightShift) {
            let operator = self.advance();
            let right = self.parse_additive_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_additive_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_multiplicative_expression()?;
        while matches!(self.kind(), TokenKind::Plus | TokenKind::Minus) {
            let operator = self.advance();
            let right = self.parse_multiplicative_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_exponent_expression()?;
        while matches!(
            self.kind(),
            TokenKind::Star | TokenKind::Slash | TokenKind::Backslash | TokenKind::Mod
        ) {
            let operator = self.advance();
            let right = self.parse_exponent_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_exponent_expression(&mut self) -> Option<Expression> {
        let mut left = self.parse_unary_expression()?;
        while self.check(TokenKind::Caret) {
            let operator = self.advance();
            let right = self.parse_unary_expression()?;
            left = binary(left, operator, right);
        }
        Some(left)
    }

    fn parse_unary_expression(&mut self) -> Option<Expression> {
        if matches!(self.kind(), TokenKind::Minus | TokenKind::Plus) {
            let operator = self.advance();
            let operand = self.parse_unary_expression()?;
            let range = operator.range.cover(&operand.range());
            return Some(Expression::Unary(UnaryExpression {
                operator,
                operand: Box::new(operand),
                range,
            }));
        }
        self.parse_postfix_expression()
    }

    /// A primary expression plus its call/index/member chain. Also the
    /// entry point for statement-leading expressions.
    pub(crate) fn parse_postfix_expression(&mut self) -> Option<Expression> {
        let mut expr = self.parse_primary_expression()?;
        loop {
            match self.kind() {
                TokenKind::LeftParen => {
                    let open = self.advance();
                    let args = self.parse_argument_list();
                    let close = self.expect(TokenKind::RightParen);
                    let end = close.map(|t| t.range).unwrap_or(open.range);
                    let range = expr.range().cover(&end);
                    expr = Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        args,
                        open_paren_range: open.range,
                        range,
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    let close = self.expect(TokenKind::RightBracket);
                    let end = close.map(|t| t.range).unwrap_or(index.range());
                    let range = expr.range().cover(&end);
                    expr = Expression::IndexedGet(IndexedGetExpression {
                        obj: Box::new(expr),
                        index: Box::new(index),
                        range,
                    });
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier_like()?;
                    self.references_mut().add_property_hint(&name.text);
                    let range = expr.range().cover(&name.range);
                    expr = Expression::DottedGet(DottedGetExpression {
                        obj: Box::new(expr),
                        name,
                        range,
                    });
                }
                TokenKind::Callfunc => {
                    self.advance();
                    let method = self.expect_identifier_like()?;
                    self.expect(TokenKind::LeftParen)?;
                    let args = self.parse_argument_list();
                    let close = self.expect(TokenKind::RightParen);
                    let end = close.map(|t| t.range).unwrap_or(method.range);
                    let range = expr.range().cover(&end);
                    expr = Expression::Callfunc(CallfuncExpression {
                        obj: Box::new(expr),
                        method,
                        args,
                        range,
                    });
                }
                TokenKind::At => {
                    self.advance();
                    let name = self.expect_identifier_like()?;
                    let range = expr.range().cover(&name.range);
                    expr = Expression::XmlAttributeGet(XmlAttributeGetExpression {
                        obj: Box::new(expr),
                        name,
                        range,
                    });
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_argument_list(&mut self) -> Vec<Expression> {
        let mut args = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::RightParen) && !self.at_eof() {
            let Some(arg) = self.parse_expression() else {
                break;
            };
            args.push(arg);
            self.skip_newlines();
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            self.skip_newlines();
        }
        args
    }

    fn parse_primary_expression(&mut self) -> Option<Expression> {
        match self.kind() {
            TokenKind::StringLiteral
            | TokenKind::IntegerLiteral
            | TokenKind::LongIntegerLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Invalid => {
                let token = self.advance();
                let range = token.range;
                Some(Expression::Literal(LiteralExpression { token, range }))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                let range = token.range;

                // exact-match compile-time source literals
                if let Some(literal_kind) = SourceLiteralKind::from_name(&token.text) {
                    return Some(Expression::SourceLiteral(SourceLiteralExpression {
                        literal_kind,
                        token,
                        range,
                    }));
                }

                // tagged template: identifier immediately followed by a
                // backtick on the same line
                if self.check(TokenKind::BackTick)
                    && self.current().leading_whitespace.is_none()
                    && self.current().range.start == range.end
                {
                    return self.parse_template_string(Some(token));
                }

                Some(Expression::Variable(VariableExpression { name: token, range }))
            }
            // a few keywords double as identifiers in expression position
            TokenKind::Public | TokenKind::Protected | TokenKind::Private | TokenKind::Override => {
                let mut token = self.advance();
                token.kind = TokenKind::Identifier;
                let range = token.range;
                Some(Expression::Variable(VariableExpression { name: token, range }))
            }
            TokenKind::LeftParen => {
                let open = self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                let close = self.expect(TokenKind::RightParen);
                let end = close.map(|t| t.range).unwrap_or(inner.range());
                Some(Expression::Grouping(GroupingExpression {
                    inner: Box::new(inner),
                    range: open.range.cover(&end),
                }))
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_aa_literal(),
            TokenKind::Sub | TokenKind::Function => {
                let keyword = self.advance();
                let is_sub = keyword.kind == TokenKind::Sub;
                let func = self.parse_function_tail(is_sub, keyword.range);
                Some(Expression::Function(func))
            }
            TokenKind::New => {
                let keyword = self.advance();
                self.gate_extended("classes", keyword.range);
                let class_name = self.parse_namespaced_name()?;
                self.expect(TokenKind::LeftParen)?;
                let args = self.parse_argument_list();
                let close = self.expect(TokenKind::RightParen);
                let end = close.map(|t| t.range).unwrap_or(class_name.range);
                Some(Expression::New(NewExpression {
                    range: keyword.range.cover(&end),
                    class_name,
                    args,
                }))
            }
            TokenKind::BackTick => self.parse_template_string(None),
            _ => {
                self.unexpected_token();
                None
            }
        }
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let open = self.advance();
        let mut elements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::RightBracket) && !self.at_eof() {
            if self.check(TokenKind::Comment) {
                let token = self.advance();
                let range = token.range;
                elements.push(Expression::Comment(CommentExpression { token, range }));
                self.skip_newlines();
                continue;
            }
            let Some(element) = self.parse_expression() else {
                break;
            };
            elements.push(element);
            // elements separate by comma, newline, or both
            let mut separated = false;
            while self.check(TokenKind::Newline) {
                self.advance();
                separated = true;
            }
            if self.eat(TokenKind::Comma).is_some() {
                separated = true;
                self.skip_newlines();
            }
            if !separated && !self.check(TokenKind::Comment) {
                break;
            }
        }
        let close = self.expect(TokenKind::RightBracket);
        let end = close.map(|t| t.range).unwrap_or(open.range);
        Some(Expression::ArrayLiteral(ArrayLiteralExpression {
            elements,
            range: open.range.cover(&end),
        }))
    }

    fn parse_aa_literal(&mut self) -> Option<Expression> {
        let open = self.advance();
        let mut members = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::RightBrace) && !self.at_eof() {
            if self.check(TokenKind::Comment) {
                members.push(AAMember::Comment(self.advance()));
                self.skip_newlines();
                continue;
            }
            // keys are identifiers (reserved words allowed) or strings
            let key = if self.check(TokenKind::StringLiteral) {
                self.advance()
            } else {
                match self.expect_identifier_like() {
                    Some(key) => key,
                    None => break,
                }
            };
            if key.kind != TokenKind::StringLiteral {
                self.references_mut().add_property_hint(&key.text);
            }
            self.expect(TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            let range = key.range.cover(&value.range());
            members.push(AAMember::Field { key, value, range });
            // members separate by comma, newline, or both
            let mut separated = false;
            while self.check(TokenKind::Newline) {
                self.advance();
                separated = true;
            }
            if self.eat(TokenKind::Comma).is_some() {
                separated = true;
                self.skip_newlines();
            }
            if !separated && !self.check(TokenKind::Comment) {
                break;
            }
        }
        let close = self.expect(TokenKind::RightBrace);
        let end = close.map(|t| t.range).unwrap_or(open.range);
        Some(Expression::AALiteral(AALiteralExpression {
            members,
            range: open.range.cover(&end),
        }))
    }

    /// `A.B.C` in namespace, class-extends, and `new` positions
    pub(crate) fn parse_namespaced_name(&mut self) -> Option<NamespacedVariableNameExpression> {
        let first = self.expect_identifier()?;
        let mut range = first.range;
        let mut parts = vec![first];
        while self.check(TokenKind::Dot) {
            self.advance();
            let part = self.expect_identifier_like()?;
            range = range.cover(&part.range);
            parts.push(part);
        }
        Some(NamespacedVariableNameExpression { parts, range })
    }

    /// The dotted name after `as`
    pub(crate) fn parse_type_expression(&mut self) -> Option<TypeExpression> {
        let first = match self.kind() {
            kind if kind.is_identifier_like() => self.advance(),
            _ => {
                let found = crate::lexer::kind_to_name(self.kind());
                let range = self.current().range;
                self.diagnostic(crate::diagnostics::messages::expected_identifier(
                    found, range,
                ));
                return None;
            }
        };
        let mut range = first.range;
        let mut parts = vec![first];
        while self.check(TokenKind::Dot) {
            self.advance();
            let part = self.expect_identifier_like()?;
            range = range.cover(&part.range);
            parts.push(part);
        }
        Some(TypeExpression { parts, range })
    }

    // =========================================================================
    // Template strings
    // =========================================================================

    /// Parse from the opening backtick. `tag` is the adjacent identifier
    /// of a tagged template, when present.
    fn parse_template_string(&mut self, tag: Option<Token>) -> Option<Expression> {
        let open = self.expect(TokenKind::BackTick)?;
        self.gate_extended("template strings", open.range);

        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        // the lexer guarantees quasi/interpolation alternation with a
        // quasi (possibly empty) first and last
        let quasi = self.parse_template_quasi();
        quasis.push(quasi);
        while self.check(TokenKind::TemplateExprBegin) {
            self.advance();
            if let Some(expr) = self.parse_expression() {
                expressions.push(expr);
            }
            self.expect(TokenKind::TemplateExprEnd);
            quasis.push(self.parse_template_quasi());
        }
        let close = self.expect(TokenKind::BackTick);
        let end = close.map(|t| t.range).unwrap_or(open.range);
        let range = tag
            .as_ref()
            .map(|t| t.range)
            .unwrap_or(open.range)
            .cover(&end);

        match tag {
            Some(tag) => Some(Expression::TaggedTemplateString(
                TaggedTemplateStringExpression {
                    tag,
                    quasis,
                    expressions,
                    range,
                },
            )),
            None => Some(Expression::TemplateString(TemplateStringExpression {
                quasis,
                expressions,
                range,
            })),
        }
    }

    /// One literal run: string pieces interleaved with escaped char codes
    /// for quotes and newlines (so lowering can emit `chr(n)`)
    fn parse_template_quasi(&mut self) -> TemplateStringQuasiExpression {
        let Some(token) = self.eat(TokenKind::TemplateQuasi) else {
            let range = self.current().range;
            return TemplateStringQuasiExpression {
                parts: Vec::new(),
                range,
            };
        };
        let range = token.range;
        let mut parts = Vec::new();
        let mut piece = String::new();
        for ch in token.text.chars() {
            match ch {
                '"' | '\n' => {
                    if !piece.is_empty() {
                        parts.push(Expression::string_literal(format!("\"{piece}\""), range));
                        piece = String::new();
                    }
                    parts.push(Expression::EscapedCharCodeLiteral(
                        EscapedCharCodeLiteralExpression {
                            char_code: ch as u32,
                            range,
                        },
                    ));
                }
                '\r' => {}
                _ => piece.push(ch),
            }
        }
        if !piece.is_empty() {
            parts.push(Expression::string_literal(format!("\"{piece}\""), range));
        }
        TemplateStringQuasiExpression { parts, range }
    }
}

fn binary(left: Expression, operator: Token, right: Expression) -> Expression {
    let range = left.range().cover(&right.range());
    Expression::Binary(BinaryExpression {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        range,
    })
}
