//! Bitmask-driven AST traversal with safe in-place replacement.
//!
//! `walk` visits each owned child field whose kind is selected by the
//! options' [`WalkMode`]. A visitor returning a replacement node causes
//! the walker to swap it into the parent; the replacement is neither
//! re-visited nor descended into during the same traversal. The walker
//! polls the cancellation token before every visit and returns without
//! further mutation once it is set.

use bitflags::bitflags;
use tokio_util::sync::CancellationToken;

use super::expression::{AAMember, Expression, FunctionExpression};
use super::statement::{PrintPart, Statement};

bitflags! {
    /// Which node kinds to visit, and which to descend through. Visit and
    /// walk bits are independent: a caller may descend into children
    /// without visiting the parents, or visit one level without
    /// descending.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WalkMode: u8 {
        const VISIT_STATEMENTS = 1;
        const WALK_STATEMENTS = 2;
        const VISIT_EXPRESSIONS = 4;
        const WALK_EXPRESSIONS = 8;
        /// Descend into function expressions nested inside the walked scope
        const ENTER_CHILD_FUNCTIONS = 16;
    }
}

impl WalkMode {
    /// Visit and descend through everything, including child functions
    pub fn visit_all() -> Self {
        Self::all()
    }

    /// Visit and descend through statements only
    pub fn statements() -> Self {
        Self::VISIT_STATEMENTS | Self::WALK_STATEMENTS
    }

    /// Visit and descend through expressions only
    pub fn expressions() -> Self {
        Self::VISIT_EXPRESSIONS | Self::WALK_EXPRESSIONS | Self::WALK_STATEMENTS
    }
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub walk_mode: WalkMode,
    pub cancel: Option<CancellationToken>,
}

impl WalkOptions {
    pub fn new(walk_mode: WalkMode) -> Self {
        Self {
            walk_mode,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// Typed visitor: one handler per node family. Handlers return a
/// replacement to swap into the parent, or `None` to leave the node in
/// place. Dispatch by variant happens through the node's integer kind
/// tag, so implementations typically match on `stmt.kind()` /
/// `expr.kind()` for the variants they care about.
pub trait AstVisitor {
    fn visit_statement(&mut self, _stmt: &mut Statement) -> Option<Statement> {
        None
    }
    fn visit_expression(&mut self, _expr: &mut Expression) -> Option<Expression> {
        None
    }
}

/// Walk the children of a statement (the statement itself is not visited;
/// callers visit roots explicitly when they need to)
pub fn walk_statement(stmt: &mut Statement, visitor: &mut dyn AstVisitor, options: &WalkOptions) {
    match stmt {
        Statement::Body(s) => walk_statements(&mut s.statements, visitor, options),
        Statement::Block(s) => walk_statements(&mut s.statements, visitor, options),
        Statement::Assignment(s) => walk_expr_child(&mut s.value, visitor, options),
        Statement::Expression(s) => walk_expr_child(&mut s.expression, visitor, options),
        Statement::Comment(_)
        | Statement::ExitFor(_)
        | Statement::ExitWhile(_)
        | Statement::Goto(_)
        | Statement::Label(_)
        | Statement::End(_)
        | Statement::Stop(_)
        | Statement::Library(_)
        | Statement::Import(_)
        | Statement::Continue(_) => {}
        Statement::Function(s) => walk_function_body(&mut s.func, visitor, options),
        Statement::If(s) => {
            walk_expr_child(&mut s.condition, visitor, options);
            walk_statements(&mut s.then_branch.statements, visitor, options);
            for clause in &mut s.else_ifs {
                walk_expr_child(&mut clause.condition, visitor, options);
                walk_statements(&mut clause.block.statements, visitor, options);
            }
            if let Some(else_branch) = &mut s.else_branch {
                walk_statements(&mut else_branch.statements, visitor, options);
            }
        }
        Statement::Increment(s) => walk_expr_child(&mut s.target, visitor, options),
        Statement::Print(s) => {
            for part in &mut s.parts {
                if let PrintPart::Expression(expr) = part {
                    walk_expr_child(expr, visitor, options);
                }
            }
        }
        Statement::Return(s) => {
            if let Some(value) = &mut s.value {
                walk_expr_child(value, visitor, options);
            }
        }
        Statement::For(s) => {
            walk_expr_child(&mut s.start, visitor, options);
            walk_expr_child(&mut s.end, visitor, options);
            if let Some(step) = &mut s.step {
                walk_expr_child(step, visitor, options);
            }
            walk_statements(&mut s.body.statements, visitor, options);
        }
        Statement::ForEach(s) => {
            walk_expr_child(&mut s.target, visitor, options);
            walk_statements(&mut s.body.statements, visitor, options);
        }
        Statement::While(s) => {
            walk_expr_child(&mut s.condition, visitor, options);
            walk_statements(&mut s.body.statements, visitor, options);
        }
        Statement::DottedSet(s) => {
            walk_expr_child(&mut s.obj, visitor, options);
            walk_expr_child(&mut s.value, visitor, options);
        }
        Statement::IndexedSet(s) => {
            walk_expr_child(&mut s.obj, visitor, options);
            walk_expr_child(&mut s.index, visitor, options);
            walk_expr_child(&mut s.value, visitor, options);
        }
        Statement::Namespace(s) => walk_statements(&mut s.body, visitor, options),
        Statement::Class(s) => walk_statements(&mut s.members, visitor, options),
        Statement::ClassMethod(s) => walk_function_body(&mut s.func, visitor, options),
        Statement::ClassField(s) => {
            if let Some(value) = &mut s.initial_value {
                walk_expr_child(value, visitor, options);
            }
        }
        Statement::Throw(s) => walk_expr_child(&mut s.value, visitor, options),
        Statement::TryCatch(s) => {
            walk_statements(&mut s.try_block.statements, visitor, options);
            if let Some(catch) = &mut s.catch {
                walk_statements(&mut catch.block.statements, visitor, options);
            }
        }
        Statement::Catch(s) => walk_statements(&mut s.block.statements, visitor, options),
        Statement::Dim(s) => {
            for dim in &mut s.dimensions {
                walk_expr_child(dim, visitor, options);
            }
        }
        Statement::Annotation(s) => {
            for arg in &mut s.args {
                walk_expr_child(arg, visitor, options);
            }
        }
    }
}

/// Walk the children of an expression
pub fn walk_expression(expr: &mut Expression, visitor: &mut dyn AstVisitor, options: &WalkOptions) {
    match expr {
        Expression::Binary(e) => {
            walk_expr_child(&mut e.left, visitor, options);
            walk_expr_child(&mut e.right, visitor, options);
        }
        Expression::Call(e) => {
            walk_expr_child(&mut e.callee, visitor, options);
            for arg in &mut e.args {
                walk_expr_child(arg, visitor, options);
            }
        }
        Expression::Function(e) => {
            // nested functions are an explicit opt-in
            if options.walk_mode.contains(WalkMode::ENTER_CHILD_FUNCTIONS) {
                walk_function_body(e, visitor, options);
            }
        }
        Expression::DottedGet(e) => walk_expr_child(&mut e.obj, visitor, options),
        Expression::XmlAttributeGet(e) => walk_expr_child(&mut e.obj, visitor, options),
        Expression::IndexedGet(e) => {
            walk_expr_child(&mut e.obj, visitor, options);
            walk_expr_child(&mut e.index, visitor, options);
        }
        Expression::Grouping(e) => walk_expr_child(&mut e.inner, visitor, options),
        Expression::ArrayLiteral(e) => {
            for element in &mut e.elements {
                walk_expr_child(element, visitor, options);
            }
        }
        Expression::AALiteral(e) => {
            for member in &mut e.members {
                if let AAMember::Field { value, .. } = member {
                    walk_expr_child(value, visitor, options);
                }
            }
        }
        Expression::Unary(e) => walk_expr_child(&mut e.operand, visitor, options),
        Expression::New(e) => {
            for arg in &mut e.args {
                walk_expr_child(arg, visitor, options);
            }
        }
        Expression::Callfunc(e) => {
            walk_expr_child(&mut e.obj, visitor, options);
            for arg in &mut e.args {
                walk_expr_child(arg, visitor, options);
            }
        }
        Expression::TemplateStringQuasi(e) => {
            for part in &mut e.parts {
                walk_expr_child(part, visitor, options);
            }
        }
        Expression::TemplateString(e) => {
            for quasi in &mut e.quasis {
                for part in &mut quasi.parts {
                    walk_expr_child(part, visitor, options);
                }
            }
            for inner in &mut e.expressions {
                walk_expr_child(inner, visitor, options);
            }
        }
        Expression::TaggedTemplateString(e) => {
            for quasi in &mut e.quasis {
                for part in &mut quasi.parts {
                    walk_expr_child(part, visitor, options);
                }
            }
            for inner in &mut e.expressions {
                walk_expr_child(inner, visitor, options);
            }
        }
        Expression::Ternary(e) => {
            walk_expr_child(&mut e.condition, visitor, options);
            walk_expr_child(&mut e.consequent, visitor, options);
            walk_expr_child(&mut e.alternate, visitor, options);
        }
        Expression::FunctionParameter(e) => {
            if let Some(default_value) = &mut e.default_value {
                walk_expr_child(default_value, visitor, options);
            }
        }
        Expression::NamespacedVariableName(_)
        | Expression::Literal(_)
        | Expression::EscapedCharCodeLiteral(_)
        | Expression::Variable(_)
        | Expression::SourceLiteral(_)
        | Expression::Comment(_) => {}
    }
}

/// Parameters (default values) and body of a function payload. Called for
/// function/method statements directly; nested function expressions route
/// through [`walk_expression`] which gates on `ENTER_CHILD_FUNCTIONS`.
fn walk_function_body(
    func: &mut FunctionExpression,
    visitor: &mut dyn AstVisitor,
    options: &WalkOptions,
) {
    for parameter in &mut func.parameters {
        if let Some(default_value) = &mut parameter.default_value {
            walk_expr_child(default_value, visitor, options);
        }
    }
    walk_statements(&mut func.body.statements, visitor, options);
}

fn walk_statements(
    statements: &mut [Statement],
    visitor: &mut dyn AstVisitor,
    options: &WalkOptions,
) {
    for stmt in statements {
        walk_stmt_child(stmt, visitor, options);
    }
}

fn walk_stmt_child(child: &mut Statement, visitor: &mut dyn AstVisitor, options: &WalkOptions) {
    if options.is_cancelled() {
        return;
    }
    if options.walk_mode.contains(WalkMode::VISIT_STATEMENTS) {
        if let Some(replacement) = visitor.visit_statement(child) {
            *child = replacement;
            return;
        }
    }
    if options.walk_mode.contains(WalkMode::WALK_STATEMENTS) {
        walk_statement(child, visitor, options);
    }
}

fn walk_expr_child(child: &mut Expression, visitor: &mut dyn AstVisitor, options: &WalkOptions) {
    if options.is_cancelled() {
        return;
    }
    if options.walk_mode.contains(WalkMode::VISIT_EXPRESSIONS) {
        if let Some(replacement) = visitor.visit_expression(child) {
            *child = replacement;
            return;
        }
    }
    if options.walk_mode.contains(WalkMode::WALK_EXPRESSIONS) {
        walk_expression(child, visitor, options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Range;
    use crate::ast::statement::{AssignmentStatement, BodyStatement, ExpressionStatement};
    use crate::lexer::{Token, TokenKind};

    fn assignment(name: &str, value: Expression) -> Statement {
        Statement::Assignment(AssignmentStatement {
            name: Token::new(TokenKind::Identifier, name, Range::default()),
            operator: Token::new(TokenKind::Equal, "=", Range::default()),
            value,
            range: Range::default(),
        })
    }

    struct VariableRenamer {
        visited: usize,
    }

    impl AstVisitor for VariableRenamer {
        fn visit_expression(&mut self, expr: &mut Expression) -> Option<Expression> {
            self.visited += 1;
            if let Expression::Variable(v) = expr {
                if v.name.text.as_str() == "old" {
                    return Some(Expression::variable("new", v.range));
                }
            }
            None
        }
    }

    #[test]
    fn replacement_is_swapped_and_not_revisited() {
        let mut body = Statement::Body(BodyStatement {
            statements: vec![assignment(
                "a",
                Expression::variable("old", Range::default()),
            )],
            range: Range::default(),
        });
        let mut visitor = VariableRenamer { visited: 0 };
        let options = WalkOptions::new(WalkMode::visit_all());
        walk_statement(&mut body, &mut visitor, &options);

        // one visit: the replacement was not re-visited
        assert_eq!(visitor.visited, 1);
        let Statement::Body(body) = &body else {
            unreachable!()
        };
        let Statement::Assignment(assign) = &body.statements[0] else {
            unreachable!()
        };
        let Expression::Variable(v) = &assign.value else {
            unreachable!()
        };
        assert_eq!(v.name.text.as_str(), "new");
    }

    struct Counter {
        statements: usize,
        expressions: usize,
    }

    impl AstVisitor for Counter {
        fn visit_statement(&mut self, _stmt: &mut Statement) -> Option<Statement> {
            self.statements += 1;
            None
        }
        fn visit_expression(&mut self, _expr: &mut Expression) -> Option<Expression> {
            self.expressions += 1;
            None
        }
    }

    #[test]
    fn walk_without_visit_descends_silently() {
        let mut body = Statement::Body(BodyStatement {
            statements: vec![Statement::Expression(ExpressionStatement {
                expression: Expression::variable("x", Range::default()),
                range: Range::default(),
            })],
            range: Range::default(),
        });
        let mut visitor = Counter {
            statements: 0,
            expressions: 0,
        };
        // walk bits only: nothing is visited
        let options = WalkOptions::new(WalkMode::WALK_STATEMENTS | WalkMode::WALK_EXPRESSIONS);
        walk_statement(&mut body, &mut visitor, &options);
        assert_eq!(visitor.statements, 0);
        assert_eq!(visitor.expressions, 0);
    }

    #[test]
    fn cancellation_stops_the_walk() {
        let mut body = Statement::Body(BodyStatement {
            statements: vec![
                assignment("a", Expression::variable("x", Range::default())),
                assignment("b", Expression::variable("y", Range::default())),
            ],
            range: Range::default(),
        });
        let token = CancellationToken::new();
        token.cancel();
        let mut visitor = Counter {
            statements: 0,
            expressions: 0,
        };
        let options = WalkOptions::new(WalkMode::visit_all()).with_cancel(token);
        walk_statement(&mut body, &mut visitor, &options);
        assert_eq!(visitor.statements, 0);
        assert_eq!(visitor.expressions, 0);
    }
}
