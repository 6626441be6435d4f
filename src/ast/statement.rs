//! Statement variants.

use crate::base::Range;
use crate::lexer::Token;

use super::expression::{
    Expression, FunctionExpression, NamespacedVariableNameExpression, TypeExpression,
};

/// Integer tag per statement variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatementKind {
    Body = 0,
    Assignment,
    Block,
    Expression,
    Comment,
    ExitFor,
    ExitWhile,
    Function,
    If,
    Increment,
    Print,
    Goto,
    Label,
    Return,
    End,
    Stop,
    For,
    ForEach,
    While,
    DottedSet,
    IndexedSet,
    Library,
    Namespace,
    Import,
    Class,
    ClassMethod,
    ClassField,
    Throw,
    TryCatch,
    Catch,
    Dim,
    Continue,
    Annotation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Body(BodyStatement),
    Assignment(AssignmentStatement),
    Block(Block),
    Expression(ExpressionStatement),
    Comment(CommentStatement),
    ExitFor(ExitForStatement),
    ExitWhile(ExitWhileStatement),
    Function(FunctionStatement),
    If(IfStatement),
    Increment(IncrementStatement),
    Print(PrintStatement),
    Goto(GotoStatement),
    Label(LabelStatement),
    Return(ReturnStatement),
    End(EndStatement),
    Stop(StopStatement),
    For(ForStatement),
    ForEach(ForEachStatement),
    While(WhileStatement),
    DottedSet(DottedSetStatement),
    IndexedSet(IndexedSetStatement),
    Library(LibraryStatement),
    Namespace(NamespaceStatement),
    Import(ImportStatement),
    Class(ClassStatement),
    ClassMethod(ClassMethodStatement),
    ClassField(ClassFieldStatement),
    Throw(ThrowStatement),
    TryCatch(TryCatchStatement),
    Catch(CatchStatement),
    Dim(DimStatement),
    Continue(ContinueStatement),
    Annotation(AnnotationStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Body(_) => StatementKind::Body,
            Statement::Assignment(_) => StatementKind::Assignment,
            Statement::Block(_) => StatementKind::Block,
            Statement::Expression(_) => StatementKind::Expression,
            Statement::Comment(_) => StatementKind::Comment,
            Statement::ExitFor(_) => StatementKind::ExitFor,
            Statement::ExitWhile(_) => StatementKind::ExitWhile,
            Statement::Function(_) => StatementKind::Function,
            Statement::If(_) => StatementKind::If,
            Statement::Increment(_) => StatementKind::Increment,
            Statement::Print(_) => StatementKind::Print,
            Statement::Goto(_) => StatementKind::Goto,
            Statement::Label(_) => StatementKind::Label,
            Statement::Return(_) => StatementKind::Return,
            Statement::End(_) => StatementKind::End,
            Statement::Stop(_) => StatementKind::Stop,
            Statement::For(_) => StatementKind::For,
            Statement::ForEach(_) => StatementKind::ForEach,
            Statement::While(_) => StatementKind::While,
            Statement::DottedSet(_) => StatementKind::DottedSet,
            Statement::IndexedSet(_) => StatementKind::IndexedSet,
            Statement::Library(_) => StatementKind::Library,
            Statement::Namespace(_) => StatementKind::Namespace,
            Statement::Import(_) => StatementKind::Import,
            Statement::Class(_) => StatementKind::Class,
            Statement::ClassMethod(_) => StatementKind::ClassMethod,
            Statement::ClassField(_) => StatementKind::ClassField,
            Statement::Throw(_) => StatementKind::Throw,
            Statement::TryCatch(_) => StatementKind::TryCatch,
            Statement::Catch(_) => StatementKind::Catch,
            Statement::Dim(_) => StatementKind::Dim,
            Statement::Continue(_) => StatementKind::Continue,
            Statement::Annotation(_) => StatementKind::Annotation,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Statement::Body(s) => s.range,
            Statement::Assignment(s) => s.range,
            Statement::Block(s) => s.range,
            Statement::Expression(s) => s.range,
            Statement::Comment(s) => s.range,
            Statement::ExitFor(s) => s.range,
            Statement::ExitWhile(s) => s.range,
            Statement::Function(s) => s.range,
            Statement::If(s) => s.range,
            Statement::Increment(s) => s.range,
            Statement::Print(s) => s.range,
            Statement::Goto(s) => s.range,
            Statement::Label(s) => s.range,
            Statement::Return(s) => s.range,
            Statement::End(s) => s.range,
            Statement::Stop(s) => s.range,
            Statement::For(s) => s.range,
            Statement::ForEach(s) => s.range,
            Statement::While(s) => s.range,
            Statement::DottedSet(s) => s.range,
            Statement::IndexedSet(s) => s.range,
            Statement::Library(s) => s.range,
            Statement::Namespace(s) => s.range,
            Statement::Import(s) => s.range,
            Statement::Class(s) => s.range,
            Statement::ClassMethod(s) => s.range,
            Statement::ClassField(s) => s.range,
            Statement::Throw(s) => s.range,
            Statement::TryCatch(s) => s.range,
            Statement::Catch(s) => s.range,
            Statement::Dim(s) => s.range,
            Statement::Continue(s) => s.range,
            Statement::Annotation(s) => s.range,
        }
    }
}

/// The root of a file: top-level statements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyStatement {
    pub statements: Vec<Statement>,
    pub range: Range,
}

/// `name = value` and the compound forms (`+=`, `<<=`, …) targeting a
/// bare variable
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStatement {
    pub name: Token,
    pub operator: Token,
    pub value: Expression,
    pub range: Range,
}

/// A statement list with its own lexical extent: function bodies, loop
/// bodies, branch arms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub range: Range,
}

/// One or more consecutive comment lines
#[derive(Debug, Clone, PartialEq)]
pub struct CommentStatement {
    pub comments: Vec<Token>,
    pub range: Range,
}

impl CommentStatement {
    /// The comment text without leading markers, joined by newlines
    pub fn text(&self) -> String {
        self.comments
            .iter()
            .map(|t| {
                let text = t.text.as_str();
                let stripped = text
                    .strip_prefix('\'')
                    .unwrap_or_else(|| match text.get(..3) {
                        Some(prefix) if prefix.eq_ignore_ascii_case("rem") => &text[3..],
                        _ => text,
                    });
                stripped.trim()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitForStatement {
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitWhileStatement {
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionStatement {
    pub name: Token,
    pub func: FunctionExpression,
    pub annotations: Vec<AnnotationStatement>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    /// Whether `then` was written in the source
    pub has_then_token: bool,
    pub then_branch: Block,
    pub else_ifs: Vec<ElseIfClause>,
    pub else_branch: Option<Block>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIfClause {
    pub condition: Expression,
    pub block: Block,
    pub range: Range,
}

/// `i++` / `i--`
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementStatement {
    pub target: Expression,
    pub operator: Token,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrintPart {
    Expression(Expression),
    /// `;` suppresses the separator space
    Semicolon(Range),
    /// `,` advances to the next print zone
    Comma(Range),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStatement {
    pub parts: Vec<PrintPart>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GotoStatement {
    pub label: Token,
    pub range: Range,
}

/// `name:` at the start of a line
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStatement {
    pub name: Token,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub range: Range,
}

/// The `end` statement terminates the program
#[derive(Debug, Clone, PartialEq)]
pub struct EndStatement {
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopStatement {
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub counter: Token,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
    pub body: Block,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStatement {
    pub item: Token,
    pub target: Expression,
    pub body: Block,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
    pub range: Range,
}

/// `obj.name = value` (and compound operators)
#[derive(Debug, Clone, PartialEq)]
pub struct DottedSetStatement {
    pub obj: Expression,
    pub name: Token,
    pub operator: Token,
    pub value: Expression,
    pub range: Range,
}

/// `obj[index] = value` (and compound operators)
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSetStatement {
    pub obj: Expression,
    pub index: Expression,
    pub operator: Token,
    pub value: Expression,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStatement {
    pub path: Token,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceStatement {
    pub name: NamespacedVariableNameExpression,
    pub body: Vec<Statement>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    pub path: Token,
    pub range: Range,
}

impl ImportStatement {
    /// The imported pkg-path without quotes and scheme prefix intact
    pub fn path_text(&self) -> &str {
        self.path.text.trim_matches('"')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessModifier {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatement {
    pub name: Token,
    pub parent_class: Option<NamespacedVariableNameExpression>,
    /// ClassMethod, ClassField, and Comment statements
    pub members: Vec<Statement>,
    pub annotations: Vec<AnnotationStatement>,
    pub range: Range,
}

impl ClassStatement {
    /// The constructor, when declared
    pub fn constructor(&self) -> Option<&ClassMethodStatement> {
        self.members.iter().find_map(|m| match m {
            Statement::ClassMethod(method) if method.name.text.eq_ignore_ascii_case("new") => {
                Some(method)
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethodStatement {
    pub access: AccessModifier,
    pub is_override: bool,
    pub name: Token,
    pub func: FunctionExpression,
    pub annotations: Vec<AnnotationStatement>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFieldStatement {
    pub access: AccessModifier,
    pub name: Token,
    pub type_expression: Option<TypeExpression>,
    pub initial_value: Option<Expression>,
    pub annotations: Vec<AnnotationStatement>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    pub value: Expression,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchStatement {
    pub try_block: Block,
    pub catch: Option<Box<CatchStatement>>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchStatement {
    pub exception_var: Token,
    pub block: Block,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimStatement {
    pub name: Token,
    pub dimensions: Vec<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueLoopKind {
    For,
    While,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStatement {
    pub loop_kind: ContinueLoopKind,
    pub range: Range,
}

/// `@name(args)` decorating the following declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationStatement {
    pub name: Token,
    pub args: Vec<Expression>,
    pub range: Range,
}
