//! The typed AST: two disjoint sums, [`Statement`] and [`Expression`],
//! each variant carrying a `range`, plus the bitmask-driven walker.
//!
//! AST nodes are owned by their file and never reference scopes; scopes
//! reference files by pkg-path, which keeps the two object graphs
//! acyclic.

mod expression;
mod statement;
mod walker;

pub use expression::{
    AALiteralExpression, AAMember, ArrayLiteralExpression, BinaryExpression, CallExpression,
    CallfuncExpression, CommentExpression, DottedGetExpression, EscapedCharCodeLiteralExpression,
    Expression, ExpressionKind, FunctionExpression, FunctionParameter, GroupingExpression,
    IndexedGetExpression, LiteralExpression, NamespacedVariableNameExpression, NewExpression,
    SourceLiteralExpression, SourceLiteralKind, TaggedTemplateStringExpression,
    TemplateStringExpression, TemplateStringQuasiExpression, TernaryExpression, TypeExpression,
    UnaryExpression, VariableExpression, XmlAttributeGetExpression,
};
pub use statement::{
    AccessModifier, AnnotationStatement, AssignmentStatement, Block, BodyStatement,
    CatchStatement, ClassFieldStatement, ClassMethodStatement, ClassStatement, CommentStatement,
    ContinueLoopKind, ContinueStatement, DimStatement, DottedSetStatement, ElseIfClause,
    EndStatement, ExitForStatement, ExitWhileStatement, ExpressionStatement, ForEachStatement,
    ForStatement, FunctionStatement, GotoStatement, IfStatement, ImportStatement,
    IncrementStatement, IndexedSetStatement, LabelStatement, LibraryStatement,
    NamespaceStatement, PrintPart, PrintStatement, ReturnStatement, Statement, StatementKind,
    StopStatement, ThrowStatement, TryCatchStatement, WhileStatement,
};
pub use walker::{AstVisitor, WalkMode, WalkOptions, walk_expression, walk_statement};
