//! Expression variants.
//!
//! A tagged sum with an integer discriminant per variant
//! ([`ExpressionKind`]) so visitor dispatch is a table lookup. Shared
//! fields like `range` live on each variant struct; there is no
//! inheritance hierarchy.

use smol_str::SmolStr;

use crate::base::Range;
use crate::lexer::{Token, TokenKind};

use super::statement::Block;

/// Integer tag per expression variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExpressionKind {
    Binary = 0,
    Call,
    Function,
    NamespacedVariableName,
    DottedGet,
    XmlAttributeGet,
    IndexedGet,
    Grouping,
    Literal,
    EscapedCharCodeLiteral,
    ArrayLiteral,
    AALiteral,
    Unary,
    Variable,
    SourceLiteral,
    New,
    Callfunc,
    TemplateStringQuasi,
    TemplateString,
    TaggedTemplateString,
    Ternary,
    FunctionParameter,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Binary(BinaryExpression),
    Call(CallExpression),
    Function(FunctionExpression),
    NamespacedVariableName(NamespacedVariableNameExpression),
    DottedGet(DottedGetExpression),
    XmlAttributeGet(XmlAttributeGetExpression),
    IndexedGet(IndexedGetExpression),
    Grouping(GroupingExpression),
    Literal(LiteralExpression),
    EscapedCharCodeLiteral(EscapedCharCodeLiteralExpression),
    ArrayLiteral(ArrayLiteralExpression),
    AALiteral(AALiteralExpression),
    Unary(UnaryExpression),
    Variable(VariableExpression),
    SourceLiteral(SourceLiteralExpression),
    New(NewExpression),
    Callfunc(CallfuncExpression),
    TemplateStringQuasi(TemplateStringQuasiExpression),
    TemplateString(TemplateStringExpression),
    TaggedTemplateString(TaggedTemplateStringExpression),
    Ternary(TernaryExpression),
    FunctionParameter(FunctionParameter),
    Comment(CommentExpression),
}

impl Expression {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Binary(_) => ExpressionKind::Binary,
            Expression::Call(_) => ExpressionKind::Call,
            Expression::Function(_) => ExpressionKind::Function,
            Expression::NamespacedVariableName(_) => ExpressionKind::NamespacedVariableName,
            Expression::DottedGet(_) => ExpressionKind::DottedGet,
            Expression::XmlAttributeGet(_) => ExpressionKind::XmlAttributeGet,
            Expression::IndexedGet(_) => ExpressionKind::IndexedGet,
            Expression::Grouping(_) => ExpressionKind::Grouping,
            Expression::Literal(_) => ExpressionKind::Literal,
            Expression::EscapedCharCodeLiteral(_) => ExpressionKind::EscapedCharCodeLiteral,
            Expression::ArrayLiteral(_) => ExpressionKind::ArrayLiteral,
            Expression::AALiteral(_) => ExpressionKind::AALiteral,
            Expression::Unary(_) => ExpressionKind::Unary,
            Expression::Variable(_) => ExpressionKind::Variable,
            Expression::SourceLiteral(_) => ExpressionKind::SourceLiteral,
            Expression::New(_) => ExpressionKind::New,
            Expression::Callfunc(_) => ExpressionKind::Callfunc,
            Expression::TemplateStringQuasi(_) => ExpressionKind::TemplateStringQuasi,
            Expression::TemplateString(_) => ExpressionKind::TemplateString,
            Expression::TaggedTemplateString(_) => ExpressionKind::TaggedTemplateString,
            Expression::Ternary(_) => ExpressionKind::Ternary,
            Expression::FunctionParameter(_) => ExpressionKind::FunctionParameter,
            Expression::Comment(_) => ExpressionKind::Comment,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Expression::Binary(e) => e.range,
            Expression::Call(e) => e.range,
            Expression::Function(e) => e.range,
            Expression::NamespacedVariableName(e) => e.range,
            Expression::DottedGet(e) => e.range,
            Expression::XmlAttributeGet(e) => e.range,
            Expression::IndexedGet(e) => e.range,
            Expression::Grouping(e) => e.range,
            Expression::Literal(e) => e.range,
            Expression::EscapedCharCodeLiteral(e) => e.range,
            Expression::ArrayLiteral(e) => e.range,
            Expression::AALiteral(e) => e.range,
            Expression::Unary(e) => e.range,
            Expression::Variable(e) => e.range,
            Expression::SourceLiteral(e) => e.range,
            Expression::New(e) => e.range,
            Expression::Callfunc(e) => e.range,
            Expression::TemplateStringQuasi(e) => e.range,
            Expression::TemplateString(e) => e.range,
            Expression::TaggedTemplateString(e) => e.range,
            Expression::Ternary(e) => e.range,
            Expression::FunctionParameter(e) => e.range,
            Expression::Comment(e) => e.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub left: Box<Expression>,
    pub operator: Token,
    pub right: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    /// Range of the opening paren, used by signature help
    pub open_paren_range: Range,
    pub range: Range,
}

/// A function or sub literal. Also the payload of
/// [`FunctionStatement`](super::statement::FunctionStatement) and class
/// methods.
///
/// `id` is assigned sequentially by the parser; the references index keys
/// local-variable lists and the parent/child function tree by it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub id: u32,
    pub is_sub: bool,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Option<TypeExpression>,
    pub body: Block,
    pub range: Range,
}

/// A dotted name such as `A.B.C`, used by `namespace`, `new`, and
/// `extends` positions
#[derive(Debug, Clone, PartialEq)]
pub struct NamespacedVariableNameExpression {
    pub parts: Vec<Token>,
    pub range: Range,
}

impl NamespacedVariableNameExpression {
    /// The dotted text as written
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn lower_text(&self) -> String {
        self.text().to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DottedGetExpression {
    pub obj: Box<Expression>,
    pub name: Token,
    pub range: Range,
}

/// `node@attr` on XML-backed objects
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttributeGetExpression {
    pub obj: Box<Expression>,
    pub name: Token,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedGetExpression {
    pub obj: Box<Expression>,
    pub index: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupingExpression {
    pub inner: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpression {
    pub token: Token,
    pub range: Range,
}

impl LiteralExpression {
    pub fn is_string(&self) -> bool {
        self.token.kind == TokenKind::StringLiteral
    }
}

/// A single character emitted as its char code during lowering (quote
/// marks and newlines inside template strings)
#[derive(Debug, Clone, PartialEq)]
pub struct EscapedCharCodeLiteralExpression {
    pub char_code: u32,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteralExpression {
    pub elements: Vec<Expression>,
    pub range: Range,
}

/// One `key: value` member of an associative-array literal
#[derive(Debug, Clone, PartialEq)]
pub enum AAMember {
    Field {
        key: Token,
        value: Expression,
        range: Range,
    },
    Comment(Token),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AALiteralExpression {
    pub members: Vec<AAMember>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: Token,
    pub operand: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpression {
    pub name: Token,
    pub range: Range,
}

impl VariableExpression {
    pub fn lower_name(&self) -> String {
        self.name.text.to_lowercase()
    }
}

/// Compile-time source literals substituted during lowering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLiteralKind {
    LineNum,
    SourceLineNum,
    FunctionName,
    SourceFunctionName,
    SourceFilePath,
    SourceLocation,
    PkgPath,
    PkgLocation,
}

impl SourceLiteralKind {
    /// Recognise a source-literal identifier (exact uppercase spelling)
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "LINE_NUM" => SourceLiteralKind::LineNum,
            "SOURCE_LINE_NUM" => SourceLiteralKind::SourceLineNum,
            "FUNCTION_NAME" => SourceLiteralKind::FunctionName,
            "SOURCE_FUNCTION_NAME" => SourceLiteralKind::SourceFunctionName,
            "SOURCE_FILE_PATH" => SourceLiteralKind::SourceFilePath,
            "SOURCE_LOCATION" => SourceLiteralKind::SourceLocation,
            "PKG_PATH" => SourceLiteralKind::PkgPath,
            "PKG_LOCATION" => SourceLiteralKind::PkgLocation,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLiteralExpression {
    pub literal_kind: SourceLiteralKind,
    pub token: Token,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub class_name: NamespacedVariableNameExpression,
    pub args: Vec<Expression>,
    pub range: Range,
}

/// `obj@.method(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallfuncExpression {
    pub obj: Box<Expression>,
    pub method: Token,
    pub args: Vec<Expression>,
    pub range: Range,
}

/// One literal run of a template string: string pieces interleaved with
/// escaped char codes for quotes and newlines
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateStringQuasiExpression {
    pub parts: Vec<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateStringExpression {
    /// Always `expressions.len() + 1` entries
    pub quasis: Vec<TemplateStringQuasiExpression>,
    pub expressions: Vec<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTemplateStringExpression {
    pub tag: Token,
    pub quasis: Vec<TemplateStringQuasiExpression>,
    pub expressions: Vec<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpression {
    pub condition: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub range: Range,
}

/// A declared parameter, including its optional default and type
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub name: Token,
    pub type_expression: Option<TypeExpression>,
    pub default_value: Option<Box<Expression>>,
    pub range: Range,
}

impl FunctionParameter {
    pub fn is_optional(&self) -> bool {
        self.default_value.is_some()
    }
}

/// A comment captured in expression position (inside collection literals)
#[derive(Debug, Clone, PartialEq)]
pub struct CommentExpression {
    pub token: Token,
    pub range: Range,
}

/// A type annotation: a possibly-dotted name after `as`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpression {
    pub parts: Vec<Token>,
    pub range: Range,
}

impl TypeExpression {
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Convenience constructors used by the parser and the transpiler's
/// synthesized nodes
impl Expression {
    pub fn variable(name: impl Into<SmolStr>, range: Range) -> Expression {
        Expression::Variable(VariableExpression {
            name: Token::new(TokenKind::Identifier, name, range),
            range,
        })
    }

    pub fn string_literal(text: impl Into<SmolStr>, range: Range) -> Expression {
        Expression::Literal(LiteralExpression {
            token: Token::new(TokenKind::StringLiteral, text, range),
            range,
        })
    }

    pub fn integer_literal(value: i64, range: Range) -> Expression {
        Expression::Literal(LiteralExpression {
            token: Token::new(TokenKind::IntegerLiteral, value.to_string(), range),
            range,
        })
    }
}
