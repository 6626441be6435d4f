//! The lightweight type model.
//!
//! Types exist to power hover, completion, and argument-count checking —
//! not a sound type system. Anything uncertain collapses to
//! [`TypeKind::Dynamic`].

use std::fmt;

use smol_str::SmolStr;

use crate::ast::Expression;
use crate::lexer::TokenKind;

/// The inferred or declared type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Dynamic,
    Void,
    Boolean,
    Integer,
    LongInteger,
    Float,
    Double,
    String,
    Object,
    Function,
    Invalid,
    /// A class or interface name, possibly namespace-qualified
    Custom(SmolStr),
    /// Resolved on demand through a lazy context (forward references)
    Lazy(u32),
}

impl TypeKind {
    /// Parse a declared type name (after `as`), case-insensitively
    pub fn from_type_name(name: &str) -> TypeKind {
        match name.to_ascii_lowercase().as_str() {
            "dynamic" => TypeKind::Dynamic,
            "void" => TypeKind::Void,
            "boolean" => TypeKind::Boolean,
            "integer" => TypeKind::Integer,
            "longinteger" => TypeKind::LongInteger,
            "float" => TypeKind::Float,
            "double" => TypeKind::Double,
            "string" => TypeKind::String,
            "object" => TypeKind::Object,
            "function" => TypeKind::Function,
            _ => TypeKind::Custom(SmolStr::new(name)),
        }
    }

    /// Whether two values of this type concatenate/compare without a
    /// runtime to-string step (used by template-string lowering)
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Boolean
                | TypeKind::Integer
                | TypeKind::LongInteger
                | TypeKind::Float
                | TypeKind::Double
                | TypeKind::String
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeKind::Integer | TypeKind::LongInteger | TypeKind::Float | TypeKind::Double
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Dynamic => write!(f, "dynamic"),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Boolean => write!(f, "boolean"),
            TypeKind::Integer => write!(f, "integer"),
            TypeKind::LongInteger => write!(f, "longinteger"),
            TypeKind::Float => write!(f, "float"),
            TypeKind::Double => write!(f, "double"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Object => write!(f, "object"),
            TypeKind::Function => write!(f, "function"),
            TypeKind::Invalid => write!(f, "invalid"),
            TypeKind::Custom(name) => write!(f, "{name}"),
            TypeKind::Lazy(_) => write!(f, "dynamic"),
        }
    }
}

/// Shallow inference over an expression, sufficient for hover and the
/// symbol table. No symbol resolution happens here.
pub fn infer_expression_type(expr: &Expression) -> TypeKind {
    match expr {
        Expression::Literal(literal) => match literal.token.kind {
            TokenKind::StringLiteral => TypeKind::String,
            TokenKind::IntegerLiteral => TypeKind::Integer,
            TokenKind::LongIntegerLiteral => TypeKind::LongInteger,
            TokenKind::FloatLiteral => TypeKind::Float,
            TokenKind::DoubleLiteral => TypeKind::Double,
            TokenKind::True | TokenKind::False => TypeKind::Boolean,
            TokenKind::Invalid => TypeKind::Invalid,
            _ => TypeKind::Dynamic,
        },
        Expression::TemplateString(_) | Expression::TaggedTemplateString(_) => TypeKind::String,
        Expression::Function(_) => TypeKind::Function,
        Expression::New(new_expr) => TypeKind::Custom(SmolStr::new(new_expr.class_name.text())),
        Expression::ArrayLiteral(_) | Expression::AALiteral(_) => TypeKind::Object,
        Expression::Grouping(grouping) => infer_expression_type(&grouping.inner),
        Expression::Unary(unary) => {
            if unary.operator.kind == TokenKind::Not {
                TypeKind::Boolean
            } else {
                infer_expression_type(&unary.operand)
            }
        }
        Expression::Binary(binary) => {
            let left = infer_expression_type(&binary.left);
            let right = infer_expression_type(&binary.right);
            match binary.operator.kind {
                TokenKind::Equal
                | TokenKind::LessGreater
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::And
                | TokenKind::Or => TypeKind::Boolean,
                TokenKind::Plus if left == TypeKind::String && right == TypeKind::String => {
                    TypeKind::String
                }
                _ if left.is_numeric() && right.is_numeric() => {
                    // widen to the larger of the two numeric types
                    if left == TypeKind::Double || right == TypeKind::Double {
                        TypeKind::Double
                    } else if left == TypeKind::Float || right == TypeKind::Float {
                        TypeKind::Float
                    } else if left == TypeKind::LongInteger || right == TypeKind::LongInteger {
                        TypeKind::LongInteger
                    } else {
                        TypeKind::Integer
                    }
                }
                _ => TypeKind::Dynamic,
            }
        }
        Expression::Ternary(ternary) => {
            let consequent = infer_expression_type(&ternary.consequent);
            let alternate = infer_expression_type(&ternary.alternate);
            if consequent == alternate {
                consequent
            } else {
                TypeKind::Dynamic
            }
        }
        _ => TypeKind::Dynamic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Range;

    #[test]
    fn literal_inference() {
        let expr = Expression::string_literal("\"hi\"", Range::default());
        assert_eq!(infer_expression_type(&expr), TypeKind::String);
        let expr = Expression::integer_literal(3, Range::default());
        assert_eq!(infer_expression_type(&expr), TypeKind::Integer);
    }

    #[test]
    fn declared_type_names_are_case_insensitive() {
        assert_eq!(TypeKind::from_type_name("STRING"), TypeKind::String);
        assert_eq!(TypeKind::from_type_name("LongInteger"), TypeKind::LongInteger);
        assert_eq!(
            TypeKind::from_type_name("Thing"),
            TypeKind::Custom(SmolStr::new("Thing"))
        );
    }

    #[test]
    fn display_uses_canonical_names() {
        assert_eq!(TypeKind::Integer.to_string(), "integer");
        assert_eq!(TypeKind::Custom(SmolStr::new("Duck")).to_string(), "Duck");
    }
}
