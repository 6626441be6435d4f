//! The references index, built as a by-product of parsing.
//!
//! Scopes, the validator, and the language services read these instead of
//! re-walking the AST for common questions. Function expressions are
//! identified by the sequential id the parser assigns, which also keys
//! the local-variable lists and the parent/child function tree.

use rustc_hash::FxHashMap;

use crate::ast::AccessModifier;
use crate::base::Range;
use crate::types::TypeKind;

#[derive(Debug, Default)]
pub struct References {
    pub function_statements: Vec<FunctionDecl>,
    pub function_expressions: Vec<FunctionExprInfo>,
    pub class_statements: Vec<ClassDecl>,
    pub namespace_statements: Vec<NamespaceDecl>,
    pub import_statements: Vec<ImportDecl>,
    pub library_statements: Vec<LibraryDecl>,
    pub assignment_statements: Vec<AssignmentInfo>,
    /// lowercase property name → first observed original casing
    pub property_hints: FxHashMap<String, String>,
    /// function expression id → local variables declared in it
    pub local_vars: FxHashMap<u32, Vec<LocalVar>>,
}

impl References {
    pub fn add_property_hint(&mut self, name: &str) {
        let lower = name.to_lowercase();
        self.property_hints.entry(lower).or_insert_with(|| name.to_string());
    }

    pub fn add_local_var(&mut self, function_id: u32, var: LocalVar) {
        self.local_vars.entry(function_id).or_default().push(var);
    }

    /// Child function ids of a function expression
    pub fn child_functions(&self, parent_id: u32) -> impl Iterator<Item = &FunctionExprInfo> {
        self.function_expressions
            .iter()
            .filter(move |f| f.parent_id == Some(parent_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub type_kind: TypeKind,
    pub is_optional: bool,
    pub is_rest_argument: bool,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub name_range: Range,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeKind,
    pub is_sub: bool,
    /// Full dotted namespace name when declared inside `namespace`
    pub namespace_name: Option<String>,
    pub func_id: u32,
    pub range: Range,
    /// Scrubbed text of the comment block directly above the declaration
    pub doc: Option<String>,
}

impl FunctionDecl {
    /// Canonical rendered signature, used by hover and signature help
    pub fn signature(&self) -> String {
        let keyword = if self.is_sub { "sub" } else { "function" };
        let params = self
            .params
            .iter()
            .map(|p| {
                if p.is_optional {
                    format!("[{} as {}]", p.name, p.type_kind)
                } else {
                    format!("{} as {}", p.name, p.type_kind)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        if self.is_sub && self.return_type == TypeKind::Void {
            format!("{keyword} {}({params})", self.name)
        } else {
            format!("{keyword} {}({params}) as {}", self.name, self.return_type)
        }
    }

    /// Minimum and maximum accepted argument counts
    pub fn arg_count_range(&self) -> (usize, usize) {
        let max = self.params.len();
        let min = self
            .params
            .iter()
            .take_while(|p| !p.is_optional && !p.is_rest_argument)
            .count();
        if self.params.iter().any(|p| p.is_rest_argument) {
            (min, usize::MAX)
        } else {
            (min, max)
        }
    }
}

/// Parent/child linkage for a function expression
#[derive(Debug, Clone, Copy)]
pub struct FunctionExprInfo {
    pub id: u32,
    pub parent_id: Option<u32>,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Method => "method",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassMemberDecl {
    pub name: String,
    pub name_range: Range,
    pub kind: MemberKind,
    pub access: AccessModifier,
    pub is_override: bool,
    /// Field type, or method return type
    pub member_type: TypeKind,
    /// Method parameters (empty for fields)
    pub params: Vec<ParamInfo>,
    /// The method's function expression id (`None` for fields)
    pub func_id: Option<u32>,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub name_range: Range,
    pub parent_name: Option<String>,
    pub parent_name_range: Option<Range>,
    pub namespace_name: Option<String>,
    pub members: Vec<ClassMemberDecl>,
    pub has_constructor: bool,
    /// Whether the constructor body contains a `super(...)` call
    pub constructor_calls_super: bool,
    pub range: Range,
}

impl ClassDecl {
    /// Fully-qualified dotted name, lowercased for lookup
    pub fn qualified_lower_name(&self) -> String {
        match &self.namespace_name {
            Some(ns) => format!("{}.{}", ns, self.name).to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    /// Full dotted name, original casing
    pub name: String,
    pub name_range: Range,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Unquoted import target (`pkg:/source/util.brs`)
    pub path: String,
    /// Range of the path string token
    pub path_range: Range,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct LibraryDecl {
    pub path: String,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct AssignmentInfo {
    pub name: String,
    pub name_range: Range,
    pub inferred_type: TypeKind,
    /// Enclosing function expression id, `None` at file level
    pub function_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub name_range: Range,
    pub type_kind: TypeKind,
}
