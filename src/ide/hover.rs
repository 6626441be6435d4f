//! Hover information.

use crate::base::{Position, Range};
use crate::program::Program;
use crate::symbols::SymbolTable;

use super::{enclosing_function_id, identifier_at};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    /// Markdown contents; multiple scopes' answers join with `|`
    pub contents: String,
    pub range: Range,
}

pub fn hover(program: &Program, pkg_path: &str, position: Position) -> Option<Hover> {
    let file = program.source_file(pkg_path)?;
    let (name, range) = identifier_at(file.source(), position)?;
    let lower = name.to_lowercase();

    // a local variable wins over any scope callable
    if let Some(references) = file.references() {
        if let Some(function_id) = enclosing_function_id(references, position) {
            if let Some(vars) = references.local_vars.get(&function_id) {
                let matching: Vec<_> = vars
                    .iter()
                    .filter(|v| v.name.eq_ignore_ascii_case(&name))
                    .collect();
                if let Some(first) = matching.first() {
                    // several assignments collapse through the symbol
                    // table's agreement rule
                    let mut table = SymbolTable::new();
                    for var in &matching {
                        table.add_symbol(&var.name, var.name_range, var.type_kind.clone());
                    }
                    let type_kind = table
                        .get_symbol_type(&name, false, None)
                        .unwrap_or(crate::types::TypeKind::Dynamic);
                    return Some(Hover {
                        contents: format!("```brs\n{} as {type_kind}\n```", first.name),
                        range,
                    });
                }
            }
        }
    }

    // scope callables; different answers from different scopes join
    let mut rendered: Vec<String> = Vec::new();
    for scope in program.scopes_containing_pkg(pkg_path) {
        let chain = std::iter::once(scope).chain(program.ancestor_chain(scope));
        for searched in chain {
            if let Some(callable) = searched.own_callables(&lower).first() {
                let mut text = callable.signature();
                if let Some(doc) = &callable.doc {
                    text.push_str("\n\n");
                    text.push_str(doc);
                }
                if !rendered.contains(&text) {
                    rendered.push(text);
                }
                break;
            }
        }
    }
    if rendered.is_empty() {
        return None;
    }
    let joined = rendered.join(" | ");
    Some(Hover {
        contents: format!("```brs\n{joined}\n```"),
        range,
    })
}
