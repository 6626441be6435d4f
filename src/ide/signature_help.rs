//! Signature help: the enclosing call's signature plus the zero-based
//! active argument, determined by comma count from the opening paren up
//! to the cursor.

use crate::base::{LineIndex, Position};
use crate::program::Program;
use crate::scope::Callable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub label: String,
    pub documentation: Option<String>,
    pub active_parameter: usize,
}

pub fn signature_help(
    program: &Program,
    pkg_path: &str,
    position: Position,
) -> Option<SignatureInfo> {
    let file = program.source_file(pkg_path)?;

    // innermost enclosing call site
    if let Some(call) = file
        .function_calls
        .iter()
        .filter(|c| c.range.contains(position))
        .max_by_key(|c| (c.range.start.line, c.range.start.column))
    {
        let callable = resolve_callable(program, pkg_path, &call.name)?;
        return Some(SignatureInfo {
            label: callable.signature(),
            documentation: callable.doc.clone(),
            active_parameter: active_parameter(file.source(), call.range.start, position),
        });
    }

    // constructor call via `new`
    if let Some(new_info) = file
        .new_expressions
        .iter()
        .filter(|n| n.range.contains(position))
        .max_by_key(|n| (n.range.start.line, n.range.start.column))
    {
        let lower = new_info.class_name.to_lowercase();
        for scope in program.scopes_containing_pkg(pkg_path) {
            let chain = std::iter::once(scope).chain(program.ancestor_chain(scope));
            for searched in chain {
                for class in searched.classes_by_lower_fq(&lower) {
                    let params = class
                        .decl
                        .members
                        .iter()
                        .find(|m| m.name.eq_ignore_ascii_case("new"))
                        .map(|ctor| {
                            ctor.params
                                .iter()
                                .map(|p| format!("{} as {}", p.name, p.type_kind))
                                .collect::<Vec<_>>()
                                .join(", ")
                        })
                        .unwrap_or_default();
                    return Some(SignatureInfo {
                        label: format!("{}({params})", class.decl.name),
                        documentation: None,
                        active_parameter: active_parameter(
                            file.source(),
                            new_info.range.start,
                            position,
                        ),
                    });
                }
            }
        }
    }
    None
}

fn resolve_callable<'p>(
    program: &'p Program,
    pkg_path: &str,
    name: &str,
) -> Option<&'p Callable> {
    let lower = name.to_lowercase();
    for scope in program.scopes_containing_pkg(pkg_path) {
        let chain = std::iter::once(scope).chain(program.ancestor_chain(scope));
        for searched in chain {
            if lower.contains('.') {
                if let Some(callable) = searched.namespaced_callable(&lower) {
                    return Some(callable);
                }
            } else if let Some(callable) = searched.own_callables(&lower).first() {
                return Some(callable);
            }
        }
    }
    None
}

/// Commas between the call's opening paren and the cursor, at paren
/// depth one
fn active_parameter(source: &str, call_start: Position, cursor: Position) -> usize {
    let index = LineIndex::new(source);
    let Some(start) = index.offset_of(call_start) else {
        return 0;
    };
    let Some(end) = index.offset_of(cursor) else {
        return 0;
    };
    let start = u32::from(start) as usize;
    let end = (u32::from(end) as usize).min(source.len());
    if start >= end {
        return 0;
    }

    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut in_string = false;
    for ch in source[start..end].chars() {
        match ch {
            '"' => in_string = !in_string,
            _ if in_string => {}
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 1 => commas += 1,
            _ => {}
        }
    }
    commas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_parameter_counts_top_level_commas() {
        let source = "doWork(1, foo(2, 3), 4)";
        // cursor right after `4`
        let cursor = Position::new(0, 22);
        assert_eq!(active_parameter(source, Position::new(0, 0), cursor), 2);
    }

    #[test]
    fn commas_inside_strings_do_not_count() {
        let source = "doWork(\"a,b\", 2)";
        let cursor = Position::new(0, 15);
        assert_eq!(active_parameter(source, Position::new(0, 0), cursor), 1);
    }
}
