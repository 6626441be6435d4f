//! Typedef (`.d.bs`) generation: the declaration-only rendering of an
//! extended file's public surface.

use crate::files::SourceFile;
use crate::parser::{ClassDecl, FunctionDecl, MemberKind};
use crate::types::TypeKind;

/// Render the `.d.bs` companion for a parsed file
pub fn generate_typedef(file: &SourceFile) -> String {
    let Some(references) = file.references() else {
        return String::new();
    };
    let mut out = String::new();

    // group namespaced declarations under their namespace blocks
    let mut namespaces: Vec<&str> = references
        .namespace_statements
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    namespaces.sort_unstable();
    namespaces.dedup();

    for namespace in &namespaces {
        out.push_str(&format!("namespace {namespace}\n"));
        for function in &references.function_statements {
            if function.namespace_name.as_deref() == Some(*namespace) {
                render_function(&mut out, function, 1);
            }
        }
        for class in &references.class_statements {
            if class.namespace_name.as_deref() == Some(*namespace) {
                render_class(&mut out, class, 1);
            }
        }
        out.push_str("end namespace\n");
    }

    for function in &references.function_statements {
        if function.namespace_name.is_none() {
            render_function(&mut out, function, 0);
        }
    }
    for class in &references.class_statements {
        if class.namespace_name.is_none() {
            render_class(&mut out, class, 0);
        }
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn render_params(params: &[crate::parser::ParamInfo]) -> String {
    params
        .iter()
        .map(|p| format!("{} as {}", p.name, p.type_kind))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_function(out: &mut String, function: &FunctionDecl, depth: usize) {
    indent(out, depth);
    let params = render_params(&function.params);
    if function.is_sub && function.return_type == TypeKind::Void {
        out.push_str(&format!("sub {}({params})\n", function.name));
    } else {
        out.push_str(&format!(
            "function {}({params}) as {}\n",
            function.name, function.return_type
        ));
    }
}

fn render_class(out: &mut String, class: &ClassDecl, depth: usize) {
    indent(out, depth);
    match &class.parent_name {
        Some(parent) => out.push_str(&format!("class {} extends {parent}\n", class.name)),
        None => out.push_str(&format!("class {}\n", class.name)),
    }
    for member in &class.members {
        indent(out, depth + 1);
        match member.kind {
            MemberKind::Field => {
                out.push_str(&format!("{} as {}\n", member.name, member.member_type));
            }
            MemberKind::Method => {
                let params = render_params(&member.params);
                if member.member_type == TypeKind::Void {
                    out.push_str(&format!("sub {}({params})\n", member.name));
                } else {
                    out.push_str(&format!(
                        "function {}({params}) as {}\n",
                        member.name, member.member_type
                    ));
                }
            }
        }
    }
    indent(out, depth);
    out.push_str("end class\n");
}
