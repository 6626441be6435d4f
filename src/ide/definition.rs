//! Go-to-definition: every matching declaration across the scopes that
//! include the file.

use crate::base::Position;
use crate::program::Program;

use super::{Location, enclosing_function_id, identifier_at};

pub fn definition(program: &Program, pkg_path: &str, position: Position) -> Vec<Location> {
    let Some(file) = program.source_file(pkg_path) else {
        return Vec::new();
    };
    let Some((name, _)) = identifier_at(file.source(), position) else {
        return Vec::new();
    };
    let lower = name.to_lowercase();
    let mut locations: Vec<Location> = Vec::new();
    let mut push = |location: Location| {
        if !locations.contains(&location) {
            locations.push(location);
        }
    };

    // local assignment sites in the enclosing function
    if let Some(references) = file.references() {
        if let Some(function_id) = enclosing_function_id(references, position) {
            if let Some(vars) = references.local_vars.get(&function_id) {
                for var in vars.iter().filter(|v| v.name.eq_ignore_ascii_case(&name)) {
                    push(Location {
                        pkg_path: file.pkg_path.clone(),
                        range: var.name_range,
                    });
                }
            }
        }
    }

    for scope in program.scopes_containing_pkg(pkg_path) {
        let chain = std::iter::once(scope).chain(program.ancestor_chain(scope));
        for searched in chain {
            for callable in searched.own_callables(&lower) {
                if callable.is_builtin {
                    continue;
                }
                push(Location {
                    pkg_path: callable.file_pkg_path.clone(),
                    range: callable.name_range,
                });
            }
            for class in searched.all_classes() {
                if class.decl.name.eq_ignore_ascii_case(&name) {
                    push(Location {
                        pkg_path: class.file_pkg_path.clone(),
                        range: class.decl.name_range,
                    });
                }
            }
        }
    }
    locations
}
