//! Find-references: every variable expression with the requested name,
//! across every file of every scope that includes the starting file.

use tokio_util::sync::CancellationToken;

use crate::ast::{AstVisitor, Expression, WalkMode, WalkOptions, walk_statement};
use crate::base::{Position, Range};
use crate::program::Program;

use super::{Location, identifier_at, is_cancelled};

struct VariableCollector {
    lower: String,
    found: Vec<Range>,
}

impl AstVisitor for VariableCollector {
    fn visit_expression(&mut self, expr: &mut Expression) -> Option<Expression> {
        if let Expression::Variable(variable) = expr {
            if variable.name.text.to_lowercase() == self.lower {
                self.found.push(variable.name.range);
            }
        }
        None
    }
}

pub fn references(
    program: &Program,
    pkg_path: &str,
    position: Position,
    cancel: Option<&CancellationToken>,
) -> Vec<Location> {
    let Some(file) = program.source_file(pkg_path) else {
        return Vec::new();
    };
    let Some((name, _)) = identifier_at(file.source(), position) else {
        return Vec::new();
    };
    let lower = name.to_lowercase();

    let mut locations: Vec<Location> = Vec::new();
    for scope in program.scopes_containing_pkg(pkg_path) {
        if is_cancelled(cancel) {
            break;
        }
        for key in program.scope_member_keys(scope) {
            let Some(member) = program.source_file(&key) else {
                continue;
            };
            let Some(body) = member.body() else {
                continue;
            };
            // the walker mutates in place, so queries run on a copy
            let mut body = body.clone();
            let mut collector = VariableCollector {
                lower: lower.clone(),
                found: Vec::new(),
            };
            let options = WalkOptions::new(WalkMode::visit_all());
            for stmt in &mut body.statements {
                walk_statement(stmt, &mut collector, &options);
            }
            for range in collector.found {
                let location = Location {
                    pkg_path: member.pkg_path.clone(),
                    range,
                };
                if !locations.contains(&location) {
                    locations.push(location);
                }
            }
        }
    }
    locations
}
