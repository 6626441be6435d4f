//! Scope aggregation, invalidation, and cross-file resolution.

mod helpers;

use helpers::{add_file, codes, program};
use luster::diagnostics::messages;

// =============================================================================
// DUPLICATE CALLABLES
// =============================================================================

#[test]
fn duplicate_top_level_functions_flag_both_declarations() {
    let mut program = program();
    add_file(&mut program, "source/a.brs", "sub DoA()\nend sub");
    add_file(&mut program, "source/b.brs", "sub DoA()\nend sub");
    program.validate();
    let duplicates: Vec<_> = program
        .get_diagnostics()
        .into_iter()
        .filter(|d| d.code == messages::DUPLICATE_FUNCTION_IMPLEMENTATION)
        .collect();
    assert_eq!(duplicates.len(), 2);
    assert!(duplicates.iter().all(|d| d.message.contains("DoA")));
    assert!(duplicates.iter().all(|d| d.message.contains("source")));
}

#[test]
fn same_name_in_different_namespaces_is_fine() {
    let mut program = program();
    add_file(
        &mut program,
        "source/a.bs",
        "namespace Alpha\nsub alert()\nend sub\nend namespace\nnamespace Beta\nsub alert()\nend sub\nend namespace",
    );
    program.validate();
    assert_eq!(codes(&program), Vec::<u32>::new());
}

// =============================================================================
// NAMESPACES
// =============================================================================

#[test]
fn namespaces_merge_across_files_in_one_scope() {
    let mut program = program();
    add_file(
        &mut program,
        "source/a.bs",
        "namespace Shared\nsub one()\nend sub\nend namespace",
    );
    add_file(
        &mut program,
        "source/b.bs",
        "namespace shared\nsub two()\nend sub\nend namespace",
    );
    program.validate();
    let scope = program.get_scope_by_name("source").expect("source scope");
    let node = scope
        .namespace_root()
        .find_path(&["shared"])
        .expect("merged namespace");
    assert_eq!(node.functions_by_lower_name.len(), 2);
    assert!(scope.namespaced_callable("shared.one").is_some());
    assert!(scope.namespaced_callable("shared.two").is_some());
}

#[test]
fn namespace_relative_calls_resolve() {
    let mut program = program();
    add_file(
        &mut program,
        "source/a.bs",
        "namespace App.Util\nsub helper()\nend sub\nsub caller()\n    helper()\n    App.Util.helper()\nend sub\nend namespace",
    );
    program.validate();
    assert_eq!(codes(&program), Vec::<u32>::new());
}

// =============================================================================
// COMPONENT SCOPES
// =============================================================================

fn widget_xml(extends: Option<&str>, scripts: &[&str]) -> String {
    let extends = extends
        .map(|e| format!(" extends=\"{e}\""))
        .unwrap_or_default();
    let scripts: String = scripts
        .iter()
        .map(|s| format!("    <script type=\"text/brightscript\" uri=\"{s}\" />\n"))
        .collect();
    format!("<component name=\"Widget\"{extends}>\n{scripts}</component>")
}

#[test]
fn component_scope_sees_its_imported_scripts() {
    let mut program = program();
    add_file(&mut program, "components/widget.brs", "sub init()\nend sub");
    add_file(
        &mut program,
        "components/widget.xml",
        &widget_xml(None, &["pkg:/components/widget.brs"]),
    );
    program.validate();
    let scope = program.get_component_scope("Widget").expect("widget scope");
    assert_eq!(scope.own_callables("init").len(), 1);
}

#[test]
fn file_change_invalidates_dependent_scopes() {
    let mut program = program();
    add_file(&mut program, "components/widget.brs", "sub init()\nend sub");
    add_file(
        &mut program,
        "components/widget.xml",
        &widget_xml(None, &["pkg:/components/widget.brs"]),
    );
    program.validate();
    assert!(
        program
            .get_component_scope("Widget")
            .expect("scope")
            .is_validated()
    );

    // replacing the script invalidates the component scope through the
    // dependency graph
    add_file(
        &mut program,
        "components/widget.brs",
        "sub init()\nend sub\nsub extra()\nend sub",
    );
    assert!(
        !program
            .get_component_scope("Widget")
            .expect("scope")
            .is_validated()
    );
}

#[test]
fn source_scope_invalidates_on_source_file_change() {
    let mut program = program();
    add_file(&mut program, "source/main.brs", "sub main()\nend sub");
    program.validate();
    assert!(program.get_scope_by_name("source").expect("scope").is_validated());

    add_file(&mut program, "source/other.brs", "sub other()\nend sub");
    assert!(!program.get_scope_by_name("source").expect("scope").is_validated());
}

#[test]
fn child_component_callable_shadowing_parent_is_informational() {
    let mut program = program();
    add_file(&mut program, "components/base.brs", "sub helper()\nend sub");
    add_file(
        &mut program,
        "components/base.xml",
        "<component name=\"Base\">\n    <script uri=\"pkg:/components/base.brs\" />\n</component>",
    );
    add_file(&mut program, "components/child.brs", "sub helper()\nend sub\nsub init()\nend sub");
    add_file(
        &mut program,
        "components/child.xml",
        "<component name=\"Child\" extends=\"Base\">\n    <script uri=\"pkg:/components/child.brs\" />\n</component>",
    );
    program.validate();
    let overrides: Vec<_> = program
        .get_diagnostics()
        .into_iter()
        .filter(|d| d.code == messages::OVERRIDES_ANCESTOR_FUNCTION)
        .collect();
    assert_eq!(overrides.len(), 1);
    // init is a lifecycle method and exempt
    assert!(overrides[0].message.contains("helper"));
}

// =============================================================================
// TYPEDEFS
// =============================================================================

#[test]
fn typedef_controls_the_visible_surface() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub implOnly()\nend sub\nsub shared()\nend sub",
    );
    add_file(&mut program, "source/main.d.bs", "sub shared()");
    program.validate();

    let scope = program.get_scope_by_name("source").expect("source scope");
    // exactly the typedef's callables, nothing more
    assert!(scope.own_callables("implonly").is_empty());
    let shared = scope.own_callables("shared");
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].file_pkg_path, "source/main.d.bs");
}

#[test]
fn removing_the_typedef_reexposes_the_implementation() {
    let mut program = program();
    add_file(&mut program, "source/main.brs", "sub implOnly()\nend sub");
    add_file(&mut program, "source/main.d.bs", "sub shared()");
    program.validate();
    let scope = program.get_scope_by_name("source").expect("scope");
    assert!(scope.own_callables("implonly").is_empty());

    program.remove_file("source/main.d.bs");
    program.validate();
    let scope = program.get_scope_by_name("source").expect("scope");
    assert_eq!(scope.own_callables("implonly").len(), 1);
}

// =============================================================================
// FILE REMOVAL
// =============================================================================

#[test]
fn removing_a_file_removes_its_diagnostics() {
    let mut program = program();
    add_file(&mut program, "source/a.brs", "sub DoA()\nend sub");
    add_file(&mut program, "source/b.brs", "sub DoA()\nend sub");
    program.validate();
    assert!(!program.get_diagnostics().is_empty());

    program.remove_file("source/b.brs");
    let remaining = program.get_diagnostics();
    assert!(
        remaining
            .iter()
            .all(|d| d.file_pkg_path.as_deref() != Some("source/b.brs")),
        "stale diagnostics: {remaining:?}"
    );
}

#[test]
fn validation_is_idempotent() {
    let mut program = program();
    add_file(&mut program, "source/a.brs", "sub DoA()\nend sub");
    add_file(&mut program, "source/b.brs", "sub DoA()\nend sub");
    program.validate();
    let first = program.get_diagnostics();
    program.validate();
    let second = program.get_diagnostics();
    assert_eq!(first, second);
}
