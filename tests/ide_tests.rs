//! Language-service queries over a validated program.

mod helpers;

use helpers::{add_file, program};
use luster::base::Position;
use luster::ide::CompletionKind;

// =============================================================================
// COMPLETION
// =============================================================================

#[test]
fn completions_include_every_local_variable_in_the_enclosing_function() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main(input)\n    total = 0\n    label$ = \"x\"\n    \nend sub",
    );
    program.validate();
    let items = program.get_completions("source/main.brs", Position::new(3, 4));
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    for expected in ["input", "total", "label$"] {
        assert!(labels.contains(&expected), "missing {expected}: {labels:?}");
    }
    // plus scope callables, m, and keywords
    assert!(labels.contains(&"main"));
    assert!(labels.contains(&"m"));
    assert!(labels.contains(&"for each"));
}

#[test]
fn completions_inside_comments_are_empty() {
    let mut program = program();
    add_file(&mut program, "source/main.brs", "sub main()\n    ' nothing here\nend sub");
    program.validate();
    let items = program.get_completions("source/main.brs", Position::new(1, 18));
    assert!(items.is_empty());
}

#[test]
fn pkg_strings_complete_file_paths() {
    let mut program = program();
    add_file(&mut program, "source/util.bs", "sub util()\nend sub");
    add_file(
        &mut program,
        "source/main.bs",
        "import \"pkg:/\nsub main()\nend sub",
    );
    program.validate();
    let items = program.get_completions("source/main.bs", Position::new(0, 13));
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"pkg:/source/util.bs"), "{labels:?}");
    assert!(items.iter().all(|i| i.kind == CompletionKind::File));
}

#[test]
fn plain_strings_complete_nothing() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    s = \"hello \nend sub",
    );
    program.validate();
    let items = program.get_completions("source/main.brs", Position::new(1, 15));
    assert!(items.is_empty());
}

#[test]
fn namespace_dot_merges_contributions_from_all_files_once() {
    let mut program = program();
    add_file(
        &mut program,
        "source/a.bs",
        "namespace Alpha\nsub one()\nend sub\nend namespace",
    );
    add_file(
        &mut program,
        "source/b.bs",
        "namespace Alpha\nsub two()\nend sub\nend namespace",
    );
    add_file(&mut program, "source/c.bs", "sub main()\n    x = Alpha.\nend sub");
    program.validate();
    let items = program.get_completions("source/c.bs", Position::new(1, 14));
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(
        labels.iter().filter(|l| l.eq_ignore_ascii_case("one")).count(),
        1,
        "{labels:?}"
    );
    assert_eq!(
        labels.iter().filter(|l| l.eq_ignore_ascii_case("two")).count(),
        1,
        "{labels:?}"
    );
}

#[test]
fn dot_completions_offer_property_hints() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    m.topSpeed = 4\n    x = m.\nend sub",
    );
    program.validate();
    let items = program.get_completions("source/main.brs", Position::new(2, 10));
    assert!(
        items
            .iter()
            .any(|i| i.label == "topSpeed" && i.kind == CompletionKind::Property),
        "{items:?}"
    );
}

#[test]
fn after_new_only_classes_are_offered() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.bs",
        "class Duck\nend class\nsub main()\n    d = new \nend sub",
    );
    program.validate();
    let items = program.get_completions("source/main.bs", Position::new(3, 12));
    assert!(!items.is_empty());
    assert!(items.iter().all(|i| i.kind == CompletionKind::Class), "{items:?}");
    assert!(items.iter().any(|i| i.label == "Duck"));
}

// =============================================================================
// HOVER
// =============================================================================

#[test]
fn hover_shows_local_variable_type() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    count = 1\n    count = 2\n    print count\nend sub",
    );
    program.validate();
    let hover = program
        .get_hover("source/main.brs", Position::new(3, 11))
        .expect("hover");
    assert!(hover.contents.contains("count as integer"), "{}", hover.contents);
}

#[test]
fn hover_local_variable_wins_over_scope_callable() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    helper = \"local\"\n    print helper\nend sub\nsub helper()\nend sub",
    );
    program.validate();
    let hover = program
        .get_hover("source/main.brs", Position::new(2, 11))
        .expect("hover");
    assert!(hover.contents.contains("helper as string"), "{}", hover.contents);
}

#[test]
fn hover_on_function_shows_the_canonical_signature() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    greet(\"sam\")\nend sub\nfunction greet(name as string) as string\n    return name\nend function",
    );
    program.validate();
    let hover = program
        .get_hover("source/main.brs", Position::new(1, 5))
        .expect("hover");
    assert!(
        hover.contents.contains("function greet(name as string) as string"),
        "{}",
        hover.contents
    );
}

// =============================================================================
// DEFINITION AND REFERENCES
// =============================================================================

#[test]
fn definition_finds_declarations_across_files() {
    let mut program = program();
    add_file(&mut program, "source/util.brs", "sub shared()\nend sub");
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    shared()\nend sub",
    );
    program.validate();
    let locations = program.get_definition("source/main.brs", Position::new(1, 6));
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].pkg_path, "source/util.brs");
}

#[test]
fn references_report_every_matching_variable_expression() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    total = 1\n    print total\n    x = total + total\nend sub",
    );
    program.validate();
    let locations = program.get_references("source/main.brs", Position::new(2, 11));
    // three reads of `total` (the assignment target is not a variable
    // expression)
    assert_eq!(locations.len(), 3, "{locations:?}");
}

// =============================================================================
// SIGNATURE HELP
// =============================================================================

#[test]
fn signature_help_reports_label_and_active_parameter() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    combine(1, 2)\nend sub\nsub combine(a as integer, b as integer)\nend sub",
    );
    program.validate();
    let help = program
        .get_signature_help("source/main.brs", Position::new(1, 16))
        .expect("signature help");
    assert!(help.label.contains("combine"), "{}", help.label);
    assert_eq!(help.active_parameter, 1);
}

#[test]
fn signature_help_includes_doc_comments() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "sub main()\n    greet(\"x\")\nend sub\n' Greets the given person.\nsub greet(name)\nend sub",
    );
    program.validate();
    let help = program
        .get_signature_help("source/main.brs", Position::new(1, 11))
        .expect("signature help");
    assert_eq!(
        help.documentation.as_deref(),
        Some("Greets the given person.")
    );
}

// =============================================================================
// SYMBOLS
// =============================================================================

#[test]
fn document_symbols_are_hierarchical() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.bs",
        "namespace App\nsub boot()\nend sub\nend namespace\nclass Duck\n    sub quack()\n    end sub\nend class",
    );
    program.validate();
    let symbols = program.get_document_symbols("source/main.bs");
    let namespace = symbols.iter().find(|s| s.name == "App").expect("namespace");
    assert_eq!(namespace.children.len(), 1);
    let class = symbols.iter().find(|s| s.name == "Duck").expect("class");
    assert_eq!(class.children.len(), 1);
}

#[test]
fn workspace_symbols_are_flat_with_containers() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.bs",
        "class Duck\n    sub quack()\n    end sub\nend class",
    );
    program.validate();
    let symbols = program.get_workspace_symbols();
    let quack = symbols.iter().find(|s| s.name == "quack").expect("method");
    assert_eq!(quack.container_name.as_deref(), Some("Duck"));
}
