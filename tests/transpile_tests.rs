//! Lowering: extended syntax down to classic surface text.

mod helpers;

use std::path::PathBuf;

use helpers::{add_file, program};
use luster::program::{FileEntry, Program, ProgramOptions};

fn transpiled(source: &str) -> String {
    let mut program = program();
    add_file(&mut program, "source/main.bs", source);
    program.validate();
    let out_dir = tempfile::tempdir().expect("temp dir");
    program.transpile(out_dir.path()).expect("transpile succeeds");
    std::fs::read_to_string(out_dir.path().join("source/main.brs")).expect("output exists")
}

// =============================================================================
// NAMESPACES
// =============================================================================

#[test]
fn namespace_functions_rename_with_underscores() {
    let output = transpiled(
        "namespace Alpha.Beta\nsub go()\nend sub\nend namespace\nsub main()\n    Alpha.Beta.go()\nend sub",
    );
    assert!(output.contains("sub Alpha_Beta_go()"), "{output}");
    assert!(output.contains("Alpha_Beta_go()"), "{output}");
    assert!(!output.contains("Alpha.Beta.go"), "{output}");
}

#[test]
fn same_namespace_short_calls_rewrite_too() {
    let output = transpiled(
        "namespace Alpha\nsub helper()\nend sub\nsub caller()\n    helper()\nend sub\nend namespace",
    );
    assert!(output.contains("Alpha_helper()"), "{output}");
}

// =============================================================================
// CLASSES
// =============================================================================

#[test]
fn class_lowers_to_builder_and_assembler() {
    let output = transpiled("class Duck\nend class");
    assert!(output.contains("function __Duck_builder()"), "{output}");
    assert!(output.contains("function Duck()"), "{output}");
    assert!(output.contains("instance.new()"), "{output}");
    assert!(output.contains("return instance"), "{output}");
}

#[test]
fn inheritance_chains_builders_and_keeps_super_aliases() {
    let output = transpiled(
        "class Animal\n    sub new()\n    end sub\n    sub walk()\n    end sub\nend class\nclass Duck extends Animal\n    sub new()\n        super()\n    end sub\n    override sub walk()\n        super.walk()\n    end sub\nend class",
    );
    assert!(output.contains("instance = __Animal_builder()"), "{output}");
    assert!(output.contains("instance.super0_new = instance.new"), "{output}");
    assert!(output.contains("instance.super0_walk = instance.walk"), "{output}");
    assert!(output.contains("m.super0_new()"), "{output}");
    assert!(output.contains("m.super0_walk()"), "{output}");
}

#[test]
fn fields_initialise_inside_the_constructor() {
    let output = transpiled("class Duck\n    legs = 2\n    name as string\nend class");
    assert!(output.contains("m.legs = 2"), "{output}");
    assert!(output.contains("m.name = invalid"), "{output}");
}

#[test]
fn namespaced_class_and_new_lower_to_joined_names() {
    let output = transpiled(
        "namespace Zoo\nclass Duck\nend class\nend namespace\nsub main()\n    d = new Zoo.Duck()\nend sub",
    );
    assert!(output.contains("function __Zoo_Duck_builder()"), "{output}");
    assert!(output.contains("d = Zoo_Duck()"), "{output}");
}

// =============================================================================
// TERNARY
// =============================================================================

#[test]
fn side_effect_free_ternary_uses_the_simple_helper() {
    let output = transpiled("sub main()\n    b = true\n    a = b ? 1 : 2\nend sub");
    assert!(output.contains("rtl_ternary(b, 1, 2)"), "{output}");
}

#[test]
fn mutating_ternary_uses_the_scope_safe_form() {
    let output = transpiled(
        "sub main()\n    condition = true\n    y = 2\n    a = condition ? getX() : y\nend sub\nfunction getX()\n    return 1\nend function",
    );
    assert!(!output.contains("rtl_ternary"), "{output}");
    assert!(
        output.contains("{\"condition\": condition, \"y\": y}"),
        "{output}"
    );
    assert!(output.contains("__scope.condition"), "{output}");
    assert!(output.contains("__scope.y"), "{output}");
    // the callee itself is not captured
    assert!(!output.contains("__scope.getX"), "{output}");
}

// =============================================================================
// TEMPLATE STRINGS
// =============================================================================

#[test]
fn template_with_interpolation_uses_the_join_helper() {
    let output = transpiled(
        "sub main()\n    name = \"sam\"\n    s = `hi ${name}!`\nend sub",
    );
    assert!(output.contains("rtl_join([\"hi \", name, \"!\"])"), "{output}");
}

#[test]
fn template_without_interpolation_folds_to_a_string() {
    let output = transpiled("sub main()\n    s = `plain`\nend sub");
    assert!(output.contains("s = \"plain\""), "{output}");
    assert!(!output.contains("rtl_join"), "{output}");
}

#[test]
fn non_primitive_interpolations_get_the_to_string_wrapper() {
    let output = transpiled("sub main()\n    obj = {}\n    s = `v=${obj}`\nend sub");
    assert!(output.contains("rtl_toString(obj)"), "{output}");
}

// =============================================================================
// MISC LOWERING
// =============================================================================

#[test]
fn callfunc_lowers_to_callfunc_invocation() {
    let output = transpiled(
        "sub main()\n    node = {}\n    node@.doThing()\n    node@.withArgs(1, 2)\nend sub",
    );
    assert!(output.contains("node.callfunc(\"doThing\", invalid)"), "{output}");
    assert!(output.contains("node.callfunc(\"withArgs\", 1, 2)"), "{output}");
}

#[test]
fn if_without_then_gains_then() {
    let output = transpiled("sub main()\n    if true\n        x = 1\n    end if\nend sub");
    assert!(output.contains("if true then"), "{output}");
}

#[test]
fn line_num_lowers_to_a_literal() {
    let output = transpiled("sub main()\n    x = LINE_NUM\nend sub");
    assert!(output.contains("x = 2"), "{output}");
}

#[test]
fn empty_collections_stay_inline_and_full_ones_indent() {
    let output = transpiled(
        "sub main()\n    a = []\n    b = {}\n    c = [1, 2]\nend sub",
    );
    assert!(output.contains("a = []"), "{output}");
    assert!(output.contains("b = {}"), "{output}");
    assert!(output.contains("c = [\n        1\n        2\n    ]"), "{output}");
}

#[test]
fn imports_become_comments() {
    let mut program = program();
    add_file(&mut program, "source/util.bs", "sub util()\nend sub");
    add_file(
        &mut program,
        "source/main.bs",
        "import \"pkg:/source/util.bs\"\nsub main()\nend sub",
    );
    program.validate();
    let out_dir = tempfile::tempdir().expect("temp dir");
    program.transpile(out_dir.path()).expect("transpile succeeds");
    let output =
        std::fs::read_to_string(out_dir.path().join("source/main.brs")).expect("output");
    assert!(output.contains("'import \"pkg:/source/util.bs\""), "{output}");
}

// =============================================================================
// SOURCE MAPS AND DETERMINISM
// =============================================================================

#[test]
fn source_maps_are_emitted_when_enabled() {
    let mut program = Program::new(ProgramOptions {
        root_dir: PathBuf::from("/proj"),
        source_map: true,
        source_root: Some("pkg:/".to_string()),
        ..ProgramOptions::default()
    });
    program.add_or_replace_file_entry(
        &FileEntry {
            src: PathBuf::from("/proj/source/main.bs"),
            dest: "source/main.bs".to_string(),
        },
        "sub main()\n    x = 1\nend sub",
    );
    program.validate();
    let out_dir = tempfile::tempdir().expect("temp dir");
    program.transpile(out_dir.path()).expect("transpile succeeds");

    let output =
        std::fs::read_to_string(out_dir.path().join("source/main.brs")).expect("output");
    assert!(
        output.ends_with("'//# sourceMappingURL=./main.brs.map"),
        "{output}"
    );

    let map = std::fs::read_to_string(out_dir.path().join("source/main.brs.map")).expect("map");
    let parsed: serde_json::Value = serde_json::from_str(&map).expect("valid json");
    assert_eq!(parsed["version"], 3);
    assert_eq!(parsed["sourceRoot"], "pkg:/");
    assert_eq!(parsed["sources"][0], "pkg:/source/main.bs");
}

#[test]
fn transpile_is_deterministic() {
    let source = "namespace A\nsub go()\nend sub\nend namespace\nclass Duck\nend class\nsub main()\n    A.go()\nend sub";
    let first = transpiled(source);
    let second = transpiled(source);
    assert_eq!(first, second);
}

#[test]
fn classic_files_copy_through_untouched() {
    let mut program = program();
    let source = "sub main()\n    print \"unchanged\"\nend sub";
    add_file(&mut program, "source/main.brs", source);
    program.validate();
    let out_dir = tempfile::tempdir().expect("temp dir");
    program.transpile(out_dir.path()).expect("transpile succeeds");
    let output =
        std::fs::read_to_string(out_dir.path().join("source/main.brs")).expect("output");
    assert_eq!(output, source);
}

#[test]
fn emit_definitions_writes_typedefs() {
    let mut program = Program::new(ProgramOptions {
        root_dir: PathBuf::from("/proj"),
        emit_definitions: true,
        ..ProgramOptions::default()
    });
    program.add_or_replace_file_entry(
        &FileEntry {
            src: PathBuf::from("/proj/source/api.bs"),
            dest: "source/api.bs".to_string(),
        },
        "function getName() as string\n    return \"x\"\nend function",
    );
    program.validate();
    let out_dir = tempfile::tempdir().expect("temp dir");
    program.transpile(out_dir.path()).expect("transpile succeeds");
    let typedef =
        std::fs::read_to_string(out_dir.path().join("source/api.d.bs")).expect("typedef");
    assert!(typedef.contains("function getName() as string"), "{typedef}");
}
