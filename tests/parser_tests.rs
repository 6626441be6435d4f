//! Parser behaviour: dialect gating, recovery, and the references index.

use luster::diagnostics::messages;
use luster::lexer::Lexer;
use luster::parser::{MemberKind, ParseMode, ParseResult, Parser};
use luster::types::TypeKind;

fn parse(source: &str, mode: ParseMode) -> ParseResult {
    let lexed = Lexer::scan(source);
    assert!(lexed.diagnostics.is_empty(), "{:?}", lexed.diagnostics);
    Parser::parse(lexed.tokens, mode)
}

fn parse_classic(source: &str) -> ParseResult {
    parse(source, ParseMode::Classic)
}

fn parse_extended(source: &str) -> ParseResult {
    parse(source, ParseMode::Extended)
}

// =============================================================================
// DIALECT GATING
// =============================================================================

#[test]
fn classic_rejects_extended_constructs() {
    for source in [
        "class Duck\nend class",
        "namespace Alpha\nend namespace",
        "import \"pkg:/source/util.brs\"",
        "sub main()\n    a = true ? 1 : 2\nend sub",
        "sub main()\n    try\n        x = 1\n    catch e\n    end try\nend sub",
        "sub main()\n    throw \"boom\"\nend sub",
    ] {
        let result = parse_classic(source);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.code == messages::BS_FEATURE_NOT_SUPPORTED_IN_BRS_FILES),
            "expected gate diagnostic for {source:?}, got {:?}",
            result.diagnostics
        );
    }
}

#[test]
fn extended_accepts_everything_classic_accepts() {
    let source = "sub main()\n    if true then\n        print \"hi\"\n    end if\nend sub";
    assert!(parse_extended(source).diagnostics.is_empty());
    assert!(parse_classic(source).diagnostics.is_empty());
}

// =============================================================================
// PARSE CONTRACTS
// =============================================================================

#[test]
fn import_must_be_declared_at_top_of_file() {
    let result = parse_extended("sub main()\nend sub\nimport \"pkg:/source/a.bs\"");
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == messages::IMPORT_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE)
    );
}

#[test]
fn imports_after_comments_and_library_are_fine() {
    let result = parse_extended(
        "' leading comment\nlibrary \"v30/bslCore.brs\"\nimport \"pkg:/source/a.bs\"\nsub main()\nend sub",
    );
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.references.import_statements.len(), 1);
    assert_eq!(result.references.library_statements.len(), 1);
}

#[test]
fn single_line_if_with_colon_end_if() {
    let result = parse_classic("function f()\n    if true then return 1 : end if\n    return 2\nend function");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn then_less_if_blocks_parse() {
    let result = parse_classic("sub main()\n    if true\n        x = 1\n    end if\nend sub");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn compound_assignment_operators() {
    let source = "sub main()\n    a = 1\n    a += 2\n    a <<= 1\n    m.b *= 3\n    arr[0] -= 1\nend sub";
    let result = parse_classic(source);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn try_without_catch_is_reported() {
    let result = parse_extended("sub main()\n    try\n        x = 1\n    end try\nend sub");
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == messages::EXPECTED_CATCH)
    );
}

#[test]
fn new_expression_infers_the_class_type() {
    let result = parse_extended("sub main()\n    x = new Alpha.Beta.Thing(1)\nend sub");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let assignment = &result.references.assignment_statements[0];
    assert_eq!(
        assignment.inferred_type,
        TypeKind::Custom("Alpha.Beta.Thing".into())
    );
}

#[test]
fn reserved_words_work_as_object_keys() {
    let result = parse_classic(
        "sub main()\n    obj = {\n        for: 1\n        end: 2\n    }\n    x = obj.for\nend sub",
    );
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn class_members_carry_access_override_and_types() {
    let result = parse_extended(
        "class Duck extends Animal\n    private name as string\n    legs = 2\n    ghost = invalid\n    override sub walk()\n    end sub\nend class",
    );
    let class = &result.references.class_statements[0];
    assert_eq!(class.parent_name.as_deref(), Some("Animal"));
    let name_field = class.members.iter().find(|m| m.name == "name").expect("field");
    assert_eq!(name_field.kind, MemberKind::Field);
    assert_eq!(name_field.member_type, TypeKind::String);
    let legs = class.members.iter().find(|m| m.name == "legs").expect("field");
    assert_eq!(legs.member_type, TypeKind::Integer);
    // a field initialised to invalid has declared type dynamic
    let ghost = class.members.iter().find(|m| m.name == "ghost").expect("field");
    assert_eq!(ghost.member_type, TypeKind::Dynamic);
    let walk = class.members.iter().find(|m| m.name == "walk").expect("method");
    assert_eq!(walk.kind, MemberKind::Method);
    assert!(walk.is_override);
}

#[test]
fn constructor_super_detection() {
    let with_super = parse_extended(
        "class Duck extends Animal\n    sub new()\n        super()\n    end sub\nend class",
    );
    assert!(with_super.references.class_statements[0].constructor_calls_super);

    let without_super = parse_extended(
        "class Duck extends Animal\n    sub new()\n        m.x = 1\n    end sub\nend class",
    );
    assert!(!without_super.references.class_statements[0].constructor_calls_super);
}

#[test]
fn nested_namespaces_produce_dotted_names() {
    let result = parse_extended(
        "namespace Outer\nnamespace Inner\nsub go()\nend sub\nend namespace\nend namespace",
    );
    let names: Vec<&str> = result
        .references
        .namespace_statements
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(names, vec!["Outer", "Outer.Inner"]);
    let function = &result.references.function_statements[0];
    assert_eq!(function.namespace_name.as_deref(), Some("Outer.Inner"));
}

// =============================================================================
// ERROR RECOVERY
// =============================================================================

#[test]
fn parser_recovers_at_statement_boundaries() {
    let result = parse_classic("sub main()\n    = 5\n    x = 1\nend sub");
    assert!(!result.diagnostics.is_empty());
    // the statement after the error still parsed
    assert!(
        result
            .references
            .assignment_statements
            .iter()
            .any(|a| a.name == "x")
    );
}

#[test]
fn parser_never_loses_the_function_after_garbage() {
    let result = parse_classic("sub broken()\n    ) ) )\nend sub\nsub intact()\nend sub");
    assert!(!result.diagnostics.is_empty());
    assert!(
        result
            .references
            .function_statements
            .iter()
            .any(|f| f.name == "intact")
    );
}

// =============================================================================
// REFERENCES INDEX
// =============================================================================

#[test]
fn property_hints_collect_dotted_names_and_aa_keys() {
    let result = parse_classic(
        "sub main()\n    m.topSpeed = 3\n    box = { innerValue: 1 }\n    print box.innerValue\nend sub",
    );
    let hints = &result.references.property_hints;
    assert!(hints.contains_key("topspeed"));
    assert!(hints.contains_key("innervalue"));
    // first observed original casing is preserved
    assert_eq!(hints.get("topspeed").map(String::as_str), Some("topSpeed"));
}

#[test]
fn local_vars_include_params_loop_counters_and_assignments() {
    let result = parse_classic(
        "sub main(input)\n    total = 0\n    for i = 1 to 10\n        total += i\n    end for\n    for each item in [1]\n        print item\n    end for\nend sub",
    );
    let function = &result.references.function_statements[0];
    let vars = result
        .references
        .local_vars
        .get(&function.func_id)
        .expect("locals recorded");
    let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    for expected in ["input", "total", "i", "item"] {
        assert!(names.contains(&expected), "missing {expected}: {names:?}");
    }
}

#[test]
fn function_expressions_link_parent_and_child() {
    let result = parse_classic(
        "sub main()\n    callback = function()\n        return 1\n    end function\nend sub",
    );
    let outer = result
        .references
        .function_expressions
        .iter()
        .find(|f| f.parent_id.is_none())
        .expect("outer function");
    let inner = result
        .references
        .function_expressions
        .iter()
        .find(|f| f.parent_id.is_some())
        .expect("inner function");
    assert_eq!(inner.parent_id, Some(outer.id));
}

#[test]
fn typedef_mode_parses_bodiless_declarations() {
    let result = parse(
        "function getName() as string\nsub logIt(message as string)\nclass Duck\n    sub quack()\nend class",
        ParseMode::Typedef,
    );
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.references.function_statements.len(), 2);
    assert_eq!(result.references.class_statements.len(), 1);
}
