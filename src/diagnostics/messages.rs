//! The stable diagnostic code table.
//!
//! One constructor per diagnostic; codes are stable integers and message
//! templates take positional arguments. Hosts match on `code`, so codes
//! must never be renumbered.

use crate::base::Range;

use super::{Diagnostic, Severity, whole_file_range};

// Lex / preprocess / parse: 1000-1099
pub const UNTERMINATED_STRING: u32 = 1001;
pub const UNEXPECTED_CHARACTER: u32 = 1002;
pub const INVALID_NUMERIC_LITERAL: u32 = 1003;
pub const UNEXPECTED_TOKEN: u32 = 1004;
pub const EXPECTED_IDENTIFIER: u32 = 1005;
pub const CONST_NAME_CANNOT_BE_RESERVED_WORD: u32 = 1006;
pub const INVALID_HASH_CONST_VALUE: u32 = 1007;
pub const BS_FEATURE_NOT_SUPPORTED_IN_BRS_FILES: u32 = 1008;
pub const IMPORT_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE: u32 = 1009;
pub const LIBRARY_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE: u32 = 1010;
pub const EXPECTED_CATCH: u32 = 1011;
pub const UNKNOWN_DIAGNOSTIC_CODE: u32 = 1012;
pub const CRITICAL_PARSER_FAILURE: u32 = 1013;
pub const INVALID_HASH_IF_VALUE: u32 = 1014;

// Resolution / semantics: 1100-1119
pub const CALL_TO_UNKNOWN_FUNCTION: u32 = 1100;
pub const MISMATCH_ARGUMENT_COUNT: u32 = 1101;
pub const DUPLICATE_FUNCTION_IMPLEMENTATION: u32 = 1102;
pub const DUPLICATE_CLASS_DECLARATION: u32 = 1103;
pub const CLASS_COULD_NOT_BE_FOUND: u32 = 1104;
pub const CLASS_CONSTRUCTOR_MISSING_SUPER_CALL: u32 = 1105;
pub const MISSING_OVERRIDE_KEYWORD: u32 = 1106;
pub const OVERRIDE_WITHOUT_PARENT_MEMBER: u32 = 1107;
pub const DUPLICATE_CLASS_MEMBER: u32 = 1108;
pub const CLASS_CHILD_MEMBER_DIFFERENT_MEMBER_TYPE_THAN_ANCESTOR: u32 = 1109;
pub const NAMESPACED_CLASS_CANNOT_SHARE_NAME_WITH_NON_NAMESPACED_CLASS: u32 = 1110;
pub const DUPLICATE_COMPONENT_NAME: u32 = 1111;
pub const REFERENCED_FILE_DOES_NOT_EXIST: u32 = 1112;

// Style / warnings: 1120-1139
pub const UNNECESSARY_SCRIPT_IMPORT_IN_CHILD_FROM_PARENT: u32 = 1120;
pub const SCRIPT_IMPORT_CASE_MISMATCH: u32 = 1121;
pub const FILE_NOT_REFERENCED_BY_ANY_OTHER_FILE: u32 = 1122;
pub const LOCAL_VAR_FUNCTION_SHADOWS_PARENT_FUNCTION: u32 = 1123;
pub const SCOPE_FUNCTION_SHADOWED_BY_BUILT_IN_FUNCTION: u32 = 1124;
pub const LOCAL_VAR_SHADOWED_BY_SCOPED_FUNCTION: u32 = 1125;
pub const OVERRIDES_ANCESTOR_FUNCTION: u32 = 1126;

/// All codes the engine can emit; comment flags naming anything else get
/// `unknown_diagnostic_code`.
pub const KNOWN_CODES: &[u32] = &[
    UNTERMINATED_STRING,
    UNEXPECTED_CHARACTER,
    INVALID_NUMERIC_LITERAL,
    UNEXPECTED_TOKEN,
    EXPECTED_IDENTIFIER,
    CONST_NAME_CANNOT_BE_RESERVED_WORD,
    INVALID_HASH_CONST_VALUE,
    BS_FEATURE_NOT_SUPPORTED_IN_BRS_FILES,
    IMPORT_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE,
    LIBRARY_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE,
    EXPECTED_CATCH,
    UNKNOWN_DIAGNOSTIC_CODE,
    CRITICAL_PARSER_FAILURE,
    INVALID_HASH_IF_VALUE,
    CALL_TO_UNKNOWN_FUNCTION,
    MISMATCH_ARGUMENT_COUNT,
    DUPLICATE_FUNCTION_IMPLEMENTATION,
    DUPLICATE_CLASS_DECLARATION,
    CLASS_COULD_NOT_BE_FOUND,
    CLASS_CONSTRUCTOR_MISSING_SUPER_CALL,
    MISSING_OVERRIDE_KEYWORD,
    OVERRIDE_WITHOUT_PARENT_MEMBER,
    DUPLICATE_CLASS_MEMBER,
    CLASS_CHILD_MEMBER_DIFFERENT_MEMBER_TYPE_THAN_ANCESTOR,
    NAMESPACED_CLASS_CANNOT_SHARE_NAME_WITH_NON_NAMESPACED_CLASS,
    DUPLICATE_COMPONENT_NAME,
    REFERENCED_FILE_DOES_NOT_EXIST,
    UNNECESSARY_SCRIPT_IMPORT_IN_CHILD_FROM_PARENT,
    SCRIPT_IMPORT_CASE_MISMATCH,
    FILE_NOT_REFERENCED_BY_ANY_OTHER_FILE,
    LOCAL_VAR_FUNCTION_SHADOWS_PARENT_FUNCTION,
    SCOPE_FUNCTION_SHADOWED_BY_BUILT_IN_FUNCTION,
    LOCAL_VAR_SHADOWED_BY_SCOPED_FUNCTION,
    OVERRIDES_ANCESTOR_FUNCTION,
];

pub fn is_known_code(code: u32) -> bool {
    KNOWN_CODES.contains(&code)
}

pub fn unterminated_string(range: Range) -> Diagnostic {
    Diagnostic::error(UNTERMINATED_STRING, "unterminated string literal", range)
}

pub fn unexpected_character(ch: char, range: Range) -> Diagnostic {
    Diagnostic::error(
        UNEXPECTED_CHARACTER,
        format!("unexpected character '{ch}'"),
        range,
    )
}

pub fn invalid_numeric_literal(text: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        INVALID_NUMERIC_LITERAL,
        format!("invalid numeric literal '{text}'"),
        range,
    )
}

pub fn unexpected_token(found: &str, range: Range) -> Diagnostic {
    Diagnostic::error(UNEXPECTED_TOKEN, format!("unexpected token '{found}'"), range)
}

pub fn expected_token(expected: &str, found: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        UNEXPECTED_TOKEN,
        format!("expected {expected}, found {found}"),
        range,
    )
}

pub fn expected_identifier(found: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        EXPECTED_IDENTIFIER,
        format!("expected identifier, found {found}"),
        range,
    )
}

pub fn const_name_cannot_be_reserved_word(name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        CONST_NAME_CANNOT_BE_RESERVED_WORD,
        format!("#const name '{name}' cannot be a reserved word"),
        range,
    )
}

pub fn invalid_hash_const_value(value: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        INVALID_HASH_CONST_VALUE,
        format!("invalid #const value '{value}': expected true, false, or a previously-defined #const"),
        range,
    )
}

pub fn invalid_hash_if_value(value: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        INVALID_HASH_IF_VALUE,
        format!("'{value}' is not defined as a #const or manifest flag"),
        range,
    )
}

pub fn feature_not_supported_in_classic_files(feature: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        BS_FEATURE_NOT_SUPPORTED_IN_BRS_FILES,
        format!("{feature} is not supported in .brs files"),
        range,
    )
}

pub fn import_statement_must_be_declared_at_top_of_file(range: Range) -> Diagnostic {
    Diagnostic::error(
        IMPORT_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE,
        "import statements must be declared at the top of the file",
        range,
    )
}

pub fn library_statement_must_be_declared_at_top_of_file(range: Range) -> Diagnostic {
    Diagnostic::error(
        LIBRARY_STATEMENT_MUST_BE_DECLARED_AT_TOP_OF_FILE,
        "library statements must be declared at the top of the file",
        range,
    )
}

pub fn expected_catch(range: Range) -> Diagnostic {
    Diagnostic::error(EXPECTED_CATCH, "try block is missing a catch clause", range)
}

pub fn unknown_diagnostic_code(code: u32, range: Range) -> Diagnostic {
    Diagnostic::warning(
        UNKNOWN_DIAGNOSTIC_CODE,
        format!("unknown diagnostic code {code}"),
        range,
    )
}

pub fn critical_parser_failure(detail: &str) -> Diagnostic {
    Diagnostic::error(
        CRITICAL_PARSER_FAILURE,
        format!("critical parser failure: {detail}"),
        whole_file_range(),
    )
}

pub fn call_to_unknown_function(name: &str, scope_name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        CALL_TO_UNKNOWN_FUNCTION,
        format!("cannot find function '{name}' in scope '{scope_name}'"),
        range,
    )
}

pub fn mismatch_argument_count(expected: &str, got: usize, range: Range) -> Diagnostic {
    Diagnostic::error(
        MISMATCH_ARGUMENT_COUNT,
        format!("expected {expected} argument(s), got {got}"),
        range,
    )
}

pub fn duplicate_function_implementation(name: &str, scope_name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        DUPLICATE_FUNCTION_IMPLEMENTATION,
        format!("duplicate function implementation '{name}' in scope '{scope_name}'"),
        range,
    )
}

pub fn duplicate_class_declaration(scope_name: &str, name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        DUPLICATE_CLASS_DECLARATION,
        format!("scope '{scope_name}' already contains a class named '{name}'"),
        range,
    )
}

pub fn class_could_not_be_found(name: &str, scope_name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        CLASS_COULD_NOT_BE_FOUND,
        format!("class '{name}' could not be found in scope '{scope_name}'"),
        range,
    )
}

pub fn class_constructor_missing_super_call(range: Range) -> Diagnostic {
    Diagnostic::error(
        CLASS_CONSTRUCTOR_MISSING_SUPER_CALL,
        "constructor must call super() because the parent class has a constructor",
        range,
    )
}

pub fn missing_override_keyword(ancestor_class: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        MISSING_OVERRIDE_KEYWORD,
        format!("method overrides a method from ancestor class '{ancestor_class}' and must use the 'override' keyword"),
        range,
    )
}

pub fn override_without_parent_member(name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        OVERRIDE_WITHOUT_PARENT_MEMBER,
        format!("method '{name}' is marked 'override' but no ancestor class declares it"),
        range,
    )
}

pub fn duplicate_class_member(class_name: &str, member_name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        DUPLICATE_CLASS_MEMBER,
        format!("class '{class_name}' already declares a member named '{member_name}'"),
        range,
    )
}

pub fn class_child_member_different_member_type_than_ancestor(
    member_kind: &str,
    ancestor_kind: &str,
    ancestor_class: &str,
    range: Range,
) -> Diagnostic {
    Diagnostic::error(
        CLASS_CHILD_MEMBER_DIFFERENT_MEMBER_TYPE_THAN_ANCESTOR,
        format!("child class {member_kind} cannot redeclare ancestor class {ancestor_kind} from '{ancestor_class}'"),
        range,
    )
}

pub fn namespaced_class_cannot_share_name_with_non_namespaced_class(
    namespaced_name: &str,
    range: Range,
) -> Diagnostic {
    Diagnostic::error(
        NAMESPACED_CLASS_CANNOT_SHARE_NAME_WITH_NON_NAMESPACED_CLASS,
        format!("namespaced class '{namespaced_name}' shares its name with a non-namespaced class"),
        range,
    )
}

pub fn duplicate_component_name(name: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        DUPLICATE_COMPONENT_NAME,
        format!("a component named '{name}' is already declared"),
        range,
    )
}

pub fn referenced_file_does_not_exist(uri: &str, range: Range) -> Diagnostic {
    Diagnostic::error(
        REFERENCED_FILE_DOES_NOT_EXIST,
        format!("referenced file does not exist: '{uri}'"),
        range,
    )
}

pub fn unnecessary_script_import_in_child_from_parent(
    parent_component: &str,
    range: Range,
) -> Diagnostic {
    Diagnostic::warning(
        UNNECESSARY_SCRIPT_IMPORT_IN_CHILD_FROM_PARENT,
        format!("unnecessary script import: already imported by ancestor component '{parent_component}'"),
        range,
    )
}

pub fn script_import_case_mismatch(actual_path: &str, range: Range) -> Diagnostic {
    Diagnostic::warning(
        SCRIPT_IMPORT_CASE_MISMATCH,
        format!("script import case does not match the file on disk: '{actual_path}'"),
        range,
    )
}

pub fn file_not_referenced_by_any_other_file(range: Range) -> Diagnostic {
    Diagnostic::warning(
        FILE_NOT_REFERENCED_BY_ANY_OTHER_FILE,
        "this file is not referenced by any file in the project",
        range,
    )
}

pub fn local_var_function_shadows_parent_function(scope_name: &str, range: Range) -> Diagnostic {
    Diagnostic::warning(
        LOCAL_VAR_FUNCTION_SHADOWS_PARENT_FUNCTION,
        format!("local variable function has the same name as {scope_name} function and will never be called"),
        range,
    )
}

pub fn scope_function_shadowed_by_built_in_function(range: Range) -> Diagnostic {
    Diagnostic::warning(
        SCOPE_FUNCTION_SHADOWED_BY_BUILT_IN_FUNCTION,
        "scope function will not be accessible because it has the same name as a built-in function",
        range,
    )
}

pub fn local_var_shadowed_by_scoped_function(range: Range) -> Diagnostic {
    Diagnostic::warning(
        LOCAL_VAR_SHADOWED_BY_SCOPED_FUNCTION,
        "local variable will not be accessible in function-call position because a scope function has the same name",
        range,
    )
}

pub fn overrides_ancestor_function(
    callable_name: &str,
    parent_scope_name: &str,
    range: Range,
) -> Diagnostic {
    Diagnostic::new(
        OVERRIDES_ANCESTOR_FUNCTION,
        Severity::Info,
        format!("function '{callable_name}' shadows a function of the same name in ancestor scope '{parent_scope_name}'"),
        range,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for &code in KNOWN_CODES {
            assert!(seen.insert(code), "duplicate diagnostic code {code}");
        }
    }

    #[test]
    fn known_code_lookup() {
        assert!(is_known_code(DUPLICATE_FUNCTION_IMPLEMENTATION));
        assert!(!is_known_code(9999));
    }
}
