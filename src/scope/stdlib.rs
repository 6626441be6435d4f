//! The built-in callable surface of the global scope.
//!
//! These feed unknown-function checks, shadowing diagnostics, hover, and
//! completion. Signatures are the runtime's documented ones, lightly
//! typed.

use crate::base::Range;
use crate::parser::ParamInfo;
use crate::types::TypeKind;

use super::Callable;

fn param(name: &str, type_kind: TypeKind) -> ParamInfo {
    ParamInfo {
        name: name.to_string(),
        type_kind,
        is_optional: false,
        is_rest_argument: false,
        range: Range::default(),
    }
}

fn optional(name: &str, type_kind: TypeKind) -> ParamInfo {
    ParamInfo {
        name: name.to_string(),
        type_kind,
        is_optional: true,
        is_rest_argument: false,
        range: Range::default(),
    }
}

fn rest(name: &str) -> ParamInfo {
    ParamInfo {
        name: name.to_string(),
        type_kind: TypeKind::Dynamic,
        is_optional: true,
        is_rest_argument: true,
        range: Range::default(),
    }
}

fn builtin(name: &str, params: Vec<ParamInfo>, return_type: TypeKind) -> Callable {
    Callable {
        name: name.to_string(),
        name_range: Range::default(),
        params,
        return_type,
        is_sub: false,
        file_pkg_path: String::new(),
        func_id: u32::MAX,
        range: Range::default(),
        has_namespace: false,
        namespace_name: None,
        doc: None,
        is_builtin: true,
    }
}

/// Every built-in callable of the global scope
pub fn global_callables() -> Vec<Callable> {
    use TypeKind::{Boolean, Double, Dynamic, Float, Integer, Object, String as Str, Void};
    vec![
        // string functions
        builtin("UCase", vec![param("s", Str)], Str),
        builtin("LCase", vec![param("s", Str)], Str),
        builtin("Asc", vec![param("letter", Str)], Integer),
        builtin("Chr", vec![param("ch", Integer)], Str),
        builtin(
            "Instr",
            vec![param("start", Integer), param("text", Str), param("substring", Str)],
            Integer,
        ),
        builtin("Left", vec![param("s", Str), param("n", Integer)], Str),
        builtin("Right", vec![param("s", Str), param("n", Integer)], Str),
        builtin("Len", vec![param("s", Str)], Integer),
        builtin(
            "Mid",
            vec![param("s", Str), param("p", Integer), optional("n", Integer)],
            Str,
        ),
        builtin("Str", vec![param("value", Float)], Str),
        builtin("StrI", vec![param("value", Integer), optional("radix", Integer)], Str),
        builtin("String", vec![param("n", Integer), param("s", Str)], Str),
        builtin("StringI", vec![param("n", Integer), param("ch", Integer)], Str),
        builtin("Val", vec![param("s", Str), optional("radix", Integer)], Float),
        builtin("StrToI", vec![param("s", Str)], Integer),
        builtin(
            "Substitute",
            vec![param("format", Str), rest("args")],
            Str,
        ),
        builtin("Tr", vec![param("source", Str)], Str),
        // math functions
        builtin("Abs", vec![param("x", Float)], Float),
        builtin("Atn", vec![param("x", Float)], Float),
        builtin("Cos", vec![param("x", Float)], Float),
        builtin("Sin", vec![param("x", Float)], Float),
        builtin("Tan", vec![param("x", Float)], Float),
        builtin("Exp", vec![param("x", Float)], Float),
        builtin("Log", vec![param("x", Float)], Float),
        builtin("Sqr", vec![param("x", Float)], Float),
        builtin("Rnd", vec![param("range", Integer)], Integer),
        builtin("Int", vec![param("x", Float)], Integer),
        builtin("Fix", vec![param("x", Float)], Integer),
        builtin("Sgn", vec![param("x", Float)], Integer),
        builtin("Cdbl", vec![param("x", Integer)], Double),
        builtin("Cint", vec![param("x", Float)], Integer),
        builtin("Csng", vec![param("x", Integer)], Float),
        // runtime functions
        builtin("CreateObject", vec![param("name", Str), rest("args")], Object),
        builtin("Type", vec![param("value", Dynamic), optional("version", Str)], Str),
        builtin("GetGlobalAA", vec![], Object),
        builtin("Box", vec![param("value", Dynamic)], Object),
        builtin("Run", vec![param("file", Str), rest("args")], Dynamic),
        builtin("Eval", vec![param("code", Str)], Dynamic),
        builtin("GetLastRunCompileError", vec![], Object),
        builtin("GetLastRunRunTimeError", vec![], Integer),
        builtin("Wait", vec![param("timeout", Integer), param("port", Object)], Object),
        builtin("Sleep", vec![param("milliseconds", Integer)], Void),
        builtin("UpTime", vec![param("dummy", Integer)], Float),
        builtin("RebootSystem", vec![], Void),
        builtin("FormatJson", vec![param("json", Object), optional("flags", Integer)], Str),
        builtin("ParseJson", vec![param("jsonString", Str)], Object),
        builtin("ReadAsciiFile", vec![param("filePath", Str)], Str),
        builtin(
            "WriteAsciiFile",
            vec![param("filePath", Str), param("text", Str)],
            Boolean,
        ),
        builtin("ListDir", vec![param("path", Str)], Object),
        builtin("CopyFile", vec![param("source", Str), param("destination", Str)], Boolean),
        builtin("MoveFile", vec![param("source", Str), param("destination", Str)], Boolean),
        builtin("DeleteFile", vec![param("file", Str)], Boolean),
        builtin("CreateDirectory", vec![param("path", Str)], Boolean),
        builtin("FindMemberFunction", vec![param("object", Object), param("name", Str)], Object),
        builtin("GetInterface", vec![param("object", Object), param("name", Str)], Object),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_unique_lowercase_names() {
        let callables = global_callables();
        let mut seen = std::collections::HashSet::new();
        for callable in &callables {
            assert!(
                seen.insert(callable.name.to_lowercase()),
                "duplicate builtin {}",
                callable.name
            );
        }
    }

    #[test]
    fn rest_arguments_open_the_arg_count_range() {
        let callables = global_callables();
        let substitute = callables
            .iter()
            .find(|c| c.name == "Substitute")
            .expect("Substitute exists");
        let (min, max) = substitute.arg_count_range();
        assert_eq!(min, 1);
        assert_eq!(max, usize::MAX);
    }
}
