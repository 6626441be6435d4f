//! Classic/extended source files: the parse product plus per-file caches.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use tracing::debug;

use crate::ast::{AstVisitor, BodyStatement, Expression, WalkMode, WalkOptions, walk_statement};
use crate::base::Range;
use crate::diagnostics::{Diagnostic, messages};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::parser::{FunctionExprInfo, ParseMode, Parser, References};
use crate::preprocessor::{Manifest, Preprocessor};
use crate::types::{TypeKind, infer_expression_type};

use super::comment_flags::{CommentFlag, extract_comment_flags};
use super::{DocumentSymbol, SymbolKindTag, WorkspaceSymbol};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallArg {
    pub type_kind: TypeKind,
    pub range: Range,
}

/// One call site with a statically-known callee name (`foo()`,
/// `Alpha.Beta.foo()`, `m.foo()`)
#[derive(Debug, Clone)]
pub struct FunctionCall {
    /// The callee as written, dot-joined
    pub name: String,
    /// Range of the final name part
    pub name_range: Range,
    pub args: Vec<FunctionCallArg>,
    pub range: Range,
    /// Enclosing function expression id
    pub function_id: Option<u32>,
}

/// One `new Name(args)` site
#[derive(Debug, Clone)]
pub struct NewInfo {
    pub class_name: String,
    pub class_name_range: Range,
    pub args: Vec<FunctionCallArg>,
    pub range: Range,
    /// Enclosing function expression id
    pub function_id: Option<u32>,
}

/// The parse product of one source file
pub struct ParsedUnit {
    pub body: BodyStatement,
    pub references: References,
}

pub struct SourceFile {
    pub src_path: PathBuf,
    pub pkg_path: String,
    /// `brs`, `bs`, or `d.bs`
    pub extension: String,
    pub parse_mode: ParseMode,
    source: String,
    parsed: Option<ParsedUnit>,
    pub needs_transpile: bool,
    /// pkg-path of the linked `.d.bs` typedef, when one exists
    pub typedef_pkg_path: Option<String>,
    pub comment_flags: Vec<CommentFlag>,
    pub function_calls: Vec<FunctionCall>,
    pub new_expressions: Vec<NewInfo>,
    /// Script targets of this file's `import` statements
    pub own_script_imports: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    document_symbols: Option<Vec<DocumentSymbol>>,
}

impl SourceFile {
    /// The extension decides the dialect: `.bs` (and `.d.bs`) parse
    /// extended, `.brs` parses classic.
    pub fn extension_of(pkg_path: &str) -> String {
        let lower = pkg_path.to_lowercase();
        if lower.ends_with(".d.bs") {
            "d.bs".to_string()
        } else if lower.ends_with(".bs") {
            "bs".to_string()
        } else {
            "brs".to_string()
        }
    }

    pub fn new(src_path: PathBuf, pkg_path: String, source: String, manifest: &Manifest) -> Self {
        let extension = Self::extension_of(&pkg_path);
        let parse_mode = match extension.as_str() {
            "brs" => ParseMode::Classic,
            "d.bs" => ParseMode::Typedef,
            _ => ParseMode::Extended,
        };
        let mut file = Self {
            src_path,
            pkg_path,
            extension,
            parse_mode,
            source,
            parsed: None,
            needs_transpile: parse_mode == ParseMode::Extended,
            typedef_pkg_path: None,
            comment_flags: Vec::new(),
            function_calls: Vec::new(),
            new_expressions: Vec::new(),
            own_script_imports: Vec::new(),
            diagnostics: Vec::new(),
            document_symbols: None,
        };
        file.parse_now(manifest);
        file
    }

    /// A file whose typedef supplies the public surface defers its own
    /// parse until the typedef goes away
    pub fn new_deferred(
        src_path: PathBuf,
        pkg_path: String,
        source: String,
        typedef_pkg_path: String,
    ) -> Self {
        let extension = Self::extension_of(&pkg_path);
        Self {
            src_path,
            pkg_path,
            extension,
            parse_mode: ParseMode::Classic,
            source,
            parsed: None,
            needs_transpile: false,
            typedef_pkg_path: Some(typedef_pkg_path),
            comment_flags: Vec::new(),
            function_calls: Vec::new(),
            new_expressions: Vec::new(),
            own_script_imports: Vec::new(),
            diagnostics: Vec::new(),
            document_symbols: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn has_typedef(&self) -> bool {
        self.typedef_pkg_path.is_some()
    }

    /// Parse on first access (used when a typedef previously suppressed
    /// the parse and has been removed)
    pub fn ensure_parsed(&mut self, manifest: &Manifest) {
        if self.parsed.is_none() {
            self.parse_now(manifest);
        }
    }

    pub fn parsed(&self) -> Option<&ParsedUnit> {
        self.parsed.as_ref()
    }

    pub fn references(&self) -> Option<&References> {
        self.parsed.as_ref().map(|p| &p.references)
    }

    pub fn body(&self) -> Option<&BodyStatement> {
        self.parsed.as_ref().map(|p| &p.body)
    }

    pub fn body_mut(&mut self) -> Option<&mut BodyStatement> {
        self.parsed.as_mut().map(|p| &mut p.body)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn parse_now(&mut self, manifest: &Manifest) {
        debug!(pkg_path = %self.pkg_path, "parsing file");
        self.diagnostics.clear();
        self.document_symbols = None;

        let lexed = Lexer::scan(&self.source);
        self.diagnostics.extend(lexed.diagnostics);

        let comment_tokens: Vec<Token> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .cloned()
            .collect();
        self.comment_flags = extract_comment_flags(&comment_tokens, &mut self.diagnostics);

        let preprocessed = Preprocessor::process(lexed.tokens, manifest);
        self.diagnostics.extend(preprocessed.diagnostics);

        let mode = self.parse_mode;
        let tokens = preprocessed.tokens;
        let result = catch_unwind(AssertUnwindSafe(move || Parser::parse(tokens, mode)));
        match result {
            Ok(mut parsed) => {
                self.diagnostics.append(&mut parsed.diagnostics);
                let mut body = parsed.body;
                let (calls, news) =
                    collect_call_sites(&mut body, &parsed.references.function_expressions);
                self.function_calls = calls;
                self.new_expressions = news;
                self.own_script_imports = parsed
                    .references
                    .import_statements
                    .iter()
                    .map(|i| i.path.clone())
                    .collect();
                self.parsed = Some(ParsedUnit {
                    body,
                    references: parsed.references,
                });
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown error");
                self.diagnostics
                    .push(messages::critical_parser_failure(detail));
                self.parsed = Some(ParsedUnit {
                    body: BodyStatement::default(),
                    references: References::default(),
                });
            }
        }
        for diagnostic in &mut self.diagnostics {
            diagnostic.file_pkg_path = Some(self.pkg_path.clone());
        }
    }

    // =========================================================================
    // Symbol caches
    // =========================================================================

    /// Hierarchical symbols (class → members, namespace → children),
    /// computed once per parse
    pub fn document_symbols(&mut self) -> Vec<DocumentSymbol> {
        if let Some(cached) = &self.document_symbols {
            return cached.clone();
        }
        let computed = self.compute_document_symbols();
        self.document_symbols = Some(computed.clone());
        computed
    }

    fn compute_document_symbols(&self) -> Vec<DocumentSymbol> {
        let Some(references) = self.references() else {
            return Vec::new();
        };
        let mut symbols = Vec::new();

        for namespace in &references.namespace_statements {
            let mut children = Vec::new();
            for function in &references.function_statements {
                if function.namespace_name.as_deref() == Some(namespace.name.as_str()) {
                    children.push(function_symbol(function));
                }
            }
            for class in &references.class_statements {
                if class.namespace_name.as_deref() == Some(namespace.name.as_str()) {
                    children.push(class_symbol(class));
                }
            }
            symbols.push(DocumentSymbol {
                name: namespace.name.clone(),
                detail: None,
                kind: SymbolKindTag::Namespace,
                range: namespace.range,
                selection_range: namespace.name_range,
                children,
            });
        }
        for function in &references.function_statements {
            if function.namespace_name.is_none() {
                symbols.push(function_symbol(function));
            }
        }
        for class in &references.class_statements {
            if class.namespace_name.is_none() {
                symbols.push(class_symbol(class));
            }
        }
        symbols
    }

    /// Flat symbols with container names
    pub fn workspace_symbols(&mut self) -> Vec<WorkspaceSymbol> {
        let pkg_path = self.pkg_path.clone();
        let mut result = Vec::new();
        for symbol in self.document_symbols() {
            flatten_symbol(&symbol, None, &pkg_path, &mut result);
        }
        result
    }
}

fn function_symbol(function: &crate::parser::FunctionDecl) -> DocumentSymbol {
    DocumentSymbol {
        name: function.name.clone(),
        detail: Some(function.signature()),
        kind: SymbolKindTag::Function,
        range: function.range,
        selection_range: function.name_range,
        children: Vec::new(),
    }
}

fn class_symbol(class: &crate::parser::ClassDecl) -> DocumentSymbol {
    let children = class
        .members
        .iter()
        .map(|member| DocumentSymbol {
            name: member.name.clone(),
            detail: None,
            kind: match member.kind {
                crate::parser::MemberKind::Method => SymbolKindTag::Method,
                crate::parser::MemberKind::Field => SymbolKindTag::Field,
            },
            range: member.range,
            selection_range: member.name_range,
            children: Vec::new(),
        })
        .collect();
    DocumentSymbol {
        name: class.name.clone(),
        detail: None,
        kind: SymbolKindTag::Class,
        range: class.range,
        selection_range: class.name_range,
        children,
    }
}

fn flatten_symbol(
    symbol: &DocumentSymbol,
    container: Option<&str>,
    pkg_path: &str,
    out: &mut Vec<WorkspaceSymbol>,
) {
    out.push(WorkspaceSymbol {
        name: symbol.name.clone(),
        container_name: container.map(str::to_string),
        kind: symbol.kind,
        pkg_path: pkg_path.to_string(),
        range: symbol.selection_range,
    });
    for child in &symbol.children {
        flatten_symbol(child, Some(&symbol.name), pkg_path, out);
    }
}

// ============================================================================
// Call-site collection
// ============================================================================

struct CallCollector<'a> {
    calls: Vec<FunctionCall>,
    news: Vec<NewInfo>,
    functions: &'a [FunctionExprInfo],
}

impl AstVisitor for CallCollector<'_> {
    fn visit_expression(&mut self, expr: &mut Expression) -> Option<Expression> {
        match expr {
            Expression::Call(call) => {
                if let Some((name, name_range)) = dotted_callee_name(&call.callee) {
                    let range = call.range;
                    self.calls.push(FunctionCall {
                        name,
                        name_range,
                        args: call.args.iter().map(call_arg).collect(),
                        range,
                        function_id: containing_function(self.functions, range),
                    });
                }
            }
            Expression::New(new_expr) => {
                self.news.push(NewInfo {
                    class_name: new_expr.class_name.text(),
                    class_name_range: new_expr.class_name.range,
                    args: new_expr.args.iter().map(call_arg).collect(),
                    range: new_expr.range,
                    function_id: containing_function(self.functions, new_expr.range),
                });
            }
            _ => {}
        }
        None
    }
}

fn call_arg(expr: &Expression) -> FunctionCallArg {
    FunctionCallArg {
        type_kind: infer_expression_type(expr),
        range: expr.range(),
    }
}

/// Extract a statically-known callee: a bare variable or a chain of
/// simple dotted names
fn dotted_callee_name(expr: &Expression) -> Option<(String, Range)> {
    match expr {
        Expression::Variable(variable) => {
            Some((variable.name.text.to_string(), variable.name.range))
        }
        Expression::DottedGet(get) => {
            let (prefix, _) = dotted_callee_name(&get.obj)?;
            Some((
                format!("{prefix}.{}", get.name.text),
                get.name.range,
            ))
        }
        _ => None,
    }
}

/// The innermost function expression whose range contains `range`
fn containing_function(functions: &[FunctionExprInfo], range: Range) -> Option<u32> {
    functions
        .iter()
        .filter(|f| f.range.contains(range.start) && f.range.contains(range.end))
        .max_by_key(|f| (f.range.start.line, f.range.start.column))
        .map(|f| f.id)
}

fn collect_call_sites(
    body: &mut BodyStatement,
    functions: &[FunctionExprInfo],
) -> (Vec<FunctionCall>, Vec<NewInfo>) {
    let mut collector = CallCollector {
        calls: Vec::new(),
        news: Vec::new(),
        functions,
    };
    let options = WalkOptions::new(WalkMode::visit_all());
    for stmt in &mut body.statements {
        walk_statement(stmt, &mut collector, &options);
    }
    (collector.calls, collector.news)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_file(source: &str, pkg_path: &str) -> SourceFile {
        SourceFile::new(
            PathBuf::from(format!("/proj/{pkg_path}")),
            pkg_path.to_string(),
            source.to_string(),
            &Manifest::new(),
        )
    }

    #[test]
    fn extension_decides_parse_mode() {
        let classic = parse_file("sub main()\nend sub", "source/main.brs");
        assert_eq!(classic.parse_mode, ParseMode::Classic);
        assert!(!classic.needs_transpile);

        let extended = parse_file("sub main()\nend sub", "source/main.bs");
        assert_eq!(extended.parse_mode, ParseMode::Extended);
        assert!(extended.needs_transpile);

        assert_eq!(SourceFile::extension_of("source/main.d.bs"), "d.bs");
    }

    #[test]
    fn classic_file_rejects_extended_syntax() {
        let file = parse_file("class Duck\nend class", "source/main.brs");
        assert!(
            file.diagnostics()
                .iter()
                .any(|d| d.code == messages::BS_FEATURE_NOT_SUPPORTED_IN_BRS_FILES)
        );
    }

    #[test]
    fn function_calls_are_collected_with_arg_types() {
        let file = parse_file(
            "sub main()\n    doWork(1, \"two\")\nend sub\nsub doWork(a, b)\nend sub",
            "source/main.brs",
        );
        let call = file
            .function_calls
            .iter()
            .find(|c| c.name == "doWork")
            .expect("call recorded");
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].type_kind, TypeKind::Integer);
        assert_eq!(call.args[1].type_kind, TypeKind::String);
        assert!(call.function_id.is_some());
    }

    #[test]
    fn namespace_calls_keep_the_dotted_name() {
        let file = parse_file(
            "sub main()\n    Alpha.Beta.go()\nend sub",
            "source/main.bs",
        );
        assert!(file.function_calls.iter().any(|c| c.name == "Alpha.Beta.go"));
    }

    #[test]
    fn deferred_parse_waits_for_ensure() {
        let mut file = SourceFile::new_deferred(
            PathBuf::from("/proj/source/main.brs"),
            "source/main.brs".to_string(),
            "sub hidden()\nend sub".to_string(),
            "source/main.d.bs".to_string(),
        );
        assert!(!file.is_parsed());
        file.ensure_parsed(&Manifest::new());
        assert!(file.is_parsed());
        assert_eq!(
            file.references()
                .map(|r| r.function_statements.len())
                .unwrap_or(0),
            1
        );
    }

    #[test]
    fn reparse_with_identical_content_is_stable() {
        let a = parse_file("sub main()\n  x = 1\nend sub", "source/main.brs");
        let b = parse_file("sub main()\n  x = 1\nend sub", "source/main.brs");
        assert_eq!(a.body(), b.body());
        assert_eq!(a.diagnostics(), b.diagnostics());
    }

    #[test]
    fn document_symbols_nest_class_members() {
        let mut file = parse_file(
            "class Duck\n    sub quack()\n    end sub\n    name as string\nend class",
            "source/duck.bs",
        );
        let symbols = file.document_symbols();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].kind, SymbolKindTag::Class);
        assert_eq!(symbols[0].children.len(), 2);
    }
}
