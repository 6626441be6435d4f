//! The transpiler: lowers extended AST to classic surface syntax and
//! emits source maps.
//!
//! Lowering rules:
//! - namespace functions are renamed by joining name parts with `_`, and
//!   every statically-resolvable call site is rewritten to match;
//! - classes become a `__<Name>_builder()` / `<Name>()` function pair,
//!   with inheritance chaining to the parent builder and overridden
//!   methods retained under `super<idx>_<name>` aliases;
//! - template strings fold to string concatenation, or to the runtime
//!   join helper when interpolations are present;
//! - ternaries use the runtime helper when side-effect-free, otherwise a
//!   scope-safe closure receiving the captured variables;
//! - callfunc invocations, source literals, and `then`-less ifs are
//!   normalised to their classic spellings.

mod source_map;
mod typedef;
mod writer;

pub use source_map::SourceMapBuilder;
pub use typedef::generate_typedef;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{
    AAMember, Block, ClassStatement, Expression, FunctionExpression, PrintPart,
    SourceLiteralKind, Statement, TemplateStringQuasiExpression, TernaryExpression,
    TypeExpression,
};
use crate::base::Range;
use crate::files::SourceFile;
use crate::parser::ClassDecl;
use crate::types::{TypeKind, infer_expression_type};

use writer::CodeWriter;

/// The runtime helper prefix shared by lowered constructs
const RUNTIME_PREFIX: &str = "rtl";

#[derive(Debug, Clone, Default)]
pub struct TranspileOptions {
    pub source_map: bool,
    pub source_root: Option<String>,
}

/// Cross-file knowledge the emitter needs: which dotted names are
/// namespace functions, and every class declaration (for inheritance
/// chains and constructor signatures).
#[derive(Debug, Default)]
pub struct TranspileContext {
    /// lowercase fully-qualified dotted names of namespace functions
    pub namespace_functions: FxHashSet<String>,
    /// lowercase fully-qualified name → class declaration
    pub classes: FxHashMap<String, ClassDecl>,
}

#[derive(Debug)]
pub struct TranspileResult {
    pub code: String,
    pub source_map: Option<String>,
}

/// Lower one file. The result is deterministic for identical input.
pub fn transpile_file(
    file: &SourceFile,
    ctx: &TranspileContext,
    options: &TranspileOptions,
) -> TranspileResult {
    let Some(body) = file.body() else {
        return TranspileResult {
            code: file.source().to_string(),
            source_map: None,
        };
    };

    let mut emitter = Emitter {
        w: CodeWriter::new(options.source_map),
        ctx,
        file,
        namespace_stack: Vec::new(),
        class_depth: None,
        scope_captured: None,
        function_names: Vec::new(),
    };
    emitter.emit_statements(&body.statements);
    let (mut code, map) = emitter.w.finish();

    let source_map = map.and_then(|map| {
        let basename = file
            .pkg_path
            .rsplit('/')
            .next()
            .unwrap_or(&file.pkg_path)
            .to_string();
        let out_name = basename.replace(".bs", ".brs");
        let source = match &options.source_root {
            Some(root) => {
                let root = root.trim_end_matches('/');
                format!("{root}/{}", file.pkg_path)
            }
            None => file.src_path.to_string_lossy().to_string(),
        };
        code.push_str(&format!("'//# sourceMappingURL=./{out_name}.map"));
        map.render(&out_name, &source, options.source_root.as_deref())
            .ok()
    });

    TranspileResult { code, source_map }
}

struct Emitter<'a> {
    w: CodeWriter,
    ctx: &'a TranspileContext,
    file: &'a SourceFile,
    /// Full dotted namespace names, innermost last
    namespace_stack: Vec<String>,
    /// Ancestor count of the class whose method body is being emitted
    class_depth: Option<usize>,
    /// Variable names rewritten to `__scope.<name>` during scope-safe
    /// ternary emission
    scope_captured: Option<FxHashSet<String>>,
    /// (emitted name, source dotted name) of enclosing functions
    function_names: Vec<(String, String)>,
}

impl Emitter<'_> {
    fn current_namespace(&self) -> Option<&str> {
        self.namespace_stack.last().map(String::as_str)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_statements(&mut self, statements: &[Statement]) {
        for stmt in statements {
            self.emit_statement(stmt);
        }
    }

    fn emit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Namespace(ns) => {
                let full = match self.current_namespace() {
                    Some(outer) => format!("{outer}.{}", ns.name.text()),
                    None => ns.name.text(),
                };
                self.namespace_stack.push(full);
                self.emit_statements(&ns.body);
                self.namespace_stack.pop();
            }
            Statement::Function(func_stmt) => {
                let emitted_name = match self.current_namespace() {
                    Some(ns) => format!("{}_{}", ns.replace('.', "_"), func_stmt.name.text),
                    None => func_stmt.name.text.to_string(),
                };
                let source_name = match self.current_namespace() {
                    Some(ns) => format!("{ns}.{}", func_stmt.name.text),
                    None => func_stmt.name.text.to_string(),
                };
                self.emit_named_function(
                    &emitted_name,
                    &source_name,
                    func_stmt.name.range,
                    &func_stmt.func,
                );
            }
            Statement::Class(class_stmt) => self.emit_class(class_stmt),
            Statement::Import(import) => {
                // imports are a compile-time construct: keep them visible
                // as comments
                self.w.indent();
                self.w
                    .write_mapped(&format!("'import {}", import.path.text), import.range);
                self.w.newline();
            }
            Statement::Library(library) => {
                self.w.indent();
                self.w
                    .write_mapped(&format!("library {}", library.path.text), library.range);
                self.w.newline();
            }
            Statement::Comment(comment) => {
                for token in &comment.comments {
                    self.w.indent();
                    self.w.write_mapped(token.text.as_str(), token.range);
                    self.w.newline();
                }
            }
            Statement::Annotation(_) => {}
            Statement::Assignment(assign) => {
                self.w.indent();
                self.w.write_mapped(assign.name.text.as_str(), assign.name.range);
                self.w.write(&format!(" {} ", assign.operator.text));
                self.emit_expression(&assign.value);
                self.w.newline();
            }
            Statement::DottedSet(set) => {
                self.w.indent();
                self.emit_expression(&set.obj);
                self.w.write(".");
                self.w.write_mapped(set.name.text.as_str(), set.name.range);
                self.w.write(&format!(" {} ", set.operator.text));
                self.emit_expression(&set.value);
                self.w.newline();
            }
            Statement::IndexedSet(set) => {
                self.w.indent();
                self.emit_expression(&set.obj);
                self.w.write("[");
                self.emit_expression(&set.index);
                self.w.write("]");
                self.w.write(&format!(" {} ", set.operator.text));
                self.emit_expression(&set.value);
                self.w.newline();
            }
            Statement::Expression(expr_stmt) => {
                self.w.indent();
                self.emit_expression(&expr_stmt.expression);
                self.w.newline();
            }
            Statement::Increment(inc) => {
                self.w.indent();
                self.emit_expression(&inc.target);
                self.w.write(inc.operator.text.as_str());
                self.w.newline();
            }
            Statement::If(if_stmt) => {
                self.w.indent();
                self.w.write_mapped("if ", if_stmt.range);
                self.emit_expression(&if_stmt.condition);
                // `then` is always present on output
                self.w.write(" then");
                self.w.newline();
                self.emit_block(&if_stmt.then_branch);
                for clause in &if_stmt.else_ifs {
                    self.w.indent();
                    self.w.write("else if ");
                    self.emit_expression(&clause.condition);
                    self.w.write(" then");
                    self.w.newline();
                    self.emit_block(&clause.block);
                }
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.w.indent();
                    self.w.write("else");
                    self.w.newline();
                    self.emit_block(else_branch);
                }
                self.w.indent();
                self.w.write("end if");
                self.w.newline();
            }
            Statement::While(while_stmt) => {
                self.w.indent();
                self.w.write_mapped("while ", while_stmt.range);
                self.emit_expression(&while_stmt.condition);
                self.w.newline();
                self.emit_block(&while_stmt.body);
                self.w.indent();
                self.w.write("end while");
                self.w.newline();
            }
            Statement::For(for_stmt) => {
                self.w.indent();
                self.w.write_mapped("for ", for_stmt.range);
                self.w.write(for_stmt.counter.text.as_str());
                self.w.write(" = ");
                self.emit_expression(&for_stmt.start);
                self.w.write(" to ");
                self.emit_expression(&for_stmt.end);
                if let Some(step) = &for_stmt.step {
                    self.w.write(" step ");
                    self.emit_expression(step);
                }
                self.w.newline();
                self.emit_block(&for_stmt.body);
                self.w.indent();
                self.w.write("end for");
                self.w.newline();
            }
            Statement::ForEach(for_each) => {
                self.w.indent();
                self.w.write_mapped("for each ", for_each.range);
                self.w.write(for_each.item.text.as_str());
                self.w.write(" in ");
                self.emit_expression(&for_each.target);
                self.w.newline();
                self.emit_block(&for_each.body);
                self.w.indent();
                self.w.write("end for");
                self.w.newline();
            }
            Statement::Print(print) => {
                self.w.indent();
                self.w.write_mapped("print ", print.range);
                let mut first = true;
                for part in &print.parts {
                    match part {
                        PrintPart::Expression(expr) => {
                            if !first {
                                self.w.write(" ");
                            }
                            self.emit_expression(expr);
                        }
                        PrintPart::Semicolon(_) => self.w.write(";"),
                        PrintPart::Comma(_) => self.w.write(","),
                    }
                    first = false;
                }
                self.w.newline();
            }
            Statement::Return(ret) => {
                self.w.indent();
                self.w.write_mapped("return", ret.range);
                if let Some(value) = &ret.value {
                    self.w.write(" ");
                    self.emit_expression(value);
                }
                self.w.newline();
            }
            Statement::Goto(goto) => {
                self.w.indent();
                self.w
                    .write_mapped(&format!("goto {}", goto.label.text), goto.range);
                self.w.newline();
            }
            Statement::Label(label) => {
                self.w.indent();
                self.w
                    .write_mapped(&format!("{}:", label.name.text), label.range);
                self.w.newline();
            }
            Statement::End(end) => {
                self.w.indent();
                self.w.write_mapped("end", end.range);
                self.w.newline();
            }
            Statement::Stop(stop) => {
                self.w.indent();
                self.w.write_mapped("stop", stop.range);
                self.w.newline();
            }
            Statement::ExitFor(exit) => {
                self.w.indent();
                self.w.write_mapped("exit for", exit.range);
                self.w.newline();
            }
            Statement::ExitWhile(exit) => {
                self.w.indent();
                self.w.write_mapped("exit while", exit.range);
                self.w.newline();
            }
            Statement::Continue(cont) => {
                self.w.indent();
                let text = match cont.loop_kind {
                    crate::ast::ContinueLoopKind::For => "continue for",
                    crate::ast::ContinueLoopKind::While => "continue while",
                };
                self.w.write_mapped(text, cont.range);
                self.w.newline();
            }
            Statement::Dim(dim) => {
                self.w.indent();
                self.w.write_mapped(&format!("dim {}[", dim.name.text), dim.range);
                for (index, dimension) in dim.dimensions.iter().enumerate() {
                    if index > 0 {
                        self.w.write(", ");
                    }
                    self.emit_expression(dimension);
                }
                self.w.write("]");
                self.w.newline();
            }
            Statement::Throw(throw) => {
                self.w.indent();
                self.w.write_mapped("throw ", throw.range);
                self.emit_expression(&throw.value);
                self.w.newline();
            }
            Statement::TryCatch(try_catch) => {
                self.w.indent();
                self.w.write_mapped("try", try_catch.range);
                self.w.newline();
                self.emit_block(&try_catch.try_block);
                if let Some(catch) = &try_catch.catch {
                    self.w.indent();
                    self.w
                        .write(&format!("catch {}", catch.exception_var.text));
                    self.w.newline();
                    self.emit_block(&catch.block);
                }
                self.w.indent();
                self.w.write("end try");
                self.w.newline();
            }
            Statement::Catch(_)
            | Statement::Body(_)
            | Statement::Block(_)
            | Statement::ClassMethod(_)
            | Statement::ClassField(_) => {}
        }
    }

    fn emit_block(&mut self, block: &Block) {
        self.w.block_depth += 1;
        self.emit_statements(&block.statements);
        self.w.block_depth -= 1;
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn emit_named_function(
        &mut self,
        emitted_name: &str,
        source_name: &str,
        name_range: Range,
        func: &FunctionExpression,
    ) {
        self.w.indent();
        let keyword = if func.is_sub { "sub" } else { "function" };
        self.w.write(keyword);
        self.w.write(" ");
        self.w.write_mapped(emitted_name, name_range);
        self.function_names
            .push((emitted_name.to_string(), source_name.to_string()));
        self.emit_function_signature_and_body(func);
        self.function_names.pop();
        self.w.indent();
        self.w.write(if func.is_sub { "end sub" } else { "end function" });
        self.w.newline();
    }

    /// `(params) [as type]` plus the body lines. Leaves the cursor at the
    /// start of the line holding the terminator (caller writes it).
    fn emit_function_signature_and_body(&mut self, func: &FunctionExpression) {
        self.w.write("(");
        for (index, parameter) in func.parameters.iter().enumerate() {
            if index > 0 {
                self.w.write(", ");
            }
            self.w
                .write_mapped(parameter.name.text.as_str(), parameter.name.range);
            if let Some(default_value) = &parameter.default_value {
                self.w.write(" = ");
                self.emit_expression(default_value);
            }
            if let Some(type_expression) = &parameter.type_expression {
                self.w.write(" as ");
                self.w.write(&classic_type_name(type_expression));
            }
        }
        self.w.write(")");
        if let Some(return_type) = &func.return_type {
            self.w.write(" as ");
            self.w.write(&classic_type_name(return_type));
        }
        self.w.newline();
        self.emit_block(&func.body);
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// The underscore-joined fully-qualified class name used on output
    fn class_emitted_name(&self, class: &ClassDecl) -> String {
        match &class.namespace_name {
            Some(ns) => format!("{}_{}", ns.replace('.', "_"), class.name),
            None => class.name.clone(),
        }
    }

    /// Resolve a class reference relative to a namespace (spec strategy:
    /// namespace, ancestor prefixes, then top level)
    fn resolve_class<'c>(&'c self, name: &str, namespace: Option<&str>) -> Option<&'c ClassDecl> {
        let lower = name.to_lowercase();
        if !lower.contains('.') {
            if let Some(ns) = namespace {
                let mut prefix = ns.to_lowercase();
                loop {
                    if let Some(class) = self.ctx.classes.get(&format!("{prefix}.{lower}")) {
                        return Some(class);
                    }
                    match prefix.rfind('.') {
                        Some(i) => prefix.truncate(i),
                        None => break,
                    }
                }
            }
        }
        self.ctx.classes.get(&lower)
    }

    /// Ancestors of a class, nearest first
    fn class_ancestors(&self, class: &ClassDecl) -> Vec<ClassDecl> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(class.qualified_lower_name());
        let mut current = class.clone();
        while let Some(parent_name) = current.parent_name.clone() {
            let Some(parent) = self.resolve_class(&parent_name, current.namespace_name.as_deref())
            else {
                break;
            };
            if !seen.insert(parent.qualified_lower_name()) {
                break;
            }
            chain.push(parent.clone());
            current = parent.clone();
        }
        chain
    }

    fn emit_class(&mut self, class_stmt: &ClassStatement) {
        let namespace = self.current_namespace().map(str::to_string);
        let lower_fq = match &namespace {
            Some(ns) => format!("{ns}.{}", class_stmt.name.text).to_lowercase(),
            None => class_stmt.name.text.to_lowercase(),
        };
        let Some(decl) = self.ctx.classes.get(&lower_fq).cloned() else {
            return;
        };
        let emitted_name = self.class_emitted_name(&decl);
        let ancestors = self.class_ancestors(&decl);
        let depth = ancestors.len();
        let parent = ancestors.first().cloned();

        // ---- builder ----
        self.w.indent();
        self.w
            .write_mapped(&format!("function __{emitted_name}_builder()"), class_stmt.range);
        self.w.newline();
        self.w.block_depth += 1;

        self.w.indent();
        match &parent {
            Some(parent_class) => {
                let parent_name = self.class_emitted_name(parent_class);
                self.w.write(&format!("instance = __{parent_name}_builder()"));
            }
            None => self.w.write("instance = {}"),
        }
        self.w.newline();

        let super_index = depth.saturating_sub(1);
        self.class_depth = Some(depth);

        // constructor (aliasing the parent's before overwriting)
        if parent.is_some() {
            self.w.indent();
            self.w
                .write(&format!("instance.super{super_index}_new = instance.new"));
            self.w.newline();
        }
        self.emit_class_constructor(class_stmt, &decl, parent.as_ref(), super_index);

        // methods
        for member in &class_stmt.members {
            let Statement::ClassMethod(method) = member else {
                continue;
            };
            if method.name.text.eq_ignore_ascii_case("new") {
                continue;
            }
            let overrides_ancestor = ancestors.iter().any(|a| {
                a.members
                    .iter()
                    .any(|m| m.name.eq_ignore_ascii_case(&method.name.text))
            });
            if overrides_ancestor {
                self.w.indent();
                self.w.write(&format!(
                    "instance.super{super_index}_{name} = instance.{name}",
                    name = method.name.text
                ));
                self.w.newline();
            }
            self.w.indent();
            self.w.write("instance.");
            self.w
                .write_mapped(method.name.text.as_str(), method.name.range);
            self.w.write(" = ");
            self.w
                .write(if method.func.is_sub { "sub" } else { "function" });
            self.function_names.push((
                format!("{emitted_name}.{}", method.name.text),
                format!("{}.{}", decl.name, method.name.text),
            ));
            self.emit_function_signature_and_body(&method.func);
            self.function_names.pop();
            self.w.indent();
            self.w
                .write(if method.func.is_sub { "end sub" } else { "end function" });
            self.w.newline();
        }

        self.class_depth = None;
        self.w.indent();
        self.w.write("return instance");
        self.w.newline();
        self.w.block_depth -= 1;
        self.w.indent();
        self.w.write("end function");
        self.w.newline();

        // ---- assembler ----
        let constructor = class_stmt.constructor();
        self.w.indent();
        self.w
            .write_mapped(&format!("function {emitted_name}("), class_stmt.name.range);
        let mut param_names = Vec::new();
        if let Some(constructor) = constructor {
            for (index, parameter) in constructor.func.parameters.iter().enumerate() {
                if index > 0 {
                    self.w.write(", ");
                }
                self.w.write(parameter.name.text.as_str());
                if let Some(default_value) = &parameter.default_value {
                    self.w.write(" = ");
                    self.emit_expression(default_value);
                }
                if let Some(type_expression) = &parameter.type_expression {
                    self.w.write(" as ");
                    self.w.write(&classic_type_name(type_expression));
                }
                param_names.push(parameter.name.text.to_string());
            }
        }
        self.w.write(")");
        self.w.newline();
        self.w.block_depth += 1;
        self.w.indent();
        self.w
            .write(&format!("instance = __{emitted_name}_builder()"));
        self.w.newline();
        self.w.indent();
        self.w
            .write(&format!("instance.new({})", param_names.join(", ")));
        self.w.newline();
        self.w.indent();
        self.w.write("return instance");
        self.w.newline();
        self.w.block_depth -= 1;
        self.w.indent();
        self.w.write("end function");
        self.w.newline();
    }

    /// `instance.new = sub(...)` with field initialisers and the declared
    /// constructor body (or a synthesized chain to the parent)
    fn emit_class_constructor(
        &mut self,
        class_stmt: &ClassStatement,
        decl: &ClassDecl,
        parent: Option<&ClassDecl>,
        super_index: usize,
    ) {
        let constructor = class_stmt.constructor().cloned();
        self.w.indent();
        self.w.write("instance.new = ");
        match &constructor {
            Some(ctor) => {
                self.w.write(if ctor.func.is_sub { "sub" } else { "function" });
                self.w.write("(");
                for (index, parameter) in ctor.func.parameters.iter().enumerate() {
                    if index > 0 {
                        self.w.write(", ");
                    }
                    self.w.write(parameter.name.text.as_str());
                    if let Some(default_value) = &parameter.default_value {
                        self.w.write(" = ");
                        self.emit_expression(default_value);
                    }
                    if let Some(type_expression) = &parameter.type_expression {
                        self.w.write(" as ");
                        self.w.write(&classic_type_name(type_expression));
                    }
                }
                self.w.write(")");
                self.w.newline();
                self.w.block_depth += 1;
                self.emit_field_initializers(class_stmt);
                self.function_names.push((
                    format!("{}.new", self.class_emitted_name(decl)),
                    format!("{}.new", decl.name),
                ));
                for stmt in &ctor.func.body.statements {
                    self.emit_statement(stmt);
                }
                self.function_names.pop();
                self.w.block_depth -= 1;
                self.w.indent();
                self.w.write(if ctor.func.is_sub { "end sub" } else { "end function" });
                self.w.newline();
            }
            None => {
                self.w.write("sub()");
                self.w.newline();
                self.w.block_depth += 1;
                if parent.is_some() {
                    self.w.indent();
                    self.w.write(&format!("m.super{super_index}_new()"));
                    self.w.newline();
                }
                self.emit_field_initializers(class_stmt);
                self.w.block_depth -= 1;
                self.w.indent();
                self.w.write("end sub");
                self.w.newline();
            }
        }
    }

    fn emit_field_initializers(&mut self, class_stmt: &ClassStatement) {
        for member in &class_stmt.members {
            let Statement::ClassField(field) = member else {
                continue;
            };
            self.w.indent();
            self.w.write("m.");
            self.w.write_mapped(field.name.text.as_str(), field.name.range);
            self.w.write(" = ");
            match &field.initial_value {
                Some(value) => self.emit_expression(value),
                None => self.w.write("invalid"),
            }
            self.w.newline();
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn emit_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal(literal) => {
                self.w
                    .write_mapped(literal.token.text.as_str(), literal.range);
            }
            Expression::EscapedCharCodeLiteral(escaped) => {
                self.w.write(&format!("chr({})", escaped.char_code));
            }
            Expression::Variable(variable) => {
                let lower = variable.name.text.to_lowercase();
                if let Some(captured) = &self.scope_captured {
                    if captured.contains(&lower) {
                        self.w.write("__scope.");
                        self.w
                            .write_mapped(variable.name.text.as_str(), variable.range);
                        return;
                    }
                }
                self.w
                    .write_mapped(variable.name.text.as_str(), variable.range);
            }
            Expression::SourceLiteral(source_literal) => self.emit_source_literal(source_literal),
            Expression::Grouping(grouping) => {
                self.w.write("(");
                self.emit_expression(&grouping.inner);
                self.w.write(")");
            }
            Expression::Unary(unary) => {
                let op = unary.operator.text.as_str();
                self.w.write_mapped(op, unary.range);
                if op.eq_ignore_ascii_case("not") {
                    self.w.write(" ");
                }
                self.emit_expression(&unary.operand);
            }
            Expression::Binary(binary) => {
                self.emit_expression(&binary.left);
                self.w.write(&format!(" {} ", binary.operator.text));
                self.emit_expression(&binary.right);
            }
            Expression::DottedGet(get) => {
                self.emit_expression(&get.obj);
                self.w.write(".");
                self.w.write_mapped(get.name.text.as_str(), get.name.range);
            }
            Expression::XmlAttributeGet(get) => {
                self.emit_expression(&get.obj);
                self.w.write("@");
                self.w.write_mapped(get.name.text.as_str(), get.name.range);
            }
            Expression::IndexedGet(get) => {
                self.emit_expression(&get.obj);
                self.w.write("[");
                self.emit_expression(&get.index);
                self.w.write("]");
            }
            Expression::Call(call) => self.emit_call(call),
            Expression::Callfunc(callfunc) => {
                self.emit_expression(&callfunc.obj);
                self.w.write(".callfunc(");
                self.w.write(&format!("\"{}\"", callfunc.method.text));
                if callfunc.args.is_empty() {
                    self.w.write(", invalid");
                } else {
                    for arg in &callfunc.args {
                        self.w.write(", ");
                        self.emit_expression(arg);
                    }
                }
                self.w.write(")");
            }
            Expression::New(new_expr) => {
                let resolved = self
                    .resolve_class(&new_expr.class_name.text(), self.current_namespace())
                    .map(|c| self.class_emitted_name(c));
                let name = resolved
                    .unwrap_or_else(|| new_expr.class_name.text().replace('.', "_"));
                self.w.write_mapped(&name, new_expr.class_name.range);
                self.w.write("(");
                for (index, arg) in new_expr.args.iter().enumerate() {
                    if index > 0 {
                        self.w.write(", ");
                    }
                    self.emit_expression(arg);
                }
                self.w.write(")");
            }
            Expression::ArrayLiteral(array) => {
                let significant = array
                    .elements
                    .iter()
                    .filter(|e| !matches!(e, Expression::Comment(_)))
                    .count();
                if significant == 0 {
                    self.w.write_mapped("[]", array.range);
                    return;
                }
                self.w.write_mapped("[", array.range);
                self.w.newline();
                self.w.block_depth += 1;
                for element in &array.elements {
                    self.w.indent();
                    self.emit_expression(element);
                    self.w.newline();
                }
                self.w.block_depth -= 1;
                self.w.indent();
                self.w.write("]");
            }
            Expression::AALiteral(aa) => {
                let significant = aa
                    .members
                    .iter()
                    .filter(|m| matches!(m, AAMember::Field { .. }))
                    .count();
                if significant == 0 {
                    self.w.write_mapped("{}", aa.range);
                    return;
                }
                self.w.write_mapped("{", aa.range);
                self.w.newline();
                self.w.block_depth += 1;
                for member in &aa.members {
                    match member {
                        AAMember::Field { key, value, .. } => {
                            self.w.indent();
                            self.w.write_mapped(key.text.as_str(), key.range);
                            self.w.write(": ");
                            self.emit_expression(value);
                            self.w.newline();
                        }
                        AAMember::Comment(token) => {
                            self.w.indent();
                            self.w.write(token.text.as_str());
                            self.w.newline();
                        }
                    }
                }
                self.w.block_depth -= 1;
                self.w.indent();
                self.w.write("}");
            }
            Expression::Function(func) => {
                self.w
                    .write_mapped(if func.is_sub { "sub" } else { "function" }, func.range);
                self.function_names.push((
                    "anon".to_string(),
                    "anon".to_string(),
                ));
                self.emit_function_signature_and_body(func);
                self.function_names.pop();
                self.w.indent();
                self.w
                    .write(if func.is_sub { "end sub" } else { "end function" });
            }
            Expression::TemplateString(template) => {
                self.emit_template_string(&template.quasis, &template.expressions, template.range);
            }
            Expression::TaggedTemplateString(tagged) => {
                self.w
                    .write_mapped(tagged.tag.text.as_str(), tagged.tag.range);
                self.w.write("([");
                for (index, quasi) in tagged.quasis.iter().enumerate() {
                    if index > 0 {
                        self.w.write(", ");
                    }
                    self.emit_quasi_concat(quasi);
                }
                self.w.write("], [");
                for (index, inner) in tagged.expressions.iter().enumerate() {
                    if index > 0 {
                        self.w.write(", ");
                    }
                    self.emit_expression(inner);
                }
                self.w.write("])");
            }
            Expression::Ternary(ternary) => self.emit_ternary(ternary),
            Expression::NamespacedVariableName(name) => {
                self.w.write_mapped(&name.text(), name.range);
            }
            Expression::TemplateStringQuasi(quasi) => self.emit_quasi_concat(quasi),
            Expression::FunctionParameter(parameter) => {
                self.w
                    .write_mapped(parameter.name.text.as_str(), parameter.range);
            }
            Expression::Comment(comment) => {
                self.w.write(comment.token.text.as_str());
            }
        }
    }

    /// Calls: namespace-function renaming and `super` routing
    fn emit_call(&mut self, call: &crate::ast::CallExpression) {
        // super(...) and super.method(...) inside class methods
        if let Some(depth) = self.class_depth {
            let super_index = depth.saturating_sub(1);
            if let Expression::Variable(variable) = call.callee.as_ref() {
                if variable.name.text.eq_ignore_ascii_case("super") {
                    self.w
                        .write_mapped(&format!("m.super{super_index}_new"), variable.range);
                    self.emit_call_args(call);
                    return;
                }
            }
            if let Expression::DottedGet(get) = call.callee.as_ref() {
                if let Expression::Variable(base) = get.obj.as_ref() {
                    if base.name.text.eq_ignore_ascii_case("super") {
                        self.w.write_mapped(
                            &format!("m.super{super_index}_{}", get.name.text),
                            get.name.range,
                        );
                        self.emit_call_args(call);
                        return;
                    }
                }
            }
        }

        // statically-known namespace functions get the joined name
        if let Some((written, range)) = static_callee_name(&call.callee) {
            if let Some(emitted) = self.resolve_namespace_function(&written) {
                self.w.write_mapped(&emitted, range);
                self.emit_call_args(call);
                return;
            }
        }

        self.emit_expression(&call.callee);
        self.emit_call_args(call);
    }

    fn emit_call_args(&mut self, call: &crate::ast::CallExpression) {
        self.w.write("(");
        for (index, arg) in call.args.iter().enumerate() {
            if index > 0 {
                self.w.write(", ");
            }
            self.emit_expression(arg);
        }
        self.w.write(")");
    }

    /// Absolute dotted names match directly; bare and relative names
    /// resolve through the enclosing namespace chain
    fn resolve_namespace_function(&self, written: &str) -> Option<String> {
        let lower = written.to_lowercase();
        if self.ctx.namespace_functions.contains(&lower) {
            return Some(written.replace('.', "_"));
        }
        if let Some(ns) = self.current_namespace() {
            let mut prefix = ns.to_string();
            loop {
                let candidate = format!("{}.{lower}", prefix.to_lowercase());
                if self.ctx.namespace_functions.contains(&candidate) {
                    return Some(format!("{}_{}", prefix.replace('.', "_"), written.replace('.', "_")));
                }
                match prefix.rfind('.') {
                    Some(i) => prefix.truncate(i),
                    None => break,
                }
            }
        }
        None
    }

    fn emit_source_literal(&mut self, literal: &crate::ast::SourceLiteralExpression) {
        let text = match literal.literal_kind {
            SourceLiteralKind::LineNum => (self.w.line() + 1).to_string(),
            SourceLiteralKind::SourceLineNum => (literal.range.start.line + 1).to_string(),
            SourceLiteralKind::FunctionName => format!(
                "\"{}\"",
                self.function_names
                    .last()
                    .map(|(emitted, _)| emitted.as_str())
                    .unwrap_or("")
            ),
            SourceLiteralKind::SourceFunctionName => format!(
                "\"{}\"",
                self.function_names
                    .last()
                    .map(|(_, source)| source.as_str())
                    .unwrap_or("")
            ),
            SourceLiteralKind::SourceFilePath => {
                format!("\"{}\"", self.file.src_path.to_string_lossy())
            }
            SourceLiteralKind::SourceLocation => format!(
                "\"{}:{}\"",
                self.file.src_path.to_string_lossy(),
                literal.range.start.line + 1
            ),
            SourceLiteralKind::PkgPath => format!("\"pkg:/{}\"", self.file.pkg_path),
            SourceLiteralKind::PkgLocation => format!(
                "\"pkg:/{}:{}\"",
                self.file.pkg_path,
                literal.range.start.line + 1
            ),
        };
        self.w.write_mapped(&text, literal.range);
    }

    // =========================================================================
    // Template strings
    // =========================================================================

    /// Literal fragments joined with `+`, quotes and newlines as `chr(n)`
    fn emit_quasi_concat(&mut self, quasi: &TemplateStringQuasiExpression) {
        if quasi.parts.is_empty() {
            self.w.write("\"\"");
            return;
        }
        for (index, part) in quasi.parts.iter().enumerate() {
            if index > 0 {
                self.w.write(" + ");
            }
            self.emit_expression(part);
        }
    }

    fn emit_template_string(
        &mut self,
        quasis: &[TemplateStringQuasiExpression],
        expressions: &[Expression],
        range: Range,
    ) {
        if expressions.is_empty() {
            // a plain string after all
            match quasis.first() {
                Some(quasi) => self.emit_quasi_concat(quasi),
                None => self.w.write_mapped("\"\"", range),
            }
            return;
        }

        self.w.write_mapped(&format!("{RUNTIME_PREFIX}_join(["), range);
        let mut first = true;
        for (index, quasi) in quasis.iter().enumerate() {
            if !quasi.parts.is_empty() {
                if !first {
                    self.w.write(", ");
                }
                self.emit_quasi_concat(quasi);
                first = false;
            }
            if let Some(inner) = expressions.get(index) {
                if !first {
                    self.w.write(", ");
                }
                first = false;
                // primitives skip the helper's to-string step
                if infer_expression_type(inner).is_primitive() {
                    self.emit_expression(inner);
                } else {
                    self.w.write(&format!("{RUNTIME_PREFIX}_toString("));
                    self.emit_expression(inner);
                    self.w.write(")");
                }
            }
        }
        self.w.write("])");
    }

    // =========================================================================
    // Ternary
    // =========================================================================

    fn emit_ternary(&mut self, ternary: &TernaryExpression) {
        let safe = is_side_effect_free(&ternary.condition)
            && is_side_effect_free(&ternary.consequent)
            && is_side_effect_free(&ternary.alternate);
        if safe {
            self.w.write(&format!("{RUNTIME_PREFIX}_ternary("));
            self.emit_expression(&ternary.condition);
            self.w.write(", ");
            self.emit_expression(&ternary.consequent);
            self.w.write(", ");
            self.emit_expression(&ternary.alternate);
            self.w.write(")");
            return;
        }

        // scope-safe form: captured variables travel in an AA so neither
        // branch evaluates twice
        let mut captured: Vec<String> = Vec::new();
        collect_captured_variables(&ternary.condition, &mut captured);
        collect_captured_variables(&ternary.consequent, &mut captured);
        collect_captured_variables(&ternary.alternate, &mut captured);

        let captured_set: FxHashSet<String> =
            captured.iter().map(|n| n.to_lowercase()).collect();
        let previous = self.scope_captured.replace(captured_set);

        self.w.write("(function(__scope as object) as dynamic");
        self.w.newline();
        self.w.block_depth += 1;
        self.w.indent();
        self.w.write("if ");
        self.emit_expression(&ternary.condition);
        self.w.write(" then");
        self.w.newline();
        self.w.block_depth += 1;
        self.w.indent();
        self.w.write("return ");
        self.emit_expression(&ternary.consequent);
        self.w.newline();
        self.w.block_depth -= 1;
        self.w.indent();
        self.w.write("else");
        self.w.newline();
        self.w.block_depth += 1;
        self.w.indent();
        self.w.write("return ");
        self.emit_expression(&ternary.alternate);
        self.w.newline();
        self.w.block_depth -= 1;
        self.w.indent();
        self.w.write("end if");
        self.w.newline();
        self.w.block_depth -= 1;
        self.w.indent();
        self.w.write("end function)(");

        self.scope_captured = previous;
        self.w.write("{");
        for (index, name) in captured.iter().enumerate() {
            if index > 0 {
                self.w.write(", ");
            }
            // a ternary nested inside another scope-safe ternary reads
            // the outer capture AA
            let outer_captured = self
                .scope_captured
                .as_ref()
                .is_some_and(|set| set.contains(&name.to_lowercase()));
            if outer_captured {
                self.w.write(&format!("\"{name}\": __scope.{name}"));
            } else {
                self.w.write(&format!("\"{name}\": {name}"));
            }
        }
        self.w.write("})");
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// `as <type>` rendering for the classic dialect: built-in names pass
/// through, custom types become `object`
fn classic_type_name(type_expression: &TypeExpression) -> String {
    match TypeKind::from_type_name(&type_expression.text()) {
        TypeKind::Custom(_) => "object".to_string(),
        other => other.to_string(),
    }
}

/// A callee written as a bare name or simple dotted chain
fn static_callee_name(expr: &Expression) -> Option<(String, Range)> {
    match expr {
        Expression::Variable(variable) => {
            Some((variable.name.text.to_string(), variable.name.range))
        }
        Expression::DottedGet(get) => {
            let (prefix, _) = static_callee_name(&get.obj)?;
            Some((format!("{prefix}.{}", get.name.text), get.name.range))
        }
        _ => None,
    }
}

/// Neither calls, callfuncs, news, nor dotted gets: safe to evaluate
/// twice inside the simple ternary helper
fn is_side_effect_free(expr: &Expression) -> bool {
    match expr {
        Expression::Call(_)
        | Expression::Callfunc(_)
        | Expression::New(_)
        | Expression::DottedGet(_)
        | Expression::XmlAttributeGet(_) => false,
        Expression::Binary(binary) => {
            is_side_effect_free(&binary.left) && is_side_effect_free(&binary.right)
        }
        Expression::Unary(unary) => is_side_effect_free(&unary.operand),
        Expression::Grouping(grouping) => is_side_effect_free(&grouping.inner),
        Expression::IndexedGet(get) => {
            is_side_effect_free(&get.obj) && is_side_effect_free(&get.index)
        }
        Expression::Ternary(ternary) => {
            is_side_effect_free(&ternary.condition)
                && is_side_effect_free(&ternary.consequent)
                && is_side_effect_free(&ternary.alternate)
        }
        Expression::TemplateString(template) => {
            template.expressions.iter().all(is_side_effect_free)
        }
        Expression::ArrayLiteral(array) => array.elements.iter().all(is_side_effect_free),
        Expression::AALiteral(aa) => aa.members.iter().all(|m| match m {
            AAMember::Field { value, .. } => is_side_effect_free(value),
            AAMember::Comment(_) => true,
        }),
        _ => true,
    }
}

/// Variable names read by an expression, excluding callee positions and
/// the context variable `m`. Order of first appearance, de-duplicated.
fn collect_captured_variables(expr: &Expression, out: &mut Vec<String>) {
    match expr {
        Expression::Variable(variable) => {
            let name = variable.name.text.to_string();
            if !name.eq_ignore_ascii_case("m")
                && !out.iter().any(|n| n.eq_ignore_ascii_case(&name))
            {
                out.push(name);
            }
        }
        Expression::Call(call) => {
            // the callee name itself resolves through scope, not capture;
            // a dotted callee still captures its base object
            if let Expression::DottedGet(get) = call.callee.as_ref() {
                collect_captured_variables(&get.obj, out);
            }
            for arg in &call.args {
                collect_captured_variables(arg, out);
            }
        }
        Expression::Callfunc(callfunc) => {
            collect_captured_variables(&callfunc.obj, out);
            for arg in &callfunc.args {
                collect_captured_variables(arg, out);
            }
        }
        Expression::New(new_expr) => {
            for arg in &new_expr.args {
                collect_captured_variables(arg, out);
            }
        }
        Expression::Binary(binary) => {
            collect_captured_variables(&binary.left, out);
            collect_captured_variables(&binary.right, out);
        }
        Expression::Unary(unary) => collect_captured_variables(&unary.operand, out),
        Expression::Grouping(grouping) => collect_captured_variables(&grouping.inner, out),
        Expression::DottedGet(get) => collect_captured_variables(&get.obj, out),
        Expression::XmlAttributeGet(get) => collect_captured_variables(&get.obj, out),
        Expression::IndexedGet(get) => {
            collect_captured_variables(&get.obj, out);
            collect_captured_variables(&get.index, out);
        }
        Expression::Ternary(ternary) => {
            collect_captured_variables(&ternary.condition, out);
            collect_captured_variables(&ternary.consequent, out);
            collect_captured_variables(&ternary.alternate, out);
        }
        Expression::TemplateString(template) => {
            for inner in &template.expressions {
                collect_captured_variables(inner, out);
            }
        }
        Expression::ArrayLiteral(array) => {
            for element in &array.elements {
                collect_captured_variables(element, out);
            }
        }
        Expression::AALiteral(aa) => {
            for member in &aa.members {
                if let AAMember::Field { value, .. } = member {
                    collect_captured_variables(value, out);
                }
            }
        }
        _ => {}
    }
}

