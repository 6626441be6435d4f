//! The scope engine.
//!
//! A scope is a named set of files with a parent scope: the global scope
//! (built-in callables) parents everything, the implicit `source` scope
//! holds the project's top-level files, and each component gets a scope
//! whose parent is its declared parent component's scope (global when the
//! component extends nothing known).
//!
//! Linking derives the per-scope caches — callables by lowercase name,
//! classes by fully-qualified lowercase name, and the namespace tree —
//! from the member files' references indexes. Cross-scope lookups
//! (ancestor-chain walking) live on the Program, which owns all scopes.

mod stdlib;

pub use stdlib::global_callables;

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::base::Range;
use crate::diagnostics::Diagnostic;
use crate::graph::Subscription;
use crate::parser::{ClassDecl, FunctionDecl, ParamInfo, References};
use crate::types::TypeKind;

/// Method names exempt from override-policy and shadow diagnostics
pub const LIFECYCLE_METHODS: &[&str] = &["init", "new"];

pub fn is_lifecycle_method(name: &str) -> bool {
    LIFECYCLE_METHODS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(name))
}

/// A top-level function reachable by bare name within its scope
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: String,
    pub name_range: Range,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeKind,
    pub is_sub: bool,
    /// Owning file's pkg-path (empty for built-ins)
    pub file_pkg_path: String,
    /// The parser-assigned function expression id in that file
    pub func_id: u32,
    pub range: Range,
    pub has_namespace: bool,
    pub namespace_name: Option<String>,
    pub doc: Option<String>,
    pub is_builtin: bool,
}

impl Callable {
    fn from_decl(decl: &FunctionDecl, pkg_path: &str) -> Self {
        Self {
            name: decl.name.clone(),
            name_range: decl.name_range,
            params: decl.params.clone(),
            return_type: decl.return_type.clone(),
            is_sub: decl.is_sub,
            file_pkg_path: pkg_path.to_string(),
            func_id: decl.func_id,
            range: decl.range,
            has_namespace: decl.namespace_name.is_some(),
            namespace_name: decl.namespace_name.clone(),
            doc: decl.doc.clone(),
            is_builtin: false,
        }
    }

    /// Canonical rendered signature (`function name(args) as return`)
    pub fn signature(&self) -> String {
        let keyword = if self.is_sub { "sub" } else { "function" };
        let params = self
            .params
            .iter()
            .map(|p| {
                if p.is_optional {
                    format!("[{} as {}]", p.name, p.type_kind)
                } else {
                    format!("{} as {}", p.name, p.type_kind)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        if self.is_sub && self.return_type == TypeKind::Void {
            format!("{keyword} {}({params})", self.name)
        } else {
            format!("{keyword} {}({params}) as {}", self.name, self.return_type)
        }
    }

    /// Inclusive (min, max) accepted argument counts
    pub fn arg_count_range(&self) -> (usize, usize) {
        let max = self.params.len();
        let min = self
            .params
            .iter()
            .take_while(|p| !p.is_optional && !p.is_rest_argument)
            .count();
        if self.params.iter().any(|p| p.is_rest_argument) {
            (min, usize::MAX)
        } else {
            (min, max)
        }
    }
}

/// A class declaration as seen by a scope
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub decl: ClassDecl,
    pub file_pkg_path: String,
}

impl ClassInfo {
    pub fn qualified_lower_name(&self) -> String {
        self.decl.qualified_lower_name()
    }
}

/// One node of the namespace tree. Child keys are case-insensitive;
/// `last_part_name` preserves the first observed original casing for
/// display.
#[derive(Debug, Clone, Default)]
pub struct NamespaceNode {
    pub full_name: String,
    pub last_part_name: String,
    pub children: FxHashMap<String, NamespaceNode>,
    pub functions_by_lower_name: FxHashMap<String, Callable>,
    pub classes_by_lower_name: FxHashMap<String, ClassInfo>,
}

impl NamespaceNode {
    /// Walk (creating) the child chain for dotted `parts`
    fn ensure_path<'a>(&'a mut self, parts: &[&str], full_prefix: &str) -> &'a mut NamespaceNode {
        let Some((first, rest)) = parts.split_first() else {
            return self;
        };
        let lower = first.to_lowercase();
        let full_name = if full_prefix.is_empty() {
            (*first).to_string()
        } else {
            format!("{full_prefix}.{first}")
        };
        let child = self
            .children
            .entry(lower)
            .or_insert_with(|| NamespaceNode {
                full_name: full_name.clone(),
                last_part_name: (*first).to_string(),
                ..NamespaceNode::default()
            });
        child.ensure_path(rest, &full_name)
    }

    /// Resolve a dotted path (case-insensitive) to a node
    pub fn find_path(&self, parts: &[&str]) -> Option<&NamespaceNode> {
        let Some((first, rest)) = parts.split_first() else {
            return Some(self);
        };
        self.children.get(&first.to_lowercase())?.find_path(rest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Source,
    Component { component_name: String },
}

/// A view of one member file handed to [`Scope::link`]
pub struct ScopeFileView<'a> {
    pub pkg_path: &'a str,
    pub references: &'a References,
}

pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    /// Name of the parent scope; `None` only for the global scope
    pub parent_name: Option<String>,
    validated: Rc<Cell<bool>>,
    pub diagnostics: Vec<Diagnostic>,
    file_pkg_paths: Vec<String>,
    /// lowercase bare name → all non-namespaced callables with that name
    callables: FxHashMap<String, Vec<Callable>>,
    /// lowercase fully-qualified dotted name → namespaced callable
    namespaced_callables: FxHashMap<String, Callable>,
    /// lowercase fully-qualified name → all classes with that name
    classes: FxHashMap<String, Vec<ClassInfo>>,
    namespace_root: NamespaceNode,
    /// Graph subscriptions owned by this scope (dropped on removal)
    pub(crate) subscriptions: Vec<Subscription>,
}

impl Scope {
    pub fn new(name: impl Into<String>, kind: ScopeKind, parent_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            parent_name,
            validated: Rc::new(Cell::new(false)),
            diagnostics: Vec::new(),
            file_pkg_paths: Vec::new(),
            callables: FxHashMap::default(),
            namespaced_callables: FxHashMap::default(),
            classes: FxHashMap::default(),
            namespace_root: NamespaceNode::default(),
            subscriptions: Vec::new(),
        }
    }

    /// The global scope: built-in callables, always valid
    pub fn global() -> Self {
        let mut scope = Self::new("global", ScopeKind::Global, None);
        for callable in global_callables() {
            scope
                .callables
                .entry(callable.name.to_lowercase())
                .or_default()
                .push(callable);
        }
        scope.validated.set(true);
        scope
    }

    pub fn is_validated(&self) -> bool {
        self.validated.get()
    }

    pub fn mark_validated(&mut self) {
        self.validated.set(true);
    }

    pub fn invalidate(&mut self) {
        self.validated.set(false);
    }

    /// The shared flag graph subscriptions flip when a dependency changes
    pub fn validity_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.validated)
    }

    /// pkg-paths of this scope's own files (ancestors excluded)
    pub fn file_pkg_paths(&self) -> &[String] {
        &self.file_pkg_paths
    }

    pub fn namespace_root(&self) -> &NamespaceNode {
        &self.namespace_root
    }

    /// Non-namespaced callables with this lowercase bare name
    pub fn own_callables(&self, lower_name: &str) -> &[Callable] {
        self.callables
            .get(lower_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A namespaced callable by lowercase fully-qualified name
    pub fn namespaced_callable(&self, lower_full_name: &str) -> Option<&Callable> {
        self.namespaced_callables.get(lower_full_name)
    }

    pub fn all_callables(&self) -> impl Iterator<Item = &Callable> {
        self.callables
            .values()
            .flatten()
            .chain(self.namespaced_callables.values())
    }

    /// Duplicate-detection view: bare-name buckets
    pub fn callable_buckets(&self) -> impl Iterator<Item = (&String, &Vec<Callable>)> {
        self.callables.iter()
    }

    pub fn classes_by_lower_fq(&self, lower_name: &str) -> &[ClassInfo] {
        self.classes.get(lower_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn class_buckets(&self) -> impl Iterator<Item = (&String, &Vec<ClassInfo>)> {
        self.classes.iter()
    }

    pub fn all_classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values().flatten()
    }

    /// Rebuild the derived caches from the member files
    pub fn link(&mut self, files: &[ScopeFileView<'_>]) {
        debug!(scope = %self.name, files = files.len(), "linking scope");
        self.file_pkg_paths = files.iter().map(|f| f.pkg_path.to_string()).collect();
        self.callables.clear();
        self.namespaced_callables.clear();
        self.classes.clear();
        self.namespace_root = NamespaceNode::default();

        for file in files {
            // namespace statements create nodes even when empty
            for namespace in &file.references.namespace_statements {
                let parts: Vec<&str> = namespace.name.split('.').collect();
                self.namespace_root.ensure_path(&parts, "");
            }

            for decl in &file.references.function_statements {
                let callable = Callable::from_decl(decl, file.pkg_path);
                match &decl.namespace_name {
                    None => {
                        self.callables
                            .entry(decl.name.to_lowercase())
                            .or_default()
                            .push(callable);
                    }
                    Some(namespace_name) => {
                        let parts: Vec<&str> = namespace_name.split('.').collect();
                        let node = self.namespace_root.ensure_path(&parts, "");
                        node.functions_by_lower_name
                            .insert(decl.name.to_lowercase(), callable.clone());
                        let full_lower =
                            format!("{namespace_name}.{}", decl.name).to_lowercase();
                        self.namespaced_callables.insert(full_lower, callable);
                    }
                }
            }

            for decl in &file.references.class_statements {
                let info = ClassInfo {
                    decl: decl.clone(),
                    file_pkg_path: file.pkg_path.to_string(),
                };
                if let Some(namespace_name) = &decl.namespace_name {
                    let parts: Vec<&str> = namespace_name.split('.').collect();
                    let node = self.namespace_root.ensure_path(&parts, "");
                    node.classes_by_lower_name
                        .insert(decl.name.to_lowercase(), info.clone());
                }
                self.classes
                    .entry(info.qualified_lower_name())
                    .or_default()
                    .push(info);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::SourceFile;
    use crate::preprocessor::Manifest;
    use std::path::PathBuf;

    fn file(source: &str, pkg_path: &str) -> SourceFile {
        SourceFile::new(
            PathBuf::from(format!("/proj/{pkg_path}")),
            pkg_path.to_string(),
            source.to_string(),
            &Manifest::new(),
        )
    }

    fn link_scope(files: &[&SourceFile]) -> Scope {
        let mut scope = Scope::new("source", ScopeKind::Source, Some("global".into()));
        let views: Vec<ScopeFileView<'_>> = files
            .iter()
            .map(|f| ScopeFileView {
                pkg_path: &f.pkg_path,
                references: f.references().expect("parsed"),
            })
            .collect();
        scope.link(&views);
        scope
    }

    #[test]
    fn bare_callables_bucket_by_lowercase_name() {
        let a = file("sub DoA()\nend sub", "source/a.brs");
        let scope = link_scope(&[&a]);
        assert_eq!(scope.own_callables("doa").len(), 1);
        assert_eq!(scope.own_callables("DOA").len(), 0);
    }

    #[test]
    fn namespaces_merge_across_files() {
        let a = file("namespace Alpha.Beta\nsub one()\nend sub\nend namespace", "source/a.bs");
        let b = file("namespace alpha.beta\nsub two()\nend sub\nend namespace", "source/b.bs");
        let scope = link_scope(&[&a, &b]);
        let node = scope
            .namespace_root()
            .find_path(&["alpha", "beta"])
            .expect("merged node");
        assert_eq!(node.functions_by_lower_name.len(), 2);
        // first observed casing wins for display
        assert_eq!(node.last_part_name, "Beta");
        assert_eq!(node.full_name, "Alpha.Beta");
    }

    #[test]
    fn namespaced_functions_resolve_by_full_name() {
        let a = file(
            "namespace Alpha\nsub go()\nend sub\nend namespace",
            "source/a.bs",
        );
        let scope = link_scope(&[&a]);
        assert!(scope.namespaced_callable("alpha.go").is_some());
        assert!(scope.own_callables("go").is_empty());
    }

    #[test]
    fn classes_key_by_qualified_lower_name() {
        let a = file(
            "namespace Zoo\nclass Duck\nend class\nend namespace\nclass Duck\nend class",
            "source/a.bs",
        );
        let scope = link_scope(&[&a]);
        assert_eq!(scope.classes_by_lower_fq("zoo.duck").len(), 1);
        assert_eq!(scope.classes_by_lower_fq("duck").len(), 1);
    }

    #[test]
    fn global_scope_has_builtins_and_is_validated() {
        let scope = Scope::global();
        assert!(scope.is_validated());
        assert_eq!(scope.own_callables("ucase").len(), 1);
        assert!(scope.own_callables("ucase")[0].is_builtin);
    }

    #[test]
    fn validity_flag_is_shared() {
        let scope = Scope::new("source", ScopeKind::Source, Some("global".into()));
        let flag = scope.validity_flag();
        flag.set(true);
        assert!(scope.is_validated());
        flag.set(false);
        assert!(!scope.is_validated());
    }
}
