//! The Program: the persistent shared store behind every pipeline stage.
//!
//! Owns all files, scopes, the dependency graph, and the plugin list. A
//! process may host several Programs; nothing here is global.
//!
//! Mutations are totally ordered on the calling thread: after
//! `add_or_replace_file` returns, every dependent scope is invalid (the
//! graph publishes to subscriptions holding each scope's validity flag).
//! `validate` observes the file set present when it is called.

mod paths;

pub use paths::{normalize_path, pkg_path_for};

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::diagnostics::Diagnostic;
use crate::files::{ComponentFile, File, SourceFile, pkg_path_from_uri};
use crate::graph::DependencyGraph;
use crate::plugins::{Plugin, PluginBus, PluginEvent};
use crate::preprocessor::Manifest;
use crate::scope::{Scope, ScopeFileView, ScopeKind};
use crate::transpiler::{
    TranspileContext, TranspileOptions, generate_typedef, transpile_file,
};
use crate::validator::{ProjectContext, ScopeContext, validate_project, validate_scope};

/// A `{src, dest}` file entry: an on-disk path plus the pkg-path it
/// should occupy
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub src: PathBuf,
    pub dest: String,
}

#[derive(Debug, Clone)]
pub struct ProgramOptions {
    pub root_dir: PathBuf,
    pub cwd: Option<PathBuf>,
    pub staging_folder_path: Option<PathBuf>,
    pub source_map: bool,
    pub source_root: Option<String>,
    pub emit_definitions: bool,
    pub ignore_error_codes: Vec<u32>,
    pub diagnostic_filters: Vec<u32>,
    /// Globs or explicit entries, recorded for the project loader
    pub files: Vec<String>,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            cwd: None,
            staging_folder_path: None,
            source_map: false,
            source_root: None,
            emit_definitions: false,
            ignore_error_codes: Vec::new(),
            diagnostic_filters: Vec::new(),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TranspileError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize source map for {path}")]
    SourceMap { path: PathBuf },
}

/// Synthetic graph node aggregating the implicit project scope's files
const SOURCE_SCOPE_KEY: &str = "scope:source";

pub struct Program {
    options: ProgramOptions,
    manifest: Manifest,
    /// lowercased pkg-path → file, insertion-ordered for deterministic
    /// diagnostics
    files: IndexMap<String, File>,
    scopes: IndexMap<String, Scope>,
    graph: DependencyGraph,
    plugins: PluginBus,
    /// component file key → its scope name
    component_scopes: FxHashMap<String, String>,
    project_diagnostics: Vec<Diagnostic>,
    extra_diagnostics: Vec<Diagnostic>,
    src_to_pkg: FxHashMap<PathBuf, String>,
}

impl Program {
    pub fn new(options: ProgramOptions) -> Self {
        let mut program = Self {
            options,
            manifest: Manifest::new(),
            files: IndexMap::new(),
            scopes: IndexMap::new(),
            graph: DependencyGraph::new(),
            plugins: PluginBus::new(),
            component_scopes: FxHashMap::default(),
            project_diagnostics: Vec::new(),
            extra_diagnostics: Vec::new(),
            src_to_pkg: FxHashMap::default(),
        };
        program.scopes.insert("global".into(), Scope::global());

        let mut source_scope = Scope::new("source", ScopeKind::Source, Some("global".into()));
        let flag = source_scope.validity_flag();
        let subscription = program
            .graph
            .subscribe(SOURCE_SCOPE_KEY, Box::new(move |_| flag.set(false)));
        source_scope.subscriptions.push(subscription);
        program.scopes.insert("source".into(), source_scope);
        program
            .plugins
            .emit(PluginEvent::AfterScopeCreate { scope_name: "source" });
        program
    }

    pub fn options(&self) -> &ProgramOptions {
        &self.options
    }

    /// Supply the project manifest whose keys feed `#if` predicates
    pub fn set_manifest(&mut self, manifest: Manifest) {
        self.manifest = manifest;
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.add(plugin);
    }

    // =========================================================================
    // File management
    // =========================================================================

    /// Add or replace a file by its on-disk path; the pkg-path derives
    /// from the path relative to `root_dir`.
    pub fn add_or_replace_file(&mut self, src_path: impl AsRef<Path>, contents: &str) -> String {
        let src_path = normalize_path(src_path.as_ref());
        let pkg_path = pkg_path_for(&self.options.root_dir, &src_path);
        self.add_or_replace_file_entry(
            &FileEntry {
                src: src_path,
                dest: pkg_path,
            },
            contents,
        )
    }

    /// Add or replace a file with an explicit destination pkg-path.
    /// Returns the file's graph key (lowercased pkg-path).
    pub fn add_or_replace_file_entry(&mut self, entry: &FileEntry, contents: &str) -> String {
        let pkg_path = entry.dest.replace('\\', "/");
        let key = pkg_path.to_lowercase();
        info!(pkg_path, "add or replace file");

        self.plugins
            .emit(PluginEvent::BeforeFileParse { pkg_path: &pkg_path });

        // replacing: tear down the old registration first
        if self.files.contains_key(&key) {
            self.unregister_file(&key, false);
        }

        let file = if key.ends_with(".xml") {
            File::Component(ComponentFile::new(
                entry.src.clone(),
                pkg_path.clone(),
                contents.to_string(),
            ))
        } else {
            let typedef_key = typedef_key_for(&key);
            let typedef_present = typedef_key
                .as_ref()
                .is_some_and(|t| self.files.contains_key(t));
            if typedef_present {
                File::Source(SourceFile::new_deferred(
                    entry.src.clone(),
                    pkg_path.clone(),
                    contents.to_string(),
                    typedef_key.unwrap_or_default(),
                ))
            } else {
                File::Source(SourceFile::new(
                    entry.src.clone(),
                    pkg_path.clone(),
                    contents.to_string(),
                    &self.manifest,
                ))
            }
        };

        self.src_to_pkg.insert(entry.src.clone(), key.clone());
        self.files.insert(key.clone(), file);
        self.plugins
            .emit(PluginEvent::AfterFileParse { pkg_path: &pkg_path });

        // a freshly-added typedef suppresses its sibling implementation
        if key.ends_with(".d.bs") {
            let sibling = key.replace(".d.bs", ".brs");
            if let Some(File::Source(sibling_file)) =
                self.files.get_mut(&sibling)
            {
                sibling_file.typedef_pkg_path = Some(key.clone());
            }
        }

        self.register_file(&key);
        key
    }

    /// Wire a file into the dependency graph and (for components) the
    /// scope registry
    fn register_file(&mut self, key: &str) {
        let Some(file) = self.files.get(key) else {
            return;
        };
        match file {
            File::Source(source) => {
                let deps: Vec<String> = source
                    .own_script_imports
                    .iter()
                    .map(|uri| pkg_path_from_uri(uri).to_lowercase())
                    .collect();
                self.graph.add_or_replace(key, deps);
            }
            File::Component(component) => {
                let scope_name = component
                    .scope_name()
                    .unwrap_or_else(|| key.to_string());
                let parent_scope = component.parent_name.as_ref().map(|p| p.to_lowercase());
                let mut deps: Vec<String> = component
                    .script_imports
                    .iter()
                    .map(|import| pkg_path_from_uri(&import.uri).to_lowercase())
                    .collect();
                if let Some(parent) = &parent_scope {
                    deps.push(format!("component:{parent}"));
                }
                self.graph.add_or_replace(key, deps);
                self.graph
                    .add_or_replace(&format!("component:{scope_name}"), vec![key.to_string()]);

                let mut scope = Scope::new(
                    scope_name.clone(),
                    ScopeKind::Component {
                        component_name: component.name.clone().unwrap_or_default(),
                    },
                    Some(parent_scope.unwrap_or_else(|| "global".into())),
                );
                let flag = scope.validity_flag();
                let subscription = self
                    .graph
                    .subscribe(key, Box::new(move |_| flag.set(false)));
                scope.subscriptions.push(subscription);
                self.scopes.insert(scope_name.clone(), scope);
                self.component_scopes
                    .insert(key.to_string(), scope_name.clone());
                self.plugins
                    .emit(PluginEvent::AfterScopeCreate { scope_name: &scope_name });
            }
        }
        self.refresh_source_scope_node();
    }

    /// Recompute the synthetic node whose dependents are everything in
    /// the implicit project scope
    fn refresh_source_scope_node(&mut self) {
        let deps: Vec<String> = self
            .files
            .keys()
            .filter(|k| k.starts_with("source/"))
            .cloned()
            .collect();
        self.graph.add_or_replace(SOURCE_SCOPE_KEY, deps);
    }

    /// Remove graph edges, scopes, and typedef linkage for a file about
    /// to go away. `fire` controls whether graph listeners run.
    fn unregister_file(&mut self, key: &str, fire: bool) {
        if let Some(scope_name) = self.component_scopes.remove(key) {
            if let Some(mut scope) = self.scopes.shift_remove(&scope_name) {
                for subscription in scope.subscriptions.drain(..) {
                    self.graph.unsubscribe(subscription);
                }
            }
            self.graph.remove(&format!("component:{scope_name}"));
        }
        if fire {
            self.graph.remove(key);
        }

        // a removed typedef re-exposes the implementation file, which
        // re-parses lazily on next access
        if key.ends_with(".d.bs") {
            let sibling = key.replace(".d.bs", ".brs");
            if let Some(File::Source(sibling_file)) = self.files.get_mut(&sibling) {
                if sibling_file.typedef_pkg_path.as_deref() == Some(key) {
                    sibling_file.typedef_pkg_path = None;
                }
            }
        }
    }

    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        let key = self.key_for_path(path.as_ref());
        let Some(key) = key else {
            return;
        };
        debug!(key, "remove file");
        self.unregister_file(&key, true);
        if let Some(file) = self.files.shift_remove(&key) {
            self.src_to_pkg.remove(&normalize_path(file.src_path()));
        }
        self.refresh_source_scope_node();
    }

    pub fn remove_files(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.remove_file(path);
        }
    }

    pub(crate) fn key_for_path(&self, path: &Path) -> Option<String> {
        let normalized = normalize_path(path);
        if let Some(key) = self.src_to_pkg.get(&normalized) {
            return Some(key.clone());
        }
        let as_pkg = path.to_string_lossy().replace('\\', "/").to_lowercase();
        self.files.contains_key(&as_pkg).then_some(as_pkg)
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.key_for_path(path.as_ref()).is_some()
    }

    pub fn get_file_by_path_absolute(&self, path: impl AsRef<Path>) -> Option<&File> {
        let key = self.src_to_pkg.get(&normalize_path(path.as_ref()))?;
        self.files.get(key)
    }

    pub fn get_file_by_pkg_path(&self, pkg_path: &str) -> Option<&File> {
        self.files.get(&pkg_path.to_lowercase())
    }

    pub(crate) fn source_file(&self, pkg_path: &str) -> Option<&SourceFile> {
        self.get_file_by_pkg_path(pkg_path).and_then(File::as_source)
    }

    pub(crate) fn source_file_mut(&mut self, pkg_path: &str) -> Option<&mut SourceFile> {
        self.files
            .get_mut(&pkg_path.to_lowercase())
            .and_then(File::as_source_mut)
    }

    pub(crate) fn all_files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub(crate) fn file_keys(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    pub fn get_scope_by_name(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(&name.to_lowercase())
    }

    pub fn get_component_scope(&self, component_name: &str) -> Option<&Scope> {
        self.scopes.get(&component_name.to_lowercase())
    }

    /// The ancestor chain starting at (and excluding) the named scope:
    /// nearest parent first, global last
    pub(crate) fn ancestor_chain(&self, scope: &Scope) -> Vec<&Scope> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut parent_name = scope.parent_name.clone();
        seen.insert(scope.name.clone());
        while let Some(name) = parent_name {
            if !seen.insert(name.clone()) {
                break;
            }
            match self.scopes.get(&name) {
                Some(parent) => {
                    chain.push(parent);
                    parent_name = parent.parent_name.clone();
                }
                None => {
                    // unresolved component parents fall back to global
                    if let Some(global) = self.scopes.get("global") {
                        chain.push(global);
                    }
                    break;
                }
            }
        }
        if !chain.iter().any(|s| s.kind == ScopeKind::Global) {
            if let Some(global) = self.scopes.get("global") {
                chain.push(global);
            }
        }
        chain
    }

    /// Member file keys of a scope (own files, ancestors excluded)
    pub(crate) fn scope_member_keys(&self, scope: &Scope) -> Vec<String> {
        match &scope.kind {
            ScopeKind::Global => Vec::new(),
            ScopeKind::Source => {
                let roots: Vec<String> = self
                    .files
                    .keys()
                    .filter(|k| k.starts_with("source/") && !k.ends_with(".xml"))
                    .cloned()
                    .collect();
                self.reachable_files(roots)
            }
            ScopeKind::Component { .. } => {
                let Some(component_key) = self
                    .component_scopes
                    .iter()
                    .find(|(_, name)| **name == scope.name)
                    .map(|(key, _)| key.clone())
                else {
                    return Vec::new();
                };
                let roots: Vec<String> = self
                    .graph
                    .dependencies_of(&component_key)
                    .map(|deps| {
                        deps.iter()
                            .filter(|d| !d.starts_with("component:"))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                self.reachable_files(roots)
            }
        }
    }

    /// BFS over import edges, limited to files that exist; typedefs of
    /// member implementation files join automatically
    fn reachable_files(&self, roots: Vec<String>) -> Vec<String> {
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut queue: std::collections::VecDeque<String> = roots.into();
        let mut result = Vec::new();
        while let Some(key) = queue.pop_front() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let Some(file) = self.files.get(&key) else {
                continue;
            };
            result.push(key.clone());
            if let File::Source(source) = file {
                if let Some(typedef) = &source.typedef_pkg_path {
                    queue.push_back(typedef.to_lowercase());
                }
            }
            if let Some(deps) = self.graph.dependencies_of(&key) {
                for dep in deps {
                    if !dep.starts_with("component:") && !dep.starts_with("scope:") {
                        queue.push_back(dep.clone());
                    }
                }
            }
        }
        result
    }

    /// Every scope whose member files include the given file
    pub fn get_scopes_for_file(&self, path: impl AsRef<Path>) -> Vec<&Scope> {
        let Some(key) = self.key_for_path(path.as_ref()) else {
            return Vec::new();
        };
        self.scopes
            .values()
            .filter(|scope| {
                scope.kind != ScopeKind::Global
                    && self.scope_member_keys(scope).contains(&key)
            })
            .collect()
    }

    pub(crate) fn scopes_containing_pkg(&self, pkg_path: &str) -> Vec<&Scope> {
        let key = pkg_path.to_lowercase();
        self.scopes
            .values()
            .filter(|scope| {
                scope.kind != ScopeKind::Global
                    && self.scope_member_keys(scope).contains(&key)
            })
            .collect()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn ensure_all_parsed(&mut self) {
        let manifest = self.manifest.clone();
        for file in self.files.values_mut() {
            if let File::Source(source) = file {
                if !source.is_parsed() && !source.has_typedef() {
                    source.ensure_parsed(&manifest);
                }
            }
        }
    }

    /// Depth in the scope parent chain (global = 0)
    fn scope_depth(&self, scope: &Scope) -> usize {
        self.ancestor_chain(scope).len()
    }

    pub fn validate(&mut self) {
        self.plugins.emit(PluginEvent::BeforeProgramValidate);
        self.ensure_all_parsed();

        let mut invalid: Vec<(usize, String)> = self
            .scopes
            .values()
            .filter(|s| !s.is_validated())
            .map(|s| (self.scope_depth(s), s.name.clone()))
            .collect();
        invalid.sort();

        for (_, scope_name) in invalid {
            self.plugins.emit(PluginEvent::BeforeScopeValidate {
                scope_name: &scope_name,
            });
            let Some(mut scope) = self.scopes.shift_remove(&scope_name) else {
                continue;
            };

            let member_keys = self.scope_member_keys(&scope);
            let mut views = Vec::new();
            let mut member_files = Vec::new();
            for key in &member_keys {
                let Some(File::Source(source)) = self.files.get(key) else {
                    continue;
                };
                // the typedef supplies the visible surface of its sibling
                if source.has_typedef() {
                    continue;
                }
                if let Some(references) = source.references() {
                    views.push(ScopeFileView {
                        pkg_path: &source.pkg_path,
                        references,
                    });
                    member_files.push(source);
                }
            }
            scope.link(&views);
            drop(views);

            let diagnostics = {
                let ctx = ScopeContext {
                    scope: &scope,
                    ancestors: self.ancestor_chain(&scope),
                    files: member_files,
                };
                validate_scope(&ctx)
            };
            scope.diagnostics = diagnostics;
            scope.mark_validated();
            self.scopes.insert(scope_name.clone(), scope);

            self.plugins.emit(PluginEvent::AfterScopeValidate {
                scope_name: &scope_name,
            });
            for key in &member_keys {
                if let Some(file) = self.files.get(key) {
                    self.plugins.emit(PluginEvent::AfterFileValidate {
                        pkg_path: file.pkg_path(),
                    });
                }
            }
        }

        // project-wide checks
        let ctx = ProjectContext {
            components: self
                .files
                .values()
                .filter_map(File::as_component)
                .collect(),
            source_files: self.files.values().filter_map(File::as_source).collect(),
            pkg_paths: self
                .files
                .values()
                .map(|f| (f.pkg_path().to_lowercase(), f.pkg_path().to_string()))
                .collect(),
        };
        self.project_diagnostics = validate_project(&ctx);

        self.plugins.emit(PluginEvent::AfterProgramValidate);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub fn add_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) {
        self.extra_diagnostics.extend(diagnostics);
    }

    /// All diagnostics, after comment-flag suppression and project-level
    /// filters
    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        let mut all: Vec<Diagnostic> = Vec::new();
        for file in self.files.values() {
            match file {
                File::Source(source) => all.extend(source.diagnostics().iter().cloned()),
                File::Component(component) => {
                    all.extend(component.diagnostics().iter().cloned())
                }
            }
        }
        for scope in self.scopes.values() {
            all.extend(scope.diagnostics.iter().cloned());
        }
        all.extend(self.project_diagnostics.iter().cloned());
        all.extend(self.extra_diagnostics.iter().cloned());

        let mut seen = FxHashSet::default();
        all.retain(|diagnostic| {
            if self.options.ignore_error_codes.contains(&diagnostic.code)
                || self.options.diagnostic_filters.contains(&diagnostic.code)
            {
                return false;
            }
            if let Some(pkg) = &diagnostic.file_pkg_path {
                // diagnostics for removed files disappear with the file
                if !self.files.contains_key(&pkg.to_lowercase()) {
                    return false;
                }
                if let Some(source) = self.source_file(pkg) {
                    if source
                        .comment_flags
                        .iter()
                        .any(|flag| flag.suppresses(diagnostic))
                    {
                        return false;
                    }
                }
            }
            seen.insert((
                diagnostic.code,
                diagnostic.file_pkg_path.clone(),
                diagnostic.range,
                diagnostic.message.clone(),
            ))
        });
        all
    }

    // =========================================================================
    // Transpile
    // =========================================================================

    fn build_transpile_context(&self) -> TranspileContext {
        let mut ctx = TranspileContext::default();
        for file in self.files.values() {
            let Some(source) = file.as_source() else {
                continue;
            };
            let Some(references) = source.references() else {
                continue;
            };
            for function in &references.function_statements {
                if let Some(namespace) = &function.namespace_name {
                    ctx.namespace_functions
                        .insert(format!("{namespace}.{}", function.name).to_lowercase());
                }
            }
            for class in &references.class_statements {
                ctx.classes
                    .insert(class.qualified_lower_name(), class.clone());
            }
        }
        ctx
    }

    /// Lower every file into `out_dir`, returning the paths written
    pub fn transpile(&mut self, out_dir: &Path) -> Result<Vec<PathBuf>, TranspileError> {
        let keys: Vec<String> = self.files.keys().cloned().collect();
        self.transpile_entries(&keys, out_dir)
    }

    /// Lower a subset of files (by pkg-path) into `out_dir`
    pub fn transpile_entries(
        &mut self,
        entries: &[String],
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, TranspileError> {
        // typedef'd implementations still lower, so everything must be
        // parsed now
        let manifest = self.manifest.clone();
        for file in self.files.values_mut() {
            if let File::Source(source) = file {
                source.ensure_parsed(&manifest);
            }
        }

        let ctx = self.build_transpile_context();
        let options = TranspileOptions {
            source_map: self.options.source_map,
            source_root: self.options.source_root.clone(),
        };

        let mut written = Vec::new();
        for key in entries {
            let Some(file) = self.files.get(&key.to_lowercase()) else {
                continue;
            };
            match file {
                File::Component(component) => {
                    let out_path = out_dir.join(&component.pkg_path);
                    write_output(&out_path, component.source())?;
                    written.push(out_path);
                }
                File::Source(source) => {
                    if source.extension == "d.bs" {
                        continue;
                    }
                    let out_pkg = if source.extension == "bs" {
                        source.pkg_path.replace(".bs", ".brs")
                    } else {
                        source.pkg_path.clone()
                    };
                    let out_path = out_dir.join(&out_pkg);
                    if source.extension == "bs" || source.needs_transpile {
                        let result = transpile_file(source, &ctx, &options);
                        write_output(&out_path, &result.code)?;
                        if let Some(map) = result.source_map {
                            let map_path = out_dir.join(format!("{out_pkg}.map"));
                            write_output(&map_path, &map)?;
                            written.push(map_path);
                        }
                    } else {
                        write_output(&out_path, source.source())?;
                    }
                    written.push(out_path);

                    if self.options.emit_definitions && source.extension == "bs" {
                        let typedef = generate_typedef(source);
                        let typedef_path =
                            out_dir.join(source.pkg_path.replace(".bs", ".d.bs"));
                        write_output(&typedef_path, &typedef)?;
                        written.push(typedef_path);
                    }
                }
            }
        }
        Ok(written)
    }

    /// Release every owned resource. Equivalent to dropping the Program.
    pub fn dispose(&mut self) {
        let scope_names: Vec<String> = self.scopes.keys().cloned().collect();
        for name in scope_names {
            if let Some(mut scope) = self.scopes.shift_remove(&name) {
                for subscription in scope.subscriptions.drain(..) {
                    self.graph.unsubscribe(subscription);
                }
            }
        }
        self.files.clear();
        self.component_scopes.clear();
        self.src_to_pkg.clear();
        self.project_diagnostics.clear();
        self.extra_diagnostics.clear();
    }
}

fn typedef_key_for(key: &str) -> Option<String> {
    key.ends_with(".brs")
        .then(|| key.replace(".brs", ".d.bs"))
}

fn write_output(path: &Path, contents: &str) -> Result<(), TranspileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| TranspileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| TranspileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
