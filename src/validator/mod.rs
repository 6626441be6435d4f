//! Scope-level and project-level validation passes.
//!
//! Every check is a pure function of the linked scope state, so running
//! validation twice without intervening mutation produces identical
//! diagnostic lists.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::diagnostics::{Diagnostic, messages, whole_file_range};
use crate::files::{ComponentFile, SourceFile, pkg_path_from_uri};
use crate::parser::{ClassMemberDecl, MemberKind, References};
use crate::scope::{Callable, ClassInfo, Scope, ScopeKind, is_lifecycle_method};
use crate::types::TypeKind;

/// Everything scope validation needs: the scope, its ancestor chain
/// (nearest first, global last), and the member source files whose call
/// sites are checked.
pub struct ScopeContext<'a> {
    pub scope: &'a Scope,
    pub ancestors: Vec<&'a Scope>,
    pub files: Vec<&'a SourceFile>,
}

impl ScopeContext<'_> {
    /// Bare-name callable lookup with child-shadows-ancestor semantics
    fn resolve_bare_callable(&self, lower: &str) -> Option<&Callable> {
        if let Some(callable) = self.scope.own_callables(lower).first() {
            return Some(callable);
        }
        for ancestor in &self.ancestors {
            if let Some(callable) = ancestor.own_callables(lower).first() {
                return Some(callable);
            }
        }
        None
    }

    fn resolve_namespaced_callable(&self, lower_full: &str) -> Option<&Callable> {
        if let Some(callable) = self.scope.namespaced_callable(lower_full) {
            return Some(callable);
        }
        for ancestor in &self.ancestors {
            if let Some(callable) = ancestor.namespaced_callable(lower_full) {
                return Some(callable);
            }
        }
        None
    }

    /// Is this dotted path's first segment a namespace anywhere in the
    /// scope chain (absolute, or relative to the given namespace)?
    fn first_part_is_namespace(&self, first_lower: &str, namespace: Option<&str>) -> bool {
        let mut candidates = vec![first_lower.to_string()];
        if let Some(ns) = namespace {
            let mut prefix = ns.to_lowercase();
            loop {
                candidates.push(format!("{prefix}.{first_lower}"));
                match prefix.rfind('.') {
                    Some(i) => prefix.truncate(i),
                    None => break,
                }
            }
        }
        let scopes = std::iter::once(self.scope).chain(self.ancestors.iter().copied());
        for scope in scopes {
            for candidate in &candidates {
                let parts: Vec<&str> = candidate.split('.').collect();
                if scope.namespace_root().find_path(&parts).is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// Classes visible from this scope, nearer scopes shadowing farther
    fn visible_classes(&self) -> FxHashMap<String, ClassInfo> {
        let mut visible = FxHashMap::default();
        for ancestor in self.ancestors.iter().rev() {
            for class in ancestor.all_classes() {
                visible.insert(class.qualified_lower_name(), class.clone());
            }
        }
        for class in self.scope.all_classes() {
            visible.insert(class.qualified_lower_name(), class.clone());
        }
        visible
    }
}

/// Run every scope-level check, returning the diagnostics for this pass
pub fn validate_scope(ctx: &ScopeContext<'_>) -> Vec<Diagnostic> {
    debug!(scope = %ctx.scope.name, "validating scope");
    let mut diagnostics = Vec::new();
    check_duplicate_callables(ctx, &mut diagnostics);
    check_builtin_shadowing(ctx, &mut diagnostics);
    check_ancestor_overrides(ctx, &mut diagnostics);
    let visible_classes = ctx.visible_classes();
    check_classes(ctx, &visible_classes, &mut diagnostics);
    for file in &ctx.files {
        if let Some(references) = file.references() {
            check_calls(ctx, file, references, &mut diagnostics);
            check_new_expressions(ctx, &visible_classes, file, references, &mut diagnostics);
            check_local_var_shadowing(ctx, file, references, &mut diagnostics);
        }
    }
    diagnostics
}

// ============================================================================
// Callable checks
// ============================================================================

/// Two non-namespaced functions with the same lowercase name in one scope
fn check_duplicate_callables(ctx: &ScopeContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
    for (_, bucket) in ctx.scope.callable_buckets() {
        if bucket.len() > 1 {
            for callable in bucket {
                diagnostics.push(
                    messages::duplicate_function_implementation(
                        &callable.name,
                        &ctx.scope.name,
                        callable.name_range,
                    )
                    .in_file(&callable.file_pkg_path),
                );
            }
        }
    }
}

fn check_builtin_shadowing(ctx: &ScopeContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let Some(global) = ctx.ancestors.iter().find(|s| s.kind == ScopeKind::Global) else {
        return;
    };
    for (lower, bucket) in ctx.scope.callable_buckets() {
        if global.own_callables(lower).is_empty() {
            continue;
        }
        for callable in bucket {
            diagnostics.push(
                messages::scope_function_shadowed_by_built_in_function(callable.name_range)
                    .in_file(&callable.file_pkg_path),
            );
        }
    }
}

/// A component callable that shadows an ancestor (non-global) callable of
/// the same name — informational, lifecycle methods exempt
fn check_ancestor_overrides(ctx: &ScopeContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
    if !matches!(ctx.scope.kind, ScopeKind::Component { .. }) {
        return;
    }
    for (lower, bucket) in ctx.scope.callable_buckets() {
        if is_lifecycle_method(lower) {
            continue;
        }
        let shadowed = ctx
            .ancestors
            .iter()
            .filter(|a| a.kind != ScopeKind::Global)
            .find(|a| !a.own_callables(lower).is_empty());
        if let Some(ancestor) = shadowed {
            for callable in bucket {
                diagnostics.push(
                    messages::overrides_ancestor_function(
                        &callable.name,
                        &ancestor.name,
                        callable.name_range,
                    )
                    .in_file(&callable.file_pkg_path),
                );
            }
        }
    }
}

// ============================================================================
// Class checks
// ============================================================================

/// Unqualified references resolve through the enclosing namespace, its
/// ancestor prefixes, then top level; qualified references are literal
fn resolve_class<'v>(
    visible: &'v FxHashMap<String, ClassInfo>,
    name: &str,
    namespace: Option<&str>,
) -> Option<&'v ClassInfo> {
    let lower = name.to_lowercase();
    if !lower.contains('.') {
        if let Some(ns) = namespace {
            let mut prefix = ns.to_lowercase();
            loop {
                if let Some(class) = visible.get(&format!("{prefix}.{lower}")) {
                    return Some(class);
                }
                match prefix.rfind('.') {
                    Some(i) => prefix.truncate(i),
                    None => break,
                }
            }
        }
    }
    visible.get(&lower)
}

/// The ancestor chain of a class (parents only, cycle-safe)
fn class_ancestors<'v>(
    visible: &'v FxHashMap<String, ClassInfo>,
    class: &ClassInfo,
) -> Vec<&'v ClassInfo> {
    let mut chain = Vec::new();
    let mut seen = FxHashSet::default();
    seen.insert(class.qualified_lower_name());
    let mut current = class.clone();
    while let Some(parent_name) = current.decl.parent_name.clone() {
        let Some(parent) = resolve_class(
            visible,
            &parent_name,
            current.decl.namespace_name.as_deref(),
        ) else {
            break;
        };
        if !seen.insert(parent.qualified_lower_name()) {
            break;
        }
        chain.push(parent);
        current = parent.clone();
    }
    chain
}

fn find_ancestor_member<'v>(
    ancestors: &[&'v ClassInfo],
    lower_name: &str,
) -> Option<(&'v ClassInfo, &'v ClassMemberDecl)> {
    for ancestor in ancestors {
        if let Some(member) = ancestor
            .decl
            .members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(lower_name))
        {
            return Some((ancestor, member));
        }
    }
    None
}

fn check_classes(
    ctx: &ScopeContext<'_>,
    visible: &FxHashMap<String, ClassInfo>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // duplicate declarations per scope
    for (_, bucket) in ctx.scope.class_buckets() {
        if bucket.len() > 1 {
            for class in bucket.iter().skip(1) {
                diagnostics.push(
                    messages::duplicate_class_declaration(
                        &ctx.scope.name,
                        &class.decl.name,
                        class.decl.name_range,
                    )
                    .in_file(&class.file_pkg_path),
                );
            }
        }
    }

    for class in ctx.scope.all_classes() {
        let namespace = class.decl.namespace_name.as_deref();

        // namespaced simple name colliding with a top-level class
        if let Some(ns) = namespace {
            if visible.contains_key(&class.decl.name.to_lowercase()) {
                diagnostics.push(
                    messages::namespaced_class_cannot_share_name_with_non_namespaced_class(
                        &format!("{}.{}", ns, class.decl.name),
                        class.decl.name_range,
                    )
                    .in_file(&class.file_pkg_path),
                );
            }
        }

        // extends target must resolve
        if let Some(parent_name) = &class.decl.parent_name {
            if resolve_class(visible, parent_name, namespace).is_none() {
                let range = class.decl.parent_name_range.unwrap_or(class.decl.name_range);
                diagnostics.push(
                    messages::class_could_not_be_found(parent_name, &ctx.scope.name, range)
                        .in_file(&class.file_pkg_path),
                );
            }
        }

        let ancestors = class_ancestors(visible, class);

        // duplicate member names
        let mut seen_members: FxHashMap<String, ()> = FxHashMap::default();
        for member in &class.decl.members {
            if seen_members.insert(member.name.to_lowercase(), ()).is_some() {
                diagnostics.push(
                    messages::duplicate_class_member(
                        &class.decl.name,
                        &member.name,
                        member.name_range,
                    )
                    .in_file(&class.file_pkg_path),
                );
            }
        }

        // override policy and member-kind mismatches
        for member in &class.decl.members {
            let ancestor_member = find_ancestor_member(&ancestors, &member.name);
            match ancestor_member {
                Some((ancestor_class, ancestor_member)) => {
                    if ancestor_member.kind != member.kind {
                        diagnostics.push(
                            messages::class_child_member_different_member_type_than_ancestor(
                                member.kind.as_str(),
                                ancestor_member.kind.as_str(),
                                &ancestor_class.decl.name,
                                member.name_range,
                            )
                            .in_file(&class.file_pkg_path),
                        );
                    } else if member.kind == MemberKind::Method
                        && !member.is_override
                        && !is_lifecycle_method(&member.name)
                    {
                        diagnostics.push(
                            messages::missing_override_keyword(
                                &ancestor_class.decl.name,
                                member.name_range,
                            )
                            .in_file(&class.file_pkg_path),
                        );
                    }
                }
                None => {
                    if member.is_override {
                        diagnostics.push(
                            messages::override_without_parent_member(
                                &member.name,
                                member.name_range,
                            )
                            .in_file(&class.file_pkg_path),
                        );
                    }
                }
            }
        }

        // a child constructor must chain when any ancestor declares one
        if class.decl.has_constructor && !class.decl.constructor_calls_super {
            let ancestor_has_constructor =
                ancestors.iter().any(|a| a.decl.has_constructor);
            if ancestor_has_constructor {
                let range = class
                    .decl
                    .members
                    .iter()
                    .find(|m| m.name.eq_ignore_ascii_case("new"))
                    .map(|m| m.name_range)
                    .unwrap_or(class.decl.name_range);
                diagnostics.push(
                    messages::class_constructor_missing_super_call(range)
                        .in_file(&class.file_pkg_path),
                );
            }
        }
    }
}

/// `new` targets must resolve, and constructor arity must match
fn check_new_expressions(
    ctx: &ScopeContext<'_>,
    visible: &FxHashMap<String, ClassInfo>,
    file: &SourceFile,
    references: &References,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for new_info in &file.new_expressions {
        let namespace = namespace_of_function(references, new_info.function_id);
        let Some(class) = resolve_class(visible, &new_info.class_name, namespace.as_deref())
        else {
            diagnostics.push(
                messages::class_could_not_be_found(
                    &new_info.class_name,
                    &ctx.scope.name,
                    new_info.class_name_range,
                )
                .in_file(&file.pkg_path),
            );
            continue;
        };

        let Some(constructor) = class
            .decl
            .members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case("new"))
        else {
            continue;
        };
        let max = constructor.params.len();
        let min = constructor
            .params
            .iter()
            .take_while(|p| !p.is_optional)
            .count();
        let got = new_info.args.len();
        if got < min || got > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min}-{max}")
            };
            diagnostics.push(
                messages::mismatch_argument_count(&expected, got, new_info.range)
                    .in_file(&file.pkg_path),
            );
        }
    }
}

// ============================================================================
// Call-site checks
// ============================================================================

fn namespace_of_function(references: &References, function_id: Option<u32>) -> Option<String> {
    let function_id = function_id?;
    if let Some(decl) = references
        .function_statements
        .iter()
        .find(|f| f.func_id == function_id)
    {
        return decl.namespace_name.clone();
    }
    // class methods inherit the class's namespace
    for class in &references.class_statements {
        for member in &class.members {
            if member.func_id == Some(function_id) {
                return class.namespace_name.clone();
            }
        }
    }
    None
}

fn has_local_var(references: &References, function_id: Option<u32>, lower: &str) -> bool {
    let Some(function_id) = function_id else {
        return false;
    };
    references
        .local_vars
        .get(&function_id)
        .is_some_and(|vars| vars.iter().any(|v| v.name.eq_ignore_ascii_case(lower)))
}

fn check_calls(
    ctx: &ScopeContext<'_>,
    file: &SourceFile,
    references: &References,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for call in &file.function_calls {
        let lower = call.name.to_lowercase();
        let namespace = namespace_of_function(references, call.function_id);

        let resolved: Option<&Callable> = if lower.contains('.') {
            let mut candidates = vec![lower.clone()];
            if let Some(ns) = &namespace {
                let mut prefix = ns.to_lowercase();
                loop {
                    candidates.push(format!("{prefix}.{lower}"));
                    match prefix.rfind('.') {
                        Some(i) => prefix.truncate(i),
                        None => break,
                    }
                }
            }
            let found = candidates
                .iter()
                .find_map(|c| ctx.resolve_namespaced_callable(c));
            if found.is_none() {
                let first = lower.split('.').next().unwrap_or_default();
                if has_local_var(references, call.function_id, first)
                    || !ctx.first_part_is_namespace(first, namespace.as_deref())
                {
                    // property access on a value; not ours to judge
                    continue;
                }
                diagnostics.push(
                    messages::call_to_unknown_function(&call.name, &ctx.scope.name, call.name_range)
                        .in_file(&file.pkg_path),
                );
                continue;
            }
            found
        } else {
            if lower == "super" || has_local_var(references, call.function_id, &lower) {
                continue;
            }
            let bare = ctx.resolve_bare_callable(&lower);
            let found = bare.or_else(|| {
                namespace.as_ref().and_then(|ns| {
                    let mut prefix = ns.to_lowercase();
                    loop {
                        if let Some(callable) =
                            ctx.resolve_namespaced_callable(&format!("{prefix}.{lower}"))
                        {
                            return Some(callable);
                        }
                        match prefix.rfind('.') {
                            Some(i) => prefix.truncate(i),
                            None => return None,
                        }
                    }
                })
            });
            if found.is_none() {
                diagnostics.push(
                    messages::call_to_unknown_function(&call.name, &ctx.scope.name, call.name_range)
                        .in_file(&file.pkg_path),
                );
                continue;
            }
            found
        };

        if let Some(callable) = resolved {
            let (min, max) = callable.arg_count_range();
            let got = call.args.len();
            if got < min || got > max {
                let expected = if min == max {
                    min.to_string()
                } else if max == usize::MAX {
                    format!("{min}+")
                } else {
                    format!("{min}-{max}")
                };
                diagnostics.push(
                    messages::mismatch_argument_count(&expected, got, call.range)
                        .in_file(&file.pkg_path),
                );
            }
        }
    }
}

// ============================================================================
// Local-variable shadowing
// ============================================================================

fn check_local_var_shadowing(
    ctx: &ScopeContext<'_>,
    file: &SourceFile,
    references: &References,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(global) = ctx.ancestors.iter().find(|s| s.kind == ScopeKind::Global) else {
        return;
    };
    for vars in references.local_vars.values() {
        for var in vars {
            let lower = var.name.to_lowercase();
            if !ctx.scope.own_callables(&lower).is_empty() {
                diagnostics.push(
                    messages::local_var_shadowed_by_scoped_function(var.name_range)
                        .in_file(&file.pkg_path),
                );
            } else if var.type_kind == TypeKind::Function
                && !global.own_callables(&lower).is_empty()
            {
                diagnostics.push(
                    messages::local_var_function_shadows_parent_function(
                        "stdlib",
                        var.name_range,
                    )
                    .in_file(&file.pkg_path),
                );
            }
        }
    }
}

// ============================================================================
// Project-level checks
// ============================================================================

/// Project-wide context: everything that is not scoped to one scope
pub struct ProjectContext<'a> {
    pub components: Vec<&'a ComponentFile>,
    pub source_files: Vec<&'a SourceFile>,
    /// lowercase pkg-path → original-cased pkg-path, for every file
    pub pkg_paths: FxHashMap<String, String>,
}

pub fn validate_project(ctx: &ProjectContext<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_duplicate_components(ctx, &mut diagnostics);
    check_script_imports(ctx, &mut diagnostics);
    check_unreferenced_files(ctx, &mut diagnostics);
    diagnostics
}

fn check_duplicate_components(ctx: &ProjectContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let mut by_name: FxHashMap<String, Vec<&ComponentFile>> = FxHashMap::default();
    for component in &ctx.components {
        if let Some(name) = &component.name {
            by_name
                .entry(name.to_lowercase())
                .or_default()
                .push(component);
        }
    }
    for (_, bucket) in by_name {
        if bucket.len() > 1 {
            for component in bucket {
                let name = component.name.clone().unwrap_or_default();
                diagnostics.push(
                    messages::duplicate_component_name(&name, component.name_range)
                        .in_file(&component.pkg_path),
                );
            }
        }
    }
}

fn check_script_imports(ctx: &ProjectContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let components_by_name: FxHashMap<String, &ComponentFile> = ctx
        .components
        .iter()
        .filter_map(|c| c.scope_name().map(|n| (n, *c)))
        .collect();

    for component in &ctx.components {
        // ancestors, nearest first, cycle-safe
        let mut ancestors = Vec::new();
        let mut seen = FxHashSet::default();
        let mut parent = component.parent_name.clone();
        while let Some(parent_name) = parent {
            let lower = parent_name.to_lowercase();
            if !seen.insert(lower.clone()) {
                break;
            }
            match components_by_name.get(&lower) {
                Some(ancestor) => {
                    ancestors.push(*ancestor);
                    parent = ancestor.parent_name.clone();
                }
                None => break,
            }
        }

        for import in &component.script_imports {
            check_import_target(ctx, &import.uri, import.uri_range, &component.pkg_path, diagnostics);

            // already imported by an ancestor component
            let lower_uri = import.uri.to_lowercase();
            if let Some(ancestor) = ancestors.iter().find(|a| {
                a.script_imports
                    .iter()
                    .any(|i| i.uri.to_lowercase() == lower_uri)
            }) {
                let ancestor_name = ancestor.name.clone().unwrap_or_default();
                diagnostics.push(
                    messages::unnecessary_script_import_in_child_from_parent(
                        &ancestor_name,
                        import.uri_range,
                    )
                    .in_file(&component.pkg_path),
                );
            }
        }
    }

    for file in &ctx.source_files {
        if let Some(references) = file.references() {
            for import in &references.import_statements {
                check_import_target(
                    ctx,
                    &import.path,
                    import.path_range,
                    &file.pkg_path,
                    diagnostics,
                );
            }
        }
    }
}

fn check_import_target(
    ctx: &ProjectContext<'_>,
    uri: &str,
    range: crate::base::Range,
    importer_pkg_path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let target = pkg_path_from_uri(uri);
    let lower = target.to_lowercase();
    match ctx.pkg_paths.get(&lower) {
        None => {
            diagnostics.push(
                messages::referenced_file_does_not_exist(uri, range).in_file(importer_pkg_path),
            );
        }
        Some(actual) if actual != &target => {
            diagnostics.push(
                messages::script_import_case_mismatch(actual, range).in_file(importer_pkg_path),
            );
        }
        Some(_) => {}
    }
}

/// Files outside `source/` that nothing imports
fn check_unreferenced_files(ctx: &ProjectContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
    let mut referenced: FxHashSet<String> = FxHashSet::default();
    for component in &ctx.components {
        for import in &component.script_imports {
            referenced.insert(pkg_path_from_uri(&import.uri).to_lowercase());
        }
    }
    for file in &ctx.source_files {
        for import in &file.own_script_imports {
            referenced.insert(pkg_path_from_uri(import).to_lowercase());
        }
        if let Some(typedef) = &file.typedef_pkg_path {
            referenced.insert(typedef.to_lowercase());
        }
    }

    for file in &ctx.source_files {
        let lower = file.pkg_path.to_lowercase();
        if lower.starts_with("source/") || referenced.contains(&lower) {
            continue;
        }
        diagnostics.push(
            messages::file_not_referenced_by_any_other_file(whole_file_range())
                .in_file(&file.pkg_path),
        );
    }
}
