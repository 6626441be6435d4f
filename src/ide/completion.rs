//! Code completion.
//!
//! Context decides the candidate set: nothing inside comments, file
//! paths inside `pkg:` strings, namespace children or property names
//! right of a dot, class names after `new`, and otherwise local
//! variables, scope callables, namespace roots, `m`, and keywords.
//! Results de-duplicate by lowercase label.

use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use crate::base::Position;
use crate::program::Program;
use crate::scope::Scope;

use super::{enclosing_function_id, is_cancelled};

/// Keywords offered in open code positions
const KEYWORDS: &[&str] = &[
    "and", "as", "class", "dim", "each", "else", "else if", "end", "end class", "end for",
    "end function", "end if", "end namespace", "end sub", "end try", "end while", "exit for",
    "exit while", "false", "for", "for each", "function", "goto", "if", "import", "in", "invalid",
    "library", "mod", "namespace", "new", "not", "or", "print", "private", "protected", "public",
    "return", "step", "stop", "sub", "then", "throw", "to", "true", "try", "while",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    LocalVariable,
    Callable,
    Namespace,
    Class,
    Property,
    Keyword,
    File,
}

#[derive(Debug, Clone)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
}

enum LineContext {
    Comment,
    InString(String),
    Code,
}

/// Classify the cursor position by scanning the line's prefix
fn line_context(line: &str, cursor: usize) -> LineContext {
    let mut in_string = false;
    let mut string_start = 0;
    for (index, ch) in line.char_indices() {
        if index >= cursor {
            break;
        }
        if in_string {
            if ch == '"' {
                in_string = false;
            }
        } else {
            match ch {
                '"' => {
                    in_string = true;
                    string_start = index + ch.len_utf8();
                }
                '\'' => return LineContext::Comment,
                _ => {}
            }
        }
    }
    if in_string {
        LineContext::InString(line[string_start..cursor].to_string())
    } else {
        LineContext::Code
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Strip the partially-typed word at the end of the prefix
fn strip_partial_word(prefix: &str) -> &str {
    let end = prefix
        .rfind(|c: char| !is_ident_char(c))
        .map(|i| i + 1)
        .unwrap_or(0);
    &prefix[..end]
}

/// The dotted chain ending right before the cursor (`alpha.beta.` →
/// `["alpha", "beta"]`)
fn dotted_chain(stripped: &str) -> Option<Vec<String>> {
    let stripped = stripped.strip_suffix('.')?;
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in stripped.chars().rev() {
        if is_ident_char(ch) {
            current.insert(0, ch);
        } else if ch == '.' {
            if current.is_empty() {
                return None;
            }
            parts.insert(0, std::mem::take(&mut current));
        } else {
            break;
        }
    }
    if current.is_empty() {
        return None;
    }
    parts.insert(0, current);
    Some(parts)
}

fn is_after_new(stripped: &str) -> bool {
    let trimmed = stripped.trim_end();
    let Some(before) = trimmed.strip_suffix("new").or_else(|| {
        let lower = trimmed.to_lowercase();
        lower
            .ends_with("new")
            .then(|| &trimmed[..trimmed.len() - 3])
    }) else {
        return false;
    };
    before
        .chars()
        .next_back()
        .map(|c| !is_ident_char(c))
        .unwrap_or(true)
}

struct ItemSink {
    items: Vec<CompletionItem>,
    seen: FxHashMap<String, ()>,
}

impl ItemSink {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: FxHashMap::default(),
        }
    }

    fn push(&mut self, label: String, kind: CompletionKind, detail: Option<String>) {
        if self.seen.insert(label.to_lowercase(), ()).is_none() {
            self.items.push(CompletionItem {
                label,
                kind,
                detail,
            });
        }
    }
}

pub fn completions(
    program: &Program,
    pkg_path: &str,
    position: Position,
    cancel: Option<&CancellationToken>,
) -> Vec<CompletionItem> {
    let Some(file) = program.source_file(pkg_path) else {
        return Vec::new();
    };
    let line = file
        .source()
        .lines()
        .nth(position.line as usize)
        .unwrap_or("");
    let cursor = (position.column as usize).min(line.len());

    match line_context(line, cursor) {
        LineContext::Comment => Vec::new(),
        LineContext::InString(content) => {
            if content.starts_with("pkg:") || content.starts_with("libpkg:") {
                let mut sink = ItemSink::new();
                for other in program.all_files() {
                    sink.push(
                        format!("pkg:/{}", other.pkg_path()),
                        CompletionKind::File,
                        None,
                    );
                }
                sink.items
            } else {
                Vec::new()
            }
        }
        LineContext::Code => {
            let stripped = strip_partial_word(&line[..cursor]);
            let scopes = program.scopes_containing_pkg(pkg_path);

            if let Some(chain) = dotted_chain(stripped) {
                return dot_completions(program, pkg_path, &scopes, &chain, cancel);
            }
            if is_after_new(stripped) {
                return class_completions(program, &scopes, cancel);
            }
            open_completions(program, pkg_path, &scopes, position, cancel)
        }
    }
}

/// Right of a dot: namespace children when the chain is a namespace,
/// property names otherwise
fn dot_completions(
    program: &Program,
    _pkg_path: &str,
    scopes: &[&Scope],
    chain: &[String],
    cancel: Option<&CancellationToken>,
) -> Vec<CompletionItem> {
    let parts: Vec<&str> = chain.iter().map(String::as_str).collect();
    let mut sink = ItemSink::new();
    let mut found_namespace = false;

    for scope in scopes {
        if is_cancelled(cancel) {
            return sink.items;
        }
        let chain_scopes = std::iter::once(*scope).chain(program.ancestor_chain(scope));
        for searched in chain_scopes {
            let Some(node) = searched.namespace_root().find_path(&parts) else {
                continue;
            };
            found_namespace = true;
            for child in node.children.values() {
                sink.push(child.last_part_name.clone(), CompletionKind::Namespace, None);
            }
            for function in node.functions_by_lower_name.values() {
                sink.push(
                    function.name.clone(),
                    CompletionKind::Callable,
                    Some(function.signature()),
                );
            }
            for class in node.classes_by_lower_name.values() {
                sink.push(class.decl.name.clone(), CompletionKind::Class, None);
            }
        }
    }
    if found_namespace {
        return sink.items;
    }

    // plain property access: every property name observed anywhere in
    // the including scopes
    for scope in scopes {
        if is_cancelled(cancel) {
            break;
        }
        for key in program.scope_member_keys(scope) {
            if let Some(member) = program.source_file(&key) {
                if let Some(references) = member.references() {
                    for original in references.property_hints.values() {
                        sink.push(original.clone(), CompletionKind::Property, None);
                    }
                }
            }
        }
    }
    sink.items
}

/// After `new`: class names only
fn class_completions(
    program: &Program,
    scopes: &[&Scope],
    cancel: Option<&CancellationToken>,
) -> Vec<CompletionItem> {
    let mut sink = ItemSink::new();
    for scope in scopes {
        if is_cancelled(cancel) {
            break;
        }
        let chain_scopes = std::iter::once(*scope).chain(program.ancestor_chain(scope));
        for searched in chain_scopes {
            for class in searched.all_classes() {
                let label = match &class.decl.namespace_name {
                    Some(ns) => format!("{ns}.{}", class.decl.name),
                    None => class.decl.name.clone(),
                };
                sink.push(label, CompletionKind::Class, None);
            }
        }
    }
    sink.items
}

/// Open code position: locals, callables, namespace roots, `m`, keywords
fn open_completions(
    program: &Program,
    pkg_path: &str,
    scopes: &[&Scope],
    position: Position,
    cancel: Option<&CancellationToken>,
) -> Vec<CompletionItem> {
    let mut sink = ItemSink::new();

    if let Some(file) = program.source_file(pkg_path) {
        if let Some(references) = file.references() {
            if let Some(function_id) = enclosing_function_id(references, position) {
                if let Some(vars) = references.local_vars.get(&function_id) {
                    for var in vars {
                        sink.push(
                            var.name.clone(),
                            CompletionKind::LocalVariable,
                            Some(var.type_kind.to_string()),
                        );
                    }
                }
            }
        }
    }

    for scope in scopes {
        if is_cancelled(cancel) {
            return sink.items;
        }
        let chain_scopes = std::iter::once(*scope).chain(program.ancestor_chain(scope));
        for searched in chain_scopes {
            for (_, bucket) in searched.callable_buckets() {
                for callable in bucket {
                    sink.push(
                        callable.name.clone(),
                        CompletionKind::Callable,
                        Some(callable.signature()),
                    );
                }
            }
            for root in searched.namespace_root().children.values() {
                sink.push(root.last_part_name.clone(), CompletionKind::Namespace, None);
            }
        }
    }

    sink.push("m".to_string(), CompletionKind::LocalVariable, None);
    for keyword in KEYWORDS {
        sink.push((*keyword).to_string(), CompletionKind::Keyword, None);
    }
    sink.items
}
