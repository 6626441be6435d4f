//! Symbol tables: scoped name → type bindings with parent-chain lookup.
//!
//! A name may be assigned several times with differing inferred types;
//! the table records every entry. `get_symbol_type` collapses them: when
//! every entry agrees the common type wins, otherwise the symbol is
//! dynamic. Forward references are lazy types that resolve through a
//! [`LazyTypeContext`]; resolution detects cycles and yields dynamic.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::Range;
use crate::types::TypeKind;

/// One recorded binding of a name
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub original_name: String,
    pub range: Range,
    pub type_kind: TypeKind,
}

/// Deferred type lookups for forward references. A lazy type is "the type
/// that symbol `name` will have once the table is fully populated".
#[derive(Debug, Default)]
pub struct LazyTypeContext {
    entries: Vec<String>,
}

impl LazyTypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deferred lookup, returning the id to embed in
    /// [`TypeKind::Lazy`]
    pub fn register(&mut self, name: impl Into<String>) -> u32 {
        self.entries.push(name.into().to_lowercase());
        (self.entries.len() - 1) as u32
    }

    fn resolve(
        &self,
        id: u32,
        table: &SymbolTable,
        search_parent: bool,
        visiting: &mut FxHashSet<u32>,
    ) -> TypeKind {
        if !visiting.insert(id) {
            // cycle: a lazily depends on b depends on a
            return TypeKind::Dynamic;
        }
        match self.entries.get(id as usize) {
            Some(name) => table.symbol_type_inner(name, search_parent, Some(self), visiting),
            None => TypeKind::Dynamic,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    /// lowercase name → all recorded entries
    symbols: FxHashMap<String, Vec<SymbolEntry>>,
    parent: Option<Rc<SymbolTable>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(
        &mut self,
        name: &str,
        range: Range,
        type_kind: TypeKind,
    ) {
        self.symbols
            .entry(name.to_lowercase())
            .or_default()
            .push(SymbolEntry {
                original_name: name.to_string(),
                range,
                type_kind,
            });
    }

    pub fn set_parent(&mut self, parent: Rc<SymbolTable>) {
        self.parent = Some(parent);
    }

    pub fn parent(&self) -> Option<&Rc<SymbolTable>> {
        self.parent.as_ref()
    }

    /// Copy every entry from another table into this one
    pub fn merge_from(&mut self, other: &SymbolTable) {
        for (name, entries) in &other.symbols {
            self.symbols
                .entry(name.clone())
                .or_default()
                .extend(entries.iter().cloned());
        }
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if self.symbols.contains_key(&lower) {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.has_symbol(name))
    }

    /// All entries recorded for a name in this table (no parent chain)
    pub fn get_symbol(&self, name: &str) -> Option<&[SymbolEntry]> {
        self.symbols
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
    }

    /// The collapsed type of a name: the common type when every entry
    /// agrees, dynamic otherwise. `lazy_context` resolves forward
    /// references.
    pub fn get_symbol_type(
        &self,
        name: &str,
        search_parent: bool,
        lazy_context: Option<&LazyTypeContext>,
    ) -> Option<TypeKind> {
        let lower = name.to_lowercase();
        self.lookup_entries(&lower, search_parent)?;
        let mut visiting = FxHashSet::default();
        Some(self.symbol_type_inner(&lower, search_parent, lazy_context, &mut visiting))
    }

    fn lookup_entries(&self, lower: &str, search_parent: bool) -> Option<&[SymbolEntry]> {
        if let Some(entries) = self.symbols.get(lower) {
            return Some(entries.as_slice());
        }
        if search_parent {
            if let Some(parent) = &self.parent {
                return parent.lookup_entries(lower, true);
            }
        }
        None
    }

    fn symbol_type_inner(
        &self,
        lower: &str,
        search_parent: bool,
        lazy_context: Option<&LazyTypeContext>,
        visiting: &mut FxHashSet<u32>,
    ) -> TypeKind {
        let Some(entries) = self.lookup_entries(lower, search_parent) else {
            return TypeKind::Dynamic;
        };
        let mut resolved: Vec<TypeKind> = Vec::with_capacity(entries.len());
        for entry in entries {
            let ty = match &entry.type_kind {
                TypeKind::Lazy(id) => match lazy_context {
                    Some(context) => context.resolve(*id, self, search_parent, visiting),
                    None => TypeKind::Dynamic,
                },
                other => other.clone(),
            };
            resolved.push(ty);
        }
        match resolved.split_first() {
            None => TypeKind::Dynamic,
            Some((first, rest)) => {
                if rest.iter().all(|t| t == first) {
                    first.clone()
                } else {
                    TypeKind::Dynamic
                }
            }
        }
    }

    /// Iterate the names bound directly in this table
    pub fn names(&self) -> impl Iterator<Item = (&str, &[SymbolEntry])> {
        self.symbols
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> Range {
        Range::default()
    }

    #[test]
    fn single_entry_returns_its_type() {
        let mut table = SymbolTable::new();
        table.add_symbol("name", range(), TypeKind::String);
        assert_eq!(
            table.get_symbol_type("NAME", false, None),
            Some(TypeKind::String)
        );
    }

    #[test]
    fn agreeing_entries_collapse_to_common_type() {
        let mut table = SymbolTable::new();
        table.add_symbol("count", range(), TypeKind::Integer);
        table.add_symbol("count", range(), TypeKind::Integer);
        assert_eq!(
            table.get_symbol_type("count", false, None),
            Some(TypeKind::Integer)
        );
    }

    #[test]
    fn disagreeing_entries_collapse_to_dynamic() {
        let mut table = SymbolTable::new();
        table.add_symbol("value", range(), TypeKind::Integer);
        table.add_symbol("value", range(), TypeKind::String);
        assert_eq!(
            table.get_symbol_type("value", false, None),
            Some(TypeKind::Dynamic)
        );
    }

    #[test]
    fn parent_chain_lookup() {
        let mut parent = SymbolTable::new();
        parent.add_symbol("shared", range(), TypeKind::Boolean);
        let parent = Rc::new(parent);
        let mut child = SymbolTable::new();
        child.set_parent(parent);
        assert_eq!(
            child.get_symbol_type("shared", true, None),
            Some(TypeKind::Boolean)
        );
        assert_eq!(child.get_symbol_type("shared", false, None), None);
    }

    #[test]
    fn merge_from_unions_entries() {
        let mut a = SymbolTable::new();
        a.add_symbol("x", range(), TypeKind::Integer);
        let mut b = SymbolTable::new();
        b.add_symbol("x", range(), TypeKind::String);
        b.add_symbol("y", range(), TypeKind::Float);
        a.merge_from(&b);
        assert_eq!(a.get_symbol_type("x", false, None), Some(TypeKind::Dynamic));
        assert_eq!(a.get_symbol_type("y", false, None), Some(TypeKind::Float));
    }

    #[test]
    fn lazy_type_resolves_through_context() {
        let mut context = LazyTypeContext::new();
        let id = context.register("target");
        let mut table = SymbolTable::new();
        table.add_symbol("source", range(), TypeKind::Lazy(id));
        table.add_symbol("target", range(), TypeKind::String);
        assert_eq!(
            table.get_symbol_type("source", false, Some(&context)),
            Some(TypeKind::String)
        );
    }

    #[test]
    fn lazy_cycle_yields_dynamic() {
        let mut context = LazyTypeContext::new();
        let id_a = context.register("b");
        let id_b = context.register("a");
        let mut table = SymbolTable::new();
        table.add_symbol("a", range(), TypeKind::Lazy(id_a));
        table.add_symbol("b", range(), TypeKind::Lazy(id_b));
        assert_eq!(
            table.get_symbol_type("a", false, Some(&context)),
            Some(TypeKind::Dynamic)
        );
    }
}
