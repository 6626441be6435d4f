//! The dependency graph: directed edges between pkg-path keys with change
//! subscriptions.
//!
//! Keys are lowercased pkg-paths. A mutation notifies listeners on the
//! changed key and on every transitive dependent — BFS over reverse
//! edges with a visited set, so each listener fires at most once per
//! publish.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

type Listener = Box<dyn FnMut(&str)>;

/// Handle returned by [`DependencyGraph::subscribe`]; pass it back to
/// [`DependencyGraph::unsubscribe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    key: String,
    id: u64,
}

#[derive(Default)]
pub struct DependencyGraph {
    /// node → its outgoing dependencies
    edges: FxHashMap<String, FxHashSet<String>>,
    listeners: FxHashMap<String, Vec<(u64, Listener)>>,
    next_listener_id: u64,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) a node's outgoing edges and notify the node
    /// and its transitive dependents
    pub fn add_or_replace(&mut self, key: &str, dependencies: Vec<String>) {
        let key = key.to_lowercase();
        let deps: FxHashSet<String> = dependencies
            .into_iter()
            .map(|d| d.to_lowercase())
            .collect();
        trace!(key, dep_count = deps.len(), "dependency graph update");
        self.edges.insert(key.clone(), deps);
        self.publish(&key);
    }

    /// Remove a node's edges and notify as for a change
    pub fn remove(&mut self, key: &str) {
        let key = key.to_lowercase();
        self.edges.remove(&key);
        self.publish(&key);
    }

    pub fn dependencies_of(&self, key: &str) -> Option<&FxHashSet<String>> {
        self.edges.get(&key.to_lowercase())
    }

    /// Subscribe to changes of `key` (or anything it transitively
    /// depends on)
    pub fn subscribe(&mut self, key: &str, listener: Listener) -> Subscription {
        let key = key.to_lowercase();
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners
            .entry(key.clone())
            .or_default()
            .push((id, listener));
        Subscription { key, id }
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some(listeners) = self.listeners.get_mut(&subscription.key) {
            listeners.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// The changed key plus every node that transitively depends on it
    fn affected_keys(&self, changed: &str) -> Vec<String> {
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        visited.insert(changed.to_string());
        queue.push_back(changed.to_string());
        let mut result = vec![changed.to_string()];
        while let Some(current) = queue.pop_front() {
            for (node, deps) in &self.edges {
                if deps.contains(&current) && visited.insert(node.clone()) {
                    result.push(node.clone());
                    queue.push_back(node.clone());
                }
            }
        }
        result
    }

    fn publish(&mut self, changed: &str) {
        let affected = self.affected_keys(changed);
        for key in affected {
            // listeners are temporarily detached so they may not re-enter
            // the graph for this key
            if let Some(mut listeners) = self.listeners.remove(&key) {
                for (_, listener) in &mut listeners {
                    listener(changed);
                }
                self.listeners.entry(key).or_default().extend(
                    listeners
                        .into_iter()
                        .map(|(id, listener)| (id, listener)),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter_listener(count: &Rc<Cell<u32>>) -> Listener {
        let count = Rc::clone(count);
        Box::new(move |_| count.set(count.get() + 1))
    }

    #[test]
    fn change_notifies_the_node_itself() {
        let mut graph = DependencyGraph::new();
        let fired = Rc::new(Cell::new(0));
        graph.subscribe("pkg:/a.brs", counter_listener(&fired));
        graph.add_or_replace("pkg:/a.brs", vec![]);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn change_notifies_transitive_dependents() {
        let mut graph = DependencyGraph::new();
        // c depends on b depends on a
        graph.add_or_replace("b", vec!["a".into()]);
        graph.add_or_replace("c", vec!["b".into()]);
        let fired = Rc::new(Cell::new(0));
        graph.subscribe("c", counter_listener(&fired));
        graph.add_or_replace("a", vec![]);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn listener_fires_once_per_publish_despite_diamond() {
        let mut graph = DependencyGraph::new();
        // d depends on b and c, both depend on a
        graph.add_or_replace("b", vec!["a".into()]);
        graph.add_or_replace("c", vec!["a".into()]);
        graph.add_or_replace("d", vec!["b".into(), "c".into()]);
        let fired = Rc::new(Cell::new(0));
        graph.subscribe("d", counter_listener(&fired));
        graph.add_or_replace("a", vec![]);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let mut graph = DependencyGraph::new();
        let fired = Rc::new(Cell::new(0));
        graph.subscribe("PKG:/A.BRS", counter_listener(&fired));
        graph.add_or_replace("pkg:/a.brs", vec![]);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn remove_fires_listeners() {
        let mut graph = DependencyGraph::new();
        graph.add_or_replace("b", vec!["a".into()]);
        let fired = Rc::new(Cell::new(0));
        graph.subscribe("b", counter_listener(&fired));
        graph.remove("a");
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut graph = DependencyGraph::new();
        let fired = Rc::new(Cell::new(0));
        let subscription = graph.subscribe("a", counter_listener(&fired));
        graph.unsubscribe(subscription);
        graph.add_or_replace("a", vec![]);
        assert_eq!(fired.get(), 0);
    }
}
