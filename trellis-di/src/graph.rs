//! Dependency graph used to detect circular dependencies while resolving elements.
//!
//! A graph lives only as long as a single top-level instance request: it starts empty and
//! accumulates edges along the call path of that request. Each edge points from a dependency to
//! its dependent, and every new edge is checked for closing a cycle before it's inserted, so the
//! first edge closing a cycle is the one reported and the graph itself never becomes cyclic.

use crate::error::ElementInstanceProviderError;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Default, Clone, Debug)]
pub struct DependencyGraph {
    // dependency -> dependents
    edges: FxHashMap<String, FxHashSet<String>>,
}

impl DependencyGraph {
    /// Creates a graph without any vertices or edges.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers that `dependent` requires `dependency`. Fails without modifying the graph if the
    /// new edge would close a cycle, reporting all elements forming the cycle.
    pub fn add_dependency(
        &mut self,
        dependent: &str,
        dependency: &str,
    ) -> Result<(), ElementInstanceProviderError> {
        if dependent == dependency {
            return Err(ElementInstanceProviderError::DependencyCycle(
                [dependent.to_string()].into_iter().collect(),
            ));
        }

        if self.contains_dependency(dependent, dependency) {
            return Ok(());
        }

        // the new edge dependency -> dependent closes a cycle iff dependency is already reachable
        // from dependent
        if let Some(path) = self.find_path(dependent, dependency) {
            return Err(ElementInstanceProviderError::DependencyCycle(
                path.into_iter().collect::<BTreeSet<_>>(),
            ));
        }

        trace!(dependent, dependency, "Adding dependency edge.");

        self.edges
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());

        Ok(())
    }

    /// Checks if an edge stating `dependent` requires `dependency` exists.
    #[inline]
    pub fn contains_dependency(&self, dependent: &str, dependency: &str) -> bool {
        self.edges
            .get(dependency)
            .map(|dependents| dependents.contains(dependent))
            .unwrap_or(false)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn find_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let mut visited = FxHashSet::default();
        let mut path = vec![from.to_string()];

        if self.visit(from, to, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn visit<'a>(
        &'a self,
        current: &'a str,
        target: &str,
        visited: &mut FxHashSet<&'a str>,
        path: &mut Vec<String>,
    ) -> bool {
        if current == target {
            return true;
        }

        if !visited.insert(current) {
            return false;
        }

        if let Some(dependents) = self.edges.get(current) {
            for next in dependents {
                path.push(next.clone());
                if self.visit(next, target, visited, path) {
                    return true;
                }

                path.pop();
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ElementInstanceProviderError;
    use crate::graph::DependencyGraph;
    use std::collections::BTreeSet;

    fn cycle_members(error: ElementInstanceProviderError) -> BTreeSet<String> {
        match error {
            ElementInstanceProviderError::DependencyCycle(members) => members,
            error => panic!("unexpected error: {error}"),
        }
    }

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn should_register_dependencies() {
        let mut graph = DependencyGraph::empty();
        assert!(graph.is_empty());

        graph.add_dependency("a", "b").unwrap();
        graph.add_dependency("b", "c").unwrap();
        graph.add_dependency("a", "c").unwrap();

        assert!(graph.contains_dependency("a", "b"));
        assert!(graph.contains_dependency("b", "c"));
        assert!(graph.contains_dependency("a", "c"));
        assert!(!graph.contains_dependency("b", "a"));
    }

    #[test]
    fn should_allow_repeated_edges() {
        let mut graph = DependencyGraph::empty();
        graph.add_dependency("a", "b").unwrap();
        graph.add_dependency("a", "b").unwrap();
    }

    #[test]
    fn should_detect_self_dependency() {
        let mut graph = DependencyGraph::empty();
        assert_eq!(
            cycle_members(graph.add_dependency("a", "a").unwrap_err()),
            names(&["a"])
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn should_detect_direct_cycle() {
        let mut graph = DependencyGraph::empty();
        graph.add_dependency("a", "b").unwrap();

        assert_eq!(
            cycle_members(graph.add_dependency("b", "a").unwrap_err()),
            names(&["a", "b"])
        );
        assert!(!graph.contains_dependency("b", "a"));
    }

    #[test]
    fn should_detect_transitive_cycle() {
        let mut graph = DependencyGraph::empty();
        graph.add_dependency("a", "b").unwrap();
        graph.add_dependency("b", "c").unwrap();
        graph.add_dependency("x", "c").unwrap();

        assert_eq!(
            cycle_members(graph.add_dependency("c", "a").unwrap_err()),
            names(&["a", "b", "c"])
        );
    }

    #[test]
    fn should_allow_diamonds() {
        let mut graph = DependencyGraph::empty();
        graph.add_dependency("a", "b").unwrap();
        graph.add_dependency("a", "c").unwrap();
        graph.add_dependency("b", "d").unwrap();
        graph.add_dependency("c", "d").unwrap();
    }
}
