//! Dependency graph and evaluation order.
//!
//! Nodes are the calculated fields of one compile run; an edge `u -> v` means
//! `u` reads `v`. Ordering uses Kahn's algorithm with a min-heap on catalog
//! position, so independent fields keep their catalog order. A cycle never
//! aborts the sort: the fields it blocks are appended in catalog order and
//! reported once.

use crate::error::Diagnostic;
use crate::types::MappingType;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Prefix marking a dependency on a raw provider field rather than a schema field.
pub const PROVIDER_DEPENDENCY_PREFIX: &str = "provider:";

/// One compiled entry as seen by the graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphNode<'a> {
    pub name: &'a str,
    pub mapping_type: MappingType,
    pub dependencies: &'a [String],
}

/// Result of ordering a run's entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    /// Entry indices in evaluation order.
    pub order: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Dependency graph over the entries of one run.
///
/// Entry indices are positions in the slice passed to [`DependencyGraph::build`],
/// which the caller supplies in catalog order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    kinds: Vec<MappingType>,
    /// deps[u] = calculated entries that u reads, ascending, deduplicated
    deps: Vec<Vec<usize>>,
    /// dependents[v] = calculated entries that read v
    dependents: Vec<Vec<usize>>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Build the graph. Only edges between calculated entries are kept;
    /// provider dependencies and names outside the run are ignored here.
    pub fn build(nodes: &[GraphNode<'_>]) -> Self {
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.to_string(), i))
            .collect();

        let n = nodes.len();
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (u, node) in nodes.iter().enumerate() {
            if node.mapping_type != MappingType::Calculated {
                continue;
            }
            let mut targets: Vec<usize> = node
                .dependencies
                .iter()
                .filter(|d| !d.starts_with(PROVIDER_DEPENDENCY_PREFIX))
                .filter_map(|d| index.get(d.trim()).copied())
                .filter(|&v| nodes[v].mapping_type == MappingType::Calculated)
                .collect();
            targets.sort_unstable();
            targets.dedup();
            for &v in &targets {
                dependents[v].push(u);
            }
            deps[u] = targets;
        }

        Self {
            names: nodes.iter().map(|n| n.name.to_string()).collect(),
            kinds: nodes.iter().map(|n| n.mapping_type).collect(),
            deps,
            dependents,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// In-graph dependencies of an entry, by name.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&u| self.deps[u].iter().map(|&v| self.names[v].as_str()).collect())
            .unwrap_or_default()
    }

    /// Evaluation order over all entries.
    ///
    /// 1. Seed entries (direct, prioritized, transformed, io_mapped), grouped by
    ///    type and in catalog order within each group.
    /// 2. Calculated entries by Kahn's algorithm, ties by catalog order.
    /// 3. Anything left is blocked by a cycle and is appended in catalog order.
    pub fn order(&self) -> Ordering {
        let n = self.len();
        let mut order = Vec::with_capacity(n);

        let mut seeds: Vec<(usize, usize)> = self
            .kinds
            .iter()
            .enumerate()
            .filter_map(|(i, kind)| kind.seed_rank().map(|rank| (rank, i)))
            .collect();
        seeds.sort_unstable();
        order.extend(seeds.into_iter().map(|(_, i)| i));

        let calculated: Vec<usize> = (0..n)
            .filter(|&i| self.kinds[i] == MappingType::Calculated)
            .collect();
        let mut in_degree: Vec<usize> = self.deps.iter().map(Vec::len).collect();
        let mut heap: BinaryHeap<Reverse<usize>> = calculated
            .iter()
            .filter(|&&i| in_degree[i] == 0)
            .map(|&i| Reverse(i))
            .collect();

        let mut emitted = vec![false; n];
        while let Some(Reverse(u)) = heap.pop() {
            emitted[u] = true;
            order.push(u);
            for &w in &self.dependents[u] {
                in_degree[w] -= 1;
                if in_degree[w] == 0 {
                    heap.push(Reverse(w));
                }
            }
        }

        let remaining: Vec<usize> = calculated.into_iter().filter(|&i| !emitted[i]).collect();
        let mut diagnostics = Vec::new();
        if !remaining.is_empty() {
            let on_cycle = self.cycle_members(&remaining);
            let (members, blocked): (Vec<usize>, Vec<usize>) =
                remaining.iter().partition(|&&i| on_cycle[i]);
            if !members.is_empty() {
                diagnostics.push(Diagnostic::circular_dependency(self.names_of(&members)));
            }
            if !blocked.is_empty() {
                diagnostics.push(Diagnostic::unresolved_order(self.names_of(&blocked)));
            }
            order.extend(remaining);
        }

        Ordering { order, diagnostics }
    }

    fn names_of(&self, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| self.names[i].clone()).collect()
    }

    /// Mark entries that lie on a cycle within the `remaining` subgraph.
    ///
    /// Strongly connected components by Kosaraju's two passes; a node is on a
    /// cycle when its component has more than one member or it reads itself.
    fn cycle_members(&self, remaining: &[usize]) -> Vec<bool> {
        let n = self.len();
        let mut in_subgraph = vec![false; n];
        for &i in remaining {
            in_subgraph[i] = true;
        }
        let adj: Vec<Vec<usize>> = (0..n)
            .map(|u| {
                if in_subgraph[u] {
                    self.deps[u].iter().copied().filter(|&v| in_subgraph[v]).collect()
                } else {
                    Vec::new()
                }
            })
            .collect();

        fn finish(v: usize, adj: &[Vec<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
            visited[v] = true;
            for &u in &adj[v] {
                if !visited[u] {
                    finish(u, adj, visited, order);
                }
            }
            order.push(v);
        }

        fn gather(v: usize, adj: &[Vec<usize>], visited: &mut [bool], comp: &mut Vec<usize>) {
            visited[v] = true;
            comp.push(v);
            for &u in &adj[v] {
                if !visited[u] {
                    gather(u, adj, visited, comp);
                }
            }
        }

        let mut visited = vec![false; n];
        let mut finish_order = Vec::with_capacity(remaining.len());
        for &v in remaining {
            if !visited[v] {
                finish(v, &adj, &mut visited, &mut finish_order);
            }
        }

        let mut reversed: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (u, edges) in adj.iter().enumerate() {
            for &v in edges {
                reversed[v].push(u);
            }
        }

        let mut on_cycle = vec![false; n];
        visited.fill(false);
        for &v in finish_order.iter().rev() {
            if visited[v] {
                continue;
            }
            let mut comp = Vec::new();
            gather(v, &reversed, &mut visited, &mut comp);
            let cyclic = comp.len() > 1 || adj[v].contains(&v);
            if cyclic {
                for u in comp {
                    on_cycle[u] = true;
                }
            }
        }
        on_cycle
    }

    /// Longest chain of calculated dependencies below `name`.
    ///
    /// Returns `None` for names outside the graph. An edge back onto the current
    /// path counts as 0, so cycles terminate; diamonds are not cycles because
    /// the visited set only covers the current path.
    pub fn dependency_depth(&self, name: &str) -> Option<usize> {
        let &start = self.index.get(name)?;
        let mut memo: Vec<Option<usize>> = vec![None; self.len()];
        let mut on_path = vec![false; self.len()];
        Some(self.depth_from(start, &mut on_path, &mut memo))
    }

    /// Depth of every entry, indexed like the build input.
    pub fn depths(&self) -> Vec<usize> {
        let mut memo: Vec<Option<usize>> = vec![None; self.len()];
        let mut on_path = vec![false; self.len()];
        (0..self.len())
            .map(|i| self.depth_from(i, &mut on_path, &mut memo))
            .collect()
    }

    fn depth_from(&self, u: usize, on_path: &mut [bool], memo: &mut [Option<usize>]) -> usize {
        if on_path[u] {
            return 0;
        }
        if let Some(depth) = memo[u] {
            return depth;
        }
        if self.deps[u].is_empty() {
            memo[u] = Some(0);
            return 0;
        }

        on_path[u] = true;
        let mut truncated = false;
        let mut deepest = 0;
        for &v in &self.deps[u] {
            if on_path[v] {
                truncated = true;
                continue;
            }
            deepest = deepest.max(self.depth_from(v, on_path, memo));
            // A dependency whose value was cut short by the path is path-dependent.
            if memo[v].is_none() {
                truncated = true;
            }
        }
        on_path[u] = false;

        let depth = deepest + 1;
        if !truncated {
            memo[u] = Some(depth);
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticCode;

    struct Fixture {
        name: &'static str,
        kind: MappingType,
        deps: Vec<String>,
    }

    fn calc(name: &'static str, deps: &[&str]) -> Fixture {
        Fixture {
            name,
            kind: MappingType::Calculated,
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn plain(name: &'static str, kind: MappingType) -> Fixture {
        Fixture {
            name,
            kind,
            deps: Vec::new(),
        }
    }

    fn graph(fixtures: &[Fixture]) -> DependencyGraph {
        let nodes: Vec<GraphNode<'_>> = fixtures
            .iter()
            .map(|s| GraphNode {
                name: s.name,
                mapping_type: s.kind,
                dependencies: &s.deps,
            })
            .collect();
        DependencyGraph::build(&nodes)
    }

    fn ordered_names(fixtures: &[Fixture]) -> (Vec<&'static str>, Vec<Diagnostic>) {
        let ordering = graph(fixtures).order();
        (
            ordering.order.iter().map(|&i| fixtures[i].name).collect(),
            ordering.diagnostics,
        )
    }

    #[test]
    fn test_chain_is_reversed() {
        let fixtures = [
            calc("a", &["b"]),
            calc("b", &["c"]),
            plain("c", MappingType::Direct),
        ];
        let (names, diags) = ordered_names(&fixtures);
        assert_eq!(names, vec!["c", "b", "a"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_seed_groups_precede_calculated() {
        let fixtures = [
            calc("f", &[]),
            plain("io", MappingType::IoMapped),
            plain("p", MappingType::Prioritized),
            plain("t", MappingType::Transformed),
            plain("d", MappingType::Direct),
        ];
        let (names, _) = ordered_names(&fixtures);
        assert_eq!(names, vec!["d", "p", "t", "io", "f"]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let fixtures = [
            calc("z", &["base"]),
            calc("y", &[]),
            calc("base", &[]),
            calc("x", &["base"]),
        ];
        let (names, _) = ordered_names(&fixtures);
        assert_eq!(names, vec!["y", "base", "z", "x"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let fixtures = [calc("x", &["y"]), calc("y", &["x"])];
        let (names, diags) = ordered_names(&fixtures);
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::CircularDependency);
        assert_eq!(diags[0].related, vec!["x", "y"]);
    }

    #[test]
    fn test_fields_blocked_by_cycle() {
        let fixtures = [
            calc("after", &["x"]),
            calc("x", &["y"]),
            calc("y", &["x"]),
            calc("free", &[]),
        ];
        let (names, diags) = ordered_names(&fixtures);
        assert_eq!(names, vec!["free", "after", "x", "y"]);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].code, DiagnosticCode::CircularDependency);
        assert_eq!(diags[0].related, vec!["x", "y"]);
        assert_eq!(diags[1].code, DiagnosticCode::UnresolvedDependencyOrder);
        assert_eq!(diags[1].related, vec!["after"]);
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let fixtures = [calc("s", &["s"])];
        let (names, diags) = ordered_names(&fixtures);
        assert_eq!(names, vec!["s"]);
        assert_eq!(diags[0].code, DiagnosticCode::CircularDependency);
    }

    #[test]
    fn test_external_and_provider_dependencies_ignored() {
        let fixtures = [
            calc("a", &["provider:avl_io_1", "missing", "d"]),
            plain("d", MappingType::Direct),
        ];
        let g = graph(&fixtures);
        assert!(g.dependencies_of("a").is_empty());
        assert_eq!(g.dependency_depth("a"), Some(0));
    }

    #[test]
    fn test_depth() {
        let fixtures = [
            calc("top", &["left", "right"]),
            calc("left", &["bottom"]),
            calc("right", &["bottom"]),
            calc("bottom", &[]),
            plain("raw", MappingType::Direct),
        ];
        let g = graph(&fixtures);
        assert_eq!(g.dependency_depth("bottom"), Some(0));
        assert_eq!(g.dependency_depth("left"), Some(1));
        assert_eq!(g.dependency_depth("top"), Some(2));
        assert_eq!(g.dependency_depth("raw"), Some(0));
        assert_eq!(g.dependency_depth("nope"), None);
        assert_eq!(g.depths(), vec![2, 1, 1, 0, 0]);
        // Diamond is not a cycle.
        assert!(g.order().diagnostics.is_empty());
    }

    #[test]
    fn test_depth_terminates_on_cycle() {
        let fixtures = [calc("x", &["y"]), calc("y", &["x"])];
        let g = graph(&fixtures);
        assert_eq!(g.dependency_depth("x"), Some(2));
        assert_eq!(g.dependency_depth("y"), Some(2));
    }
}
