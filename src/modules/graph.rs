//! Module dependency graph utilities.
//!
//! Edges point from a dependency to its dependent, so a topological order
//! lists every module after the modules it depends on.

use std::collections::{HashMap, VecDeque};

use super::ModuleId;
use crate::registry::Registry;

/// Directed graph over module ids.
///
/// Node insertion order is preserved and drives the tie-breaking of
/// [`topological_sort`] and the search order of [`find_cycle`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<ModuleId>,
    index: HashMap<ModuleId, usize>,
    successors: Vec<Vec<usize>>,
}

impl Graph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(module, dependencies)` pairs, adding an edge from
    /// each dependency to the module.
    pub fn from_dependencies<I, M, D, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = (M, D)>,
        M: Into<ModuleId>,
        D: IntoIterator<Item = S>,
        S: Into<ModuleId>,
    {
        let mut graph = Self::new();
        for (module, deps) in modules {
            let module = module.into();
            graph.add_node(module.clone());
            for dep in deps {
                graph.add_edge(dep.into(), module.clone());
            }
        }
        graph
    }

    /// Add `id` if absent and return its index.
    pub fn add_node(&mut self, id: ModuleId) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(id.clone(), idx);
        self.nodes.push(id);
        self.successors.push(Vec::new());
        idx
    }

    /// Add an edge `from -> to`, adding either node if absent.
    pub fn add_edge(&mut self, from: ModuleId, to: ModuleId) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if let Some(succ) = self.successors.get_mut(from)
            && !succ.contains(&to)
        {
            succ.push(to);
        }
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[ModuleId] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` if the edge `from -> to` exists.
    #[must_use]
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&f), Some(&t)) => self.successors.get(f).is_some_and(|s| s.contains(&t)),
            _ => false,
        }
    }

    fn id(&self, idx: usize) -> Option<&ModuleId> {
        self.nodes.get(idx)
    }

    fn successors_of(&self, idx: usize) -> &[usize] {
        self.successors.get(idx).map_or(&[], Vec::as_slice)
    }
}

/// Build the dependency graph of every registered module.
///
/// Nodes follow registration order; each dependency `d` of module `m` adds
/// the edge `d -> m`.
#[must_use]
pub fn build_graph(registry: &Registry) -> Graph {
    Graph::from_dependencies(
        registry
            .modules()
            .map(|m| (m.id().clone(), m.dependencies().iter().cloned())),
    )
}

/// Order the graph so that every edge's source precedes its target, using
/// Kahn's algorithm with a FIFO queue seeded in node insertion order.
///
/// Returns `None` if the graph contains a cycle.
#[must_use]
pub fn topological_sort(graph: &Graph) -> Option<Vec<ModuleId>> {
    let mut in_degree = vec![0usize; graph.len()];
    for idx in 0..graph.len() {
        for &succ in graph.successors_of(idx) {
            if let Some(d) = in_degree.get_mut(succ) {
                *d += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d == 0).then_some(i))
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(idx) = queue.pop_front() {
        if let Some(id) = graph.id(idx) {
            order.push(id.clone());
        }
        for &succ in graph.successors_of(idx) {
            if let Some(d) = in_degree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(succ);
                }
            }
        }
    }

    (order.len() == graph.len()).then_some(order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Find one cycle in the graph.
///
/// Returns the nodes of the cycle in edge order: each node has an edge to the
/// next, and the last has an edge back to the first. Iterative depth-first
/// search, so deep graphs cannot overflow the stack.
#[must_use]
pub fn find_cycle(graph: &Graph) -> Option<Vec<ModuleId>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];

    for start in 0..graph.len() {
        if marks.get(start) != Some(&Mark::Unvisited) {
            continue;
        }

        // (node, index of the next successor to visit)
        let mut path: Vec<(usize, usize)> = vec![(start, 0)];
        if let Some(m) = marks.get_mut(start) {
            *m = Mark::OnPath;
        }

        while let Some(&(node, next)) = path.last() {
            let Some(&child) = graph.successors_of(node).get(next) else {
                if let Some(m) = marks.get_mut(node) {
                    *m = Mark::Done;
                }
                path.pop();
                continue;
            };
            if let Some(top) = path.last_mut() {
                top.1 += 1;
            }

            match marks.get(child).copied() {
                Some(Mark::OnPath) => {
                    let begin = path.iter().position(|&(n, _)| n == child)?;
                    return Some(
                        path.iter()
                            .skip(begin)
                            .filter_map(|&(n, _)| graph.id(n).cloned())
                            .collect(),
                    );
                }
                Some(Mark::Unvisited) => {
                    if let Some(m) = marks.get_mut(child) {
                        *m = Mark::OnPath;
                    }
                    path.push((child, 0));
                }
                Some(Mark::Done) | None => {}
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ModuleId> {
        names.iter().map(|n| ModuleId::from(*n)).collect()
    }

    /// Graph from a `module -> dependencies` table.
    fn deps(table: &[(&str, Vec<&str>)]) -> Graph {
        Graph::from_dependencies(table.iter().map(|(m, d)| (*m, d.iter().copied())))
    }

    /// `true` if every element of `cycle` has an edge to the next, wrapping.
    fn is_cycle(graph: &Graph, cycle: &[ModuleId]) -> bool {
        !cycle.is_empty()
            && cycle.iter().enumerate().all(|(i, from)| {
                let to = &cycle[(i + 1) % cycle.len()];
                graph.has_edge(from.as_str(), to.as_str())
            })
    }

    // -----------------------------------------------------------------------
    // construction
    // -----------------------------------------------------------------------

    #[test]
    fn edges_point_from_dependency_to_dependent() {
        let g = deps(&[("a", vec![]), ("b", vec!["a"])]);
        assert!(g.has_edge("a", "b"));
        assert!(!g.has_edge("b", "a"));
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let mut g = Graph::new();
        g.add_edge("a".into(), "b".into());
        g.add_edge("a".into(), "b".into());
        assert_eq!(g.successors_of(0).len(), 1);
    }

    #[test]
    fn build_graph_uses_registration_order() {
        let mut registry = Registry::default();
        registry.declare("home", ["zsh"]);
        registry.declare("zsh", Vec::<ModuleId>::new());
        let g = build_graph(&registry);
        assert_eq!(g.nodes(), ids(&["home", "zsh"]).as_slice());
        assert!(g.has_edge("zsh", "home"));
    }

    // -----------------------------------------------------------------------
    // topological_sort
    // -----------------------------------------------------------------------

    #[test]
    fn sort_chain() {
        let g = deps(&[("A", vec![]), ("B", vec!["A"]), ("C", vec!["B"])]);
        assert_eq!(topological_sort(&g), Some(ids(&["A", "B", "C"])));
    }

    #[test]
    fn sort_chain_declared_backwards() {
        let g = deps(&[("C", vec!["B"]), ("B", vec!["A"]), ("A", vec![])]);
        assert_eq!(topological_sort(&g), Some(ids(&["A", "B", "C"])));
    }

    #[test]
    fn sort_independent_nodes_keep_insertion_order() {
        let g = deps(&[("x", vec![]), ("y", vec![]), ("z", vec![])]);
        assert_eq!(topological_sort(&g), Some(ids(&["x", "y", "z"])));
    }

    #[test]
    fn sort_diamond() {
        let g = deps(&[
            ("top", vec!["left", "right"]),
            ("left", vec!["base"]),
            ("right", vec!["base"]),
            ("base", vec![]),
        ]);
        let order = topological_sort(&g).unwrap();
        let pos = |n: &str| order.iter().position(|id| id.as_str() == n).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos("base") < pos("left"));
        assert!(pos("base") < pos("right"));
        assert!(pos("left") < pos("top"));
        assert!(pos("right") < pos("top"));
    }

    #[test]
    fn sort_cycle_returns_none() {
        let g = deps(&[("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])]);
        assert_eq!(topological_sort(&g), None);
    }

    #[test]
    fn sort_self_loop_returns_none() {
        let g = deps(&[("A", vec!["A"])]);
        assert_eq!(topological_sort(&g), None);
    }

    #[test]
    fn sort_empty_graph() {
        assert_eq!(topological_sort(&Graph::new()), Some(vec![]));
    }

    // -----------------------------------------------------------------------
    // find_cycle
    // -----------------------------------------------------------------------

    #[test]
    fn find_cycle_acyclic_returns_none() {
        let g = deps(&[("A", vec![]), ("B", vec!["A"]), ("C", vec!["A", "B"])]);
        assert_eq!(find_cycle(&g), None);
    }

    #[test]
    fn find_cycle_three_nodes() {
        let g = deps(&[("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])]);
        let cycle = find_cycle(&g).unwrap();
        assert_eq!(cycle.len(), 3);
        assert!(is_cycle(&g, &cycle), "not a cycle: {cycle:?}");
    }

    #[test]
    fn find_cycle_self_loop() {
        let g = deps(&[("A", vec!["A"])]);
        assert_eq!(find_cycle(&g), Some(ids(&["A"])));
    }

    #[test]
    fn find_cycle_behind_acyclic_prefix() {
        // a -> b -> c -> d -> b
        let g = deps(&[
            ("a", vec![]),
            ("b", vec!["a", "d"]),
            ("c", vec!["b"]),
            ("d", vec!["c"]),
        ]);
        let cycle = find_cycle(&g).unwrap();
        assert_eq!(cycle.len(), 3);
        assert!(is_cycle(&g, &cycle));
        assert!(!cycle.contains(&ModuleId::from("a")));
    }

    #[test]
    fn find_cycle_reached_through_finished_branch() {
        // The first branch explored from `root` is acyclic and finishes before
        // the cycle on the second branch is entered.
        let g = deps(&[
            ("root", vec![]),
            ("leaf", vec!["root", "shared"]),
            ("shared", vec!["root"]),
            ("x", vec!["shared", "y"]),
            ("y", vec!["x"]),
        ]);
        let cycle = find_cycle(&g).unwrap();
        assert!(is_cycle(&g, &cycle));
        let mut names: Vec<&str> = cycle.iter().map(ModuleId::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn find_cycle_deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..10_000).map(|i| format!("m{i}")).collect();
        let mut g = Graph::new();
        for pair in names.windows(2) {
            g.add_edge(pair[0].as_str().into(), pair[1].as_str().into());
        }
        assert_eq!(find_cycle(&g), None);
        g.add_edge(names[9_999].as_str().into(), names[0].as_str().into());
        assert_eq!(find_cycle(&g).unwrap().len(), 10_000);
    }

    // -----------------------------------------------------------------------
    // every graph on four nodes
    // -----------------------------------------------------------------------

    /// Every edge set over four nodes, self-loops included.
    fn all_four_node_graphs() -> impl Iterator<Item = Graph> {
        const NODES: [&str; 4] = ["a", "b", "c", "d"];
        (0u32..1 << 16).map(|mask| {
            let mut g = Graph::new();
            for n in NODES {
                g.add_node(n.into());
            }
            for bit in 0..16 {
                if mask & (1 << bit) != 0 {
                    let from = NODES[bit / 4];
                    let to = NODES[bit % 4];
                    g.add_edge(from.into(), to.into());
                }
            }
            g
        })
    }

    #[test]
    fn sort_and_cycle_agree_on_every_small_graph() {
        for g in all_four_node_graphs() {
            match topological_sort(&g) {
                Some(order) => {
                    let mut sorted: Vec<&str> = order.iter().map(ModuleId::as_str).collect();
                    sorted.sort_unstable();
                    assert_eq!(sorted, vec!["a", "b", "c", "d"], "not a permutation: {g:?}");
                    for (i, from) in order.iter().enumerate() {
                        for to in &order[..i] {
                            assert!(
                                !g.has_edge(from.as_str(), to.as_str()),
                                "{from} -> {to} violated by {order:?}"
                            );
                        }
                    }
                    assert_eq!(find_cycle(&g), None, "acyclic graph reported a cycle: {g:?}");
                }
                None => {
                    let cycle = find_cycle(&g).expect("cyclic graph without a cycle");
                    assert!(is_cycle(&g, &cycle), "not a cycle: {cycle:?} in {g:?}");
                }
            }
        }
    }
}
