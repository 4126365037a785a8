//! Restricted views of the table graph handed to layout and rendering.

use std::collections::HashSet;

use serde::Serialize;

use crate::graph::{CmdbGraph, DiscoveredPath, EdgeKind};

/// A node of a [`SubGraph`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    pub name: String,
    /// Bridge ancestor through which a path target was reached.
    pub inherited_from: Option<String>,
    /// Table this ancestor node represents in a centred view.
    pub stands_for: Option<String>,
}

impl ViewNode {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inherited_from: None,
            stands_for: None,
        }
    }
}

/// An edge of a [`SubGraph`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: String,
}

/// A subset of the table graph with a designated root node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubGraph {
    pub root: String,
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl SubGraph {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Graph restricted to the nodes of `paths`. Edges are every stored edge
    /// between consecutive path nodes, each kind kept.
    pub fn from_paths(graph: &CmdbGraph, source: &str, target: &str, paths: &[DiscoveredPath]) -> Self {
        let mut view = Self::new(source);

        for path in paths {
            for name in &path.nodes {
                let mut node = ViewNode::plain(name);
                if name == target {
                    node.inherited_from = path.bridge.clone();
                }
                view.add_node(node);
            }
        }

        for path in paths {
            for pair in path.nodes.windows(2) {
                for edge in graph.edges_between(&pair[0], &pair[1]) {
                    view.add_edge(&pair[0], &pair[1], edge.kind, &edge.label);
                }
            }
        }

        view
    }

    /// Add a node unless present. Annotations of a later duplicate fill
    /// missing ones on the existing node.
    pub fn add_node(&mut self, node: ViewNode) {
        if let Some(existing) = self.nodes.iter_mut().find(|n| n.name == node.name) {
            if existing.inherited_from.is_none() {
                existing.inherited_from = node.inherited_from;
            }
            if existing.stands_for.is_none() {
                existing.stands_for = node.stands_for;
            }
            return;
        }
        self.nodes.push(node);
    }

    /// Add an edge unless one of the same kind already joins the pair.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind, label: &str) {
        let duplicate = self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.kind == kind);
        if duplicate {
            return;
        }
        self.edges.push(ViewEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            label: label.to_string(),
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }

    pub fn node(&self, name: &str) -> Option<&ViewNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Distinct successors of `name` in edge order.
    pub fn successors(&self, name: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| e.source == name)
            .map(|e| e.target.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Total degree (in + out) of `name`.
    pub fn degree(&self, name: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == name || e.target == name)
            .map(|e| if e.source == e.target { 2 } else { 1 })
            .sum()
    }

    pub fn has_kind(&self, kind: EdgeKind) -> bool {
        self.edges.iter().any(|e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{find_paths, fixtures, PathQuery};

    #[test]
    fn test_path_view_restricted_to_path_nodes() {
        let graph = fixtures::datacenter_graph();
        let paths = find_paths(&graph, "rack", "server", &PathQuery::default()).unwrap();
        let view = SubGraph::from_paths(&graph, "rack", "server", &paths);

        assert_eq!(view.root, "rack");
        let names: Vec<&str> = view.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["rack", "computer", "server"]);
        assert!(!view.contains("zone"));
        assert_eq!(view.edge_count(), 2);
        assert_eq!(view.edges[0].kind, EdgeKind::Relationship);
        assert_eq!(view.edges[0].label, "Contains");
        assert_eq!(view.edges[1].kind, EdgeKind::Hierarchy);
        assert_eq!(view.node("server").unwrap().inherited_from.as_deref(), Some("computer"));
        assert_eq!(view.node("computer").unwrap().inherited_from, None);
    }

    #[test]
    fn test_add_edge_and_successors() {
        let mut view = SubGraph::new("a");
        view.add_node(ViewNode::plain("a"));
        view.add_node(ViewNode::plain("b"));
        view.add_edge("a", "b", EdgeKind::Relationship, "x");
        view.add_edge("a", "b", EdgeKind::Relationship, "y");
        view.add_edge("a", "b", EdgeKind::Hierarchy, "parent of");

        assert_eq!(view.edge_count(), 2);
        assert_eq!(view.successors("a"), vec!["b"]);
        assert_eq!(view.degree("b"), 2);
    }
}
