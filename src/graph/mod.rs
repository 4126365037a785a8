//! Table graph: assembly, path discovery, and inspection.
//!
//! One node per table; edges are either class `hierarchy` (parent → child)
//! or business `relationship` (base → dependent). At most one edge of each
//! kind exists per ordered pair.

mod assembler;
pub mod neighborhood;
mod paths;
pub mod stats;
mod view;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assembler::{assemble, assemble_with_summary, AssemblySummary};
pub use paths::{find_paths, DiscoveredPath, PathQuery, DEFAULT_MAX_PATHS, DEFAULT_MAX_PATH_LENGTH};
pub use stats::GraphStats;
pub use view::{SubGraph, ViewEdge, ViewNode};

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{CmdbMapError, Result};

/// Kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Inherits-from link, stored parent → child.
    Hierarchy,
    /// Business association, stored base → dependent.
    Relationship,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Hierarchy => "hierarchy",
            EdgeKind::Relationship => "relationship",
        }
    }
}

/// Node payload: the table's attributes as seen by the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableNode {
    pub name: String,
    pub label: String,
    pub scope: String,
    /// Package id, present only when it resolves in the record store.
    pub package: Option<String>,
    pub is_extendable: bool,
    /// False for relationship endpoints missing from the table catalog.
    pub cataloged: bool,
}

impl TableNode {
    /// Node for a name that is not in the table catalog.
    pub fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            scope: "unknown".to_string(),
            package: None,
            is_extendable: false,
            cataloged: false,
        }
    }
}

/// Edge payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub label: String,
    /// Relationship type id for relationship edges.
    pub rel_type: Option<String>,
    /// Input file the edge was derived from.
    pub source_file: String,
}

/// A relationship seen from one table: the peer on the other end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipEntry {
    pub peer: String,
    pub label: String,
    pub kind: EdgeKind,
}

/// Incoming and outgoing edges of one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableRelationships {
    pub table: String,
    pub incoming: Vec<RelationshipEntry>,
    pub outgoing: Vec<RelationshipEntry>,
}

/// Directed multi-kind graph of tables.
#[derive(Debug, Default, Clone)]
pub struct CmdbGraph {
    graph: DiGraph<TableNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
}

impl CmdbGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning the existing index when the name is taken.
    pub fn add_node(&mut self, node: TableNode) -> NodeIndex {
        if let Some(&ix) = self.index.get(&node.name) {
            return ix;
        }
        let name = node.name.clone();
        let ix = self.graph.add_node(node);
        self.index.insert(name, ix);
        ix
    }

    /// Add an edge unless one of the same kind already joins the pair.
    /// Returns whether the edge was inserted.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) -> bool {
        let duplicate = self
            .graph
            .edges_connecting(from, to)
            .any(|e| e.weight().kind == edge.kind);
        if duplicate {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    /// Index of a node that must exist, or `NotFound` naming the table.
    pub fn require(&self, name: &str) -> Result<NodeIndex> {
        self.node_index(name)
            .ok_or_else(|| CmdbMapError::NotFound(name.to_string()))
    }

    pub fn node(&self, name: &str) -> Option<&TableNode> {
        self.node_index(name).map(|ix| &self.graph[ix])
    }

    pub fn node_at(&self, ix: NodeIndex) -> &TableNode {
        &self.graph[ix]
    }

    pub fn name(&self, ix: NodeIndex) -> &str {
        &self.graph[ix].name
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TableNode> {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    /// Edges in insertion order as `(source, target, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &GraphEdge)> {
        self.graph.edge_indices().filter_map(move |e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((self.name(a), self.name(b), &self.graph[e]))
        })
    }

    pub fn has_edge(&self, from: &str, to: &str, kind: EdgeKind) -> bool {
        self.edges_between(from, to).iter().any(|e| e.kind == kind)
    }

    /// Every edge stored from `from` to `to`, in insertion order.
    pub fn edges_between(&self, from: &str, to: &str) -> Vec<&GraphEdge> {
        let (Some(a), Some(b)) = (self.node_index(from), self.node_index(to)) else {
            return Vec::new();
        };
        let mut edges: Vec<(EdgeIndex, &GraphEdge)> = self
            .graph
            .edges_connecting(a, b)
            .map(|e| (e.id(), e.weight()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, e)| e).collect()
    }

    /// Outgoing edges of a node in insertion order.
    ///
    /// petgraph walks adjacency lists newest-first, so the edges are sorted
    /// by index to keep traversal order tied to assembly order.
    pub fn out_edges(&self, ix: NodeIndex) -> Vec<(NodeIndex, &GraphEdge)> {
        self.directed_edges(ix, Direction::Outgoing)
            .into_iter()
            .map(|(_, peer, edge)| (peer, edge))
            .collect()
    }

    /// Distinct successors of a node, ordered by their first connecting edge.
    pub fn successors(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.out_edges(ix)
            .into_iter()
            .filter_map(|(peer, _)| seen.insert(peer).then_some(peer))
            .collect()
    }

    fn directed_edges(&self, ix: NodeIndex, dir: Direction) -> Vec<(EdgeIndex, NodeIndex, &GraphEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(ix, dir)
            .map(|e| {
                let peer = if dir == Direction::Outgoing { e.target() } else { e.source() };
                (e.id(), peer, e.weight())
            })
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges
    }

    /// Parent table of `name` via its hierarchy in-edge, if any.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        let ix = self.node_index(name)?;
        self.directed_edges(ix, Direction::Incoming)
            .into_iter()
            .find(|(_, _, edge)| edge.kind == EdgeKind::Hierarchy)
            .map(|(_, peer, _)| self.name(peer))
    }

    /// `[name, parent, grandparent, ...]`. Stops at the first repeated
    /// table, so a cycle in the parent relation ends the chain instead of
    /// looping. Unknown names yield `[name]`.
    pub fn inheritance_chain(&self, name: &str) -> Vec<String> {
        let mut chain = vec![name.to_string()];
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = name;
        visited.insert(current);

        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(parent) {
                log::debug!("Inheritance cycle detected at '{}' while walking from '{}'", parent, name);
                break;
            }
            chain.push(parent.to_string());
            current = parent;
        }

        chain
    }

    /// Incoming and outgoing edges of a table.
    pub fn relationships_of(&self, name: &str) -> Result<TableRelationships> {
        let ix = self.require(name)?;
        let collect = |dir| {
            self.directed_edges(ix, dir)
                .into_iter()
                .map(|(_, peer, edge)| RelationshipEntry {
                    peer: self.name(peer).to_string(),
                    label: edge.label.clone(),
                    kind: edge.kind,
                })
                .collect::<Vec<_>>()
        };
        Ok(TableRelationships {
            table: name.to_string(),
            incoming: collect(Direction::Incoming),
            outgoing: collect(Direction::Outgoing),
        })
    }

    /// Total degree (in + out) of a node.
    pub fn degree(&self, ix: NodeIndex) -> usize {
        self.graph.edges_directed(ix, Direction::Outgoing).count()
            + self.graph.edges_directed(ix, Direction::Incoming).count()
    }

    pub(crate) fn inner(&self) -> &DiGraph<TableNode, GraphEdge> {
        &self.graph
    }
}
