//! Summary statistics over the assembled graph.

use petgraph::algo::connected_components;
use serde::Serialize;

use crate::graph::{CmdbGraph, EdgeKind};

/// Number of tables listed in [`GraphStats::top_central_nodes`].
pub const TOP_CENTRAL_NODES: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub hierarchy_edges: usize,
    pub relationship_edges: usize,
    /// Weakly connected components.
    pub components: usize,
    pub density: f64,
    pub average_degree: f64,
    /// `(table, degree centrality)`, highest first, ties by name.
    pub top_central_nodes: Vec<(String, f64)>,
}

impl GraphStats {
    pub fn compute(graph: &CmdbGraph) -> Self {
        let nodes = graph.node_count();
        let edges = graph.edge_count();
        let hierarchy_edges = graph
            .edges()
            .filter(|(_, _, e)| e.kind == EdgeKind::Hierarchy)
            .count();

        let density = if nodes > 1 {
            edges as f64 / (nodes * (nodes - 1)) as f64
        } else {
            0.0
        };
        let average_degree = if nodes > 0 {
            2.0 * edges as f64 / nodes as f64
        } else {
            0.0
        };

        let mut centrality: Vec<(String, f64)> = graph
            .inner()
            .node_indices()
            .map(|ix| {
                let score = if nodes > 1 {
                    graph.degree(ix) as f64 / (nodes - 1) as f64
                } else {
                    0.0
                };
                (graph.name(ix).to_string(), score)
            })
            .collect();
        centrality.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        centrality.truncate(TOP_CENTRAL_NODES);

        Self {
            nodes,
            edges,
            hierarchy_edges,
            relationship_edges: edges - hierarchy_edges,
            components: connected_components(graph.inner()),
            density,
            average_degree,
            top_central_nodes: centrality,
        }
    }
}
