//! Rows by breadth-first depth from the root.

use std::collections::VecDeque;

use petgraph::algo::is_cyclic_directed;
use petgraph::Direction;

use crate::error::{CmdbMapError, Result};
use crate::graph::SubGraph;
use crate::layout::{index_view, LayoutAlgorithm, LayoutProvider, Point, Positions};

const ROW_GAP: f64 = 1.0;
const COLUMN_GAP: f64 = 1.0;

/// Places the root on the top row and each node one row below its
/// shallowest predecessor. Only applies to acyclic views whose nodes are
/// all reachable from the root.
pub struct LayeredLayout;

impl LayoutProvider for LayeredLayout {
    fn id(&self) -> LayoutAlgorithm {
        LayoutAlgorithm::Layered
    }

    fn layout(&self, view: &SubGraph) -> Result<Positions> {
        let (graph, index) = index_view(view);

        if is_cyclic_directed(&graph) {
            return Err(CmdbMapError::Layout("view contains a cycle".to_string()));
        }
        let root = *index.get(view.root.as_str()).ok_or_else(|| {
            CmdbMapError::Layout(format!("root '{}' is not in the view", view.root))
        })?;

        let mut depth = vec![None; graph.node_count()];
        depth[root.index()] = Some(0usize);
        let mut queue = VecDeque::from([root]);
        let mut rows: Vec<Vec<&str>> = Vec::new();

        while let Some(ix) = queue.pop_front() {
            let Some(d) = depth[ix.index()] else { continue };
            if rows.len() <= d {
                rows.resize_with(d + 1, Vec::new);
            }
            rows[d].push(graph[ix]);

            let mut next: Vec<_> = graph.neighbors_directed(ix, Direction::Outgoing).collect();
            // petgraph yields neighbours newest first
            next.reverse();
            for n in next {
                if depth[n.index()].is_none() {
                    depth[n.index()] = Some(d + 1);
                    queue.push_back(n);
                }
            }
        }

        let unreachable: Vec<&str> = graph
            .node_indices()
            .filter(|ix| depth[ix.index()].is_none())
            .map(|ix| graph[ix])
            .collect();
        if !unreachable.is_empty() {
            return Err(CmdbMapError::Layout(format!(
                "not reachable from root: {}",
                unreachable.join(", ")
            )));
        }

        let mut positions = Positions::new();
        for (d, row) in rows.iter().enumerate() {
            let offset = (row.len() as f64 - 1.0) / 2.0;
            for (i, name) in row.iter().enumerate() {
                positions.insert(
                    name.to_string(),
                    Point::new((i as f64 - offset) * COLUMN_GAP, -(d as f64) * ROW_GAP),
                );
            }
        }
        Ok(positions)
    }
}
