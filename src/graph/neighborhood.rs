//! Single-table view: a table, its ancestors, and their neighbours.

use std::collections::HashSet;

use crate::error::Result;
use crate::graph::{CmdbGraph, SubGraph, ViewNode};

/// Node cap for the second ring of a centred view.
pub const MAX_CENTERED_NODES: usize = 20;

/// Build the view centred on `table`.
///
/// Ring one holds every edge touching the table or one of its ancestors,
/// since relationships declared on an ancestor apply to the table too.
/// With `max_depth > 1` a second ring adds edges between a ring-one
/// neighbour and a new node until the view holds [`MAX_CENTERED_NODES`].
pub fn centered_graph(graph: &CmdbGraph, table: &str, max_depth: usize) -> Result<SubGraph> {
    graph.require(table)?;

    let applicable: HashSet<String> = graph.inheritance_chain(table).into_iter().collect();
    let view_node = |name: &str| {
        let mut node = ViewNode::plain(name);
        if name != table && applicable.contains(name) {
            node.stands_for = Some(table.to_string());
        }
        node
    };

    let mut view = SubGraph::new(table);
    view.add_node(ViewNode::plain(table));

    for (source, target, edge) in graph.edges() {
        if !applicable.contains(source) && !applicable.contains(target) {
            continue;
        }
        view.add_node(view_node(source));
        view.add_node(view_node(target));
        view.add_edge(source, target, edge.kind, &edge.label);
    }

    if max_depth > 1 {
        let ring: Vec<String> = view
            .nodes
            .iter()
            .map(|n| n.name.clone())
            .filter(|n| n != table)
            .collect();

        for neighbour in &ring {
            for (source, target, edge) in graph.edges() {
                let new_node = if source == neighbour && !view.contains(target) {
                    target
                } else if target == neighbour && !view.contains(source) {
                    source
                } else {
                    continue;
                };
                if view.node_count() >= MAX_CENTERED_NODES {
                    break;
                }
                view.add_node(ViewNode::plain(new_node));
                view.add_edge(source, target, edge.kind, &edge.label);
            }
        }
    }

    log::debug!(
        "Centred view for '{}': {} nodes, {} edges",
        table,
        view.node_count(),
        view.edge_count()
    );

    Ok(view)
}
