//! Graph assembly from the record store.

use crate::graph::{CmdbGraph, EdgeKind, GraphEdge, TableNode};
use crate::records::{RecordStore, Table};

const HIERARCHY_LABEL: &str = "parent of";
const HIERARCHY_SOURCE: &str = "sys_db_object.json";

/// Counts reported after assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblySummary {
    pub tables: usize,
    /// Relationship endpoints missing from the catalog, added as bare nodes.
    pub bare_nodes: usize,
    pub relationship_edges: usize,
    pub duplicate_relationships: usize,
    pub hierarchy_edges: usize,
    pub unresolved_parents: usize,
}

/// Build the table graph. See [`assemble_with_summary`].
pub fn assemble(store: &RecordStore) -> CmdbGraph {
    assemble_with_summary(store).0
}

/// Build the table graph and report what went into it.
///
/// Every table becomes a node, isolated or not. Relationship edges are added
/// in suggestion order (suggest file, then event-management file) with the
/// first record for an ordered pair winning; hierarchy edges follow in table
/// load order. Parents that do not resolve to a table are skipped.
pub fn assemble_with_summary(store: &RecordStore) -> (CmdbGraph, AssemblySummary) {
    let mut graph = CmdbGraph::new();
    let mut summary = AssemblySummary::default();

    for table in store.tables() {
        graph.add_node(node_for(table, store));
        summary.tables += 1;
    }

    for suggestion in store.suggestions() {
        let from = endpoint(&mut graph, &suggestion.base_class, &mut summary);
        let to = endpoint(&mut graph, &suggestion.dependent_class, &mut summary);

        let label = match store.relationship_type(&suggestion.rel_type) {
            Some(rel_type) => rel_type.descriptor(suggestion.parent),
            None => {
                log::debug!(
                    "Unknown relationship type '{}' on {} -> {}",
                    suggestion.rel_type,
                    suggestion.base_class,
                    suggestion.dependent_class
                );
                format!("rel_{}", suggestion.rel_type.chars().take(8).collect::<String>())
            }
        };

        let inserted = graph.add_edge(
            from,
            to,
            GraphEdge {
                kind: EdgeKind::Relationship,
                label,
                rel_type: Some(suggestion.rel_type.clone()),
                source_file: suggestion.source_file.clone(),
            },
        );
        if inserted {
            summary.relationship_edges += 1;
        } else {
            summary.duplicate_relationships += 1;
        }
    }

    for table in store.tables() {
        let Some(parent) = table.super_class.as_deref() else {
            continue;
        };
        if parent == table.name {
            log::warn!("Table '{}' names itself as parent; ignored", table.name);
            continue;
        }
        let Some(parent_ix) = graph.node_index(parent).filter(|_| store.table(parent).is_some()) else {
            log::debug!("Unresolved parent '{}' for table '{}'", parent, table.name);
            summary.unresolved_parents += 1;
            continue;
        };
        let Some(child_ix) = graph.node_index(&table.name) else {
            continue;
        };
        let inserted = graph.add_edge(
            parent_ix,
            child_ix,
            GraphEdge {
                kind: EdgeKind::Hierarchy,
                label: HIERARCHY_LABEL.to_string(),
                rel_type: None,
                source_file: HIERARCHY_SOURCE.to_string(),
            },
        );
        if inserted {
            summary.hierarchy_edges += 1;
        }
    }

    log::info!(
        "Assembled graph: {} nodes ({} bare), {} relationship edges ({} duplicates skipped), {} hierarchy edges ({} unresolved parents)",
        graph.node_count(),
        summary.bare_nodes,
        summary.relationship_edges,
        summary.duplicate_relationships,
        summary.hierarchy_edges,
        summary.unresolved_parents
    );

    (graph, summary)
}

fn node_for(table: &Table, store: &RecordStore) -> TableNode {
    let package = table.package.as_deref().and_then(|id| {
        if store.package(id).is_some() {
            Some(id.to_string())
        } else {
            log::debug!("Table '{}' references unknown package '{}'", table.name, id);
            None
        }
    });
    TableNode {
        name: table.name.clone(),
        label: table.label.clone(),
        scope: table.scope.clone(),
        package,
        is_extendable: table.is_extendable,
        cataloged: true,
    }
}

fn endpoint(
    graph: &mut CmdbGraph,
    name: &str,
    summary: &mut AssemblySummary,
) -> petgraph::graph::NodeIndex {
    if let Some(ix) = graph.node_index(name) {
        return ix;
    }
    log::debug!("Relationship endpoint '{}' is not in the table catalog", name);
    summary.bare_nodes += 1;
    graph.add_node(TableNode::bare(name))
}
