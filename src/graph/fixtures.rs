//! Shared in-memory graphs for unit tests.

use crate::graph::{assemble, CmdbGraph};
use crate::records::{Package, RecordStore, RelationshipType, SuggestedRelationship, Table};

pub(crate) fn contains_type() -> RelationshipType {
    RelationshipType {
        id: "contains".to_string(),
        name: "Contains::Contained by".to_string(),
        parent_descriptor: "Contains".to_string(),
        child_descriptor: "Contained by".to_string(),
    }
}

/// Zone → rack → computer via relationships; server inherits from computer.
pub(crate) fn datacenter_store() -> RecordStore {
    RecordStore::from_parts(
        vec![
            Table::new("zone", "Data Center Zone"),
            Table::new("rack", "Rack"),
            Table::new("computer", "Computer").with_parent(""),
            Table::new("server", "Server").with_parent("computer"),
        ],
        vec![contains_type()],
        vec![
            SuggestedRelationship::new("zone", "rack", "contains"),
            SuggestedRelationship::new("rack", "computer", "contains"),
        ],
        vec![],
    )
}

pub(crate) fn datacenter_graph() -> CmdbGraph {
    assemble(&datacenter_store())
}

/// Five-table inheritance fixture: a is the root of b, d and e; c extends b.
pub(crate) fn lettered_store() -> RecordStore {
    RecordStore::from_parts(
        vec![
            Table::new("table_a", "Item A").with_sys_id("table_a_id"),
            Table::new("table_b", "Item B").with_parent("table_a_id"),
            Table::new("table_c", "Item C")
                .with_parent("table_b")
                .with_package("pkg_x")
                .with_scope("x_custom"),
            Table::new("table_d", "Item D").with_parent("table_a"),
            Table::new("table_e", "Item E").with_parent("table_a"),
        ],
        vec![RelationshipType {
            id: "rel_type_1".to_string(),
            name: "Relation 1::Inverse 1".to_string(),
            parent_descriptor: "Relation 1".to_string(),
            child_descriptor: "Inverse 1".to_string(),
        }],
        vec![
            SuggestedRelationship::new("table_e", "table_d", "rel_type_1"),
            SuggestedRelationship::new("table_d", "table_b", "rel_type_1"),
        ],
        vec![Package {
            source: "pkg_x".to_string(),
            sys_id: "pkg_x_id".to_string(),
            name: "Package X".to_string(),
            version: "1.0".to_string(),
        }],
    )
}

pub(crate) fn lettered_graph() -> CmdbGraph {
    assemble(&lettered_store())
}

/// Two tables naming each other as parent.
pub(crate) fn cyclic_parent_graph() -> CmdbGraph {
    assemble(&RecordStore::from_parts(
        vec![
            Table::new("loop_a", "Loop A").with_parent("loop_b"),
            Table::new("loop_b", "Loop B").with_parent("loop_a"),
            Table::new("start", "Start"),
        ],
        vec![contains_type()],
        vec![SuggestedRelationship::new("start", "loop_a", "contains")],
        vec![],
    ))
}
