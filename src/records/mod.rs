//! Record store: decoded catalog entities keyed by their natural identifiers.
//!
//! Holds tables, relationship types, suggested relationships and packages
//! exactly as exported. The store has no behaviour beyond lookup; graph
//! semantics live in [`crate::graph`].

pub mod loader;

pub use loader::{load_store, InputFiles};

use std::collections::HashMap;

/// One exported table definition (`sys_db_object`).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub sys_id: Option<String>,
    /// Human label; may be empty or equal to the name.
    pub label: String,
    /// Parent table name after reference resolution. `None` means root.
    pub super_class: Option<String>,
    pub package: Option<String>,
    pub scope: String,
    pub is_extendable: bool,
}

impl Table {
    /// Create a root table with only a name and label.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sys_id: None,
            label: label.into(),
            super_class: None,
            package: None,
            scope: "global".to_string(),
            is_extendable: false,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        self.super_class = if parent.is_empty() { None } else { Some(parent) };
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_sys_id(mut self, sys_id: impl Into<String>) -> Self {
        self.sys_id = Some(sys_id.into());
        self
    }
}

/// A relationship type definition (`cmdb_rel_type`).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipType {
    pub id: String,
    /// Combined name, e.g. `Contains::Contained by`.
    pub name: String,
    pub parent_descriptor: String,
    pub child_descriptor: String,
}

impl RelationshipType {
    /// Descriptor shown on an edge: the parent-side text for parent records,
    /// the child-side text otherwise. Falls back to the matching half of
    /// `name` when the descriptor is blank.
    pub fn descriptor(&self, parent_side: bool) -> String {
        let descriptor = if parent_side {
            &self.parent_descriptor
        } else {
            &self.child_descriptor
        };
        if !descriptor.trim().is_empty() {
            return descriptor.clone();
        }
        match self.name.split_once("::") {
            Some((parent, child)) => {
                if parent_side {
                    parent.to_string()
                } else {
                    child.to_string()
                }
            }
            None => self.name.clone(),
        }
    }
}

/// A suggested relationship between two tables. Direction is always
/// `base_class` → `dependent_class`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedRelationship {
    pub base_class: String,
    pub dependent_class: String,
    /// Reference to a [`RelationshipType`] id.
    pub rel_type: String,
    /// Selects the parent-side descriptor for the edge label.
    pub parent: bool,
    /// Input file the record came from.
    pub source_file: String,
}

impl SuggestedRelationship {
    pub fn new(
        base_class: impl Into<String>,
        dependent_class: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            base_class: base_class.into(),
            dependent_class: dependent_class.into(),
            rel_type: rel_type.into(),
            parent: true,
            source_file: String::new(),
        }
    }
}

/// An application package (`sys_package`).
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub source: String,
    pub sys_id: String,
    pub name: String,
    pub version: String,
}

/// In-memory record store populated once per run.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    tables: Vec<Table>,
    table_index: HashMap<String, usize>,
    relationship_types: HashMap<String, RelationshipType>,
    suggestions: Vec<SuggestedRelationship>,
    packages: HashMap<String, Package>,
}

impl RecordStore {
    /// Build a store from decoded records.
    ///
    /// Duplicate table names keep the first record. Parent references that
    /// hold a `sys_id` are rewritten to the referenced table's name; any
    /// reference that matches neither a name nor a sys_id is kept as-is and
    /// treated as unresolved by the assembler.
    pub fn from_parts(
        tables: Vec<Table>,
        relationship_types: Vec<RelationshipType>,
        suggestions: Vec<SuggestedRelationship>,
        packages: Vec<Package>,
    ) -> Self {
        let mut store = Self::default();

        let sys_id_to_name: HashMap<String, String> = tables
            .iter()
            .filter_map(|t| t.sys_id.clone().map(|id| (id, t.name.clone())))
            .collect();

        for mut table in tables {
            if store.table_index.contains_key(&table.name) {
                log::warn!("Duplicate table record '{}' ignored", table.name);
                continue;
            }
            if let Some(parent) = table.super_class.take() {
                table.super_class = Some(sys_id_to_name.get(&parent).cloned().unwrap_or(parent));
            }
            store.table_index.insert(table.name.clone(), store.tables.len());
            store.tables.push(table);
        }

        for rel_type in relationship_types {
            store.relationship_types.entry(rel_type.id.clone()).or_insert(rel_type);
        }

        store.suggestions = suggestions;

        for package in packages {
            if !package.source.is_empty() {
                store.packages.insert(package.source.clone(), package.clone());
            }
            if !package.sys_id.is_empty() {
                store.packages.insert(package.sys_id.clone(), package);
            }
        }

        store
    }

    /// Tables in load order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.table_index.get(name).map(|&i| &self.tables[i])
    }

    pub fn relationship_type(&self, id: &str) -> Option<&RelationshipType> {
        self.relationship_types.get(id)
    }

    pub fn relationship_type_count(&self) -> usize {
        self.relationship_types.len()
    }

    /// Suggested relationships from both sources, in concatenated order.
    pub fn suggestions(&self) -> &[SuggestedRelationship] {
        &self.suggestions
    }

    /// Look up a package by source or sys_id.
    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Number of package index entries (source and sys_id keys).
    pub fn package_index_len(&self) -> usize {
        self.packages.len()
    }
}
