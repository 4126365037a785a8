//! Loader for the exported JSON input files.
//!
//! Accepts the ServiceNow export shape (`{"records": [...]}`), a bare JSON
//! array, or JSON Lines with one record per line.

use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use super::{Package, RecordStore, RelationshipType, SuggestedRelationship, Table};
use crate::error::{CmdbMapError, Result};

type RawRecord = Map<String, JsonValue>;

/// Names of the input files inside the data directory.
#[derive(Debug, Clone)]
pub struct InputFiles {
    pub tables: &'static str,
    pub relationship_types: &'static str,
    /// Relationship sources, ingested in this order.
    pub suggestion_sources: [&'static str; 2],
    pub packages: &'static str,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            tables: "sys_db_object.json",
            relationship_types: "cmdb_rel_type.json",
            suggestion_sources: ["cmdb_rel_type_suggest.json", "em_suggested_relation_type.json"],
            packages: "sys_package.json",
        }
    }
}

/// Load every input file from `data_dir` into a [`RecordStore`].
///
/// Tables, relationship types and the first suggestion source are required;
/// the event-management suggestion source and packages are optional.
pub fn load_store(data_dir: &Path) -> Result<RecordStore> {
    let files = InputFiles::default();

    let tables = read_required(data_dir, files.tables)?
        .iter()
        .filter_map(table_from_record)
        .collect::<Vec<_>>();

    let relationship_types = read_required(data_dir, files.relationship_types)?
        .iter()
        .filter_map(relationship_type_from_record)
        .collect::<Vec<_>>();

    let mut suggestions = Vec::new();
    for (i, file_name) in files.suggestion_sources.iter().enumerate() {
        let records = if i == 0 {
            read_required(data_dir, file_name)?
        } else {
            read_optional(data_dir, file_name)?
        };
        suggestions.extend(
            records
                .iter()
                .filter_map(|r| suggestion_from_record(r, file_name)),
        );
    }

    let packages = read_optional(data_dir, files.packages)?
        .iter()
        .map(package_from_record)
        .collect::<Vec<_>>();

    log::info!(
        "Loaded {} tables, {} relationship types, {} suggested relationships, {} packages from {}",
        tables.len(),
        relationship_types.len(),
        suggestions.len(),
        packages.len(),
        data_dir.display()
    );

    Ok(RecordStore::from_parts(
        tables,
        relationship_types,
        suggestions,
        packages,
    ))
}

fn read_required(data_dir: &Path, file_name: &str) -> Result<Vec<RawRecord>> {
    let path = data_dir.join(file_name);
    if !path.is_file() {
        return Err(CmdbMapError::MissingInput(path.display().to_string()));
    }
    read_records(&path)
}

fn read_optional(data_dir: &Path, file_name: &str) -> Result<Vec<RawRecord>> {
    let path = data_dir.join(file_name);
    if !path.is_file() {
        log::warn!("{} not found, continuing without it", path.display());
        return Ok(Vec::new());
    }
    read_records(&path)
}

fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path).map_err(CmdbMapError::Io)?;
    let records = parse_records(&content, &path.display().to_string())?;
    log::debug!("{}: {} records", path.display(), records.len());
    Ok(records)
}

/// Decode the records of one input document.
pub fn parse_records(content: &str, path: &str) -> Result<Vec<RawRecord>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<JsonValue>(content) {
        Ok(JsonValue::Object(mut map)) => match map.remove("records") {
            Some(JsonValue::Array(items)) => into_objects(items, path),
            Some(_) => Err(CmdbMapError::Parse(format!(
                "'records' in {} is not an array",
                path
            ))),
            None => Ok(vec![map]),
        },
        Ok(JsonValue::Array(items)) => into_objects(items, path),
        Ok(_) => Err(CmdbMapError::Parse(format!(
            "{} does not contain JSON records",
            path
        ))),
        Err(_) => parse_json_lines(content, path),
    }
}

fn parse_json_lines(content: &str, path: &str) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: JsonValue = serde_json::from_str(line).map_err(|e| {
            CmdbMapError::Parse(format!("JSON parse error in {}:{}: {}", path, line_no + 1, e))
        })?;
        match value {
            JsonValue::Object(map) => records.push(map),
            _ => {
                return Err(CmdbMapError::Parse(format!(
                    "{}:{} is not a JSON object",
                    path,
                    line_no + 1
                )))
            }
        }
    }
    Ok(records)
}

fn into_objects(items: Vec<JsonValue>, path: &str) -> Result<Vec<RawRecord>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            JsonValue::Object(map) => Ok(map),
            _ => Err(CmdbMapError::Parse(format!(
                "record {} in {} is not a JSON object",
                i, path
            ))),
        })
        .collect()
}

/// Read a field as text. Reference fields exported as `{"value": ...}` are
/// unwrapped; missing and null fields read as an empty string.
fn field(record: &RawRecord, key: &str) -> String {
    record.get(key).map(value_text).unwrap_or_default()
}

fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Object(map) => map.get("value").map(value_text).unwrap_or_default(),
        JsonValue::Null | JsonValue::Array(_) => String::new(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn flag(record: &RawRecord, key: &str, default: bool) -> bool {
    match field(record, key).to_lowercase().as_str() {
        "" => default,
        "true" => true,
        _ => false,
    }
}

fn table_from_record(record: &RawRecord) -> Option<Table> {
    let name = non_empty(field(record, "name"))?;
    let label = field(record, "label");
    let scope = non_empty(field(record, "sys_scope"))
        .or_else(|| non_empty(field(record, "scope")))
        .unwrap_or_else(|| "global".to_string());

    Some(Table {
        sys_id: non_empty(field(record, "sys_id")),
        label: if label.is_empty() { name.clone() } else { label },
        super_class: non_empty(field(record, "super_class")),
        package: non_empty(field(record, "sys_package")),
        scope,
        is_extendable: flag(record, "is_extendable", false),
        name,
    })
}

fn relationship_type_from_record(record: &RawRecord) -> Option<RelationshipType> {
    let name = field(record, "name");
    let id = non_empty(field(record, "sys_id")).or_else(|| non_empty(name.clone()))?;
    Some(RelationshipType {
        id,
        name,
        parent_descriptor: field(record, "parent_descriptor"),
        child_descriptor: field(record, "child_descriptor"),
    })
}

fn suggestion_from_record(record: &RawRecord, source_file: &str) -> Option<SuggestedRelationship> {
    let base_class = non_empty(field(record, "base_class"))?;
    let dependent_class = non_empty(field(record, "dependent_class"))?;
    let rel_type = non_empty(field(record, "cmdb_rel_type"))?;
    Some(SuggestedRelationship {
        base_class,
        dependent_class,
        rel_type,
        parent: flag(record, "parent", true),
        source_file: source_file.to_string(),
    })
}

fn package_from_record(record: &RawRecord) -> Package {
    let source = field(record, "source");
    let name = non_empty(field(record, "name")).unwrap_or_else(|| source.clone());
    Package {
        sys_id: field(record, "sys_id"),
        version: field(record, "version"),
        name,
        source,
    }
}
