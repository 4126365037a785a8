//! Whole-graph export for external graph tools.
//!
//! Formats: node-link JSON, GraphML, GML and GEXF. Nodes keep their table
//! attributes; edges keep kind, label, relationship type and source file.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{CmdbMapError, Result};
use crate::graph::{CmdbGraph, GraphEdge, TableNode};

/// Base name of exported files.
pub const EXPORT_FILE_STEM: &str = "cmdb_graph";

/// Supported export formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// node-link JSON (`directed`, `multigraph`, `nodes`, `links`)
    #[default]
    Json,
    Graphml,
    Gml,
    Gexf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Graphml,
        ExportFormat::Gml,
        ExportFormat::Gexf,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Graphml => "graphml",
            ExportFormat::Gml => "gml",
            ExportFormat::Gexf => "gexf",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", EXPORT_FILE_STEM, self.id())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ExportFormat {
    type Err = CmdbMapError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.id() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|f| f.id()).collect();
                CmdbMapError::InvalidInput(format!(
                    "Unsupported export format '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Write the whole graph to `<dir>/cmdb_graph.<format>`.
pub fn export_graph(graph: &CmdbGraph, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    let content = render_graph(graph, format)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(format.file_name());
    fs::write(&path, content)?;

    log::info!(
        "Exported {} nodes and {} edges as {} to {}",
        graph.node_count(),
        graph.edge_count(),
        format,
        path.display()
    );

    Ok(path)
}

/// Serialize the whole graph in `format`.
pub fn render_graph(graph: &CmdbGraph, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => node_link_json(graph),
        ExportFormat::Graphml => graphml(graph),
        ExportFormat::Gml => Ok(gml(graph)),
        ExportFormat::Gexf => gexf(graph),
    }
}

/// `(element, attribute name)` → declared attribute id.
type AttrIds = HashMap<(&'static str, &'static str), String>;

/// Attribute value types shared by the XML formats.
const NODE_ATTRS: [(&str, &str); 5] = [
    ("label", "string"),
    ("scope", "string"),
    ("package", "string"),
    ("is_extendable", "boolean"),
    ("cataloged", "boolean"),
];

const EDGE_ATTRS: [(&str, &str); 4] = [
    ("kind", "string"),
    ("label", "string"),
    ("rel_type", "string"),
    ("source_file", "string"),
];

enum Value<'a> {
    Text(&'a str),
    Flag(bool),
}

impl Value<'_> {
    fn to_xml(&self) -> String {
        match self {
            Value::Text(s) => s.to_string(),
            Value::Flag(b) => b.to_string(),
        }
    }

    fn to_gml(&self) -> String {
        match self {
            Value::Text(s) => format!("\"{}\"", gml_escape(s)),
            Value::Flag(b) => u8::from(*b).to_string(),
        }
    }
}

/// Present attribute values of a node, in `NODE_ATTRS` order.
fn node_values(node: &TableNode) -> Vec<(&'static str, Value<'_>)> {
    let mut values = vec![("label", Value::Text(&node.label)), ("scope", Value::Text(&node.scope))];
    if let Some(package) = &node.package {
        values.push(("package", Value::Text(package)));
    }
    values.push(("is_extendable", Value::Flag(node.is_extendable)));
    values.push(("cataloged", Value::Flag(node.cataloged)));
    values
}

fn edge_values(edge: &GraphEdge) -> Vec<(&'static str, Value<'_>)> {
    let mut values = vec![("kind", Value::Text(edge.kind.as_str())), ("label", Value::Text(&edge.label))];
    if let Some(rel_type) = &edge.rel_type {
        values.push(("rel_type", Value::Text(rel_type)));
    }
    values.push(("source_file", Value::Text(&edge.source_file)));
    values
}

#[derive(Serialize)]
struct NodeLinkGraph<'a> {
    directed: bool,
    multigraph: bool,
    graph: HashMap<&'a str, &'a str>,
    nodes: Vec<NodeLinkNode<'a>>,
    links: Vec<NodeLinkEdge<'a>>,
}

#[derive(Serialize)]
struct NodeLinkNode<'a> {
    id: &'a str,
    label: &'a str,
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<&'a str>,
    is_extendable: bool,
    cataloged: bool,
}

#[derive(Serialize)]
struct NodeLinkEdge<'a> {
    source: &'a str,
    target: &'a str,
    #[serde(flatten)]
    edge: &'a GraphEdge,
}

fn node_link_json(graph: &CmdbGraph) -> Result<String> {
    let doc = NodeLinkGraph {
        directed: true,
        // a relationship and a hierarchy edge may join the same pair
        multigraph: true,
        graph: HashMap::new(),
        nodes: graph
            .nodes()
            .map(|n| NodeLinkNode {
                id: &n.name,
                label: &n.label,
                scope: &n.scope,
                package: n.package.as_deref(),
                is_extendable: n.is_extendable,
                cataloged: n.cataloged,
            })
            .collect(),
        links: graph
            .edges()
            .map(|(source, target, edge)| NodeLinkEdge { source, target, edge })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn xml_error(e: impl fmt::Display) -> CmdbMapError {
    CmdbMapError::Export(e.to_string())
}

/// Thin indenting writer over an in-memory XML document.
struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    fn new() -> Result<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        Ok(Self { writer })
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start)).map_err(xml_error)
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start)).map_err(xml_error)
    }

    fn text(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.open(tag, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
        self.close(tag)
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(xml_error)
    }
}

fn graphml(graph: &CmdbGraph) -> Result<String> {
    let mut doc = XmlDoc::new()?;
    doc.open("graphml", &[("xmlns", "http://graphml.graphdrawing.org/xmlns")])?;

    let mut key_ids: AttrIds = HashMap::new();
    for (domain, attrs) in [("node", &NODE_ATTRS[..]), ("edge", &EDGE_ATTRS[..])] {
        for &(name, kind) in attrs {
            let id = format!("d{}", key_ids.len());
            doc.empty(
                "key",
                &[("id", id.as_str()), ("for", domain), ("attr.name", name), ("attr.type", kind)],
            )?;
            key_ids.insert((domain, name), id);
        }
    }

    doc.open("graph", &[("id", "G"), ("edgedefault", "directed")])?;
    for node in graph.nodes() {
        doc.open("node", &[("id", node.name.as_str())])?;
        for (name, value) in node_values(node) {
            doc.text("data", &[("key", key_ids[&("node", name)].as_str())], &value.to_xml())?;
        }
        doc.close("node")?;
    }
    for (i, (source, target, edge)) in graph.edges().enumerate() {
        let id = format!("e{}", i);
        doc.open("edge", &[("id", id.as_str()), ("source", source), ("target", target)])?;
        for (name, value) in edge_values(edge) {
            doc.text("data", &[("key", key_ids[&("edge", name)].as_str())], &value.to_xml())?;
        }
        doc.close("edge")?;
    }
    doc.close("graph")?;
    doc.close("graphml")?;
    doc.finish()
}

fn gexf(graph: &CmdbGraph) -> Result<String> {
    let mut doc = XmlDoc::new()?;
    doc.open("gexf", &[("xmlns", "http://www.gexf.net/1.2draft"), ("version", "1.2")])?;
    doc.open("meta", &[])?;
    doc.text("creator", &[], "cmdb-map")?;
    doc.close("meta")?;
    doc.open("graph", &[("defaultedgetype", "directed"), ("mode", "static")])?;

    // GEXF carries labels natively, so they are not declared as attributes.
    let mut attr_ids: AttrIds = HashMap::new();
    for (class, attrs) in [("node", &NODE_ATTRS[..]), ("edge", &EDGE_ATTRS[..])] {
        doc.open("attributes", &[("class", class)])?;
        for &(name, kind) in attrs.iter().filter(|(name, _)| *name != "label") {
            let id = attr_ids.len().to_string();
            doc.empty("attribute", &[("id", id.as_str()), ("title", name), ("type", kind)])?;
            attr_ids.insert((class, name), id);
        }
        doc.close("attributes")?;
    }

    doc.open("nodes", &[])?;
    for node in graph.nodes() {
        doc.open("node", &[("id", node.name.as_str()), ("label", node.label.as_str())])?;
        write_attvalues(&mut doc, &attr_ids, "node", node_values(node))?;
        doc.close("node")?;
    }
    doc.close("nodes")?;

    doc.open("edges", &[])?;
    for (i, (source, target, edge)) in graph.edges().enumerate() {
        let id = i.to_string();
        doc.open(
            "edge",
            &[
                ("id", id.as_str()),
                ("source", source),
                ("target", target),
                ("label", edge.label.as_str()),
            ],
        )?;
        write_attvalues(&mut doc, &attr_ids, "edge", edge_values(edge))?;
        doc.close("edge")?;
    }
    doc.close("edges")?;

    doc.close("graph")?;
    doc.close("gexf")?;
    doc.finish()
}

fn write_attvalues(
    doc: &mut XmlDoc,
    attr_ids: &AttrIds,
    class: &'static str,
    values: Vec<(&'static str, Value<'_>)>,
) -> Result<()> {
    doc.open("attvalues", &[])?;
    for (name, value) in values {
        let Some(id) = attr_ids.get(&(class, name)) else {
            continue;
        };
        let value = value.to_xml();
        doc.empty("attvalue", &[("for", id.as_str()), ("value", value.as_str())])?;
    }
    doc.close("attvalues")
}

fn gml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

fn gml(graph: &CmdbGraph) -> String {
    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut out = String::from("graph [\n  directed 1\n  multigraph 1\n");

    for (i, node) in graph.nodes().enumerate() {
        ids.insert(node.name.as_str(), i);
        out.push_str("  node [\n");
        out.push_str(&format!("    id {}\n", i));
        out.push_str(&format!("    name \"{}\"\n", gml_escape(&node.name)));
        for (name, value) in node_values(node) {
            out.push_str(&format!("    {} {}\n", name, value.to_gml()));
        }
        out.push_str("  ]\n");
    }

    for (source, target, edge) in graph.edges() {
        let (Some(s), Some(t)) = (ids.get(source), ids.get(target)) else {
            continue;
        };
        out.push_str("  edge [\n");
        out.push_str(&format!("    source {}\n    target {}\n", s, t));
        for (name, value) in edge_values(edge) {
            out.push_str(&format!("    {} {}\n", name, value.to_gml()));
        }
        out.push_str("  ]\n");
    }

    out.push_str("]\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{assemble, fixtures};
    use crate::records::{RecordStore, SuggestedRelationship, Table};
    use quick_xml::Reader;
    use tempfile::TempDir;

    /// Count start and empty elements named `tag`.
    fn count_elements(xml: &str, tag: &str) -> usize {
        let mut reader = Reader::from_str(xml);
        let mut count = 0;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == tag.as_bytes() => count += 1,
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("invalid XML: {}", e),
            }
        }
        count
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("GraphML".parse::<ExportFormat>().unwrap(), ExportFormat::Graphml);
        assert_eq!(" gexf ".parse::<ExportFormat>().unwrap(), ExportFormat::Gexf);
        let err = "png".parse::<ExportFormat>().unwrap_err();
        assert!(err.to_string().contains("json, graphml, gml, gexf"));
        assert_eq!(ExportFormat::Gml.file_name(), "cmdb_graph.gml");
    }

    #[test]
    fn test_node_link_json() {
        let graph = fixtures::datacenter_graph();
        let doc: serde_json::Value =
            serde_json::from_str(&render_graph(&graph, ExportFormat::Json).unwrap()).unwrap();

        assert_eq!(doc["directed"], true);
        assert_eq!(doc["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(doc["nodes"][0]["id"], "zone");
        assert_eq!(doc["nodes"][0]["label"], "Data Center Zone");

        let links = doc["links"].as_array().unwrap();
        assert_eq!(links.len(), graph.edge_count());
        assert_eq!(links[0]["source"], "zone");
        assert_eq!(links[0]["target"], "rack");
        assert_eq!(links[0]["kind"], "relationship");
        assert_eq!(links[0]["label"], "Contains");
        assert!(links
            .iter()
            .any(|l| l["source"] == "computer" && l["target"] == "server" && l["kind"] == "hierarchy"));
    }

    #[test]
    fn test_graphml_is_well_formed_and_escaped() {
        let graph = assemble(&RecordStore::from_parts(
            vec![Table::new("a", "R&D <Zone>"), Table::new("b", "B")],
            vec![fixtures::contains_type()],
            vec![SuggestedRelationship::new("a", "b", "contains")],
            vec![],
        ));
        let xml = render_graph(&graph, ExportFormat::Graphml).unwrap();

        assert_eq!(count_elements(&xml, "node"), 2);
        assert_eq!(count_elements(&xml, "edge"), 1);
        assert_eq!(count_elements(&xml, "key"), NODE_ATTRS.len() + EDGE_ATTRS.len());
        assert!(xml.contains("R&amp;D &lt;Zone&gt;"));
        assert!(xml.contains(r#"edgedefault="directed""#));
    }

    #[test]
    fn test_gexf_nodes_and_edges() {
        let graph = fixtures::lettered_graph();
        let xml = render_graph(&graph, ExportFormat::Gexf).unwrap();

        assert_eq!(count_elements(&xml, "node"), graph.node_count());
        assert_eq!(count_elements(&xml, "edge"), graph.edge_count());
        assert!(xml.contains(r#"label="Item C""#));
        assert!(xml.contains(r#"defaultedgetype="directed""#));
    }

    #[test]
    fn test_gml_uses_numeric_ids() {
        let graph = fixtures::datacenter_graph();
        let gml = render_graph(&graph, ExportFormat::Gml).unwrap();

        assert!(gml.starts_with("graph [\n  directed 1\n"));
        assert!(gml.contains("    name \"zone\"\n"));
        assert!(gml.contains("    source 0\n    target 1\n"));
        assert!(gml.contains("    cataloged 1\n"));
        assert_eq!(gml.matches("  edge [").count(), graph.edge_count());
    }

    #[test]
    fn test_export_graph_writes_file() {
        let out = TempDir::new().unwrap();
        let graph = fixtures::datacenter_graph();

        let dir = out.path().join("run");
        let path = export_graph(&graph, ExportFormat::Gexf, &dir).unwrap();

        assert_eq!(path, dir.join("cmdb_graph.gexf"));
        assert!(fs::read_to_string(&path).unwrap().starts_with("<?xml"));
    }
}
