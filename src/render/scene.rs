//! Render-ready description of a graph view.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{CmdbMapError, Result};
use crate::graph::{EdgeKind, SubGraph, ViewNode};
use crate::labels::{LabelResolver, PackageGroup};
use crate::layout::{BoundingBox, LayoutAlgorithm, Normalized};

pub const SOURCE_COLOR: &str = "#FF5722";
pub const TARGET_COLOR: &str = "#E91E63";
const RELATIONSHIP_COLOR: &str = "gray";
const HIERARCHY_COLOR: &str = "blue";

const TITLE_LABEL_LENGTH: usize = 50;
const LEGEND_LABEL_LENGTH: usize = 30;
const ANNOTATED_LABEL_LENGTH: usize = 15;
const PACKAGE_LEGEND_LENGTH: usize = 20;
const EDGE_LABEL_LENGTH: usize = 12;
/// Views at most this big always show edge labels.
const EDGE_LABEL_NODE_LIMIT: usize = 15;
const EDGE_LABEL_DENSITY_LIMIT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Source,
    Target,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    Solid,
    Dotted,
}

impl From<EdgeKind> for EdgeStyle {
    fn from(kind: EdgeKind) -> Self {
        match kind {
            EdgeKind::Relationship => EdgeStyle::Solid,
            EdgeKind::Hierarchy => EdgeStyle::Dotted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneNode {
    pub name: String,
    pub label: String,
    pub role: NodeRole,
    /// Package grouping; `None` for source and target.
    pub group: Option<PackageGroup>,
    pub color: String,
    pub size: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: String,
    pub style: EdgeStyle,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    /// Line style for edge entries; `None` for node swatches.
    pub style: Option<EdgeStyle>,
}

/// What a scene is being drawn for.
#[derive(Debug, Clone, Copy)]
pub struct SceneRequest<'a> {
    pub source: &'a str,
    /// `None` for a single-table view.
    pub target: Option<&'a str>,
    pub shortest_only: bool,
    pub layout: LayoutAlgorithm,
    pub label_length: usize,
}

/// Everything a rasteriser needs to paint one view.
#[derive(Debug, Clone, Serialize)]
pub struct RenderScene {
    pub title: String,
    pub subtitle: String,
    pub layout: LayoutAlgorithm,
    pub canvas: BoundingBox,
    /// Figure width and height in inches.
    pub figure_size: (f64, f64),
    pub show_edge_labels: bool,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub legend: Vec<LegendEntry>,
}

impl RenderScene {
    /// Combine a view, its normalised positions and resolved labels.
    pub fn build(
        view: &SubGraph,
        placed: &Normalized,
        labels: &LabelResolver<'_>,
        request: &SceneRequest<'_>,
    ) -> Result<Self> {
        let node_count = view.node_count();
        let edge_count = view.edge_count();
        let mut package_legend: BTreeMap<String, &'static str> = BTreeMap::new();

        let mut nodes = Vec::with_capacity(node_count);
        for node in &view.nodes {
            let point = placed.positions.get(&node.name).ok_or_else(|| {
                CmdbMapError::Render(format!("no position for node '{}'", node.name))
            })?;

            let role = if node.name == request.source {
                NodeRole::Source
            } else if request.target == Some(node.name.as_str()) {
                NodeRole::Target
            } else {
                NodeRole::Member
            };

            let (group, color, size) = match role {
                NodeRole::Source => (None, SOURCE_COLOR, 800),
                NodeRole::Target => (None, TARGET_COLOR, 800),
                NodeRole::Member => {
                    let group = labels.group(&node.name);
                    package_legend.insert(legend_label(labels, &node.name, group), group.color());
                    let size = (view.degree(&node.name) as u32 * 100).clamp(300, 600);
                    (Some(group), group.color(), size)
                }
            };

            nodes.push(SceneNode {
                name: node.name.clone(),
                label: node_label(labels, node, request),
                role,
                group,
                color: color.to_string(),
                size,
                x: point.x,
                y: point.y,
            });
        }

        let edges = view
            .edges
            .iter()
            .map(|e| SceneEdge {
                source: e.source.clone(),
                target: e.target.clone(),
                kind: e.kind,
                label: edge_label(&e.label),
                style: e.kind.into(),
                color: match e.kind {
                    EdgeKind::Relationship => RELATIONSHIP_COLOR,
                    EdgeKind::Hierarchy => HIERARCHY_COLOR,
                }
                .to_string(),
            })
            .collect();

        let density = if node_count > 1 {
            edge_count as f64 / (node_count * (node_count - 1)) as f64
        } else {
            0.0
        };

        let source_title = labels.display_label(request.source, TITLE_LABEL_LENGTH);
        let title = match request.target {
            Some(target) => format!(
                "CMDB {}: {} → {}",
                if request.shortest_only { "Shortest Path" } else { "Paths" },
                source_title,
                labels.display_label(target, TITLE_LABEL_LENGTH)
            ),
            None => format!("CMDB Relationships for: {}", source_title),
        };
        let subtitle = format!(
            "({} tables, {} relationships, {} layout)",
            node_count, edge_count, request.layout
        );

        let mut legend = Vec::new();
        let source_legend = labels.display_label(request.source, LEGEND_LABEL_LENGTH);
        match request.target {
            Some(target) => {
                legend.push(swatch(format!("Source ({})", source_legend), SOURCE_COLOR));
                legend.push(swatch(
                    format!("Target ({})", labels.display_label(target, LEGEND_LABEL_LENGTH)),
                    TARGET_COLOR,
                ));
            }
            None => legend.push(swatch(format!("Central Table ({})", source_legend), SOURCE_COLOR)),
        }
        if view.has_kind(EdgeKind::Relationship) {
            legend.push(LegendEntry {
                label: "CI Relationships".to_string(),
                color: RELATIONSHIP_COLOR.to_string(),
                style: Some(EdgeStyle::Solid),
            });
        }
        if view.has_kind(EdgeKind::Hierarchy) {
            legend.push(LegendEntry {
                label: "Class Hierarchy".to_string(),
                color: HIERARCHY_COLOR.to_string(),
                style: Some(EdgeStyle::Dotted),
            });
        }
        legend.extend(package_legend.into_iter().map(|(label, color)| swatch(label, color)));

        Ok(Self {
            title,
            subtitle,
            layout: request.layout,
            canvas: placed.canvas,
            figure_size: (
                (10.0 + node_count as f64 * 0.3).clamp(12.0, 20.0),
                (6.0 + node_count as f64 * 0.2).clamp(8.0, 16.0),
            ),
            show_edge_labels: node_count <= EDGE_LABEL_NODE_LIMIT
                || density < EDGE_LABEL_DENSITY_LIMIT,
            nodes,
            edges,
            legend,
        })
    }

    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Target reached through a bridge reads `Target (Bridge)`; an ancestor in
/// a single-table view reads `Table (Ancestor)`.
fn node_label(labels: &LabelResolver<'_>, node: &ViewNode, request: &SceneRequest<'_>) -> String {
    let annotated = |primary: &str, secondary: &str| {
        format!(
            "{} ({})",
            labels.display_label(primary, ANNOTATED_LABEL_LENGTH),
            labels.display_label(secondary, ANNOTATED_LABEL_LENGTH)
        )
    };

    match (&node.inherited_from, &node.stands_for) {
        (Some(bridge), _) if request.target.is_some() => annotated(&node.name, bridge),
        (_, Some(table)) if request.target.is_none() => annotated(table, &node.name),
        _ => labels.display_label(&node.name, request.label_length),
    }
}

fn legend_label(labels: &LabelResolver<'_>, table: &str, group: PackageGroup) -> String {
    let package = || {
        labels
            .store()
            .table(table)
            .and_then(|t| t.package.as_deref())
            .map(|p| labels.package_display_name(p, PACKAGE_LEGEND_LENGTH))
            .unwrap_or_default()
    };
    match group {
        PackageGroup::ServiceNow | PackageGroup::Plugin | PackageGroup::OtherPackage => {
            format!("{} ({})", group.legend(), package())
        }
        PackageGroup::GlobalScope | PackageGroup::Unknown => group.legend().to_string(),
    }
}

/// Edge labels longer than 12 characters keep 10 and end in `..`.
fn edge_label(label: &str) -> String {
    if label.chars().count() > EDGE_LABEL_LENGTH {
        let mut short: String = label.chars().take(EDGE_LABEL_LENGTH - 2).collect();
        short.push_str("..");
        short
    } else {
        label.to_string()
    }
}

fn swatch(label: String, color: &str) -> LegendEntry {
    LegendEntry {
        label,
        color: color.to_string(),
        style: None,
    }
}
