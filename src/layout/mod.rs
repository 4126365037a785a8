//! Pluggable node placement for graph views.
//!
//! Providers map a [`SubGraph`] to raw 2-D coordinates (y grows upwards).
//! The registry selects a provider by [`LayoutAlgorithm`] and walks a fixed
//! preference order when the requested one cannot place the view.
//! [`normalize`] then anchors the root node in the upper-left of the canvas.

pub mod circular;
pub mod layered;
pub mod normalize;

pub use normalize::{normalize, BoundingBox, Normalized, NormalizeWarning, DEFAULT_ROOT_INSET};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::{CmdbMapError, Result};
use crate::graph::SubGraph;

/// A position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node name → position.
pub type Positions = BTreeMap<String, Point>;

/// Identifiers of the built-in layout algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAlgorithm {
    #[default]
    Layered,
    Circular,
}

impl LayoutAlgorithm {
    /// Fallback preference order.
    pub const ALL: [LayoutAlgorithm; 2] = [LayoutAlgorithm::Layered, LayoutAlgorithm::Circular];

    pub fn id(&self) -> &'static str {
        match self {
            LayoutAlgorithm::Layered => "layered",
            LayoutAlgorithm::Circular => "circular",
        }
    }

    /// `self` followed by the other algorithms in preference order.
    pub fn fallback_chain(&self) -> Vec<LayoutAlgorithm> {
        std::iter::once(*self)
            .chain(Self::ALL.iter().copied().filter(|a| a != self))
            .collect()
    }
}

impl fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for LayoutAlgorithm {
    type Err = CmdbMapError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.id() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|a| a.id()).collect();
                CmdbMapError::InvalidInput(format!(
                    "Unknown layout '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// A layout capability.
pub trait LayoutProvider {
    fn id(&self) -> LayoutAlgorithm;

    /// Place every node of `view`, or fail with [`CmdbMapError::Layout`]
    /// when the algorithm does not apply.
    fn layout(&self, view: &SubGraph) -> Result<Positions>;
}

/// Registry of layout providers keyed by algorithm.
pub struct LayoutRegistry {
    providers: Vec<Box<dyn LayoutProvider>>,
}

impl LayoutRegistry {
    /// Registry with every built-in provider.
    pub fn new() -> Self {
        let mut registry = Self {
            providers: Vec::new(),
        };

        registry.register(Box::new(layered::LayeredLayout));
        registry.register(Box::new(circular::CircularLayout));

        registry
    }

    /// Register a provider, replacing any previous one for the same id.
    pub fn register(&mut self, provider: Box<dyn LayoutProvider>) {
        self.providers.retain(|p| p.id() != provider.id());
        self.providers.push(provider);
    }

    pub fn find(&self, algorithm: LayoutAlgorithm) -> Option<&dyn LayoutProvider> {
        self.providers
            .iter()
            .find(|p| p.id() == algorithm)
            .map(|p| p.as_ref())
    }

    /// Run exactly one algorithm.
    pub fn layout(&self, view: &SubGraph, algorithm: LayoutAlgorithm) -> Result<Positions> {
        let provider = self.find(algorithm).ok_or_else(|| {
            CmdbMapError::Layout(format!("No provider registered for '{}'", algorithm))
        })?;
        provider.layout(view)
    }

    /// Try `requested`, then the remaining algorithms in preference order.
    ///
    /// Returns the positions together with the algorithm that produced them.
    pub fn layout_with_fallback(
        &self,
        view: &SubGraph,
        requested: LayoutAlgorithm,
    ) -> Result<(Positions, LayoutAlgorithm)> {
        let mut failures = Vec::new();

        for algorithm in requested.fallback_chain() {
            match self.layout(view, algorithm) {
                Ok(positions) => {
                    if algorithm != requested {
                        log::warn!("Layout '{}' not applicable, used '{}'", requested, algorithm);
                    }
                    return Ok((positions, algorithm));
                }
                Err(e) => {
                    log::debug!("Layout '{}' failed: {}", algorithm, e);
                    failures.push(format!("{}: {}", algorithm, e));
                }
            }
        }

        Err(CmdbMapError::Layout(format!(
            "Every layout failed ({})",
            failures.join("; ")
        )))
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Index `view` into a petgraph graph for the structural checks providers need.
pub(crate) fn index_view(view: &SubGraph) -> (DiGraph<&str, ()>, HashMap<&str, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut index = HashMap::new();
    for node in &view.nodes {
        index.insert(node.name.as_str(), graph.add_node(node.name.as_str()));
    }
    for edge in &view.edges {
        if let (Some(&a), Some(&b)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            graph.add_edge(a, b, ());
        }
    }
    (graph, index)
}
