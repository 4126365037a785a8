//! Nodes evenly spaced on a unit circle.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::Result;
use crate::graph::SubGraph;
use crate::layout::{LayoutAlgorithm, LayoutProvider, Point, Positions};

/// Places the view's nodes clockwise from the top of a unit circle, in view
/// order. Applies to any view.
pub struct CircularLayout;

impl LayoutProvider for CircularLayout {
    fn id(&self) -> LayoutAlgorithm {
        LayoutAlgorithm::Circular
    }

    fn layout(&self, view: &SubGraph) -> Result<Positions> {
        let count = view.node_count();
        let mut positions = Positions::new();
        if count == 1 {
            positions.insert(view.nodes[0].name.clone(), Point::new(0.0, 0.0));
            return Ok(positions);
        }
        for (i, node) in view.nodes.iter().enumerate() {
            let angle = FRAC_PI_2 - TAU * i as f64 / count as f64;
            positions.insert(node.name.clone(), Point::new(angle.cos(), angle.sin()));
        }
        Ok(positions)
    }
}
