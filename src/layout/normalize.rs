//! Anchor the root node in the upper-left region of the canvas.

use serde::Serialize;

use crate::layout::{Point, Positions};

/// Default inset of the root anchor, as a fraction of canvas width/height.
pub const DEFAULT_ROOT_INSET: f64 = 0.1;

/// Axis-aligned bounds of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Bounds of `positions`; all zero when empty.
    pub fn of(positions: &Positions) -> Self {
        let mut points = positions.values();
        let Some(first) = points.next() else {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            };
        };
        points.fold(
            Self {
                min_x: first.x,
                min_y: first.y,
                max_x: first.x,
                max_y: first.y,
            },
            |b, p| Self {
                min_x: b.min_x.min(p.x),
                min_y: b.min_y.min(p.y),
                max_x: b.max_x.max(p.x),
                max_y: b.max_y.max(p.y),
            },
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Point `inset` of the width in from the left and `inset` of the
    /// height down from the top (y grows upwards).
    pub fn anchor(&self, inset: f64) -> Point {
        Point::new(
            self.min_x + inset * self.width(),
            self.max_y - inset * self.height(),
        )
    }
}

/// Non-fatal conditions reported by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeWarning {
    /// The root had no raw position; positions were left unchanged.
    RootMissing(String),
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub positions: Positions,
    /// Vector added to every raw position.
    pub translation: Point,
    /// Bounds of the raw positions. The renderer keeps this viewport so the
    /// translated root shows at the anchor.
    pub canvas: BoundingBox,
    pub warning: Option<NormalizeWarning>,
}

/// Translate every position by the vector that moves `root` onto the
/// canvas anchor. Geometry between nodes is unchanged.
pub fn normalize(raw: &Positions, root: &str, inset: f64) -> Normalized {
    let canvas = BoundingBox::of(raw);

    let Some(root_point) = raw.get(root) else {
        log::warn!("Root '{}' has no layout position, positions left unchanged", root);
        return Normalized {
            positions: raw.clone(),
            translation: Point::new(0.0, 0.0),
            canvas,
            warning: Some(NormalizeWarning::RootMissing(root.to_string())),
        };
    };

    let anchor = canvas.anchor(inset);
    let translation = Point::new(anchor.x - root_point.x, anchor.y - root_point.y);

    let positions = raw
        .iter()
        .map(|(name, p)| {
            (
                name.clone(),
                Point::new(p.x + translation.x, p.y + translation.y),
            )
        })
        .collect();

    Normalized {
        positions,
        translation,
        canvas,
        warning: None,
    }
}
