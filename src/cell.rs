//! Tessellated cell structure

use geo::{Area, BoundingRect, Coord, Polygon, Rect};

/// One tessellated polygon, the atomic unit carrying statistics and a
/// chop assignment
///
/// A cell's identity is its index in the global cell list; geometry and
/// fields never change after construction.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Single-part polygon clipped to its parent split region
    pub geometry: Polygon<f64>,
    /// Axis-aligned bounding box of the geometry
    pub bounds: Rect<f64>,
    /// Attribute values inherited from the parent split feature, in
    /// configured field order
    pub fields: Vec<String>,
    /// Cell area divided by 1 % of the parent region area
    pub area_fraction: f64,
}

impl Cell {
    /// Create a cell, deriving its bounding box from the geometry
    pub fn new(geometry: Polygon<f64>, fields: Vec<String>, area_fraction: f64) -> Self {
        let bounds = geometry
            .bounding_rect()
            .unwrap_or_else(|| Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }));
        Self {
            geometry,
            bounds,
            fields,
            area_fraction,
        }
    }

    /// Absolute cell area
    #[inline]
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    /// Whether the geometry has no exterior ring
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geometry.exterior().0.is_empty()
    }
}
