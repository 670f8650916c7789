//! Split regions and exclusion geometry
//!
//! The run geometry is optionally divided by a split source (pre-existing
//! polygons carrying attribute fields); each resulting single-polygon part
//! is tessellated independently and its cells inherit the parent feature's
//! attributes.

use geo::{Area, BooleanOps, MultiPolygon, Polygon};

use crate::geom::{flatten_polygons, to_multi};

/// One polygon feature of a split source with its attribute values
#[derive(Debug, Clone)]
pub struct SplitFeature {
    pub geometry: MultiPolygon<f64>,
    /// Attribute values in the configured `split_fields` order
    pub fields: Vec<String>,
}

impl SplitFeature {
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

/// Pre-existing sub-polygons dividing the run geometry into independent
/// tessellation units
#[derive(Debug, Clone, Default)]
pub struct SplitSource {
    pub features: Vec<SplitFeature>,
}

impl SplitSource {
    pub fn new(features: Vec<SplitFeature>) -> Self {
        Self { features }
    }

    /// Keep only features matching an include predicate over their
    /// attribute values
    pub fn filtered(mut self, mut include: impl FnMut(&SplitFeature) -> bool) -> Self {
        self.features.retain(|feature| include(feature));
        self
    }
}

/// Polygons subtracted from the run geometry before tessellation and from
/// every cell after tessellation
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    pub before: Option<MultiPolygon<f64>>,
    pub after: Option<MultiPolygon<f64>>,
}

/// One single-polygon tessellation unit with its parent feature index
#[derive(Debug, Clone)]
pub struct SplitRegion {
    /// Index into the split source's features; `None` without a split source
    pub feature: Option<usize>,
    pub polygon: Polygon<f64>,
}

/// Subtract an optional exclusion geometry
pub fn subtract(geometry: &MultiPolygon<f64>, remove: Option<&MultiPolygon<f64>>) -> MultiPolygon<f64> {
    match remove {
        Some(remove) => geometry.difference(remove),
        None => geometry.clone(),
    }
}

/// Intersect the run geometry with each split feature and decompose the
/// results into single-polygon regions
///
/// Without a split source the whole geometry becomes one group of regions
/// with no parent feature.
pub fn split_regions(geometry: &MultiPolygon<f64>, split: Option<&SplitSource>) -> Vec<SplitRegion> {
    let mut regions = Vec::new();
    match split {
        Some(split) => {
            for (index, feature) in split.features.iter().enumerate() {
                let clipped = geometry.intersection(&feature.geometry);
                for polygon in flatten_polygons(clipped) {
                    regions.push(SplitRegion {
                        feature: Some(index),
                        polygon,
                    });
                }
            }
        }
        None => {
            for polygon in flatten_polygons(geometry.clone()) {
                regions.push(SplitRegion {
                    feature: None,
                    polygon,
                });
            }
        }
    }
    regions
}

/// Subtract exclusion geometry from one tessellated cell
pub fn remove_from_cell(cell: &Polygon<f64>, remove: Option<&MultiPolygon<f64>>) -> MultiPolygon<f64> {
    match remove {
        Some(remove) => to_multi(cell).difference(remove),
        None => to_multi(cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]
    }

    #[test]
    fn test_split_regions_without_source() {
        let geometry = MultiPolygon(vec![square(0.0, 0.0, 10.0)]);
        let regions = split_regions(&geometry, None);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].feature, None);
    }

    #[test]
    fn test_split_regions_clip_to_geometry() {
        let geometry = MultiPolygon(vec![square(0.0, 0.0, 10.0)]);
        let split = SplitSource::new(vec![
            SplitFeature {
                geometry: MultiPolygon(vec![square(-5.0, 0.0, 10.0)]),
                fields: vec!["west".into()],
            },
            SplitFeature {
                geometry: MultiPolygon(vec![square(20.0, 20.0, 5.0)]),
                fields: vec!["outside".into()],
            },
        ]);
        let regions = split_regions(&geometry, Some(&split));
        // The second feature does not intersect the run geometry
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].feature, Some(0));
        assert!((regions[0].polygon.unsigned_area() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_filtered_split_source() {
        let split = SplitSource::new(vec![
            SplitFeature {
                geometry: MultiPolygon(vec![square(0.0, 0.0, 4.0)]),
                fields: vec!["10".into()],
            },
            SplitFeature {
                geometry: MultiPolygon(vec![square(4.0, 0.0, 4.0)]),
                fields: vec!["20".into()],
            },
        ]);
        let filtered = split.filtered(|feature| feature.fields[0] == "10");
        assert_eq!(filtered.features.len(), 1);
    }

    #[test]
    fn test_subtract_exclusion() {
        let geometry = MultiPolygon(vec![square(0.0, 0.0, 10.0)]);
        let remove = MultiPolygon(vec![square(0.0, 0.0, 5.0)]);
        let result = subtract(&geometry, Some(&remove));
        assert!((result.unsigned_area() - 75.0).abs() < 1e-6);
    }
}
