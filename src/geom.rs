//! Small geometry helpers shared across the crate

use geo::{Coord, MultiPolygon, Polygon};

/// Wrap a polygon borrow in a single-part multi-polygon for boolean ops
pub fn to_multi(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon.clone()])
}

/// Decompose a multi-polygon into its single-polygon parts, dropping
/// empty parts
pub fn flatten_polygons(geometry: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    geometry
        .0
        .into_iter()
        .filter(|polygon| !polygon.exterior().0.is_empty())
        .collect()
}

/// All ring vertices of a polygon (exterior then interiors), with the
/// closing vertex of each ring skipped
pub fn ring_points(polygon: &Polygon<f64>) -> Vec<Coord<f64>> {
    let mut points = Vec::new();
    push_ring(&mut points, &polygon.exterior().0);
    for interior in polygon.interiors() {
        push_ring(&mut points, &interior.0);
    }
    points
}

fn push_ring(points: &mut Vec<Coord<f64>>, ring: &[Coord<f64>]) {
    // Rings repeat their first vertex at the end
    let take = ring.len().saturating_sub(1);
    points.extend_from_slice(&ring[..take]);
}

/// Append coordinates not already present, preserving order
pub fn extend_deduplicated(points: &mut Vec<Coord<f64>>, extra: &[Coord<f64>]) {
    let mut seen: std::collections::HashSet<(u64, u64)> = points
        .iter()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect();
    for &coord in extra {
        if seen.insert((coord.x.to_bits(), coord.y.to_bits())) {
            points.push(coord);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_ring_points_skip_closing_vertex() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ];
        let points = ring_points(&square);
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn test_ring_points_include_interiors() {
        let with_hole = Polygon::new(
            geo::LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
            vec![geo::LineString::from(vec![
                (4.0, 4.0),
                (6.0, 4.0),
                (6.0, 6.0),
                (4.0, 6.0),
            ])],
        );
        let points = ring_points(&with_hole);
        assert_eq!(points.len(), 8);
    }

    #[test]
    fn test_extend_deduplicated() {
        let mut points = vec![Coord { x: 1.0, y: 1.0 }, Coord { x: 2.0, y: 2.0 }];
        extend_deduplicated(
            &mut points,
            &[Coord { x: 2.0, y: 2.0 }, Coord { x: 3.0, y: 3.0 }],
        );
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Coord { x: 3.0, y: 3.0 });
    }
}
