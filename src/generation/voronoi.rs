//! Voronoi cell construction from a Delaunay triangulation
//!
//! Each site's Voronoi polygon is assembled from the circumcenters of the
//! triangles adjacent to it, ordered by angle around the site. Four ghost
//! sites far outside the point set's bounding box bound every real cell,
//! so no infinite edges have to be handled; the oversized ghost-adjacent
//! cells are cut down when the caller clips cells to the region.

use std::collections::HashMap;

use geo::{Coord, LineString, Polygon};
use spade::{DelaunayTriangulation, Point2, Triangulation};

use crate::error::{Result, TessellationError};

/// How far the ghost sites sit outside the point set, as a multiple of the
/// bounding-box extent
const GHOST_FACTOR: f64 = 3.0;

/// Compute one bounded Voronoi polygon per distinct input point
///
/// Output polygons are convex and unclipped; order follows the input
/// points (duplicates yield no extra polygon).
///
/// # Errors
///
/// Returns `TessellationFailed` when the triangulation engine rejects the
/// point set (non-finite coordinates).
pub fn voronoi_polygons(points: &[Coord<f64>]) -> Result<Vec<Polygon<f64>>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }
    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();

    for ghost in ghost_sites(points) {
        insert(&mut triangulation, ghost)?;
    }
    let ghost_handles = 4;

    // Map triangulation vertex handles back to first-seen input order
    let mut site_order: HashMap<usize, usize> = HashMap::new();
    for &coord in points {
        let handle = insert(&mut triangulation, coord)?;
        let next = site_order.len();
        site_order.entry(handle).or_insert(next);
    }

    // Collect each inner face's circumcenter under all three of its vertices
    let mut face_centers: HashMap<usize, Vec<Coord<f64>>> = HashMap::new();
    for face in triangulation.inner_faces() {
        let vertices = face.vertices();
        let positions = [
            vertices[0].position(),
            vertices[1].position(),
            vertices[2].position(),
        ];
        let center = circumcenter(
            Coord { x: positions[0].x, y: positions[0].y },
            Coord { x: positions[1].x, y: positions[1].y },
            Coord { x: positions[2].x, y: positions[2].y },
        );
        for vertex in vertices {
            face_centers
                .entry(vertex.fix().index())
                .or_default()
                .push(center);
        }
    }

    let mut polygons: Vec<Option<Polygon<f64>>> = vec![None; site_order.len()];
    for vertex in triangulation.vertices() {
        let handle = vertex.fix().index();
        if handle < ghost_handles {
            continue;
        }
        let Some(&order) = site_order.get(&handle) else {
            continue;
        };
        let Some(centers) = face_centers.get(&handle) else {
            continue;
        };
        if centers.len() < 3 {
            continue;
        }
        let position = vertex.position();
        let site = Coord { x: position.x, y: position.y };
        polygons[order] = Some(polygon_around(site, centers.clone()));
    }

    Ok(polygons.into_iter().flatten().collect())
}

fn insert(
    triangulation: &mut DelaunayTriangulation<Point2<f64>>,
    coord: Coord<f64>,
) -> Result<usize> {
    triangulation
        .insert(Point2::new(coord.x, coord.y))
        .map(|handle| handle.index())
        .map_err(|error| {
            TessellationError::TessellationFailed(format!(
                "point insertion failed at ({}, {}): {:?}",
                coord.x, coord.y, error
            ))
        })
}

/// Four sites far outside the point set, whose hull contains every real
/// site with ample margin
fn ghost_sites(points: &[Coord<f64>]) -> [Coord<f64>; 4] {
    let mut min = points[0];
    let mut max = points[0];
    for &p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    let margin = GHOST_FACTOR * ((max.x - min.x) + (max.y - min.y) + 1.0);
    [
        Coord { x: min.x - margin, y: min.y - margin },
        Coord { x: max.x + margin, y: min.y - margin },
        Coord { x: max.x + margin, y: max.y + margin },
        Coord { x: min.x - margin, y: max.y + margin },
    ]
}

/// Circumcenter of a triangle, falling back to the centroid when the
/// triangle is numerically degenerate
fn circumcenter(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Coord<f64> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < f64::EPSILON {
        return Coord {
            x: (a.x + b.x + c.x) / 3.0,
            y: (a.y + b.y + c.y) / 3.0,
        };
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    Coord {
        x: (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
        y: (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
    }
}

/// Order cell vertices counter-clockwise around the site and close the ring
fn polygon_around(site: Coord<f64>, mut centers: Vec<Coord<f64>>) -> Polygon<f64> {
    centers.sort_by(|p, q| {
        let pa = (p.y - site.y).atan2(p.x - site.x);
        let qa = (q.y - site.y).atan2(q.x - site.x);
        pa.partial_cmp(&qa).unwrap_or(std::cmp::Ordering::Equal)
    });
    centers.dedup();
    Polygon::new(LineString::from(centers), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point};

    #[test]
    fn test_single_point_yields_one_cell() {
        let cells = voronoi_polygons(&[Coord { x: 5.0, y: 5.0 }]).unwrap();
        assert_eq!(cells.len(), 1);
        assert!(cells[0].contains(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_cells_contain_their_sites() {
        let sites = vec![
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 9.0, y: 1.5 },
            Coord { x: 5.0, y: 8.0 },
            Coord { x: 2.0, y: 6.0 },
            Coord { x: 7.5, y: 5.5 },
        ];
        let cells = voronoi_polygons(&sites).unwrap();
        assert_eq!(cells.len(), sites.len());
        for (site, cell) in sites.iter().zip(&cells) {
            assert!(
                cell.contains(&Point::new(site.x, site.y)),
                "cell should contain its site ({}, {})",
                site.x,
                site.y
            );
            assert!(cell.unsigned_area() > 0.0);
        }
    }

    #[test]
    fn test_duplicate_sites_collapse() {
        let sites = vec![
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 4.0, y: 4.0 },
        ];
        let cells = voronoi_polygons(&sites).unwrap();
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_non_finite_point_is_rejected() {
        let err = voronoi_polygons(&[
            Coord { x: 0.0, y: 0.0 },
            Coord { x: f64::NAN, y: 1.0 },
        ])
        .unwrap_err();
        assert!(matches!(err, TessellationError::TessellationFailed(_)));
    }

    #[test]
    fn test_circumcenter_equidistant() {
        let center = circumcenter(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
            Coord { x: 0.0, y: 4.0 },
        );
        assert!((center.x - 2.0).abs() < 1e-12);
        assert!((center.y - 2.0).abs() < 1e-12);
    }
}
