//! Delaunay triangulation as the alternative tessellation
//!
//! A thin wrapper over the triangulation engine: every inner face becomes
//! one triangular cell. Fewer than three distinct points (or a collinear
//! set) simply produce no triangles.

use geo::{Coord, LineString, Polygon};
use spade::{DelaunayTriangulation, Point2, Triangulation};

use crate::error::{Result, TessellationError};

/// Compute the Delaunay triangles of a point set
///
/// # Errors
///
/// Returns `TessellationFailed` when the triangulation engine rejects the
/// point set (non-finite coordinates).
pub fn delaunay_triangles(points: &[Coord<f64>]) -> Result<Vec<Polygon<f64>>> {
    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    for &coord in points {
        triangulation
            .insert(Point2::new(coord.x, coord.y))
            .map_err(|error| {
                TessellationError::TessellationFailed(format!(
                    "point insertion failed at ({}, {}): {:?}",
                    coord.x, coord.y, error
                ))
            })?;
    }

    let triangles = triangulation
        .inner_faces()
        .map(|face| {
            let vertices = face.vertices();
            let ring: Vec<Coord<f64>> = vertices
                .iter()
                .map(|vertex| {
                    let position = vertex.position();
                    Coord { x: position.x, y: position.y }
                })
                .collect();
            Polygon::new(LineString::from(ring), Vec::new())
        })
        .collect();
    Ok(triangles)
}
