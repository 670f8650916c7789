//! Cell construction for one split region
//!
//! Samples points, tessellates them, clips the raw faces to the region,
//! subtracts post-tessellation exclusions, decomposes multi-part results
//! and drops undersized fragments.

mod delaunay;
mod points;
mod voronoi;

pub use delaunay::delaunay_triangles;
pub use points::{distance_filter, sample_points};
pub use voronoi::voronoi_polygons;

use geo::{Area, BooleanOps, Coord, MultiPolygon, Polygon};

use crate::config::{PolygonMethod, TessellationConfig};
use crate::error::Result;
use crate::geom::{flatten_polygons, to_multi};
use crate::raster::RasterSource;
use crate::region::remove_from_cell;

/// Sample points in a region and build its clipped cells
///
/// Returns the sample point set alongside the surviving cell polygons.
/// Geometry-engine failures propagate as `TessellationFailed`; the caller
/// decides whether to skip the region or abort.
pub fn build_region_cells(
    region: &Polygon<f64>,
    config: &TessellationConfig,
    raster: Option<&dyn RasterSource>,
    remove_after: Option<&MultiPolygon<f64>>,
) -> Result<(Vec<Coord<f64>>, Vec<Polygon<f64>>)> {
    let points = sample_points(region, config, raster)?;

    let faces = match config.polygon_method {
        PolygonMethod::Voronoi => voronoi_polygons(&points)?,
        PolygonMethod::Delaunay => delaunay_triangles(&points)?,
    };

    let region_multi = to_multi(region);
    let mut cells = Vec::new();
    for face in &faces {
        let trimmed = remove_from_cell(face, remove_after);
        let clipped = region_multi.intersection(&trimmed);
        for part in flatten_polygons(clipped) {
            if part.unsigned_area() >= config.min_cell_area {
                cells.push(part);
            }
        }
    }
    Ok((points, cells))
}
