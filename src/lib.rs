//! Tessellation and priority-chop partitioning over polygon geometries.
//!
//! The crate takes a run geometry, samples points inside it, builds
//! Voronoi (or Delaunay) cells clipped to the geometry, computes zonal
//! statistics over caller-supplied raster layers and finally buckets the
//! cells into area-bounded, mutually non-adjacent chop tranches by
//! priority. Every stage is deterministic: the same configuration and
//! inputs always reproduce the same cells, statistics and tranches.
//!
//! # Example
//!
//! ```
//! use geo::{polygon, MultiPolygon};
//! use harvest_tessellation::{
//!     Exclusions, GridRaster, RasterTransform, Tessellation, TessellationConfigBuilder,
//! };
//!
//! let geometry = MultiPolygon(vec![polygon![
//!     (x: 0.0, y: 0.0),
//!     (x: 100.0, y: 0.0),
//!     (x: 100.0, y: 100.0),
//!     (x: 0.0, y: 100.0),
//! ]]);
//! let chm = GridRaster::filled(
//!     "chm",
//!     RasterTransform::north_up(0.0, 100.0, 1.0),
//!     -1.0,
//!     100,
//!     100,
//!     5.0,
//! );
//! let config = TessellationConfigBuilder::new()
//!     .seed(42)
//!     .min_distance(20.0)?
//!     .divisions(vec![30.0, 30.0])?
//!     .priority_field("chm_mean")
//!     .build();
//!
//! let run = Tessellation::generate(
//!     &config,
//!     &geometry,
//!     &[&chm],
//!     None,
//!     &Exclusions::default(),
//! )?;
//! assert_eq!(run.table().len(), run.cells().len());
//! # Ok::<(), harvest_tessellation::TessellationError>(())
//! ```

pub mod cell;
pub mod chops;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod geom;
pub mod pipeline;
pub mod raster;
pub mod region;
pub mod stats;
pub mod table;

pub use cell::Cell;
pub use chops::{adjacent, assign_chops, ChopAssignments, ChopCell};
pub use config::{
    Formula, PolygonMethod, SamplingMethod, Statistic, TessellationConfig,
    TessellationConfigBuilder,
};
pub use error::{Result, TessellationError};
pub use export::{Exporter, MemoryExporter};
pub use generation::{delaunay_triangles, distance_filter, sample_points, voronoi_polygons};
pub use pipeline::{Tessellation, AREA_FRACTION_COLUMN};
pub use raster::{GridRaster, RasterSource, RasterTransform, Window};
pub use region::{Exclusions, SplitFeature, SplitRegion, SplitSource};
pub use table::CellTable;
