//! Export seam for tessellation results
//!
//! File-format output (GeoPackage layers and friends) lives outside this
//! crate; callers implement [`Exporter`] over whatever sink they need. The
//! in-memory implementation mostly serves tests and callers that post-process
//! results directly.

use geo::Coord;

use crate::cell::Cell;
use crate::error::Result;
use crate::table::CellTable;

/// Sink for a finished tessellation run
pub trait Exporter {
    /// Receive the cell polygons with their attribute table
    fn export_cells(&mut self, cells: &[Cell], table: &CellTable) -> Result<()>;

    /// Receive the sample points the cells were built from
    fn export_points(&mut self, points: &[Coord<f64>]) -> Result<()>;
}

/// [`Exporter`] that clones everything into memory
#[derive(Debug, Clone, Default)]
pub struct MemoryExporter {
    pub cells: Vec<Cell>,
    pub table: CellTable,
    pub points: Vec<Coord<f64>>,
}

impl Exporter for MemoryExporter {
    fn export_cells(&mut self, cells: &[Cell], table: &CellTable) -> Result<()> {
        self.cells = cells.to_vec();
        self.table = table.clone();
        Ok(())
    }

    fn export_points(&mut self, points: &[Coord<f64>]) -> Result<()> {
        self.points = points.to_vec();
        Ok(())
    }
}
