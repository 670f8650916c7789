//! End-to-end tessellation pipeline
//!
//! Ties the stages together: exclusion subtraction, split-region
//! decomposition, boundary simplification, per-region point sampling and
//! cell construction, zonal statistics and chop assignment. The result
//! holds the cells, the sample points and the assembled attribute table.

use geo::{Area, Coord, MultiPolygon, Simplify};
use log::{debug, info, warn};

use crate::cell::Cell;
use crate::chops::{assign_chops, ChopCell};
use crate::config::{SamplingMethod, TessellationConfig};
use crate::error::{Result, TessellationError};
use crate::export::Exporter;
use crate::generation::build_region_cells;
use crate::raster::RasterSource;
use crate::region::{split_regions, subtract, Exclusions, SplitSource};
use crate::stats::compute_zonal_stats;
use crate::table::CellTable;

/// Column carrying each cell's area as a percentage of its parent region
pub const AREA_FRACTION_COLUMN: &str = "split_area_percentile";

/// A finished tessellation run
#[derive(Debug, Clone)]
pub struct Tessellation {
    cells: Vec<Cell>,
    points: Vec<Coord<f64>>,
    table: CellTable,
}

impl Tessellation {
    /// Run the whole pipeline over a geometry
    ///
    /// `rasters` supplies every raster layer referenced by the
    /// configuration, both for sampling and for statistics. Regions whose
    /// tessellation fails are skipped with a warning; configuration-level
    /// problems abort the run.
    ///
    /// # Errors
    ///
    /// Returns `RasterMissing` when the configured sampling layer is not
    /// among `rasters`, and `MissingColumn` when chop divisions are set but
    /// the priority column does not exist.
    pub fn generate(
        config: &TessellationConfig,
        geometry: &MultiPolygon<f64>,
        rasters: &[&dyn RasterSource],
        split: Option<&SplitSource>,
        exclusions: &Exclusions,
    ) -> Result<Self> {
        let working = subtract(geometry, exclusions.before.as_ref());
        let whole_area = working.unsigned_area();
        let regions = split_regions(&working, split);
        info!(
            "tessellating {} region(s) over an area of {:.1}",
            regions.len(),
            whole_area
        );

        let sampling_raster = resolve_sampling_raster(config, rasters)?;

        let mut cells: Vec<Cell> = Vec::new();
        let mut points: Vec<Coord<f64>> = Vec::new();
        for region in &regions {
            let polygon = if config.simplify_tolerance > 0.0 {
                region.polygon.simplify(&config.simplify_tolerance)
            } else {
                region.polygon.clone()
            };
            let region_area = polygon.unsigned_area();
            if region_area < config.min_cell_area {
                debug!("skipping region with area {:.3}", region_area);
                continue;
            }

            let built = build_region_cells(
                &polygon,
                config,
                sampling_raster,
                exclusions.after.as_ref(),
            );
            let (region_points, region_cells) = match built {
                Ok(result) => result,
                Err(TessellationError::TessellationFailed(message)) => {
                    warn!("skipping region: {}", message);
                    continue;
                }
                Err(error) => return Err(error),
            };

            let (fields, parent_area) = match (region.feature, split) {
                (Some(index), Some(split)) => (
                    split.features[index].fields.clone(),
                    split.features[index].area(),
                ),
                _ => (Vec::new(), whole_area),
            };
            points.extend(region_points);
            for geometry in region_cells {
                let area = geometry.unsigned_area();
                let fraction = area / (0.01 * parent_area);
                cells.push(Cell::new(geometry, fields.clone(), fraction));
            }
        }
        debug!("built {} cells from {} sample points", cells.len(), points.len());

        let mut table = CellTable::new(cells.len());
        for (offset, field) in config.split_fields.iter().enumerate() {
            let values = cells
                .iter()
                .map(|cell| cell.fields.get(offset).cloned().unwrap_or_default())
                .collect();
            table.push_string_column(field.clone(), values);
        }
        table.push_numeric_column(
            AREA_FRACTION_COLUMN,
            cells.iter().map(|cell| cell.area_fraction).collect(),
        );
        for (name, values) in compute_zonal_stats(&cells, rasters, config) {
            table.push_numeric_column(name, values);
        }

        if config.divisions.is_empty() {
            table.set_chops(vec![0; cells.len()], vec![0; cells.len()]);
        } else {
            let priority = table
                .numeric_column(&config.priority_field)
                .ok_or_else(|| TessellationError::MissingColumn(config.priority_field.clone()))?
                .to_vec();
            let key_offsets: Vec<usize> = config
                .split_key_fields
                .iter()
                .filter_map(|key| config.split_fields.iter().position(|field| field == key))
                .collect();
            let chop_cells: Vec<ChopCell> = cells
                .iter()
                .zip(&priority)
                .map(|(cell, &value)| ChopCell {
                    geometry: &cell.geometry,
                    key: key_offsets
                        .iter()
                        .map(|&offset| cell.fields.get(offset).cloned().unwrap_or_default())
                        .collect(),
                    value,
                    area: cell.area_fraction,
                })
                .collect();
            let assignments = assign_chops(&chop_cells, &config.divisions, config.neighbor_corners);
            table.set_chops(assignments.initial, assignments.final_chops);
        }

        Ok(Self {
            cells,
            points,
            table,
        })
    }

    /// The tessellated cells, in construction order
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The sample points the cells were built from
    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    /// The attribute table, row-aligned with [`Tessellation::cells`]
    pub fn table(&self) -> &CellTable {
        &self.table
    }

    /// Hand the run's cells and points to an exporter
    pub fn export_to(&self, exporter: &mut dyn Exporter) -> Result<()> {
        exporter.export_cells(&self.cells, &self.table)?;
        exporter.export_points(&self.points)
    }
}

fn resolve_sampling_raster<'a>(
    config: &TessellationConfig,
    rasters: &[&'a dyn RasterSource],
) -> Result<Option<&'a dyn RasterSource>> {
    if config.sampling_method != SamplingMethod::RasterWeighted {
        return Ok(None);
    }
    let name = config.sampling_raster.as_deref().ok_or_else(|| {
        TessellationError::RasterMissing("<unnamed sampling raster>".to_string())
    })?;
    rasters
        .iter()
        .copied()
        .find(|raster| raster.name() == name)
        .map(Some)
        .ok_or_else(|| TessellationError::RasterMissing(name.to_string()))
}
