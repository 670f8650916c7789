//! Zonal statistics over tessellated cells
//!
//! For every raster layer and cell, reads the pixel window covering the
//! cell, masks pixel centers falling inside the cell polygon, filters out
//! nodata and computes the configured aggregates, percentiles, derived
//! reducers and value-occupancy percentages. Windows and masks are cached
//! per cell and shared between rasters with identical affine transforms,
//! so repeated reads never re-derive the mask.

use std::collections::HashMap;

use geo::{Coord, Intersects, Point, Rect};

use crate::cell::Cell;
use crate::config::{Formula, Statistic, TessellationConfig};
use crate::raster::{is_nodata, RasterSource, Window};

/// Format a number for use inside a column name (integral values lose the
/// fractional part: `50`, not `50.0`)
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Full ordered statistic column list for the given raster layer names
///
/// The schema is fixed before any cell is processed: layers in input
/// order, then per layer the configured statistics, percentile ranks,
/// formulas (ordered by name) and sorted value-occupancy values.
pub fn schema_columns(config: &TessellationConfig, layer_names: &[&str]) -> Vec<String> {
    let formulas = sorted_formulas(config);
    let mut columns = Vec::new();
    for name in layer_names {
        for stat in &config.stats {
            columns.push(format!("{}_{}", name, stat.name()));
        }
        for &rank in &config.percentiles {
            columns.push(format!("{}_{}_percentile", name, format_number(rank)));
        }
        for formula in &formulas {
            columns.push(format!("{}_{}", name, formula.name()));
        }
        for &value in &sorted_values(config, name) {
            columns.push(format!("{}_value_{}_percentile", name, format_number(value)));
        }
    }
    columns
}

/// Compute all statistic columns for the given cells and raster layers
///
/// Returns `(column name, per-cell values)` pairs in schema order. Purely
/// computational: identical inputs always produce identical outputs.
pub fn compute_zonal_stats(
    cells: &[Cell],
    rasters: &[&dyn RasterSource],
    config: &TessellationConfig,
) -> Vec<(String, Vec<f64>)> {
    let formulas = sorted_formulas(config);
    // One window/mask cache per cell, shared across rasters with the same
    // transform and dropped when this pass ends
    let mut caches: Vec<WindowCache> = vec![WindowCache::new(); cells.len()];

    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
    for raster in rasters {
        let name = raster.name().to_string();
        let values = sorted_values(config, &name);
        let width = config.stats.len() + config.percentiles.len() + formulas.len() + values.len();

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(cells.len());
        for (cell, cache) in cells.iter().zip(caches.iter_mut()) {
            rows.push(cell_row(cell, cache, *raster, config, &formulas, &values, width));
        }

        let layer_columns = schema_columns(config, &[name.as_str()]);
        for (offset, column) in layer_columns.into_iter().enumerate() {
            columns.push((column, rows.iter().map(|row| row[offset]).collect()));
        }
    }
    columns
}

/// Per-cell cache of `(window, in-cell mask)` keyed by transform bits
#[derive(Debug, Clone, Default)]
struct WindowCache {
    entries: HashMap<[u64; 4], (Window, Vec<bool>)>,
}

impl WindowCache {
    fn new() -> Self {
        Self::default()
    }
}

fn cell_row(
    cell: &Cell,
    cache: &mut WindowCache,
    raster: &dyn RasterSource,
    config: &TessellationConfig,
    formulas: &[Formula],
    values: &[f64],
    width: usize,
) -> Vec<f64> {
    if cell.is_empty() {
        return vec![f64::NAN; width];
    }

    let transform = raster.transform();
    let (window, mask) = cache.entries.entry(transform.key()).or_insert_with(|| {
        // Window over the cell bounds expanded by one unit on the min sides
        let expanded = Rect::new(
            Coord {
                x: cell.bounds.min().x - 1.0,
                y: cell.bounds.min().y - 1.0,
            },
            cell.bounds.max(),
        );
        let window = transform.window(&expanded);
        let mut mask = Vec::with_capacity(window.len());
        for row in window.row_start..window.row_end {
            for col in window.col_start..window.col_end {
                let (x, y) = transform.pixel_center(row, col);
                mask.push(cell.geometry.intersects(&Point::new(x, y)));
            }
        }
        (window, mask)
    });

    let buffer = raster.read_window(window);
    let nodata = raster.nodata();
    let data: Vec<f64> = buffer
        .iter()
        .zip(mask.iter())
        .filter(|(&value, &inside)| inside && !is_nodata(value, nodata))
        .map(|(&value, _)| value)
        .collect();
    if data.is_empty() {
        return vec![f64::NAN; width];
    }
    let mask_count = mask.iter().filter(|&&inside| inside).count();

    let mut sorted = data.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut row = Vec::with_capacity(width);
    for &stat in &config.stats {
        row.push(compute_statistic(stat, &data, &sorted));
    }
    for &rank in &config.percentiles {
        row.push(percentile(&sorted, rank));
    }
    for &formula in formulas {
        row.push(compute_formula(formula, &data, mask_count));
    }
    for &value in values {
        let count = data.iter().filter(|&&v| v == value).count();
        row.push(100.0 * count as f64 / data.len() as f64);
    }
    row
}

fn sorted_formulas(config: &TessellationConfig) -> Vec<Formula> {
    let mut formulas = config.formulas.clone();
    formulas.sort_by_key(|formula| formula.name());
    formulas
}

fn sorted_values(config: &TessellationConfig, layer: &str) -> Vec<f64> {
    let mut values = config
        .value_percentiles
        .get(layer)
        .cloned()
        .unwrap_or_default();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values
}

fn compute_statistic(stat: Statistic, data: &[f64], sorted: &[f64]) -> f64 {
    let n = data.len() as f64;
    match stat {
        Statistic::Min => sorted[0],
        Statistic::Max => sorted[sorted.len() - 1],
        Statistic::Mean => data.iter().sum::<f64>() / n,
        Statistic::Std => variance(data).sqrt(),
        Statistic::Var => variance(data),
        Statistic::Sum => data.iter().sum(),
        Statistic::Median => percentile(sorted, 50.0),
        Statistic::Count => n,
    }
}

/// Population variance
fn variance(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Percentile with linear interpolation between closest ranks
///
/// `sorted` must be ascending and non-empty.
pub fn percentile(sorted: &[f64], rank: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let position = rank / 100.0 * (n - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
}

fn compute_formula(formula: Formula, data: &[f64], mask_count: usize) -> f64 {
    match formula {
        Formula::MeanOverStd => {
            let mean = data.iter().sum::<f64>() / data.len() as f64;
            mean / variance(data).sqrt()
        }
        Formula::Range => {
            let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            max - min
        }
        Formula::Coverage => {
            if mask_count == 0 {
                f64::NAN
            } else {
                100.0 * data.len() as f64 / mask_count as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TessellationConfigBuilder;
    use crate::raster::{GridRaster, RasterTransform};
    use approx::assert_relative_eq;
    use geo::polygon;

    fn cell(x0: f64, y0: f64, size: f64) -> Cell {
        Cell::new(
            polygon![
                (x: x0, y: y0),
                (x: x0 + size, y: y0),
                (x: x0 + size, y: y0 + size),
                (x: x0, y: y0 + size),
            ],
            Vec::new(),
            f64::NAN,
        )
    }

    fn ramp_raster() -> GridRaster {
        // 8x8 grid over (0,0)..(8,8); value = row * 8 + col
        let data: Vec<f64> = (0..64).map(|i| i as f64).collect();
        GridRaster::new("ramp", RasterTransform::north_up(0.0, 8.0, 1.0), -1.0, 8, 8, data)
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = vec![0.0, 10.0, 20.0, 30.0];
        assert_relative_eq!(percentile(&sorted, 0.0), 0.0);
        assert_relative_eq!(percentile(&sorted, 50.0), 15.0);
        assert_relative_eq!(percentile(&sorted, 100.0), 30.0);
        assert_relative_eq!(percentile(&sorted, 25.0), 7.5);
    }

    #[test]
    fn test_schema_matches_computed_columns() {
        let config = TessellationConfigBuilder::new()
            .stats(vec![Statistic::Mean, Statistic::Std])
            .percentiles(vec![25.0, 75.0])
            .unwrap()
            .formulas(vec![Formula::Range, Formula::MeanOverStd])
            .value_percentiles("ramp", vec![1.0, 0.0])
            .build();
        let raster = ramp_raster();
        let cells = vec![cell(0.0, 0.0, 4.0)];
        let columns = compute_zonal_stats(&cells, &[&raster], &config);
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        let schema = schema_columns(&config, &["ramp"]);
        assert_eq!(names, schema.iter().map(String::as_str).collect::<Vec<_>>());
        // Formulas ordered by name, values sorted ascending
        assert_eq!(
            schema,
            vec![
                "ramp_mean",
                "ramp_std",
                "ramp_25_percentile",
                "ramp_75_percentile",
                "ramp_mean_div_std",
                "ramp_range",
                "ramp_value_0_percentile",
                "ramp_value_1_percentile",
            ]
        );
    }

    #[test]
    fn test_mean_over_known_window() {
        let config = TessellationConfigBuilder::new()
            .stats(vec![Statistic::Mean, Statistic::Count])
            .percentiles(vec![])
            .unwrap()
            .build();
        let raster = ramp_raster();
        // Bottom-left 2x2 cell covers pixel centers (0.5,0.5) and (1.5,1.5)
        // etc: rows 6..8, cols 0..2 -> values 48,49,56,57
        let cells = vec![cell(0.0, 0.0, 2.0)];
        let columns = compute_zonal_stats(&cells, &[&raster], &config);
        let mean = &columns[0].1;
        let count = &columns[1].1;
        assert_relative_eq!(count[0], 4.0);
        assert_relative_eq!(mean[0], 52.5);
    }

    #[test]
    fn test_idempotent() {
        let config = TessellationConfigBuilder::new()
            .formulas(vec![Formula::Coverage])
            .build();
        let raster = ramp_raster();
        let cells = vec![cell(1.0, 1.0, 5.0), cell(4.0, 4.0, 3.0)];
        let first = compute_zonal_stats(&cells, &[&raster], &config);
        let second = compute_zonal_stats(&cells, &[&raster], &config);
        for ((name_a, col_a), (name_b, col_b)) in first.iter().zip(second.iter()) {
            assert_eq!(name_a, name_b);
            for (a, b) in col_a.iter().zip(col_b.iter()) {
                assert!((a == b) || (a.is_nan() && b.is_nan()));
            }
        }
    }

    #[test]
    fn test_nodata_only_cell_is_nan() {
        let raster = GridRaster::filled(
            "empty",
            RasterTransform::north_up(0.0, 8.0, 1.0),
            255.0,
            8,
            8,
            255.0,
        );
        let config = TessellationConfigBuilder::new().build();
        let cells = vec![cell(0.0, 0.0, 4.0)];
        let columns = compute_zonal_stats(&cells, &[&raster], &config);
        for (_, values) in &columns {
            assert!(values[0].is_nan());
        }
    }

    #[test]
    fn test_value_occupancy_half() {
        // 2x2 cell over four pixels, two of which are zero
        let mut raster = GridRaster::filled(
            "mask",
            RasterTransform::north_up(0.0, 2.0, 1.0),
            -1.0,
            2,
            2,
            1.0,
        );
        raster.set(0, 0, 0.0);
        raster.set(1, 1, 0.0);
        let config = TessellationConfigBuilder::new()
            .stats(vec![])
            .percentiles(vec![])
            .unwrap()
            .value_percentiles("mask", vec![0.0])
            .build();
        let cells = vec![cell(0.0, 0.0, 2.0)];
        let columns = compute_zonal_stats(&cells, &[&raster], &config);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].0, "mask_value_0_percentile");
        assert_relative_eq!(columns[0].1[0], 50.0);
    }

    #[test]
    fn test_cache_shared_between_rasters_with_same_transform() {
        let transform = RasterTransform::north_up(0.0, 8.0, 1.0);
        let low = GridRaster::filled("low", transform, -1.0, 8, 8, 1.0);
        let high = GridRaster::filled("high", transform, -1.0, 8, 8, 5.0);
        let config = TessellationConfigBuilder::new()
            .stats(vec![Statistic::Mean])
            .percentiles(vec![])
            .unwrap()
            .build();
        let cells = vec![cell(2.0, 2.0, 4.0)];
        let columns = compute_zonal_stats(&cells, &[&low as &dyn RasterSource, &high], &config);
        assert_relative_eq!(columns[0].1[0], 1.0);
        assert_relative_eq!(columns[1].1[0], 5.0);
    }
}
