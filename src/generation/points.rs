//! Sample point generation inside a region
//!
//! Produces candidate points with one of three strategies, then thins them
//! with a greedy minimum-distance filter. The candidate ORDER is part of the
//! contract: the filter keeps first-seen points, so raster-weighted
//! candidates are sorted by value descending before thinning to favour
//! high-value locations.

use geo::{BoundingRect, Centroid, Contains, Coord, Intersects, Point, Polygon, Rect};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{SamplingMethod, TessellationConfig};
use crate::error::{Result, TessellationError};
use crate::geom::{extend_deduplicated, ring_points};
use crate::raster::{is_nodata, RasterSource};

/// Greedy minimum-distance thinning over candidates in their given order
///
/// For each still-masked candidate, every other masked candidate closer
/// than `distance` is unmasked. Squared distances, no square root. The
/// initial mask lets callers pre-reject candidates (e.g. points outside
/// the region) without letting them suppress neighbours.
pub fn distance_filter(
    candidates: &[Coord<f64>],
    distance: f64,
    mask: &mut [bool],
) -> Vec<Coord<f64>> {
    debug_assert_eq!(candidates.len(), mask.len());
    let d2 = distance * distance;
    for i in 0..candidates.len() {
        if !mask[i] {
            continue;
        }
        for j in 0..candidates.len() {
            if j == i || !mask[j] {
                continue;
            }
            let dx = candidates[j].x - candidates[i].x;
            let dy = candidates[j].y - candidates[i].y;
            if dx * dx + dy * dy < d2 {
                mask[j] = false;
            }
        }
    }
    candidates
        .iter()
        .zip(mask.iter())
        .filter(|(_, &keep)| keep)
        .map(|(&coord, _)| coord)
        .collect()
}

/// Produce the sample point set for one region
///
/// `raster` is consumed only by [`SamplingMethod::RasterWeighted`] and must
/// be the layer named by the configuration.
///
/// # Errors
///
/// Returns `RasterMissing` when raster-weighted sampling is requested
/// without a raster layer.
pub fn sample_points(
    region: &Polygon<f64>,
    config: &TessellationConfig,
    raster: Option<&dyn RasterSource>,
) -> Result<Vec<Coord<f64>>> {
    let mut points = match config.sampling_method {
        SamplingMethod::Direct => ring_points(region),
        SamplingMethod::RasterWeighted => {
            let raster = raster.ok_or_else(|| {
                TessellationError::RasterMissing(
                    config
                        .sampling_raster
                        .clone()
                        .unwrap_or_else(|| "<unnamed sampling raster>".to_string()),
                )
            })?;
            raster_weighted_candidates(region, config, raster)?
        }
        SamplingMethod::RandomUniform => random_candidates(region, config)?,
    };
    if points.is_empty() {
        points.push(fallback_centroid(region));
    }
    if config.include_border && !config.border_before_distance_filter {
        // Border vertices added verbatim, never thinned
        extend_deduplicated(&mut points, &ring_points(region));
    }
    Ok(points)
}

fn raster_weighted_candidates(
    region: &Polygon<f64>,
    config: &TessellationConfig,
    raster: &dyn RasterSource,
) -> Result<Vec<Coord<f64>>> {
    let bounds = region_bounds(region)?;
    let expanded = Rect::new(
        Coord {
            x: bounds.min().x - 1.0,
            y: bounds.min().y - 1.0,
        },
        Coord {
            x: bounds.max().x + 1.0,
            y: bounds.max().y + 1.0,
        },
    );
    let transform = raster.transform();
    let window = transform.window(&expanded);
    let values = raster.read_window(&window);
    let nodata = raster.nodata();

    let mut candidates: Vec<(f64, Coord<f64>)> = Vec::new();
    let mut i = 0;
    for row in window.row_start..window.row_end {
        for col in window.col_start..window.col_end {
            let value = values[i];
            i += 1;
            if is_nodata(value, nodata) {
                continue;
            }
            let (x, y) = transform.pixel_center(row, col);
            if region.intersects(&Point::new(x, y)) {
                candidates.push((value, Coord { x, y }));
            }
        }
    }
    // Stable sort keeps raster scan order among equal values
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut coords: Vec<Coord<f64>> = candidates.into_iter().map(|(_, c)| c).collect();
    if config.include_border && config.border_before_distance_filter {
        coords.extend(ring_points(region));
    }
    let mut mask = vec![true; coords.len()];
    Ok(distance_filter(&coords, config.min_distance, &mut mask))
}

fn random_candidates(region: &Polygon<f64>, config: &TessellationConfig) -> Result<Vec<Coord<f64>>> {
    let bounds = region_bounds(region)?;
    let (min_x, min_y) = (bounds.min().x, bounds.min().y);
    let (max_x, max_y) = (bounds.max().x, bounds.max().y);
    let delta_x = max_x - min_x;
    let delta_y = max_y - min_y;
    let count =
        ((delta_x / config.min_distance + 1.0) * (delta_y / config.min_distance + 1.0) * 10.0)
            .ceil() as usize;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(count);
    for _ in 0..count {
        let x = if delta_x > 0.0 { rng.gen_range(min_x..max_x) } else { min_x };
        let y = if delta_y > 0.0 { rng.gen_range(min_y..max_y) } else { min_y };
        coords.push(Coord { x, y });
    }
    if config.include_border && config.border_before_distance_filter {
        coords.extend(ring_points(region));
    }
    // Points outside the region are pre-rejected but must not suppress
    // neighbours, hence the mask instead of filtering first
    let mut mask: Vec<bool> = coords
        .iter()
        .map(|c| region.contains(&Point::new(c.x, c.y)))
        .collect();
    Ok(distance_filter(&coords, config.min_distance, &mut mask))
}

fn region_bounds(region: &Polygon<f64>) -> Result<Rect<f64>> {
    region.bounding_rect().ok_or_else(|| {
        TessellationError::TessellationFailed("region has no bounding box".to_string())
    })
}

fn fallback_centroid(region: &Polygon<f64>) -> Coord<f64> {
    region
        .centroid()
        .map(|p| p.0)
        .or_else(|| region.bounding_rect().map(|r| r.center()))
        .unwrap_or(Coord { x: 0.0, y: 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TessellationConfigBuilder;
    use crate::raster::{GridRaster, RasterTransform};
    use geo::polygon;

    fn square(size: f64) -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: size, y: 0.0),
            (x: size, y: size),
            (x: 0.0, y: size),
        ]
    }

    fn min_pairwise_distance(points: &[Coord<f64>]) -> f64 {
        let mut min = f64::INFINITY;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let dx = points[i].x - points[j].x;
                let dy = points[i].y - points[j].y;
                min = min.min((dx * dx + dy * dy).sqrt());
            }
        }
        min
    }

    #[test]
    fn test_distance_filter_keeps_first_seen() {
        let candidates = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
        ];
        let mut mask = vec![true; 3];
        let kept = distance_filter(&candidates, 5.0, &mut mask);
        assert_eq!(kept, vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }]);
    }

    #[test]
    fn test_distance_filter_masked_candidates_do_not_suppress() {
        // The first candidate is pre-rejected; it must not knock out the
        // second one even though they are close
        let candidates = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }];
        let mut mask = vec![false, true];
        let kept = distance_filter(&candidates, 5.0, &mut mask);
        assert_eq!(kept, vec![Coord { x: 1.0, y: 0.0 }]);
    }

    #[test]
    fn test_random_sampling_distance_invariant() {
        let config = TessellationConfigBuilder::new()
            .seed(42)
            .min_distance(10.0)
            .unwrap()
            .build();
        let points = sample_points(&square(100.0), &config, None).unwrap();
        assert!(!points.is_empty());
        assert!(min_pairwise_distance(&points) >= 10.0);
    }

    #[test]
    fn test_random_sampling_deterministic() {
        let config = TessellationConfigBuilder::new()
            .seed(42)
            .min_distance(10.0)
            .unwrap()
            .build();
        let a = sample_points(&square(100.0), &config, None).unwrap();
        let b = sample_points(&square(100.0), &config, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let base = TessellationConfigBuilder::new().min_distance(10.0).unwrap();
        let a = sample_points(&square(100.0), &base.clone().seed(1).build(), None).unwrap();
        let b = sample_points(&square(100.0), &base.seed(2).build(), None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_direct_sampling_uses_vertices() {
        let config = TessellationConfigBuilder::new()
            .sampling_method(SamplingMethod::Direct)
            .build();
        let points = sample_points(&square(10.0), &config, None).unwrap();
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn test_raster_weighted_requires_raster() {
        let config = TessellationConfigBuilder::new()
            .sampling_method(SamplingMethod::RasterWeighted)
            .sampling_raster("chm")
            .build();
        let err = sample_points(&square(10.0), &config, None).unwrap_err();
        assert!(matches!(err, TessellationError::RasterMissing(_)));
    }

    #[test]
    fn test_raster_weighted_prefers_high_values() {
        // 4x4 grid over a 4x4 square; one pixel has a much higher value and
        // must survive thinning with a distance larger than the region
        let mut raster = GridRaster::filled(
            "chm",
            RasterTransform::north_up(0.0, 4.0, 1.0),
            -1.0,
            4,
            4,
            1.0,
        );
        raster.set(2, 1, 9.0);
        let config = TessellationConfigBuilder::new()
            .sampling_method(SamplingMethod::RasterWeighted)
            .sampling_raster("chm")
            .min_distance(100.0)
            .unwrap()
            .build();
        let points = sample_points(&square(4.0), &config, Some(&raster)).unwrap();
        assert_eq!(points.len(), 1);
        // Row 2 col 1 center with a north-up origin at y=4
        assert_eq!(points[0], Coord { x: 1.5, y: 1.5 });
    }

    #[test]
    fn test_empty_result_falls_back_to_centroid() {
        // Nothing but nodata: no candidates survive
        let raster = GridRaster::filled(
            "chm",
            RasterTransform::north_up(0.0, 4.0, 1.0),
            -1.0,
            4,
            4,
            -1.0,
        );
        let config = TessellationConfigBuilder::new()
            .sampling_method(SamplingMethod::RasterWeighted)
            .sampling_raster("chm")
            .build();
        let points = sample_points(&square(4.0), &config, Some(&raster)).unwrap();
        assert_eq!(points, vec![Coord { x: 2.0, y: 2.0 }]);
    }

    #[test]
    fn test_border_after_thinning_added_verbatim() {
        let config = TessellationConfigBuilder::new()
            .seed(42)
            .min_distance(50.0)
            .unwrap()
            .include_border(true, false)
            .build();
        let points = sample_points(&square(10.0), &config, None).unwrap();
        for corner in ring_points(&square(10.0)) {
            assert!(points.contains(&corner));
        }
    }
}
