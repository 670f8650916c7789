//! Tessellation configuration and builder
//!
//! This module provides the configuration surface for a tessellation run:
//! point sampling, cell construction, zonal statistics and chop assignment.

use std::collections::BTreeMap;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TessellationError};

/// Strategy used to place candidate sample points inside a region
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMethod {
    /// The region's own ring vertices become the points
    Direct,
    /// Pixel centers of a raster layer, preferred by descending value
    RasterWeighted,
    /// Seeded uniform draws over the region's bounding box
    RandomUniform,
}

impl SamplingMethod {
    /// Get the configuration name of this method
    pub fn name(self) -> &'static str {
        match self {
            SamplingMethod::Direct => "direct",
            SamplingMethod::RasterWeighted => "raster",
            SamplingMethod::RandomUniform => "random",
        }
    }
}

impl FromStr for SamplingMethod {
    type Err = TessellationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(SamplingMethod::Direct),
            "raster" => Ok(SamplingMethod::RasterWeighted),
            "random" => Ok(SamplingMethod::RandomUniform),
            other => Err(TessellationError::InvalidConfig(format!(
                "unknown point sampling method: '{}', known: 'direct', 'raster', 'random'",
                other
            ))),
        }
    }
}

/// Tessellation used to turn a point set into cells
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMethod {
    /// Voronoi diagram of the point set, clipped to the region
    Voronoi,
    /// Delaunay triangulation of the point set, clipped to the region
    Delaunay,
}

impl PolygonMethod {
    /// Get the configuration name of this method
    pub fn name(self) -> &'static str {
        match self {
            PolygonMethod::Voronoi => "voronoi",
            PolygonMethod::Delaunay => "delaunay",
        }
    }
}

impl FromStr for PolygonMethod {
    type Err = TessellationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "voronoi" => Ok(PolygonMethod::Voronoi),
            "delaunay" => Ok(PolygonMethod::Delaunay),
            other => Err(TessellationError::InvalidConfig(format!(
                "unknown tessellation polygon method: '{}', known: 'voronoi', 'delaunay'",
                other
            ))),
        }
    }
}

/// Aggregate statistics computable over a cell's valid pixels
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Min,
    Max,
    Mean,
    /// Population standard deviation
    Std,
    /// Population variance
    Var,
    Sum,
    Median,
    Count,
}

impl Statistic {
    /// Column-name fragment for this statistic
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Std => "std",
            Statistic::Var => "var",
            Statistic::Sum => "sum",
            Statistic::Median => "median",
            Statistic::Count => "count",
        }
    }
}

/// Named reducers evaluated over a cell's valid pixel buffer and mask
///
/// These replace free-form expressions with a closed set of derived metrics;
/// no dynamic code is ever evaluated.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// mean / population standard deviation
    MeanOverStd,
    /// max - min
    Range,
    /// Percentage of in-cell pixels carrying valid (non-nodata) data
    Coverage,
}

impl Formula {
    /// Column-name fragment for this formula
    pub fn name(self) -> &'static str {
        match self {
            Formula::MeanOverStd => "mean_div_std",
            Formula::Range => "range",
            Formula::Coverage => "coverage",
        }
    }
}

/// Configuration for one tessellation and chop-assignment run
///
/// Built through [`TessellationConfigBuilder`], which validates numeric
/// ranges. The same configuration with the same inputs always produces the
/// same cells, statistics and chop assignment.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TessellationConfig {
    /// Point placement strategy
    pub sampling_method: SamplingMethod,
    /// Raster layer name consumed by [`SamplingMethod::RasterWeighted`]
    pub sampling_raster: Option<String>,
    /// Minimum pairwise distance kept between sample points
    pub min_distance: f64,
    /// Include region ring vertices as sample points
    pub include_border: bool,
    /// Feed border vertices through distance thinning instead of appending
    /// them verbatim afterwards
    pub border_before_distance_filter: bool,
    /// Seed for the uniform sampling generator
    pub seed: u64,
    /// Tessellation method
    pub polygon_method: PolygonMethod,
    /// Vertex-reduction tolerance applied to region boundaries before
    /// sampling (0 disables simplification)
    pub simplify_tolerance: f64,
    /// Cells (and split regions) smaller than this area are dropped
    pub min_cell_area: f64,
    /// Aggregate statistics, in output column order
    pub stats: Vec<Statistic>,
    /// Percentile ranks in `[0, 100]`, in output column order
    pub percentiles: Vec<f64>,
    /// Derived reducers (output columns ordered by formula name)
    pub formulas: Vec<Formula>,
    /// Per raster-layer name, discrete values whose pixel-occupancy
    /// percentage is reported
    pub value_percentiles: BTreeMap<String, Vec<f64>>,
    /// Attribute fields copied from the split source onto every cell
    pub split_fields: Vec<String>,
    /// Subset of `split_fields` forming the chop grouping key
    pub split_key_fields: Vec<String>,
    /// Ordered area quotas, one per chop tranche
    pub divisions: Vec<f64>,
    /// Attribute column supplying each cell's priority value
    pub priority_field: String,
    /// Count cells touching only at isolated points as adjacent
    pub neighbor_corners: bool,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        TessellationConfigBuilder::new().build()
    }
}

/// Builder for [`TessellationConfig`] with validation
///
/// # Example
///
/// ```
/// use harvest_tessellation::{TessellationConfigBuilder, PolygonMethod, Statistic};
///
/// let config = TessellationConfigBuilder::new()
///     .seed(42)
///     .min_distance(10.0)
///     .unwrap()
///     .polygon_method(PolygonMethod::Voronoi)
///     .stats(vec![Statistic::Mean, Statistic::Std])
///     .build();
/// assert_eq!(config.seed, 42);
/// ```
#[derive(Debug, Clone)]
pub struct TessellationConfigBuilder {
    config: TessellationConfig,
}

impl TessellationConfigBuilder {
    /// Create a new builder with defaults
    ///
    /// Defaults: random sampling with seed 42, min distance 35, voronoi
    /// cells, simplify tolerance 1.0, min cell area 1.0, statistics
    /// `[min, max, mean, std, var]`, percentiles `[1, 25, 50, 75, 99]`,
    /// no divisions, corner contacts counted as adjacency.
    pub fn new() -> Self {
        Self {
            config: TessellationConfig {
                sampling_method: SamplingMethod::RandomUniform,
                sampling_raster: None,
                min_distance: 35.0,
                include_border: false,
                border_before_distance_filter: false,
                seed: 42,
                polygon_method: PolygonMethod::Voronoi,
                simplify_tolerance: 1.0,
                min_cell_area: 1.0,
                stats: vec![
                    Statistic::Min,
                    Statistic::Max,
                    Statistic::Mean,
                    Statistic::Std,
                    Statistic::Var,
                ],
                percentiles: vec![1.0, 25.0, 50.0, 75.0, 99.0],
                formulas: Vec::new(),
                value_percentiles: BTreeMap::new(),
                split_fields: Vec::new(),
                split_key_fields: Vec::new(),
                divisions: Vec::new(),
                priority_field: String::new(),
                neighbor_corners: true,
            },
        }
    }

    /// Set the point sampling method
    pub fn sampling_method(mut self, method: SamplingMethod) -> Self {
        self.config.sampling_method = method;
        self
    }

    /// Set the raster layer used by raster-weighted sampling
    pub fn sampling_raster(mut self, name: impl Into<String>) -> Self {
        self.config.sampling_raster = Some(name.into());
        self
    }

    /// Set the minimum pairwise point distance
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the distance is not strictly positive.
    pub fn min_distance(mut self, distance: f64) -> Result<Self> {
        if !(distance > 0.0) {
            return Err(TessellationError::InvalidConfig(format!(
                "minimum point distance must be > 0 (got {})",
                distance
            )));
        }
        self.config.min_distance = distance;
        Ok(self)
    }

    /// Include region ring vertices as sample points
    pub fn include_border(mut self, include: bool, before_distance_filter: bool) -> Self {
        self.config.include_border = include;
        self.config.border_before_distance_filter = before_distance_filter;
        self
    }

    /// Set the sampling seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the tessellation method
    pub fn polygon_method(mut self, method: PolygonMethod) -> Self {
        self.config.polygon_method = method;
        self
    }

    /// Set the boundary simplification tolerance (0 disables)
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the tolerance is negative.
    pub fn simplify_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if tolerance < 0.0 {
            return Err(TessellationError::InvalidConfig(format!(
                "simplify tolerance must be >= 0 (got {})",
                tolerance
            )));
        }
        self.config.simplify_tolerance = tolerance;
        Ok(self)
    }

    /// Set the minimum cell area
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the area is negative.
    pub fn min_cell_area(mut self, area: f64) -> Result<Self> {
        if area < 0.0 {
            return Err(TessellationError::InvalidConfig(format!(
                "minimum cell area must be >= 0 (got {})",
                area
            )));
        }
        self.config.min_cell_area = area;
        Ok(self)
    }

    /// Set the aggregate statistics (output column order)
    pub fn stats(mut self, stats: Vec<Statistic>) -> Self {
        self.config.stats = stats;
        self
    }

    /// Set the percentile ranks (output column order)
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if any rank lies outside `[0, 100]`.
    pub fn percentiles(mut self, percentiles: Vec<f64>) -> Result<Self> {
        for &p in &percentiles {
            if !(0.0..=100.0).contains(&p) {
                return Err(TessellationError::InvalidConfig(format!(
                    "percentile rank must be within [0, 100] (got {})",
                    p
                )));
            }
        }
        self.config.percentiles = percentiles;
        Ok(self)
    }

    /// Set the derived reducer formulas
    pub fn formulas(mut self, formulas: Vec<Formula>) -> Self {
        self.config.formulas = formulas;
        self
    }

    /// Request value-occupancy percentages for a raster layer
    pub fn value_percentiles(mut self, layer: impl Into<String>, values: Vec<f64>) -> Self {
        self.config.value_percentiles.insert(layer.into(), values);
        self
    }

    /// Set the split-source attribute fields copied onto cells and the
    /// subset forming the chop grouping key
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a key field is not among the fields.
    pub fn split_fields(mut self, fields: Vec<String>, key_fields: Vec<String>) -> Result<Self> {
        for key in &key_fields {
            if !fields.contains(key) {
                return Err(TessellationError::InvalidConfig(format!(
                    "split key field '{}' is not among the split fields",
                    key
                )));
            }
        }
        self.config.split_fields = fields;
        self.config.split_key_fields = key_fields;
        Ok(self)
    }

    /// Set the chop area quotas
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if any quota is not strictly positive.
    pub fn divisions(mut self, divisions: Vec<f64>) -> Result<Self> {
        for &quota in &divisions {
            if !(quota > 0.0) {
                return Err(TessellationError::InvalidConfig(format!(
                    "chop area quota must be > 0 (got {})",
                    quota
                )));
            }
        }
        self.config.divisions = divisions;
        Ok(self)
    }

    /// Set the attribute column used as each cell's priority value
    pub fn priority_field(mut self, field: impl Into<String>) -> Self {
        self.config.priority_field = field.into();
        self
    }

    /// Control whether point-only contacts count as adjacency
    pub fn neighbor_corners(mut self, corners: bool) -> Self {
        self.config.neighbor_corners = corners;
        self
    }

    /// Build the configuration
    pub fn build(self) -> TessellationConfig {
        self.config
    }
}

impl Default for TessellationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = TessellationConfigBuilder::new().build();
        assert_eq!(config.sampling_method, SamplingMethod::RandomUniform);
        assert_eq!(config.polygon_method, PolygonMethod::Voronoi);
        assert_eq!(config.min_distance, 35.0);
        assert_eq!(config.seed, 42);
        assert!(config.divisions.is_empty());
        assert!(config.neighbor_corners);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("direct".parse::<SamplingMethod>().unwrap(), SamplingMethod::Direct);
        assert_eq!("raster".parse::<SamplingMethod>().unwrap(), SamplingMethod::RasterWeighted);
        assert_eq!("random".parse::<SamplingMethod>().unwrap(), SamplingMethod::RandomUniform);
        assert_eq!("voronoi".parse::<PolygonMethod>().unwrap(), PolygonMethod::Voronoi);
        assert_eq!("delaunay".parse::<PolygonMethod>().unwrap(), PolygonMethod::Delaunay);
    }

    #[test]
    fn test_unknown_method_is_fatal() {
        let err = "hexagons".parse::<SamplingMethod>().unwrap_err();
        assert!(matches!(err, TessellationError::InvalidConfig(_)));
        let err = "hexagons".parse::<PolygonMethod>().unwrap_err();
        assert!(matches!(err, TessellationError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_min_distance() {
        assert!(TessellationConfigBuilder::new().min_distance(0.0).is_err());
        assert!(TessellationConfigBuilder::new().min_distance(-3.0).is_err());
    }

    #[test]
    fn test_invalid_percentile() {
        let result = TessellationConfigBuilder::new().percentiles(vec![50.0, 101.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_division() {
        let result = TessellationConfigBuilder::new().divisions(vec![20.0, 0.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_key_must_be_subset() {
        let result = TessellationConfigBuilder::new().split_fields(
            vec!["estate".into(), "block".into()],
            vec!["stand".into()],
        );
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = TessellationConfigBuilder::new()
            .seed(7)
            .priority_field("chm_mean")
            .build();
        let json = serde_json::to_string(&config).unwrap();
        let restored: TessellationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
