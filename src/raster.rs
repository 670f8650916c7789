//! Raster read interface consumed by sampling and zonal statistics
//!
//! Raster acquisition, format I/O and resampling live outside this crate;
//! callers hand in anything implementing [`RasterSource`]. Reads are
//! boundless: windows may extend past the grid and the outside is filled
//! with the nodata value.

use geo::Rect;

/// Affine mapping between pixel indices and world coordinates
///
/// `pixel_height` is negative for north-up rasters (row 0 at the top).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterTransform {
    /// World x of the grid's (0, 0) pixel corner
    pub origin_x: f64,
    /// World y of the grid's (0, 0) pixel corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl RasterTransform {
    /// North-up transform with square pixels
    pub fn north_up(origin_x: f64, origin_y: f64, resolution: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width: resolution,
            pixel_height: -resolution,
        }
    }

    /// Pixel row/col containing a world coordinate
    pub fn pixel_at(&self, x: f64, y: f64) -> (i64, i64) {
        let col = ((x - self.origin_x) / self.pixel_width).floor() as i64;
        let row = ((y - self.origin_y) / self.pixel_height).floor() as i64;
        (row, col)
    }

    /// World coordinates of a pixel center
    pub fn pixel_center(&self, row: i64, col: i64) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Smallest pixel window covering a world-coordinate bounding box
    pub fn window(&self, bounds: &Rect<f64>) -> Window {
        let (r0, c0) = self.pixel_at(bounds.min().x, bounds.min().y);
        let (r1, c1) = self.pixel_at(bounds.max().x, bounds.max().y);
        Window {
            row_start: r0.min(r1),
            row_end: r0.max(r1) + 1,
            col_start: c0.min(c1),
            col_end: c0.max(c1) + 1,
        }
    }

    /// Bit-exact hashable key identifying this transform
    ///
    /// Used to share cached cell windows between rasters with identical
    /// transforms.
    pub fn key(&self) -> [u64; 4] {
        [
            self.origin_x.to_bits(),
            self.origin_y.to_bits(),
            self.pixel_width.to_bits(),
            self.pixel_height.to_bits(),
        ]
    }
}

/// Half-open pixel row/col window; may extend outside the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row_start: i64,
    pub row_end: i64,
    pub col_start: i64,
    pub col_end: i64,
}

impl Window {
    pub fn height(&self) -> usize {
        (self.row_end - self.row_start).max(0) as usize
    }

    pub fn width(&self) -> usize {
        (self.col_end - self.col_start).max(0) as usize
    }

    pub fn len(&self) -> usize {
        self.height() * self.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named raster layer readable through windows
pub trait RasterSource {
    /// Layer name used for output column prefixes
    fn name(&self) -> &str;

    /// Pixel/world affine transform
    fn transform(&self) -> RasterTransform;

    /// Sentinel value for missing data
    fn nodata(&self) -> f64;

    /// Read a window row-major; pixels outside the grid are filled with
    /// the nodata value
    fn read_window(&self, window: &Window) -> Vec<f64>;
}

/// Check a pixel value against the layer's nodata sentinel
///
/// NaN sentinels match NaN pixels even though `NaN != NaN`.
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    if nodata.is_nan() {
        value.is_nan()
    } else {
        value == nodata
    }
}

/// In-memory row-major raster, the reference [`RasterSource`] implementation
#[derive(Debug, Clone)]
pub struct GridRaster {
    name: String,
    transform: RasterTransform,
    nodata: f64,
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl GridRaster {
    /// Create a raster from row-major data
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn new(
        name: impl Into<String>,
        transform: RasterTransform,
        nodata: f64,
        width: usize,
        height: usize,
        data: Vec<f64>,
    ) -> Self {
        assert_eq!(data.len(), width * height, "raster data size mismatch");
        Self {
            name: name.into(),
            transform,
            nodata,
            width,
            height,
            data,
        }
    }

    /// Create a raster filled with a constant value
    pub fn filled(
        name: impl Into<String>,
        transform: RasterTransform,
        nodata: f64,
        width: usize,
        height: usize,
        fill: f64,
    ) -> Self {
        Self::new(name, transform, nodata, width, height, vec![fill; width * height])
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.width + col] = value;
    }
}

impl RasterSource for GridRaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> RasterTransform {
        self.transform
    }

    fn nodata(&self) -> f64 {
        self.nodata
    }

    fn read_window(&self, window: &Window) -> Vec<f64> {
        let mut out = Vec::with_capacity(window.len());
        for row in window.row_start..window.row_end {
            for col in window.col_start..window.col_end {
                let inside = row >= 0
                    && col >= 0
                    && (row as usize) < self.height
                    && (col as usize) < self.width;
                if inside {
                    out.push(self.get(row as usize, col as usize));
                } else {
                    out.push(self.nodata);
                }
            }
        }
        out
    }
}
