//! Color-coded raster layers.
//!
//! A `RasterLayer` is an immutable RGBA8 grid using an equirectangular
//! projection: sampling wraps horizontally across the left/right seam and
//! clamps vertically at the poles. Every layer of a run shares one size.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::color::ColorCode;

/// Errors raised while loading or combining raster layers.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to load raster {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to decode raster bytes: {0}")]
    Decode(#[from] image::ImageError),
    #[error("raster {name} is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        name: String,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
    #[error("raster dimensions must be non-zero")]
    Empty,
}

/// A 2D grid of RGBA pixels.
#[derive(Clone, Debug)]
pub struct RasterLayer {
    pub width: usize,
    pub height: usize,
    data: Vec<Rgba<u8>>,
}

impl RasterLayer {
    /// Create a raster filled with a single pixel value.
    pub fn new_with(width: usize, height: usize, value: Rgba<u8>) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Fully transparent raster (nothing claimed, no entity anywhere).
    pub fn transparent(width: usize, height: usize) -> Self {
        Self::new_with(width, height, Rgba([0, 0, 0, 0]))
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> Rgba<u8>) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn from_image(image: &RgbaImage) -> Result<Self, RasterError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RasterError::Empty);
        }
        Ok(Self {
            width: width as usize,
            height: height as usize,
            data: image.pixels().copied().collect(),
        })
    }

    /// Load a raster from an image file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| RasterError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_image(&image.to_rgba8())
    }

    /// Decode a raster from encoded image bytes (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RasterError> {
        let image = image::load_from_memory(bytes)?;
        Self::from_image(&image.to_rgba8())
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            *self.get(x as usize, y as usize)
        })
    }

    /// Ensure this layer has the given dimensions.
    pub fn expect_dimensions(&self, name: &str, width: usize, height: usize) -> Result<(), RasterError> {
        if self.width != width || self.height != height {
            return Err(RasterError::DimensionMismatch {
                name: name.to_string(),
                width,
                height,
                actual_width: self.width,
                actual_height: self.height,
            });
        }
        Ok(())
    }

    /// Total number of pixels.
    pub fn area(&self) -> usize {
        self.data.len()
    }

    /// Get the index into the data array, handling horizontal wrapping.
    fn index(&self, x: usize, y: usize) -> usize {
        let x = x % self.width;
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &Rgba<u8> {
        &self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: Rgba<u8>) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Sample at signed coordinates: x wraps across the seam, y clamps.
    pub fn get_wrapped(&self, x: i64, y: i64) -> &Rgba<u8> {
        let wx = x.rem_euclid(self.width as i64) as usize;
        let wy = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(wx, wy)
    }

    /// Sample at a fractional position, truncating toward the containing pixel.
    pub fn sample(&self, x: f32, y: f32) -> &Rgba<u8> {
        self.get_wrapped(x.floor() as i64, y.floor() as i64)
    }

    /// Pixel at a flat row-major index.
    pub fn at_index(&self, index: usize) -> &Rgba<u8> {
        &self.data[index]
    }

    /// Convert a flat index back to (x, y).
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    pub fn color_at(&self, x: usize, y: usize) -> ColorCode {
        ColorCode::from_pixel(self.get(x, y))
    }

    pub fn is_opaque(pixel: &Rgba<u8>) -> bool {
        pixel[3] > 0
    }

    pub fn is_opaque_at(&self, x: usize, y: usize) -> bool {
        Self::is_opaque(self.get(x, y))
    }

    /// Red channel normalized to [0, 1].
    pub fn red_at(&self, x: f32, y: f32) -> f32 {
        self.sample(x, y)[0] as f32 / 255.0
    }

    /// Blue channel normalized to [0, 1].
    pub fn blue_at(&self, x: f32, y: f32) -> f32 {
        self.sample(x, y)[2] as f32 / 255.0
    }

    /// Alpha channel normalized to [0, 1].
    pub fn alpha_at(&self, x: f32, y: f32) -> f32 {
        self.sample(x, y)[3] as f32 / 255.0
    }

    pub fn pixels(&self) -> &[Rgba<u8>] {
        &self.data
    }

    /// Pixels of a single column, top to bottom.
    pub fn column(&self, x: usize) -> impl Iterator<Item = &Rgba<u8>> + '_ {
        let x = x % self.width;
        (0..self.height).map(move |y| &self.data[y * self.width + x])
    }

    /// Iterate over all pixels with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Rgba<u8>)> {
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % self.width;
            let y = idx / self.width;
            (x, y, val)
        })
    }
}
