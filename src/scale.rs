//! Map scale for the equirectangular raster stack.
//!
//! One raster row spans the full body circumference, so a pixel is
//! `circumference / width` kilometres wide and pixel areas are approximated
//! as squares of that width regardless of latitude.

use crate::model::Vec2;

/// Map scale configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapScale {
    /// Physical width one pixel represents (in kilometers)
    pub km_per_pixel: f32,
    /// Raster width in pixels
    pub width: usize,
    /// Raster height in pixels
    pub height: usize,
}

impl MapScale {
    /// Create a scale from the body circumference and raster size
    ///
    /// # Arguments
    /// * `circumference_km` - Equatorial circumference of the body
    /// * `width` / `height` - Shared raster dimensions
    pub fn new(circumference_km: f32, width: usize, height: usize) -> Self {
        Self {
            km_per_pixel: circumference_km / width as f32,
            width,
            height,
        }
    }

    /// Area of a single pixel in km²
    pub fn pixel_area_km2(&self) -> f32 {
        self.km_per_pixel * self.km_per_pixel
    }

    /// Convert a pixel count into km²
    pub fn area_km2(&self, pixels: u32) -> f32 {
        pixels as f32 * self.pixel_area_km2()
    }

    /// Pixel-space center of the map
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Linear pixel → (longitude, latitude) mapping, rounded to 2 decimals
    pub fn coordinates(&self, position: Vec2) -> Vec2 {
        let center = self.center();
        let longitude = round_to(((position.x - center.x) / center.x) * 180.0, 2);
        let latitude = round_to(((position.y - center.y) / center.y) * 90.0, 2);
        Vec2::new(longitude, latitude)
    }
}

/// Round to a fixed number of decimals
#[inline]
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}
