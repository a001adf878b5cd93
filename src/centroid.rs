//! Region centroid search.
//!
//! Finding the mean position of a color region runs in two phases:
//!
//! 1. A sparse sweep over the flat pixel array at a coarse stride looks for
//!    any pixel of the target color. Failed sweeps escalate (smaller stride,
//!    shifted offset, full bound) until a final exhaustive pass, so any pixel
//!    that exists is always found.
//! 2. A dense scan of a bounding box around that first match averages the
//!    coordinates of every matching pixel. The box wraps across the left/right
//!    seam and keeps the unwrapped x, so regions split by the seam average to
//!    a position just outside `[0, width)`; see `edge_wrap`.

use serde::{Deserialize, Serialize};

use crate::color::ColorCode;
use crate::model::Vec2;
use crate::raster::RasterLayer;
use crate::scale::round_to;

/// Largest expected region extent in pixels, used as the dense-scan half box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileExtent {
    pub x: usize,
    pub y: usize,
}

impl Default for TileExtent {
    fn default() -> Self {
        Self { x: 750, y: 400 }
    }
}

/// Escalating sweep schedule after the first pass: (stride divisor, offset).
const ESCALATION: [(usize, f32); 2] = [(2, 0.25), (10, 0.5)];

/// Result of locating one region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    /// First matching pixel found by the sweep.
    pub anchor: Vec2,
    /// Unadjusted mean of the matching pixels (may lie off-raster for seam regions).
    pub mean: Vec2,
    /// Stored reference point: the mean, or the anchor when the mean lands on a hole.
    pub position: Vec2,
    /// Matching pixels inside the dense box.
    pub pixel_count: u32,
}

impl Centroid {
    pub fn used_fallback(&self) -> bool {
        self.position != self.mean
    }
}

/// Locates regions of one raster.
pub struct CentroidFinder<'a> {
    raster: &'a RasterLayer,
    increment: usize,
    extent: TileExtent,
}

impl<'a> CentroidFinder<'a> {
    pub fn new(raster: &'a RasterLayer, increment: usize, extent: TileExtent) -> Self {
        Self {
            raster,
            increment: increment.max(1),
            extent,
        }
    }

    /// Scan `[floor(stride * offset), bound)` at `stride` for the target color.
    pub fn sweep(&self, target: ColorCode, bound: usize, stride: usize, offset: f32) -> Option<(usize, usize)> {
        let stride = stride.max(1);
        let start = (stride as f32 * offset) as usize;
        let bound = bound.min(self.raster.area());

        (start..bound)
            .step_by(stride)
            .find(|&i| {
                let pixel = self.raster.at_index(i);
                RasterLayer::is_opaque(pixel) && ColorCode::from_pixel(pixel) == target
            })
            .map(|i| self.raster.coords_of(i))
    }

    /// Find any pixel of the target color.
    ///
    /// `first_bound` limits only the first, coarsest pass; the later passes
    /// cover the whole raster. Returns `None` only if no such pixel exists.
    pub fn find_first(&self, target: ColorCode, first_bound: usize) -> Option<(usize, usize)> {
        let full = self.raster.area();

        if let Some(found) = self.sweep(target, first_bound, self.increment, 0.0) {
            return Some(found);
        }
        for (divisor, offset) in ESCALATION {
            if let Some(found) = self.sweep(target, full, self.increment / divisor, offset) {
                return Some(found);
            }
        }
        self.sweep(target, full, 1, 0.0)
    }

    /// Sweep for the region, then compute its mean position.
    pub fn locate(&self, target: ColorCode, first_bound: usize) -> Option<Centroid> {
        let (ax, ay) = self.find_first(target, first_bound)?;
        Some(self.dense_mean(target, ax, ay))
    }

    /// Average all matching pixels in the box around an anchor pixel.
    pub fn dense_mean(&self, target: ColorCode, ax: usize, ay: usize) -> Centroid {
        let width = self.raster.width;
        let height = self.raster.height;

        let span_x = (self.extent.x * 2).max(1).min(width);
        let start_x = ax as i64 - (span_x / 2) as i64;
        let end_x = start_x + span_x as i64;
        let start_y = ay.saturating_sub(self.extent.y);
        let end_y = (ay + self.extent.y).max(ay + 1).min(height);

        let mut total_x = 0.0f64;
        let mut total_y = 0.0f64;
        let mut count = 0u32;

        for x in start_x..end_x {
            for y in start_y..end_y {
                let pixel = self.raster.get_wrapped(x, y as i64);
                if RasterLayer::is_opaque(pixel) && ColorCode::from_pixel(pixel) == target {
                    total_x += x as f64;
                    total_y += y as f64;
                    count += 1;
                }
            }
        }

        let anchor = Vec2::new(ax as f32, ay as f32);
        // The anchor itself is always inside the box, so count >= 1.
        let mean = Vec2::new(
            round_to((total_x / count as f64) as f32, 2),
            round_to((total_y / count as f64) as f32, 2),
        );

        let at_mean = self.raster.get_wrapped(mean.x.round() as i64, mean.y.round() as i64);
        let position = if RasterLayer::is_opaque(at_mean) { mean } else { anchor };

        Centroid {
            anchor,
            mean,
            position,
            pixel_count: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const TARGET: ColorCode = ColorCode(0x123456);
    const OTHER: Rgba<u8> = Rgba([9, 9, 9, 255]);

    fn paint(width: usize, height: usize, cells: &[(usize, usize)]) -> RasterLayer {
        let mut raster = RasterLayer::transparent(width, height);
        for &(x, y) in cells {
            raster.set(x, y, TARGET.to_pixel());
        }
        raster
    }

    #[test]
    fn test_single_pixel_region() {
        let raster = paint(20, 10, &[(13, 7)]);
        let finder = CentroidFinder::new(&raster, 100, TileExtent::default());
        let c = finder.locate(TARGET, raster.area()).unwrap();
        assert_eq!(c.mean, Vec2::new(13.0, 7.0));
        assert_eq!(c.position, Vec2::new(13.0, 7.0));
        assert_eq!(c.pixel_count, 1);
        assert!(!c.used_fallback());
    }

    #[test]
    fn test_sweep_escalates_to_exhaustive() {
        // Index 7 is missed by strides 100, 50 (offset 12) and 10 (offset 5).
        let raster = paint(10, 10, &[(7, 0)]);
        let finder = CentroidFinder::new(&raster, 100, TileExtent::default());
        assert_eq!(finder.sweep(TARGET, raster.area(), 10, 0.5), None);
        assert_eq!(finder.find_first(TARGET, raster.area()), Some((7, 0)));
    }

    #[test]
    fn test_first_pass_bound_is_respected() {
        let raster = paint(10, 10, &[(0, 5)]);
        let finder = CentroidFinder::new(&raster, 10, TileExtent::default());
        assert_eq!(finder.sweep(TARGET, 40, 10, 0.0), None);
        assert_eq!(finder.find_first(TARGET, 40), Some((0, 5)));
    }

    #[test]
    fn test_missing_region() {
        let raster = paint(10, 10, &[]);
        let finder = CentroidFinder::new(&raster, 100, TileExtent::default());
        assert!(finder.locate(TARGET, raster.area()).is_none());
    }

    #[test]
    fn test_mean_of_block() {
        let raster = paint(30, 20, &[(10, 4), (11, 4), (10, 5), (11, 5)]);
        let finder = CentroidFinder::new(&raster, 100, TileExtent::default());
        let c = finder.locate(TARGET, raster.area()).unwrap();
        assert_eq!(c.mean, Vec2::new(10.5, 4.5));
        assert_eq!(c.pixel_count, 4);
    }

    #[test]
    fn test_ring_falls_back_to_anchor() {
        // A hollow square: the mean sits on the transparent hole.
        let mut cells = Vec::new();
        for x in 4..=8 {
            cells.push((x, 4));
            cells.push((x, 8));
        }
        for y in 5..=7 {
            cells.push((4, y));
            cells.push((8, y));
        }
        let raster = paint(20, 20, &cells);
        let finder = CentroidFinder::new(&raster, 1, TileExtent::default());
        let c = finder.locate(TARGET, raster.area()).unwrap();
        assert_eq!(c.mean, Vec2::new(6.0, 6.0));
        assert_eq!(c.anchor, Vec2::new(4.0, 4.0));
        assert_eq!(c.position, c.anchor);
        assert!(c.used_fallback());
    }

    #[test]
    fn test_other_colors_ignored() {
        let mut raster = paint(10, 10, &[(2, 2)]);
        raster.set(3, 2, OTHER);
        let finder = CentroidFinder::new(&raster, 1, TileExtent::default());
        let c = finder.locate(TARGET, raster.area()).unwrap();
        assert_eq!(c.pixel_count, 1);
        assert_eq!(c.mean, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_seam_region_keeps_unwrapped_x() {
        // Anchor found at x=7; columns 0 and 1 are reached through the seam as x=8, 9.
        let raster = paint(8, 4, &[(0, 1), (1, 1), (7, 1)]);
        let finder = CentroidFinder::new(&raster, 100, TileExtent::default());
        let c = finder.locate(TARGET, raster.area()).unwrap();
        assert_eq!(c.anchor, Vec2::new(7.0, 1.0));
        assert_eq!(c.mean, Vec2::new(8.0, 1.0));
        assert_eq!(c.pixel_count, 3);
    }

    #[test]
    fn test_box_limits_scan() {
        let raster = paint(100, 10, &[(10, 5), (60, 5)]);
        let extent = TileExtent { x: 5, y: 2 };
        let finder = CentroidFinder::new(&raster, 1, extent);
        let c = finder.locate(TARGET, raster.area()).unwrap();
        assert_eq!(c.pixel_count, 1);
        assert_eq!(c.mean, Vec2::new(10.0, 5.0));
    }
}
