//! Color region extraction.
//!
//! Each distinct opaque color in a boundary raster is the identity of one
//! entity. Extraction is a single pass over the pixels using the packed color
//! as the hash key.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::color::ColorCode;
use crate::raster::RasterLayer;

/// Distinct colors present in a raster, optionally restricted to opaque pixels.
pub fn unique_colors(raster: &RasterLayer, opaque_only: bool) -> HashSet<ColorCode> {
    raster
        .pixels()
        .iter()
        .filter(|p| !opaque_only || RasterLayer::is_opaque(p))
        .map(ColorCode::from_pixel)
        .collect()
}

/// Distinct opaque colors in ascending identity order.
///
/// Order carries no meaning; sorting only keeps output files stable between runs.
pub fn region_colors(raster: &RasterLayer) -> Vec<ColorCode> {
    let mut colors: Vec<ColorCode> = unique_colors(raster, true).into_iter().collect();
    colors.sort_unstable();
    colors
}

/// Number of opaque pixels per color.
///
/// Rows are counted in parallel and merged; the raster is only read.
pub fn count_colors(raster: &RasterLayer) -> HashMap<ColorCode, u32> {
    raster
        .pixels()
        .par_chunks(raster.width.max(1))
        .fold(HashMap::new, |mut counts: HashMap<ColorCode, u32>, row| {
            for pixel in row.iter().filter(|p| RasterLayer::is_opaque(p)) {
                *counts.entry(ColorCode::from_pixel(pixel)).or_insert(0) += 1;
            }
            counts
        })
        .reduce(HashMap::new, |mut merged, partial| {
            for (color, count) in partial {
                *merged.entry(color).or_insert(0) += count;
            }
            merged
        })
}

/// Total number of opaque pixels.
pub fn opaque_count(raster: &RasterLayer) -> usize {
    raster.pixels().iter().filter(|p| RasterLayer::is_opaque(p)).count()
}

/// Distinct opaque colors in one pixel column.
pub fn column_colors(raster: &RasterLayer, x: usize) -> HashSet<ColorCode> {
    raster
        .column(x)
        .filter(|p| RasterLayer::is_opaque(p))
        .map(ColorCode::from_pixel)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn sample() -> RasterLayer {
        // R R .
        // B . B
        RasterLayer::from_fn(3, 2, |x, y| match (x, y) {
            (0, 0) | (1, 0) => RED,
            (0, 1) | (2, 1) => BLUE,
            _ => CLEAR,
        })
    }

    #[test]
    fn test_unique_colors_filters_transparent() {
        let raster = sample();
        let opaque = unique_colors(&raster, true);
        assert_eq!(opaque.len(), 2);
        assert!(opaque.contains(&ColorCode(0xFF0000)));
        assert!(opaque.contains(&ColorCode(0x0000FF)));

        let all = unique_colors(&raster, false);
        assert_eq!(all.len(), 3);
        assert!(all.contains(&ColorCode::SENTINEL));
    }

    #[test]
    fn test_duplicate_colors_collapse() {
        let raster = RasterLayer::new_with(5, 5, RED);
        assert_eq!(region_colors(&raster), vec![ColorCode(0xFF0000)]);
    }

    #[test]
    fn test_count_colors() {
        let counts = count_colors(&sample());
        assert_eq!(counts.get(&ColorCode(0xFF0000)), Some(&2));
        assert_eq!(counts.get(&ColorCode(0x0000FF)), Some(&2));
        assert_eq!(counts.get(&ColorCode::SENTINEL), None);
        assert_eq!(opaque_count(&sample()), 4);
    }

    #[test]
    fn test_column_colors() {
        let raster = sample();
        let left = column_colors(&raster, 0);
        assert_eq!(left.len(), 2);
        let right = column_colors(&raster, 2);
        assert_eq!(right.len(), 1);
        assert!(right.contains(&ColorCode(0x0000FF)));
    }
}
