//! Seam correction for tiles that straddle the left/right map edge.
//!
//! A tile crossing the antimeridian has pixels in both the first and the last
//! column. Its dense-scan mean keeps unwrapped x coordinates and so lands just
//! outside `[0, width)`; shifting it by one raster width puts it back.

use log::{debug, warn};

use crate::color::ColorCode;
use crate::hierarchy::MapHierarchy;
use crate::raster::RasterLayer;
use crate::regions::column_colors;

/// Colors present in both the leftmost and the rightmost column.
pub fn wraparound_candidates(tiles: &RasterLayer) -> Vec<ColorCode> {
    let left = column_colors(tiles, 0);
    let right = column_colors(tiles, tiles.width - 1);
    let mut both: Vec<ColorCode> = left.intersection(&right).copied().collect();
    both.sort_unstable();
    both
}

/// Shift an x coordinate by one map width if it lies outside `[0, width)`.
pub fn wrap_x(x: f32, width: usize) -> f32 {
    let w = width as f32;
    let mut x = x;
    if x < 0.0 {
        x += w;
    }
    if x >= w {
        x -= w;
    }
    x
}

/// Correct the stored positions of seam tiles. Returns how many were moved.
pub fn correct_edge_tiles(hierarchy: &mut MapHierarchy, tiles: &RasterLayer) -> usize {
    let candidates = wraparound_candidates(tiles);
    debug!("Edge tiles: {}", candidates.len());

    let mut moved = 0;
    for color in candidates {
        let Some(tile) = hierarchy.tile_mut(color) else {
            warn!("Edge tile {} not found in hierarchy", color);
            continue;
        };
        let corrected = wrap_x(tile.position.x, tiles.width);
        if corrected != tile.position.x {
            debug!("Edge tile {} x {} -> {}", color, tile.position.x, corrected);
            tile.position.x = corrected;
            moved += 1;
        }
    }
    moved
}

/// Bring any remaining out-of-range position back onto the raster.
///
/// Seam tiles are normally handled by `correct_edge_tiles`; this catches
/// regions whose pixels share a color across the seam without touching both
/// edge columns. Returns how many positions were changed.
pub fn clamp_positions(hierarchy: &mut MapHierarchy, width: usize, height: usize) -> usize {
    let w = width as f32;
    let mut changed = 0;
    for tile in hierarchy.tiles_mut() {
        let before = tile.position;
        let mut x = tile.position.x.rem_euclid(w);
        if x >= w {
            x = 0.0;
        }
        let y = tile.position.y.clamp(0.0, (height - 1) as f32);
        if x != before.x || y != before.y {
            warn!(
                "Tile {} position ({}, {}) outside map, moved to ({}, {})",
                tile.hex_code, before.x, before.y, x, y
            );
            tile.position.x = x;
            tile.position.y = y;
            changed += 1;
        }
    }
    changed
}
