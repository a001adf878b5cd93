//! Diagnostic PNG exports.
//!
//! - `MeanPosition.png`: a white marker at every tile's raw mean position.
//! - A "tilized" recolor of any source map: each tile is painted with the
//!   color sampled from the source at the tile position, optionally mapped
//!   through a heatmap ramp.

use std::fs;
use std::path::Path;

use image::Rgba;
use log::info;
use thiserror::Error;

use crate::centroid::TileExtent;
use crate::hierarchy::MapHierarchy;
use crate::model::{TileData, Vec2};
use crate::raster::RasterLayer;

pub const MEAN_POSITION_FILE: &str = "MeanPosition.png";

const MARKER: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Write a raster as PNG, creating the parent directory.
pub fn save_png(raster: &RasterLayer, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    raster.to_image().save(path)?;
    info!("Exported {:?}", path);
    Ok(())
}

fn wrapped_pixel(x: i64, y: i64, width: usize, height: usize) -> (usize, usize) {
    (
        x.rem_euclid(width as i64) as usize,
        y.clamp(0, height as i64 - 1) as usize,
    )
}

/// Mark every mean position on a transparent raster.
pub fn mean_position_image(means: &[Vec2], width: usize, height: usize) -> RasterLayer {
    let mut raster = RasterLayer::transparent(width, height);
    for mean in means {
        let (x, y) = wrapped_pixel(mean.x.round() as i64, mean.y.round() as i64, width, height);
        raster.set(x, y, MARKER);
    }
    raster
}

/// Heat ramp driven by the blue channel: dark blue at low values, white at
/// full. Red and green only rise over the upper half of the range.
pub fn heatmap_color(sample: &Rgba<u8>) -> Rgba<u8> {
    let b = (sample[2] as f32 / 255.0).clamp(0.0, 1.0);
    let c = (1.0 - 2.0 * (1.0 - b)).clamp(0.0, 1.0);
    let to_u8 = |v: f32| (v * 255.0).round() as u8;
    Rgba([to_u8(c), to_u8(c), to_u8(b), 255])
}

/// Paint one tile's pixels, growing square rings outward from its position
/// until every projected pixel is found or the ring exceeds the extent.
fn paint_tile(
    target: &mut RasterLayer,
    tiles: &RasterLayer,
    tile: &TileData,
    extent: TileExtent,
    color: Rgba<u8>,
) -> u32 {
    let width = tiles.width;
    let height = tiles.height as i64;
    let cx = tile.position.x.round() as i64;
    let cy = tile.position.y.round() as i64;
    let max_radius = extent.x.max(extent.y) as i64;
    let wanted = tile.projected_area.max(1);

    let mut found = 0u32;
    let mut visit = |x: i64, y: i64, found: &mut u32| {
        if y < 0 || y >= height {
            return;
        }
        let (px, py) = wrapped_pixel(x, y, width, tiles.height);
        let pixel = tiles.get(px, py);
        if RasterLayer::is_opaque(pixel) && tiles.color_at(px, py) == tile.hex_code {
            target.set(px, py, color);
            *found += 1;
        }
    };

    visit(cx, cy, &mut found);
    let mut radius = 1;
    while found < wanted && radius <= max_radius {
        for x in (cx - radius)..=(cx + radius) {
            visit(x, cy - radius, &mut found);
            visit(x, cy + radius, &mut found);
        }
        for y in (cy - radius + 1)..(cy + radius) {
            visit(cx - radius, y, &mut found);
            visit(cx + radius, y, &mut found);
        }
        radius += 1;
    }
    found
}

/// Recolor the tile raster with values sampled from `source` at each tile position.
pub fn tilize(
    hierarchy: &MapHierarchy,
    tiles: &RasterLayer,
    source: &RasterLayer,
    extent: TileExtent,
    heatmap: bool,
) -> RasterLayer {
    let mut target = RasterLayer::transparent(tiles.width, tiles.height);
    let mut painted = 0usize;

    for tile in hierarchy.tiles() {
        let sample = source.sample(tile.position.x, tile.position.y);
        let color = if heatmap { heatmap_color(sample) } else { *sample };
        if paint_tile(&mut target, tiles, tile, extent, color) > 0 {
            painted += 1;
        }
    }
    info!("Tilized {} of {} tiles", painted, hierarchy.tile_count());
    target
}
