//! Resource assignment.
//!
//! Each tile samples the ore, food and hydrate layers at its position. A
//! layer color found in the resource table becomes one `ResourceDef`;
//! anything else (including transparency) contributes nothing.

use std::path::Path;

use log::debug;

use crate::color::ColorCode;
use crate::config::LayerPaths;
use crate::hierarchy::MapHierarchy;
use crate::model::TileData;
use crate::progress::{ProgressSink, Stage};
use crate::raster::{RasterError, RasterLayer};
use crate::tables::ResourceTable;

/// The three resource overlays, sampled in this order.
#[derive(Clone)]
pub struct ResourceLayers {
    pub ores: RasterLayer,
    pub food: RasterLayer,
    pub hydrates: RasterLayer,
}

impl ResourceLayers {
    pub fn load(paths: &LayerPaths, width: usize, height: usize) -> Result<Self, RasterError> {
        let load = |name: &str, path: &Path| -> Result<RasterLayer, RasterError> {
            let layer = RasterLayer::open(path)?;
            layer.expect_dimensions(name, width, height)?;
            Ok(layer)
        };
        Ok(Self {
            ores: load("ores", &paths.ores)?,
            food: load("food", &paths.food)?,
            hydrates: load("hydrates", &paths.hydrates)?,
        })
    }

    fn layers(&self) -> [&RasterLayer; 3] {
        [&self.ores, &self.food, &self.hydrates]
    }
}

/// Replace a tile's resources with what the layers show at its position.
pub fn assign_resources(tile: &mut TileData, layers: &ResourceLayers, table: &ResourceTable) {
    let (x, y) = (tile.position.x, tile.position.y);
    tile.local_resources.clear();

    for layer in layers.layers() {
        let pixel = layer.sample(x, y);
        if !RasterLayer::is_opaque(pixel) {
            continue;
        }
        if let Some(resource) = table.lookup(ColorCode::from_pixel(pixel)) {
            tile.local_resources.push(resource.clone());
        }
    }
}

/// Assign resources to every tile. Returns how many tiles hold at least one resource.
pub fn assign_all(
    hierarchy: &mut MapHierarchy,
    layers: &ResourceLayers,
    table: &ResourceTable,
    progress: &mut dyn ProgressSink,
) -> usize {
    let total = hierarchy.province_count();
    let mut with_resources = 0;

    for (done, province) in hierarchy.provinces_mut().enumerate() {
        for tile in province.tiles.iter_mut() {
            assign_resources(tile, layers, table);
            if !tile.local_resources.is_empty() {
                with_resources += 1;
            }
            debug!("{} resources: {}", tile.hex_code, tile.local_resources.len());
        }
        progress.checkpoint(Stage::Resources, done + 1, total);
    }
    with_resources
}
