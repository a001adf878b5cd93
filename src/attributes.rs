//! Physical and economic tile attributes.
//!
//! Every tile is sampled at its stored position on the attribute rasters:
//! biome color → terrain label, height red channel → altitude, language
//! color → culture, density red channel → population and GDP. Province
//! totals are recomputed from their tiles on every run.

use log::{debug, warn};
use thiserror::Error;

use crate::color::ColorCode;
use crate::config::{HeatSource, LayerPaths, PipelineConfig};
use crate::hierarchy::MapHierarchy;
use crate::localisation::CultureTable;
use crate::model::TileData;
use crate::progress::{ProgressSink, Stage};
use crate::raster::{RasterError, RasterLayer};
use crate::scale::MapScale;

/// A tile whose terrain could not be determined. This fails the tile.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("tile {tile}: biome color {color} at ({x}, {y}) has no terrain mapping")]
pub struct UnmappedTerrain {
    pub tile: ColorCode,
    pub color: ColorCode,
    pub x: i64,
    pub y: i64,
}

/// Rasters sampled by the attribute stage.
#[derive(Clone)]
pub struct AttributeLayers {
    pub biomes: RasterLayer,
    pub height: RasterLayer,
    pub culture: RasterLayer,
    pub population: RasterLayer,
    /// Only loaded when GDP is driven by the GDP map.
    pub gdp: Option<RasterLayer>,
}

impl AttributeLayers {
    pub fn load(paths: &LayerPaths, source: HeatSource, width: usize, height: usize) -> Result<Self, RasterError> {
        let load = |name: &str, path: &std::path::Path| -> Result<RasterLayer, RasterError> {
            let layer = RasterLayer::open(path)?;
            layer.expect_dimensions(name, width, height)?;
            Ok(layer)
        };

        let gdp = match source {
            HeatSource::GdpLayer => Some(load("gdp", &paths.gdp)?),
            HeatSource::PopulationDensity => None,
        };

        Ok(Self {
            biomes: load("biomes", &paths.biomes)?,
            height: load("height", &paths.height)?,
            culture: load("culture", &paths.culture)?,
            population: load("population", &paths.population)?,
            gdp,
        })
    }
}

/// Derives tile attributes from the attribute rasters and curves.
pub struct AttributeComputer<'a> {
    config: &'a PipelineConfig,
    scale: MapScale,
    layers: &'a AttributeLayers,
}

impl<'a> AttributeComputer<'a> {
    pub fn new(config: &'a PipelineConfig, scale: MapScale, layers: &'a AttributeLayers) -> Self {
        Self { config, scale, layers }
    }

    /// Linear interpolation between the configured altitude extremes.
    pub fn altitude(&self, height_sample: f32) -> f32 {
        let t = height_sample.clamp(0.0, 1.0);
        self.config.zero_altitude + (self.config.max_altitude - self.config.zero_altitude) * t
    }

    /// People living on `area` km² at the given density heat, truncated.
    pub fn population(&self, heat: f32, area: f32) -> u64 {
        let density = self.config.density_curve.evaluate(heat) as f64;
        let scaler = self.config.population_scaler as f64 / 100.0;
        (density * scaler * area as f64) as u64
    }

    pub fn gdp(&self, heat: f32, population: u64) -> f64 {
        let per_capita = self.config.gdp_curve.evaluate(heat) as f64;
        let scaler = self.config.gdp_scaler as f64 / 100.0;
        per_capita * scaler * population as f64
    }

    fn gdp_heat(&self, population_heat: f32, x: f32, y: f32) -> f32 {
        match (&self.layers.gdp, self.config.gdp_heat_source) {
            (Some(layer), HeatSource::GdpLayer) => layer.blue_at(x, y),
            _ => population_heat,
        }
    }

    /// Populate one tile. On unmapped terrain the tile is left untouched.
    pub fn compute_tile(&self, tile: &mut TileData) -> Result<(), UnmappedTerrain> {
        let (x, y) = (tile.position.x, tile.position.y);

        let biome = ColorCode::from_pixel(self.layers.biomes.sample(x, y));
        let terrain = self
            .config
            .terrain_table
            .lookup(biome)
            .ok_or(UnmappedTerrain {
                tile: tile.hex_code,
                color: biome,
                x: x.floor() as i64,
                y: y.floor() as i64,
            })?;

        tile.terrain = terrain.to_string();
        tile.coordinates = self.scale.coordinates(tile.position);

        let culture = self.layers.culture.sample(x, y);
        tile.culture = RasterLayer::is_opaque(culture).then(|| ColorCode::from_pixel(culture));

        tile.altitude = self.altitude(self.layers.height.red_at(x, y));

        let heat = self.layers.population.red_at(x, y);
        tile.population = self.population(heat, tile.area);
        tile.gdp = self.gdp(self.gdp_heat(heat, x, y), tile.population);
        Ok(())
    }
}

/// Outcome of an attribute pass.
#[derive(Debug, Default)]
pub struct AttributeSummary {
    pub updated: usize,
    pub failures: Vec<UnmappedTerrain>,
    /// Tiles whose culture color has no culture definition.
    pub unknown_cultures: usize,
}

/// Run the attribute computation over the whole tree.
pub fn compute_attributes(
    hierarchy: &mut MapHierarchy,
    computer: &AttributeComputer<'_>,
    cultures: &CultureTable,
    progress: &mut dyn ProgressSink,
) -> AttributeSummary {
    let mut summary = AttributeSummary::default();
    let total = hierarchy.province_count();

    for (done, province) in hierarchy.provinces_mut().enumerate() {
        for tile in province.tiles.iter_mut() {
            match computer.compute_tile(tile) {
                Ok(()) => {
                    summary.updated += 1;
                    if tile.culture.is_some_and(|c| cultures.lookup(c).is_none()) {
                        summary.unknown_cultures += 1;
                    }
                    debug!("{} updated (#{})", tile.hex_code, summary.updated);
                }
                Err(err) => {
                    warn!("{}", err);
                    summary.failures.push(err);
                }
            }
        }
        province.recompute_aggregates();
        progress.checkpoint(Stage::Attributes, done + 1, total);
    }

    if summary.unknown_cultures > 0 && !cultures.is_empty() {
        warn!("{} tiles carry a culture with no definition", summary.unknown_cultures);
    }
    summary
}
