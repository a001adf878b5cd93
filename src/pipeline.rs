//! Stage orchestration.
//!
//! Stages run strictly in sequence, each one finishing before the next
//! starts:
//!
//! 1. extraction (continents, provinces, tiles) or record load
//! 2. seam correction
//! 3. tile attributes
//! 4. resources
//! 5. claim values
//! 6. claimed-overlay merge
//!
//! Each stage loads its rasters when it starts and drops them when it ends.
//! Records are rewritten after every stage that changes the tree. Degraded
//! outcomes never abort the run; they are collected in `PipelineReport`.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

use crate::attributes::{compute_attributes, AttributeComputer, AttributeLayers, UnmappedTerrain};
use crate::centroid::CentroidFinder;
use crate::claim::balance_claims;
use crate::color::ColorCode;
use crate::config::{ConfigError, HeatSource, LayerPaths, PipelineConfig};
use crate::edge_wrap::{clamp_positions, correct_edge_tiles};
use crate::export::{mean_position_image, save_png, tilize, ExportError, MEAN_POSITION_FILE};
use crate::hierarchy::MapHierarchy;
use crate::localisation::{register_names, NameTable};
use crate::model::{TileData, Vec2};
use crate::overlay::{load_overlay_or_empty, merge_claims, ClaimedTile, HttpOverlaySource, OverlaySource, Unconfigured};
use crate::persistence::{
    write_content, LocalisationStore, PersistenceError, RecordStore, CONTINENT_NAMES_FILE, PROVINCE_NAMES_FILE,
};
use crate::progress::{LogProgress, ProgressSink, Stage};
use crate::raster::{RasterError, RasterLayer};
use crate::regions::{count_colors, opaque_count, region_colors};
use crate::resources::{assign_all, ResourceLayers};
use crate::scale::MapScale;

pub const CLAIMED_FILE: &str = "claimed.json";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// What a run did, including everything that degraded instead of failing.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub continents: usize,
    pub provinces: usize,
    pub tiles: usize,
    pub unresolved_provinces: Vec<ColorCode>,
    pub unresolved_tiles: Vec<ColorCode>,
    /// Regions whose sweep found no pixel at all.
    pub missing_regions: Vec<ColorCode>,
    /// Tiles stored at their anchor because the mean fell on a hole.
    pub position_fallbacks: usize,
    pub edge_wrapped: usize,
    pub clamped_positions: usize,
    /// Continents whose tiles cover more pixels than their land area.
    pub projected_area_violations: Vec<ColorCode>,
    pub terrain_failures: Vec<UnmappedTerrain>,
    pub unknown_cultures: usize,
    pub tiles_with_resources: usize,
    pub claims_balanced: usize,
    pub overlay_error: Option<String>,
    pub claimed: Vec<ClaimedTile>,
}

/// The four boundary rasters. Their size fixes the size of every other layer.
#[derive(Clone)]
pub struct BoundaryLayers {
    pub continents: RasterLayer,
    pub provinces: RasterLayer,
    pub tiles: RasterLayer,
    /// Land-only copy of the tile map; its pixel counts give true tile area.
    pub tile_area: RasterLayer,
}

impl BoundaryLayers {
    pub fn load(paths: &LayerPaths) -> Result<Self, RasterError> {
        let continents = RasterLayer::open(&paths.continents)?;
        let (width, height) = (continents.width, continents.height);
        let load = |name: &str, path: &Path| -> Result<RasterLayer, RasterError> {
            let layer = RasterLayer::open(path)?;
            layer.expect_dimensions(name, width, height)?;
            Ok(layer)
        };
        Ok(Self {
            provinces: load("provinces", &paths.provinces)?,
            tiles: load("tiles", &paths.tiles)?,
            tile_area: load("tile area", &paths.tile_area)?,
            continents,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.continents.width, self.continents.height)
    }
}

/// Build the tree from the boundary rasters.
///
/// Returns the tree and the raw mean position of every located tile.
pub fn extract_hierarchy(
    layers: &BoundaryLayers,
    config: &PipelineConfig,
    report: &mut PipelineReport,
    progress: &mut dyn ProgressSink,
) -> (MapHierarchy, Vec<Vec2>) {
    let mut hierarchy = MapHierarchy::new();
    extract_continents(&mut hierarchy, layers, progress);
    extract_provinces(&mut hierarchy, layers, config, report, progress);
    let means = extract_tiles(&mut hierarchy, layers, config, report, progress);
    (hierarchy, means)
}

fn extract_continents(hierarchy: &mut MapHierarchy, layers: &BoundaryLayers, progress: &mut dyn ProgressSink) {
    let colors = region_colors(&layers.continents);
    let total = colors.len();
    for (done, color) in colors.into_iter().enumerate() {
        hierarchy.add_continent(color);
        debug!("Continent {} defined", color);
        progress.checkpoint(Stage::Continents, done + 1, total);
    }
    info!("Found {} continents", hierarchy.continent_count());
    progress.stage_finished(Stage::Continents);
}

fn extract_provinces(
    hierarchy: &mut MapHierarchy,
    layers: &BoundaryLayers,
    config: &PipelineConfig,
    report: &mut PipelineReport,
    progress: &mut dyn ProgressSink,
) {
    let colors = region_colors(&layers.provinces);
    let land = opaque_count(&layers.provinces);
    let finder = CentroidFinder::new(&layers.provinces, config.search_increment, config.biggest_tile);
    let total = colors.len();

    for (done, color) in colors.into_iter().enumerate() {
        progress.checkpoint(Stage::Provinces, done + 1, total);

        let Some((ax, ay)) = finder.find_first(color, land) else {
            warn!("Province {} has no pixels", color);
            report.missing_regions.push(color);
            continue;
        };

        let parent = match hierarchy.resolve_continent(&layers.continents, ax as i64, ay as i64) {
            Ok(continent) => Some(continent),
            Err(err) => {
                warn!("Province {}: {}", color, err);
                report.unresolved_provinces.push(color);
                None
            }
        };
        hierarchy.add_province(color, parent);
        debug!("Province {} defined", color);
    }
    info!("Found {} provinces", hierarchy.province_count());
    progress.stage_finished(Stage::Provinces);
}

fn extract_tiles(
    hierarchy: &mut MapHierarchy,
    layers: &BoundaryLayers,
    config: &PipelineConfig,
    report: &mut PipelineReport,
    progress: &mut dyn ProgressSink,
) -> Vec<Vec2> {
    let (width, height) = layers.dimensions();
    let scale = MapScale::new(config.body_circumference_km, width, height);
    let colors = region_colors(&layers.tiles);
    let areas = count_colors(&layers.tile_area);
    let finder = CentroidFinder::new(&layers.tiles, config.search_increment, config.biggest_tile);
    let bound = layers.tiles.area();
    let batch = config.progress_batch.max(1);
    let total = colors.len();
    let mut means = Vec::with_capacity(total);

    for (done, color) in colors.into_iter().enumerate() {
        if (done + 1) % batch == 0 || done + 1 == total {
            progress.checkpoint(Stage::Tiles, done + 1, total);
        }

        let Some(centroid) = finder.locate(color, bound) else {
            warn!("Tile {} has no pixels", color);
            report.missing_regions.push(color);
            continue;
        };
        means.push(centroid.mean);
        if centroid.used_fallback() {
            debug!("Tile {} mean {:?} is over a hole, using anchor", color, centroid.mean);
            report.position_fallbacks += 1;
        }

        let tile = TileData {
            hex_code: color,
            position: centroid.position,
            projected_area: centroid.pixel_count,
            area: scale.area_km2(areas.get(&color).copied().unwrap_or(0)),
            ..Default::default()
        };

        let parent = hierarchy
            .resolve_province(&layers.continents, &layers.provinces, centroid.position)
            .or_else(|_| hierarchy.resolve_province(&layers.continents, &layers.provinces, centroid.anchor));
        let province = match parent {
            Ok(parent) => Some(parent.province),
            Err(err) => {
                warn!("Tile {}: {}", color, err);
                report.unresolved_tiles.push(color);
                None
            }
        };
        hierarchy.add_tile(tile, province);
    }
    info!("Found {} tiles", hierarchy.tile_count());
    progress.stage_finished(Stage::Tiles);
    means
}

/// Continents whose summed projected tile area exceeds their land pixels on
/// the tile-area raster.
pub fn projected_area_violations(
    hierarchy: &MapHierarchy,
    continents: &RasterLayer,
    tile_area: &RasterLayer,
) -> Vec<ColorCode> {
    let mut land: HashMap<ColorCode, u64> = HashMap::new();
    for (continent, area) in continents.pixels().iter().zip(tile_area.pixels()) {
        if RasterLayer::is_opaque(continent) && RasterLayer::is_opaque(area) {
            *land.entry(ColorCode::from_pixel(continent)).or_insert(0) += 1;
        }
    }

    hierarchy
        .continents()
        .iter()
        .filter(|c| !c.hex_code.is_sentinel())
        .filter(|c| c.total_projected_area() > land.get(&c.hex_code).copied().unwrap_or(0))
        .map(|c| c.hex_code)
        .collect()
}

/// Supplies each stage's rasters when the stage starts. Every call loads
/// afresh; the stage drops what it was given once it finishes.
pub trait LayerLoader {
    /// Size shared by every layer, read without decoding the boundary pixels.
    fn dimensions(&mut self) -> Result<(usize, usize), RasterError>;
    fn boundaries(&mut self) -> Result<BoundaryLayers, RasterError>;
    fn tiles(&mut self, width: usize, height: usize) -> Result<RasterLayer, RasterError>;
    fn attributes(&mut self, source: HeatSource, width: usize, height: usize)
        -> Result<AttributeLayers, RasterError>;
    fn resources(&mut self, width: usize, height: usize) -> Result<ResourceLayers, RasterError>;
}

/// Loads layers from the configured image files.
pub struct RasterFiles {
    paths: LayerPaths,
}

impl RasterFiles {
    pub fn new(paths: LayerPaths) -> Self {
        Self { paths }
    }
}

impl LayerLoader for RasterFiles {
    fn dimensions(&mut self) -> Result<(usize, usize), RasterError> {
        let path = &self.paths.continents;
        let (width, height) = image::image_dimensions(path).map_err(|source| RasterError::Load {
            path: path.clone(),
            source,
        })?;
        Ok((width as usize, height as usize))
    }

    fn boundaries(&mut self) -> Result<BoundaryLayers, RasterError> {
        let layers = BoundaryLayers::load(&self.paths)?;
        let (width, height) = layers.dimensions();
        info!("Boundary rasters loaded ({}x{})", width, height);
        Ok(layers)
    }

    fn tiles(&mut self, width: usize, height: usize) -> Result<RasterLayer, RasterError> {
        let tiles = RasterLayer::open(&self.paths.tiles)?;
        tiles.expect_dimensions("tiles", width, height)?;
        Ok(tiles)
    }

    fn attributes(
        &mut self,
        source: HeatSource,
        width: usize,
        height: usize,
    ) -> Result<AttributeLayers, RasterError> {
        AttributeLayers::load(&self.paths, source, width, height)
    }

    fn resources(&mut self, width: usize, height: usize) -> Result<ResourceLayers, RasterError> {
        ResourceLayers::load(&self.paths, width, height)
    }
}

/// Runs the configured stages.
pub struct Pipeline<P: ProgressSink> {
    config: PipelineConfig,
    progress: P,
}

impl Pipeline<LogProgress> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_progress(config, LogProgress)
    }
}

impl<P: ProgressSink> Pipeline<P> {
    pub fn with_progress(config: PipelineConfig, progress: P) -> Self {
        Self { config, progress }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Run on the rasters and overlay location named by the configuration.
    pub fn run(&mut self) -> Result<PipelineReport, PipelineError> {
        let mut files = RasterFiles::new(self.config.layers.clone());
        let overlay = self
            .config
            .claimed_map_url
            .as_ref()
            .map(|url| HttpOverlaySource::new(url.clone(), self.config.overlay_timeout_secs));

        let (_, report) = self.run_with(&mut files, overlay.as_ref().map(|o| o as &dyn OverlaySource))?;
        Ok(report)
    }

    /// Run with layers from `layers`. Without an overlay source the merge
    /// still runs and reports every tile unclaimed.
    pub fn run_with(
        &mut self,
        layers: &mut dyn LayerLoader,
        overlay: Option<&dyn OverlaySource>,
    ) -> Result<(MapHierarchy, PipelineReport), PipelineError> {
        let config = &self.config;
        let progress: &mut dyn ProgressSink = &mut self.progress;
        let mut report = PipelineReport::default();

        let records = RecordStore::new(&config.records_dir);
        let localisation = LocalisationStore::new(&config.localisation_dir);
        let mut continent_names = localisation.load_names(CONTINENT_NAMES_FILE);
        let mut province_names = localisation.load_names(PROVINCE_NAMES_FILE);
        let cultures = localisation.load_cultures();

        let (mut hierarchy, width, height) = if config.stages.generate_map {
            let (mut hierarchy, means, tiles) = {
                let boundaries = layers.boundaries()?;
                let (hierarchy, means) = extract_hierarchy(&boundaries, config, &mut report, progress);
                report.projected_area_violations =
                    projected_area_violations(&hierarchy, &boundaries.continents, &boundaries.tile_area);
                (hierarchy, means, boundaries.tiles)
            };
            for continent in &report.projected_area_violations {
                warn!("Continent {} tiles exceed its land area", continent);
            }
            let (width, height) = (tiles.width, tiles.height);

            report.edge_wrapped = correct_edge_tiles(&mut hierarchy, &tiles);
            drop(tiles);
            report.clamped_positions = clamp_positions(&mut hierarchy, width, height);
            info!("Corrected {} seam tiles", report.edge_wrapped);
            progress.stage_finished(Stage::EdgeWrap);

            save_names(&localisation, &hierarchy, &mut continent_names, &mut province_names)?;
            records.save_all(&hierarchy)?;

            if config.export_mean_positions {
                let markers = mean_position_image(&means, width, height);
                save_png(&markers, &config.exports_dir.join(MEAN_POSITION_FILE))?;
            }
            (hierarchy, width, height)
        } else {
            let (width, height) = layers.dimensions()?;
            (records.load_hierarchy(), width, height)
        };

        if config.stages.refresh_data {
            let summary = {
                let attribute_layers = layers.attributes(config.gdp_heat_source, width, height)?;
                let scale = MapScale::new(config.body_circumference_km, width, height);
                let computer = AttributeComputer::new(config, scale, &attribute_layers);
                compute_attributes(&mut hierarchy, &computer, &cultures, progress)
            };
            info!(
                "Updated {} tiles, {} failed terrain lookup",
                summary.updated,
                summary.failures.len()
            );
            report.terrain_failures = summary.failures;
            report.unknown_cultures = summary.unknown_cultures;
            progress.stage_finished(Stage::Attributes);

            save_names(&localisation, &hierarchy, &mut continent_names, &mut province_names)?;
            records.save_all(&hierarchy)?;
        }

        if config.stages.refresh_resources {
            report.tiles_with_resources = {
                let resource_layers = layers.resources(width, height)?;
                assign_all(&mut hierarchy, &resource_layers, &config.resource_table, progress)
            };
            info!("{} tiles hold resources", report.tiles_with_resources);
            progress.stage_finished(Stage::Resources);
            records.save_all(&hierarchy)?;
        }

        if config.stages.balance_claims {
            report.claims_balanced = balance_claims(&mut hierarchy, progress);
            info!("Balanced claim values of {} tiles", report.claims_balanced);
            progress.stage_finished(Stage::Claims);
            records.save_all(&hierarchy)?;
        }

        if config.stages.merge_overlay {
            let unconfigured = Unconfigured;
            let source = overlay.unwrap_or(&unconfigured);
            let (layer, failure) = load_overlay_or_empty(source, width, height);
            report.overlay_error = failure;
            report.claimed = merge_claims(&hierarchy, &layer, config.progress_batch, progress);
            write_content(&config.exports_dir.join(CLAIMED_FILE), &report.claimed)?;
            progress.stage_finished(Stage::Overlay);
        }

        if let Some(tilize_config) = &config.tilize {
            let tiles = layers.tiles(width, height)?;
            let source = RasterLayer::open(&tilize_config.source)?;
            source.expect_dimensions("tilize source", width, height)?;
            let painted = tilize(&hierarchy, &tiles, &source, config.biggest_tile, tilize_config.heatmap);
            let path = config.exports_dir.join(format!("{}.png", tilize_config.file_name));
            save_png(&painted, &path)?;
        }

        report.continents = hierarchy.continent_count();
        report.provinces = hierarchy.province_count();
        report.tiles = hierarchy.tile_count();
        Ok((hierarchy, report))
    }
}

fn save_names(
    store: &LocalisationStore,
    hierarchy: &MapHierarchy,
    continent_names: &mut NameTable,
    province_names: &mut NameTable,
) -> Result<(), PersistenceError> {
    register_names(hierarchy, continent_names, province_names);
    store.save_names(CONTINENT_NAMES_FILE, continent_names)?;
    store.save_names(PROVINCE_NAMES_FILE, province_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::InterpolationCurve;
    use crate::overlay::OverlayError;
    use crate::progress::RecordingProgress;
    use image::Rgba;
    use tempfile::TempDir;

    const CONT: ColorCode = ColorCode(0xAA0000);
    const PROV_W: ColorCode = ColorCode(0x00AA00);
    const PROV_E: ColorCode = ColorCode(0x00BB00);
    const TILE_W: ColorCode = ColorCode(0x0000AA);
    const TILE_E: ColorCode = ColorCode(0x0000BB);
    const TILE_SEAM: ColorCode = ColorCode(0x0000CC);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// 8x2 map: one continent, west/east provinces, three tiles with one
    /// straddling the seam (columns 0 and 7).
    fn boundaries() -> BoundaryLayers {
        let tiles = RasterLayer::from_fn(8, 2, |x, _| match x {
            0 | 7 => TILE_SEAM.to_pixel(),
            1..=3 => TILE_W.to_pixel(),
            _ => TILE_E.to_pixel(),
        });
        BoundaryLayers {
            continents: RasterLayer::new_with(8, 2, CONT.to_pixel()),
            provinces: RasterLayer::from_fn(8, 2, |x, _| {
                if x < 4 { PROV_W.to_pixel() } else { PROV_E.to_pixel() }
            }),
            tile_area: tiles.clone(),
            tiles,
        }
    }

    fn attribute_layers() -> AttributeLayers {
        AttributeLayers {
            biomes: RasterLayer::new_with(8, 2, ColorCode(0x83BC2E).to_pixel()),
            height: RasterLayer::new_with(8, 2, Rgba([0, 0, 0, 255])),
            culture: RasterLayer::transparent(8, 2),
            population: RasterLayer::new_with(8, 2, Rgba([255, 0, 0, 255])),
            gdp: None,
        }
    }

    fn resource_layers() -> ResourceLayers {
        let mut food = RasterLayer::transparent(8, 2);
        food.set(2, 0, ColorCode(0xD8EAD3).to_pixel());
        ResourceLayers {
            ores: RasterLayer::transparent(8, 2),
            food,
            hydrates: RasterLayer::transparent(8, 2),
        }
    }

    /// Hands out copies of fixed layers and records each request.
    struct MemoryLayers {
        boundaries: BoundaryLayers,
        attributes: Option<AttributeLayers>,
        resources: Option<ResourceLayers>,
        loads: Vec<&'static str>,
    }

    impl MemoryLayers {
        fn new() -> Self {
            Self {
                boundaries: boundaries(),
                attributes: Some(attribute_layers()),
                resources: Some(resource_layers()),
                loads: Vec::new(),
            }
        }
    }

    impl LayerLoader for MemoryLayers {
        fn dimensions(&mut self) -> Result<(usize, usize), RasterError> {
            self.loads.push("dimensions");
            Ok(self.boundaries.dimensions())
        }

        fn boundaries(&mut self) -> Result<BoundaryLayers, RasterError> {
            self.loads.push("boundaries");
            Ok(self.boundaries.clone())
        }

        fn tiles(&mut self, _width: usize, _height: usize) -> Result<RasterLayer, RasterError> {
            self.loads.push("tiles");
            Ok(self.boundaries.tiles.clone())
        }

        fn attributes(
            &mut self,
            _source: HeatSource,
            _width: usize,
            _height: usize,
        ) -> Result<AttributeLayers, RasterError> {
            self.loads.push("attributes");
            self.attributes.clone().ok_or(RasterError::Empty)
        }

        fn resources(&mut self, _width: usize, _height: usize) -> Result<ResourceLayers, RasterError> {
            self.loads.push("resources");
            self.resources.clone().ok_or(RasterError::Empty)
        }
    }

    struct Fixed(RasterLayer);

    impl OverlaySource for Fixed {
        fn fetch(&self) -> Result<RasterLayer, OverlayError> {
            Ok(self.0.clone())
        }
    }

    fn config(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.body_circumference_km = 80.0;
        config.density_curve = InterpolationCurve::linear(1.0, 1.0);
        config.population_scaler = 100;
        config.gdp_curve = InterpolationCurve::linear(2.0, 2.0);
        config.gdp_scaler = 100;
        config.records_dir = dir.join("tiles");
        config.localisation_dir = dir.join("localisation");
        config.exports_dir = dir.join("exports");
        config
    }

    #[test]
    fn test_full_run() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = Pipeline::with_progress(config(dir.path()), RecordingProgress::default());

        let mut claimed = RasterLayer::transparent(8, 2);
        claimed.set(5, 0, Rgba([255, 0, 0, 255]));
        let overlay = Fixed(claimed);

        let mut layers = MemoryLayers::new();
        let (tree, report) = pipeline.run_with(&mut layers, Some(&overlay)).unwrap();

        assert_eq!((report.continents, report.provinces, report.tiles), (1, 2, 3));
        assert!(report.unresolved_provinces.is_empty());
        assert!(report.unresolved_tiles.is_empty());
        assert!(report.projected_area_violations.is_empty());
        assert_eq!(report.edge_wrapped, 1);

        // Seam tile mean is -0.5 before wrapping; its parent comes from column 7.
        let seam = tree.tile(TILE_SEAM).unwrap();
        assert_eq!(seam.position, Vec2::new(7.5, 0.5));
        assert_eq!(seam.province_parent, PROV_E);
        assert_eq!(seam.projected_area, 4);

        let west = tree.tile(TILE_W).unwrap();
        assert_eq!(west.position, Vec2::new(2.0, 0.5));
        assert_eq!(west.province_parent, PROV_W);
        assert_eq!(west.continent_parent, CONT);
        assert_eq!(west.area, 600.0);
        assert_eq!(west.population, 600);
        assert_eq!(west.terrain, "Grasslands");
        assert_eq!(west.local_resources.len(), 1);
        // (48 + 12 + 6000 + 2 * 800) / 5
        assert_eq!(west.claim_value, (48 + 12 + 6000 + 1600) / 5);

        let east = tree.tile(TILE_E).unwrap();
        assert_eq!(east.position, Vec2::new(5.0, 0.5));
        assert_eq!(east.coordinates, Vec2::new(45.0, -45.0));
        assert!(report.overlay_error.is_none());
        assert!(report.claimed.contains(&ClaimedTile { hex_code: TILE_E, claimed: true }));
        assert_eq!(report.claimed.iter().filter(|c| c.claimed).count(), 1);

        assert!(dir.path().join("tiles").join("AA0000.json").exists());
        assert!(dir.path().join("localisation").join(PROVINCE_NAMES_FILE).exists());
        assert!(dir.path().join("exports").join(MEAN_POSITION_FILE).exists());
        assert!(dir.path().join("exports").join(CLAIMED_FILE).exists());

        assert_eq!(layers.loads, vec!["boundaries", "attributes", "resources"]);

        let progress = pipeline.progress();
        assert_eq!(progress.count(Stage::Provinces), 2);
        assert!(progress.count(Stage::Tiles) >= 1);
        assert!(progress.finished.contains(&Stage::Claims));
    }

    #[test]
    fn test_reload_from_records() {
        let dir = TempDir::new().unwrap();
        let mut first_config = config(dir.path());
        first_config.stages.refresh_resources = false;
        let mut first = Pipeline::with_progress(first_config, RecordingProgress::default());
        let (tree, _) = first.run_with(&mut MemoryLayers::new(), None).unwrap();

        let mut config = config(dir.path());
        config.stages.generate_map = false;
        config.stages.refresh_data = false;
        config.stages.refresh_resources = false;
        let mut second = Pipeline::with_progress(config, RecordingProgress::default());
        let mut layers = MemoryLayers::new();
        let (reloaded, report) = second.run_with(&mut layers, None).unwrap();

        assert_eq!(report.tiles, 3);
        assert_eq!(reloaded.tile(TILE_W), tree.tile(TILE_W));
        assert_eq!(second.progress().count(Stage::Tiles), 0);
        // Only the raster size is read when the tree comes from records.
        assert_eq!(layers.loads, vec!["dimensions"]);
    }

    #[test]
    fn test_missing_overlay_claims_nothing() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = Pipeline::with_progress(config(dir.path()), RecordingProgress::default());
        let (_, report) = pipeline.run_with(&mut MemoryLayers::new(), None).unwrap();

        assert_eq!(report.tiles, 3);
        assert_eq!(report.claimed.len(), report.tiles);
        assert!(report.claimed.iter().all(|c| !c.claimed));
        assert!(report.overlay_error.is_some());
        assert!(dir.path().join("exports").join(CLAIMED_FILE).exists());
        assert!(pipeline.progress().finished.contains(&Stage::Overlay));
    }

    #[test]
    fn test_resource_load_failure_keeps_earlier_records() {
        let dir = TempDir::new().unwrap();
        let mut layers = MemoryLayers::new();
        layers.resources = None;
        let mut pipeline = Pipeline::with_progress(config(dir.path()), RecordingProgress::default());

        let result = pipeline.run_with(&mut layers, None);
        assert!(matches!(result, Err(PipelineError::Raster(RasterError::Empty))));
        assert_eq!(layers.loads, vec!["boundaries", "attributes", "resources"]);

        let saved = RecordStore::new(dir.path().join("tiles")).load_hierarchy();
        assert_eq!(saved.tile_count(), 3);
        assert_eq!(saved.tile(TILE_W).unwrap().terrain, "Grasslands");
    }

    #[test]
    fn test_unresolved_tile_goes_to_sentinel() {
        let mut layers = boundaries();
        // Erase the province under the west tile so neither probe resolves.
        for x in 1..=3 {
            for y in 0..2 {
                layers.provinces.set(x, y, CLEAR);
            }
        }
        let mut report = PipelineReport::default();
        let config = PipelineConfig::default();
        let (tree, _) = extract_hierarchy(&layers, &config, &mut report, &mut crate::progress::NoProgress);

        assert_eq!(report.unresolved_tiles, vec![TILE_W]);
        let tile = tree.tile(TILE_W).unwrap();
        assert!(tile.unresolved);
        assert_eq!(tile.province_parent, ColorCode::SENTINEL);
        assert!(tree.province(PROV_W).unwrap().tiles.iter().all(|t| t.hex_code != TILE_W));
    }

    #[test]
    fn test_projected_area_violation() {
        let layers = boundaries();
        let mut tree = MapHierarchy::new();
        tree.add_continent(CONT);
        tree.add_province(PROV_W, Some(CONT));
        tree.add_tile(
            TileData {
                hex_code: TILE_W,
                projected_area: 17,
                ..Default::default()
            },
            Some(PROV_W),
        );
        assert_eq!(
            projected_area_violations(&tree, &layers.continents, &layers.tile_area),
            vec![CONT]
        );
    }
}
