//! Pipeline configuration.
//!
//! Read from a JSON file; every field is optional and falls back to the
//! defaults below, which reproduce the tuning the map was authored against.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::centroid::TileExtent;
use crate::curve::{CurvePoint, InterpolationCurve};
use crate::tables::{ResourceTable, TerrainTable};

/// Which heat sample drives the GDP-per-capita curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatSource {
    /// Reuse the population density red channel (the behavior the map was balanced with).
    #[default]
    PopulationDensity,
    /// Blue channel of the GDP-per-capita map.
    GdpLayer,
}

/// Which stages run, in pipeline order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    /// Rebuild the hierarchy from rasters; when false it is loaded from records.
    pub generate_map: bool,
    pub refresh_data: bool,
    pub refresh_resources: bool,
    pub balance_claims: bool,
    pub merge_overlay: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            generate_map: true,
            refresh_data: true,
            refresh_resources: true,
            balance_claims: true,
            merge_overlay: true,
        }
    }
}

/// Input raster locations. All layers must share one size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPaths {
    pub continents: PathBuf,
    pub provinces: PathBuf,
    pub tiles: PathBuf,
    pub tile_area: PathBuf,
    pub biomes: PathBuf,
    pub height: PathBuf,
    pub culture: PathBuf,
    pub population: PathBuf,
    pub gdp: PathBuf,
    pub ores: PathBuf,
    pub food: PathBuf,
    pub hydrates: PathBuf,
}

impl Default for LayerPaths {
    fn default() -> Self {
        let base = Path::new("maps");
        let layers = base.join("layers");
        let resources = layers.join("resource");
        Self {
            continents: base.join("Continents.png"),
            provinces: base.join("Provinces.png"),
            tiles: base.join("Tiles.png"),
            tile_area: layers.join("TilesArea.png"),
            biomes: layers.join("Biomes.png"),
            height: layers.join("Height.png"),
            culture: layers.join("Language.png"),
            population: layers.join("Density.png"),
            gdp: layers.join("Gdp.png"),
            ores: resources.join("Ores.png"),
            food: resources.join("Food.png"),
            hydrates: resources.join("Hydrates.png"),
        }
    }
}

/// Recolored "tilized" export of an arbitrary source map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilizeConfig {
    pub source: PathBuf,
    pub file_name: String,
    #[serde(default)]
    pub heatmap: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub body_circumference_km: f32,
    /// Altitude at height-map red channel 0.0 (meters).
    pub zero_altitude: f32,
    /// Altitude at height-map red channel 1.0 (meters).
    pub max_altitude: f32,
    /// Half extent of the dense centroid scan.
    pub biggest_tile: TileExtent,
    /// Stride of the first sparse sweep.
    pub search_increment: usize,
    /// Population multiplier in percent.
    pub population_scaler: u32,
    /// GDP multiplier in percent.
    pub gdp_scaler: u32,
    /// Density heat → people per km².
    pub density_curve: InterpolationCurve,
    /// Heat → GDP per capita.
    pub gdp_curve: InterpolationCurve,
    pub gdp_heat_source: HeatSource,
    pub stages: StageToggles,
    pub layers: LayerPaths,
    pub records_dir: PathBuf,
    pub localisation_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub claimed_map_url: Option<String>,
    pub overlay_timeout_secs: u64,
    pub export_mean_positions: bool,
    pub tilize: Option<TilizeConfig>,
    /// Tiles processed between progress checkpoints.
    pub progress_batch: usize,
    pub terrain_table: TerrainTable,
    pub resource_table: ResourceTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            body_circumference_km: 3769.911,
            zero_altitude: -1393.0,
            max_altitude: 6768.0,
            biggest_tile: TileExtent::default(),
            search_increment: 100,
            population_scaler: 1,
            gdp_scaler: 1,
            density_curve: default_density_curve(),
            gdp_curve: default_gdp_curve(),
            gdp_heat_source: HeatSource::default(),
            stages: StageToggles::default(),
            layers: LayerPaths::default(),
            records_dir: PathBuf::from("data/tiles"),
            localisation_dir: PathBuf::from("data/localisation"),
            exports_dir: PathBuf::from("exports"),
            claimed_map_url: None,
            overlay_timeout_secs: 30,
            export_mean_positions: true,
            tilize: None,
            progress_batch: 250,
            terrain_table: TerrainTable::default(),
            resource_table: ResourceTable::default(),
        }
    }
}

fn default_density_curve() -> InterpolationCurve {
    InterpolationCurve::new(vec![
        CurvePoint::new(0.0, 0.0),
        CurvePoint::new(0.1, 2.0),
        CurvePoint::new(0.25, 20.0),
        CurvePoint::new(0.5, 250.0),
        CurvePoint::new(0.75, 2500.0),
        CurvePoint::new(1.0, 25000.0),
    ])
}

fn default_gdp_curve() -> InterpolationCurve {
    InterpolationCurve::new(vec![
        CurvePoint::new(0.0, 500.0),
        CurvePoint::new(0.5, 8000.0),
        CurvePoint::new(1.0, 60000.0),
    ])
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse pipeline config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read pipeline config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.search_increment, 100);
        assert_eq!(config.biggest_tile, TileExtent { x: 750, y: 400 });
        assert_eq!(config.zero_altitude, -1393.0);
        assert_eq!(config.max_altitude, 6768.0);
        assert_eq!(config.gdp_heat_source, HeatSource::PopulationDensity);
        assert_eq!(config.terrain_table.len(), 12);
        assert_eq!(config.resource_table.len(), 15);
        assert!(config.stages.generate_map);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "search_increment": 40,
                "gdp_heat_source": "gdp_layer",
                "stages": { "generate_map": false },
                "claimed_map_url": "http://example.invalid/claims.png"
            }"#,
        )
        .unwrap();
        assert_eq!(config.search_increment, 40);
        assert_eq!(config.gdp_heat_source, HeatSource::GdpLayer);
        assert!(!config.stages.generate_map);
        assert!(config.stages.refresh_data);
        assert_eq!(config.body_circumference_km, 3769.911);
        assert!(config.claimed_map_url.is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }
}
