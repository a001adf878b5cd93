//! Geographic data model: continents own provinces, provinces own tiles.
//!
//! Children refer to their ancestors by identity color rather than by live
//! reference, so the tree has a single owner and can be rebuilt from records
//! without cycles. Field names follow the persisted record format.

use serde::{Deserialize, Serialize};

use crate::color::ColorCode;

/// A 2D value persisted as `{ "x": .., "y": .. }`.
///
/// Used both for pixel positions and for longitude/latitude pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A typed resource yield held by a tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDef {
    pub resource: String,
    #[serde(rename = "Yield")]
    pub yield_tier: i32,
}

impl ResourceDef {
    pub fn new(resource: impl Into<String>, yield_tier: i32) -> Self {
        Self {
            resource: resource.into(),
            yield_tier,
        }
    }
}

/// Smallest geographic unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TileData {
    pub hex_code: ColorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<ColorCode>,
    pub local_resources: Vec<ResourceDef>,
    #[serde(rename = "GDP")]
    pub gdp: f64,
    /// Longitude (x) and latitude (y) in degrees.
    pub coordinates: Vec2,
    /// Mean pixel position.
    pub position: Vec2,
    pub altitude: f32,
    pub terrain: String,
    /// Real-world area in km².
    pub area: f32,
    /// Pixel count of the tile on the tile raster.
    pub projected_area: u32,
    pub population: u64,
    pub province_parent: ColorCode,
    pub continent_parent: ColorCode,
    pub claim_value: i64,
    /// Set when the parent could not be resolved and a sentinel was assigned.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unresolved: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProvinceData {
    pub hex_code: ColorCode,
    pub continent_parent: ColorCode,
    pub area: f32,
    pub population: u64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unresolved: bool,
    pub tiles: Vec<TileData>,
}

impl ProvinceData {
    pub fn new(hex_code: ColorCode, continent_parent: ColorCode) -> Self {
        Self {
            hex_code,
            continent_parent,
            ..Default::default()
        }
    }

    /// Recompute `area` and `population` from the tiles.
    pub fn recompute_aggregates(&mut self) {
        self.area = self.tiles.iter().map(|t| t.area).sum();
        self.population = self.tiles.iter().map(|t| t.population).sum();
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContinentData {
    pub hex_code: ColorCode,
    pub provinces: Vec<ProvinceData>,
}

impl ContinentData {
    pub fn new(hex_code: ColorCode) -> Self {
        Self {
            hex_code,
            provinces: Vec::new(),
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileData> {
        self.provinces.iter().flat_map(|p| p.tiles.iter())
    }

    pub fn total_projected_area(&self) -> u64 {
        self.tiles().map(|t| t.projected_area as u64).sum()
    }
}

/// Display name for a continent or province.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalisationEntry {
    pub hex_code: ColorCode,
    pub name: String,
}

/// Reference data for a culture color on the language map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CultureDef {
    pub hex_code: ColorCode,
    pub dialect: String,
    pub language: String,
    pub sub_group: String,
    pub group: String,
    pub family: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(area: f32, population: u64) -> TileData {
        TileData {
            area,
            population,
            ..Default::default()
        }
    }

    #[test]
    fn test_province_aggregates_recomputed() {
        let mut province = ProvinceData::new(ColorCode(1), ColorCode(2));
        province.area = 999.0;
        province.population = 999;
        province.tiles.push(tile(2.5, 100));
        province.tiles.push(tile(1.5, 50));
        province.recompute_aggregates();
        assert!((province.area - 4.0).abs() < 1e-6);
        assert_eq!(province.population, 150);
    }

    #[test]
    fn test_tile_field_names() {
        let mut t = tile(1.0, 10);
        t.hex_code = ColorCode(0xABCDEF);
        t.local_resources.push(ResourceDef::new("Food", 2));
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["HexCode"], "ABCDEF");
        assert_eq!(value["LocalResources"][0]["Yield"], 2);
        assert!(value.get("GDP").is_some());
        assert!(value.get("Unresolved").is_none());
        assert!(value.get("Culture").is_none());
    }

    #[test]
    fn test_partial_record_fills_defaults() {
        let t: TileData = serde_json::from_str(r#"{"HexCode":"00FF00","Population":7}"#).unwrap();
        assert_eq!(t.hex_code, ColorCode(0x00FF00));
        assert_eq!(t.population, 7);
        assert!(t.local_resources.is_empty());
        assert!(!t.unresolved);
    }
}
