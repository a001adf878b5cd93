//! Static color lookup tables.
//!
//! Terrain and resource layers are painted with a fixed palette. The tables
//! are built once at startup (defaults, or overrides from the config file)
//! and only ever read afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::ColorCode;
use crate::model::ResourceDef;

const DEFAULT_TERRAIN: [(u32, &str); 12] = [
    (0x3762AB, "Ocean"),
    (0x4A85E2, "Shallows"),
    (0x5498FF, "Freshwater"),
    (0xA7A7A7, "Mountain"),
    (0xC78FDF, "Tundra"),
    (0xD8D8D8, "Ice Cap"),
    (0xE4FDFF, "Ice Sheet"),
    (0xEABF6F, "Desert"),
    (0x974F23, "Badlands"),
    (0x83BC2E, "Grasslands"),
    (0x5D852A, "Highlands"),
    (0xFAF2B7, "Shores"),
];

const DEFAULT_RESOURCES: [(u32, &str, i32); 15] = [
    (0xECAEA4, "Common Ore", 1),
    (0xDB6551, "Common Ore", 2),
    (0x8D4134, "Common Ore", 3),
    (0xF3C99C, "Rare Ore", 1),
    (0xE99942, "Rare Ore", 2),
    (0x96632A, "Rare Ore", 3),
    (0xA4E4A4, "Nuclear Ore", 1),
    (0x51CC51, "Nuclear Ore", 2),
    (0x348434, "Nuclear Ore", 3),
    (0xB7D0F6, "Hydrates", 1),
    (0x75A6EF, "Hydrates", 2),
    (0x4B6B9A, "Hydrates", 3),
    (0xD8EAD3, "Food", 1),
    (0xB6D7AB, "Food", 2),
    (0x758B6E, "Food", 3),
];

/// Biome color → terrain label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerrainTable(HashMap<ColorCode, String>);

impl Default for TerrainTable {
    fn default() -> Self {
        Self(
            DEFAULT_TERRAIN
                .iter()
                .map(|&(code, label)| (ColorCode(code), label.to_string()))
                .collect(),
        )
    }
}

impl TerrainTable {
    pub fn lookup(&self, color: ColorCode) -> Option<&str> {
        self.0.get(&color).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resource layer color → typed yield.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable(HashMap<ColorCode, ResourceDef>);

impl Default for ResourceTable {
    fn default() -> Self {
        Self(
            DEFAULT_RESOURCES
                .iter()
                .map(|&(code, resource, tier)| (ColorCode(code), ResourceDef::new(resource, tier)))
                .collect(),
        )
    }
}

impl ResourceTable {
    pub fn lookup(&self, color: ColorCode) -> Option<&ResourceDef> {
        self.0.get(&color)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes() {
        assert_eq!(TerrainTable::default().len(), 12);
        assert_eq!(ResourceTable::default().len(), 15);
    }

    #[test]
    fn test_lookups() {
        let terrain = TerrainTable::default();
        assert_eq!(terrain.lookup(ColorCode(0x83BC2E)), Some("Grasslands"));
        assert_eq!(terrain.lookup(ColorCode(0x000001)), None);

        let resources = ResourceTable::default();
        assert_eq!(
            resources.lookup(ColorCode(0x96632A)),
            Some(&ResourceDef::new("Rare Ore", 3))
        );
    }

    #[test]
    fn test_override_from_json() {
        let table: TerrainTable = serde_json::from_str(r#"{"FFFFFF":"Salt Flat"}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(ColorCode(0xFFFFFF)), Some("Salt Flat"));

        let resources: ResourceTable =
            serde_json::from_str(r#"{"010203":{"Resource":"Food","Yield":2}}"#).unwrap();
        assert_eq!(resources.lookup(ColorCode(0x010203)).unwrap().yield_tier, 2);
    }
}
