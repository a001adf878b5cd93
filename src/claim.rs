//! Claim value balancing.
//!
//! A tile's claim value folds its population, GDP, area and resource yields
//! into one score. The function is pure: equal inputs give equal outputs.

use log::debug;

use crate::hierarchy::MapHierarchy;
use crate::model::{ResourceDef, TileData};
use crate::progress::{ProgressSink, Stage};

const POPULATION_WEIGHT: f64 = 0.08;
const GDP_WEIGHT: f64 = 0.01;
const AREA_WEIGHT: f64 = 10.0;
const RESOURCE_MULTIPLIER: i64 = 800;
const CLAIM_DIVISOR: i64 = 5;

/// Claim weight per unit of yield; unknown resource types are worth nothing.
pub fn resource_weight(resource: &str) -> i64 {
    match resource {
        "Common Ore" => 15,
        "Rare Ore" => 30,
        "Nuclear Ore" => 25,
        "Food" => 2,
        "Hydrates" => 10,
        _ => 0,
    }
}

pub fn resource_value(resources: &[ResourceDef]) -> i64 {
    resources
        .iter()
        .map(|r| r.yield_tier as i64 * resource_weight(&r.resource))
        .sum()
}

/// Round to the nearest integer, ties to even.
fn round_int(value: f64) -> i64 {
    value.round_ties_even() as i64
}

pub fn claim_value(population: u64, gdp: f64, area: f32, resources: &[ResourceDef]) -> i64 {
    let claim = round_int(population as f64 * POPULATION_WEIGHT)
        + round_int(gdp * GDP_WEIGHT)
        + round_int(area as f64 * AREA_WEIGHT);

    (claim + resource_value(resources) * RESOURCE_MULTIPLIER) / CLAIM_DIVISOR
}

pub fn tile_claim_value(tile: &TileData) -> i64 {
    claim_value(tile.population, tile.gdp, tile.area, &tile.local_resources)
}

/// Set the claim value of every tile. Returns the number of tiles updated.
pub fn balance_claims(hierarchy: &mut MapHierarchy, progress: &mut dyn ProgressSink) -> usize {
    let total = hierarchy.province_count();
    let mut updated = 0;

    for (done, province) in hierarchy.provinces_mut().enumerate() {
        for tile in province.tiles.iter_mut() {
            tile.claim_value = tile_claim_value(tile);
            updated += 1;
            debug!("{} claim value {}", tile.hex_code, tile.claim_value);
        }
        progress.checkpoint(Stage::Claims, done + 1, total);
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_tile() {
        // round(80) + round(5) + round(20) = 105, 105 / 5 = 21
        assert_eq!(claim_value(1000, 500.0, 2.0, &[]), 21);
    }

    #[test]
    fn test_resources_dominate() {
        let resources = vec![ResourceDef::new("Common Ore", 2), ResourceDef::new("Food", 3)];
        assert_eq!(resource_value(&resources), 36);
        assert_eq!(claim_value(1000, 500.0, 2.0, &resources), (105 + 36 * 800) / 5);
    }

    #[test]
    fn test_unknown_resource_worth_nothing() {
        let resources = vec![ResourceDef::new("Unobtainium", 3)];
        assert_eq!(claim_value(1000, 500.0, 2.0, &resources), 21);
    }

    #[test]
    fn test_final_divide_truncates() {
        // 0 + 0 + 14 = 14, 14 / 5 = 2
        assert_eq!(claim_value(1, 0.0, 1.4, &[]), 2);
        assert_eq!(claim_value(0, 0.0, 0.0, &[]), 0);
    }

    #[test]
    fn test_deterministic() {
        let resources = vec![ResourceDef::new("Rare Ore", 1)];
        let a = claim_value(12345, 6789.5, 3.25, &resources);
        let b = claim_value(12345, 6789.5, 3.25, &resources);
        assert_eq!(a, b);
    }

    #[test]
    fn test_balance_all() {
        let mut tree = MapHierarchy::new();
        tree.add_tile(
            TileData {
                hex_code: crate::color::ColorCode(1),
                population: 1000,
                gdp: 500.0,
                area: 2.0,
                ..Default::default()
            },
            None,
        );
        let updated = balance_claims(&mut tree, &mut crate::progress::NoProgress);
        assert_eq!(updated, 1);
        assert_eq!(tree.tile(crate::color::ColorCode(1)).unwrap().claim_value, 21);
    }
}
