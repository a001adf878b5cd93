//! Continent → province → tile tree with an identity index.
//!
//! The tree owns every entity; lookups by identity go through hash indices
//! built as entities are inserted (or rebuilt once after loading records), so
//! resolving a parent never walks the tree. Entities are only ever appended,
//! which keeps the stored indices valid for the whole run.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::color::ColorCode;
use crate::model::{ContinentData, ProvinceData, TileData, Vec2};
use crate::raster::RasterLayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Continent,
    Province,
    Tile,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Continent => "continent",
            EntityKind::Province => "province",
            EntityKind::Tile => "tile",
        };
        f.write_str(name)
    }
}

/// Why a sampled point could not be matched to a known entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("no {kind} at ({x}, {y}): pixel is transparent")]
    Transparent { kind: EntityKind, x: i64, y: i64 },
    #[error("no {kind} with color {color} (sampled at ({x}, {y}))")]
    NotFound {
        kind: EntityKind,
        color: ColorCode,
        x: i64,
        y: i64,
    },
    #[error("province {province} belongs to continent {actual}, but continent map shows {sampled}")]
    ParentMismatch {
        province: ColorCode,
        sampled: ColorCode,
        actual: ColorCode,
    },
}

/// A province resolved from a sampled point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedParent {
    pub province: ColorCode,
    pub continent: ColorCode,
}

/// The in-memory geographic tree.
#[derive(Debug, Default)]
pub struct MapHierarchy {
    continents: Vec<ContinentData>,
    continent_index: HashMap<ColorCode, usize>,
    province_index: HashMap<ColorCode, (usize, usize)>,
    tile_index: HashMap<ColorCode, (usize, usize, usize)>,
}

impl MapHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from loaded records, indexing every entity once.
    pub fn from_continents(continents: Vec<ContinentData>) -> Self {
        let mut hierarchy = Self {
            continents,
            ..Default::default()
        };
        hierarchy.rebuild_index();
        hierarchy
    }

    fn rebuild_index(&mut self) {
        self.continent_index.clear();
        self.province_index.clear();
        self.tile_index.clear();
        for (ci, continent) in self.continents.iter().enumerate() {
            self.continent_index.entry(continent.hex_code).or_insert(ci);
            for (pi, province) in continent.provinces.iter().enumerate() {
                self.province_index.entry(province.hex_code).or_insert((ci, pi));
                for (ti, tile) in province.tiles.iter().enumerate() {
                    self.tile_index.entry(tile.hex_code).or_insert((ci, pi, ti));
                }
            }
        }
    }

    pub fn continents(&self) -> &[ContinentData] {
        &self.continents
    }

    pub fn into_continents(self) -> Vec<ContinentData> {
        self.continents
    }

    pub fn continent_count(&self) -> usize {
        self.continents.len()
    }

    pub fn province_count(&self) -> usize {
        self.province_index.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tile_index.len()
    }

    pub fn continent(&self, color: ColorCode) -> Option<&ContinentData> {
        self.continent_index.get(&color).map(|&ci| &self.continents[ci])
    }

    pub fn province(&self, color: ColorCode) -> Option<&ProvinceData> {
        self.province_index
            .get(&color)
            .map(|&(ci, pi)| &self.continents[ci].provinces[pi])
    }

    pub fn tile(&self, color: ColorCode) -> Option<&TileData> {
        self.tile_index
            .get(&color)
            .map(|&(ci, pi, ti)| &self.continents[ci].provinces[pi].tiles[ti])
    }

    pub fn tile_mut(&mut self, color: ColorCode) -> Option<&mut TileData> {
        let &(ci, pi, ti) = self.tile_index.get(&color)?;
        Some(&mut self.continents[ci].provinces[pi].tiles[ti])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileData> {
        self.continents.iter().flat_map(|c| c.tiles())
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut TileData> {
        self.continents
            .iter_mut()
            .flat_map(|c| c.provinces.iter_mut())
            .flat_map(|p| p.tiles.iter_mut())
    }

    pub fn provinces_mut(&mut self) -> impl Iterator<Item = &mut ProvinceData> {
        self.continents.iter_mut().flat_map(|c| c.provinces.iter_mut())
    }

    /// Add a continent; duplicate identities collapse into the existing one.
    pub fn add_continent(&mut self, color: ColorCode) -> usize {
        if let Some(&ci) = self.continent_index.get(&color) {
            return ci;
        }
        let ci = self.continents.len();
        self.continents.push(ContinentData::new(color));
        self.continent_index.insert(color, ci);
        ci
    }

    /// Add a province under `continent`, or under the sentinel continent when
    /// the parent is unknown. Returns false if the province already existed.
    pub fn add_province(&mut self, color: ColorCode, continent: Option<ColorCode>) -> bool {
        if self.province_index.contains_key(&color) {
            warn!("Province {} already defined, ignoring duplicate", color);
            return false;
        }

        let (ci, unresolved) = match continent.and_then(|c| self.continent_index.get(&c).copied()) {
            Some(ci) => (ci, false),
            None => (self.add_continent(ColorCode::SENTINEL), true),
        };

        let mut province = ProvinceData::new(color, self.continents[ci].hex_code);
        province.unresolved = unresolved;

        let pi = self.continents[ci].provinces.len();
        self.continents[ci].provinces.push(province);
        self.province_index.insert(color, (ci, pi));
        true
    }

    /// Province that collects tiles whose parent could not be resolved.
    fn sentinel_province(&mut self) -> (usize, usize) {
        if let Some(&loc) = self.province_index.get(&ColorCode::SENTINEL) {
            return loc;
        }
        let ci = self.add_continent(ColorCode::SENTINEL);
        let mut province = ProvinceData::new(ColorCode::SENTINEL, ColorCode::SENTINEL);
        province.unresolved = true;
        let pi = self.continents[ci].provinces.len();
        self.continents[ci].provinces.push(province);
        self.province_index.insert(ColorCode::SENTINEL, (ci, pi));
        (ci, pi)
    }

    /// Attach a tile to `province`, or to the sentinel province when unresolved.
    /// Back-references are filled in from the parent. Returns false on duplicates.
    pub fn add_tile(&mut self, mut tile: TileData, province: Option<ColorCode>) -> bool {
        if self.tile_index.contains_key(&tile.hex_code) {
            warn!("Tile {} already defined, ignoring duplicate", tile.hex_code);
            return false;
        }

        let (ci, pi) = match province.and_then(|p| self.province_index.get(&p).copied()) {
            Some(loc) => {
                tile.unresolved = false;
                loc
            }
            None => {
                tile.unresolved = true;
                self.sentinel_province()
            }
        };

        let parent = &mut self.continents[ci].provinces[pi];
        tile.province_parent = parent.hex_code;
        tile.continent_parent = parent.continent_parent;

        let ti = parent.tiles.len();
        let color = tile.hex_code;
        parent.tiles.push(tile);
        self.tile_index.insert(color, (ci, pi, ti));
        true
    }

    /// Sample the continent map at a pixel and match it to a known continent.
    pub fn resolve_continent(&self, continents: &RasterLayer, x: i64, y: i64) -> Result<ColorCode, ResolveError> {
        let pixel = continents.get_wrapped(x, y);
        if !RasterLayer::is_opaque(pixel) {
            return Err(ResolveError::Transparent {
                kind: EntityKind::Continent,
                x,
                y,
            });
        }
        let color = ColorCode::from_pixel(pixel);
        if self.continent_index.contains_key(&color) {
            Ok(color)
        } else {
            Err(ResolveError::NotFound {
                kind: EntityKind::Continent,
                color,
                x,
                y,
            })
        }
    }

    /// Sample both boundary maps at a position and match the owning province.
    ///
    /// The province must exist and belong to the continent shown on the
    /// continent map at the same pixel.
    pub fn resolve_province(
        &self,
        continents: &RasterLayer,
        provinces: &RasterLayer,
        position: Vec2,
    ) -> Result<ResolvedParent, ResolveError> {
        let x = position.x.floor() as i64;
        let y = position.y.floor() as i64;

        let continent = self.resolve_continent(continents, x, y)?;

        let pixel = provinces.get_wrapped(x, y);
        if !RasterLayer::is_opaque(pixel) {
            return Err(ResolveError::Transparent {
                kind: EntityKind::Province,
                x,
                y,
            });
        }
        let color = ColorCode::from_pixel(pixel);
        debug!("Searching continent {} province {}", continent, color);

        let province = self.province(color).ok_or(ResolveError::NotFound {
            kind: EntityKind::Province,
            color,
            x,
            y,
        })?;

        if province.continent_parent != continent {
            return Err(ResolveError::ParentMismatch {
                province: color,
                sampled: continent,
                actual: province.continent_parent,
            });
        }

        Ok(ResolvedParent {
            province: color,
            continent,
        })
    }
}
