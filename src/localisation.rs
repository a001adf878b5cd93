//! Display names and culture reference data.
//!
//! Names are an overlay on the geographic tree: they are keyed by identity
//! color and never affect extraction. New entities receive a placeholder
//! name so they are easy to find and rename by hand; existing names are kept.

use std::collections::HashMap;

use log::info;

use crate::color::ColorCode;
use crate::hierarchy::MapHierarchy;
use crate::model::{CultureDef, LocalisationEntry};

/// Ordered color → name table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NameTable {
    entries: Vec<LocalisationEntry>,
    index: HashMap<ColorCode, usize>,
}

impl NameTable {
    pub fn from_entries(entries: Vec<LocalisationEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    fn insert(&mut self, entry: LocalisationEntry) -> bool {
        if self.index.contains_key(&entry.hex_code) {
            return false;
        }
        self.index.insert(entry.hex_code, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[LocalisationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self, color: ColorCode) -> Option<&str> {
        self.index.get(&color).map(|&i| self.entries[i].name.as_str())
    }

    /// Add `placeholder` for `color` unless a name already exists.
    pub fn ensure(&mut self, color: ColorCode, placeholder: impl FnOnce() -> String) -> bool {
        if self.index.contains_key(&color) {
            return false;
        }
        self.insert(LocalisationEntry {
            hex_code: color,
            name: placeholder(),
        })
    }
}

/// Register placeholder names for every continent and province in the tree.
///
/// Continents get `HEX-`, provinces `HEX-CONTINENTHEX`. The sentinel
/// parents are never named. Returns how many continent and province names
/// were added.
pub fn register_names(
    hierarchy: &MapHierarchy,
    continent_names: &mut NameTable,
    province_names: &mut NameTable,
) -> (usize, usize) {
    let mut added = (0, 0);
    for continent in hierarchy.continents() {
        let continent_hex = continent.hex_code;
        // Provinces under the sentinel are still named.
        let named = !continent_hex.is_sentinel()
            && continent_names.ensure(continent_hex, || format!("{}-", continent_hex));
        if named {
            added.0 += 1;
        }
        for province in &continent.provinces {
            let province_hex = province.hex_code;
            if province_hex.is_sentinel() {
                continue;
            }
            if province_names.ensure(province_hex, || format!("{}-{}", province_hex, continent_hex)) {
                added.1 += 1;
            }
        }
    }
    if added.0 + added.1 > 0 {
        info!("Added {} continent and {} province placeholder names", added.0, added.1);
    }
    added
}

/// Culture definitions keyed by language-map color.
#[derive(Clone, Debug, Default)]
pub struct CultureTable {
    defs: HashMap<ColorCode, CultureDef>,
}

impl CultureTable {
    pub fn from_defs(defs: Vec<CultureDef>) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.hex_code, d)).collect(),
        }
    }

    pub fn lookup(&self, color: ColorCode) -> Option<&CultureDef> {
        self.defs.get(&color)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_names_preserved() {
        let mut provinces = NameTable::from_entries(vec![LocalisationEntry {
            hex_code: ColorCode(0x00AA00),
            name: "Highmarch".to_string(),
        }]);
        let mut continents = NameTable::default();

        let mut tree = MapHierarchy::new();
        tree.add_continent(ColorCode(0xAA0000));
        tree.add_province(ColorCode(0x00AA00), Some(ColorCode(0xAA0000)));
        tree.add_province(ColorCode(0x00BB00), Some(ColorCode(0xAA0000)));

        let added = register_names(&tree, &mut continents, &mut provinces);
        assert_eq!(added, (1, 1));
        assert_eq!(provinces.name(ColorCode(0x00AA00)), Some("Highmarch"));
        assert_eq!(provinces.name(ColorCode(0x00BB00)), Some("00BB00-AA0000"));
        assert_eq!(continents.name(ColorCode(0xAA0000)), Some("AA0000-"));

        // Running again adds nothing.
        assert_eq!(register_names(&tree, &mut continents, &mut provinces), (0, 0));
    }

    #[test]
    fn test_sentinel_parents_unnamed() {
        let mut tree = MapHierarchy::new();
        tree.add_continent(ColorCode(0xAA0000));
        tree.add_province(ColorCode(0x00AA00), Some(ColorCode(0xAA0000)));
        tree.add_province(ColorCode(0x00CC00), None);
        tree.add_tile(
            crate::model::TileData {
                hex_code: ColorCode(0x0000AA),
                ..Default::default()
            },
            None,
        );
        assert!(tree.continent(ColorCode::SENTINEL).is_some());
        assert!(tree.province(ColorCode::SENTINEL).is_some());

        let mut continents = NameTable::default();
        let mut provinces = NameTable::default();
        let added = register_names(&tree, &mut continents, &mut provinces);

        assert_eq!(added, (1, 2));
        assert_eq!(continents.name(ColorCode::SENTINEL), None);
        assert_eq!(provinces.name(ColorCode::SENTINEL), None);
        assert_eq!(provinces.name(ColorCode(0x00CC00)), Some("00CC00-000000"));
    }

    #[test]
    fn test_duplicate_entries_keep_first() {
        let table = NameTable::from_entries(vec![
            LocalisationEntry { hex_code: ColorCode(1), name: "A".into() },
            LocalisationEntry { hex_code: ColorCode(1), name: "B".into() },
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.name(ColorCode(1)), Some("A"));
    }

    #[test]
    fn test_culture_lookup() {
        let table = CultureTable::from_defs(vec![CultureDef {
            hex_code: ColorCode(0x102030),
            language: "Old Coastal".into(),
            ..Default::default()
        }]);
        assert_eq!(table.lookup(ColorCode(0x102030)).unwrap().language, "Old Coastal");
        assert!(table.lookup(ColorCode(0x000001)).is_none());
    }
}
