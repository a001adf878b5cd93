//! JSON records on disk.
//!
//! Every file shares one shape, `{ "Content": [ ... ] }`. The tree is stored
//! as one file per continent named after its identity (`HEX.json`); name
//! tables and culture definitions live in the localisation directory.
//!
//! Reading never fails a run: a missing, unreadable, empty or `{}` file is
//! treated as holding no data and logged.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::ColorCode;
use crate::hierarchy::MapHierarchy;
use crate::localisation::{CultureTable, NameTable};
use crate::model::{ContinentData, CultureDef, LocalisationEntry};

pub const CONTINENT_NAMES_FILE: &str = "ContinentNames.json";
pub const PROVINCE_NAMES_FILE: &str = "ProvinceNames.json";
pub const CULTURES_FILE: &str = "Cultures.json";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Content<T> {
    #[serde(default = "Vec::new")]
    content: Vec<T>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContentRef<'a, T> {
    content: &'a [T],
}

/// Write `items` wrapped as `{ "Content": items }`, creating parent directories.
pub fn write_content<T: Serialize>(path: &Path, items: &[T]) -> Result<(), PersistenceError> {
    let io_err = |source: std::io::Error| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &ContentRef { content: items }).map_err(|source| {
        PersistenceError::Json {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Read a `{ "Content": [...] }` file; anything unusable yields no items.
pub fn read_content<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        debug!("{:?} does not exist, no data", path);
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("Could not open {:?}: {}", path, err);
            return Vec::new();
        }
    };

    match serde_json::from_reader::<_, Content<T>>(BufReader::new(file)) {
        Ok(wrapper) if wrapper.content.is_empty() => {
            warn!("{:?} holds no records", path);
            Vec::new()
        }
        Ok(wrapper) => wrapper.content,
        Err(err) => {
            warn!("Skipping malformed record {:?}: {}", path, err);
            Vec::new()
        }
    }
}

/// Per-continent record files.
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, continent: ColorCode) -> PathBuf {
        self.dir.join(format!("{}.json", continent))
    }

    pub fn save_continent(&self, continent: &ContinentData) -> Result<(), PersistenceError> {
        write_content(&self.record_path(continent.hex_code), std::slice::from_ref(continent))
    }

    /// Write every continent of the tree. Returns the number of files written.
    pub fn save_all(&self, hierarchy: &MapHierarchy) -> Result<usize, PersistenceError> {
        for continent in hierarchy.continents() {
            self.save_continent(continent)?;
        }
        info!("Saved {} continent records to {:?}", hierarchy.continent_count(), self.dir);
        Ok(hierarchy.continent_count())
    }

    /// Load every `*.json` record in the directory, in file-name order.
    pub fn load_all(&self) -> Vec<ContinentData> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Could not read record directory {:?}: {}", self.dir, err);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let continents: Vec<ContinentData> = paths
            .iter()
            .flat_map(|path| read_content::<ContinentData>(path))
            .collect();
        info!("Loaded {} continents from {} record files", continents.len(), paths.len());
        continents
    }

    pub fn load_hierarchy(&self) -> MapHierarchy {
        MapHierarchy::from_continents(self.load_all())
    }
}

/// Name tables and culture definitions.
pub struct LocalisationStore {
    dir: PathBuf,
}

impl LocalisationStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn load_names(&self, file: &str) -> NameTable {
        NameTable::from_entries(read_content::<LocalisationEntry>(&self.dir.join(file)))
    }

    pub fn save_names(&self, file: &str, names: &NameTable) -> Result<(), PersistenceError> {
        write_content(&self.dir.join(file), names.entries())
    }

    pub fn load_cultures(&self) -> CultureTable {
        CultureTable::from_defs(read_content::<CultureDef>(&self.dir.join(CULTURES_FILE)))
    }
}
