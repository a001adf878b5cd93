//! Map hierarchy extraction library
//!
//! Turns a stack of color-coded rasters into a continent → province → tile
//! tree and enriches every tile with terrain, population, economy, resources
//! and claim values. Re-exports modules for use by the binary and tools.

pub mod attributes;
pub mod centroid;
pub mod claim;
pub mod color;
pub mod config;
pub mod curve;
pub mod edge_wrap;
pub mod export;
pub mod hierarchy;
pub mod localisation;
pub mod model;
pub mod overlay;
pub mod persistence;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod regions;
pub mod resources;
pub mod scale;
pub mod tables;

pub use color::ColorCode;
pub use config::PipelineConfig;
pub use hierarchy::MapHierarchy;
pub use pipeline::{Pipeline, PipelineError, PipelineReport};
pub use raster::RasterLayer;
