//! Claimed-tile overlay.
//!
//! An externally maintained raster marks tiles that players have already
//! claimed: any non-transparent pixel at a tile's position means claimed.
//! The overlay is fetched once per run; when it cannot be fetched or
//! decoded, every tile is treated as unclaimed and the failure is reported.

use std::time::Duration;

use log::{error, info};
use serde::Serialize;
use thiserror::Error;

use crate::color::ColorCode;
use crate::hierarchy::MapHierarchy;
use crate::progress::{ProgressSink, Stage};
use crate::raster::{RasterError, RasterLayer};

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("network error fetching claimed overlay: {0}")]
    Network(#[from] reqwest::Error),
    #[error("no claimed overlay location configured")]
    Unconfigured,
    #[error("claimed overlay request returned status {0}")]
    Status(u16),
    #[error("claimed overlay could not be decoded: {0}")]
    Decode(#[from] RasterError),
    #[error("claimed overlay is {actual_width}x{actual_height}, expected {width}x{height}")]
    Dimension {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
}

/// Anything that can produce the claimed overlay.
pub trait OverlaySource {
    fn fetch(&self) -> Result<RasterLayer, OverlayError>;
}

/// Fetches the overlay image over HTTP.
///
/// The client is built on fetch, so a client that cannot be built is a
/// fetch failure like any other.
pub struct HttpOverlaySource {
    url: String,
    timeout: Duration,
}

impl HttpOverlaySource {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl OverlaySource for HttpOverlaySource {
    fn fetch(&self) -> Result<RasterLayer, OverlayError> {
        info!("Fetching claimed overlay from {}", self.url);
        let client = reqwest::blocking::Client::builder().timeout(self.timeout).build()?;
        let response = client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(OverlayError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes()?;
        Ok(RasterLayer::from_bytes(&bytes)?)
    }
}

/// Stands in when no overlay location is configured.
pub struct Unconfigured;

impl OverlaySource for Unconfigured {
    fn fetch(&self) -> Result<RasterLayer, OverlayError> {
        Err(OverlayError::Unconfigured)
    }
}

/// Fetch the overlay, falling back to a transparent raster on any failure.
///
/// Returns the overlay and the failure message, if there was one.
pub fn load_overlay_or_empty(
    source: &dyn OverlaySource,
    width: usize,
    height: usize,
) -> (RasterLayer, Option<String>) {
    let fetched = source.fetch().and_then(|overlay| {
        if overlay.width != width || overlay.height != height {
            return Err(OverlayError::Dimension {
                width,
                height,
                actual_width: overlay.width,
                actual_height: overlay.height,
            });
        }
        Ok(overlay)
    });

    match fetched {
        Ok(overlay) => (overlay, None),
        Err(err) => {
            error!("{}; treating every tile as unclaimed", err);
            (RasterLayer::transparent(width, height), Some(err.to_string()))
        }
    }
}

/// Claimed state of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClaimedTile {
    pub hex_code: ColorCode,
    pub claimed: bool,
}

/// Look up every tile's position on the overlay, checkpointing after every
/// `batch` tiles.
pub fn merge_claims(
    hierarchy: &MapHierarchy,
    overlay: &RasterLayer,
    batch: usize,
    progress: &mut dyn ProgressSink,
) -> Vec<ClaimedTile> {
    let total = hierarchy.tile_count();
    let batch = batch.max(1);
    let mut claims = Vec::with_capacity(total);

    for tile in hierarchy.tiles() {
        let claimed = overlay.alpha_at(tile.position.x, tile.position.y) > 0.0;
        claims.push(ClaimedTile {
            hex_code: tile.hex_code,
            claimed,
        });
        let done = claims.len();
        if done % batch == 0 || done == total {
            progress.checkpoint(Stage::Overlay, done, total);
        }
    }

    let count = claims.iter().filter(|c| c.claimed).count();
    info!("{} of {} tiles claimed", count, total);
    claims
}
