use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use map_hierarchy::{Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "map_hierarchy")]
#[command(about = "Extract the continent/province/tile hierarchy from color-coded map rasters")]
struct Args {
    /// Pipeline configuration file (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load the hierarchy from existing records instead of rebuilding it
    #[arg(long)]
    skip_generate: bool,

    /// Skip the claimed-overlay merge
    #[arg(long)]
    no_overlay: bool,

    /// URL of the claimed-tile overlay image
    #[arg(long)]
    overlay_url: Option<String>,

    /// Directory holding the per-continent records
    #[arg(long)]
    records_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if args.skip_generate {
        config.stages.generate_map = false;
    }
    if args.no_overlay {
        config.stages.merge_overlay = false;
    }
    if let Some(url) = &args.overlay_url {
        config.claimed_map_url = Some(url.clone());
    }
    if let Some(dir) = &args.records_dir {
        config.records_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let mut pipeline = Pipeline::new(config);
    let report = pipeline.run().context("Pipeline run failed")?;

    info!(
        "Done: {} continents, {} provinces, {} tiles",
        report.continents, report.provinces, report.tiles
    );
    if !report.unresolved_provinces.is_empty() || !report.unresolved_tiles.is_empty() {
        warn!(
            "{} provinces and {} tiles have no resolvable parent",
            report.unresolved_provinces.len(),
            report.unresolved_tiles.len()
        );
    }
    if !report.missing_regions.is_empty() {
        warn!("{} regions could not be located", report.missing_regions.len());
    }
    if !report.terrain_failures.is_empty() {
        warn!("{} tiles have unmapped terrain", report.terrain_failures.len());
    }
    if let Some(err) = &report.overlay_error {
        warn!("Claimed overlay unavailable: {}", err);
    }
    Ok(())
}
