//! Progress checkpoints.
//!
//! Long stages report back after every continent, every province and every
//! batch of tiles. A checkpoint carries no ordering obligation; the stage
//! carries on exactly where it was once the sink returns.

use std::fmt;

use log::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Continents,
    Provinces,
    Tiles,
    EdgeWrap,
    Attributes,
    Resources,
    Claims,
    Overlay,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Continents => "continents",
            Stage::Provinces => "provinces",
            Stage::Tiles => "tiles",
            Stage::EdgeWrap => "edge wrap",
            Stage::Attributes => "attributes",
            Stage::Resources => "resources",
            Stage::Claims => "claim values",
            Stage::Overlay => "claimed overlay",
        };
        f.write_str(name)
    }
}

/// Receives progress checkpoints from running stages.
pub trait ProgressSink {
    fn checkpoint(&mut self, stage: Stage, done: usize, total: usize);

    /// Called once when a stage has fully consumed its input.
    fn stage_finished(&mut self, _stage: Stage) {}
}

/// Discards all checkpoints.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn checkpoint(&mut self, _stage: Stage, _done: usize, _total: usize) {}
}

/// Logs checkpoints at debug level and stage completion at info level.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn checkpoint(&mut self, stage: Stage, done: usize, total: usize) {
        debug!("{}: {} / {}", stage, done, total);
    }

    fn stage_finished(&mut self, stage: Stage) {
        info!("Finished {}", stage);
    }
}

/// Collects checkpoints in memory.
#[derive(Default)]
pub struct RecordingProgress {
    pub checkpoints: Vec<(Stage, usize, usize)>,
    pub finished: Vec<Stage>,
}

impl ProgressSink for RecordingProgress {
    fn checkpoint(&mut self, stage: Stage, done: usize, total: usize) {
        self.checkpoints.push((stage, done, total));
    }

    fn stage_finished(&mut self, stage: Stage) {
        self.finished.push(stage);
    }
}

impl RecordingProgress {
    pub fn count(&self, stage: Stage) -> usize {
        self.checkpoints.iter().filter(|(s, _, _)| *s == stage).count()
    }
}
