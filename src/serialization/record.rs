use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::engine::{Board, BoardError, Swap};
use crate::tiles::{TileCatalog, TileSpec};

/// Run-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMeta {
    /// Tiles in id order, with the symbols used by the board text.
    pub tiles: Vec<TileSpec>,
    pub depth: u32,
    pub seed: Option<u64>,
    pub start_unix_s: u64,
    pub elapsed_s: f32,
    pub moves: u64,
    pub total_points: f64,
    pub engine_str: Option<String>,
}

/// One applied move.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    /// Board before the move, in [`Board::parse`] format.
    pub pre_board: String,
    pub swap: Swap,
    pub expected_total: f64,
    pub actual_points: f64,
    /// True when the move came from an earlier search's chain rather than a
    /// fresh search.
    pub followed_chain: bool,
}

impl StepRecord {
    pub fn board(&self, catalog: Arc<TileCatalog>) -> Result<Board, BoardError> { Board::parse(catalog, &self.pre_board) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub meta: RunMeta,
    pub steps: Vec<StepRecord>,
    pub final_board: String,
}

impl RunRecord {
    /// Catalog rebuilt from `meta.tiles`.
    pub fn catalog(&self) -> Result<TileCatalog, crate::tiles::CatalogError> { TileCatalog::new(self.meta.tiles.clone()) }
}

#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

pub fn now_unix_seconds() -> u64 { SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() }

pub fn to_postcard_bytes(run: &RunRecord) -> Result<Vec<u8>, SerializationError> { Ok(postcard::to_allocvec(run)?) }

pub fn from_postcard_bytes(bytes: &[u8]) -> Result<RunRecord, SerializationError> { Ok(postcard::from_bytes(bytes)?) }

/// Write a postcard-encoded run to a file.
pub fn write_record_to_path<P: AsRef<Path>>(path: P, run: &RunRecord) -> Result<(), SerializationError> {
    let bytes = to_postcard_bytes(run)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a postcard-encoded run from a file.
pub fn read_record_from_path<P: AsRef<Path>>(path: P) -> Result<RunRecord, SerializationError> {
    let bytes = fs::read(path)?;
    from_postcard_bytes(&bytes)
}
