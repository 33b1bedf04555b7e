//! Best-move search over swap candidates (single-threaded and parallel).
//!
//! This module provides two front-ends over one recursive evaluator:
//! - [`BestMoveSearch`]: evaluates root candidates one after another.
//! - [`BestMoveParallel`]: fans root candidates out over a rayon pool and
//!   merges the results on the calling thread.
//!
//! Both draw the root shuffle and one RNG seed per root candidate from the
//! caller's RNG before any evaluation starts, so for the same board, config
//! and seed they return the same move.
//!
//! Quick start
//! ```
//! use std::sync::Arc;
//! use ai_match3::engine::Board;
//! use ai_match3::scoring::ScoringConfig;
//! use ai_match3::search::{BestMoveSearch, SearchConfig};
//! use ai_match3::tiles::TileCatalog;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let board = Board::parse(Arc::new(TileCatalog::gemology()), "
//!     RGBYP
//!     GBYPR
//!     BYPRG
//!     YPRGB
//!     PRGBY
//! ").unwrap();
//! let mut search = BestMoveSearch::with_config(ScoringConfig::gemology(), SearchConfig::default().with_depth(1));
//! let mut rng = StdRng::seed_from_u64(7);
//! let best = search.best_move(&board, &mut rng).unwrap();
//! assert!(best.submove.is_none());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::trace;

use crate::engine::{Board, Refill, Swap};
use crate::scoring::ScoringConfig;
use crate::tiles::{Tile, TileCatalog};

pub mod candidates;
mod search_par;
mod search_seq;

pub use candidates::Candidate;
pub use search_par::BestMoveParallel;
pub use search_seq::BestMoveSearch;

/// Weight of a sub-move's total relative to the move that precedes it.
pub const DEFAULT_DEPTH_FACTOR: f64 = 0.75;

/// Search knobs.
///
/// - `depth`: number of look-ahead swaps (1 = immediate points only).
/// - `depth_factor`: discount applied to each deeper level of the chain.
/// - `workers`: pool size for [`BestMoveParallel`]; 1 runs sequentially.
/// - `refill`: what cleared cells become inside the search tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub depth: u32,
    pub depth_factor: f64,
    pub workers: usize,
    pub refill: Refill,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { depth: 2, depth_factor: DEFAULT_DEPTH_FACTOR, workers: num_cpus::get().max(1), refill: Refill::Unknown }
    }
}

impl SearchConfig {
    /// Small, single-threaded settings for tests.
    pub fn for_testing() -> Self { Self { depth: 1, workers: 1, ..Self::default() } }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_depth_factor(mut self, depth_factor: f64) -> Self {
        self.depth_factor = depth_factor;
        self
    }

    pub fn with_refill(mut self, refill: Refill) -> Self {
        self.refill = refill;
        self
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("search depth must be at least 1")]
    ZeroDepth,
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("board is not settled: it has empty cells or pending clears")]
    Unsettled,
    #[error("no candidate swaps: every adjacent pair holds identical tiles")]
    NoCandidates,
    #[error("search cancelled")]
    Cancelled,
    #[error("worker evaluating {candidate} failed: {reason}")]
    WorkerFailed { candidate: String, reason: String },
    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }

    /// Clear the flag so the token can be reused for another search.
    pub fn reset(&self) { self.0.store(false, Ordering::Relaxed); }

    #[inline]
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Basic search stats for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Candidates evaluated across the whole tree.
    pub nodes: u64,
    /// Largest `nodes` seen since the last reset.
    pub peak_nodes: u64,
    /// Candidates at the root.
    pub root_candidates: usize,
}

impl SearchStats {
    fn record(&mut self, nodes: u64, root_candidates: usize) {
        self.nodes = nodes;
        self.peak_nodes = self.peak_nodes.max(nodes);
        self.root_candidates = root_candidates;
    }
}

/// A swap, the points its cascade yields, and the best follow-up found one
/// level shallower.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub swap: Swap,
    /// Tiles at `swap.a` and `swap.b` before swapping.
    pub tiles: [Tile; 2],
    pub points: f64,
    pub submove: Option<Box<Move>>,
}

impl Move {
    /// `points + depth_factor * submove.total_points(depth_factor)`.
    pub fn total_points(&self, depth_factor: f64) -> f64 {
        match &self.submove {
            Some(next) => self.points + depth_factor * next.total_points(depth_factor),
            None => self.points,
        }
    }

    /// This move followed by each sub-move in turn.
    pub fn chain(&self) -> impl Iterator<Item = &Move> {
        std::iter::successors(Some(self), |m| m.submove.as_deref())
    }

    /// Number of moves in the chain, this one included.
    pub fn chain_len(&self) -> usize { self.chain().count() }

    /// `x,y(S)<->x,y(S) N.Npts` per move (1-based coordinates), joined with `, `.
    pub fn describe(&self, catalog: &TileCatalog) -> String {
        let parts: Vec<String> = self
            .chain()
            .map(|m| {
                format!(
                    "{}({})<->{}({}) {:.1}pts",
                    m.swap.a,
                    catalog.symbol_of(m.tiles[0]),
                    m.swap.b,
                    catalog.symbol_of(m.tiles[1]),
                    m.points
                )
            })
            .collect();
        parts.join(", ")
    }
}

/// True when `challenger` should replace `incumbent`.
///
/// Higher total wins. On an exact tie the chains are walked pairwise from
/// the moves themselves; the first step where one side scored more decides,
/// and the incumbent stays when either chain runs out first.
pub fn prefer(challenger: &Move, incumbent: &Move, depth_factor: f64) -> bool {
    let c = challenger.total_points(depth_factor);
    let i = incumbent.total_points(depth_factor);
    if c != i {
        return c > i;
    }
    for (a, b) in challenger.chain().zip(incumbent.chain()) {
        if a.points != b.points {
            return a.points > b.points;
        }
    }
    false
}

/// Fold `moves` (in shuffle order) down to the preferred one.
pub fn select(moves: impl IntoIterator<Item = Move>, depth_factor: f64) -> Option<Move> {
    moves.into_iter().fold(None, |best, mv| match best {
        Some(incumbent) if !prefer(&mv, &incumbent, depth_factor) => Some(incumbent),
        _ => Some(mv),
    })
}

/// Recursive evaluation of one candidate and its subtree, single-threaded.
pub(crate) struct Evaluator<'a> {
    scoring: &'a ScoringConfig,
    depth_factor: f64,
    refill: Refill,
    cancel: &'a CancelToken,
    pub(crate) nodes: u64,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(scoring: &'a ScoringConfig, cfg: &SearchConfig, cancel: &'a CancelToken) -> Self {
        Self { scoring, depth_factor: cfg.depth_factor, refill: cfg.refill, cancel, nodes: 0 }
    }

    /// Root task: evaluate `candidate` with an RNG seeded from `seed`.
    pub(crate) fn evaluate_root(
        &mut self,
        board: &Board,
        candidate: Candidate,
        depth: u32,
        seed: u64,
    ) -> Result<Move, SearchError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.evaluate(board, candidate, depth, &mut rng)
    }

    fn evaluate<R: Rng + ?Sized>(
        &mut self,
        board: &Board,
        candidate: Candidate,
        depth: u32,
        rng: &mut R,
    ) -> Result<Move, SearchError> {
        if self.cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        self.nodes += 1;
        let mut next = board.clone();
        next.swap(candidate.swap);
        let points = next.simulate(self.scoring, self.refill, rng);
        let submove = if depth > 1 { self.best_below(&next, depth - 1, rng)?.map(Box::new) } else { None };
        Ok(candidate.into_move(points, submove))
    }

    fn best_below<R: Rng + ?Sized>(&mut self, board: &Board, depth: u32, rng: &mut R) -> Result<Option<Move>, SearchError> {
        let mut best: Option<Move> = None;
        for candidate in candidates::shuffled(board, rng) {
            let mv = self.evaluate(board, candidate, depth, rng)?;
            trace!(depth, points = mv.points, "evaluated sub-move");
            best = match best {
                Some(incumbent) if !prefer(&mv, &incumbent, self.depth_factor) => Some(incumbent),
                _ => Some(mv),
            };
        }
        Ok(best)
    }
}

/// Check preconditions, shuffle root candidates and draw one seed per
/// candidate in shuffle order.
pub(crate) fn prepare_root<R: Rng + ?Sized>(
    board: &Board,
    depth: u32,
    rng: &mut R,
) -> Result<Vec<(Candidate, u64)>, SearchError> {
    if depth == 0 {
        return Err(SearchError::ZeroDepth);
    }
    if !board.validate() {
        return Err(SearchError::Unsettled);
    }
    let candidates = candidates::shuffled(board, rng);
    if candidates.is_empty() {
        return Err(SearchError::NoCandidates);
    }
    Ok(candidates.into_iter().map(|c| (c, rng.gen::<u64>())).collect())
}
