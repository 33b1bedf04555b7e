//! Self-play against a randomly refilled board.
//!
//! Each turn searches for the best move sequence, applies its first swap and
//! settles the board with random refills, scoring with ground-truth points.
//! Optional extras: an energy budget, following the searched chain when a
//! move scores nothing (`fast0`), and recording every step.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crate::engine::{Board, Refill};
use crate::scoring::ScoringConfig;
use crate::search::{BestMoveParallel, Move, SearchError};
use crate::serialization::{RunMeta, RunRecord, StepRecord};
use crate::tiles::TileCatalog;

/// Harness knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelfPlayConfig {
    /// Moves available; `None` plays until another stop condition.
    pub energy: Option<u32>,
    /// After a move that scored zero, play the next move of the same chain
    /// instead of searching again.
    pub fast0: bool,
    pub max_moves: Option<u64>,
    /// Keep a [`StepRecord`] per applied move.
    pub record: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The best sequence found is worth nothing.
    ZeroTotal,
    EnergySpent,
    /// The last moves of the budget would not score, so they were kept.
    SavedLastEnergy,
    MaxMoves,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelfPlayStats {
    pub moves: u64,
    pub searches: u64,
    /// Moves taken from an earlier chain without a new search.
    pub chain_follows: u64,
    pub total_points: f64,
}

impl SelfPlayStats {
    pub fn average(&self) -> f64 {
        if self.moves == 0 { 0.0 } else { self.total_points / self.moves as f64 }
    }
}

/// One applied move.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// The applied move alone (no sub-moves).
    pub mv: Move,
    pub expected_total: f64,
    pub actual_points: f64,
    pub followed_chain: bool,
    pub stats: SelfPlayStats,
    pub energy_left: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// Moves applied this turn: one, or several when following a chain.
    Played { best: Move, steps: Vec<StepReport> },
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfPlaySummary {
    pub reason: StopReason,
    pub stats: SelfPlayStats,
}

pub struct SelfPlay {
    search: BestMoveParallel,
    actual: ScoringConfig,
    cfg: SelfPlayConfig,
    board: Board,
    energy: Option<u32>,
    stats: SelfPlayStats,
    steps: Vec<StepRecord>,
}

impl SelfPlay {
    /// Play from `board`, which must already be settled.
    pub fn new(search: BestMoveParallel, cfg: SelfPlayConfig, board: Board) -> Self {
        let actual = search.scoring().actual();
        let energy = cfg.energy;
        Self { search, actual, cfg, board, energy, stats: SelfPlayStats::default(), steps: Vec::new() }
    }

    /// Play from a random board, settled with random refills and
    /// ground-truth scoring.
    pub fn random_start<R: Rng + ?Sized>(
        catalog: Arc<TileCatalog>,
        search: BestMoveParallel,
        cfg: SelfPlayConfig,
        rng: &mut R,
    ) -> Self {
        let mut board = Board::random(catalog, rng);
        board.simulate(&search.scoring().actual(), Refill::Random, rng);
        Self::new(search, cfg, board)
    }

    #[inline]
    pub fn board(&self) -> &Board { &self.board }

    #[inline]
    pub fn stats(&self) -> SelfPlayStats { self.stats }

    #[inline]
    pub fn energy_left(&self) -> Option<u32> { self.energy }

    pub fn steps(&self) -> &[StepRecord] { &self.steps }

    fn move_limit_reached(&self) -> bool { self.cfg.max_moves.is_some_and(|max| self.stats.moves >= max) }

    /// Search once and apply the result.
    pub fn turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Turn, SearchError> {
        if self.move_limit_reached() {
            return Ok(Turn::Stopped(StopReason::MaxMoves));
        }
        if self.energy == Some(0) {
            return Ok(Turn::Stopped(StopReason::EnergySpent));
        }
        let configured = self.search.config().depth;
        let depth = match self.energy {
            Some(e) if e < configured => e,
            _ => configured,
        };
        let depth_factor = self.search.config().depth_factor;
        let best = self.search.best_move_at(&self.board, depth, rng)?;
        self.stats.searches += 1;
        let expected = best.total_points(depth_factor);
        info!(depth, expected, sequence = %best.describe(self.board.catalog()), "best move sequence");
        if expected == 0.0 {
            warn!("best move sequence gives zero points");
            return Ok(Turn::Stopped(StopReason::ZeroTotal));
        }
        if self.energy.is_some_and(|e| e <= configured) && expected < 1.0 {
            info!("not using last energy, no move gives points");
            return Ok(Turn::Stopped(StopReason::SavedLastEnergy));
        }

        let mut steps = Vec::new();
        let mut current = Some(best.clone());
        let mut followed_chain = false;
        while let Some(mv) = current.take() {
            let expected_total = mv.total_points(depth_factor);
            let Move { swap, tiles, points, submove } = mv;
            let pre_board = self.cfg.record.then(|| self.board.to_text());
            self.board.swap(swap);
            let actual_points = self.board.simulate(&self.actual, Refill::Random, rng);
            self.stats.moves += 1;
            self.stats.total_points += actual_points;
            if followed_chain {
                self.stats.chain_follows += 1;
            }
            self.energy = self.energy.map(|e| e.saturating_sub(1));
            info!(
                actual_points,
                average = self.stats.average(),
                energy_spent = self.stats.moves,
                "applied move"
            );
            if let Some(pre_board) = pre_board {
                self.steps.push(StepRecord { pre_board, swap, expected_total, actual_points, followed_chain });
            }
            steps.push(StepReport {
                mv: Move { swap, tiles, points, submove: None },
                expected_total,
                actual_points,
                followed_chain,
                stats: self.stats,
                energy_left: self.energy,
            });
            if !self.cfg.fast0 || actual_points != 0.0 || self.energy == Some(0) || self.move_limit_reached() {
                break;
            }
            // The chain was searched against unknown refills; skip a follow-up
            // that no longer swaps two different tiles.
            current = submove.map(|next| *next).filter(|next| self.board.get(next.swap.a) != self.board.get(next.swap.b));
            followed_chain = true;
        }
        Ok(Turn::Played { best, steps })
    }

    /// Play turns until a stop condition, calling `on_turn` after each.
    pub fn run<R, F>(&mut self, rng: &mut R, mut on_turn: F) -> Result<SelfPlaySummary, SearchError>
    where
        R: Rng + ?Sized,
        F: FnMut(&SelfPlay, &Turn),
    {
        loop {
            let turn = self.turn(rng)?;
            on_turn(self, &turn);
            if let Turn::Stopped(reason) = turn {
                info!(?reason, moves = self.stats.moves, total = self.stats.total_points, "self-play finished");
                return Ok(SelfPlaySummary { reason, stats: self.stats });
            }
        }
    }

    /// Recorded steps wrapped into a run record. `meta.moves` and
    /// `meta.total_points` are filled from the harness stats.
    pub fn record(&self, mut meta: RunMeta) -> RunRecord {
        meta.moves = self.stats.moves;
        meta.total_points = self.stats.total_points;
        if meta.tiles.is_empty() {
            meta.tiles = self.board.catalog().specs();
        }
        RunRecord { meta, steps: self.steps.clone(), final_board: self.board.to_text() }
    }
}
