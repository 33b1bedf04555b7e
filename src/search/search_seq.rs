use rand::Rng;
use tracing::debug;

use crate::engine::Board;
use crate::scoring::ScoringConfig;

use super::{prepare_root, select, CancelToken, Evaluator, Move, SearchConfig, SearchError, SearchStats};

/// Single-threaded best-move search.
///
/// `config.workers` is ignored; every candidate is evaluated on the calling
/// thread.
pub struct BestMoveSearch {
    cfg: SearchConfig,
    scoring: ScoringConfig,
    cancel: CancelToken,
    stats: SearchStats,
}

impl BestMoveSearch {
    pub fn new(scoring: ScoringConfig) -> Self { Self::with_config(scoring, SearchConfig::default()) }

    pub fn with_config(scoring: ScoringConfig, cfg: SearchConfig) -> Self {
        Self { cfg, scoring, cancel: CancelToken::new(), stats: SearchStats::default() }
    }

    /// Use `token` to abort searches from another thread.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig { &self.cfg }

    #[inline]
    pub fn scoring(&self) -> &ScoringConfig { &self.scoring }

    /// Best move at the configured depth.
    #[inline]
    pub fn best_move<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Move, SearchError> {
        self.best_move_at(board, self.cfg.depth, rng)
    }

    /// Best move looking `depth` swaps ahead.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ai_match3::engine::Board;
    /// use ai_match3::scoring::ScoringConfig;
    /// use ai_match3::search::{BestMoveSearch, SearchError};
    /// use ai_match3::tiles::TileCatalog;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let board = Board::unknown(Arc::new(TileCatalog::gemology()));
    /// let mut search = BestMoveSearch::new(ScoringConfig::gemology());
    /// let mut rng = StdRng::seed_from_u64(0);
    /// assert_eq!(search.best_move_at(&board, 1, &mut rng), Err(SearchError::NoCandidates));
    /// ```
    pub fn best_move_at<R: Rng + ?Sized>(&mut self, board: &Board, depth: u32, rng: &mut R) -> Result<Move, SearchError> {
        let tasks = prepare_root(board, depth, rng)?;
        let root_candidates = tasks.len();
        let mut evaluator = Evaluator::new(&self.scoring, &self.cfg, &self.cancel);
        let mut moves = Vec::with_capacity(root_candidates);
        for (candidate, seed) in tasks {
            let mv = evaluator.evaluate_root(board, candidate, depth, seed)?;
            debug!(depth, total = mv.total_points(self.cfg.depth_factor), mv = %mv.describe(board.catalog()), "evaluated candidate");
            moves.push(mv);
        }
        self.stats.record(evaluator.nodes, root_candidates);
        select(moves, self.cfg.depth_factor).ok_or(SearchError::NoCandidates)
    }

    /// Statistics collected from the last call to [`Self::best_move`] or
    /// [`Self::best_move_at`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}
