use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rand::Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::engine::Board;
use crate::scoring::ScoringConfig;

use super::{
    prepare_root, select, CancelToken, Candidate, Evaluator, Move, SearchConfig, SearchError, SearchStats,
};

/// Parallel best-move search on a dedicated rayon pool.
///
/// One task per root candidate; each task runs the full recursive search for
/// its candidate on a private board copy. Results are merged on the calling
/// thread in shuffle order, so the chosen move matches [`super::BestMoveSearch`]
/// for the same seed. With `workers == 1` no pool is built and tasks run
/// inline.
pub struct BestMoveParallel {
    cfg: SearchConfig,
    scoring: ScoringConfig,
    cancel: CancelToken,
    stats: SearchStats,
    pool: Option<ThreadPool>,
}

impl BestMoveParallel {
    /// Pool sized to the CPU count.
    pub fn new(scoring: ScoringConfig) -> Result<Self, SearchError> {
        Self::with_config(scoring, SearchConfig::default())
    }

    pub fn with_config(scoring: ScoringConfig, cfg: SearchConfig) -> Result<Self, SearchError> {
        if cfg.workers == 0 {
            return Err(SearchError::ZeroWorkers);
        }
        let pool = if cfg.workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(cfg.workers)
                .thread_name(|i| format!("match3-worker-{i}"))
                .build()
                .map_err(|e| SearchError::Pool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { cfg, scoring, cancel: CancelToken::new(), stats: SearchStats::default(), pool })
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig { &self.cfg }

    #[inline]
    pub fn scoring(&self) -> &ScoringConfig { &self.scoring }

    #[inline]
    pub fn workers(&self) -> usize { self.pool.as_ref().map_or(1, |p| p.current_num_threads()) }

    #[inline]
    pub fn best_move<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Move, SearchError> {
        self.best_move_at(board, self.cfg.depth, rng)
    }

    /// Evaluate every root candidate on the pool, then pick centrally.
    ///
    /// Any worker panic or a cancellation fails the whole call.
    pub fn best_move_at<R: Rng + ?Sized>(&mut self, board: &Board, depth: u32, rng: &mut R) -> Result<Move, SearchError> {
        let tasks = prepare_root(board, depth, rng)?;
        let root_candidates = tasks.len();
        let scoring = &self.scoring;
        let cfg = &self.cfg;
        let cancel = &self.cancel;
        let results = self.run_tasks(board, tasks, |candidate, seed| {
            let mut evaluator = Evaluator::new(scoring, cfg, cancel);
            let mv = evaluator.evaluate_root(board, candidate, depth, seed)?;
            Ok((mv, evaluator.nodes))
        })?;
        let nodes = results.iter().map(|(_, n)| n).sum();
        for (mv, _) in &results {
            debug!(depth, total = mv.total_points(cfg.depth_factor), mv = %mv.describe(board.catalog()), "evaluated candidate");
        }
        self.stats.record(nodes, root_candidates);
        select(results.into_iter().map(|(mv, _)| mv), self.cfg.depth_factor).ok_or(SearchError::NoCandidates)
    }

    /// Run `eval` once per task, keeping task order in the output. Panics
    /// become [`SearchError::WorkerFailed`]; tasks not yet started when the
    /// token is cancelled return [`SearchError::Cancelled`].
    fn run_tasks<F>(&self, board: &Board, tasks: Vec<(Candidate, u64)>, eval: F) -> Result<Vec<(Move, u64)>, SearchError>
    where
        F: Fn(Candidate, u64) -> Result<(Move, u64), SearchError> + Sync,
    {
        let catalog = board.catalog();
        let cancel = &self.cancel;
        let guarded = |(candidate, seed): (Candidate, u64)| -> Result<(Move, u64), SearchError> {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            panic::catch_unwind(AssertUnwindSafe(|| eval(candidate, seed))).unwrap_or_else(|payload| {
                Err(SearchError::WorkerFailed { candidate: candidate.describe(catalog), reason: panic_reason(payload) })
            })
        };
        match &self.pool {
            Some(pool) => pool.install(|| tasks.into_par_iter().map(guarded).collect()),
            None => tasks.into_iter().map(guarded).collect(),
        }
    }

    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Pos, Refill, Swap};
    use crate::search::BestMoveSearch;
    use crate::tiles::TileCatalog;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    fn settled(seed: u64) -> Board {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut b = Board::random(Arc::new(TileCatalog::gemology()), &mut rng);
        b.simulate(&ScoringConfig::gemology().actual(), Refill::Random, &mut rng);
        b
    }

    #[test]
    fn it_matches_sequential_search() {
        for (seed, refill) in [(1, Refill::Unknown), (2, Refill::Random), (3, Refill::Unknown)] {
            let board = settled(seed);
            let cfg = SearchConfig::for_testing().with_depth(2).with_refill(refill);
            let mut seq = BestMoveSearch::with_config(ScoringConfig::gemology(), cfg.clone());
            let mut par = BestMoveParallel::with_config(ScoringConfig::gemology(), cfg.with_workers(4)).unwrap();
            assert_eq!(par.workers(), 4);
            let a = seq.best_move(&board, &mut StdRng::seed_from_u64(seed + 100)).unwrap();
            let b = par.best_move(&board, &mut StdRng::seed_from_u64(seed + 100)).unwrap();
            assert_eq!(a, b);
            assert_eq!(seq.last_stats(), par.last_stats());
        }
    }

    #[test]
    fn single_worker_runs_inline() {
        let board = Board::parse(Arc::new(TileCatalog::gemology()), "BPGBB PBRGY RRBPY BYPBG GPYGP").unwrap();
        let scoring = ScoringConfig::gemology().with_probability_points(false);
        let mut par = BestMoveParallel::with_config(scoring, SearchConfig::for_testing()).unwrap();
        assert_eq!(par.workers(), 1);
        let mv = par.best_move(&board, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(mv.swap, Swap::new(Pos::new(2, 1), Pos::new(2, 2)));
        assert_eq!(mv.points, 10.0);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let res = BestMoveParallel::with_config(ScoringConfig::gemology(), SearchConfig::for_testing().with_workers(0));
        assert!(matches!(res, Err(SearchError::ZeroWorkers)));
    }

    #[test]
    fn worker_panic_fails_the_search() {
        let board = settled(5);
        let par =
            BestMoveParallel::with_config(ScoringConfig::gemology(), SearchConfig::for_testing().with_workers(2)).unwrap();
        let tasks = prepare_root(&board, 1, &mut StdRng::seed_from_u64(5)).unwrap();
        let doomed = tasks[tasks.len() / 2].0;
        let res = par.run_tasks(&board, tasks, |candidate, _| {
            if candidate == doomed {
                panic!("boom");
            }
            Ok((candidate.into_move(0.0, None), 1))
        });
        match res {
            Err(SearchError::WorkerFailed { candidate, reason }) => {
                assert_eq!(candidate, doomed.describe(board.catalog()));
                assert_eq!(reason, "boom");
            }
            other => panic!("expected worker failure, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_parallel_search_fails() {
        let token = CancelToken::new();
        let mut par =
            BestMoveParallel::with_config(ScoringConfig::gemology(), SearchConfig::for_testing().with_workers(2))
                .unwrap()
                .with_cancel(token.clone());
        token.cancel();
        let res = par.best_move(&settled(8), &mut StdRng::seed_from_u64(0));
        assert_eq!(res, Err(SearchError::Cancelled));
    }
}
