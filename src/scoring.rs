//! Point values for a single clear pass.
//!
//! The cascade engine tallies how many cells of each tile type one pass marks
//! ([`PassTally`]) and hands the tally to a [`ScoringConfig`]. The config is
//! plain data so game variants differ only in numbers, never in code.

use crate::tiles::{TileCatalog, TileId};

/// Decay used by the probability-points heuristic: `(1 - DECAY^n) * n`.
pub const PROBABILITY_DECAY: f64 = 0.8;

/// Cells cleared by one pass, per tile type (indexed by [`TileId`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassTally {
    counts: Vec<u32>,
}

impl PassTally {
    pub fn new(types: usize) -> Self { Self { counts: vec![0; types] } }

    #[inline]
    pub fn add(&mut self, id: TileId) {
        if let Some(c) = self.counts.get_mut(id.index()) {
            *c += 1;
        }
    }

    pub fn count(&self, id: TileId) -> u32 { self.counts.get(id.index()).copied().unwrap_or(0) }

    pub fn counts(&self) -> &[u32] { &self.counts }

    /// Total cells cleared across all types.
    pub fn total(&self) -> u32 { self.counts.iter().sum() }

    /// Number of distinct types with at least one cleared cell.
    pub fn types_cleared(&self) -> usize { self.counts.iter().filter(|&&c| c > 0).count() }

    pub fn is_empty(&self) -> bool { self.total() == 0 }
}

/// Whether a score is an estimate used to rank moves or the ground truth the
/// game would award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    /// Per-type factors, the count factor and probability points apply.
    #[default]
    Estimate,
    /// Only the base table, the multi-type bonus and the ceiling apply.
    Actual,
}

/// Scoring parameters for one game variant.
///
/// - `three`/`four`/`five_plus`: points when exactly 3, exactly 4 or 5+ cells of
///   one type clear in the same pass.
/// - `factors`: estimate-mode multiplier per tile type, indexed by `TileId`;
///   missing entries count as 1.0.
/// - `count_factor`: estimate-mode points per cleared cell.
/// - `multi_type_bonus`: added once when more than one type clears in a pass.
/// - `probability_points`: estimate-mode bonus `(1 - 0.8^n) * n` for `n` cleared cells.
/// - `point_ceiling`: clamp for the total of a single pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub three: f64,
    pub four: f64,
    pub five_plus: f64,
    pub factors: Vec<f64>,
    pub count_factor: f64,
    pub multi_type_bonus: Option<f64>,
    pub probability_points: bool,
    pub point_ceiling: Option<f64>,
    pub mode: ScoreMode,
}

impl Default for ScoringConfig { fn default() -> Self { Self::gemology() } }

impl ScoringConfig {
    /// Gemology: 10/20/50, +30 for clearing several colors, capped at 60 per pass.
    pub fn gemology() -> Self {
        Self {
            three: 10.0,
            four: 20.0,
            five_plus: 50.0,
            factors: Vec::new(),
            count_factor: 0.0,
            multi_type_bonus: Some(30.0),
            probability_points: true,
            point_ceiling: Some(60.0),
            mode: ScoreMode::Estimate,
        }
    }

    /// Dragon Souls: 10/15/20, no bonus and no ceiling.
    pub fn dragon_souls() -> Self {
        Self {
            three: 10.0,
            four: 15.0,
            five_plus: 20.0,
            factors: Vec::new(),
            count_factor: 0.0,
            multi_type_bonus: None,
            probability_points: true,
            point_ceiling: None,
            mode: ScoreMode::Estimate,
        }
    }

    /// Copy of this config that reports ground-truth points.
    ///
    /// ```
    /// use ai_match3::scoring::{ScoringConfig, ScoreMode};
    /// let actual = ScoringConfig::dragon_souls().actual();
    /// assert_eq!(actual.mode, ScoreMode::Actual);
    /// ```
    pub fn actual(&self) -> Self {
        Self { mode: ScoreMode::Actual, ..self.clone() }
    }

    /// Take per-type factors from the catalog entries.
    pub fn with_catalog_factors(mut self, catalog: &TileCatalog) -> Self {
        self.factors = catalog.iter().map(|t| t.factor()).collect();
        self
    }

    pub fn with_factor(mut self, id: TileId, factor: f64) -> Self {
        if self.factors.len() <= id.index() {
            self.factors.resize(id.index() + 1, 1.0);
        }
        self.factors[id.index()] = factor;
        self
    }

    pub fn with_count_factor(mut self, count_factor: f64) -> Self {
        self.count_factor = count_factor;
        self
    }

    pub fn with_probability_points(mut self, enabled: bool) -> Self {
        self.probability_points = enabled;
        self
    }

    #[inline]
    pub fn factor(&self, idx: usize) -> f64 { self.factors.get(idx).copied().unwrap_or(1.0) }

    /// Base points for `count` cells of one type.
    #[inline]
    pub fn base(&self, count: u32) -> f64 {
        match count {
            3 => self.three,
            4 => self.four,
            c if c >= 5 => self.five_plus,
            _ => 0.0,
        }
    }

    /// Points for one pass.
    ///
    /// ```
    /// use ai_match3::scoring::{PassTally, ScoringConfig};
    /// use ai_match3::tiles::TileCatalog;
    /// let catalog = TileCatalog::gemology();
    /// let red = catalog.by_name("Red").unwrap();
    /// let mut tally = PassTally::new(catalog.len());
    /// for _ in 0..3 { tally.add(red); }
    /// let scoring = ScoringConfig::gemology().with_probability_points(false);
    /// assert_eq!(scoring.score_pass(&tally), 10.0);
    /// ```
    pub fn score_pass(&self, tally: &PassTally) -> f64 {
        let estimate = self.mode == ScoreMode::Estimate;
        let mut points = 0.0;
        for (idx, &count) in tally.counts().iter().enumerate() {
            let base = self.base(count);
            if estimate {
                points += base * self.factor(idx) + f64::from(count) * self.count_factor;
            } else {
                points += base;
            }
        }
        if let Some(bonus) = self.multi_type_bonus {
            if tally.types_cleared() > 1 {
                points += bonus;
            }
        }
        if estimate && self.probability_points {
            points += probability_points(tally.total());
        }
        match self.point_ceiling {
            Some(cap) if points > cap => cap,
            _ => points,
        }
    }
}

/// Expected bonus from refills and uncertain cells after clearing `n` cells.
#[inline]
pub fn probability_points(n: u32) -> f64 {
    let n = f64::from(n);
    (1.0 - PROBABILITY_DECAY.powf(n)) * n
}
