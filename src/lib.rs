//! ai-match3: a 5x5 match-3 cascade engine + look-ahead move search
//!
//! This crate provides:
//! - A `Board` type with the cascade primitives (`clear`, `drop`, `fill`, `simulate`, `validate`)
//! - Configurable scoring for the Gemology and Dragon Souls rule sets (`scoring` module)
//! - A best-move search (`search` module) with single-threaded and parallel variants
//! - A self-play harness and a postcard record format for its runs
//!
//! Quick start:
//! ```
//! use std::sync::Arc;
//! use ai_match3::engine::{Board, Refill};
//! use ai_match3::scoring::ScoringConfig;
//! use ai_match3::search::{BestMoveSearch, SearchConfig};
//! use ai_match3::tiles::TileCatalog;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let catalog = Arc::new(TileCatalog::gemology());
//! let scoring = ScoringConfig::gemology();
//!
//! // Deterministic board with a seeded RNG, settled before searching
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut board = Board::random(catalog, &mut rng);
//! board.simulate(&scoring.actual(), Refill::Random, &mut rng);
//! assert!(board.validate());
//!
//! let mut search = BestMoveSearch::with_config(scoring, SearchConfig::for_testing());
//! let best = search.best_move(&board, &mut rng).unwrap();
//! assert!(best.points >= 0.0);
//! ```
//!
//! Boards can also be read from symbol text, one row per line, `?` for an
//! unknown tile. See [`engine::Board::parse`].
//!
pub mod config;
pub mod engine;
pub mod scoring;
pub mod search;
pub mod selfplay;
pub mod serialization;
pub mod tiles;
