use std::hint::black_box;
use std::sync::Arc;

use ai_match3::engine::{Board, Refill};
use ai_match3::scoring::ScoringConfig;
use ai_match3::search::{BestMoveParallel, SearchConfig, DEFAULT_DEPTH_FACTOR};
use ai_match3::selfplay::{SelfPlay, SelfPlayConfig};
use ai_match3::tiles::TileCatalog;
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};

fn corpus() -> Vec<Board> {
    let catalog = Arc::new(TileCatalog::gemology());
    let actual = ScoringConfig::gemology().actual();
    let mut rng = StdRng::seed_from_u64(7777);
    (0..8)
        .map(|_| {
            let mut b = Board::random(catalog.clone(), &mut rng);
            b.simulate(&actual, Refill::Random, &mut rng);
            b
        })
        .collect()
}

fn bench_par_best_move(c: &mut Criterion) {
    // Pin a small pool for stability
    let boards = corpus();
    let cfg = SearchConfig::default().with_depth(2).with_workers(4);
    let mut search = BestMoveParallel::with_config(ScoringConfig::gemology(), cfg).unwrap();
    c.bench_function("search_par/best_move_depth2", |bch| {
        let mut rng = StdRng::seed_from_u64(21);
        bch.iter(|| {
            let mut acc = 0.0;
            for bd in &boards {
                if let Ok(mv) = search.best_move(bd, &mut rng) {
                    acc += mv.total_points(DEFAULT_DEPTH_FACTOR);
                }
            }
            black_box(acc)
        })
    });
}

fn bench_par_e2e(c: &mut Criterion) {
    let catalog = Arc::new(TileCatalog::gemology());
    c.bench_function("e2e_par/16_moves", |bch| {
        bch.iter(|| {
            let cfg = SearchConfig::default().with_depth(2).with_workers(4);
            let search = BestMoveParallel::with_config(ScoringConfig::gemology(), cfg).unwrap();
            let mut rng = StdRng::seed_from_u64(13);
            let play = SelfPlayConfig { max_moves: Some(16), ..SelfPlayConfig::default() };
            let mut game = SelfPlay::random_start(catalog.clone(), search, play, &mut rng);
            let summary = game.run(&mut rng, |_, _| {}).unwrap();
            black_box(summary.stats.total_points)
        })
    });
}

criterion_group!(search_par, bench_par_best_move, bench_par_e2e);
criterion_main!(search_par);
