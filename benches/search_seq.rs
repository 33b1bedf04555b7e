use std::hint::black_box;
use std::sync::Arc;

use ai_match3::engine::{Board, Refill};
use ai_match3::scoring::ScoringConfig;
use ai_match3::search::{BestMoveSearch, SearchConfig, DEFAULT_DEPTH_FACTOR};
use ai_match3::tiles::TileCatalog;
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};

fn corpus() -> Vec<Board> {
    let catalog = Arc::new(TileCatalog::gemology());
    let actual = ScoringConfig::gemology().actual();
    let mut rng = StdRng::seed_from_u64(1337);
    (0..16)
        .map(|_| {
            let mut b = Board::random(catalog.clone(), &mut rng);
            b.simulate(&actual, Refill::Random, &mut rng);
            b
        })
        .collect()
}

fn bench_cascade(c: &mut Criterion) {
    let catalog = Arc::new(TileCatalog::gemology());
    let actual = ScoringConfig::gemology().actual();
    c.bench_function("cascade/settle_random", |bch| {
        let mut rng = StdRng::seed_from_u64(99);
        bch.iter(|| {
            let mut b = Board::random(catalog.clone(), &mut rng);
            black_box(b.simulate(&actual, Refill::Random, &mut rng))
        })
    });
}

fn bench_search_seq(c: &mut Criterion) {
    let boards = corpus();
    for depth in [1, 2] {
        let cfg = SearchConfig::for_testing().with_depth(depth);
        let mut search = BestMoveSearch::with_config(ScoringConfig::gemology(), cfg);
        c.bench_function(&format!("search_seq/best_move_depth{depth}"), |bch| {
            let mut rng = StdRng::seed_from_u64(7);
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
}

criterion_group!(search_seq, bench_cascade, bench_search_seq);
criterion_main!(search_seq);
