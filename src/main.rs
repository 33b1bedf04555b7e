use std::sync::Arc;

use ai_match3::scoring::ScoringConfig;
use ai_match3::search::{BestMoveParallel, SearchConfig};
use ai_match3::selfplay::{SelfPlay, SelfPlayConfig, Turn};
use ai_match3::tiles::TileCatalog;

fn main() -> anyhow::Result<()> {
    let catalog = Arc::new(TileCatalog::gemology());
    let search = BestMoveParallel::with_config(ScoringConfig::gemology(), SearchConfig::default())?;
    let cfg = SelfPlayConfig { energy: Some(20), ..SelfPlayConfig::default() };
    let mut rng = rand::thread_rng();
    let mut game = SelfPlay::random_start(catalog, search, cfg, &mut rng);
    println!("{}", game.board());
    let summary = game.run(&mut rng, |game, turn| {
        if let Turn::Played { best, steps } = turn {
            println!("{}", best.describe(game.board().catalog()));
            for step in steps {
                println!("{} -> {:.1} points", step.mv.swap, step.actual_points);
            }
            println!("{}", game.board());
        }
    })?;
    println!(
        "Moves made: {}, Points: {:.1}, Average: {:.2}, Stopped: {:?}",
        summary.stats.moves,
        summary.stats.total_points,
        summary.stats.average(),
        summary.reason
    );
    Ok(())
}
