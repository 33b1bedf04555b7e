use std::path::PathBuf;
use std::time::{Duration, Instant};

use ai_match3::config::{self, EngineConfig};
use ai_match3::search::BestMoveParallel;
use ai_match3::selfplay::{SelfPlay, Turn};
use ai_match3::serialization::{self, RunMeta};
use anyhow::bail;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "selfplay", about = "Play a match-3 board against random refills")]
struct Args {
    /// TOML config file (default: $MATCH3_CONFIG, then ./match3.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in rule set instead of a config file: gemology or dragonsouls
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,

    /// Look-ahead depth
    #[arg(long)]
    depth: Option<u32>,

    /// Worker threads for the root search
    #[arg(long)]
    workers: Option<usize>,

    /// RNG seed for the starting board and refills
    #[arg(long)]
    seed: Option<u64>,

    /// Moves available before stopping
    #[arg(long)]
    energy: Option<u32>,

    /// After a zero-point move, follow the searched chain without searching again
    #[arg(long)]
    fast0: bool,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Suppress status line and board output
    #[arg(long)]
    quiet: bool,

    /// Write a postcard record of the run to this path
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(short = 'v', long, action = clap::ArgAction::Count, help = "Increase verbosity level (default WARN, -v = INFO, -vv = DEBUG, -vvv = TRACE)")]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_logging(verbose: u8) {
    let level = log_level(verbose);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut engine = match &args.preset {
        Some(name) => match EngineConfig::preset(name) {
            Some(cfg) => config::apply_env_overrides(cfg),
            None => bail!("unknown preset {name:?} (expected gemology or dragonsouls)"),
        },
        None => config::load_config(args.config.as_deref())?,
    };
    if let Some(depth) = args.depth {
        engine.search.depth = depth;
    }
    if args.workers.is_some() {
        engine.search.workers = args.workers;
    }
    if args.energy.is_some() {
        engine.selfplay.energy = args.energy;
    }
    if args.steps.is_some() {
        engine.selfplay.max_moves = args.steps;
    }
    if args.seed.is_some() {
        engine.selfplay.seed = args.seed;
    }
    engine.selfplay.fast0 |= args.fast0;
    engine.selfplay.record |= args.out.is_some();
    let resolved = engine.resolve()?;

    let seed = resolved.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(seed, depth = resolved.search.depth, workers = resolved.search.workers, "starting self-play");
    let mut rng = StdRng::seed_from_u64(seed);
    let search = BestMoveParallel::with_config(resolved.scoring.clone(), resolved.search.clone())?;
    let mut game = SelfPlay::random_start(resolved.catalog.clone(), search, resolved.selfplay.clone(), &mut rng);

    let start = Instant::now();
    let start_wall = serialization::now_unix_seconds();

    let pb = if args.quiet {
        None
    } else {
        println!("{}", game.board());
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | Moves: {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let summary = game.run(&mut rng, |game, turn| {
        let Some(pb) = &pb else { return };
        if let Turn::Played { best, steps } = turn {
            let catalog = game.board().catalog();
            pb.suspend(|| {
                println!("{}", best.describe(catalog));
                for step in steps {
                    println!("{} -> {:.1} points", step.mv.swap, step.actual_points);
                }
                println!("{}", game.board());
            });
            let stats = game.stats();
            pb.set_message(format!(
                "{} | points: {:.1} | avg: {:.2} | searches: {}",
                stats.moves,
                stats.total_points,
                stats.average(),
                stats.searches
            ));
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    if !args.quiet {
        println!(
            "Moves: {} | points: {:.1} | avg: {:.2} | chain follows: {} | stopped: {:?} | {:.1}s",
            summary.stats.moves,
            summary.stats.total_points,
            summary.stats.average(),
            summary.stats.chain_follows,
            summary.reason,
            elapsed
        );
    }

    if let Some(out_path) = args.out {
        let meta = RunMeta {
            tiles: Vec::new(),
            depth: resolved.search.depth,
            seed: Some(seed),
            start_unix_s: start_wall,
            elapsed_s: elapsed as f32,
            moves: 0,
            total_points: 0.0,
            engine_str: Some(format!("ai-match3 {}", env!("CARGO_PKG_VERSION"))),
        };
        serialization::write_record_to_path(&out_path, &game.record(meta))?;
        info!(path = %out_path.display(), "wrote run record");
    }
    Ok(())
}
