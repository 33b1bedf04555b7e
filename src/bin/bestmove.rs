use std::io::Read;
use std::path::PathBuf;

use ai_match3::config::{self, EngineConfig};
use ai_match3::engine::Board;
use ai_match3::search::BestMoveParallel;
use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Find the best swap sequence for a board given as symbol text: five rows of
/// five symbols, `?` for a tile that is not known.
#[derive(Parser, Debug)]
#[command(name = "bestmove")]
struct Args {
    /// Board file; reads stdin when omitted
    board: Option<PathBuf>,

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

    /// RNG seed for candidate order
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short = 'v', long, action = clap::ArgAction::Count, help = "Increase verbosity level (default WARN, -v = INFO, -vv = DEBUG, -vvv = TRACE)")]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();

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
    let resolved = engine.resolve()?;

    let text = match &args.board {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading board from stdin")?;
            buf
        }
    };
    let board = Board::parse(resolved.catalog.clone(), &text)?;
    if !board.validate() {
        bail!("board is inconsistent: it still contains a match");
    }
    println!("{}", board.describe_large());

    let seed = args.seed.or(resolved.seed).unwrap_or_else(|| rand::thread_rng().gen());
    debug!(seed, "candidate order seed");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut search = BestMoveParallel::with_config(resolved.scoring.clone(), resolved.search.clone())?;
    let best = search.best_move(&board, &mut rng)?;
    let stats = search.last_stats();

    println!("Best move sequence: {}", best.describe(&resolved.catalog));
    println!(
        "Total: {:.2} | candidates: {} | nodes: {}",
        best.total_points(resolved.search.depth_factor),
        stats.root_candidates,
        stats.nodes
    );
    Ok(())
}
