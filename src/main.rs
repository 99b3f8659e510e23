//! termarcade: 2048 and Tetris in the terminal.

mod app;
mod input;
mod tetris;
mod theme;
mod twenty48;
mod ui;

use anyhow::{Context, Result};
use app::{Ending, TetrisOutcome, TilesOutcome};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::style::Stylize;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timing options for the Tetris loop.
#[derive(Debug, Clone)]
pub struct TetrisConfig {
    /// Auto-fall interval at level 1; divided by the level.
    pub drop_interval: Duration,
    pub poll_interval: Duration,
    pub game_over_pause: Duration,
}

impl From<&TetrisArgs> for TetrisConfig {
    fn from(args: &TetrisArgs) -> Self {
        Self {
            drop_interval: Duration::from_millis(args.drop_interval_ms),
            poll_interval: Duration::from_millis(args.poll_ms),
            game_over_pause: Duration::from_millis(args.game_over_pause_ms),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme not loaded ({e}), using defaults");
        theme::Theme::default()
    });
    let rng = match args.seed {
        Some(seed) => {
            info!("seeded rng: {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    match args.game {
        GameCommand::Twenty48 => report_tiles(&app::play_tiles(rng, &theme)?),
        GameCommand::Tetris(ref opts) => {
            let config = TetrisConfig::from(opts);
            report_tetris(&app::play_tetris(rng, &theme, &config)?);
        }
    }
    Ok(())
}

/// Logs go to a file only; stderr would tear the full-screen UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn report_tiles(outcome: &TilesOutcome) {
    info!(
        "2048 finished: {:?}, score {}, best tile {}",
        outcome.ending, outcome.session.score, outcome.best_tile
    );
    match outcome.ending {
        Ending::Won => println!("{}", "Winner winner chicken dinner!".green().bold()),
        Ending::Lost | Ending::GameOver => println!("{}", "GAME OVER".red().bold()),
        Ending::Quit => println!("{}", "You left the game.".yellow()),
    }
    println!("Score: {}  Best tile: {}", outcome.session.score, outcome.best_tile);
}

fn report_tetris(outcome: &TetrisOutcome) {
    let s = outcome.session;
    info!(
        "tetris finished: {:?}, score {}, level {}, lines {}",
        outcome.ending, s.score, s.level, s.lines_cleared
    );
    if outcome.ending != Ending::Quit {
        println!("{}", "GAME OVER!".red().bold());
    }
    println!("Final Score: {}  Level: {}  Lines: {}", s.score, s.level, s.lines_cleared);
}

/// 2048 and Tetris in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "termarcade",
    version,
    about = "2048 and Tetris in the terminal.",
    long_about = "termarcade bundles two classic puzzles.\n\n\
        2048: slide tiles with the arrow keys (or h/j/k/l); equal tiles merge. Reach 2048 to win.\n\n\
        TETRIS: a/d or Left/Right move, w or Up rotates, s or Down soft drops, Space or Enter \
        hard drops. Clear full rows to score; every 10 lines raises the level and the speed.\n\n\
        q or Esc quits either game. Use --theme to load a btop-style theme file."
)]
pub struct Args {
    #[command(subcommand)]
    pub game: GameCommand,

    /// Path to theme file (btop-style theme[key]=\"value\"). Built-in colours if not set.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub theme: Option<PathBuf>,

    /// Colour palette for pieces: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal", global = true)]
    pub palette: Palette,

    /// Seed for tile spawns and piece choice; random if not set.
    #[arg(long, value_name = "N", global = true)]
    pub seed: Option<u64>,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum GameCommand {
    /// Slide and merge tiles until one reaches 2048.
    #[command(name = "2048", alias = "twenty48")]
    Twenty48,
    /// Falling tetrominoes; clear rows to score.
    Tetris(TetrisArgs),
}

#[derive(Debug, clap::Args)]
pub struct TetrisArgs {
    /// Auto-fall interval at level 1 in ms; level N falls N times faster.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub drop_interval_ms: u64,

    /// Input poll interval in ms.
    #[arg(long, default_value = "10", value_name = "MS")]
    pub poll_ms: u64,

    /// How long the final board stays up after game over, in ms.
    #[arg(long, default_value = "3000", value_name = "MS")]
    pub game_over_pause_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
