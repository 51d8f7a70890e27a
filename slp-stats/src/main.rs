//! Prints what a replay contains as JSON.
//!
//! ```bash
//! slp-stats Game_20230101T120000.slp
//! slp-stats Game_20230101T120000.slp --settings-only --pretty
//! slp-stats Game_20230101T120000.slp --config stats.json --metadata
//! ```
//!
//! Logging is controlled through `RUST_LOG`, e.g. `RUST_LOG=SLP_STATS=debug`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};

use slp_parser::SlippiGame;
use slp_parser::config::StatsConfig;
use slp_parser::reader::SlpSource;

#[derive(Parser)]
#[command(name = "slp-stats")]
#[command(author, version, about = "Slippi replay settings and stats as JSON")]
struct Args {
    /// Replay file (.slp)
    replay: PathBuf,

    /// Only print the game settings
    #[arg(long)]
    settings_only: bool,

    /// Also print the metadata block
    #[arg(long)]
    metadata: bool,

    /// JSON file with stat tunables (comboResetFrames, punishResetFrames)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long, short = 'p')]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    if !args.replay.exists() {
        anyhow::bail!("Replay file not found: {}", args.replay.display());
    }

    let stats_config = match &args.config {
        Some(path) => StatsConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => StatsConfig::default(),
    };

    let mut game = SlippiGame::builder(SlpSource::File(args.replay.clone()))
        .with_stats_config(stats_config)
        .build();

    let settings = game.get_settings().context("reading game settings")?.cloned();
    let mut output = json!({ "settings": settings });

    if !args.settings_only {
        let stats = game.get_stats().context("computing stats")?;
        let game_end = game.get_game_end().context("reading game end")?.cloned();

        tracing::info!(
            complete = stats.game_complete,
            last_frame = ?stats.last_frame,
            "Processed {}",
            args.replay.display()
        );

        output["gameEnd"] = serde_json::to_value(game_end)?;
        output["stats"] = serde_json::to_value(stats)?;
    }

    if args.metadata {
        let metadata = game.get_metadata().context("reading metadata")?;
        output["metadata"] = metadata.map_or(Value::Null, |metadata| metadata.value().clone());
    }

    let rendered = match args.pretty {
        true => serde_json::to_string_pretty(&output)?,
        false => serde_json::to_string(&output)?,
    };

    println!("{rendered}");
    Ok(())
}
