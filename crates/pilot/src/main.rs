//! Linebot Pilot - Main Entry Point

use anyhow::Context;
use pilot::{init_logging, run};
use std::path::PathBuf;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Linebot Pilot v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = parse_config_path();
    run(config_path).context("pilot failed")?;

    Ok(())
}

/// Parse the config path from the command line.
///
/// Supports:
/// - `linebot-pilot <path>` (positional)
/// - `linebot-pilot --config <path>` (flag-based)
/// - `linebot-pilot -c <path>` (short flag)
///
/// Defaults apply when no file is given.
fn parse_config_path() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(PathBuf::from(&args[1]));
    }

    None
}
