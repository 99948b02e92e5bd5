use std::env;

use lith::error::AppResult;
use lith::replay::{self, parse_args};
use tracing_subscriber::EnvFilter;

/// Replays a recorded relay event log and prints the resulting buffers.
///
/// Usage: `lith <events.jsonl> [--config <path>] [--fetch-more <buffer>]... [--write-config]`
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run() {
        eprintln!("lith: {error}");
        std::process::exit(1);
    }
}

fn run() -> AppResult<()> {
    let args = parse_args(env::args().skip(1))?;
    let report = replay::run(args)?;
    print!("{report}");
    Ok(())
}
