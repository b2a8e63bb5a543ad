//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `gratitude_core` linkage and store bootstrap from environment config.
//! - Print a deterministic health line followed by global quote statistics.

use gratitude_core::{
    core_version, default_log_level, init_stderr_logging, ping, ConnectionManager, DbConfig,
    QuoteRepository, SqliteQuoteRepository,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(err) = init_stderr_logging(default_log_level()) {
        eprintln!("logging disabled: {err}");
    }

    println!("gratitude_core ping={} version={}", ping(), core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = DbConfig::from_env()?;
    let db = ConnectionManager::new(config);
    db.connect()?;

    let stats = SqliteQuoteRepository::new(&db).global_stats()?;
    println!(
        "store={} quotes={} published={} draft={} scheduled={} contributors={} categories={}",
        db.config().database,
        stats.quotes.total,
        stats.quotes.published,
        stats.quotes.draft,
        stats.quotes.scheduled,
        stats.contributors,
        stats.categories_in_use
    );

    db.disconnect()?;
    Ok(())
}
