//! Sieve command line tool.
//!
//! Parses a filter expression, binds it against an optional schema and
//! acceptance rules, and prints the native filter for one backend.
//!
//! ```text
//! sieve --backend postgres -e limit=21 "status = 'active' and age < @limit"
//! ```

mod config;
mod translate;

use clap::Parser;
use tracing::info;

use crate::config::CliConfig;

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sieve={level},sieve_filter={level},sieve_persistence={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(backend = %config.backend, filter = %config.filter, "Starting sieve");

    let output = translate::run(&config)?;
    println!("{}", output);
    Ok(())
}
