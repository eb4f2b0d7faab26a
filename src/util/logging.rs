//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through `tracing`; results are printed to stdout
//! by the output module, so piping results never mixes in log lines.
//! `RUST_LOG` takes precedence over the level given on the command line.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    Ok(())
}
