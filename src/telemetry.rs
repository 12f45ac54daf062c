//! Tracing subscriber setup, called once by the binary

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber with the given filter directive.
///
/// Library code only emits events; nothing here runs unless a binary asks.
pub fn init_tracing(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
