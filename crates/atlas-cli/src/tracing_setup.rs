//! Structured logging for the CLI
//!
//! Logs go to stderr so that stdout carries only JSON output.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "atlas=info,atlas_core=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default directives.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);

    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| anyhow::anyhow!("Failed to install tracing subscriber: {err}"))
}
