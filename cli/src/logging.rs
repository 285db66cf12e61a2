//! Log output for the CLI.
//!
//! `CSRSHARD_LOG` takes an `EnvFilter` directive, e.g. `CSRSHARD_LOG=debug` or
//! `CSRSHARD_LOG=warn,csrshard=debug`. Without it the level follows `-v`.

use tracing_subscriber::{EnvFilter, fmt};

const ENV_VAR: &str = "CSRSHARD_LOG";

fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Logs go to stderr.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env(ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level(verbose)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
