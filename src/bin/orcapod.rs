//! orcapod binary entry point.
//!
//! Loads pod and tool configuration from the working directory (or the
//! `--pods-dir`/`--tools-config` overrides) and dispatches the subcommand.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: warn; `-v` raises it)
//! - `ORCAPOD_PODS_DIR` / `ORCAPOD_TOOLS_CONFIG`: config path defaults,
//!   overridden by the matching flags
//! - `SERPER_API_KEY`: web search backend key, referenced from `tools.yaml`
//! - `OPENAI_API_KEY`: bearer token for non-Ollama models
//! - `ORCAPOD_REQUEST_TIMEOUT_SECS` / `ORCAPOD_CONNECT_TIMEOUT_SECS`:
//!   model client timeout fallbacks, exported during crew assembly
//!
//! # Usage
//!
//! ```bash
//! orcapod list
//! orcapod run content_creation --topic "AI in Healthcare"
//! orcapod interactive
//! ```

use clap::Parser;

use orcapod::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    ctrlc::set_handler(|| {
        println!("\nRun interrupted. Exiting.");
        std::process::exit(0);
    })?;

    cli::execute(cli)
}

/// `RUST_LOG` wins when set; otherwise `-v` picks the default filter.
fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
