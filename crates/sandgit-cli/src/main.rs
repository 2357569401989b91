//! sandgit entry point.
//!
//! ```bash
//! cargo run -p sandgit-cli -- --root ~/notes status README.md
//! ```

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sandgit_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output. Without RUST_LOG,
    // notifications (target sandgit::notify) still show.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sandgit=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    sandgit_cli::run(cli, &mut stdout).await?;
    stdout.flush()?;
    Ok(())
}
