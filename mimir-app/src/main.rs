mod cli;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::commands::run_cli;
use cli::opts::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // stdout belongs to the study loop; logs go to stderr
    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    run_cli(args).await
}
