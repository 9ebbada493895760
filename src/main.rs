use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use estuary::app::AppContext;
use estuary::cli::{commands, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // -v raises the default filter; RUST_LOG still takes precedence.
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let ctx = AppContext::init(cli.config).await?;
    let summary = commands::run(&ctx, cli.dry_run).await?;

    if summary.failed > 0 {
        tracing::warn!(
            "{} of {} new entries failed to post; they may be retried next run",
            summary.failed,
            summary.entries
        );
    }

    Ok(())
}
