//! boardpack CLI

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use boardpack_cli::ops::install;
use boardpack_cli::ui::Output;
use boardpack_cli::{Cli, RunConfig};
use boardpack_core::{NullReporter, Reporter};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never tear the progress table on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::builtin(),
    };

    let ui = (!cli.quiet && std::io::stdout().is_terminal()).then(Output::spawn);
    let reporter: Arc<dyn Reporter> = match &ui {
        Some((output, _)) => Arc::new(output.clone()),
        None => Arc::new(NullReporter),
    };

    let result = install::run(&config, &cli.run_options(), Arc::clone(&reporter)).await;

    if let Some((output, _actor)) = &ui {
        match &result {
            Ok(outcome) => output.summary(outcome.plan.len(), "ready", outcome.elapsed_secs),
            Err(e) => output.error(&format!("{e:#}")),
        }
        output.sync().await;
    }

    let outcome = result?;
    tracing::info!(
        root = %cli.root_directory.display(),
        downloaded = outcome.report.downloaded,
        extracted = outcome.report.extracted,
        skipped = outcome.report.skipped,
        "done"
    );
    if let Some(board) = &outcome.board {
        for (key, value) in board.board_properties.iter() {
            tracing::debug!(board = %board.board, "{key}={value}");
        }
    }
    Ok(())
}
