//! The install flow: manifests → selections → plan → executed tree.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use boardpack_core::{
    ExecutionReport, ExecutorOptions, InstallationPlan, ManifestStore, PlanExecutor, Reporter,
    ResolvedPackage, build_plan,
};

use crate::config::RunConfig;
use crate::ops::boards::{self, BoardProperties};

/// Flags that override the run configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub root: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub strict_pins: bool,
    pub jobs: Option<usize>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub plan: InstallationPlan,
    pub report: ExecutionReport,
    pub board: Option<BoardProperties>,
    pub elapsed_secs: f64,
}

/// Resolve every selection, build one plan for all of them, execute it and
/// read the installed board definitions.
pub async fn run(
    config: &RunConfig,
    options: &RunOptions,
    reporter: Arc<dyn Reporter>,
) -> Result<RunOutcome> {
    let start = Instant::now();

    let mut store = ManifestStore::new();
    store
        .load_all(&config.manifests)
        .context("failed to load manifests")?;

    let mut policy = config.pin_policy();
    if options.strict_pins {
        policy = boardpack_core::PinPolicy::Strict;
    }

    let mut resolved: Vec<ResolvedPackage<'_>> = Vec::new();
    for selection in &config.selections {
        let selected = selection.resolve(&store, policy).with_context(|| {
            format!(
                "failed to resolve {} for {}",
                selection.architecture,
                selection
                    .packages
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        for (platform, rp) in selected {
            tracing::info!(
                package = %rp.package.name,
                platform = %platform,
                version = %rp.platform.version,
                "selected"
            );
            resolved.push(rp);
        }
    }

    let hosts = config.hosts();
    tracing::debug!(hosts = ?hosts, "host allow-list");
    let plan = build_plan(&store, &resolved, &options.root, &hosts)
        .context("failed to build installation plan")?;
    reporter.info(&format!(
        "{} archives planned under {}",
        plan.len(),
        options.root.display()
    ));

    let executor = PlanExecutor::new(Arc::clone(&reporter)).with_options(ExecutorOptions {
        cache_dir: options.cache_dir.clone(),
        max_concurrent_downloads: options.jobs.or(config.max_concurrent_downloads),
    });
    let report = executor
        .execute(&plan)
        .await
        .map_err(|e| {
            let kind = e.kind();
            anyhow::Error::new(e).context(format!("{kind} error while installing"))
        })?;

    let board = match &config.board {
        Some(board) => Some(boards::load(plan.hardware_paths(), board, &*reporter)?),
        None => None,
    };

    Ok(RunOutcome {
        plan,
        report,
        board,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}
