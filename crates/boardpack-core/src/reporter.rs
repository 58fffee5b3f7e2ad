//! Reporter trait for dependency injection
//!
//! The executor reports per-entry progress through this trait so the core
//! stays independent of any terminal UI.

use crate::plan::PlanEntry;

/// Progress sink for plan execution; must be callable from download tasks.
pub trait Reporter: Send + Sync {
    /// Reserve one display row per plan entry, in plan order.
    fn prepare_plan(&self, entries: &[PlanEntry]);

    /// Indicates a new phase has started (e.g. "Fetching", "Placing").
    fn section(&self, title: &str);

    /// Updates the progress of an archive download.
    fn downloading(&self, entry: &PlanEntry, current: u64, total: Option<u64>);

    /// The entry's archive is being unpacked.
    fn extracting(&self, entry: &PlanEntry);

    /// Marks an entry as completed, with a short detail ("installed", "present").
    fn done(&self, entry: &PlanEntry, detail: &str);

    /// Marks an entry as failed with a specific reason.
    fn failed(&self, entry: &PlanEntry, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn prepare_plan(&self, entries: &[PlanEntry]) {
        (**self).prepare_plan(entries)
    }
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn downloading(&self, entry: &PlanEntry, current: u64, total: Option<u64>) {
        (**self).downloading(entry, current, total)
    }
    fn extracting(&self, entry: &PlanEntry) {
        (**self).extracting(entry)
    }
    fn done(&self, entry: &PlanEntry, detail: &str) {
        (**self).done(entry, detail)
    }
    fn failed(&self, entry: &PlanEntry, reason: &str) {
        (**self).failed(entry, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs)
    }
}

/// A no-op reporter for silent operations (e.g., `--quiet`, testing).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn prepare_plan(&self, _: &[PlanEntry]) {}
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &PlanEntry, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &PlanEntry) {}
    fn done(&self, _: &PlanEntry, _: &str) {}
    fn failed(&self, _: &PlanEntry, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
