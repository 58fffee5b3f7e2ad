//! Installation plan executor.
//!
//! Two phases with a barrier between them:
//!
//! 1. **Fetch**: every archive missing from the cache is downloaded by its own
//!    task in a [`JoinSet`], optionally capped by a semaphore.
//! 2. **Place**: archives are unpacked one at a time into a scratch directory
//!    under the root and their single top-level directory is renamed onto the
//!    destination.
//!
//! Entries whose destination already exists are skipped entirely, so running
//! the same plan twice does no network or extraction work the second time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::Error;
use crate::io::download::{DownloadError, DownloadRequest};
use crate::io::extract::{self, ExtractError};
use crate::paths;
use crate::plan::{InstallationPlan, PlanEntry};
use crate::reporter::Reporter;

/// Tuning knobs for [`PlanExecutor`].
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Archive cache; `<root>/.archives` when unset.
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on simultaneous downloads; unlimited when unset.
    pub max_concurrent_downloads: Option<usize>,
}

/// What a run actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Archives fetched over the network.
    pub downloaded: usize,
    /// Entries unpacked and placed.
    pub extracted: usize,
    /// Entries whose destination was already present.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Destination missing, archive missing.
    Pending,
    /// Destination missing, archive in the cache.
    Downloaded,
    /// Destination present.
    Placed,
}

/// Runs an [`InstallationPlan`] against the filesystem and network.
pub struct PlanExecutor {
    client: Client,
    reporter: Arc<dyn Reporter>,
    options: ExecutorOptions,
}

impl std::fmt::Debug for PlanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PlanExecutor {
    /// Executor with default options and a fresh HTTP client.
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client: Client::new(),
            reporter,
            options: ExecutorOptions::default(),
        }
    }

    /// Replace the cache location and concurrency cap.
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    fn cache_dir(&self, plan: &InstallationPlan) -> PathBuf {
        self.options
            .cache_dir
            .clone()
            .unwrap_or_else(|| paths::default_cache_dir(plan.root()))
    }

    /// Download, unpack and place every entry of `plan` not already present.
    ///
    /// # Errors
    ///
    /// The first download, extraction or placement failure ends the run.
    /// Outstanding downloads are cancelled and no destination is left
    /// half-written; destinations placed before the failure stay in place.
    pub async fn execute(&self, plan: &InstallationPlan) -> Result<ExecutionReport, Error> {
        let start = Instant::now();
        let cache = self.cache_dir(plan);
        let mut report = ExecutionReport::default();

        self.reporter.prepare_plan(plan.entries());

        let states: Vec<EntryState> = plan
            .entries()
            .iter()
            .map(|entry| {
                if entry.path.exists() {
                    EntryState::Placed
                } else if cache.join(&entry.file_name).is_file() {
                    EntryState::Downloaded
                } else {
                    EntryState::Pending
                }
            })
            .collect();

        for (entry, state) in plan.entries().iter().zip(&states) {
            if *state == EntryState::Placed {
                tracing::debug!(entry = %entry.label(), path = %entry.path.display(), "already present");
                self.reporter.done(entry, "present");
                report.skipped += 1;
            }
        }

        if states.iter().all(|s| *s == EntryState::Placed) {
            return Ok(report);
        }

        tokio::fs::create_dir_all(&cache)
            .await
            .map_err(Error::filesystem("failed to create cache directory", &cache))?;

        // At most one download per archive file name, and only for archives
        // some missing destination still needs.
        let to_fetch: Vec<&PlanEntry> = plan
            .archives()
            .into_iter()
            .filter(|archive| {
                plan.entries()
                    .iter()
                    .zip(&states)
                    .any(|(e, s)| *s == EntryState::Pending && e.file_name == archive.file_name)
            })
            .collect();

        if !to_fetch.is_empty() {
            self.reporter.section("Fetching");
            report.downloaded = self.fetch_all(&to_fetch, &cache).await?;
        }

        self.reporter.section("Placing");
        report.extracted = self.place_all(plan, &states, &cache).await?;

        tracing::info!(
            downloaded = report.downloaded,
            extracted = report.extracted,
            skipped = report.skipped,
            elapsed = ?start.elapsed(),
            "plan executed"
        );
        Ok(report)
    }

    async fn fetch_all(&self, entries: &[&PlanEntry], cache: &Path) -> Result<usize, Error> {
        let semaphore = self
            .options
            .max_concurrent_downloads
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let completed = Arc::new(AtomicUsize::new(0));
        let total = entries.len();

        let mut set: JoinSet<Result<(), (PlanEntry, DownloadError)>> = JoinSet::new();

        for entry in entries {
            let entry = (*entry).clone();
            let dest = cache.join(&entry.file_name);
            let client = self.client.clone();
            let reporter = Arc::clone(&self.reporter);
            let semaphore = semaphore.clone();
            let completed = Arc::clone(&completed);

            set.spawn(async move {
                let _permit = match semaphore {
                    Some(s) => Some(s.acquire_owned().await.map_err(|e| {
                        (entry.clone(), DownloadError::Task(e.to_string()))
                    })?),
                    None => None,
                };

                DownloadRequest::new(&client, &entry, &dest, &*reporter)
                    .execute()
                    .await
                    .map_err(|e| (entry.clone(), e))?;

                let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(archive = %entry.file_name, "{n}/{total} downloads complete");
                Ok(())
            });
        }

        // The join loop is the barrier; returning early drops the set, which
        // aborts every download still in flight.
        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err((entry, e))) => {
                    self.reporter.failed(&entry, &e.to_string());
                    return Err(e.into());
                }
                Err(e) => return Err(DownloadError::Task(e.to_string()).into()),
            }
        }

        Ok(completed.load(Ordering::Relaxed))
    }

    async fn place_all(
        &self,
        plan: &InstallationPlan,
        states: &[EntryState],
        cache: &Path,
    ) -> Result<usize, Error> {
        let root = plan.root();
        std::fs::create_dir_all(root)
            .map_err(Error::filesystem("failed to create root directory", root))?;

        let staging = tempfile::Builder::new()
            .prefix(".boardpack-staging-")
            .tempdir_in(root)
            .map_err(Error::filesystem("failed to create staging directory", root))?;

        let mut extracted = 0;
        for (index, (entry, state)) in plan.entries().iter().zip(states).enumerate() {
            if *state == EntryState::Placed {
                continue;
            }

            self.reporter.extracting(entry);
            let archive = cache.join(&entry.file_name);
            let scratch = staging.path().join(index.to_string());
            let dest = entry.path.clone();
            let file_name = entry.file_name.clone();

            let result = tokio::task::spawn_blocking(move || {
                extract::extract_auto(&archive, &scratch)?;
                let top = extract::single_top_level(&scratch, &file_name)?;
                extract::place(&top, &dest)
            })
            .await
            .unwrap_or_else(|e| Err(ExtractError::Io(std::io::Error::other(e))));

            if let Err(e) = result {
                self.reporter.failed(entry, &e.to_string());
                return Err(e.into());
            }

            tracing::info!(entry = %entry.label(), path = %entry.path.display(), "placed");
            self.reporter.done(entry, "installed");
            extracted += 1;
        }

        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::NullReporter;
    use crate::plan::Role;

    fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn entry(root: &Path, name: &str, url: String) -> PlanEntry {
        PlanEntry::new(
            Role::Tools,
            "arduino".into(),
            name,
            "1.0.0".into(),
            paths::tool_path(root, "arduino", name, "1.0.0"),
            &url,
            "",
        )
        .unwrap()
    }

    fn executor() -> PlanExecutor {
        PlanExecutor::new(Arc::new(NullReporter))
    }

    fn staging_dirs(root: &Path) -> usize {
        std::fs::read_dir(root)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".boardpack-staging-"))
            .count()
    }

    #[tokio::test]
    async fn test_second_run_does_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bossac-1.0.0.tar.gz")
            .with_status(200)
            .with_body(tar_gz(&[("bossac-1.0.0/bossac", "bin")]))
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("working");
        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "bossac", format!("{}/bossac-1.0.0.tar.gz", server.url())))
            .unwrap();

        let first = executor().execute(&plan).await.unwrap();
        assert_eq!(
            first,
            ExecutionReport {
                downloaded: 1,
                extracted: 1,
                skipped: 0
            }
        );
        let dest = root.join("arduino/tools/bossac/1.0.0");
        assert_eq!(std::fs::read_to_string(dest.join("bossac")).unwrap(), "bin");
        assert!(root.join(".archives/bossac-1.0.0.tar.gz").is_file());
        assert_eq!(staging_dirs(&root), 0);

        let second = executor().execute(&plan).await.unwrap();
        assert_eq!(
            second,
            ExecutionReport {
                downloaded: 0,
                extracted: 0,
                skipped: 1
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cached_archive_is_not_downloaded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/openocd-1.0.0.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let cache = dir.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(
            cache.join("openocd-1.0.0.tar.gz"),
            tar_gz(&[("openocd/bin/openocd", "elf")]),
        )
        .unwrap();

        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "openocd", format!("{}/openocd-1.0.0.tar.gz", server.url())))
            .unwrap();

        let report = executor()
            .with_options(ExecutorOptions {
                cache_dir: Some(cache),
                max_concurrent_downloads: None,
            })
            .execute(&plan)
            .await
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.extracted, 1);
        assert!(root.join("arduino/tools/openocd/1.0.0/bin/openocd").is_file());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_multiple_top_level_entries_fail() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/messy.tar.gz")
            .with_status(200)
            .with_body(tar_gz(&[("a/x", "1"), ("b/y", "2")]))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "messy", format!("{}/messy.tar.gz", server.url())))
            .unwrap();

        let err = executor().execute(&plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(!root.join("arduino/tools/messy/1.0.0").exists());
        assert_eq!(staging_dirs(&root), 0);
    }

    #[tokio::test]
    async fn test_empty_archive_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/empty.tar.gz")
            .with_status(200)
            .with_body(tar_gz(&[]))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "empty", format!("{}/empty.tar.gz", server.url())))
            .unwrap();

        let err = executor().execute(&plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(matches!(
            err,
            Error::Extract(ExtractError::Layout { ref found, .. }) if found == "nothing"
        ));
        assert!(!root.join("arduino/tools/empty/1.0.0").exists());
        assert_eq!(staging_dirs(&root), 0);
    }

    #[tokio::test]
    async fn test_http_error_fails_without_archive() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "gone", format!("{}/gone.tar.gz", server.url())))
            .unwrap();

        let err = executor().execute(&plan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert!(!root.join(".archives/gone.tar.gz").exists());
        assert!(!root.join(".archives/gone.tar.gz.part").exists());
        assert!(!root.join("arduino/tools/gone/1.0.0").exists());
    }

    #[tokio::test]
    async fn test_shared_archive_fetched_once_with_cap() {
        let mut server = mockito::Server::new_async().await;
        let shared = server
            .mock("GET", "/gcc.tar.gz")
            .with_status(200)
            .with_body(tar_gz(&[("gcc/bin/gcc", "cc")]))
            .expect(1)
            .create_async()
            .await;
        let other = server
            .mock("GET", "/bossac.tar.gz")
            .with_status(200)
            .with_body(tar_gz(&[("bossac/bossac", "b")]))
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let url = format!("{}/gcc.tar.gz", server.url());
        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "gcc", url.clone())).unwrap();
        let mut second = entry(&root, "gcc", url);
        second.package = "adafruit".into();
        second.path = paths::tool_path(&root, "adafruit", "gcc", "1.0.0");
        plan.add(second).unwrap();
        plan.add(entry(&root, "bossac", format!("{}/bossac.tar.gz", server.url())))
            .unwrap();

        let report = executor()
            .with_options(ExecutorOptions {
                cache_dir: None,
                max_concurrent_downloads: Some(1),
            })
            .execute(&plan)
            .await
            .unwrap();

        assert_eq!(report.downloaded, 2);
        assert_eq!(report.extracted, 3);
        assert!(root.join("arduino/tools/gcc/1.0.0/bin/gcc").is_file());
        assert!(root.join("adafruit/tools/gcc/1.0.0/bin/gcc").is_file());
        assert!(root.join("arduino/tools/bossac/1.0.0/bossac").is_file());
        shared.assert_async().await;
        other.assert_async().await;
    }

    #[tokio::test]
    async fn test_shared_archive_fetched_when_first_destination_present() {
        let mut server = mockito::Server::new_async().await;
        let shared = server
            .mock("GET", "/gcc.tar.gz")
            .with_status(200)
            .with_body(tar_gz(&[("gcc/bin/gcc", "cc")]))
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let url = format!("{}/gcc.tar.gz", server.url());
        let mut plan = InstallationPlan::new(&root);
        plan.add(entry(&root, "gcc", url.clone())).unwrap();
        let mut second = entry(&root, "gcc", url);
        second.package = "adafruit".into();
        second.path = paths::tool_path(&root, "adafruit", "gcc", "1.0.0");
        plan.add(second).unwrap();
        std::fs::create_dir_all(root.join("arduino/tools/gcc/1.0.0")).unwrap();

        let report = executor().execute(&plan).await.unwrap();

        assert_eq!(
            report,
            ExecutionReport {
                downloaded: 1,
                extracted: 1,
                skipped: 1
            }
        );
        assert!(root.join("adafruit/tools/gcc/1.0.0/bin/gcc").is_file());
        shared.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let dir = tempfile::tempdir().unwrap();
        let plan = InstallationPlan::new(dir.path());
        let report = executor().execute(&plan).await.unwrap();
        assert_eq!(report, ExecutionReport::default());
        assert!(!dir.path().join(".archives").exists());
    }
}
