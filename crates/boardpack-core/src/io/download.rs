//! Streaming archive download into the cache.
//!
//! Bytes are written to `<archive>.part` and renamed into place only once the
//! body has been fully received, so an archive present in the cache is
//! always complete.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use crate::paths;
use crate::plan::PlanEntry;

/// Failures while fetching an archive.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Connection failure or non-success status.
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The archive could not be written to the cache.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The download task panicked, was cancelled, or lost its permit.
    #[error("download task failed: {0}")]
    Task(String),
}

/// Request for a single archive download
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    /// Shared HTTP client
    pub client: &'a Client,
    /// Entry whose URL is fetched; progress is reported against it
    pub entry: &'a PlanEntry,
    /// Final archive path in the cache
    pub dest: &'a Path,
    /// Progress sink
    pub reporter: &'a R,
}

impl<R: Reporter + ?Sized> std::fmt::Debug for DownloadRequest<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.entry.url)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Reporter + ?Sized> DownloadRequest<'a, R> {
    /// Create a request; nothing is sent until [`execute`](Self::execute).
    pub fn new(client: &'a Client, entry: &'a PlanEntry, dest: &'a Path, reporter: &'a R) -> Self {
        Self {
            client,
            entry,
            dest,
            reporter,
        }
    }

    /// Fetch the entry's URL into `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Any HTTP or filesystem failure. The partial file is removed and
    /// `dest` is left untouched.
    pub async fn execute(self) -> Result<u64, DownloadError> {
        let partial = paths::partial_path(self.dest);
        match self.fetch(&partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, self.dest)
                    .await
                    .map_err(|source| DownloadError::Write {
                        path: self.dest.to_path_buf(),
                        source,
                    })?;
                Ok(bytes)
            }
            Err(e) => {
                tokio::fs::remove_file(&partial).await.ok();
                Err(e)
            }
        }
    }

    async fn fetch(&self, partial: &Path) -> Result<u64, DownloadError> {
        let url = &self.entry.url;
        let http = |source| DownloadError::Http {
            url: url.clone(),
            source,
        };
        let write = |source| DownloadError::Write {
            path: partial.to_path_buf(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .map_err(http)?
            .error_for_status()
            .map_err(http)?;

        let total = response
            .content_length()
            .or((self.entry.size > 0).then_some(self.entry.size));
        self.reporter.downloading(self.entry, 0, total);

        let mut file = File::create(partial).await.map_err(write)?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(http)?;
            file.write_all(&chunk).await.map_err(write)?;
            downloaded += chunk.len() as u64;
            self.reporter.downloading(self.entry, downloaded, total);
        }

        file.flush().await.map_err(write)?;
        file.sync_all().await.map_err(write)?;

        tracing::debug!(url = %url, bytes = downloaded, "downloaded");
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use crate::plan::Role;
    use std::path::PathBuf;

    fn entry(url: &str) -> PlanEntry {
        PlanEntry::new(
            Role::Tools,
            "arduino".into(),
            "bossac",
            "1.7.0".into(),
            PathBuf::from("/unused"),
            url,
            "",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_download_writes_archive() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bossac-1.7.0.tar.gz")
            .with_status(200)
            .with_body("archive-bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bossac-1.7.0.tar.gz");
        let entry = entry(&format!("{}/bossac-1.7.0.tar.gz", server.url()));
        let client = Client::new();

        let bytes = DownloadRequest::new(&client, &entry, &dest, &NullReporter)
            .execute()
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive-bytes");
        assert!(!paths::partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_http_error_leaves_nothing_behind() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.tar.gz");
        let entry = entry(&format!("{}/missing.tar.gz", server.url()));
        let client = Client::new();

        let err = DownloadRequest::new(&client, &entry, &dest, &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Http { .. }));
        assert!(!dest.exists());
        assert!(!paths::partial_path(&dest).exists());
    }
}
