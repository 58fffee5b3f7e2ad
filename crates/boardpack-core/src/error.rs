//! Crate-level error type.
//!
//! Each stage has its own error enum; [`Error`] wraps them all and classifies
//! them into four kinds for callers that only care about the broad failure
//! class.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use crate::plan::PlanError;
use crate::properties::PropertiesError;
use crate::resolver::ResolveError;
use crate::store::ManifestError;

/// Broad failure class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable or malformed input: manifests, URLs, sizes, config.
    Input,
    /// A version, pin, tool or host variant could not be resolved.
    Resolution,
    /// Network or write failure while downloading.
    Transfer,
    /// Archive could not be unpacked or placed.
    Extraction,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Resolution => "resolution",
            Self::Transfer => "transfer",
            Self::Extraction => "extraction",
        };
        f.write_str(s)
    }
}

/// Any failure from loading manifests through placing archives.
#[derive(Error, Debug)]
pub enum Error {
    /// A manifest could not be read or parsed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Platform, pin or tool selection failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The installation plan could not be built.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// An archive download failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// An archive could not be unpacked or placed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// A properties file could not be read.
    #[error(transparent)]
    Properties(#[from] PropertiesError),

    /// Directory setup outside of a download or extraction.
    #[error("{context} {}: {source}", .path.display())]
    Filesystem {
        /// What was being attempted
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn filesystem(
        context: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Filesystem {
            context,
            path,
            source,
        }
    }

    /// Broad class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Manifest(_) | Self::Properties(_) => ErrorKind::Input,
            Self::Resolve(_) | Self::Plan(PlanError::Resolve(_)) => ErrorKind::Resolution,
            Self::Plan(_) => ErrorKind::Input,
            Self::Download(_) => ErrorKind::Transfer,
            Self::Extract(_) | Self::Filesystem { .. } => ErrorKind::Extraction,
        }
    }
}
