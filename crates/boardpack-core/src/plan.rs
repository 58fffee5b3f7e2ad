//! Installation plan construction.
//!
//! A plan is a flat, ordered list of archives to place under a root
//! directory. Building it resolves every tool dependency up front, so a plan
//! either exists in full or not at all: nothing is downloaded for a run whose
//! tools cannot be found.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use boardpack_schema::{PackageName, Version};
use thiserror::Error;

use crate::paths;
use crate::resolver::{ResolveError, ResolvedPackage, resolve_tool};
use crate::store::ManifestStore;

/// Failures while building an [`InstallationPlan`].
#[derive(Error, Debug)]
pub enum PlanError {
    /// A tool dependency could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The download URL does not parse or names no file.
    #[error("invalid archive URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as published
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The published size is not a decimal byte count.
    #[error("invalid size '{size}' for {url}")]
    InvalidSize {
        /// Size as published
        size: String,
        /// URL the size belongs to
        url: String,
    },

    /// A package, architecture, tool or version would escape its directory.
    #[error("'{value}' cannot be used as a path component")]
    UnsafePath {
        /// Offending name
        value: String,
    },

    /// Two entries share an archive file name but not a URL.
    #[error("archive {file_name} is published at two URLs: {first} and {second}")]
    ArchiveConflict {
        /// Shared cache file name
        file_name: String,
        /// URL of the entry planned first
        first: String,
        /// URL of the rejected entry
        second: String,
    },
}

/// Whether an entry installs a hardware platform or a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A platform core under `hardware/`
    Hardware,
    /// A tool under `tools/`
    Tools,
}

impl Role {
    /// Directory name used in the install tree.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hardware => paths::HARDWARE_DIR,
            Self::Tools => paths::TOOLS_DIR,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One archive to fetch and place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Directory the archive's top-level directory becomes.
    pub path: PathBuf,
    /// Archive file name in the cache, the final segment of `url`.
    pub file_name: String,
    /// Download URL.
    pub url: String,
    /// Expected size in bytes; advisory, used as the progress total.
    pub size: u64,
    /// Hardware or tool.
    pub role: Role,
    /// Package whose tree the entry lands in.
    pub package: PackageName,
    /// Architecture for hardware entries, tool name for tool entries.
    pub name: String,
    /// Release version, the last path component.
    pub version: Version,
}

impl PlanEntry {
    /// Create an entry, deriving the archive file name and parsing the size.
    ///
    /// An empty size is treated as unknown (zero).
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidUrl`] if the URL does not parse or has no
    /// final path segment, and [`PlanError::InvalidSize`] if `size` is not a
    /// decimal byte count.
    pub fn new(
        role: Role,
        package: PackageName,
        name: &str,
        version: Version,
        path: PathBuf,
        url: &str,
        size: &str,
    ) -> Result<Self, PlanError> {
        let file_name = filename_from_url(url)?;
        let size = parse_size(size).ok_or_else(|| PlanError::InvalidSize {
            size: size.to_string(),
            url: url.to_string(),
        })?;

        Ok(Self {
            path,
            file_name,
            url: url.to_string(),
            size,
            role,
            package,
            name: name.to_string(),
            version,
        })
    }

    /// Short human label, e.g. `arduino/tools/bossac@1.7.0`.
    pub fn label(&self) -> String {
        format!("{}/{}/{}@{}", self.package, self.role, self.name, self.version)
    }
}

/// The ordered list of archives for one run.
#[derive(Debug, Clone, Default)]
pub struct InstallationPlan {
    root: PathBuf,
    entries: Vec<PlanEntry>,
}

impl InstallationPlan {
    /// An empty plan installing under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    /// Install root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entries in plan order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. Returns `false` if an entry with the same destination
    /// is already planned (the new one is dropped).
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::ArchiveConflict`] if another entry uses the same
    /// archive file name for a different URL.
    pub fn add(&mut self, entry: PlanEntry) -> Result<bool, PlanError> {
        if self.entries.iter().any(|e| e.path == entry.path) {
            tracing::debug!(path = %entry.path.display(), "destination already planned");
            return Ok(false);
        }
        if let Some(other) = self
            .entries
            .iter()
            .find(|e| e.file_name == entry.file_name && e.url != entry.url)
        {
            return Err(PlanError::ArchiveConflict {
                file_name: entry.file_name,
                first: other.url.clone(),
                second: entry.url,
            });
        }
        self.entries.push(entry);
        Ok(true)
    }

    /// Destinations of hardware entries, where board definitions live.
    pub fn hardware_paths(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|e| e.role == Role::Hardware)
            .map(|e| e.path.as_path())
    }

    /// Entries grouped by archive file name, first occurrence order kept.
    pub fn archives(&self) -> Vec<&PlanEntry> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.file_name.as_str()))
            .collect()
    }
}

/// Expand resolved platforms and their tool dependencies into a plan.
///
/// Entries are emitted per resolved package in the given order: the hardware
/// archive first, then one entry per tool dependency.
///
/// # Errors
///
/// Fails on the first tool that cannot be resolved for `allowed_hosts`, or on
/// malformed URLs, sizes, or path components. No partial plan is returned.
pub fn build_plan<S: AsRef<str>>(
    store: &ManifestStore,
    resolved: &[ResolvedPackage<'_>],
    root: &Path,
    allowed_hosts: &[S],
) -> Result<InstallationPlan, PlanError> {
    let mut plan = InstallationPlan::new(root);

    for rp in resolved {
        let package = &rp.package.name;
        let platform = rp.platform;
        check_components(&[
            package.as_str(),
            platform.architecture.as_str(),
            platform.version.as_str(),
        ])?;

        let hw_path = paths::hardware_path(root, package, &platform.architecture, &platform.version);
        tracing::info!(path = %hw_path.display(), "hardware");
        plan.add(PlanEntry::new(
            Role::Hardware,
            package.clone(),
            &platform.architecture,
            platform.version.clone(),
            hw_path,
            &platform.url,
            &platform.size,
        )?)?;

        for dependency in &platform.tools_dependencies {
            let (tool, system) = resolve_tool(store, platform, dependency, allowed_hosts)?;
            check_components(&[tool.name.as_str(), tool.version.as_str()])?;

            let tool_path = paths::tool_path(root, package, &tool.name, &tool.version);
            tracing::info!(path = %tool_path.display(), host = %system.host, "tool");
            plan.add(PlanEntry::new(
                Role::Tools,
                package.clone(),
                &tool.name,
                tool.version.clone(),
                tool_path,
                &system.url,
                &system.size,
            )?)?;
        }
    }

    Ok(plan)
}

/// The final path segment of a URL, ignoring host and query string.
///
/// # Errors
///
/// Returns [`PlanError::InvalidUrl`] if the URL does not parse or its path
/// has no non-empty final segment.
pub fn filename_from_url(url: &str) -> Result<String, PlanError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| PlanError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| paths::is_safe_component(s))
        .map(str::to_string)
        .ok_or_else(|| PlanError::InvalidUrl {
            url: url.to_string(),
            reason: "no file name in path".to_string(),
        })
}

fn parse_size(size: &str) -> Option<u64> {
    let size = size.trim();
    if size.is_empty() {
        return Some(0);
    }
    size.parse().ok()
}

fn check_components(values: &[&str]) -> Result<(), PlanError> {
    match values.iter().find(|v| !paths::is_safe_component(v)) {
        Some(bad) => Err(PlanError::UnsafePath {
            value: (*bad).to_string(),
        }),
        None => Ok(()),
    }
}
