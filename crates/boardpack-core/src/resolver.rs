//! Platform and tool resolution.
//!
//! Resolution is a flat lookup, not a solver: pick one platform release per
//! platform name, then look each of its tool dependencies up by exact name and
//! version and choose the download for the current host.

use std::collections::BTreeMap;

use boardpack_schema::{
    Package, PackageName, PackagePlatform, Tool, ToolDependency, ToolSystem, VersionError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::ManifestStore;

/// Failures while selecting platforms and tools.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A candidate's version cannot be compared, even leniently.
    #[error("platform '{platform}' has an unusable version: {source}")]
    InvalidVersion {
        /// Platform name
        platform: String,
        /// Parse failure
        #[source]
        source: VersionError,
    },

    /// A strict pin matched no candidate.
    #[error("pinned version {pin} of '{platform}' not found (available: {})", .available.join(", "))]
    PinNotFound {
        /// Platform name
        platform: String,
        /// Requested version
        pin: String,
        /// Candidate versions, newest first
        available: Vec<String>,
    },

    /// No manifest publishes the tool at the required version.
    #[error("tool {dependency} required by '{platform}' not found in any manifest")]
    ToolNotFound {
        /// Platform declaring the dependency
        platform: String,
        /// The unmet dependency
        dependency: ToolDependency,
    },

    /// The tool has no download for any allowed host.
    #[error("tool {tool}@{version} has no download for hosts [{}]", .hosts.join(", "))]
    NoHostVariant {
        /// Tool name
        tool: String,
        /// Tool version
        version: String,
        /// Allowed hosts that were tried
        hosts: Vec<String>,
    },
}

/// What to do when a pinned version matches no candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinPolicy {
    /// Keep the newest version and log a warning.
    #[default]
    Fallback,
    /// Fail resolution with [`ResolveError::PinNotFound`].
    Strict,
}

/// A platform release chosen for installation, borrowed from the store.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPackage<'a> {
    /// The package publishing the platform.
    pub package: &'a Package,
    /// The selected release.
    pub platform: &'a PackagePlatform,
}

/// One resolution request: a package set, an architecture and an optional pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Package names whose platforms take part.
    pub packages: Vec<PackageName>,
    /// Target architecture (e.g. `samd`).
    pub architecture: String,
    /// Exact version to prefer over the newest one; empty means no pin.
    #[serde(default)]
    pub version: Option<String>,
}

impl Selection {
    /// Resolve this selection against the store.
    ///
    /// # Errors
    ///
    /// See [`select_by_architecture`].
    pub fn resolve<'a>(
        &self,
        store: &'a ManifestStore,
        policy: PinPolicy,
    ) -> Result<BTreeMap<String, ResolvedPackage<'a>>, ResolveError> {
        select_by_architecture(
            store,
            &self.packages,
            &self.architecture,
            self.version.as_deref(),
            policy,
        )
    }
}

/// Select one platform release per platform name for an architecture.
///
/// Candidates come from packages named in `package_names` and are grouped by
/// platform name. Each group is ordered newest first; the sort is stable, so
/// among equal versions the candidate scanned first (earliest-loaded document)
/// is kept. A `pin` overrides the newest version with the first candidate
/// whose version text equals it exactly. An empty or blank pin is no pin.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidVersion`] if any candidate version cannot be
/// compared, and [`ResolveError::PinNotFound`] when a pin matches nothing in a
/// group under [`PinPolicy::Strict`].
pub fn select_by_architecture<'a, S: AsRef<str>>(
    store: &'a ManifestStore,
    package_names: &[S],
    architecture: &str,
    pin: Option<&str>,
    policy: PinPolicy,
) -> Result<BTreeMap<String, ResolvedPackage<'a>>, ResolveError> {
    let pin = pin.map(str::trim).filter(|p| !p.is_empty());
    let mut by_name: BTreeMap<&str, Vec<(semver::Version, ResolvedPackage<'a>)>> = BTreeMap::new();

    for package in store.packages() {
        if !package_names
            .iter()
            .any(|n| n.as_ref() == package.name.as_str())
        {
            continue;
        }
        for platform in package
            .platforms
            .iter()
            .filter(|p| p.architecture == architecture)
        {
            let version = platform
                .version
                .semver()
                .map_err(|source| ResolveError::InvalidVersion {
                    platform: platform.name.clone(),
                    source,
                })?;
            by_name
                .entry(platform.name.as_str())
                .or_default()
                .push((version, ResolvedPackage { package, platform }));
        }
    }

    let mut selected = BTreeMap::new();
    for (name, mut candidates) in by_name {
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        let mut choice = candidates[0].1;
        if let Some(pin) = pin {
            if let Some((_, pinned)) = candidates.iter().find(|(_, c)| c.platform.version == pin) {
                choice = *pinned;
            } else {
                let available: Vec<String> = candidates
                    .iter()
                    .map(|(_, c)| c.platform.version.to_string())
                    .collect();
                match policy {
                    PinPolicy::Strict => {
                        return Err(ResolveError::PinNotFound {
                            platform: name.to_string(),
                            pin: pin.to_string(),
                            available,
                        });
                    }
                    PinPolicy::Fallback => {
                        tracing::warn!(
                            platform = name,
                            pin,
                            selected = %choice.platform.version,
                            "pinned version not found, using newest"
                        );
                    }
                }
            }
        }

        tracing::debug!(
            platform = name,
            package = %choice.package.name,
            version = %choice.platform.version,
            "selected platform"
        );
        selected.insert(name.to_string(), choice);
    }

    Ok(selected)
}

/// Pick the first variant, in declared order, whose host is in `allowed_hosts`.
pub fn select_variant<'a, S: AsRef<str>>(
    tool: &'a Tool,
    allowed_hosts: &[S],
) -> Option<&'a ToolSystem> {
    tool.systems
        .iter()
        .find(|system| allowed_hosts.iter().any(|h| h.as_ref() == system.host))
}

/// Resolve a platform's tool dependency to a tool release and host download.
///
/// # Errors
///
/// Returns [`ResolveError::ToolNotFound`] when no manifest publishes the
/// tool at that version and [`ResolveError::NoHostVariant`] when none of its
/// downloads target an allowed host.
pub fn resolve_tool<'a, S: AsRef<str>>(
    store: &'a ManifestStore,
    platform: &PackagePlatform,
    dependency: &ToolDependency,
    allowed_hosts: &[S],
) -> Result<(&'a Tool, &'a ToolSystem), ResolveError> {
    let tool = store
        .find_tool(dependency)
        .ok_or_else(|| ResolveError::ToolNotFound {
            platform: platform.name.clone(),
            dependency: dependency.clone(),
        })?;

    let system = select_variant(tool, allowed_hosts).ok_or_else(|| ResolveError::NoHostVariant {
        tool: tool.name.clone(),
        version: tool.version.to_string(),
        hosts: allowed_hosts.iter().map(|h| h.as_ref().to_string()).collect(),
    })?;

    Ok((tool, system))
}
