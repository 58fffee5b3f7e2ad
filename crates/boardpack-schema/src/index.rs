//! Manifest documents (`package_*_index.json`).
//!
//! A document lists packages; each package publishes hardware platform
//! releases and the tool releases those platforms depend on. Field names
//! follow the published JSON format. Fields the resolver never interprets
//! (checksums, help links, maintainer details, board lists) are still modelled
//! so a document survives a serialize/deserialize round trip.

use serde::{Deserialize, Serialize};

use crate::types::{PackageName, Version};

/// One manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagesIndex {
    /// Packages in document order.
    #[serde(default)]
    pub packages: Vec<Package>,
}

impl PackagesIndex {
    /// Deserialize a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the text is not a valid
    /// manifest document.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A vendor package: maintainer metadata plus its platforms and tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name, also the top-level directory of its installation tree.
    pub name: PackageName,
    /// Human-readable maintainer.
    #[serde(default)]
    pub maintainer: String,
    /// Vendor website.
    #[serde(default, rename = "websiteURL")]
    pub website_url: String,
    /// Maintainer contact address.
    #[serde(default)]
    pub email: String,
    /// Online help link.
    #[serde(default)]
    pub help: Help,
    /// Hardware platform releases.
    #[serde(default)]
    pub platforms: Vec<PackagePlatform>,
    /// Tool releases.
    #[serde(default)]
    pub tools: Vec<Tool>,
}

/// Online help pointer attached to packages and platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Help {
    /// Help URL.
    #[serde(default)]
    pub online: String,
}

/// A board advertised by a platform release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformBoard {
    /// Display name of the board.
    pub name: String,
}

/// A tool required by a platform release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolDependency {
    /// Package that publishes the tool. Carried, not used for matching.
    #[serde(default)]
    pub packager: String,
    /// Tool name.
    pub name: String,
    /// Exact tool version.
    pub version: Version,
}

impl std::fmt::Display for ToolDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.packager, self.name, self.version)
    }
}

/// A released version of a hardware platform for one architecture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePlatform {
    /// Platform name; resolution groups by this, not by package name.
    pub name: String,
    /// Target architecture (e.g. `samd`, `avr`).
    pub architecture: String,
    /// Release version.
    pub version: Version,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Online help pointer.
    #[serde(default)]
    pub help: Help,
    /// Archive download URL.
    pub url: String,
    /// Archive file name as published (informational).
    #[serde(default)]
    pub archive_file_name: String,
    /// Checksum as published (`SHA-256:<hex>`), never validated.
    #[serde(default)]
    pub checksum: String,
    /// Archive size in bytes, as a decimal string.
    #[serde(default)]
    pub size: String,
    /// Boards supported by this release.
    #[serde(default)]
    pub boards: Vec<PlatformBoard>,
    /// Tools this release needs.
    #[serde(default)]
    pub tools_dependencies: Vec<ToolDependency>,
}

/// A released version of a tool, with one download per host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name.
    pub name: String,
    /// Tool version.
    pub version: Version,
    /// Host-specific downloads in declared order.
    #[serde(default)]
    pub systems: Vec<ToolSystem>,
}

/// A host-specific download of a tool release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSystem {
    /// Host triple this archive runs on (e.g. `x86_64-pc-linux-gnu`).
    pub host: String,
    /// Archive download URL.
    pub url: String,
    /// Archive file name as published (informational).
    #[serde(default)]
    pub archive_file_name: String,
    /// Checksum as published, never validated.
    #[serde(default)]
    pub checksum: String,
    /// Archive size in bytes, as a decimal string.
    #[serde(default)]
    pub size: String,
}
