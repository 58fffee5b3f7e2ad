//! Run configuration.
//!
//! A TOML file naming the manifests to load, the package sets to resolve and
//! the board to narrow properties to:
//!
//! ```toml
//! manifests = ["package_adafruit_index.json", "package_index.json"]
//! board = "adafruit_feather_m0"
//!
//! [[select]]
//! packages = ["arduino"]
//! architecture = "samd"
//! version = "1.6.17"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use boardpack_core::{PinPolicy, Selection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Manifest documents, loaded in order. Relative paths are resolved
    /// against the config file's directory.
    pub manifests: Vec<PathBuf>,

    /// Host triples to accept for tool downloads; the running machine's
    /// defaults when empty.
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub strict_pins: bool,

    /// Board id whose `boards.txt` properties are extracted after install.
    #[serde(default)]
    pub board: Option<String>,

    #[serde(default)]
    pub max_concurrent_downloads: Option<usize>,

    #[serde(default, rename = "select")]
    pub selections: Vec<Selection>,
}

impl RunConfig {
    /// The default run: Adafruit SAMD boards on top of the Arduino SAMD core,
    /// reading both indices from the working directory.
    pub fn builtin() -> Self {
        Self {
            manifests: vec![
                PathBuf::from("package_adafruit_index.json"),
                PathBuf::from("package_index.json"),
            ],
            hosts: Vec::new(),
            strict_pins: false,
            board: Some("adafruit_feather_m0".to_string()),
            max_concurrent_downloads: None,
            selections: vec![
                Selection {
                    packages: vec!["arduino".into()],
                    architecture: "samd".to_string(),
                    version: Some("1.6.17".to_string()),
                },
                Selection {
                    packages: vec!["adafruit".into()],
                    architecture: "samd".to_string(),
                    version: Some("1.2.9".to_string()),
                },
            ],
        }
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse config text, resolving relative manifest paths against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.validate()?;
        for manifest in &mut config.manifests {
            if manifest.is_relative() {
                *manifest = base.join(&*manifest);
            }
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.manifests.is_empty() {
            bail!("no manifests listed");
        }
        if self.selections.is_empty() {
            bail!("no [[select]] entries");
        }
        if let Some(sel) = self.selections.iter().find(|s| s.packages.is_empty()) {
            bail!("selection for architecture '{}' names no packages", sel.architecture);
        }
        if self.max_concurrent_downloads == Some(0) {
            bail!("max_concurrent_downloads must be at least 1");
        }
        Ok(())
    }

    pub fn pin_policy(&self) -> PinPolicy {
        if self.strict_pins {
            PinPolicy::Strict
        } else {
            PinPolicy::Fallback
        }
    }

    pub fn hosts(&self) -> Vec<String> {
        if self.hosts.is_empty() {
            boardpack_schema::host::default_hosts()
        } else {
            self.hosts.clone()
        }
    }
}
