//! In-memory aggregation of manifest documents.
//!
//! Documents are kept in load order. Every scan (platform resolution, tool
//! lookup) walks documents in that order and packages in document order,
//! which is what makes "first match wins" deterministic.

use std::path::{Path, PathBuf};

use boardpack_schema::{Package, PackagesIndex, Tool, ToolDependency};
use thiserror::Error;

/// Failures while loading a manifest document.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The file is missing or unreadable.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Manifest path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid manifest document.
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// JSON error with line and column
        #[source]
        source: serde_json::Error,
    },
}

/// A manifest document together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File the document was loaded from (empty for in-memory documents).
    pub source: PathBuf,
    /// Parsed document.
    pub index: PackagesIndex,
}

/// All loaded manifest documents. Immutable once loading is finished.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    documents: Vec<LoadedDocument>,
}

impl ManifestStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-parsed documents, in the given order.
    pub fn from_documents(documents: impl IntoIterator<Item = PackagesIndex>) -> Self {
        let mut store = Self::new();
        for index in documents {
            store.add_document(PathBuf::new(), index);
        }
        store
    }

    /// Read and parse a manifest document, appending it to the store.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read and
    /// [`ManifestError::Parse`] if it is not a valid manifest document.
    pub fn load(&mut self, path: &Path) -> Result<(), ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let index = PackagesIndex::from_json(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            packages = index.packages.len(),
            "loaded manifest"
        );
        self.add_document(path.to_path_buf(), index);
        Ok(())
    }

    /// Load several manifests in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`ManifestError`] encountered.
    pub fn load_all<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), ManifestError> {
        for path in paths {
            self.load(path.as_ref())?;
        }
        Ok(())
    }

    /// Append a parsed document, recording where it came from.
    pub fn add_document(&mut self, source: PathBuf, index: PackagesIndex) {
        self.documents.push(LoadedDocument { source, index });
    }

    /// Loaded documents in load order.
    pub fn documents(&self) -> &[LoadedDocument] {
        &self.documents
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Every package across all documents, in load order then document order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.documents.iter().flat_map(|d| d.index.packages.iter())
    }

    /// Find the tool release matching a dependency's name and version exactly.
    ///
    /// The first match in scan order wins. The dependency's packager is not
    /// consulted, and tools of tools are never followed.
    pub fn find_tool(&self, dependency: &ToolDependency) -> Option<&Tool> {
        self.packages()
            .flat_map(|pkg| pkg.tools.iter())
            .find(|t| t.name == dependency.name && t.version == dependency.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardpack_schema::{ToolSystem, Version};

    fn tool(name: &str, version: &str, host: &str) -> Tool {
        Tool {
            name: name.into(),
            version: Version::from(version),
            systems: vec![ToolSystem {
                host: host.into(),
                url: format!("https://example.com/{name}-{version}-{host}.tar.gz"),
                ..ToolSystem::default()
            }],
        }
    }

    fn document(package: &str, tools: Vec<Tool>) -> PackagesIndex {
        PackagesIndex {
            packages: vec![Package {
                name: package.into(),
                tools,
                ..Package::default()
            }],
        }
    }

    fn dependency(name: &str, version: &str) -> ToolDependency {
        ToolDependency {
            packager: "arduino".into(),
            name: name.into(),
            version: Version::from(version),
        }
    }

    #[test]
    fn test_find_tool_exact_match() {
        let store = ManifestStore::from_documents(vec![document(
            "arduino",
            vec![
                tool("bossac", "1.6.1-arduino", "x86_64-linux-gnu"),
                tool("bossac", "1.7.0", "x86_64-linux-gnu"),
            ],
        )]);

        let found = store.find_tool(&dependency("bossac", "1.7.0")).unwrap();
        assert_eq!(found.name, "bossac");
        assert_eq!(found.version, "1.7.0");
    }

    #[test]
    fn test_find_tool_first_loaded_document_wins() {
        let store = ManifestStore::from_documents(vec![
            document("first", vec![tool("openocd", "0.9.0", "host-a")]),
            document("second", vec![tool("openocd", "0.9.0", "host-b")]),
        ]);

        let found = store.find_tool(&dependency("openocd", "0.9.0")).unwrap();
        assert_eq!(found.systems[0].host, "host-a");
    }

    #[test]
    fn test_find_tool_ignores_packager_and_requires_version() {
        let store = ManifestStore::from_documents(vec![document(
            "adafruit",
            vec![tool("arm-none-eabi-gcc", "4.8.3-2014q1", "x86_64-linux-gnu")],
        )]);

        let mut dep = dependency("arm-none-eabi-gcc", "4.8.3-2014q1");
        dep.packager = "someone-else".into();
        assert!(store.find_tool(&dep).is_some());
        assert!(store.find_tool(&dependency("arm-none-eabi-gcc", "4.8.3")).is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ManifestStore::new();
        let err = store.load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package_bad_index.json");
        std::fs::write(&path, r#"{"packages": "nope"}"#).unwrap();

        let mut store = ManifestStore::new();
        let err = store.load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn test_load_all_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, r#"{"packages":[{"name":"adafruit"}]}"#).unwrap();
        std::fs::write(&b, r#"{"packages":[{"name":"arduino"}]}"#).unwrap();

        let mut store = ManifestStore::new();
        store.load_all(&[&a, &b]).unwrap();

        let names: Vec<&str> = store.packages().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["adafruit", "arduino"]);
        assert_eq!(store.documents()[1].source, b);
    }
}
