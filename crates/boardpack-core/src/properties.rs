//! Flat `key=value` property files (`boards.txt`, `platform.txt`).
//!
//! Keys are dotted paths such as `adafruit_feather_m0.build.mcu`. Files are
//! merged with last-write-wins semantics; overwrites of a non-empty value are
//! returned to the caller as [`Collision`]s instead of being logged here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures while locating or reading property files.
#[derive(Error, Debug)]
pub enum PropertiesError {
    /// A property file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Property file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The directory walk failed.
    #[error("failed to walk {root}: {source}")]
    Walk {
        /// Root of the walk
        root: PathBuf,
        /// Underlying walk error
        #[source]
        source: walkdir::Error,
    },
}

/// A key whose earlier non-empty value was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// Full dotted key.
    pub key: String,
    /// Value before the overwrite.
    pub previous: String,
    /// File that supplied the new value.
    pub file: PathBuf,
}

/// Parse property text into ordered `(key, value)` pairs.
///
/// Blank lines, lines starting with `#` and lines without `=` are skipped.
/// The line is split at the first `=`, so values may themselves contain `=`
/// or `#`.
pub fn parse(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Every file named `file_name` under `root`, sorted by path.
///
/// # Errors
///
/// Returns [`PropertiesError::Walk`] if part of the tree cannot be read.
pub fn find_named(root: &Path, file_name: &str) -> Result<Vec<PathBuf>, PropertiesError> {
    let mut found = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| PropertiesError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && entry.file_name() == file_name {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Merged property map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    map: BTreeMap<String, String>,
}

impl Properties {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and merge files in order. Later files win.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Read`] for the first unreadable file.
    pub fn merge_files<P: AsRef<Path>>(
        paths: &[P],
    ) -> Result<(Self, Vec<Collision>), PropertiesError> {
        let mut props = Self::new();
        let mut collisions = Vec::new();
        for path in paths {
            collisions.extend(props.add_file(path.as_ref())?);
        }
        Ok((props, collisions))
    }

    /// Merge one file into the map. Bytes that are not UTF-8 are replaced,
    /// not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Read`] if the file cannot be read.
    pub fn add_file(&mut self, path: &Path) -> Result<Vec<Collision>, PropertiesError> {
        let bytes = std::fs::read(path).map_err(|source| PropertiesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.add_text(&String::from_utf8_lossy(&bytes), path))
    }

    /// Merge already-read text, attributing collisions to `file`.
    pub fn add_text(&mut self, text: &str, file: &Path) -> Vec<Collision> {
        let mut collisions = Vec::new();
        for (key, value) in parse(text) {
            match self.map.insert(key.clone(), value) {
                Some(previous) if !previous.is_empty() => collisions.push(Collision {
                    key,
                    previous,
                    file: file.to_path_buf(),
                }),
                _ => {}
            }
        }
        collisions
    }

    /// Keys under `prefix.` with the prefix stripped.
    pub fn narrow(&self, prefix: &str) -> Self {
        let dotted = format!("{prefix}.");
        let map = self
            .map
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&dotted).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        Self { map }
    }

    /// Value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no key is set.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARDS: &str = "\
# Adafruit Feather M0
adafruit_feather_m0.name=Adafruit Feather M0 (SAMD21)
adafruit_feather_m0.build.mcu=cortex-m0plus
adafruit_feather_m0.build.extra_flags=-DARDUINO_SAMD_ZERO -D__SAMD21G18A__

menu.cpu=Processor
not a property
adafruit_metro_m0.name=Adafruit Metro M0
";

    #[test]
    fn test_parse_skips_comments_and_junk() {
        let pairs = parse(BOARDS);
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0].0, "adafruit_feather_m0.name");
        assert_eq!(pairs[0].1, "Adafruit Feather M0 (SAMD21)");
    }

    #[test]
    fn test_value_keeps_equals_and_hash() {
        let pairs = parse("recipe.hooks=echo a=b # not a comment\n");
        assert_eq!(pairs, vec![(
            "recipe.hooks".to_string(),
            "echo a=b # not a comment".to_string()
        )]);
    }

    #[test]
    fn test_narrow() {
        let mut props = Properties::new();
        props.add_text(BOARDS, Path::new("boards.txt"));

        let board = props.narrow("adafruit_feather_m0");
        assert_eq!(board.len(), 3);
        assert_eq!(board.get("build.mcu"), Some("cortex-m0plus"));
        assert_eq!(board.get("name"), Some("Adafruit Feather M0 (SAMD21)"));
        assert!(props.narrow("adafruit_feather").is_empty());
    }

    #[test]
    fn test_non_utf8_file_is_read_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boards.txt");
        std::fs::write(&path, b"zero.name=Arduino Zero \xe9dition\nzero.build.mcu=cortex-m0plus\n").unwrap();

        let mut props = Properties::new();
        props.add_file(&path).unwrap();

        assert_eq!(props.get("zero.build.mcu"), Some("cortex-m0plus"));
        assert_eq!(props.get("zero.name"), Some("Arduino Zero \u{fffd}dition"));
    }

    #[test]
    fn test_merge_last_write_wins_with_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "x.name=first\nx.empty=\n").unwrap();
        std::fs::write(&b, "x.name=second\nx.empty=filled\n").unwrap();

        let (props, collisions) = Properties::merge_files(&[&a, &b]).unwrap();

        assert_eq!(props.get("x.name"), Some("second"));
        assert_eq!(props.get("x.empty"), Some("filled"));
        assert_eq!(collisions, vec![Collision {
            key: "x.name".into(),
            previous: "first".into(),
            file: b.clone(),
        }]);
    }

    #[test]
    fn test_merge_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Properties::merge_files(&[dir.path().join("boards.txt")]).unwrap_err();
        assert!(matches!(err, PropertiesError::Read { .. }));
    }

    #[test]
    fn test_find_named_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["b/samd", "a/samd", "a/avr/variants"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        std::fs::write(root.join("b/samd/boards.txt"), "").unwrap();
        std::fs::write(root.join("a/samd/boards.txt"), "").unwrap();
        std::fs::write(root.join("a/avr/variants/boards.txt.bak"), "").unwrap();
        std::fs::write(root.join("a/samd/platform.txt"), "").unwrap();

        let found = find_named(root, "boards.txt").unwrap();
        assert_eq!(found, vec![root.join("a/samd/boards.txt"), root.join("b/samd/boards.txt")]);
    }
}
