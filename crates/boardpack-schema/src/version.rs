//! Lenient semantic-version parsing for manifest versions.
//!
//! Vendor manifests are not strict semver: `1.6`, `v2.0.0` and `1.06.3` all
//! occur in the wild. They are normalized to a full `major.minor.patch` core
//! before handing off to [`semver::Version::parse`]; pre-release and build
//! suffixes (`-arduino5`, `+b1`) are kept as-is.

use thiserror::Error;

/// A version string that could not be interpreted as a semantic version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version '{version}': {reason}")]
pub struct VersionError {
    /// The offending version text.
    pub version: String,
    /// Why it was rejected.
    pub reason: String,
}

impl VersionError {
    fn new(version: &str, reason: impl Into<String>) -> Self {
        Self {
            version: version.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a manifest version, padding missing minor/patch components with zero.
///
/// # Errors
///
/// Returns [`VersionError`] for empty input, more than three numeric
/// components, non-numeric components, or an invalid suffix.
pub fn parse_lenient(raw: &str) -> Result<semver::Version, VersionError> {
    let trimmed = raw.trim();
    let text = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if text.is_empty() {
        return Err(VersionError::new(raw, "empty version"));
    }

    let split_at = text.find(['-', '+']).unwrap_or(text.len());
    let (core, suffix) = text.split_at(split_at);

    let mut parts = Vec::with_capacity(3);
    for component in core.split('.') {
        let n: u64 = component
            .parse()
            .map_err(|_| VersionError::new(raw, format!("'{component}' is not a number")))?;
        parts.push(n);
    }
    if parts.len() > 3 {
        return Err(VersionError::new(raw, "more than three numeric components"));
    }
    parts.resize(3, 0);

    let normalized = format!("{}.{}.{}{suffix}", parts[0], parts[1], parts[2]);
    semver::Version::parse(&normalized).map_err(|e| VersionError::new(raw, e.to_string()))
}
