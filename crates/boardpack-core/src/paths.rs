//! Install tree layout under the root directory.

use std::path::{Path, PathBuf};

/// Directory tag for platform archives: `<root>/<package>/hardware/...`
pub const HARDWARE_DIR: &str = "hardware";

/// Directory tag for tool archives: `<root>/<package>/tools/...`
pub const TOOLS_DIR: &str = "tools";

/// Suffix for archives still being downloaded.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Hardware destination: `<root>/<package>/hardware/<architecture>/<version>`
pub fn hardware_path(root: &Path, package: &str, architecture: &str, version: &str) -> PathBuf {
    root.join(package)
        .join(HARDWARE_DIR)
        .join(architecture)
        .join(version)
}

/// Tool destination: `<root>/<package>/tools/<tool>/<version>`
pub fn tool_path(root: &Path, package: &str, tool: &str, version: &str) -> PathBuf {
    root.join(package).join(TOOLS_DIR).join(tool).join(version)
}

/// Default archive cache: `<root>/.archives`
pub fn default_cache_dir(root: &Path) -> PathBuf {
    root.join(".archives")
}

/// Where an archive is written while its download is in flight.
pub fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Whether a manifest-supplied name is safe to use as one path component.
pub fn is_safe_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\']) && !s.contains('\0')
}
