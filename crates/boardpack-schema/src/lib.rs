//! Shared data model for boardpack: manifest documents, name and version
//! newtypes, and host identifiers.

pub mod host;
pub mod index;
pub mod types;
pub mod version;

// Re-exports
pub use index::{
    Help, Package, PackagePlatform, PackagesIndex, PlatformBoard, Tool, ToolDependency,
    ToolSystem,
};
pub use types::*;
pub use version::{VersionError, parse_lenient};
