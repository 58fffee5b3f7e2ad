//! Core library for boardpack.
//!
//! Turns a set of hardware-package manifests into an installation plan and
//! executes it:
//!
//! ```text
//! ManifestStore --[resolver]--> ResolvedPackage --[plan]--> InstallationPlan --[executor]--> tree
//! ```
//!
//! Every stage returns a [`Result`]; nothing in this crate exits the process.

pub mod error;
pub mod executor;
pub mod io;
pub mod paths;
pub mod plan;
pub mod properties;
pub mod reporter;
pub mod resolver;
pub mod store;

pub use error::{Error, ErrorKind};
pub use executor::{ExecutionReport, ExecutorOptions, PlanExecutor};
pub use plan::{InstallationPlan, PlanEntry, Role, build_plan};
pub use properties::Properties;
pub use reporter::{NullReporter, Reporter};
pub use resolver::{PinPolicy, ResolvedPackage, Selection};
pub use store::ManifestStore;

/// User Agent string for archive downloads
pub const USER_AGENT: &str = concat!("boardpack/", env!("CARGO_PKG_VERSION"));
