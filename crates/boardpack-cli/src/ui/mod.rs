//! Terminal progress output.
//!
//! ```text
//! PlanExecutor --Reporter--> Output --mpsc--> UiActor --> TableRenderer --> RelativeFrame
//! ```

pub mod actor;
pub mod engine;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
