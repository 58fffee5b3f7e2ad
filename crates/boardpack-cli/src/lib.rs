//! boardpack - hardware package installer
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves Arduino-style package indices into a toolchain tree:
//!
//! ```text
//! <root>/
//! ├── .archives/                       # Downloaded archives
//! ├── arduino/hardware/samd/1.6.17/    # Platform cores
//! ├── arduino/tools/bossac/1.7.0/      # Tools they depend on
//! └── adafruit/hardware/samd/1.2.9/
//! ```

pub mod config;
pub mod ops;
pub mod ui;

use std::path::PathBuf;

use clap::Parser;

pub use config::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "boardpack")]
#[command(author, version, about = "Install Arduino hardware packages and their tools")]
pub struct Cli {
    /// Directory the package trees are installed under
    #[arg(long, env = "BOARDPACK_ROOT", default_value = "/tmp/working")]
    pub root_directory: PathBuf,

    /// Run configuration (TOML); the built-in Adafruit SAMD run when omitted
    #[arg(long, env = "BOARDPACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where archives are downloaded [default: <root>/.archives]
    #[arg(long)]
    pub cache_directory: Option<PathBuf>,

    /// Fail when a pinned version is not published instead of using the newest
    #[arg(long)]
    pub strict_pins: bool,

    /// Maximum concurrent downloads [default: unlimited]
    #[arg(short, long, value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Suppress the progress table
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_jobs(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    pub fn run_options(&self) -> ops::install::RunOptions {
        ops::install::RunOptions {
            root: self.root_directory.clone(),
            cache_dir: self.cache_directory.clone(),
            strict_pins: self.strict_pins,
            jobs: self.jobs,
        }
    }
}
