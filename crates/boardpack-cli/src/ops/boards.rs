//! Board definitions from installed hardware trees.

use std::path::Path;

use anyhow::{Context, Result};
use boardpack_core::properties::{Collision, find_named};
use boardpack_core::{Properties, Reporter};

/// Properties of one board plus the platform it builds with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProperties {
    pub board: String,
    /// `boards.txt` keys under `<board>.`, prefix stripped
    pub board_properties: Properties,
    /// Merged `platform.txt`
    pub platform: Properties,
}

/// Merge every `boards.txt` and `platform.txt` found under `hardware_paths`
/// and narrow the board definitions to `board`. A board no file defines is
/// reported as a warning, not an error.
pub fn load<'a>(
    hardware_paths: impl IntoIterator<Item = &'a Path>,
    board: &str,
    reporter: &dyn Reporter,
) -> Result<BoardProperties> {
    let mut boards_files = Vec::new();
    let mut platform_files = Vec::new();
    for path in hardware_paths {
        boards_files.extend(find_named(path, "boards.txt")?);
        platform_files.extend(find_named(path, "platform.txt")?);
    }

    let (boards, collisions) =
        Properties::merge_files(&boards_files).context("failed to read boards.txt")?;
    log_collisions(&collisions);
    let (platform, collisions) =
        Properties::merge_files(&platform_files).context("failed to read platform.txt")?;
    log_collisions(&collisions);

    let board_properties = boards.narrow(board);
    if board_properties.is_empty() {
        tracing::warn!(board, files = boards_files.len(), "board not defined in any boards.txt");
        reporter.warning(&format!("board '{board}' is not defined in any boards.txt"));
    } else {
        tracing::info!(
            board,
            name = board_properties.get("name").unwrap_or_default(),
            properties = board_properties.len(),
            "board"
        );
    }

    Ok(BoardProperties {
        board: board.to_string(),
        board_properties,
        platform,
    })
}

fn log_collisions(collisions: &[Collision]) {
    for c in collisions {
        tracing::warn!(
            key = %c.key,
            previous = %c.previous,
            file = %c.file.display(),
            "key collision"
        );
    }
}
