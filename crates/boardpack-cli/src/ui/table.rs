//! Live progress table, one row per plan entry.

use std::io::Write;

use crossterm::style::Stylize;

use super::engine::RelativeFrame;
use super::progress::{Spinner, format_download_progress};
use super::theme::Theme;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowState {
    Pending,
    Downloading { current: u64, total: Option<u64> },
    Extracting,
    Done { detail: String },
    Failed { reason: String },
}

impl RowState {
    fn is_active(&self) -> bool {
        matches!(self, Self::Downloading { .. } | Self::Extracting)
    }
}

/// What [`TableRenderer::prepare`] needs to lay out one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowSpec {
    /// Identifies the row in later updates; the entry's destination
    pub key: String,
    pub label: String,
    pub version: String,
    pub archive: String,
}

#[derive(Clone, Debug)]
struct Row {
    key: String,
    label: String,
    version: String,
    /// Rows sharing an archive are updated together.
    archive: String,
    state: RowState,
}

/// Message severity for footer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

#[derive(Debug)]
pub struct TableRenderer {
    rows: Vec<Row>,
    theme: Theme,
    spinner: Spinner,
    frame: Option<RelativeFrame>,
}

impl TableRenderer {
    pub fn new(theme: Theme) -> Self {
        let spinner = Spinner::new(theme.icons.clone());
        Self {
            rows: Vec::new(),
            theme,
            spinner,
            frame: None,
        }
    }

    /// Reserve one row per spec and draw them all pending.
    pub fn prepare(&mut self, specs: &[RowSpec]) {
        self.rows = specs
            .iter()
            .map(|spec| Row {
                key: spec.key.clone(),
                label: spec.label.clone(),
                version: spec.version.clone(),
                archive: spec.archive.clone(),
                state: RowState::Pending,
            })
            .collect();

        println!();
        let mut frame = RelativeFrame::new(self.rows.len() as u16);
        let _ = frame.start();
        self.frame = Some(frame);
        self.render_all();
    }

    pub fn update(&mut self, key: &str, state: RowState) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.key == key) {
            row.state = state;
        }
    }

    /// Download progress applies to every row fed by the same archive.
    pub fn update_archive(&mut self, archive: &str, state: &RowState) {
        for row in self.rows.iter_mut().filter(|r| r.archive == archive) {
            if !matches!(row.state, RowState::Done { .. } | RowState::Failed { .. }) {
                row.state = state.clone();
            }
        }
    }

    pub fn render_all(&mut self) {
        for idx in 0..self.rows.len() {
            self.render_row(idx);
        }
        if let Some(frame) = self.frame.as_mut() {
            let _ = frame.flush();
        }
    }

    /// Redraw only rows whose spinner is animating.
    pub fn render_active(&mut self) {
        let active: Vec<usize> = (0..self.rows.len())
            .filter(|i| self.rows[*i].state.is_active())
            .collect();
        if active.is_empty() {
            return;
        }
        for idx in active {
            self.render_row(idx);
        }
        if let Some(frame) = self.frame.as_mut() {
            let _ = frame.flush();
        }
    }

    fn render_row(&mut self, idx: usize) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let row = &self.rows[idx];
        let theme = &self.theme;

        let icon = match &row.state {
            RowState::Pending => theme.icons.pending,
            RowState::Downloading { .. } | RowState::Extracting => self.spinner.current_icon(),
            RowState::Done { .. } => theme.icons.success,
            RowState::Failed { .. } => theme.icons.error,
        };
        let (status, status_color) = match &row.state {
            RowState::Pending => ("pending".to_string(), theme.colors.secondary),
            RowState::Downloading { current, total } => (
                format_download_progress(*current, *total, theme.layout.bar_width),
                theme.colors.secondary,
            ),
            RowState::Extracting => ("extracting...".to_string(), theme.colors.secondary),
            RowState::Done { detail } => (detail.clone(), theme.colors.success),
            RowState::Failed { reason } => (format!("FAILED: {reason}"), theme.colors.error),
        };

        let label = format!(
            "{: <width$}",
            format!("  {icon} {}", row.label),
            width = theme.layout.label_width
        );
        let version = format!("{: <width$}", row.version, width = theme.layout.version_width);

        let _ = frame.write_row(idx as u16, |out| {
            write!(
                out,
                "{} {} {}",
                label.with(theme.colors.label),
                version.with(theme.colors.version),
                status.with(status_color)
            )
        });
    }

    /// Close the frame and print a message below it.
    pub fn print_footer(&mut self, message: &str, severity: Severity) {
        if let Some(mut frame) = self.frame.take() {
            let _ = frame.finish();
        }
        println!();
        let icons = &self.theme.icons;
        let colors = &self.theme.colors;
        let (icon, color) = match severity {
            Severity::Success => (icons.success, colors.success),
            Severity::Warning => (icons.warning, colors.warning),
            Severity::Error => (icons.error, colors.error),
        };
        println!("{} {}", icon.with(color), message.with(color));
    }
}

impl Drop for TableRenderer {
    fn drop(&mut self) {
        if let Some(mut frame) = self.frame.take() {
            let _ = frame.finish();
        }
    }
}
