//! UI Actor - single-threaded event processing
//!
//! Download tasks run concurrently but stdout is serial. Every producer holds
//! a cloned [`mpsc::Sender`]; one thread owns the [`TableRenderer`] and
//! applies events in arrival order, so rows never interleave and the table
//! needs no lock.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::style::Stylize;

use super::table::{RowSpec, RowState, Severity, TableRenderer};
use super::theme::Theme;

#[derive(Debug)]
pub enum UiEvent {
    /// Reserve one row per plan entry
    Prepare { rows: Vec<RowSpec> },
    /// Print a section header
    Header { title: String },
    /// Byte progress for every row fed by `archive`
    Downloading {
        archive: String,
        current: u64,
        total: Option<u64>,
    },
    Extracting { key: String },
    Done { key: String, detail: String },
    Failed { key: String, reason: String },
    Info(String),
    Warning(String),
    Error(String),
    Summary {
        count: usize,
        action: String,
        elapsed_secs: f64,
    },
    /// Reply once every earlier event has been rendered
    Sync(tokio::sync::oneshot::Sender<()>),
    Shutdown,
}

/// Handle to the UI actor thread
#[derive(Debug)]
pub struct UiActor {
    sender: mpsc::Sender<UiEvent>,
    handle: Option<thread::JoinHandle<()>>,
}

impl UiActor {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || run_event_loop(&receiver));
        Self {
            sender,
            handle: Some(handle),
        }
    }

    pub fn sender(&self) -> mpsc::Sender<UiEvent> {
        self.sender.clone()
    }
}

impl Drop for UiActor {
    fn drop(&mut self) {
        let _ = self.sender.send(UiEvent::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_event_loop(receiver: &mpsc::Receiver<UiEvent>) {
    let theme = Theme::default();
    let mut table = TableRenderer::new(theme.clone());

    loop {
        // 100ms timeout drives the spinner
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(UiEvent::Prepare { rows }) => table.prepare(&rows),
            Ok(UiEvent::Header { title }) => {
                tracing::debug!(section = %title, "phase");
            }
            Ok(UiEvent::Downloading {
                archive,
                current,
                total,
            }) => {
                table.update_archive(&archive, &RowState::Downloading { current, total });
                table.render_all();
            }
            Ok(UiEvent::Extracting { key }) => {
                table.update(&key, RowState::Extracting);
                table.render_all();
            }
            Ok(UiEvent::Done { key, detail }) => {
                table.update(&key, RowState::Done { detail });
                table.render_all();
            }
            Ok(UiEvent::Failed { key, reason }) => {
                table.update(&key, RowState::Failed { reason });
                table.render_all();
            }
            Ok(UiEvent::Info(msg)) => {
                println!("  {} {}", theme.icons.info, msg.dark_grey());
            }
            Ok(UiEvent::Warning(msg)) => table.print_footer(&msg, Severity::Warning),
            Ok(UiEvent::Error(msg)) => table.print_footer(&msg, Severity::Error),
            Ok(UiEvent::Summary {
                count,
                action,
                elapsed_secs,
            }) => {
                let msg = format!("{} {count}, elapsed {elapsed_secs:.1}s", action.to_uppercase());
                table.print_footer(&msg, Severity::Success);
            }
            Ok(UiEvent::Sync(tx)) => {
                let _ = tx.send(());
            }
            Ok(UiEvent::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => table.render_active(),
        }
    }
}
