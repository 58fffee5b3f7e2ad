//! `Reporter` implementation that forwards progress to the UI actor.

use std::sync::mpsc;

use boardpack_core::{PlanEntry, Reporter};

use super::actor::{UiActor, UiEvent};
use super::table::RowSpec;

/// A cloneable handle for sending UI events to the terminal actor.
#[derive(Clone, Debug)]
pub struct Output {
    sender: mpsc::Sender<UiEvent>,
}

impl Output {
    /// Spawn the actor. The returned guard stops it when dropped.
    pub fn spawn() -> (Self, UiActor) {
        let actor = UiActor::spawn();
        (
            Self {
                sender: actor.sender(),
            },
            actor,
        )
    }

    fn send(&self, event: UiEvent) {
        let _ = self.sender.send(event);
    }

    pub fn error(&self, msg: &str) {
        self.send(UiEvent::Error(msg.to_string()));
    }

    /// Wait until the actor has drawn everything sent so far.
    pub async fn sync(&self) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(UiEvent::Sync(tx));
        let _ = rx.await;
    }
}

impl Reporter for Output {
    fn prepare_plan(&self, entries: &[PlanEntry]) {
        let rows = entries
            .iter()
            .map(|e| RowSpec {
                key: row_key(e),
                label: format!("{}/{}/{}", e.package, e.role, e.name),
                version: e.version.to_string(),
                archive: e.file_name.clone(),
            })
            .collect();
        self.send(UiEvent::Prepare { rows });
    }

    fn section(&self, title: &str) {
        self.send(UiEvent::Header {
            title: title.to_string(),
        });
    }

    fn downloading(&self, entry: &PlanEntry, current: u64, total: Option<u64>) {
        self.send(UiEvent::Downloading {
            archive: entry.file_name.clone(),
            current,
            total,
        });
    }

    fn extracting(&self, entry: &PlanEntry) {
        self.send(UiEvent::Extracting {
            key: row_key(entry),
        });
    }

    fn done(&self, entry: &PlanEntry, detail: &str) {
        self.send(UiEvent::Done {
            key: row_key(entry),
            detail: detail.to_string(),
        });
    }

    fn failed(&self, entry: &PlanEntry, reason: &str) {
        self.send(UiEvent::Failed {
            key: row_key(entry),
            reason: reason.to_string(),
        });
    }

    fn info(&self, msg: &str) {
        self.send(UiEvent::Info(msg.to_string()));
    }

    fn warning(&self, msg: &str) {
        self.send(UiEvent::Warning(msg.to_string()));
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        self.send(UiEvent::Summary {
            count,
            action: action.to_string(),
            elapsed_secs,
        });
    }
}

/// Rows are keyed by destination, the one field unique within a plan.
fn row_key(entry: &PlanEntry) -> String {
    entry.path.display().to_string()
}
