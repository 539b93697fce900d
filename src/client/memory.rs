// In-memory reporting client
// Records every operation in issue order; backs `--dry-run` and the tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future;

use super::{
    Attachment, Completion, FinishMeta, ItemId, ItemMeta, LaunchMeta, LogEntry, PendingItem,
    ReportingClient,
};
use crate::error::ClientError;
use crate::state::Status;

/// A recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    StartLaunch {
        id: ItemId,
        meta: LaunchMeta,
    },
    FinishLaunch {
        id: ItemId,
        status: Status,
    },
    StartItem {
        id: ItemId,
        launch: ItemId,
        parent: Option<ItemId>,
        meta: ItemMeta,
    },
    FinishItem {
        id: ItemId,
        status: Status,
    },
    SendLog {
        id: ItemId,
        entry: LogEntry,
        attachment: Option<String>,
    },
    Drain {
        launch: ItemId,
    },
}

impl Operation {
    /// Item the operation targets (the launch for launch-level calls).
    pub fn item(&self) -> &ItemId {
        match self {
            Operation::StartLaunch { id, .. }
            | Operation::FinishLaunch { id, .. }
            | Operation::StartItem { id, .. }
            | Operation::FinishItem { id, .. }
            | Operation::SendLog { id, .. } => id,
            Operation::Drain { launch } => launch,
        }
    }
}

#[derive(Default)]
pub struct RecordingClient {
    operations: Mutex<Vec<Operation>>,
    next_id: AtomicU64,
    stalled: HashSet<String>,
    rejected: HashSet<String>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creations of items with this name never settle.
    pub fn with_stalled_item(mut self, name: impl Into<String>) -> Self {
        self.stalled.insert(name.into());
        self
    }

    /// Creations of items with this name settle with a rejection.
    pub fn with_rejected_item(mut self, name: impl Into<String>) -> Self {
        self.rejected.insert(name.into());
        self
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    /// Id of the first item started under this name.
    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.operations().into_iter().find_map(|op| match op {
            Operation::StartItem { id, meta, .. } if meta.name == name => Some(id),
            _ => None,
        })
    }

    fn record(&self, operation: Operation) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(operation);
        }
    }

    fn allocate(&self, prefix: &str) -> ItemId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        ItemId::new(format!("{}-{}", prefix, n))
    }

    fn settled() -> Completion {
        future::ready(Ok(())).boxed()
    }
}

impl ReportingClient for RecordingClient {
    fn start_launch(&self, meta: LaunchMeta) -> PendingItem {
        let id = self.allocate("launch");
        self.record(Operation::StartLaunch {
            id: id.clone(),
            meta,
        });
        PendingItem {
            id,
            done: Self::settled(),
        }
    }

    fn finish_launch(&self, id: &ItemId, finish: FinishMeta) -> Completion {
        self.record(Operation::FinishLaunch {
            id: id.clone(),
            status: finish.status,
        });
        Self::settled()
    }

    fn start_item(&self, meta: ItemMeta, launch: &ItemId, parent: Option<&ItemId>) -> PendingItem {
        let id = self.allocate("item");
        let done = if self.stalled.contains(&meta.name) {
            future::pending().boxed()
        } else if self.rejected.contains(&meta.name) {
            future::ready(Err(ClientError::Rejected(format!(
                "cannot create '{}'",
                meta.name
            ))))
            .boxed()
        } else {
            Self::settled()
        };
        self.record(Operation::StartItem {
            id: id.clone(),
            launch: launch.clone(),
            parent: parent.cloned(),
            meta,
        });
        PendingItem { id, done }
    }

    fn finish_item(&self, id: &ItemId, finish: FinishMeta) -> Completion {
        self.record(Operation::FinishItem {
            id: id.clone(),
            status: finish.status,
        });
        Self::settled()
    }

    fn send_log(
        &self,
        id: &ItemId,
        entry: LogEntry,
        attachment: Option<Attachment>,
    ) -> Completion {
        self.record(Operation::SendLog {
            id: id.clone(),
            entry,
            attachment: attachment.map(|a| a.name),
        });
        Self::settled()
    }

    fn drain(&self, launch: &ItemId) -> Completion {
        self.record(Operation::Drain {
            launch: launch.clone(),
        });
        Self::settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ItemKind, LogLevel};

    #[test]
    fn test_records_in_issue_order() {
        let client = RecordingClient::new();
        let launch = client.start_launch(LaunchMeta::default()).id;
        let suite = client
            .start_item(ItemMeta::new(ItemKind::Suite, "A", None), &launch, None)
            .id;
        let _ = client.send_log(&suite, LogEntry::new(LogLevel::Info, "hello"), None);
        let _ = client.finish_item(&suite, Status::Passed.into());

        let ops = client.operations();
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], Operation::StartLaunch { .. }));
        assert!(matches!(&ops[1], Operation::StartItem { parent: None, .. }));
        assert_eq!(ops[2].item(), &suite);
        assert!(matches!(
            ops[3],
            Operation::FinishItem {
                status: Status::Passed,
                ..
            }
        ));
        assert_eq!(client.item_id("A"), Some(suite));
    }

    #[test]
    fn test_ids_are_unique() {
        let client = RecordingClient::new();
        let launch = client.start_launch(LaunchMeta::default()).id;
        let a = client
            .start_item(ItemMeta::new(ItemKind::Step, "a", None), &launch, None)
            .id;
        let b = client
            .start_item(ItemMeta::new(ItemKind::Step, "b", None), &launch, None)
            .id;
        assert_ne!(a, b);
        assert_ne!(a, launch);
    }

    #[tokio::test]
    async fn test_rejected_item_settles_with_error() {
        let client = RecordingClient::new().with_rejected_item("bad");
        let launch = client.start_launch(LaunchMeta::default()).id;
        let pending = client.start_item(ItemMeta::new(ItemKind::Step, "bad", None), &launch, None);

        let result = pending.done.await;
        assert!(matches!(result, Err(ClientError::Rejected(_))));
    }
}
