// Client module - contract of the remote reporting service
//
// The reporter only consumes this trait. Transport, authentication, retries
// and batching belong to the implementation behind it.

pub mod memory;
pub mod outbox;

pub use memory::{Operation, RecordingClient};
pub use outbox::OutboxClient;

use crate::error::ClientError;
use crate::state::Status;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Eventual completion of a reporting operation.
pub type Completion = BoxFuture<'static, Result<(), ClientError>>;

/// Opaque identifier handed out by the client when an item is started.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed setup/teardown routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeClass,
    AfterClass,
    BeforeMethod,
    AfterMethod,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeClass => "BEFORE_CLASS",
            HookKind::AfterClass => "AFTER_CLASS",
            HookKind::BeforeMethod => "BEFORE_METHOD",
            HookKind::AfterMethod => "AFTER_METHOD",
        }
    }
}

/// Kind of node in the report hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Launch,
    Suite,
    Step,
    /// A hook whose title carried no recognised prefix has no type.
    Hook(Option<HookKind>),
}

impl ItemKind {
    /// Item type as the reporting service names it. Untyped hooks have none.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            ItemKind::Launch => Some("LAUNCH"),
            ItemKind::Suite => Some("SUITE"),
            ItemKind::Step => Some("STEP"),
            ItemKind::Hook(kind) => kind.map(|k| k.as_str()),
        }
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, ItemKind::Hook(_))
    }
}

/// Severity of a log entry attached to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchMeta {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMeta {
    pub kind: ItemKind,
    pub name: String,
    pub description: Option<String>,
}

impl ItemMeta {
    pub fn new(kind: ItemKind, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishMeta {
    pub status: Status,
}

impl From<Status> for FinishMeta {
    fn from(status: Status) -> Self {
        Self { status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

/// Named binary blob attached to a log entry (e.g. a failure screenshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub content: Vec<u8>,
}

impl Attachment {
    /// Path separators are stripped from the name; the service treats it as
    /// a flat file name.
    pub fn new(name: &str, mime: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.replace('/', ""),
            mime: mime.into(),
            content,
        }
    }
}

/// Result of starting a launch or item: the id is usable immediately, `done`
/// settles once the service has acknowledged the creation.
pub struct PendingItem {
    pub id: ItemId,
    pub done: Completion,
}

/// Remote hierarchical reporting service
pub trait ReportingClient: Send + Sync {
    fn start_launch(&self, meta: LaunchMeta) -> PendingItem;

    fn finish_launch(&self, id: &ItemId, finish: FinishMeta) -> Completion;

    fn start_item(&self, meta: ItemMeta, launch: &ItemId, parent: Option<&ItemId>) -> PendingItem;

    fn finish_item(&self, id: &ItemId, finish: FinishMeta) -> Completion;

    fn send_log(&self, id: &ItemId, entry: LogEntry, attachment: Option<Attachment>)
    -> Completion;

    /// Settles once every outstanding operation for the launch has settled.
    fn drain(&self, launch: &ItemId) -> Completion;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_type_names() {
        assert_eq!(ItemKind::Suite.type_name(), Some("SUITE"));
        assert_eq!(ItemKind::Step.type_name(), Some("STEP"));
        assert_eq!(
            ItemKind::Hook(Some(HookKind::BeforeMethod)).type_name(),
            Some("BEFORE_METHOD")
        );
        assert_eq!(ItemKind::Hook(None).type_name(), None);
        assert!(ItemKind::Hook(None).is_hook());
        assert!(!ItemKind::Step.is_hook());
    }

    #[test]
    fn test_attachment_name_drops_slashes() {
        let attachment = Attachment::new("suite/test: does/things.png", "image/png", vec![1]);
        assert_eq!(attachment.name, "suitetest: doesthings.png");
    }
}
