// Outbox client - one JSON line per reporting operation
//
// Writes the operation stream to a file or stdout so a separate uploader can
// replay it against the reporting service.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::FutureExt;
use futures::future;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use super::{
    Attachment, Completion, FinishMeta, ItemId, ItemMeta, LaunchMeta, LogEntry, PendingItem,
    ReportingClient,
};
use crate::error::ClientError;

pub struct OutboxClient {
    sink: Mutex<Box<dyn Write + Send>>,
    attachments_dir: Option<PathBuf>,
}

impl OutboxClient {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
            attachments_dir: None,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn create(path: &Path) -> io::Result<Self> {
        let file = fs::File::create(path)?;
        Ok(Self::new(Box::new(io::BufWriter::new(file))))
    }

    /// Store attachment bodies as files in `dir`, referenced by path from the
    /// log record. Without it only the attachment name and size are written.
    pub fn with_attachments_dir(mut self, dir: PathBuf) -> Self {
        self.attachments_dir = Some(dir);
        self
    }

    /// Leading record describing where the operations are destined.
    pub fn write_session(&self, endpoint: &str, project: &str) -> Result<(), ClientError> {
        self.emit(&json!({
            "op": "session",
            "endpoint": endpoint,
            "project": project,
            "time": chrono::Utc::now().to_rfc3339()
        }))
    }

    fn emit(&self, record: &Value) -> Result<(), ClientError> {
        let line = serde_json::to_string(record)?;
        let mut sink = self.sink.lock().map_err(|_| ClientError::Closed)?;
        writeln!(sink, "{}", line)?;
        Ok(())
    }

    fn completion(result: Result<(), ClientError>) -> Completion {
        future::ready(result).boxed()
    }

    fn store_attachment(&self, attachment: &Attachment) -> Result<Value, ClientError> {
        let mut file = json!({
            "name": attachment.name,
            "mime": attachment.mime,
            "size": attachment.content.len()
        });
        if let Some(dir) = &self.attachments_dir {
            fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}-{}", Uuid::new_v4(), attachment.name));
            fs::write(&path, &attachment.content)?;
            debug!("Stored attachment {} at {}", attachment.name, path.display());
            file["path"] = json!(path.to_string_lossy());
        }
        Ok(file)
    }
}

fn new_id() -> ItemId {
    ItemId::new(Uuid::new_v4().to_string())
}

impl ReportingClient for OutboxClient {
    fn start_launch(&self, meta: LaunchMeta) -> PendingItem {
        let id = new_id();
        let result = self.emit(&json!({
            "op": "start-launch",
            "id": id,
            "name": meta.name,
            "description": meta.description,
            "tags": meta.tags,
            "startTime": chrono::Utc::now().to_rfc3339()
        }));
        PendingItem {
            id,
            done: Self::completion(result),
        }
    }

    fn finish_launch(&self, id: &ItemId, finish: FinishMeta) -> Completion {
        Self::completion(self.emit(&json!({
            "op": "finish-launch",
            "id": id,
            "status": finish.status,
            "endTime": chrono::Utc::now().to_rfc3339()
        })))
    }

    fn start_item(&self, meta: ItemMeta, launch: &ItemId, parent: Option<&ItemId>) -> PendingItem {
        let id = new_id();
        let result = self.emit(&json!({
            "op": "start-item",
            "id": id,
            "launchId": launch,
            "parentId": parent,
            "type": meta.kind.type_name(),
            "name": meta.name,
            "description": meta.description,
            "startTime": chrono::Utc::now().to_rfc3339()
        }));
        PendingItem {
            id,
            done: Self::completion(result),
        }
    }

    fn finish_item(&self, id: &ItemId, finish: FinishMeta) -> Completion {
        Self::completion(self.emit(&json!({
            "op": "finish-item",
            "id": id,
            "status": finish.status,
            "endTime": chrono::Utc::now().to_rfc3339()
        })))
    }

    fn send_log(
        &self,
        id: &ItemId,
        entry: LogEntry,
        attachment: Option<Attachment>,
    ) -> Completion {
        let file = match attachment.as_ref().map(|a| self.store_attachment(a)) {
            Some(Ok(file)) => Some(file),
            Some(Err(e)) => return Self::completion(Err(e)),
            None => None,
        };
        Self::completion(self.emit(&json!({
            "op": "log",
            "itemId": id,
            "level": entry.level,
            "message": entry.message,
            "file": file,
            "time": chrono::Utc::now().to_rfc3339()
        })))
    }

    fn drain(&self, launch: &ItemId) -> Completion {
        let result = self
            .emit(&json!({ "op": "drain", "launchId": launch }))
            .and_then(|_| {
                let mut sink = self.sink.lock().map_err(|_| ClientError::Closed)?;
                sink.flush()?;
                Ok(())
            });
        Self::completion(result)
    }
}
