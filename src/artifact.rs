// Failure artifacts (screenshots) attached to failed items

use std::path::PathBuf;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tracing::debug;

use crate::client::Attachment;

/// Eventually yields a named binary blob for a failed test, or nothing.
pub trait ArtifactCapture: Send + Sync {
    fn capture(&self, label: &str) -> BoxFuture<'static, Option<Attachment>>;
}

/// Capture disabled
pub struct NoArtifacts;

impl ArtifactCapture for NoArtifacts {
    fn capture(&self, _label: &str) -> BoxFuture<'static, Option<Attachment>> {
        future::ready(None).boxed()
    }
}

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
];

/// Picks up screenshots the test run already wrote to a directory, named
/// after the test's full title (`<dir>/<full title>.png`).
pub struct DirectoryArtifacts {
    dir: PathBuf,
}

impl DirectoryArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactCapture for DirectoryArtifacts {
    fn capture(&self, label: &str) -> BoxFuture<'static, Option<Attachment>> {
        let dir = self.dir.clone();
        let stem = label.replace('/', "");
        async move {
            for (ext, mime) in IMAGE_TYPES {
                let name = format!("{}.{}", stem, ext);
                match tokio::fs::read(dir.join(&name)).await {
                    Ok(content) => return Some(Attachment::new(&name, *mime, content)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        debug!("Cannot read artifact {}: {}", name, e);
                        return None;
                    }
                }
            }
            None
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_artifacts() {
        assert!(NoArtifacts.capture("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_directory_artifact_found() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("Suite does things.jpg"), b"jpeg").unwrap();

        let capture = DirectoryArtifacts::new(temp_dir.path());
        let attachment = capture
            .capture("Suite/ does things")
            .await
            .expect("artifact should be found");

        assert_eq!(attachment.name, "Suite does things.jpg");
        assert_eq!(attachment.mime, "image/jpeg");
        assert_eq!(attachment.content, b"jpeg");
    }

    #[tokio::test]
    async fn test_directory_artifact_missing() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let capture = DirectoryArtifacts::new(temp_dir.path());
        assert!(capture.capture("nothing here").await.is_none());
    }
}
