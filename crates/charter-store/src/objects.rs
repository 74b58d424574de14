//! Blob storage for rendered artifacts.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use charter_core::ObjectRef;

use crate::{Collection, StoreError};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` and return a reference to them.
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<ObjectRef, StoreError>;

    async fn fetch(&self, object: &ObjectRef) -> Result<Vec<u8>, StoreError>;

    /// Remove an object. Removing an object that is already gone succeeds.
    async fn delete(&self, object: &ObjectRef) -> Result<(), StoreError>;
}

/// Objects as files under a root directory, referenced by relative path
/// (`documents/<uuid>.<ext>`).
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of an object. Rejects references that would escape the root.
    pub fn path_of(&self, object: &ObjectRef) -> Result<PathBuf, StoreError> {
        let rel = Path::new(object.as_str());
        let contained = !object.as_str().is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(StoreError::Constraint(format!(
                "object reference {object} is not a relative path under the store root"
            )));
        }
        Ok(self.root.join(rel))
    }
}

fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "text/plain" => "txt",
        "application/pdf" => "pdf",
        "application/json" => "json",
        _ => "bin",
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<ObjectRef, StoreError> {
        let object = ObjectRef::new(format!(
            "documents/{}.{}",
            Uuid::new_v4(),
            extension_for(content_type)
        ));
        let path = self.path_of(&object)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        info!(object = %object, bytes = bytes.len(), content_type, "stored object");
        Ok(object)
    }

    async fn fetch(&self, object: &ObjectRef) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(object)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(Collection::Objects, object))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, object: &ObjectRef) -> Result<(), StoreError> {
        let path = self.path_of(object)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(object = %object, "deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(object = %object, "object already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_fetch_delete() {
        let dir = tempfile::tempdir().unwrap();
        let objects = FsObjectStore::new(dir.path());

        let object = objects
            .store(b"page one".to_vec(), "text/plain; charset=utf-8")
            .await
            .unwrap();
        assert!(object.as_str().starts_with("documents/"));
        assert!(object.as_str().ends_with(".txt"));
        assert_eq!(objects.fetch(&object).await.unwrap(), b"page one");

        objects.delete(&object).await.unwrap();
        assert!(objects.fetch(&object).await.unwrap_err().is_not_found());
        // Second delete is a no-op.
        objects.delete(&object).await.unwrap();
    }

    #[test]
    fn escaping_references_are_rejected() {
        let objects = FsObjectStore::new("/srv/charter");
        for bad in ["../etc/passwd", "/etc/passwd", "documents/../../x", ""] {
            assert!(
                matches!(objects.path_of(&ObjectRef::new(bad)), Err(StoreError::Constraint(_))),
                "{bad} should be rejected"
            );
        }
        assert_eq!(
            objects.path_of(&ObjectRef::new("documents/a.txt")).unwrap(),
            PathBuf::from("/srv/charter/documents/a.txt")
        );
    }

    #[test]
    fn extensions_follow_content_type() {
        assert_eq!(extension_for("text/plain; charset=utf-8"), "txt");
        assert_eq!(extension_for("application/pdf"), "pdf");
        assert_eq!(extension_for("image/png"), "bin");
    }
}
