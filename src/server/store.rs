//! Write-once store for raw uploads
//!
//! Records are never read back by the relay.

use crate::{
    config::StoreLocation,
    error::{RelayError, Result},
    types::StoredImageRecord,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist a record and return its id
    async fn save(&self, record: StoredImageRecord) -> Result<String>;
}

/// On-disk shape of one record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImageDocument {
    /// Base64 of the raw upload
    pub data: String,
    /// RFC 3339
    pub created_at: String,
}

impl From<&StoredImageRecord> for StoredImageDocument {
    fn from(record: &StoredImageRecord) -> Self {
        Self {
            data: STANDARD.encode(&record.data),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// One JSON document per record in a directory
#[derive(Debug, Clone)]
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, record: StoredImageRecord) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RelayError::storage(format!("Failed to create {}: {}", self.dir.display(), e)))?;

        let id = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{}.json", id));
        let document = serde_json::to_vec(&StoredImageDocument::from(&record))
            .map_err(|e| RelayError::storage(format!("Failed to serialize record: {}", e)))?;

        tokio::fs::write(&path, document)
            .await
            .map_err(|e| RelayError::storage(format!("Failed to write {}: {}", path.display(), e)))?;

        tracing::debug!("Stored {} bytes as {}", record.data.len(), path.display());
        Ok(id)
    }
}

/// Open the store for a configured location
#[must_use]
pub fn open_store(location: &StoreLocation) -> Arc<dyn ImageStore> {
    match location {
        StoreLocation::Directory(dir) => Arc::new(FsImageStore::new(dir.clone())),
    }
}
