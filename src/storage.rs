//! Persistence for the single bonded-device association.
//!
//! At most one bond exists at a time: writing overwrites, forgetting
//! deletes. The record lives in one small JSON file next to the config.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::StorageError;
use crate::utils::ensure_directory_exists;

const BOND_FILE_NAME: &str = "bonded_device.json";

/// The persisted association between the app and the last connected umbrella
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondRecord {
    pub device_id: String,
    pub bonded_at: DateTime<Utc>,
}

#[async_trait]
pub trait BondStore: Send + Sync {
    /// The bonded device id, if one is persisted.
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Persist `device_id` as the bonded device, replacing any previous one.
    async fn store(&self, device_id: &str) -> Result<(), StorageError>;

    /// Delete the bond. Idempotent.
    async fn forget(&self) -> Result<(), StorageError>;
}

/// File-backed bond store
pub struct FileBondStore {
    path: PathBuf,
}

impl FileBondStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(BOND_FILE_NAME),
        }
    }
}

#[async_trait]
impl BondStore for FileBondStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: BondRecord = serde_json::from_slice(&raw)?;
        Ok(Some(record.device_id))
    }

    async fn store(&self, device_id: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            let _ = ensure_directory_exists(dir).await;
        }
        let record = BondRecord {
            device_id: device_id.to_string(),
            bonded_at: Utc::now(),
        };
        let raw = serde_json::to_vec_pretty(&record)?;
        fs::write(&self.path, raw).await?;
        info!("Bonded device id persisted: {}", device_id);
        Ok(())
    }

    async fn forget(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Bonded device forgotten");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileBondStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBondStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn load_before_any_store_is_absent() {
        let (_dir, store) = store();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_then_load_roundtrips_the_id() {
        let (_dir, store) = store();
        store.store("AA:BB").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("AA:BB".to_string()));
    }

    #[tokio::test]
    async fn store_overwrites_the_previous_bond() {
        let (_dir, store) = store();
        store.store("AA:BB").await.unwrap();
        store.store("CC:DD").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("CC:DD".to_string()));
    }

    #[tokio::test]
    async fn forget_deletes_and_is_idempotent() {
        let (_dir, store) = store();
        store.store("AA:BB").await.unwrap();
        store.forget().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.forget().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_record_is_an_error_not_a_panic() {
        let (dir, store) = store();
        fs::write(dir.path().join(BOND_FILE_NAME), b"not json")
            .await
            .unwrap();
        assert!(matches!(
            store.load().await,
            Err(StorageError::Malformed(_))
        ));
    }
}
