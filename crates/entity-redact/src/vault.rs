//! Private quarantine store for matched secrets. Never served by any
//! HTTP route; the public surface only ever sees the redacted text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub pattern_name: String,
    pub redacted_value: String,
    pub full_value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("vault io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("vault serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only `secrets.jsonl` file, one JSON object per line. Writes
/// are serialized by an internal lock since multiple outbound calls
/// may be redacted concurrently.
pub struct SecretVault {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SecretVault {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        SecretVault {
            path: dir.as_ref().join("secrets.jsonl"),
            lock: Mutex::new(()),
        }
    }

    pub async fn record(&self, record: SecretRecord) -> Result<(), VaultError> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let line = serde_json::to_string(&record)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}
