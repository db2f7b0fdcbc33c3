//! Ephemeral identity: the agent's view of who it currently is,
//! persisted under the workspace directory and read back on process
//! restart. Wiped whenever the agent learns (via `/birth` or a
//! `/force-sync` reporting death) that its current life has ended —
//! the observer has no filesystem access to this directory, so the
//! agent clears its own workspace on that signal rather than the
//! observer reaching in (spec §6, §9).

use chrono::{DateTime, Utc};
use entity_types::{BootstrapMode, IdentityTriple, LifeNumber, MemoryFragment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub life_number: LifeNumber,
    pub is_alive: bool,
    pub born_at: DateTime<Utc>,
    pub bootstrap_mode: BootstrapMode,
    pub identity: IdentityTriple,
    pub model_id: String,
    pub memory_fragments: Vec<MemoryFragment>,
}

pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(workspace_dir: impl AsRef<Path>) -> Self {
        IdentityStore {
            path: workspace_dir.as_ref().join("identity.json"),
        }
    }

    pub async fn load(&self) -> Option<AgentIdentity> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub async fn save(&self, identity: &AgentIdentity) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(identity)?;
        tokio::fs::write(&self.path, bytes).await
    }

    pub async fn clear(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> AgentIdentity {
        AgentIdentity {
            life_number: LifeNumber(1),
            is_alive: true,
            born_at: Utc::now(),
            bootstrap_mode: BootstrapMode::BlankSlate,
            identity: IdentityTriple {
                name: "Unnamed".into(),
                icon: "spark".into(),
                pronoun: "they".into(),
            },
            model_id: "primary".into(),
            memory_fragments: vec![],
        }
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());
        assert!(store.load().await.is_none());

        store.save(&sample_identity()).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.life_number, LifeNumber(1));
    }

    #[tokio::test]
    async fn clear_removes_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());
        store.save(&sample_identity()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn clear_on_absent_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());
        store.clear().await.unwrap();
    }
}
