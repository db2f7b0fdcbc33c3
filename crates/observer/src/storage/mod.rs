//! Storage trait definitions, grounded on the fleet daemon's
//! `storage::traits` split-by-entity design, but scoped to what the
//! observer owns: Life, LifeState, VoteRound, Vote, MemoryFragment,
//! ActivityEvent, OracleMessage.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use entity_types::{
    ActivityEvent, Life, LifeNumber, LifeState, MemoryFragment, OracleMessage, RoundId, Vote,
    VoteRound, VoterFingerprint,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: LifeStorage + VoteStorage + MemoryStorage + ActivityStorage + OracleStorage + Send + Sync {}

/// Storage for Life rows and the singleton LifeState.
#[async_trait]
pub trait LifeStorage: Send + Sync {
    async fn get_life_state(&self) -> StorageResult<LifeState>;
    async fn put_life_state(&self, state: &LifeState) -> StorageResult<()>;

    async fn insert_life(&self, life: &Life) -> StorageResult<()>;
    async fn get_life(&self, life_number: LifeNumber) -> StorageResult<Option<Life>>;
    async fn close_life(
        &self,
        life_number: LifeNumber,
        died_at: chrono::DateTime<chrono::Utc>,
        death_cause: entity_types::DeathCause,
    ) -> StorageResult<()>;
    async fn max_life_number(&self) -> StorageResult<LifeNumber>;
}

/// Storage for VoteRound/Vote.
#[async_trait]
pub trait VoteStorage: Send + Sync {
    async fn open_round(&self, round: &VoteRound) -> StorageResult<()>;
    async fn get_open_round(&self, life_number: LifeNumber) -> StorageResult<Option<VoteRound>>;
    async fn get_round(&self, round_id: RoundId) -> StorageResult<Option<VoteRound>>;
    async fn list_due_open_rounds(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<Vec<VoteRound>>;
    async fn persist_round(&self, round: &VoteRound) -> StorageResult<()>;

    async fn record_vote(&self, vote: &Vote) -> StorageResult<bool>;
    async fn has_voted_in_round(
        &self,
        round_id: RoundId,
        fingerprint: VoterFingerprint,
    ) -> StorageResult<bool>;
    async fn last_accepted_vote_at(
        &self,
        fingerprint: VoterFingerprint,
    ) -> StorageResult<Option<chrono::DateTime<chrono::Utc>>>;
}

/// Storage for MemoryFragment.
#[async_trait]
pub trait MemoryStorage: Send + Sync {
    async fn store_fragments(
        &self,
        life_number: LifeNumber,
        fragments: &[MemoryFragment],
    ) -> StorageResult<()>;
    async fn fragments_for_life(
        &self,
        life_number: LifeNumber,
    ) -> StorageResult<Vec<MemoryFragment>>;
    async fn all_fragments(&self) -> StorageResult<Vec<MemoryFragment>>;
}

/// Storage for ActivityEvent.
#[async_trait]
pub trait ActivityStorage: Send + Sync {
    async fn append_activity(&self, event: ActivityEvent) -> StorageResult<ActivityEvent>;
    async fn recent_activity(&self, limit: usize) -> StorageResult<Vec<ActivityEvent>>;
}

/// Storage for OracleMessage directives pending delivery to the agent.
#[async_trait]
pub trait OracleStorage: Send + Sync {
    async fn enqueue_oracle(&self, message: OracleMessage) -> StorageResult<()>;
    async fn pending_oracle(&self) -> StorageResult<Option<OracleMessage>>;
    async fn acknowledge_oracle(&self) -> StorageResult<()>;
}
