//! Voting: per-life rounds, submission with rate-limit/uniqueness
//! enforcement, and watcher-driven adjudication (spec §4.3).

pub mod watcher;

use crate::storage::Storage;
use chrono::{Duration, Utc};
use entity_types::{RoundId, Vote, VoteChoice, VoterFingerprint};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSubmitOutcome {
    Accepted,
    Cooldown { remaining_seconds: i64 },
    Duplicate,
    Dead,
}

const HOURLY_COOLDOWN: i64 = 3600;

/// Submits a vote to the currently open round for `life_number`.
///
/// Constraints are checked in the order spec §4.3 lists them: dead-state
/// lock first (life must be alive), then round-scoped duplication (a
/// second vote from the same fingerprint on the same round is always
/// `Duplicate`, never `Cooldown`), then the hourly rate limit across
/// all rounds.
pub async fn submit_vote(
    storage: &Arc<dyn Storage>,
    is_alive: bool,
    round_id: RoundId,
    fingerprint: VoterFingerprint,
    choice: VoteChoice,
) -> Result<VoteSubmitOutcome, crate::storage::StorageError> {
    if !is_alive {
        return Ok(VoteSubmitOutcome::Dead);
    }

    if storage.has_voted_in_round(round_id, fingerprint).await? {
        return Ok(VoteSubmitOutcome::Duplicate);
    }

    if let Some(last) = storage.last_accepted_vote_at(fingerprint).await? {
        let elapsed = Utc::now() - last;
        if elapsed < Duration::seconds(HOURLY_COOLDOWN) {
            let remaining = Duration::seconds(HOURLY_COOLDOWN) - elapsed;
            return Ok(VoteSubmitOutcome::Cooldown {
                remaining_seconds: remaining.num_seconds().max(0),
            });
        }
    }

    let vote = Vote {
        round_id,
        voter_fingerprint: fingerprint,
        choice,
        cast_at: Utc::now(),
    };

    let inserted = storage.record_vote(&vote).await?;
    if !inserted {
        return Ok(VoteSubmitOutcome::Duplicate);
    }

    let mut round = storage
        .get_round(round_id)
        .await?
        .ok_or_else(|| crate::storage::StorageError::NotFound("vote round".to_string()))?;
    round.record(choice);
    storage.persist_round(&round).await.ok();

    Ok(VoteSubmitOutcome::Accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use entity_types::{LifeNumber, VoteRound};

    async fn storage_with_round() -> (Arc<dyn Storage>, RoundId) {
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::connect(":memory:").await.unwrap());
        let round = VoteRound::open(LifeNumber(1), Duration::hours(1));
        storage.open_round(&round).await.unwrap();
        (storage, round.id)
    }

    #[tokio::test]
    async fn dead_life_rejects_vote_regardless_of_round_state() {
        let (storage, round_id) = storage_with_round().await;
        let outcome = submit_vote(
            &storage,
            false,
            round_id,
            VoterFingerprint([1u8; 32]),
            VoteChoice::Live,
        )
        .await
        .unwrap();
        assert_eq!(outcome, VoteSubmitOutcome::Dead);
    }

    #[tokio::test]
    async fn first_vote_is_accepted() {
        let (storage, round_id) = storage_with_round().await;
        let outcome = submit_vote(
            &storage,
            true,
            round_id,
            VoterFingerprint([2u8; 32]),
            VoteChoice::Live,
        )
        .await
        .unwrap();
        assert_eq!(outcome, VoteSubmitOutcome::Accepted);
    }

    #[tokio::test]
    async fn second_vote_same_round_is_duplicate_not_cooldown() {
        let (storage, round_id) = storage_with_round().await;
        let fp = VoterFingerprint([3u8; 32]);
        submit_vote(&storage, true, round_id, fp, VoteChoice::Live)
            .await
            .unwrap();
        let outcome = submit_vote(&storage, true, round_id, fp, VoteChoice::Die)
            .await
            .unwrap();
        assert_eq!(outcome, VoteSubmitOutcome::Duplicate);
    }

    #[tokio::test]
    async fn second_round_within_hour_is_cooldown() {
        let (storage, round_id) = storage_with_round().await;
        let fp = VoterFingerprint([4u8; 32]);
        submit_vote(&storage, true, round_id, fp, VoteChoice::Live)
            .await
            .unwrap();

        let round2 = VoteRound::open(LifeNumber(2), Duration::hours(1));
        storage.open_round(&round2).await.unwrap();
        let outcome = submit_vote(&storage, true, round2.id, fp, VoteChoice::Die)
            .await
            .unwrap();
        assert!(matches!(outcome, VoteSubmitOutcome::Cooldown { .. }));
    }
}
