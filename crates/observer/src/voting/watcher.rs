//! Background loop that closes vote rounds once their window elapses
//! and adjudicates the outcome (spec §4.3). Ticks far more frequently
//! than the voting window itself so a round never lingers long past
//! its `closes_at`.

use crate::lifecycle::LifecycleManager;
use crate::storage::Storage;
use chrono::{Duration, Utc};
use entity_types::{DeathCause, VoteOutcome, VoteRound};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{error, info};

pub async fn run(
    storage: Arc<dyn Storage>,
    lifecycle: Arc<LifecycleManager>,
    tick_interval_s: u64,
    voting_window_s: i64,
) {
    let mut interval = tokio::time::interval(StdDuration::from_secs(tick_interval_s));
    loop {
        interval.tick().await;
        if let Err(e) = tick(&storage, &lifecycle, voting_window_s).await {
            error!(error = %e, "vote watcher tick failed");
        }
    }
}

async fn tick(
    storage: &Arc<dyn Storage>,
    lifecycle: &Arc<LifecycleManager>,
    voting_window_s: i64,
) -> Result<(), crate::storage::StorageError> {
    let due = storage.list_due_open_rounds(Utc::now()).await?;
    for mut round in due {
        let life_number = round.life_number;
        let outcome = round.adjudicate();
        round.close_with(outcome);
        storage.persist_round(&round).await?;

        match outcome {
            VoteOutcome::Died => {
                info!(life_number = %life_number, "vote round closed: death by majority");
                lifecycle
                    .transition_to_dying(DeathCause::VoteMajority)
                    .await;
            }
            VoteOutcome::Survived => {
                info!(life_number = %life_number, "vote round closed: survived");
                let next_round = VoteRound::open(life_number, Duration::seconds(voting_window_s));
                storage.open_round(&next_round).await?;
            }
        }
    }
    Ok(())
}
