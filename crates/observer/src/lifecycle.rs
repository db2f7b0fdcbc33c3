//! Lifecycle module: drives the life-state machine and gates every
//! transition behind a single lock. External callers only ever call
//! methods on this manager — never match on or mutate `LifeState`
//! fields directly — mirroring the fleet platform's
//! `AgentAccountabilityService` pattern of wrapping all mutation behind
//! service methods.

use crate::gateway::{AgentClient, BirthRequest};
use crate::storage::Storage;
use chrono::Utc;
use entity_types::{
    ActivityEvent, ActivityKind, BootstrapMode, DeathCause, Life, LifeNumber, LifeState,
    MemoryFragment, VoteRound,
};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

pub struct LifecycleConfig {
    pub respawn_delay_min_s: u64,
    pub respawn_delay_max_s: u64,
    pub voting_window_s: i64,
    pub model_id: String,
}

struct Inner {
    state: LifeState,
    pending_respawn: bool,
}

pub struct LifecycleManager {
    inner: Mutex<Inner>,
    storage: Arc<dyn Storage>,
    agent: Arc<AgentClient>,
    activity_tx: broadcast::Sender<ActivityEvent>,
    config: LifecycleConfig,
}

impl LifecycleManager {
    pub async fn new(
        storage: Arc<dyn Storage>,
        agent: Arc<AgentClient>,
        activity_tx: broadcast::Sender<ActivityEvent>,
        config: LifecycleConfig,
    ) -> anyhow::Result<Arc<Self>> {
        let state = storage.get_life_state().await?;
        Ok(Arc::new(LifecycleManager {
            inner: Mutex::new(Inner {
                state,
                pending_respawn: false,
            }),
            storage,
            agent,
            activity_tx,
            config,
        }))
    }

    pub async fn current_state(&self) -> LifeState {
        self.inner.lock().await.state.clone()
    }

    async fn emit(&self, life_number: LifeNumber, kind: ActivityKind, payload: serde_json::Value) {
        let event = ActivityEvent {
            id: 0,
            life_number,
            ts: Utc::now(),
            kind,
            payload,
        };
        match self.storage.append_activity(event).await {
            Ok(stored) => {
                let _ = self.activity_tx.send(stored);
            }
            Err(e) => error!(error = %e, "failed to persist activity event"),
        }
    }

    /// Idempotent against duplicate fires: only one respawn may be
    /// pending at a time.
    pub fn schedule_respawn(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            {
                let mut guard = manager.inner.lock().await;
                if guard.pending_respawn {
                    return;
                }
                guard.pending_respawn = true;
            }

            let delay_s = {
                let mut rng = rand::thread_rng();
                rng.gen_range(manager.config.respawn_delay_min_s..=manager.config.respawn_delay_max_s)
            };
            tokio::time::sleep(std::time::Duration::from_secs(delay_s)).await;

            manager.do_birth().await;

            let mut guard = manager.inner.lock().await;
            guard.pending_respawn = false;
        });
    }

    /// `dead -> birthing -> alive` (or back to `dead` on repeated
    /// failure). Allocates the next life number, rotates the bootstrap
    /// mode, samples memory fragments, and calls the agent's `/birth`.
    pub async fn do_birth(self: &Arc<Self>) {
        let prior_death_cause = {
            let guard = self.inner.lock().await;
            if guard.state.is_alive {
                // Nothing to birth: treat a duplicate fire as a no-op.
                return;
            }
            None::<DeathCause>
        };

        let next_number = match self.storage.max_life_number().await {
            Ok(n) => n.next(),
            Err(e) => {
                error!(error = %e, "failed to allocate life number");
                return;
            }
        };

        let prior_death_cause = if next_number.0 > 1 {
            match self.storage.get_life(LifeNumber(next_number.0 - 1)).await {
                Ok(Some(prior)) => prior.death_cause,
                _ => prior_death_cause,
            }
        } else {
            prior_death_cause
        };

        let previous_mode = {
            let guard = self.inner.lock().await;
            guard.state.bootstrap_mode
        };
        let bootstrap_mode = BootstrapMode::choose_next(previous_mode, prior_death_cause);

        let fragments = self.sample_memory_fragments().await;

        let birth_payload = BirthRequest {
            life_number: next_number,
            bootstrap_mode,
            memory_fragments: fragments.clone(),
            prior_death_cause,
        };

        let mut accepted = false;
        for attempt in 1..=3u32 {
            match self.agent.post_birth(&birth_payload).await {
                Ok(()) => {
                    accepted = true;
                    break;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "birth call to agent failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(500 * attempt as u64)).await;
                }
            }
        }

        if !accepted {
            error!(life_number = %next_number, "agent did not accept birth after retries");
            self.emit(
                next_number,
                ActivityKind::Error,
                serde_json::json!({"stage": "birth", "note": "agent unreachable after retries"}),
            )
            .await;
            self.schedule_respawn();
            return;
        }

        let now = Utc::now();
        let life = Life {
            life_number: next_number,
            born_at: now,
            died_at: None,
            death_cause: None,
            bootstrap_mode,
            model_id: self.config.model_id.clone(),
            identity: entity_types::IdentityTriple {
                name: String::new(),
                icon: String::new(),
                pronoun: String::new(),
            },
        };

        if let Err(e) = self.storage.insert_life(&life).await {
            error!(error = %e, "failed to persist new life row");
            return;
        }
        if let Err(e) = self.storage.store_fragments(next_number, &fragments).await {
            warn!(error = %e, "failed to persist memory fragments for new life");
        }

        let round = VoteRound::open(next_number, chrono::Duration::seconds(self.config.voting_window_s));
        if let Err(e) = self.storage.open_round(&round).await {
            warn!(error = %e, "failed to open vote round for new life");
        }

        {
            let mut guard = self.inner.lock().await;
            guard.state = LifeState {
                life_number: next_number,
                is_alive: true,
                born_at: Some(now),
                last_seen: now,
                bootstrap_mode,
            };
            if let Err(e) = self.storage.put_life_state(&guard.state).await {
                error!(error = %e, "failed to persist life state after birth");
            }
        }

        self.emit(
            next_number,
            ActivityKind::Birth,
            serde_json::json!({"bootstrap_mode": bootstrap_mode}),
        )
        .await;
        info!(life_number = %next_number, "life born");
    }

    async fn sample_memory_fragments(&self) -> Vec<MemoryFragment> {
        let all = match self.storage.all_fragments().await {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };
        if all.is_empty() {
            return Vec::new();
        }
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(1..=10.min(all.len().max(1)));
        let mut indices: Vec<usize> = (0..all.len()).collect();
        // Fisher-Yates partial shuffle to pick `count` distinct fragments.
        for i in 0..count.min(indices.len()) {
            let j = rng.gen_range(i..indices.len());
            indices.swap(i, j);
        }
        indices
            .into_iter()
            .take(count)
            .map(|i| all[i].clone())
            .collect()
    }

    /// `alive -> dying -> dead`. Enforced as a check-and-set under the
    /// lock so a Life transitions at most once (spec §5). Any
    /// still-open vote round for this life is force-closed as survived
    /// (this life's death was not that round's adjudication) unless the
    /// caller already closed it (e.g. the voting watcher, on a
    /// `vote_majority` death).
    pub async fn transition_to_dying(self: &Arc<Self>, cause: DeathCause) {
        let (life_number, already_dead) = {
            let guard = self.inner.lock().await;
            (guard.state.life_number, !guard.state.is_alive)
        };
        if already_dead {
            return;
        }

        {
            let mut guard = self.inner.lock().await;
            if !guard.state.is_alive {
                return;
            }
            guard.state.is_alive = false;
            if let Err(e) = self.storage.put_life_state(&guard.state).await {
                error!(error = %e, "failed to persist dying state");
            }
        }

        if let Ok(Some(mut round)) = self.storage.get_open_round(life_number).await {
            round.close_with(entity_types::VoteOutcome::Survived);
            let _ = self.storage.persist_round(&round).await;
        }

        let now = Utc::now();
        if let Err(e) = self.storage.close_life(life_number, now, cause).await {
            error!(error = %e, "failed to close life row");
        }

        self.emit(
            life_number,
            ActivityKind::Death,
            serde_json::json!({"cause": cause}),
        )
        .await;
        info!(life_number = %life_number, cause = ?cause, "life died");

        self.schedule_respawn();
    }

    /// Admin `/api/force-alive`: corrects a stuck `dead` state without
    /// waiting for the respawn timer.
    pub async fn force_birth_now(self: &Arc<Self>) {
        self.do_birth().await;
    }

    /// Re-syncs an agent that reports `life_number = 0`/missing while
    /// this life is still alive (it lost its local identity file, not
    /// a genuine death). Re-delivers the *existing* current `Life` via
    /// `/birth` — same life number, same bootstrap mode, no new vote
    /// round. If the observer's own life is actually dead, this is not
    /// the right operation; the caller should use `force_birth_now`
    /// instead.
    pub async fn redeliver_current_life(self: &Arc<Self>) {
        let (life_number, is_alive) = {
            let guard = self.inner.lock().await;
            (guard.state.life_number, guard.state.is_alive)
        };

        if !is_alive {
            warn!(life_number = %life_number, "redeliver_current_life called while not alive, ignoring");
            return;
        }

        let life = match self.storage.get_life(life_number).await {
            Ok(Some(life)) => life,
            Ok(None) => {
                error!(life_number = %life_number, "redeliver_current_life: no life row for current life number");
                return;
            }
            Err(e) => {
                error!(error = %e, "redeliver_current_life: failed to load current life row");
                return;
            }
        };

        let fragments = match self.storage.fragments_for_life(life_number).await {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "redeliver_current_life: failed to load memory fragments, re-delivering without them");
                Vec::new()
            }
        };

        let birth_payload = BirthRequest {
            life_number,
            bootstrap_mode: life.bootstrap_mode,
            memory_fragments: fragments,
            prior_death_cause: None,
        };

        match self.agent.post_birth(&birth_payload).await {
            Ok(()) => info!(life_number = %life_number, "re-delivered current life to agent after resync"),
            Err(e) => warn!(error = %e, life_number = %life_number, "redeliver_current_life: agent rejected re-sync birth"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    async fn manager() -> Arc<LifecycleManager> {
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::connect(":memory:").await.unwrap());
        let agent = Arc::new(AgentClient::new("http://127.0.0.1:1", "key"));
        let (tx, _rx) = broadcast::channel(16);
        LifecycleManager::new(
            storage,
            agent,
            tx,
            LifecycleConfig {
                respawn_delay_min_s: 10,
                respawn_delay_max_s: 10,
                voting_window_s: 3600,
                model_id: "primary".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn fresh_manager_starts_dead() {
        let m = manager().await;
        let state = m.current_state().await;
        assert!(!state.is_alive);
    }

    #[tokio::test]
    async fn transition_to_dying_on_already_dead_is_noop() {
        let m = manager().await;
        // Should not panic or double-close anything.
        m.transition_to_dying(DeathCause::Bankruptcy).await;
        let state = m.current_state().await;
        assert!(!state.is_alive);
    }
}
