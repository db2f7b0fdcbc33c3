//! Shared agent state: the single hub every HTTP handler and the
//! think-act loop reach through. Mirrors the observer's
//! `LifecycleManager` shape — one lock around the mutable identity,
//! everything else an `Arc` handed out freely.

use crate::gateway::ModelGateway;
use crate::identity::{AgentIdentity, IdentityStore};
use crate::observer_client::ObserverClient;
use entity_ledger::Ledger;
use entity_redact::SecretVault;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, RwLock};

/// Cap on the in-memory self-thought scrollback fed into the next
/// cycle's prompt. Not persisted — a fresh process starts this empty,
/// same as the teacher's playground context window.
const RECENT_THOUGHTS_CAP: usize = 20;

pub struct Shared {
    pub identity_store: IdentityStore,
    pub ledger: Ledger,
    pub gateway: ModelGateway,
    pub observer: ObserverClient,
    pub vault: SecretVault,
    pub internal_api_key: String,

    identity: RwLock<Option<AgentIdentity>>,
    recent_thoughts: RwLock<VecDeque<String>>,
    unread_messages: AtomicU64,

    /// Bumped on `/birth` and `/force-sync` to signal the running
    /// think-act task (if any) to stop; the caller spawns a fresh one
    /// watching the new generation.
    generation: watch::Sender<u64>,

    pub model_tiers: Vec<String>,
    pub switch_model_floor_usd: f64,
    pub think_interval_min_s: u64,
    pub think_interval_max_s: u64,
}

impl Shared {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity_store: IdentityStore,
        ledger: Ledger,
        gateway: ModelGateway,
        observer: ObserverClient,
        vault: SecretVault,
        internal_api_key: String,
        model_tiers: Vec<String>,
        switch_model_floor_usd: f64,
        think_interval_min_s: u64,
        think_interval_max_s: u64,
    ) -> Self {
        let (generation, _) = watch::channel(0);
        Shared {
            identity_store,
            ledger,
            gateway,
            observer,
            vault,
            internal_api_key,
            identity: RwLock::new(None),
            recent_thoughts: RwLock::new(VecDeque::new()),
            unread_messages: AtomicU64::new(0),
            generation,
            model_tiers,
            switch_model_floor_usd,
            think_interval_min_s,
            think_interval_max_s,
        }
    }

    pub async fn current_identity(&self) -> Option<AgentIdentity> {
        self.identity.read().await.clone()
    }

    pub async fn set_identity(&self, identity: Option<AgentIdentity>) {
        *self.identity.write().await = identity;
    }

    /// Bumps the generation counter, signalling any in-flight think-act
    /// loop to stop at its next checkpoint.
    pub fn advance_generation(&self) -> u64 {
        let next = self.generation.borrow().wrapping_add(1);
        let _ = self.generation.send(next);
        next
    }

    pub fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn subscribe_generation(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub async fn push_thought(&self, text: String) {
        let mut guard = self.recent_thoughts.write().await;
        guard.push_back(text);
        while guard.len() > RECENT_THOUGHTS_CAP {
            guard.pop_front();
        }
    }

    pub async fn recent_thoughts(&self) -> Vec<String> {
        self.recent_thoughts.read().await.iter().cloned().collect()
    }

    pub fn bump_unread(&self) {
        self.unread_messages.fetch_add(1, Ordering::SeqCst);
    }

    pub fn take_unread(&self) -> u64 {
        self.unread_messages.swap(0, Ordering::SeqCst)
    }

    pub fn unread_count(&self) -> u64 {
        self.unread_messages.load(Ordering::SeqCst)
    }
}
