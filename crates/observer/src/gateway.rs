//! HTTP client the observer uses to reach the agent's loopback-only
//! internal API (`/state`, `/birth`, `/force-sync`, `/budget`).
//! Grounded on the fleet daemon's pattern of building one shared
//! `reqwest::Client` and reusing it across calls instead of
//! constructing one per request.

use chrono::{DateTime, Utc};
use entity_types::{BootstrapMode, DeathCause, MemoryFragment, LifeNumber};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const LOOPBACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("agent unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("agent rejected request: {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStateResponse {
    pub life_number: LifeNumber,
    pub is_alive: bool,
    pub name: String,
    pub icon: String,
    pub pronoun: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BirthRequest {
    pub life_number: LifeNumber,
    pub bootstrap_mode: BootstrapMode,
    pub memory_fragments: Vec<MemoryFragment>,
    pub prior_death_cause: Option<DeathCause>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForceSyncRequest {
    pub life_number: LifeNumber,
    pub is_alive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryTailEntry {
    pub ts: DateTime<Utc>,
    pub model_id: String,
    pub usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetResponse {
    pub balance_usd: f64,
    pub monthly_budget_usd: f64,
    pub per_model_spend: HashMap<String, f64>,
    pub history_tail: Vec<HistoryTailEntry>,
}

/// Shared client for every observer -> agent call.
pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
    internal_api_key: String,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>, internal_api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOPBACK_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        AgentClient {
            client,
            base_url: base_url.into(),
            internal_api_key: internal_api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_state(&self) -> Result<AgentStateResponse, GatewayError> {
        let resp = self
            .client
            .get(self.url("/state"))
            .header("X-Internal-Key", &self.internal_api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn post_birth(&self, payload: &BirthRequest) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(self.url("/birth"))
            .header("X-Internal-Key", &self.internal_api_key)
            .json(payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    pub async fn post_force_sync(&self, payload: &ForceSyncRequest) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(self.url("/force-sync"))
            .header("X-Internal-Key", &self.internal_api_key)
            .json(payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    pub async fn get_budget(&self) -> Result<BudgetResponse, GatewayError> {
        let resp = self
            .client
            .get(self.url("/budget"))
            .header("X-Internal-Key", &self.internal_api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}
