//! HTTP client the agent uses to reach the observer: the public vote
//! counters and the internal-key-guarded reverse channel (activity
//! reports, Oracle poll/ack) that closes the gap spec §4.5 steps 2 and
//! 8 leave implicit. Mirrors the observer's own `AgentClient` (shared
//! client, built once, reused across calls).

use entity_types::{ActivityKind, LifeNumber, OracleMessage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const LOOPBACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ObserverClientError {
    #[error("observer unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("observer rejected request: {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteCounts {
    pub live: u32,
    pub die: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ActivityReport<'a> {
    life_number: LifeNumber,
    kind: ActivityKind,
    payload: &'a serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct PendingOracleResponse {
    message: Option<OracleMessage>,
}

pub struct ObserverClient {
    client: reqwest::Client,
    base_url: String,
    internal_api_key: String,
}

impl ObserverClient {
    pub fn new(base_url: impl Into<String>, internal_api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOPBACK_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        ObserverClient {
            client,
            base_url: base_url.into(),
            internal_api_key: internal_api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_votes(&self) -> Result<VoteCounts, ObserverClientError> {
        let resp = self.client.get(self.url("/api/votes")).send().await?;
        if !resp.status().is_success() {
            return Err(ObserverClientError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn report_activity(
        &self,
        life_number: LifeNumber,
        kind: ActivityKind,
        payload: &serde_json::Value,
    ) -> Result<(), ObserverClientError> {
        let resp = self
            .client
            .post(self.url("/internal/activity"))
            .header("X-Internal-Key", &self.internal_api_key)
            .json(&ActivityReport {
                life_number,
                kind,
                payload,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ObserverClientError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    pub async fn pending_oracle(&self) -> Result<Option<OracleMessage>, ObserverClientError> {
        let resp = self
            .client
            .get(self.url("/internal/oracle"))
            .header("X-Internal-Key", &self.internal_api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ObserverClientError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        let body: PendingOracleResponse = resp.json().await?;
        Ok(body.message)
    }

    pub async fn acknowledge_oracle(&self) -> Result<(), ObserverClientError> {
        let resp = self
            .client
            .post(self.url("/internal/oracle/ack"))
            .header("X-Internal-Key", &self.internal_api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ObserverClientError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}
