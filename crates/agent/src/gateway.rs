//! Model gateway client. The gateway itself is an external
//! collaborator referenced only by its contract (spec §1); this is
//! that contract: a single completion call, 60s timeout, with the
//! 429-retry/rotate policy spec §4.5 describes layered on top.
//! Request/response shape is grounded on the fleet daemon's
//! OpenAI-compatible backend adapter (`playground::llm`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(60);
const BACKOFF_SCHEDULE_S: [u64; 3] = [5, 10, 20];
const MAX_ATTEMPTS_PER_CYCLE: u32 = 3;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model gateway rate-limited across all attempts this cycle")]
    AllAttemptsRateLimited,
    #[error("model gateway returned an error status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: CompletionUsage,
}

pub struct ModelGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ModelGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        ModelGateway {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn complete_once(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<CompletionResponse, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/complete", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { model, prompt })
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::Rejected {
                status: 429,
                body: String::new(),
            });
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Calls the gateway with `model_tiers[0]` first. On a 429, backs
    /// off along `BACKOFF_SCHEDULE_S` and rotates to the next tier, up
    /// to `MAX_ATTEMPTS_PER_CYCLE` total attempts in this cycle.
    pub async fn complete_with_retry(
        &self,
        model_tiers: &[String],
        prompt: &str,
    ) -> Result<(CompletionResponse, String), GatewayError> {
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS_PER_CYCLE {
            let tier = model_tiers
                .get(attempt as usize)
                .or_else(|| model_tiers.last())
                .map(String::as_str)
                .unwrap_or("primary");

            match self.complete_once(tier, prompt).await {
                Ok(resp) => return Ok((resp, tier.to_string())),
                Err(GatewayError::Rejected { status: 429, .. }) => {
                    if let Some(&delay_s) = BACKOFF_SCHEDULE_S.get(attempt as usize) {
                        tokio::time::sleep(Duration::from_secs(delay_s)).await;
                    }
                    last_err = Some(GatewayError::AllAttemptsRateLimited);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(GatewayError::AllAttemptsRateLimited))
    }
}
