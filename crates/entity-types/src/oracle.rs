//! OracleMessage: out-of-band administrative directive to the agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    Oracle,
    Whisper,
    Architect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleMessage {
    pub kind: OracleKind,
    pub text: String,
    pub delivered_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}
