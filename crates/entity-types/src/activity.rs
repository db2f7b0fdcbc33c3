//! ActivityEvent: the append-only timeline consumed by SSE and the
//! public timeline endpoint.

use crate::ids::LifeNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Think,
    Act,
    Error,
    Oracle,
    Birth,
    Death,
    VoteWindowClose,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Monotonic sequence number assigned by the observer on receipt.
    /// Consumers track this to deduplicate across SSE reconnects.
    pub id: u64,
    pub life_number: LifeNumber,
    pub ts: DateTime<Utc>,
    pub kind: ActivityKind,
    pub payload: Value,
}
