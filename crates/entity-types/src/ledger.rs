//! CreditLedger wire shape. The mutation logic (atomic charge, reset)
//! lives in `entity-ledger`; this crate only defines the persisted/wire
//! representation so observer and agent agree on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bankruptcy threshold: a balance at or below this is bankrupt.
pub const BANKRUPTCY_THRESHOLD_USD: f64 = 0.01;

/// Number of recent charge records retained in `history`. Long-term
/// totals live in `per_model_spend` instead.
pub const HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub ts: DateTime<Utc>,
    pub model_id: String,
    pub input_tok: u64,
    pub output_tok: u64,
    pub usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeOutcome {
    Ok,
    Bankrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Solvent,
    Bankrupt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditLedger {
    pub balance_usd: f64,
    pub monthly_budget_usd: f64,
    pub reset_at: DateTime<Utc>,
    pub per_model_spend: HashMap<String, f64>,
    pub history: Vec<ChargeRecord>,
}

impl CreditLedger {
    pub fn new(monthly_budget_usd: f64, reset_at: DateTime<Utc>) -> Self {
        CreditLedger {
            balance_usd: monthly_budget_usd,
            monthly_budget_usd,
            reset_at,
            per_model_spend: HashMap::new(),
            history: Vec::new(),
        }
    }

    pub fn status(&self) -> LedgerStatus {
        if self.balance_usd <= BANKRUPTCY_THRESHOLD_USD {
            LedgerStatus::Bankrupt
        } else {
            LedgerStatus::Solvent
        }
    }

    pub fn push_history_bounded(&mut self, record: ChargeRecord) {
        self.history.push(record);
        if self.history.len() > HISTORY_CAP {
            let overflow = self.history.len() - HISTORY_CAP;
            self.history.drain(0..overflow);
        }
    }
}
