//! Credit ledger: persistent JSON store of USD balance, per-model
//! spend, and charge history. Survives agent process death by design —
//! the file lives under the persistent credits directory, never the
//! ephemeral workspace (spec §6, §9).
//!
//! Mutation is serialized by a single `tokio::sync::Mutex` (single
//! writer, spec §4.6); writes hit disk via a write-tmp/fsync/rename
//! sequence so a crash mid-write never corrupts the file, adapted from
//! the fleet ledger's persist-before-commit discipline for a flat file
//! instead of a database connection.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use entity_types::ledger::{ChargeOutcome, ChargeRecord, LedgerStatus, BANKRUPTCY_THRESHOLD_USD};
use entity_types::CreditLedger;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Next calendar-month boundary (first of next month, midnight UTC)
/// after `now`.
fn next_month_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("valid first-of-month timestamp")
}

pub struct Ledger {
    path: PathBuf,
    state: Mutex<CreditLedger>,
}

impl Ledger {
    /// Load the ledger from disk, or initialize a fresh one at
    /// `monthly_budget_usd` if no file exists yet.
    pub async fn load_or_init(
        path: impl AsRef<Path>,
        monthly_budget_usd: f64,
    ) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let ledger = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<CreditLedger>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                CreditLedger::new(monthly_budget_usd, next_month_boundary(Utc::now()))
            }
            Err(e) => return Err(e.into()),
        };
        let ledger = Ledger {
            path,
            state: Mutex::new(ledger),
        };
        ledger.reset_if_due().await?;
        Ok(ledger)
    }

    /// Pure read of the current balance, after applying a due reset.
    pub async fn balance(&self) -> Result<f64, LedgerError> {
        self.reset_if_due().await?;
        Ok(self.state.lock().await.balance_usd)
    }

    /// Pure read of solvency status, after applying a due reset.
    pub async fn status(&self) -> Result<LedgerStatus, LedgerError> {
        self.reset_if_due().await?;
        Ok(self.state.lock().await.status())
    }

    pub async fn snapshot(&self) -> Result<CreditLedger, LedgerError> {
        self.reset_if_due().await?;
        Ok(self.state.lock().await.clone())
    }

    /// If the calendar boundary has passed, restore the full budget,
    /// clear history, and advance `reset_at`. Checked on every
    /// `balance`/`status`/`charge` entry point.
    pub async fn reset_if_due(&self) -> Result<(), LedgerError> {
        let mut guard = self.state.lock().await;
        let now = Utc::now();
        if now >= guard.reset_at {
            let budget = guard.monthly_budget_usd;
            guard.balance_usd = budget;
            guard.per_model_spend.clear();
            guard.history.clear();
            guard.reset_at = next_month_boundary(now);
            self.persist(&guard).await?;
        }
        Ok(())
    }

    /// Atomic check-then-deduct: computes `balance - usd` before commit
    /// so the final balance is never negative and `bankrupt` is
    /// returned exactly on the charge that crosses the threshold.
    pub async fn charge(
        &self,
        model_id: &str,
        input_tok: u64,
        output_tok: u64,
        usd: f64,
    ) -> Result<ChargeOutcome, LedgerError> {
        drop(self.reset_if_due().await);
        let mut guard = self.state.lock().await;

        let post_balance = (guard.balance_usd - usd).max(0.0);
        guard.balance_usd = post_balance;
        *guard.per_model_spend.entry(model_id.to_string()).or_insert(0.0) += usd;
        guard.push_history_bounded(ChargeRecord {
            ts: Utc::now(),
            model_id: model_id.to_string(),
            input_tok,
            output_tok,
            usd,
        });

        self.persist(&guard).await?;

        Ok(if post_balance <= BANKRUPTCY_THRESHOLD_USD {
            ChargeOutcome::Bankrupt
        } else {
            ChargeOutcome::Ok
        })
    }

    async fn persist(&self, ledger: &CreditLedger) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(ledger)?;

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh_ledger(budget: f64) -> (Ledger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        let ledger = Ledger::load_or_init(&path, budget).await.unwrap();
        (ledger, dir)
    }

    #[tokio::test]
    async fn fresh_ledger_starts_at_full_budget() {
        let (ledger, _dir) = fresh_ledger(5.00).await;
        assert_eq!(ledger.balance().await.unwrap(), 5.00);
        assert_eq!(ledger.status().await.unwrap(), LedgerStatus::Solvent);
    }

    #[tokio::test]
    async fn charge_below_threshold_is_ok() {
        let (ledger, _dir) = fresh_ledger(5.00).await;
        let outcome = ledger.charge("primary", 100, 50, 0.10).await.unwrap();
        assert_eq!(outcome, ChargeOutcome::Ok);
        assert!((ledger.balance().await.unwrap() - 4.90).abs() < 1e-9);
    }

    #[tokio::test]
    async fn charge_crossing_threshold_is_bankrupt_and_balance_is_exact() {
        let (ledger, _dir) = fresh_ledger(5.00).await;
        // Drive balance down to 0.02, then charge 0.015 -> 0.005, bankrupt.
        ledger.charge("primary", 0, 0, 4.98).await.unwrap();
        assert!((ledger.balance().await.unwrap() - 0.02).abs() < 1e-9);

        let outcome = ledger.charge("primary", 10, 10, 0.015).await.unwrap();
        assert_eq!(outcome, ChargeOutcome::Bankrupt);
        assert!((ledger.balance().await.unwrap() - 0.005).abs() < 1e-9);
    }

    #[tokio::test]
    async fn balance_never_reported_negative_status_bankrupt_at_threshold() {
        let (ledger, _dir) = fresh_ledger(0.01).await;
        assert_eq!(ledger.status().await.unwrap(), LedgerStatus::Bankrupt);
    }

    #[tokio::test]
    async fn charge_larger_than_balance_clamps_to_zero() {
        let (ledger, _dir) = fresh_ledger(0.50).await;
        let outcome = ledger.charge("primary", 1000, 1000, 5.00).await.unwrap();
        assert_eq!(outcome, ChargeOutcome::Bankrupt);
        assert_eq!(ledger.balance().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        {
            let ledger = Ledger::load_or_init(&path, 5.00).await.unwrap();
            ledger.charge("primary", 1, 1, 1.00).await.unwrap();
        }
        let reloaded = Ledger::load_or_init(&path, 5.00).await.unwrap();
        assert!((reloaded.balance().await.unwrap() - 4.00).abs() < 1e-9);
    }
}
