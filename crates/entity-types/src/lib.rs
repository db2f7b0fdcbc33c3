//! Shared wire and domain types for the digital-entity platform.
//!
//! This crate has no I/O of its own: it defines the data model shared
//! between the `observer` and `agent` binaries (and the error taxonomy
//! they both speak at their HTTP boundaries) so that the two services
//! never drift on wire shapes.

pub mod activity;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod life;
pub mod memory;
pub mod oracle;
pub mod vote;

pub use activity::{ActivityEvent, ActivityKind};
pub use error::{ApiError, ErrorKind};
pub use ids::{LifeNumber, RoundId, VoterFingerprint};
pub use ledger::{ChargeOutcome, ChargeRecord, CreditLedger, LedgerStatus};
pub use life::{BootstrapMode, DeathCause, IdentityTriple, Life, LifeState};
pub use memory::MemoryFragment;
pub use oracle::{OracleKind, OracleMessage};
pub use vote::{Vote, VoteChoice, VoteOutcome, VoteRound, VoteRoundStatus};
