//! Newtype identifiers.
//!
//! Kept as thin wrappers (rather than bare `u64`/`String`) so the type
//! system catches a life number passed where a round id was expected —
//! the same reasoning the fleet-orchestration layer this crate was
//! modeled on applies to its own `DeploymentId`/`InstanceId` pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Monotonic 1-based life counter. Authoritative at the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LifeNumber(pub u64);

impl LifeNumber {
    pub const FIRST: LifeNumber = LifeNumber(1);

    pub fn next(self) -> Self {
        LifeNumber(self.0 + 1)
    }

    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LifeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LifeNumber {
    fn from(v: u64) -> Self {
        LifeNumber(v)
    }
}

/// Salted hash of a voter's network identifier. The unit of rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterFingerprint(pub [u8; 32]);

impl VoterFingerprint {
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for VoterFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identifier of a single vote round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub Uuid);

impl RoundId {
    pub fn new() -> Self {
        RoundId(Uuid::new_v4())
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_number_next_increments() {
        assert_eq!(LifeNumber(1).next(), LifeNumber(2));
    }

    #[test]
    fn life_number_zero_is_unset() {
        assert!(LifeNumber(0).is_unset());
        assert!(!LifeNumber(1).is_unset());
    }

    #[test]
    fn fingerprint_hex_roundtrips_length() {
        let fp = VoterFingerprint([7u8; 32]);
        assert_eq!(fp.to_hex().len(), 64);
    }
}
