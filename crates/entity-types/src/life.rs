//! Life and LifeState: the observer's authoritative incarnation record.

use crate::ids::LifeNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason a Life ended.
///
/// `TokenExhaustion` is legacy: the upstream system used to record it,
/// but no code path in this platform constructs it. It round-trips
/// through serde so historical rows stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Bankruptcy,
    VoteMajority,
    Manual,
    /// Legacy-readable only. Never constructed by this codebase.
    TokenExhaustion,
}

/// Prompt-construction variant a new Life begins under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapMode {
    BlankSlate,
    BasicFacts,
    FullBriefing,
}

impl BootstrapMode {
    /// The rotation order the respawn scheduler advances through.
    const ROTATION: [BootstrapMode; 3] = [
        BootstrapMode::BlankSlate,
        BootstrapMode::BasicFacts,
        BootstrapMode::FullBriefing,
    ];

    /// Next mode in the round-robin rotation.
    pub fn rotate(self) -> Self {
        let idx = Self::ROTATION.iter().position(|m| *m == self).unwrap_or(0);
        Self::ROTATION[(idx + 1) % Self::ROTATION.len()]
    }

    /// Choose the mode for a new incarnation given the rotation state and
    /// the cause of the prior death. A bankruptcy death overrides the
    /// rotation with `BlankSlate`, on the theory that a frugal restart
    /// should not immediately re-incur the costlier briefing context.
    pub fn choose_next(previous: Self, prior_death_cause: Option<DeathCause>) -> Self {
        if prior_death_cause == Some(DeathCause::Bankruptcy) {
            return BootstrapMode::BlankSlate;
        }
        previous.rotate()
    }
}

/// Name/icon/pronoun triple an agent picks (or is assigned) on birth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityTriple {
    pub name: String,
    pub icon: String,
    pub pronoun: String,
}

impl IdentityTriple {
    /// Names reserved by the platform; a birth payload using one of these
    /// has it substituted for a default rather than being rejected outright.
    pub const RESERVED_NAMES: &'static [&'static str] =
        &["admin", "system", "observer", "root", "god"];

    pub fn sanitized(mut self) -> Self {
        if Self::RESERVED_NAMES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(self.name.trim()))
            || self.name.trim().is_empty()
        {
            self.name = "Unnamed".to_string();
        }
        self
    }
}

/// Immutable-once-closed record of one incarnation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Life {
    pub life_number: LifeNumber,
    pub born_at: DateTime<Utc>,
    pub died_at: Option<DateTime<Utc>>,
    pub death_cause: Option<DeathCause>,
    pub bootstrap_mode: BootstrapMode,
    pub model_id: String,
    pub identity: IdentityTriple,
}

impl Life {
    pub fn is_closed(&self) -> bool {
        self.died_at.is_some()
    }
}

/// Singleton authoritative view of the current incarnation, mutated only
/// by the observer's lifecycle module under a single lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeState {
    pub life_number: LifeNumber,
    pub is_alive: bool,
    pub born_at: Option<DateTime<Utc>>,
    pub last_seen: DateTime<Utc>,
    pub bootstrap_mode: BootstrapMode,
}

impl LifeState {
    pub fn dead() -> Self {
        LifeState {
            life_number: LifeNumber(0),
            is_alive: false,
            born_at: None,
            last_seen: Utc::now(),
            bootstrap_mode: BootstrapMode::BlankSlate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_mode_rotates_round_robin() {
        assert_eq!(BootstrapMode::BlankSlate.rotate(), BootstrapMode::BasicFacts);
        assert_eq!(BootstrapMode::BasicFacts.rotate(), BootstrapMode::FullBriefing);
        assert_eq!(BootstrapMode::FullBriefing.rotate(), BootstrapMode::BlankSlate);
    }

    #[test]
    fn bankruptcy_forces_blank_slate() {
        let next = BootstrapMode::choose_next(
            BootstrapMode::FullBriefing,
            Some(DeathCause::Bankruptcy),
        );
        assert_eq!(next, BootstrapMode::BlankSlate);
    }

    #[test]
    fn non_bankruptcy_death_continues_rotation() {
        let next =
            BootstrapMode::choose_next(BootstrapMode::BlankSlate, Some(DeathCause::VoteMajority));
        assert_eq!(next, BootstrapMode::BasicFacts);
    }

    #[test]
    fn reserved_name_is_substituted() {
        let id = IdentityTriple {
            name: "Admin".to_string(),
            icon: "🤖".to_string(),
            pronoun: "they".to_string(),
        }
        .sanitized();
        assert_eq!(id.name, "Unnamed");
    }

    #[test]
    fn token_exhaustion_deserializes_for_legacy_rows() {
        let v: DeathCause = serde_json::from_str("\"token_exhaustion\"").unwrap();
        assert_eq!(v, DeathCause::TokenExhaustion);
    }
}
