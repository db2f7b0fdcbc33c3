//! VoteRound and Vote: the per-life tally and its adjudication rule.

use crate::ids::{LifeNumber, RoundId, VoterFingerprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Live,
    Die,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteRoundStatus {
    Open,
    ClosedSurvived,
    ClosedDied,
}

/// One per Life. Invariants: `live >= 0`, `die >= 0`, transitions only
/// `open -> closed_*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRound {
    pub id: RoundId,
    pub life_number: LifeNumber,
    pub opened_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub live: u32,
    pub die: u32,
    pub status: VoteRoundStatus,
}

/// Outcome of adjudicating a round at close time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Survived,
    Died,
}

impl VoteRound {
    pub fn open(life_number: LifeNumber, window: chrono::Duration) -> Self {
        let now = Utc::now();
        VoteRound {
            id: RoundId::new(),
            life_number,
            opened_at: now,
            closes_at: now + window,
            live: 0,
            die: 0,
            status: VoteRoundStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, VoteRoundStatus::Open)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.closes_at <= now
    }

    pub fn record(&mut self, choice: VoteChoice) {
        match choice {
            VoteChoice::Live => self.live += 1,
            VoteChoice::Die => self.die += 1,
        }
    }

    /// Adjudication rule: death requires `live + die >= 3 AND die > live`.
    /// An exact tie with total >= 3 is survival since `die > live` is
    /// strict.
    pub fn adjudicate(&self) -> VoteOutcome {
        let total = self.live + self.die;
        if total >= 3 && self.die > self.live {
            VoteOutcome::Died
        } else {
            VoteOutcome::Survived
        }
    }

    pub fn close_with(&mut self, outcome: VoteOutcome) {
        self.status = match outcome {
            VoteOutcome::Survived => VoteRoundStatus::ClosedSurvived,
            VoteOutcome::Died => VoteRoundStatus::ClosedDied,
        };
    }
}

/// `{round_id, voter_fingerprint, choice, cast_at}`. Unique on
/// `(round_id, voter_fingerprint)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub round_id: RoundId,
    pub voter_fingerprint: VoterFingerprint,
    pub choice: VoteChoice,
    pub cast_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_with(live: u32, die: u32) -> VoteRound {
        let mut r = VoteRound::open(LifeNumber(1), chrono::Duration::hours(1));
        r.live = live;
        r.die = die;
        r
    }

    #[test]
    fn total_two_never_causes_death() {
        assert_eq!(round_with(1, 1).adjudicate(), VoteOutcome::Survived);
        assert_eq!(round_with(0, 2).adjudicate(), VoteOutcome::Survived);
    }

    #[test]
    fn total_three_die_majority_causes_death() {
        assert_eq!(round_with(1, 2).adjudicate(), VoteOutcome::Died);
    }

    #[test]
    fn total_four_tie_is_survival() {
        assert_eq!(round_with(2, 2).adjudicate(), VoteOutcome::Survived);
    }

    #[test]
    fn below_threshold_die_majority_is_not_death() {
        // total=2, die>live, but total < 3
        assert_eq!(round_with(0, 2).adjudicate(), VoteOutcome::Survived);
    }

    #[test]
    fn closed_round_cannot_be_reopened_by_is_due() {
        let mut r = round_with(0, 3);
        r.close_with(VoteOutcome::Died);
        assert!(!r.is_due(Utc::now() + chrono::Duration::days(1)));
    }
}
