//! MemoryFragment: observer-generated residue of a prior Life, handed to
//! the next incarnation in place of raw history access.

use crate::ids::LifeNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFragment {
    pub source_life_number: LifeNumber,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
