//! Background reconciliation loops that keep the agent's view of the
//! world consistent with the observer's authoritative state (spec §4.2,
//! §4.4). Each loop calls out to the agent outside the lifecycle lock
//! and only takes the lock to read or mutate state (spec §5).

pub mod budget;
pub mod sync;
