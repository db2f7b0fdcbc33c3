//! SQLite-backed `Storage` implementation. One `SqlitePool` opened
//! once and shared; writes are additionally ordered through the
//! lifecycle lock where §5 requires it — this layer only guarantees
//! each individual statement is atomic.

use super::{
    ActivityStorage, LifeStorage, MemoryStorage, OracleStorage, Storage, StorageError,
    StorageResult, VoteStorage,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity_types::{
    ActivityEvent, ActivityKind, BootstrapMode, DeathCause, IdentityTriple, Life, LifeNumber,
    LifeState, MemoryFragment, OracleKind, OracleMessage, RoundId, Vote, VoteChoice, VoteRound,
    VoteRoundStatus, VoterFingerprint,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn connect(path: &str) -> StorageResult<Self> {
        let url = format!("sqlite://{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;
        let storage = SqliteStorage { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS life_state (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                life_number INTEGER NOT NULL,
                is_alive INTEGER NOT NULL,
                born_at TEXT,
                last_seen TEXT NOT NULL,
                bootstrap_mode TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lives (
                life_number INTEGER PRIMARY KEY,
                born_at TEXT NOT NULL,
                died_at TEXT,
                death_cause TEXT,
                bootstrap_mode TEXT NOT NULL,
                model_id TEXT NOT NULL,
                identity_name TEXT NOT NULL,
                identity_icon TEXT NOT NULL,
                identity_pronoun TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vote_rounds (
                id TEXT PRIMARY KEY,
                life_number INTEGER NOT NULL,
                opened_at TEXT NOT NULL,
                closes_at TEXT NOT NULL,
                live INTEGER NOT NULL,
                die INTEGER NOT NULL,
                status TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS votes (
                round_id TEXT NOT NULL,
                voter_fingerprint TEXT NOT NULL,
                choice TEXT NOT NULL,
                cast_at TEXT NOT NULL,
                PRIMARY KEY (round_id, voter_fingerprint)
            );

            CREATE TABLE IF NOT EXISTS memory_fragments (
                life_number INTEGER NOT NULL,
                source_life_number INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                life_number INTEGER NOT NULL,
                ts TEXT NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS oracle_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                text TEXT NOT NULL,
                delivered_at TEXT NOT NULL,
                acknowledged_at TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn enum_to_json<T: serde::Serialize>(v: &T) -> String {
    serde_json::to_string(v).expect("enum serialization is infallible")
}

fn json_to_enum<T: serde::de::DeserializeOwned>(s: &str) -> StorageResult<T> {
    Ok(serde_json::from_str(s)?)
}

#[async_trait]
impl LifeStorage for SqliteStorage {
    async fn get_life_state(&self) -> StorageResult<LifeState> {
        let row = sqlx::query("SELECT life_number, is_alive, born_at, last_seen, bootstrap_mode FROM life_state WHERE id = 0")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(LifeState::dead()),
            Some(row) => {
                let born_at: Option<String> = row.try_get("born_at")?;
                Ok(LifeState {
                    life_number: LifeNumber(row.try_get::<i64, _>("life_number")? as u64),
                    is_alive: row.try_get::<i64, _>("is_alive")? != 0,
                    born_at: born_at.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
                    last_seen: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("last_seen")?)
                        .unwrap()
                        .with_timezone(&Utc),
                    bootstrap_mode: json_to_enum(&row.try_get::<String, _>("bootstrap_mode")?)?,
                })
            }
        }
    }

    async fn put_life_state(&self, state: &LifeState) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO life_state (id, life_number, is_alive, born_at, last_seen, bootstrap_mode)
            VALUES (0, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                life_number = excluded.life_number,
                is_alive = excluded.is_alive,
                born_at = excluded.born_at,
                last_seen = excluded.last_seen,
                bootstrap_mode = excluded.bootstrap_mode
            "#,
        )
        .bind(state.life_number.0 as i64)
        .bind(state.is_alive as i64)
        .bind(state.born_at.map(|t| t.to_rfc3339()))
        .bind(state.last_seen.to_rfc3339())
        .bind(enum_to_json(&state.bootstrap_mode))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_life(&self, life: &Life) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lives (life_number, born_at, died_at, death_cause, bootstrap_mode, model_id, identity_name, identity_icon, identity_pronoun)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(life.life_number.0 as i64)
        .bind(life.born_at.to_rfc3339())
        .bind(life.died_at.map(|t| t.to_rfc3339()))
        .bind(life.death_cause.as_ref().map(enum_to_json))
        .bind(enum_to_json(&life.bootstrap_mode))
        .bind(&life.model_id)
        .bind(&life.identity.name)
        .bind(&life.identity.icon)
        .bind(&life.identity.pronoun)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_life(&self, life_number: LifeNumber) -> StorageResult<Option<Life>> {
        let row = sqlx::query("SELECT * FROM lives WHERE life_number = ?")
            .bind(life_number.0 as i64)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let died_at: Option<String> = row.try_get("died_at")?;
        let death_cause: Option<String> = row.try_get("death_cause")?;
        Ok(Some(Life {
            life_number,
            born_at: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("born_at")?)
                .unwrap()
                .with_timezone(&Utc),
            died_at: died_at.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
            death_cause: death_cause.map(|s| json_to_enum::<DeathCause>(&s)).transpose()?,
            bootstrap_mode: json_to_enum(&row.try_get::<String, _>("bootstrap_mode")?)?,
            model_id: row.try_get("model_id")?,
            identity: IdentityTriple {
                name: row.try_get("identity_name")?,
                icon: row.try_get("identity_icon")?,
                pronoun: row.try_get("identity_pronoun")?,
            },
        }))
    }

    async fn close_life(
        &self,
        life_number: LifeNumber,
        died_at: DateTime<Utc>,
        death_cause: DeathCause,
    ) -> StorageResult<()> {
        sqlx::query("UPDATE lives SET died_at = ?, death_cause = ? WHERE life_number = ?")
            .bind(died_at.to_rfc3339())
            .bind(enum_to_json(&death_cause))
            .bind(life_number.0 as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn max_life_number(&self) -> StorageResult<LifeNumber> {
        let row = sqlx::query("SELECT COALESCE(MAX(life_number), 0) AS m FROM lives")
            .fetch_one(&self.pool)
            .await?;
        Ok(LifeNumber(row.try_get::<i64, _>("m")? as u64))
    }
}

#[async_trait]
impl VoteStorage for SqliteStorage {
    async fn open_round(&self, round: &VoteRound) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO vote_rounds (id, life_number, opened_at, closes_at, live, die, status) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(round.id.0.to_string())
        .bind(round.life_number.0 as i64)
        .bind(round.opened_at.to_rfc3339())
        .bind(round.closes_at.to_rfc3339())
        .bind(round.live as i64)
        .bind(round.die as i64)
        .bind(enum_to_json(&round.status))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_open_round(&self, life_number: LifeNumber) -> StorageResult<Option<VoteRound>> {
        let row = sqlx::query(
            "SELECT * FROM vote_rounds WHERE life_number = ? AND status = ? ORDER BY opened_at DESC LIMIT 1",
        )
        .bind(life_number.0 as i64)
        .bind(enum_to_json(&VoteRoundStatus::Open))
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_round).transpose()
    }

    async fn get_round(&self, round_id: RoundId) -> StorageResult<Option<VoteRound>> {
        let row = sqlx::query("SELECT * FROM vote_rounds WHERE id = ?")
            .bind(round_id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_round).transpose()
    }

    async fn list_due_open_rounds(&self, now: DateTime<Utc>) -> StorageResult<Vec<VoteRound>> {
        let rows = sqlx::query("SELECT * FROM vote_rounds WHERE status = ? AND closes_at <= ?")
            .bind(enum_to_json(&VoteRoundStatus::Open))
            .bind(now.to_rfc3339())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_round).collect()
    }

    async fn persist_round(&self, round: &VoteRound) -> StorageResult<()> {
        sqlx::query("UPDATE vote_rounds SET live = ?, die = ?, status = ? WHERE id = ?")
            .bind(round.live as i64)
            .bind(round.die as i64)
            .bind(enum_to_json(&round.status))
            .bind(round.id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_vote(&self, vote: &Vote) -> StorageResult<bool> {
        let result = sqlx::query(
            "INSERT INTO votes (round_id, voter_fingerprint, choice, cast_at) VALUES (?, ?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(vote.round_id.0.to_string())
        .bind(vote.voter_fingerprint.to_hex())
        .bind(enum_to_json(&vote.choice))
        .bind(vote.cast_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn has_voted_in_round(
        &self,
        round_id: RoundId,
        fingerprint: VoterFingerprint,
    ) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM votes WHERE round_id = ? AND voter_fingerprint = ?")
            .bind(round_id.0.to_string())
            .bind(fingerprint.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn last_accepted_vote_at(
        &self,
        fingerprint: VoterFingerprint,
    ) -> StorageResult<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT cast_at FROM votes WHERE voter_fingerprint = ? ORDER BY cast_at DESC LIMIT 1",
        )
        .bind(fingerprint.to_hex())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            let s: String = r.try_get("cast_at")?;
            Ok(DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc))
        })
        .transpose()
    }
}

fn row_to_round(row: sqlx::sqlite::SqliteRow) -> StorageResult<VoteRound> {
    Ok(VoteRound {
        id: RoundId(Uuid::from_str(&row.try_get::<String, _>("id")?).expect("valid uuid")),
        life_number: LifeNumber(row.try_get::<i64, _>("life_number")? as u64),
        opened_at: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("opened_at")?)
            .unwrap()
            .with_timezone(&Utc),
        closes_at: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("closes_at")?)
            .unwrap()
            .with_timezone(&Utc),
        live: row.try_get::<i64, _>("live")? as u32,
        die: row.try_get::<i64, _>("die")? as u32,
        status: json_to_enum(&row.try_get::<String, _>("status")?)?,
    })
}

#[async_trait]
impl MemoryStorage for SqliteStorage {
    async fn store_fragments(
        &self,
        life_number: LifeNumber,
        fragments: &[MemoryFragment],
    ) -> StorageResult<()> {
        for fragment in fragments {
            sqlx::query(
                "INSERT INTO memory_fragments (life_number, source_life_number, text, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(life_number.0 as i64)
            .bind(fragment.source_life_number.0 as i64)
            .bind(&fragment.text)
            .bind(fragment.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn fragments_for_life(&self, life_number: LifeNumber) -> StorageResult<Vec<MemoryFragment>> {
        let rows = sqlx::query(
            "SELECT source_life_number, text, created_at FROM memory_fragments WHERE life_number = ?",
        )
        .bind(life_number.0 as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(MemoryFragment {
                    source_life_number: LifeNumber(row.try_get::<i64, _>("source_life_number")? as u64),
                    text: row.try_get("text")?,
                    created_at: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("created_at")?)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    async fn all_fragments(&self) -> StorageResult<Vec<MemoryFragment>> {
        let rows = sqlx::query("SELECT source_life_number, text, created_at FROM memory_fragments")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(MemoryFragment {
                    source_life_number: LifeNumber(row.try_get::<i64, _>("source_life_number")? as u64),
                    text: row.try_get("text")?,
                    created_at: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("created_at")?)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ActivityStorage for SqliteStorage {
    async fn append_activity(&self, mut event: ActivityEvent) -> StorageResult<ActivityEvent> {
        let result = sqlx::query(
            "INSERT INTO activity_events (life_number, ts, kind, payload) VALUES (?, ?, ?, ?)",
        )
        .bind(event.life_number.0 as i64)
        .bind(event.ts.to_rfc3339())
        .bind(enum_to_json(&event.kind))
        .bind(serde_json::to_string(&event.payload)?)
        .execute(&self.pool)
        .await?;
        event.id = result.last_insert_rowid() as u64;
        Ok(event)
    }

    async fn recent_activity(&self, limit: usize) -> StorageResult<Vec<ActivityEvent>> {
        let rows = sqlx::query("SELECT * FROM activity_events ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        let mut events = rows
            .into_iter()
            .map(|row| {
                Ok(ActivityEvent {
                    id: row.try_get::<i64, _>("id")? as u64,
                    life_number: LifeNumber(row.try_get::<i64, _>("life_number")? as u64),
                    ts: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("ts")?)
                        .unwrap()
                        .with_timezone(&Utc),
                    kind: json_to_enum::<ActivityKind>(&row.try_get::<String, _>("kind")?)?,
                    payload: serde_json::from_str(&row.try_get::<String, _>("payload")?)?,
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;
        events.reverse();
        Ok(events)
    }
}

#[async_trait]
impl OracleStorage for SqliteStorage {
    async fn enqueue_oracle(&self, message: OracleMessage) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO oracle_messages (kind, text, delivered_at, acknowledged_at) VALUES (?, ?, ?, ?)",
        )
        .bind(enum_to_json(&message.kind))
        .bind(&message.text)
        .bind(message.delivered_at.to_rfc3339())
        .bind(message.acknowledged_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_oracle(&self) -> StorageResult<Option<OracleMessage>> {
        let row = sqlx::query(
            "SELECT kind, text, delivered_at, acknowledged_at FROM oracle_messages WHERE acknowledged_at IS NULL ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(OracleMessage {
            kind: json_to_enum::<OracleKind>(&row.try_get::<String, _>("kind")?)?,
            text: row.try_get("text")?,
            delivered_at: DateTime::parse_from_rfc3339(&row.try_get::<String, _>("delivered_at")?)
                .unwrap()
                .with_timezone(&Utc),
            acknowledged_at: None,
        }))
    }

    async fn acknowledge_oracle(&self) -> StorageResult<()> {
        sqlx::query(
            "UPDATE oracle_messages SET acknowledged_at = ? WHERE id = (SELECT id FROM oracle_messages WHERE acknowledged_at IS NULL ORDER BY id ASC LIMIT 1)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Storage for SqliteStorage {}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mem_storage() -> SqliteStorage {
        SqliteStorage::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn fresh_life_state_is_dead() {
        let storage = mem_storage().await;
        let state = storage.get_life_state().await.unwrap();
        assert!(!state.is_alive);
    }

    #[tokio::test]
    async fn put_then_get_life_state_roundtrips() {
        let storage = mem_storage().await;
        let mut state = LifeState::dead();
        state.life_number = LifeNumber(3);
        state.is_alive = true;
        storage.put_life_state(&state).await.unwrap();
        let reloaded = storage.get_life_state().await.unwrap();
        assert_eq!(reloaded.life_number, LifeNumber(3));
        assert!(reloaded.is_alive);
    }

    #[tokio::test]
    async fn duplicate_vote_is_rejected_by_unique_constraint() {
        let storage = mem_storage().await;
        let round = VoteRound::open(LifeNumber(1), chrono::Duration::hours(1));
        storage.open_round(&round).await.unwrap();
        let fp = VoterFingerprint([1u8; 32]);
        let v1 = Vote {
            round_id: round.id,
            voter_fingerprint: fp,
            choice: VoteChoice::Live,
            cast_at: Utc::now(),
        };
        let v2 = Vote {
            round_id: round.id,
            voter_fingerprint: fp,
            choice: VoteChoice::Die,
            cast_at: Utc::now(),
        };
        assert!(storage.record_vote(&v1).await.unwrap());
        assert!(!storage.record_vote(&v2).await.unwrap());
    }

    #[tokio::test]
    async fn activity_events_get_monotonic_ids() {
        let storage = mem_storage().await;
        let e1 = storage
            .append_activity(ActivityEvent {
                id: 0,
                life_number: LifeNumber(1),
                ts: Utc::now(),
                kind: ActivityKind::Think,
                payload: serde_json::json!({}),
            })
            .await
            .unwrap();
        let e2 = storage
            .append_activity(ActivityEvent {
                id: 0,
                life_number: LifeNumber(1),
                ts: Utc::now(),
                kind: ActivityKind::Act,
                payload: serde_json::json!({}),
            })
            .await
            .unwrap();
        assert!(e2.id > e1.id);
    }
}
