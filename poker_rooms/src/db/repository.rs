//! Versioned key-value repositories.
//!
//! Every successful write stamps the key with a fresh version drawn from one
//! counter shared by all keys, so versions only ever grow. Writers pass the
//! version they read as `cas` and lose the race when somebody else wrote in
//! between. Readers can long-poll a key until its version moves past one
//! they have already seen.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row, postgres::PgListener};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{sync::watch, time::Instant};

use super::{
    errors::StoreResult,
    timeouts::{with_default_timeout, with_long_timeout},
};

/// Monotonic write stamp. Zero means the key has never been written.
pub type Version = u64;

/// A key's current state. An absent key reads as version 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub version: Version,
    pub value: Option<JsonValue>,
}

impl Entry {
    pub fn absent() -> Self {
        Self {
            version: 0,
            value: None,
        }
    }
}

/// Trait for versioned document storage
#[async_trait]
pub trait VersionedRepository: Send + Sync {
    /// Read a key
    async fn get(&self, key: &str) -> StoreResult<Entry>;

    /// Write a key if its version still equals `cas`, with `cas == 0`
    /// meaning only if the key is absent. Returns the new version, or
    /// `None` when the write lost the race.
    async fn put(&self, key: &str, value: JsonValue, cas: Version) -> StoreResult<Option<Version>>;

    /// Wait until the key's version exceeds `since`, or until `timeout`
    /// passes, and return whatever is stored by then.
    async fn wait(&self, key: &str, since: Version, timeout: Duration) -> StoreResult<Entry>;

    /// Remove a key
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// In-process repository, for tests and single-process deployments.
pub struct MemoryRepository {
    entries: Mutex<HashMap<String, (Version, JsonValue)>>,
    latest: watch::Sender<Version>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            entries: Mutex::new(HashMap::new()),
            latest,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (Version, JsonValue)>> {
        // A panic elsewhere can't leave the map half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, key: &str) -> Entry {
        self.entries()
            .get(key)
            .map_or_else(Entry::absent, |(version, value)| Entry {
                version: *version,
                value: Some(value.clone()),
            })
    }

    /// Stamp the next version and wake waiters. Call with the map locked.
    fn bump(&self) -> Version {
        let version = *self.latest.borrow() + 1;
        self.latest.send_replace(version);
        version
    }
}

#[async_trait]
impl VersionedRepository for MemoryRepository {
    async fn get(&self, key: &str) -> StoreResult<Entry> {
        Ok(self.snapshot(key))
    }

    async fn put(&self, key: &str, value: JsonValue, cas: Version) -> StoreResult<Option<Version>> {
        let mut entries = self.entries();
        let current = entries.get(key).map_or(0, |(version, _)| *version);
        if current != cas {
            return Ok(None);
        }
        let version = self.bump();
        entries.insert(key.to_string(), (version, value));
        Ok(Some(version))
    }

    async fn wait(&self, key: &str, since: Version, timeout: Duration) -> StoreResult<Entry> {
        let mut changes = self.latest.subscribe();
        let deadline = Instant::now() + timeout;
        loop {
            let entry = self.snapshot(key);
            if entry.version > since {
                return Ok(entry);
            }
            match tokio::time::timeout_at(deadline, changes.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => return Ok(entry),
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.bump();
        }
        Ok(())
    }
}

/// Channel that carries the key of every committed write.
pub const CHANGES_CHANNEL: &str = "poker_rooms_changes";

/// PostgreSQL implementation of `VersionedRepository`
///
/// Documents live in one JSONB table. Versions come from a sequence so
/// they stay unique across keys, and commits are announced with
/// `pg_notify` for long-polling readers.
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and version sequence if they don't exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        with_long_timeout(
            sqlx::query("CREATE SEQUENCE IF NOT EXISTS poker_rooms_versions").execute(&self.pool),
        )
        .await?;
        with_long_timeout(
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS poker_rooms (
                    key TEXT PRIMARY KEY,
                    version BIGINT NOT NULL,
                    value JSONB NOT NULL
                )",
            )
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VersionedRepository for PgRepository {
    async fn get(&self, key: &str) -> StoreResult<Entry> {
        let row = with_default_timeout(
            sqlx::query("SELECT version, value FROM poker_rooms WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(r) => Ok(Entry {
                version: r.try_get::<i64, _>("version")? as Version,
                value: Some(r.try_get("value")?),
            }),
            None => Ok(Entry::absent()),
        }
    }

    async fn put(&self, key: &str, value: JsonValue, cas: Version) -> StoreResult<Option<Version>> {
        // The notification rides in the writing statement, so it is sent
        // exactly when the write commits.
        let query = if cas == 0 {
            sqlx::query(
                "WITH written AS (
                     INSERT INTO poker_rooms (key, version, value)
                     VALUES ($1, nextval('poker_rooms_versions'), $2)
                     ON CONFLICT (key) DO NOTHING
                     RETURNING version
                 )
                 SELECT version FROM written
                 CROSS JOIN LATERAL (SELECT pg_notify($3, $1)) AS notified",
            )
            .bind(key)
            .bind(value)
            .bind(CHANGES_CHANNEL)
        } else {
            sqlx::query(
                "WITH written AS (
                     UPDATE poker_rooms SET version = nextval('poker_rooms_versions'), value = $2
                     WHERE key = $1 AND version = $3
                     RETURNING version
                 )
                 SELECT version FROM written
                 CROSS JOIN LATERAL (SELECT pg_notify($4, $1)) AS notified",
            )
            .bind(key)
            .bind(value)
            .bind(cas as i64)
            .bind(CHANGES_CHANNEL)
        };
        let Some(row) = with_default_timeout(query.fetch_optional(&self.pool)).await? else {
            return Ok(None);
        };
        Ok(Some(row.try_get::<i64, _>("version")? as Version))
    }

    async fn wait(&self, key: &str, since: Version, timeout: Duration) -> StoreResult<Entry> {
        let deadline = Instant::now() + timeout;
        let mut listener = with_default_timeout(PgListener::connect_with(&self.pool)).await?;
        with_default_timeout(listener.listen(CHANGES_CHANNEL)).await?;

        loop {
            let entry = self.get(key).await?;
            if entry.version > since {
                return Ok(entry);
            }
            // Skip notifications for other keys without re-reading.
            loop {
                match tokio::time::timeout_at(deadline, listener.recv()).await {
                    Ok(Ok(notification)) if notification.payload() == key => break,
                    Ok(Ok(_)) => continue,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => return Ok(entry),
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query("DELETE FROM poker_rooms WHERE key = $1")
                .bind(key)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
