use std::{future::Future, sync::Arc, time::Duration};

use serde::Deserialize;
use surrealdb::{
    engine::any::{self, Any},
    opt::auth::Root,
    Surreal,
};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::{
    config::DatabaseConfig,
    error::{TelemetryError, TelemetryResult},
};

pub(crate) const COUNTER_TABLE: &str = "id_counter";

const CONFLICT_RETRIES: u32 = 32;

/// Handle on the telemetry database.
///
/// Cloning is cheap and every clone talks to the same engine, so one handle
/// is created at startup and passed to each registry and stream store.
///
/// Clones also share two locks. `ids` serialises counter bumps so writers in
/// this process never conflict on a counter row. `runs` is held shared by
/// sample inserts and exclusively by run deletion, so an insert cannot land
/// between a cascade delete's scan and its commit.
#[derive(Clone)]
pub struct Database {
    db: Surreal<Any>,
    ids: Arc<Mutex<()>>,
    runs: Arc<RwLock<()>>,
}

#[derive(Deserialize)]
struct Counter {
    last: i64,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, surrealdb::Error> {
        debug!(url = %config.url, "connecting to database");
        let db = any::connect(config.url.as_str()).await?;
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;
        Ok(Self {
            db,
            ids: Arc::default(),
            runs: Arc::default(),
        })
    }

    /// A fresh, empty in-memory database.
    pub async fn memory() -> Result<Self, surrealdb::Error> {
        Self::connect(&DatabaseConfig {
            url: "mem://".into(),
            ..Default::default()
        })
        .await
    }

    pub async fn ping(&self) -> bool {
        self.db.health().await.is_ok()
    }

    pub(crate) fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Held while a sample is written. Any number of writers share it.
    pub(crate) async fn sample_writer(&self) -> RwLockReadGuard<'_, ()> {
        self.runs.read().await
    }

    /// Held while a run and its samples are deleted.
    pub(crate) async fn run_remover(&self) -> RwLockWriteGuard<'_, ()> {
        self.runs.write().await
    }

    /// Draws the next record key for `table`.
    ///
    /// Keys are strictly increasing and never handed out twice, even after the
    /// row they were used for is deleted.
    pub(crate) async fn next_id(&self, table: &'static str) -> TelemetryResult<i64> {
        let _ids = self.ids.lock().await;
        retry_on_conflict(move || async move {
            let counter: Option<Counter> = self
                .db
                .query("UPSERT ONLY type::thing($counters, $table) SET last += 1")
                .bind(("counters", COUNTER_TABLE))
                .bind(("table", table))
                .await?
                .take(0)?;
            counter
                .map(|c| c.last)
                .ok_or(TelemetryError::MissingIdentity(table))
        })
        .await
    }
}

/// Re-runs `op` while the engine aborts it with a retryable conflict.
///
/// Other processes sharing a remote database still race for the same rows;
/// the loser backs off and tries again.
pub(crate) async fn retry_on_conflict<T, F, Fut>(mut op: F) -> TelemetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TelemetryResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.is_conflict() && attempt < CONFLICT_RETRIES => {
                attempt += 1;
                debug!(attempt, error = %err, "retrying after write conflict");
                tokio::time::sleep(Duration::from_millis(1 << attempt.min(6))).await;
            }
            result => return result,
        }
    }
}

/// In-memory database with the schema applied, for tests.
#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let db = Database::memory().await.unwrap();
    crate::schema::apply(&db).await.unwrap();
    db
}
