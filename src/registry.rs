use chrono::Utc;
use serde::{Deserialize, Serialize};
use surrealdb::Datetime;
use tracing::info;

use crate::{
    db::{retry_on_conflict, Database},
    error::{TelemetryError, TelemetryResult},
    models::{NewRun, Run, StreamKind},
};

pub const RUN_TABLE: &str = "run";

/// What a run row holds besides its record id.
#[derive(Serialize, Clone)]
struct RunContent {
    name: String,
    platform: String,
    vehicle: Option<String>,
    operator: Option<String>,
    notes: Option<String>,
    config_json: Option<String>,
    created_at: Datetime,
    updated_at: Datetime,
}

#[derive(Deserialize)]
struct RunRow {
    record_key: i64,
    name: String,
    platform: String,
    vehicle: Option<String>,
    operator: Option<String>,
    notes: Option<String>,
    config_json: Option<String>,
    created_at: Datetime,
    updated_at: Datetime,
}

impl RunContent {
    fn into_run(self, id: i64) -> Run {
        Run {
            id,
            name: self.name,
            platform: self.platform,
            vehicle: self.vehicle,
            operator: self.operator,
            notes: self.notes,
            config_json: self.config_json,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<RunRow> for Run {
    fn from(row: RunRow) -> Self {
        Run {
            id: row.record_key,
            name: row.name,
            platform: row.platform,
            vehicle: row.vehicle,
            operator: row.operator,
            notes: row.notes,
            config_json: row.config_json,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Creates, looks up and deletes runs.
#[derive(Clone)]
pub struct RunRegistry {
    db: Database,
}

impl RunRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, run: NewRun) -> TelemetryResult<Run> {
        run.validate()?;

        let now = Datetime::from(Utc::now());
        let content = RunContent {
            name: run.name,
            platform: run.platform,
            vehicle: run.vehicle,
            operator: run.operator,
            notes: run.notes,
            config_json: run.config_json,
            created_at: now.clone(),
            updated_at: now,
        };

        let id = self.db.next_id(RUN_TABLE).await?;
        self.db
            .client()
            .query("CREATE type::thing($table, $id) CONTENT $content RETURN NONE")
            .bind(("table", RUN_TABLE))
            .bind(("id", id))
            .bind(("content", content.clone()))
            .await?
            .check()?;

        info!(run_id = id, name = %content.name, platform = %content.platform, "created run");
        Ok(content.into_run(id))
    }

    pub async fn get(&self, id: i64) -> TelemetryResult<Run> {
        self.find(id).await?.ok_or_else(TelemetryError::run_not_found)
    }

    /// The run with the greatest identity. Creation timestamps play no part.
    pub async fn latest(&self) -> TelemetryResult<Run> {
        let mut response = self
            .db
            .client()
            .query("SELECT *, record::id(id) AS record_key FROM type::table($table) ORDER BY id DESC LIMIT 1")
            .bind(("table", RUN_TABLE))
            .await?;
        let rows: Vec<RunRow> = response.take(0)?;
        rows.into_iter()
            .next()
            .map(Run::from)
            .ok_or_else(|| TelemetryError::not_found("No runs found"))
    }

    /// All runs, newest first.
    pub async fn list(&self) -> TelemetryResult<Vec<Run>> {
        let mut response = self
            .db
            .client()
            .query("SELECT *, record::id(id) AS record_key FROM type::table($table) ORDER BY id DESC")
            .bind(("table", RUN_TABLE))
            .await?;
        let rows: Vec<RunRow> = response.take(0)?;
        Ok(rows.into_iter().map(Run::from).collect())
    }

    /// Fails with "Run not found" unless the run exists.
    pub async fn ensure_exists(&self, id: i64) -> TelemetryResult<()> {
        self.get(id).await.map(|_| ())
    }

    /// Deletes the run together with every sample of every stream that
    /// references it, in one transaction.
    pub async fn delete(&self, id: i64) -> TelemetryResult<()> {
        let _remover = self.db.run_remover().await;
        self.ensure_exists(id).await?;
        retry_on_conflict(move || self.cascade(id)).await?;

        info!(run_id = id, "deleted run and its samples");
        Ok(())
    }

    async fn cascade(&self, id: i64) -> TelemetryResult<()> {
        let mut query = self.db.client().query("BEGIN TRANSACTION");
        for kind in StreamKind::ALL {
            query = query.query(format!("DELETE {} WHERE run_id = $run_id", kind.table()));
        }
        query
            .query("DELETE type::thing($table, $run_id)")
            .query("COMMIT TRANSACTION")
            .bind(("table", RUN_TABLE))
            .bind(("run_id", id))
            .await?
            .check()?;
        Ok(())
    }

    async fn find(&self, id: i64) -> TelemetryResult<Option<Run>> {
        let mut response = self
            .db
            .client()
            .query("SELECT *, record::id(id) AS record_key FROM type::thing($table, $id)")
            .bind(("table", RUN_TABLE))
            .bind(("id", id))
            .await?;
        let rows: Vec<RunRow> = response.take(0)?;
        Ok(rows.into_iter().next().map(Run::from))
    }
}
