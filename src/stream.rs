//! One store implementation shared by all six telemetry streams.
//!
//! A [`StreamStore`] is parameterised over its [`Payload`] type. Inserting,
//! the "latest" tie-break and range scans behave identically for every kind;
//! only the payload's own validation differs.

use std::marker::PhantomData;

use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use surrealdb::Datetime;

use crate::{
    db::{retry_on_conflict, Database},
    error::{is_conflict, TelemetryError, TelemetryResult, RUN_NOT_FOUND},
    models::{NewSample, Payload, Sample},
    registry::{RunRegistry, RUN_TABLE},
};

pub const DEFAULT_LIMIT: u32 = 5_000;
pub const MAX_LIMIT: u32 = 200_000;

/// Row cap for a range scan, always within `[1, MAX_LIMIT]`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Limit(u32);

impl Limit {
    pub fn new(limit: i64) -> TelemetryResult<Self> {
        match u32::try_from(limit) {
            Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(Self(limit)),
            _ => Err(TelemetryError::validation(format!(
                "limit must be within [1, {MAX_LIMIT}], got {limit}"
            ))),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(DEFAULT_LIMIT)
    }
}

/// Inclusive bounds on `t_us`. An inverted window simply matches nothing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TimeWindow {
    pub t_start_us: Option<i64>,
    pub t_end_us: Option<i64>,
}

impl TimeWindow {
    pub fn between(t_start_us: i64, t_end_us: i64) -> Self {
        Self {
            t_start_us: Some(t_start_us),
            t_end_us: Some(t_end_us),
        }
    }
}

#[derive(Serialize, Clone)]
struct SampleContent<P> {
    run_id: i64,
    t_us: i64,
    seq: Option<i64>,
    payload: P,
    created_at: Datetime,
    updated_at: Datetime,
}

#[derive(Deserialize)]
struct SampleRow<P> {
    record_key: i64,
    run_id: i64,
    t_us: i64,
    seq: Option<i64>,
    payload: P,
    created_at: Datetime,
    updated_at: Datetime,
}

impl<P> SampleContent<P> {
    fn into_sample(self, id: i64) -> Sample<P> {
        Sample {
            id,
            run_id: self.run_id,
            t_us: self.t_us,
            seq: self.seq,
            payload: self.payload,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl<P> From<SampleRow<P>> for Sample<P> {
    fn from(row: SampleRow<P>) -> Self {
        Sample {
            id: row.record_key,
            run_id: row.run_id,
            t_us: row.t_us,
            seq: row.seq,
            payload: row.payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct StreamStore<P> {
    db: Database,
    runs: RunRegistry,
    payload: PhantomData<fn() -> P>,
}

impl<P> Clone for StreamStore<P> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            runs: self.runs.clone(),
            payload: PhantomData,
        }
    }
}

impl<P: Payload> StreamStore<P> {
    pub fn new(db: Database) -> Self {
        Self {
            runs: RunRegistry::new(db.clone()),
            db,
            payload: PhantomData,
        }
    }

    /// Appends a sample.
    ///
    /// The payload is checked first, then the run; nothing is written unless
    /// both pass. Concurrent inserts are independent of each other.
    pub async fn insert(&self, sample: NewSample<P>) -> TelemetryResult<Sample<P>> {
        sample.payload.validate()?;

        let now = Datetime::from(Utc::now());
        let content = SampleContent {
            run_id: sample.run_id,
            t_us: sample.t_us,
            seq: sample.seq,
            payload: sample.payload,
            created_at: now.clone(),
            updated_at: now,
        };

        let _writer = self.db.sample_writer().await;
        self.runs.ensure_exists(content.run_id).await?;
        let id = self.db.next_id(P::KIND.table()).await?;
        let row = &content;
        retry_on_conflict(move || self.create(id, row)).await?;

        Ok(content.into_sample(id))
    }

    /// Writes the row, re-checking the run inside the same transaction so a
    /// concurrent delete either sees this row or makes it fail.
    async fn create(&self, id: i64, content: &SampleContent<P>) -> TelemetryResult<()> {
        let mut response = self
            .db
            .client()
            .query("BEGIN TRANSACTION")
            .query(format!(
                "IF !record::exists(type::thing($runs, $run_id)) {{ THROW \"{RUN_NOT_FOUND}\" }}"
            ))
            .query("CREATE type::thing($table, $id) CONTENT $content RETURN NONE")
            .query("COMMIT TRANSACTION")
            .bind(("runs", RUN_TABLE))
            .bind(("run_id", content.run_id))
            .bind(("table", P::KIND.table()))
            .bind(("id", id))
            .bind(("content", content.clone()))
            .await?;

        let mut errors: Vec<_> = response.take_errors().into_iter().collect();
        errors.sort_by_key(|(index, _)| *index);
        if errors
            .iter()
            .any(|(_, err)| err.to_string().contains(RUN_NOT_FOUND))
        {
            return Err(TelemetryError::run_not_found());
        }
        if errors.is_empty() {
            return Ok(());
        }
        // Report the conflict when there is one, so the caller can retry.
        let at = errors
            .iter()
            .position(|(_, err)| is_conflict(err))
            .unwrap_or(0);
        Err(errors.swap_remove(at).1.into())
    }

    /// The sample with the greatest `(t_us, id)`, within one run or across
    /// all of them. Among equal timestamps the later insert wins.
    pub async fn latest(&self, run_id: Option<i64>) -> TelemetryResult<Sample<P>> {
        let mut query = String::from("SELECT *, record::id(id) AS record_key FROM type::table($table)");
        if let Some(run_id) = run_id {
            self.runs.ensure_exists(run_id).await?;
            query.push_str(" WHERE run_id = $run_id");
        }
        query.push_str(" ORDER BY t_us DESC, id DESC LIMIT 1");

        let mut request = self.db.client().query(query).bind(("table", P::KIND.table()));
        if let Some(run_id) = run_id {
            request = request.bind(("run_id", run_id));
        }
        let rows: Vec<SampleRow<P>> = request.await?.take(0)?;

        rows.into_iter()
            .next()
            .map(Sample::from)
            .ok_or_else(|| TelemetryError::not_found(format!("No {} found", P::KIND.plural())))
    }

    /// Samples of one run ordered by `t_us`, then identity, capped at `limit`.
    ///
    /// An empty result is not an error; an unknown run is.
    pub async fn list_by_run(
        &self,
        run_id: i64,
        window: TimeWindow,
        limit: Limit,
    ) -> TelemetryResult<Vec<Sample<P>>> {
        self.runs.ensure_exists(run_id).await?;

        let conditions = [
            Some("run_id = $run_id"),
            window.t_start_us.map(|_| "t_us >= $t_start_us"),
            window.t_end_us.map(|_| "t_us <= $t_end_us"),
        ]
        .into_iter()
        .flatten()
        .join(" AND ");
        let query = format!(
            "SELECT *, record::id(id) AS record_key FROM type::table($table) WHERE {conditions} \
             ORDER BY t_us ASC, id ASC LIMIT {}",
            limit.get()
        );

        let mut request = self
            .db
            .client()
            .query(query)
            .bind(("table", P::KIND.table()))
            .bind(("run_id", run_id));
        if let Some(t_start_us) = window.t_start_us {
            request = request.bind(("t_start_us", t_start_us));
        }
        if let Some(t_end_us) = window.t_end_us {
            request = request.bind(("t_end_us", t_end_us));
        }
        let rows: Vec<SampleRow<P>> = request.await?.take(0)?;

        Ok(rows.into_iter().map(Sample::from).collect())
    }
}
