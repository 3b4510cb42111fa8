//! Validation in front of the registry and the stream stores.
//!
//! Records arrive as untrusted JSON. Ingestion checks shape and numeric
//! domain, then run existence, and only then writes. Queries check their
//! filter parameters before touching storage.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    db::Database,
    error::{TelemetryError, TelemetryResult},
    models::{NewRun, NewSample, Payload, Run, Sample},
    registry::RunRegistry,
    stream::{Limit, StreamStore, TimeWindow},
};

/// Filter of a by-run query as it arrives from a caller.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RangeParams {
    pub t_start_us: Option<i64>,
    pub t_end_us: Option<i64>,
    pub limit: Option<i64>,
}

impl RangeParams {
    /// Splits into a window and a checked limit. Inverted windows pass.
    pub fn validate(self) -> TelemetryResult<(TimeWindow, Limit)> {
        let limit = self.limit.map(Limit::new).transpose()?.unwrap_or_default();
        let window = TimeWindow {
            t_start_us: self.t_start_us,
            t_end_us: self.t_end_us,
        };
        Ok((window, limit))
    }
}

/// Parses an untrusted record, reporting any shape mismatch as a validation error.
pub fn parse_record<T: DeserializeOwned>(record: Value) -> TelemetryResult<T> {
    serde_json::from_value(record).map_err(|e| TelemetryError::validation(e.to_string()))
}

/// Entry point for everything that reads or writes telemetry.
#[derive(Clone)]
pub struct Gateway {
    db: Database,
    runs: RunRegistry,
}

impl Gateway {
    pub fn new(db: Database) -> Self {
        Self {
            runs: RunRegistry::new(db.clone()),
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    pub fn stream<P: Payload>(&self) -> StreamStore<P> {
        StreamStore::new(self.db.clone())
    }

    pub async fn create_run(&self, record: Value) -> TelemetryResult<Run> {
        let run: NewRun = parse_record(record)?;
        self.runs.create(run).await
    }

    /// Ingestion: shape, then domain, then run existence, then insert.
    pub async fn ingest<P: Payload>(&self, record: Value) -> TelemetryResult<Sample<P>> {
        let sample: NewSample<P> = parse_record(record)?;
        self.stream::<P>().insert(sample).await
    }

    /// Latest sample of a kind. Without a run the scope is global and no run
    /// lookup happens.
    pub async fn latest<P: Payload>(&self, run_id: Option<i64>) -> TelemetryResult<Sample<P>> {
        self.stream::<P>().latest(run_id).await
    }

    pub async fn list_by_run<P: Payload>(
        &self,
        run_id: i64,
        params: RangeParams,
    ) -> TelemetryResult<Vec<Sample<P>>> {
        let (window, limit) = params.validate()?;
        self.stream::<P>().list_by_run(run_id, window, limit).await
    }
}
