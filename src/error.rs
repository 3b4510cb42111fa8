//! Error taxonomy shared by the registry, the stream stores and the gateways.

/// Message of every error about a missing run.
pub(crate) const RUN_NOT_FOUND: &str = "Run not found";

/// Result type alias using [`TelemetryError`].
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Everything the telemetry core can fail with.
///
/// Validation failures are always raised before anything is written, so a
/// `Validation` error never leaves partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Malformed or out-of-domain input.
    #[error("{0}")]
    Validation(String),

    /// Unknown run, or a "latest" selection without candidates.
    #[error("{0}")]
    NotFound(String),

    /// Failure reported by the storage engine, passed through untranslated.
    #[error("storage error: {0}")]
    Storage(#[from] surrealdb::Error),

    /// The identity counter of a table answered without a value.
    #[error("identity counter for {0} returned no value")]
    MissingIdentity(&'static str),
}

impl TelemetryError {
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// The error raised whenever a referenced run does not exist.
    #[must_use]
    pub fn run_not_found() -> Self {
        Self::NotFound(RUN_NOT_FOUND.to_owned())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// A read or write conflict the engine reports as safe to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(err) if is_conflict(err))
    }
}

pub(crate) fn is_conflict(err: &surrealdb::Error) -> bool {
    err.to_string().contains("can be retried")
}
