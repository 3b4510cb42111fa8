use serde::{Deserialize, Serialize};
use surrealdb::Datetime;

use crate::error::{TelemetryError, TelemetryResult};

pub const NAME_MAX_CHARS: usize = 128;
pub const PLATFORM_MAX_CHARS: usize = 32;
pub const IDENTIFIER_MAX_CHARS: usize = 64;

/// One mission or simulator session. Every sample belongs to exactly one run.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Run {
    pub id: i64,

    pub name: String,
    pub platform: String,
    pub vehicle: Option<String>,
    pub operator: Option<String>,

    pub notes: Option<String>,
    /// Opaque configuration blob, stored verbatim.
    pub config_json: Option<String>,

    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct NewRun {
    pub name: String,
    pub platform: String,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub config_json: Option<String>,
}

impl NewRun {
    pub fn new(name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            ..Default::default()
        }
    }

    pub fn with_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.vehicle = Some(vehicle.into());
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_config_json(mut self, config_json: impl Into<String>) -> Self {
        self.config_json = Some(config_json.into());
        self
    }

    /// `name` and `platform` are mandatory; identifiers are length-bounded,
    /// free text is not.
    pub fn validate(&self) -> TelemetryResult<()> {
        required("name", &self.name, NAME_MAX_CHARS)?;
        required("platform", &self.platform, PLATFORM_MAX_CHARS)?;
        optional("vehicle", self.vehicle.as_deref(), IDENTIFIER_MAX_CHARS)?;
        optional("operator", self.operator.as_deref(), IDENTIFIER_MAX_CHARS)?;
        Ok(())
    }
}

fn required(field: &str, value: &str, max: usize) -> TelemetryResult<()> {
    if value.trim().is_empty() {
        return Err(TelemetryError::validation(format!("{field} must not be empty")));
    }
    optional(field, Some(value), max)
}

fn optional(field: &str, value: Option<&str>, max: usize) -> TelemetryResult<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(TelemetryError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}
