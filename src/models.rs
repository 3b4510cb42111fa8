use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{TelemetryError, TelemetryResult};

pub mod depth;
pub mod imu;
pub mod inputs;
pub mod motor;
pub mod power;
pub mod run;
pub mod sample;
pub mod servo;

pub use depth::DepthSample;
pub use imu::ImuSample;
pub use inputs::ControlInput;
pub use motor::MotorOutput;
pub use power::PowerSample;
pub use run::{NewRun, Run};
pub use sample::{NewSample, Sample};
pub use servo::ServoOutput;

/// The six telemetry streams a run can carry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StreamKind {
    Imu,
    Depth,
    Power,
    Motor,
    Servo,
    ControlInput,
}

impl StreamKind {
    pub const ALL: [StreamKind; 6] = [
        StreamKind::Imu,
        StreamKind::Depth,
        StreamKind::Power,
        StreamKind::Motor,
        StreamKind::Servo,
        StreamKind::ControlInput,
    ];

    /// Storage table holding this stream's rows.
    pub const fn table(self) -> &'static str {
        match self {
            StreamKind::Imu => "imu_sample",
            StreamKind::Depth => "depth_sample",
            StreamKind::Power => "power_sample",
            StreamKind::Motor => "motor_output",
            StreamKind::Servo => "servo_output",
            StreamKind::ControlInput => "control_input",
        }
    }

    /// HTTP path prefix the stream is served under.
    pub const fn route(self) -> &'static str {
        match self {
            StreamKind::Imu => "/imu",
            StreamKind::Depth => "/depth",
            StreamKind::Power => "/power",
            StreamKind::Motor => "/motor",
            StreamKind::Servo => "/servo",
            StreamKind::ControlInput => "/inputs",
        }
    }

    pub const fn plural(self) -> &'static str {
        match self {
            StreamKind::Imu => "IMU samples",
            StreamKind::Depth => "depth samples",
            StreamKind::Power => "power samples",
            StreamKind::Motor => "motor outputs",
            StreamKind::Servo => "servo outputs",
            StreamKind::ControlInput => "control inputs",
        }
    }
}

/// Kind-specific part of a sample.
///
/// Implementors only describe their fields and numeric domain; inserting,
/// picking the latest row and range scans are shared by every kind.
pub trait Payload:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
    const KIND: StreamKind;

    /// Checks the payload against the stream's numeric domain.
    fn validate(&self) -> TelemetryResult<()> {
        Ok(())
    }
}

pub(crate) const CHANNEL_RANGE: std::ops::RangeInclusive<i64> = 0..=255;

/// Rejects the first channel that falls outside `[0, 255]`.
pub(crate) fn check_channels(channels: &[(&str, i64)]) -> TelemetryResult<()> {
    match channels
        .iter()
        .find(|(_, value)| !CHANNEL_RANGE.contains(value))
    {
        Some((name, value)) => Err(TelemetryError::validation(format!(
            "{name} must be within [0, 255], got {value}"
        ))),
        None => Ok(()),
    }
}
