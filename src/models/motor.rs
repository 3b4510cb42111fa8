use serde::{Deserialize, Serialize};

use super::{check_channels, Payload, StreamKind};
use crate::error::TelemetryResult;

/// Output of the eight thruster channels, each in `[0, 255]`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct MotorOutput {
    pub m1: i64,
    pub m2: i64,
    pub m3: i64,
    pub m4: i64,
    pub m5: i64,
    pub m6: i64,
    pub m7: i64,
    pub m8: i64,
}

impl MotorOutput {
    pub fn uniform(value: i64) -> Self {
        Self {
            m1: value,
            m2: value,
            m3: value,
            m4: value,
            m5: value,
            m6: value,
            m7: value,
            m8: value,
        }
    }
}

impl Payload for MotorOutput {
    const KIND: StreamKind = StreamKind::Motor;

    fn validate(&self) -> TelemetryResult<()> {
        check_channels(&[
            ("m1", self.m1),
            ("m2", self.m2),
            ("m3", self.m3),
            ("m4", self.m4),
            ("m5", self.m5),
            ("m6", self.m6),
            ("m7", self.m7),
            ("m8", self.m8),
        ])
    }
}
