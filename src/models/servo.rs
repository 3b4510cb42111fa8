use serde::{Deserialize, Serialize};

use super::{check_channels, Payload, StreamKind};
use crate::error::TelemetryResult;

/// Output of the three servo channels, each in `[0, 255]`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ServoOutput {
    pub s1: i64,
    pub s2: i64,
    pub s3: i64,
}

impl Payload for ServoOutput {
    const KIND: StreamKind = StreamKind::Servo;

    fn validate(&self) -> TelemetryResult<()> {
        check_channels(&[("s1", self.s1), ("s2", self.s2), ("s3", self.s3)])
    }
}
