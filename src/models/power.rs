use serde::{Deserialize, Serialize};

use super::{Payload, StreamKind};

/// Telemetry of the three battery packs.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct PowerSample {
    pub bat1_voltage_v: f64,
    pub bat1_current_a: f64,
    pub bat1_temp_c: f64,

    pub bat2_voltage_v: f64,
    pub bat2_current_a: f64,
    pub bat2_temp_c: f64,

    pub bat3_voltage_v: f64,
    pub bat3_current_a: f64,
    pub bat3_temp_c: f64,
}

impl Payload for PowerSample {
    const KIND: StreamKind = StreamKind::Power;
}
