use serde::{Deserialize, Serialize};

use super::{Payload, StreamKind};

/// IMU and magnetometer reading.
///
/// Acceleration in m/s², angular rate in rad/s, magnetic field in µT.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ImuSample {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,

    pub gx: f64,
    pub gy: f64,
    pub gz: f64,

    pub mx: f64,
    pub my: f64,
    pub mz: f64,

    #[serde(default)]
    pub temp_c: Option<f64>,
}

impl Payload for ImuSample {
    const KIND: StreamKind = StreamKind::Imu;
}
