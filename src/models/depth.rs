use serde::{Deserialize, Serialize};

use super::{Payload, StreamKind};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct DepthSample {
    pub depth_m: f64,
    #[serde(default)]
    pub pressure_pa: Option<f64>,
    #[serde(default)]
    pub temp_c: Option<f64>,
}

impl DepthSample {
    pub fn at(depth_m: f64) -> Self {
        Self {
            depth_m,
            ..Default::default()
        }
    }
}

impl Payload for DepthSample {
    const KIND: StreamKind = StreamKind::Depth;
}
