use serde::{Deserialize, Serialize};

use super::{Payload, StreamKind};

/// Pilot input: four continuous axes plus three switches.
///
/// Switches are conventionally 0 or 1; only the integer width is enforced.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ControlInput {
    /// Surge.
    pub x: f64,
    /// Sway.
    pub y: f64,
    /// Heave.
    pub z: f64,
    pub yaw: f64,

    pub s1: i16,
    pub s2: i16,
    pub s3: i16,
}

impl Payload for ControlInput {
    const KIND: StreamKind = StreamKind::ControlInput;
}
