use serde::{Deserialize, Serialize};
use surrealdb::Datetime;

/// A persisted observation of one stream.
///
/// On the wire the payload fields sit next to the common ones, e.g.
/// `{"id": 3, "run_id": 1, "t_us": 1000, "seq": null, "depth_m": 4.2, ...}`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Sample<P> {
    pub id: i64,
    pub run_id: i64,

    /// Vehicle clock in microseconds. Neither unique nor monotonic.
    pub t_us: i64,
    /// Producer hint, never used for ordering.
    pub seq: Option<i64>,

    #[serde(flatten)]
    pub payload: P,

    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// An incoming sample before the store assigned its identity.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct NewSample<P> {
    pub run_id: i64,
    pub t_us: i64,
    #[serde(default)]
    pub seq: Option<i64>,

    #[serde(flatten)]
    pub payload: P,
}

impl<P> NewSample<P> {
    pub fn new(run_id: i64, t_us: i64, payload: P) -> Self {
        Self {
            run_id,
            t_us,
            seq: None,
            payload,
        }
    }

    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = Some(seq);
        self
    }
}
