//! Client side of control-input ingestion.
//!
//! A [`Producer`] turns pilot input into posted samples. It owns the run it
//! posts into (created lazily on first use), a local sequence counter and a
//! rate gate. It talks to the API through [`TelemetryClient`], so the state
//! machine can be driven without a server.

use std::time::{Duration, Instant, TryFromFloatSecsError};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    config::ProducerConfig,
    models::{ControlInput, NewRun, NewSample},
};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("run {0} no longer exists")]
    RunGone(i64),

    #[error("request rejected with {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("invalid request timeout: {0}")]
    Timeout(#[from] TryFromFloatSecsError),
}

/// The two calls a producer makes against the API.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// Creates a run and returns its identity.
    async fn create_run(&self, run: &NewRun) -> Result<i64, ProducerError>;

    /// Posts one control input. A vanished run is reported as
    /// [`ProducerError::RunGone`].
    async fn post_control_input(&self, sample: &NewSample<ControlInput>) -> Result<(), ProducerError>;
}

#[derive(Deserialize)]
struct Created {
    id: i64,
}

/// [`TelemetryClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    runs_url: String,
    control_inputs_url: String,
}

impl ApiClient {
    pub fn new(config: &ProducerConfig) -> Result<Self, ProducerError> {
        let client = Client::builder()
            .timeout(Duration::try_from_secs_f64(config.timeout_secs)?)
            .build()?;
        let base_url = config.api_base_url.trim_end_matches('/');

        Ok(Self {
            client,
            runs_url: format!("{base_url}{}", config.runs_endpoint),
            control_inputs_url: format!("{base_url}{}", config.control_inputs_endpoint),
        })
    }

    async fn rejected(response: reqwest::Response) -> ProducerError {
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        ProducerError::Rejected { status, detail }
    }
}

#[async_trait]
impl TelemetryClient for ApiClient {
    async fn create_run(&self, run: &NewRun) -> Result<i64, ProducerError> {
        let response = self.client.post(&self.runs_url).json(run).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let created: Created = response.json().await?;
        Ok(created.id)
    }

    async fn post_control_input(&self, sample: &NewSample<ControlInput>) -> Result<(), ProducerError> {
        let response = self
            .client
            .post(&self.control_inputs_url)
            .json(sample)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ProducerError::RunGone(sample.run_id)),
            _ => Err(Self::rejected(response).await),
        }
    }
}

/// What happened to one input handed to [`Producer::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Posted { run_id: i64, seq: i64 },
    /// Arrived too soon after the previous accepted post and was dropped.
    Throttled,
    /// No run could be created; nothing was posted.
    NoRun,
    /// The post failed. State is kept for the next attempt.
    Failed,
}

pub struct Producer<C> {
    client: C,
    template: NewRun,
    run_id: Option<i64>,
    seq: i64,
    min_interval: Duration,
    last_post: Option<Instant>,
}

impl<C: TelemetryClient> Producer<C> {
    pub fn new(client: C, template: NewRun, min_interval: Duration) -> Self {
        Self {
            client,
            template,
            run_id: None,
            seq: 0,
            min_interval,
            last_post: None,
        }
    }

    pub fn from_config(client: C, config: &ProducerConfig) -> Self {
        let mut template = NewRun::new(config.run_name.clone(), config.platform.clone());
        template.vehicle = config.vehicle.clone();
        template.operator = config.operator.clone();

        let producer = Self::new(
            client,
            template,
            Duration::from_millis(config.min_post_interval_ms),
        );
        match config.run_id {
            Some(run_id) => producer.with_run(run_id),
            None => producer,
        }
    }

    /// Posts into an existing run instead of creating one.
    pub fn with_run(mut self, run_id: i64) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn run_id(&self) -> Option<i64> {
        self.run_id
    }

    pub fn seq(&self) -> i64 {
        self.seq
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn process(&mut self, input: ControlInput) -> Outcome {
        self.process_at(Instant::now(), now_us(), input).await
    }

    pub async fn process_at(&mut self, now: Instant, t_us: i64, input: ControlInput) -> Outcome {
        if let Some(last) = self.last_post {
            if now.saturating_duration_since(last) < self.min_interval {
                return Outcome::Throttled;
            }
        }

        let Some(run_id) = self.ensure_run().await else {
            return Outcome::NoRun;
        };

        self.seq += 1;
        let sample = NewSample::new(run_id, t_us, input).with_seq(self.seq);

        match self.client.post_control_input(&sample).await {
            Ok(()) => {
                self.last_post = Some(now);
                Outcome::Posted {
                    run_id,
                    seq: self.seq,
                }
            }
            Err(ProducerError::RunGone(run_id)) => {
                warn!(run_id, "run vanished, a new one will be created");
                self.run_id = None;
                Outcome::Failed
            }
            Err(err) => {
                warn!(run_id, seq = self.seq, error = %err, "failed to post control input");
                Outcome::Failed
            }
        }
    }

    async fn ensure_run(&mut self) -> Option<i64> {
        if let Some(run_id) = self.run_id {
            return Some(run_id);
        }

        match self.client.create_run(&self.template).await {
            Ok(run_id) => {
                info!(run_id, name = %self.template.name, "created run");
                self.run_id = Some(run_id);
                Some(run_id)
            }
            Err(err) => {
                warn!(error = %err, "failed to create run");
                None
            }
        }
    }
}

/// Maps a stick axis from `[-1, 1]` onto `[0, 255]`, truncating.
pub fn map_axis(value: f64) -> i64 {
    ((value + 1.0) * 255.0 / 2.0) as i64
}

/// Wall clock in microseconds since the Unix epoch.
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

/// Raw joystick state as read from the device.
#[derive(Deserialize, Clone, PartialEq, Debug, Default)]
pub struct JoystickSnapshot {
    pub axes: Vec<f64>,
    pub buttons: Vec<i16>,
}

impl JoystickSnapshot {
    /// Left stick drives x/y, the right stick z and yaw. `None` when the
    /// device reports too few axes or buttons.
    pub fn control_input(&self) -> Option<ControlInput> {
        let axis = |i: usize| self.axes.get(i).map(|v| map_axis(*v) as f64);
        let button = |i: usize| self.buttons.get(i).copied();

        Some(ControlInput {
            x: axis(0)?,
            y: axis(1)?,
            z: axis(4)?,
            yaw: axis(3)?,
            s1: button(4)?,
            s2: button(5)?,
            s3: button(0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    #[derive(Default)]
    struct FakeClient {
        next_run: Mutex<i64>,
        create_fails: Mutex<bool>,
        post_results: Mutex<VecDeque<Result<(), ProducerError>>>,
        posted: Mutex<Vec<NewSample<ControlInput>>>,
        created: Mutex<Vec<NewRun>>,
    }

    impl FakeClient {
        fn fail_next_post(&self, err: ProducerError) {
            self.post_results.lock().unwrap().push_back(Err(err));
        }

        fn posted(&self) -> Vec<NewSample<ControlInput>> {
            self.posted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TelemetryClient for FakeClient {
        async fn create_run(&self, run: &NewRun) -> Result<i64, ProducerError> {
            if *self.create_fails.lock().unwrap() {
                return Err(ProducerError::Rejected {
                    status: 500,
                    detail: "down".into(),
                });
            }
            self.created.lock().unwrap().push(run.clone());
            let mut next = self.next_run.lock().unwrap();
            *next += 1;
            Ok(*next)
        }

        async fn post_control_input(&self, sample: &NewSample<ControlInput>) -> Result<(), ProducerError> {
            self.posted.lock().unwrap().push(sample.clone());
            self.post_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn producer() -> Producer<FakeClient> {
        Producer::new(
            FakeClient::default(),
            NewRun::new("controller", "hardware"),
            Duration::from_millis(50),
        )
    }

    fn input() -> ControlInput {
        ControlInput {
            x: 127.0,
            s1: 1,
            ..Default::default()
        }
    }

    #[test]
    fn axis_mapping() {
        assert_eq!(map_axis(-1.0), 0);
        assert_eq!(map_axis(0.0), 127);
        assert_eq!(map_axis(1.0), 255);
    }

    #[test]
    fn snapshot_to_control_input() {
        let snapshot = JoystickSnapshot {
            axes: vec![-1.0, 1.0, 0.0, 0.0, -1.0],
            buttons: vec![1, 0, 0, 0, 1, 0],
        };
        let input = snapshot.control_input().unwrap();
        assert_eq!(input.x, 0.0);
        assert_eq!(input.y, 255.0);
        assert_eq!(input.yaw, 127.0);
        assert_eq!(input.z, 0.0);
        assert_eq!((input.s1, input.s2, input.s3), (1, 0, 1));

        let short = JoystickSnapshot {
            axes: vec![0.0; 4],
            buttons: vec![0; 6],
        };
        assert_eq!(short.control_input(), None);
    }

    #[tokio::test]
    async fn creates_run_lazily_and_counts() {
        let mut producer = producer();
        let start = Instant::now();

        let first = producer.process_at(start, 1_000, input()).await;
        assert_eq!(first, Outcome::Posted { run_id: 1, seq: 1 });

        let second = producer
            .process_at(start + Duration::from_millis(50), 2_000, input())
            .await;
        assert_eq!(second, Outcome::Posted { run_id: 1, seq: 2 });

        assert_eq!(producer.client().created.lock().unwrap().len(), 1);
        let posted = producer.client().posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[1].t_us, 2_000);
        assert_eq!(posted[1].seq, Some(2));
        assert_eq!(posted[1].payload, input());
    }

    #[tokio::test]
    async fn throttles_within_interval() {
        let mut producer = producer();
        let start = Instant::now();

        producer.process_at(start, 0, input()).await;
        let outcome = producer
            .process_at(start + Duration::from_millis(49), 1, input())
            .await;
        assert_eq!(outcome, Outcome::Throttled);
        assert_eq!(producer.seq(), 1);
        assert_eq!(producer.client().posted().len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_state_and_does_not_arm_throttle() {
        let mut producer = producer();
        let start = Instant::now();
        producer.client().fail_next_post(ProducerError::Rejected {
            status: 500,
            detail: "storage".into(),
        });

        assert_eq!(producer.process_at(start, 0, input()).await, Outcome::Failed);
        assert_eq!(producer.run_id(), Some(1));
        assert_eq!(producer.seq(), 1);

        let retry = producer
            .process_at(start + Duration::from_millis(1), 1, input())
            .await;
        assert_eq!(retry, Outcome::Posted { run_id: 1, seq: 2 });
    }

    #[tokio::test]
    async fn vanished_run_is_recreated() {
        let mut producer = producer().with_run(7);
        let start = Instant::now();
        producer.client().fail_next_post(ProducerError::RunGone(7));

        assert_eq!(producer.process_at(start, 0, input()).await, Outcome::Failed);
        assert_eq!(producer.run_id(), None);

        let next = producer.process_at(start, 1, input()).await;
        assert_eq!(next, Outcome::Posted { run_id: 1, seq: 2 });
    }

    #[tokio::test]
    async fn no_run_means_nothing_posted() {
        let mut producer = producer();
        *producer.client().create_fails.lock().unwrap() = true;

        let outcome = producer.process_at(Instant::now(), 0, input()).await;
        assert_eq!(outcome, Outcome::NoRun);
        assert_eq!(producer.seq(), 0);
        assert!(producer.client().posted().is_empty());
    }

    #[test]
    fn unusable_timeout_is_an_error() {
        for timeout_secs in [-1.0, f64::NAN] {
            let config = ProducerConfig {
                timeout_secs,
                ..Default::default()
            };
            let err = ApiClient::new(&config).unwrap_err();
            assert!(matches!(err, ProducerError::Timeout(_)), "{err}");
        }

        assert!(ApiClient::new(&ProducerConfig::default()).is_ok());
    }

    #[test]
    fn config_seeds_template_and_run() {
        let config = ProducerConfig {
            run_id: Some(4),
            vehicle: Some("auv1".into()),
            ..Default::default()
        };
        let producer = Producer::from_config(FakeClient::default(), &config);
        assert_eq!(producer.run_id(), Some(4));
        assert_eq!(producer.template.name, "controller");
        assert_eq!(producer.template.vehicle.as_deref(), Some("auv1"));
        assert_eq!(producer.min_interval, Duration::from_millis(50));
    }
}
