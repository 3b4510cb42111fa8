use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "auvlog.toml";
pub const ENV_PREFIX: &str = "AUVLOG_";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

/// Where the telemetry lives.
///
/// `url` picks the engine: `mem://` keeps everything in memory,
/// `surrealkv://<path>` writes to an embedded store and `ws://host:port`
/// talks to a remote SurrealDB server.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "surrealkv://data/auvlog".into(),
            namespace: "auv".into(),
            database: "telemetry".into(),
            username: None,
            password: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ProducerConfig {
    pub api_base_url: String,
    pub runs_endpoint: String,
    pub control_inputs_endpoint: String,
    pub timeout_secs: f64,
    /// Minimum spacing between two accepted posts. 50ms caps the producer at 20Hz.
    pub min_post_interval_ms: u64,
    /// Reuse an existing run instead of creating one on first post.
    pub run_id: Option<i64>,
    pub run_name: String,
    pub platform: String,
    pub vehicle: Option<String>,
    pub operator: Option<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            runs_endpoint: "/runs".into(),
            control_inputs_endpoint: "/inputs".into(),
            timeout_secs: 3.0,
            min_post_interval_ms: 50,
            run_id: None,
            run_name: "controller".into(),
            platform: "hardware".into(),
            vehicle: None,
            operator: None,
        }
    }
}

impl Config {
    /// Defaults, then `auvlog.toml`, then `AUVLOG_*` environment variables
    /// (`AUVLOG_DATABASE__URL` sets `database.url`).
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

pub fn get_config() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Ok(Config::figment().extract()?)
}
