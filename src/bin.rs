use auvlog::{
    config::get_config,
    producer::{ApiClient, JoystickSnapshot, Outcome, Producer},
};
use clap::Parser;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Forwards joystick snapshots, one JSON object per line on stdin, to the
/// telemetry API as control inputs.
///
/// Each line looks like `{"axes": [0.0, -0.2, 0.0, 0.1, 1.0], "buttons": [0, 0, 0, 0, 1, 0]}`.
#[derive(Parser)]
#[command(name = "auvlog-controller")]
#[command(version)]
struct Args {
    /// Post into this run instead of creating one (overrides producer.run_id)
    #[arg(long)]
    run_id: Option<i64>,

    /// API root (overrides producer.api_base_url)
    #[arg(long)]
    api_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("auvlog=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = get_config()?.producer;
    if let Some(run_id) = args.run_id {
        config.run_id = Some(run_id);
    }
    if let Some(api_base_url) = args.api_base_url {
        config.api_base_url = api_base_url;
    }

    let mut producer = Producer::from_config(ApiClient::new(&config)?, &config);
    info!(api = %config.api_base_url, "reading joystick snapshots from stdin");

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let snapshot: JoystickSnapshot = match serde_json::from_str(&line) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "skipping malformed snapshot");
                continue;
            }
        };
        let Some(input) = snapshot.control_input() else {
            debug!(
                axes = snapshot.axes.len(),
                buttons = snapshot.buttons.len(),
                "snapshot has too few axes or buttons"
            );
            continue;
        };

        if let Outcome::Posted { run_id, seq } = producer.process(input).await {
            debug!(run_id, seq, "posted control input");
        }
    }

    info!("stdin closed");
    Ok(())
}
