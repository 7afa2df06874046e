use anyhow::{Context, Result};
use clap::Parser;
use speechflow_core::{AppConfig, DeliveryMode, RecognizeRequest};
use speechflow_engine::SessionHost;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speechflow", about = "Streaming speech recognition sessions")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "speechflow.toml")]
    config: PathBuf,

    /// JSON lines of recognize requests, sent in order
    #[arg(short, long)]
    requests: PathBuf,

    /// Collect every response and print them once the session ends
    #[arg(long)]
    buffered: bool,
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::load_from_file(path)
        .with_context(|| format!("failed to load config from {path:?}"))
}

fn read_requests(path: &Path) -> Result<Vec<RecognizeRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read requests from {path:?}"))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid request on line {} of {path:?}", n + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let requests = read_requests(&cli.requests)?;
    let mode = if cli.buffered {
        DeliveryMode::Buffered
    } else {
        config.session.delivery
    };
    tracing::info!(requests = requests.len(), ?mode, "speechflow starting");

    let host = SessionHost::from_config(&config);
    let mut handle = host
        .open_session(mode)
        .with_context(|| format!("failed to open session with engine '{}'", host.engine_name()))?;

    let mut responses = handle
        .take_response_receiver()
        .context("response receiver already taken")?;
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(response) = responses.recv().await {
            match serde_json::to_string(&response) {
                Ok(line) => {
                    let _ = writeln!(stdout, "{line}");
                }
                Err(e) => tracing::error!("failed to encode response: {e}"),
            }
        }
    });

    for request in requests {
        if !handle.send(request) {
            tracing::warn!("session stopped taking requests");
            break;
        }
    }

    let outcome = handle.join().await;
    printer.await.context("response printer failed")?;

    if let Some(response) = outcome.response().filter(|r| !r.responses.is_empty()) {
        println!(
            "{}",
            serde_json::to_string_pretty(response).context("failed to encode response")?
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(outcome.metadata()).context("failed to encode metadata")?
    );

    match outcome.status() {
        None => Ok(()),
        Some(status) => anyhow::bail!("session failed ({}): {}", status.code, status.message),
    }
}
