use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use orchestrator::{AppConfig, OrchestrationState, Orchestrator, Stage};
use seismic::{CalculationRequest, JobId};

#[derive(Parser)]
#[command(name = "orchestrator", about = "Run a tsunami simulation against the TSDHN backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate source parameters and travel times, then run the simulation.
    Submit {
        #[arg(long)]
        magnitude: f64,
        /// Hypocenter depth in km.
        #[arg(long)]
        depth: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Event time (RFC 3339); defaults to now.
        #[arg(long)]
        datetime: Option<DateTime<Utc>>,
    },
    /// Follow a simulation job submitted earlier.
    Resume { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;

    let orchestrator = Orchestrator::from_config(&cfg);
    info!(backend=?orchestrator.backend_info(), poll_secs=cfg.poll_interval.as_secs(), "orchestrator: ready");

    let mut rx = orchestrator.subscribe();
    match cli.command {
        Command::Submit { magnitude, depth, lat, lon, datetime } => {
            let request = CalculationRequest {
                magnitude,
                depth,
                latitude: lat,
                longitude: lon,
                datetime: datetime.unwrap_or_else(Utc::now),
            }
            .validate()?;
            orchestrator.submit(request);
        }
        Command::Resume { job_id } => {
            orchestrator.resume(JobId::from(job_id));
        }
    }

    let last = tokio::select! {
        s = follow(&mut rx) => s?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; cancelling run");
            orchestrator.reset();
            return Ok(());
        }
    };
    orchestrator.shutdown().await;

    report(&cfg, &last)
}

/// Logs every stage/progress change until the run is terminal.
async fn follow(rx: &mut watch::Receiver<OrchestrationState>) -> Result<OrchestrationState> {
    let mut seen = (Stage::Idle, 0u8);
    loop {
        {
            let s = rx.borrow_and_update();
            if (s.stage, s.progress) != seen {
                seen = (s.stage, s.progress);
                info!(stage=?s.stage, progress=s.progress, job_id=?s.job_id, "run: progress");
            }
            if s.is_terminal() {
                return Ok(s.clone());
            }
        }
        rx.changed().await.context("orchestrator went away")?;
    }
}

fn report(cfg: &AppConfig, state: &OrchestrationState) -> Result<()> {
    if let Some(err) = &state.error {
        bail!("calculation failed: {err}");
    }

    if let Some(p) = &state.source_params {
        println!(
            "source: length={} width={} dislocation={} moment={:e}",
            p.length, p.width, p.dislocation, p.seismic_moment
        );
    }
    if let Some(job) = &state.job_id {
        println!("job: {job}");
    }
    match state.job_status.as_ref().and_then(|j| j.download_url.as_deref()) {
        Some(url) if url.starts_with('/') => {
            println!("report: {}{}", cfg.api_url.trim_end_matches('/'), url)
        }
        Some(url) => println!("report: {url}"),
        None => println!("report: (no download link)"),
    }
    Ok(())
}
