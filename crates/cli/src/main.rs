use std::pin::pin;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use codexaudit_client::api::JobsApi;
use codexaudit_client::config::ClientConfig;
use codexaudit_client::events::SessionEvent;
use codexaudit_client::session::{ScanSession, SubmitOutcome};
use codexaudit_core::scan::JobHandle;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

use output::Renderer;

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "codexaudit", version, about = "Run a CodexAudit repository scan")]
struct Cli {
    /// Base URL of the scan backend. Overrides `API_URL`.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print every session event as a JSON line.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a repository and follow the scan until it finishes.
    Scan {
        /// Repository URL, e.g. `github.com/owner/repo`.
        repo_url: String,
    },
    /// Follow a job that is already running.
    Watch {
        /// Job identifier returned when the scan was started.
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codexaudit=info,codexaudit_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "codexaudit failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match cli.api_url.as_deref() {
        Some(url) => ClientConfig::from_api_url(url)?,
        None => ClientConfig::from_env()?,
    };
    tracing::debug!(api_url = %config.api_url, "Configuration loaded");

    let session = ScanSession::from_config(&config);
    let mut events = session.subscribe();
    let renderer = Renderer::new(cli.json);

    match cli.command {
        Command::Scan { repo_url } => match session.start_scan(&repo_url).await {
            Ok(SubmitOutcome::Started(_)) => {}
            Ok(SubmitOutcome::Ignored) => anyhow::bail!("scan was not started"),
            Err(_) => {
                // The failure is already on the event stream.
                while let Ok(event) = events.try_recv() {
                    renderer.event(&event)?;
                }
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Watch { job_id } => session.watch_job(JobHandle::new(job_id)),
    }

    follow(&session, &mut events, &renderer).await
}

/// Render events until the job reaches a terminal state or the user
/// interrupts.
async fn follow<A: JobsApi>(
    session: &ScanSession<A>,
    events: &mut broadcast::Receiver<SessionEvent>,
    renderer: &Renderer,
) -> anyhow::Result<ExitCode> {
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                session.reset();
                while let Ok(event) = events.try_recv() {
                    renderer.event(&event)?;
                }
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
            event = events.recv() => match event {
                Ok(event) => {
                    renderer.event(&event)?;
                    match event {
                        SessionEvent::JobCompleted { .. } => return Ok(ExitCode::SUCCESS),
                        e if e.is_terminal() => return Ok(ExitCode::FAILURE),
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session event stream lagged");
                }
                Err(RecvError::Closed) => anyhow::bail!("session event stream closed"),
            }
        }
    }
}
