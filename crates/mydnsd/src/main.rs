// # mydnsd - MyDNS update daemon
//
// Thin front-end over mydns-core: it reads configuration from the environment,
// drives the UpdateScheduler, and prints the history on exit. No update logic
// lives here.
//
// ## Configuration
//
// ### Credentials
// - `MYDNS_MASTER_ID`: MyDNS master ID (required)
// - `MYDNS_PASSWORD`: MyDNS password (required)
//
// ### Schedule
// - `MYDNS_UPDATE_SPAN`: Seconds between updates. When unset, run a single update and exit.
//
// ### Endpoints
// - `MYDNS_LOOKUP_URL`: Public IP lookup service (default: http://jsonip.com/)
// - `MYDNS_UPDATE_URL`: Provider endpoint (default: http://www.mydns.jp/directip.html)
// - `MYDNS_HTTP_TIMEOUT_SECS`: Per-request timeout, 1-300 (default: 30)
//
// ### Logging
// - `MYDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export MYDNS_MASTER_ID=mydns123456
// export MYDNS_PASSWORD=your_password
// export MYDNS_UPDATE_SPAN=3600
//
// mydnsd
// ```

use anyhow::{Context, Result};
use mydns_core::{
    ClientConfig, Credentials, HistoryLog, SchedulerConfig, SchedulerEvent, UpdateScheduler,
    UpdateSpan, UpdateStatus,
};
use mydns_http::DnsUpdateClient;
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown (single update succeeded, or interval mode stopped by signal)
/// - 1: Configuration or startup error
/// - 2: Runtime error, or the single update failed
#[derive(Debug, Clone, Copy)]
enum MydnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<MydnsExitCode> for ExitCode {
    fn from(code: MydnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    credentials: Credentials,
    update_span: Option<UpdateSpan>,
    client: ClientConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let master_id = env::var("MYDNS_MASTER_ID").context("MYDNS_MASTER_ID is required")?;
        let password = env::var("MYDNS_PASSWORD").context("MYDNS_PASSWORD is required")?;

        let update_span = match env::var("MYDNS_UPDATE_SPAN") {
            Ok(value) => Some(
                value
                    .trim()
                    .parse::<UpdateSpan>()
                    .context("MYDNS_UPDATE_SPAN is invalid")?,
            ),
            Err(_) => None,
        };

        let mut client = ClientConfig::default();
        if let Ok(url) = env::var("MYDNS_LOOKUP_URL") {
            client.lookup_url = url;
        }
        if let Ok(url) = env::var("MYDNS_UPDATE_URL") {
            client.update_url = url;
        }
        if let Ok(secs) = env::var("MYDNS_HTTP_TIMEOUT_SECS") {
            client.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("MYDNS_HTTP_TIMEOUT_SECS is not a number: {}", secs))?;
        }

        Ok(Self {
            credentials: Credentials::new(master_id, password),
            update_span,
            client,
            log_level: env::var("MYDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.credentials
            .validate()
            .context("Set MYDNS_MASTER_ID and MYDNS_PASSWORD to your MyDNS login")?;

        self.client.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "MYDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return MydnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return MydnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return MydnsExitCode::ConfigError.into();
    }

    info!("Starting mydnsd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return MydnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                MydnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<MydnsExitCode> {
    let client = DnsUpdateClient::new(config.client)?;
    let history = HistoryLog::new();

    let (scheduler, mut event_rx) = UpdateScheduler::new(
        Box::new(client),
        history.clone(),
        config.credentials,
        SchedulerConfig::default(),
    )?;

    // Drain scheduler events so the channel never fills
    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SchedulerEvent::TickDropped => debug!("Tick skipped: previous update still running"),
                other => debug!("Scheduler event: {:?}", other),
            }
        }
    });

    let code = match config.update_span {
        None => {
            info!("Running a single update");
            let result = scheduler.trigger_once().await?;
            match result.status {
                UpdateStatus::Success => MydnsExitCode::CleanShutdown,
                UpdateStatus::Failure => MydnsExitCode::RuntimeError,
            }
        }
        Some(span) => {
            scheduler.start_interval(span)?;
            info!("Updating every {}; press Ctrl-C to stop", span);

            let signal = wait_for_shutdown().await?;
            info!("Received shutdown signal: {}", signal);

            scheduler.shutdown().await;
            MydnsExitCode::CleanShutdown
        }
    };

    drop(scheduler);
    let _ = events.await;

    print_history(&history);
    Ok(code)
}

/// Print the history newest-first
fn print_history(history: &HistoryLog) {
    for result in history.snapshot() {
        println!(
            "{}\t{}",
            result.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
            result.status
        );
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
