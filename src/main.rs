use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::{debug, error, info, warn};
use logpulse::alerts::AlertManager;
use logpulse::config::Config;
use logpulse::dashboard::Dashboard;
use logpulse::error::ConfigError;
use logpulse::feed::{FeedClient, FeedEvent};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// How long the dashboard loop waits for a feed event before checking timers
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command-line arguments for the log monitor
#[derive(Parser)]
#[command(
    name = "logpulse",
    about = "Real-time log monitoring dashboard engine",
    long_about = "Connects to a streaming log feed, keeps a bounded buffer of recent entries and \
                  periodically prints per-application health, error trends, detected patterns \
                  and top errors as JSON."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Feed address, overriding the configuration file
    #[arg(short, long, value_name = "HOST:PORT")]
    address: Option<String>,

    /// Write the buffered logs as JSON to this file on shutdown
    #[arg(short, long, value_name = "FILE")]
    export: Option<PathBuf>,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(ref address) = self.address {
            if address.trim().is_empty() {
                return Err("Feed address must not be empty".to_string());
            }
        }

        if let Some(ref export_path) = self.export {
            if export_path.is_dir() {
                return Err(format!(
                    "Export path is a directory: {}",
                    export_path.display()
                ));
            }
        }

        Ok(())
    }
}

/// Load configuration from file or use defaults
///
/// A missing file or an invalid one is reported and replaced by the defaults.
fn load_config(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(ConfigError::ReadError(e)) => {
                    warn!("Configuration file not found or unreadable ({}), using defaults", e);
                    Config::default()
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path.display(), e);
                    warn!("Using default configuration due to invalid config file");
                    Config::default()
                }
            }
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    }
}

/// Owns the feed client, the dashboard and the alert manager
///
/// The feed client runs on its own thread and forwards events over a channel;
/// this struct's loop is the only writer of the dashboard.
struct LogMonitor {
    dashboard: Dashboard,
    alert_manager: Option<AlertManager>,
    feed_client: FeedClient,
    event_receiver: Receiver<FeedEvent>,
    shutdown_sender: Sender<()>,
    shutdown_receiver: Receiver<()>,
    render_interval: Duration,
}

impl LogMonitor {
    fn new(config: &Config) -> Result<Self, ConfigError> {
        info!("Initializing log monitor for feed at {}", config.feed.address);

        let (event_sender, event_receiver) = mpsc::channel();
        let (shutdown_sender, shutdown_receiver) = mpsc::channel();

        let dashboard = Dashboard::new(config.dashboard_settings(), config.detectors()?);
        let feed_client = FeedClient::new(config.feed.address.clone(), config.feed.settings(), event_sender);

        let alert_manager = if config.alerts.enabled {
            Some(AlertManager::with_sink(
                config.alerts.rate_limit_per_minute,
                config.alerts.max_queue_size,
                Box::new(logpulse::alerts::LogAlertSink),
            ))
        } else {
            info!("Alerting disabled");
            None
        };

        Ok(Self {
            dashboard,
            alert_manager,
            feed_client,
            event_receiver,
            shutdown_sender,
            shutdown_receiver,
            render_interval: Duration::from_secs(config.output.render_interval_seconds),
        })
    }

    fn shutdown_sender(&self) -> Sender<()> {
        self.shutdown_sender.clone()
    }

    /// Process feed events and render snapshots until a shutdown signal arrives
    fn run(&mut self) -> anyhow::Result<()> {
        self.feed_client.start();
        let mut last_render = Instant::now();

        loop {
            if self.shutdown_receiver.try_recv().is_ok() {
                info!("Shutdown signal received");
                break;
            }

            match self.event_receiver.recv_timeout(EVENT_POLL_INTERVAL) {
                Ok(event) => self.dashboard.handle_event(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Feed event channel disconnected");
                    break;
                }
            }

            if last_render.elapsed() >= self.render_interval {
                self.render()?;
                last_render = Instant::now();
            }
        }

        Ok(())
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let now = Utc::now();
        let snapshot = self.dashboard.snapshot(now);
        let line = serde_json::to_string(&snapshot).context("Failed to serialize dashboard snapshot")?;
        println!("{}", line);

        if let Some(alert_manager) = self.alert_manager.as_mut() {
            match alert_manager.evaluate(&snapshot.service_status, now) {
                Ok(0) => {}
                Ok(delivered) => debug!("Delivered {} alerts", delivered),
                Err(e) => error!("Alert evaluation failed: {}", e),
            }
        }
        Ok(())
    }

    fn stop(&mut self, export: Option<&Path>) -> anyhow::Result<()> {
        info!("Stopping log monitor");

        if let Err(e) = self.feed_client.stop() {
            error!("Failed to stop feed client: {}", e);
        }

        if let Some(path) = export {
            export_logs(&self.dashboard, path)?;
        }
        Ok(())
    }
}

fn export_logs(dashboard: &Dashboard, path: &Path) -> anyhow::Result<()> {
    let json = dashboard.export_json().context("Failed to serialize buffered logs")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write export file {}", path.display()))?;
    info!("Exported {} log entries to {}", dashboard.logs().len(), path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting logpulse");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let mut config = load_config(cli.config.as_deref());
    if let Some(ref address) = cli.address {
        config.feed.address = address.clone();
    }

    let mut monitor = LogMonitor::new(&config).context("Failed to initialize log monitor")?;

    let shutdown_sender = monitor.shutdown_sender();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .context("Error setting SIGINT handler for graceful shutdown")?;

    info!("logpulse is running. Press Ctrl+C to stop.");

    let result = monitor.run();
    monitor.stop(cli.export.as_deref())?;
    result?;

    info!("logpulse shutdown complete");
    Ok(())
}
