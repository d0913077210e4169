use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use limon_connectivity::logging;
use limon_connectivity::metrics::Registry;
use limon_connectivity::probe::models::Probe;
use limon_connectivity::schedule::Schedule;
use limon_connectivity::server;
use limon_connectivity::settings::Settings;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Opt {
  /// Configuration file
  #[arg(short, long, env = "CONNECTIVITY_CONFIG")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
  let opt = Opt::parse();

  let settings = Settings::load(&opt.config)
    .with_context(|| format!("Failed to configure from {}", opt.config.display()))?;

  let logger = logging::init(&settings.logging).context("Failed to create logger")?;
  tracing::dispatcher::set_global_default(logger.clone()).context("Failed to install logger")?;

  tracing::debug!(?settings, "Initializing");

  let registry = Registry::new();
  let mut probes = Vec::new();

  for config in settings.probes() {
    let probe = Probe::new(config, &registry).context("Failed to initialize probe")?;
    tracing::info!(kind = probe.kind(), probe = %probe, "Initialize probe");
    probes.push(probe);
  }

  if probes.is_empty() {
    tracing::info!("No probes specified");
  }

  let address = settings.address()?;
  let listener = TcpListener::bind(address)
    .await
    .with_context(|| format!("Failed to bind {address}"))?;

  tracing::info!(%address, "Start http server for metrics and health");
  tokio::spawn(async move {
    if let Err(error) = server::serve(listener, registry).await {
      tracing::error!(%error, "Metrics server failed");
    }
  });

  let mut schedule = Schedule::new(probes, settings.interval()).with_logger(logger);
  if let Some(timeout) = settings.timeout() {
    schedule = schedule.with_timeout(timeout);
  }

  tracing::info!(interval = ?schedule.interval(), "Initialized");
  schedule.run().await;

  Ok(())
}
