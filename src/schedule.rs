//! A module for running probes on a fixed interval.
//!
//! The [`Schedule`] owns every probe of the process. On each tick it spawns
//! one task per probe and immediately goes back to sleep: it never waits for
//! the spawned runs. A probe that outlives the interval therefore overlaps
//! with its own next run; overlapping runs only race on their gauges, where
//! the last write wins.
//!
//! # Example
//!
//! ```rust, no_run
//! use std::time::Duration;
//!
//! use limon_connectivity::metrics::Registry;
//! use limon_connectivity::probe::models::{HttpConfig, Network, Probe, ProbeConfig};
//! use limon_connectivity::schedule::Schedule;
//!
//! async fn run() {
//!   let registry = Registry::new();
//!   let probe = Probe::new(
//!     ProbeConfig::Http(HttpConfig {
//!       url: "https://example.org/".into(),
//!       network: Network::Tcp,
//!       redirect: true,
//!     }),
//!     &registry,
//!   )
//!   .unwrap();
//!
//!   Schedule::new(vec![probe], Duration::from_secs(10))
//!     .with_timeout(Duration::from_secs(5))
//!     .run()
//!     .await;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::Dispatch;

use crate::context::Context;
use crate::probe::models::Probe;

/// A fixed-interval, fire-and-forget probe scheduler.
pub struct Schedule {
  probes: Vec<Arc<Probe>>,
  interval: Duration,
  timeout: Option<Duration>,
  logger: Option<Dispatch>,
}

impl Schedule {
  /// Create a schedule running every probe once per `interval`.
  ///
  /// # Panics
  ///
  /// Panics if `interval` is zero. Callers loading the interval from
  /// configuration rely on [`Settings::validate`] rejecting it first.
  ///
  /// [`Settings::validate`]: crate::settings::Settings::validate
  pub fn new(probes: Vec<Probe>, interval: Duration) -> Self {
    assert!(!interval.is_zero(), "schedule interval must be non-zero");

    Self {
      probes: probes.into_iter().map(Arc::new).collect(),
      interval,
      timeout: None,
      logger: None,
    }
  }

  /// Bound every run with a deadline of `timeout` after its tick.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Log through `logger` instead of discarding everything.
  pub fn with_logger(mut self, logger: Dispatch) -> Self {
    self.logger = Some(logger);
    self
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  pub fn len(&self) -> usize {
    self.probes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.probes.is_empty()
  }

  /// Context handed to the runs of one tick.
  fn context(&self) -> Context {
    let mut ctx = Context::new();

    if let Some(logger) = &self.logger {
      ctx = ctx.with_logger(logger.clone());
    }
    if let Some(timeout) = self.timeout {
      ctx = ctx.with_timeout(timeout);
    }

    ctx
  }

  /// Spawn one run of every probe and return without waiting for them.
  ///
  /// The returned handles may be dropped; the runs keep going detached.
  pub fn dispatch(&self) -> Vec<JoinHandle<()>> {
    let ctx = self.context();

    tracing::dispatcher::with_default(&ctx.logger(), || {
      tracing::info!(probes = self.probes.len(), "Loop through probes");
    });

    self
      .probes
      .iter()
      .map(|probe| {
        let probe = Arc::clone(probe);
        let ctx = ctx.clone();

        tokio::spawn(async move { probe.run(&ctx).await })
      })
      .collect()
  }

  /// Dispatch all probes on every tick, forever.
  ///
  /// The first tick fires immediately. This future never completes; the
  /// process is expected to be stopped from outside.
  pub async fn run(self) {
    let mut ticker = time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;
      self.dispatch();
    }
  }
}
