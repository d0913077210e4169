//! Execution context handed to every probe run.
//!
//! A [`Context`] carries an optional deadline and an optional logger. Probes
//! never keep a context beyond a single run. When no logger is bound, a no-op
//! [`Dispatch`] is used so that probes never depend on logging being
//! configured.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, error::Elapsed};
use tracing::Dispatch;

/// Deadline and logger for one probe execution.
#[derive(Clone, Debug, Default)]
pub struct Context {
  logger: Option<Dispatch>,
  deadline: Option<Instant>,
}

impl Context {
  /// Create a context with neither a logger nor a deadline.
  pub fn new() -> Self {
    Self::default()
  }

  /// Bind a logger to the context.
  pub fn with_logger(mut self, logger: Dispatch) -> Self {
    self.logger = Some(logger);
    self
  }

  /// Set an absolute deadline.
  pub fn with_deadline(mut self, deadline: Instant) -> Self {
    self.deadline = Some(deadline);
    self
  }

  /// Set a deadline relative to now.
  pub fn with_timeout(self, timeout: Duration) -> Self {
    self.with_deadline(Instant::now() + timeout)
  }

  /// The bound logger, or a dispatcher that discards everything.
  pub fn logger(&self) -> Dispatch {
    self.logger.clone().unwrap_or_else(Dispatch::none)
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// Time left until the deadline, `None` when unbounded.
  ///
  /// An expired deadline yields [`Duration::ZERO`].
  pub fn remaining(&self) -> Option<Duration> {
    self
      .deadline
      .map(|deadline| deadline.saturating_duration_since(Instant::now()))
  }

  /// Drive `future` to completion, aborting it once the deadline passes.
  pub async fn bounded<F: Future>(&self, future: F) -> Result<F::Output, Elapsed> {
    match self.deadline {
      Some(deadline) => time::timeout_at(deadline, future).await,
      None => Ok(future.await),
    }
  }
}
