//! A module providing the metric registry shared by all probes.
//!
//! The [`Registry`] is an explicit object: probes receive it at construction
//! time, bind the gauges they need once and keep only those handles. The
//! exposition endpoint reads the very same registry through
//! [`Registry::encode`].
//!
//! # Example
//!
//! ```rust
//! use limon_connectivity::metrics::{Desc, Registry};
//!
//! const UP: Desc = Desc {
//!   name: "example_up",
//!   help: "Example gauge",
//!   labels: &["host"],
//! };
//!
//! let registry = Registry::new();
//! let gauge = registry.gauge(&UP, &["localhost"]).unwrap();
//! gauge.set(1.0);
//!
//! assert_eq!(registry.gauge(&UP, &["localhost"]).unwrap().get(), 1.0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prometheus::{Encoder, Gauge, GaugeVec, Opts, TextEncoder};
use thiserror::Error;

/// Static description of a gauge family: its name, help text and label schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Desc {
  /// Stable metric name.
  pub name: &'static str,

  /// Help text shown in the exposition format.
  pub help: &'static str,

  /// Label names, in the order values are passed to [`Registry::gauge`].
  pub labels: &'static [&'static str],
}

/// Errors raised while registering or rendering metrics.
#[derive(Error, Debug)]
pub enum MetricsError {
  /// The family already exists with another label schema.
  #[error("Metric '{name}' is already registered with labels {existing:?}")]
  SchemaMismatch {
    name: &'static str,
    existing: &'static [&'static str],
  },

  /// Any error reported by the underlying prometheus registry.
  #[error("Prometheus error: {0}")]
  Prometheus(#[from] prometheus::Error),

  /// The rendered text is not valid UTF-8.
  #[error("Encoded metrics are not valid UTF-8: {0}")]
  Utf8(#[from] std::string::FromUtf8Error),
}

/// A create-or-fetch gauge registry backed by [`prometheus::Registry`].
///
/// Cloning is cheap and every clone shares the same metric families.
#[derive(Clone, Default)]
pub struct Registry {
  inner: prometheus::Registry,
  families: Arc<Mutex<HashMap<&'static str, (Desc, GaugeVec)>>>,
}

impl Registry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Get the gauge of `desc` for the given label values, creating the
  /// family on first use.
  ///
  /// Label values are matched positionally against [`Desc::labels`].
  pub fn gauge(&self, desc: &Desc, values: &[&str]) -> Result<Gauge, MetricsError> {
    let mut families = self
      .families
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some((existing, family)) = families.get(desc.name) {
      if existing.labels != desc.labels {
        return Err(MetricsError::SchemaMismatch {
          name: desc.name,
          existing: existing.labels,
        });
      }

      return Ok(family.get_metric_with_label_values(values)?);
    }

    let family = GaugeVec::new(Opts::new(desc.name, desc.help), desc.labels)?;
    self.inner.register(Box::new(family.clone()))?;
    families.insert(desc.name, (*desc, family.clone()));

    Ok(family.get_metric_with_label_values(values)?)
  }

  /// Collect every registered family.
  pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
    self.inner.gather()
  }

  /// Render all metrics in the prometheus text exposition format.
  pub fn encode(&self) -> Result<String, MetricsError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&self.gather(), &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
  }
}
