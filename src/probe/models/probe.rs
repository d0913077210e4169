use std::fmt;

use crate::metrics::Registry;
use crate::probe::collectors::{Dns, Http, Tcp};
use crate::probe::errors::ProbeError;
use crate::probe::models::ProbeConfig;

/// A single connectivity check bound to one target and its gauges.
///
/// Probes are built once from configuration and live for the process
/// lifetime. Their configuration never changes; reconfiguring means building
/// a new probe.
pub enum Probe {
  /// `TCP` connect with kernel round trip time.
  Tcp(Tcp),

  /// `DNS` resolution.
  Dns(Dns),

  /// `HTTP` `GET`.
  Http(Http),
}

impl Probe {
  /// Build a probe and bind its gauges in `registry`.
  pub fn new(config: ProbeConfig, registry: &Registry) -> Result<Self, ProbeError> {
    Ok(match config {
      ProbeConfig::Tcp(config) => Probe::Tcp(Tcp::new(config, registry)?),
      ProbeConfig::Dns(config) => Probe::Dns(Dns::new(config, registry)?),
      ProbeConfig::Http(config) => Probe::Http(Http::new(config, registry)?),
    })
  }

  /// Protocol name, used in logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Probe::Tcp(_) => "tcp",
      Probe::Dns(_) => "dns",
      Probe::Http(_) => "http",
    }
  }
}

impl fmt::Display for Probe {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Probe::Tcp(probe) => {
        let config = probe.config();
        write!(f, "tcp {}:{} over {}", config.host, config.port, config.network)
      }
      Probe::Dns(probe) => {
        let config = probe.config();
        write!(
          f,
          "dns {} over {} ({} resolver)",
          config.host,
          config.network,
          config.resolver_kind()
        )
      }
      Probe::Http(probe) => {
        let config = probe.config();
        write!(f, "http {} over {}", config.url, config.network)
      }
    }
  }
}
