use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use prometheus::Gauge;
use tokio::net::{self, TcpStream};

use crate::context::Context;
use crate::metrics::{Desc, Registry};
use crate::probe::collectors::rtt::{RoundTripTime, TcpInfo};
use crate::probe::errors::{ProbeError, RttError, TcpError};
use crate::probe::models::TcpConfig;

pub(crate) const SUCCESS: Desc = Desc {
  name: "connectivity_tcp_success",
  help: "Successful tcp connection",
  labels: &["network", "host", "port"],
};

pub(crate) const RTT: Desc = Desc {
  name: "connectivity_tcp_rtt_seconds",
  help: "TCP round trip time in seconds",
  labels: &["network", "host", "port"],
};

pub struct Tcp {
  config: TcpConfig,
  success: Gauge,
  rtt: Gauge,
  source: Arc<dyn RoundTripTime>,
  unsupported_reported: AtomicBool,
}

impl Tcp {
  pub fn new(config: TcpConfig, registry: &Registry) -> Result<Self, ProbeError> {
    Self::with_rtt_source(config, registry, Arc::new(TcpInfo))
  }

  /// Build a probe reading round trip times from `source`.
  pub fn with_rtt_source(
    config: TcpConfig,
    registry: &Registry,
    source: Arc<dyn RoundTripTime>,
  ) -> Result<Self, ProbeError> {
    let port = config.port.to_string();
    let labels = [config.network.as_str(), config.host.as_str(), port.as_str()];

    Ok(Self {
      success: registry.gauge(&SUCCESS, &labels)?,
      rtt: registry.gauge(&RTT, &labels)?,
      config,
      source,
      unsupported_reported: AtomicBool::new(false),
    })
  }

  pub fn config(&self) -> &TcpConfig {
    &self.config
  }

  pub async fn run(&self, ctx: &Context) {
    let config = &self.config;

    let stream = match Self::dial(config, ctx).await {
      Ok(stream) => stream,
      Err(error) => {
        self.success.set(0.0);
        tracing::info!(
          network = %config.network,
          host = %config.host,
          port = config.port,
          %error,
          "Dialing failed"
        );
        return;
      }
    };

    tracing::debug!(
      network = %config.network,
      host = %config.host,
      port = config.port,
      "Dialing succeeded"
    );
    self.success.set(1.0);

    match self.source.round_trip_time(&stream) {
      Ok(rtt) => {
        tracing::debug!(
          network = %config.network,
          host = %config.host,
          port = config.port,
          rtt_us = rtt.as_micros() as u64,
          "TCP info received"
        );
        self.rtt.set(rtt.as_secs_f64());
      }
      // Only the first unsupported sample is reported as an error.
      Err(RttError::Unsupported) if self.unsupported_reported.swap(true, Ordering::Relaxed) => {
        tracing::debug!(
          network = %config.network,
          host = %config.host,
          port = config.port,
          "Round trip time is not available on this platform"
        )
      }
      Err(error) => tracing::error!(
        network = %config.network,
        host = %config.host,
        port = config.port,
        %error,
        "Failed to get round trip time"
      ),
    }
  }

  /// Connect to the first reachable address of the configured family,
  /// giving up at the context deadline.
  pub async fn dial(config: &TcpConfig, ctx: &Context) -> Result<TcpStream, TcpError> {
    match ctx.bounded(Self::connect(config)).await {
      Ok(result) => result,
      Err(_) => Err(TcpError::Timeout),
    }
  }

  async fn connect(config: &TcpConfig) -> Result<TcpStream, TcpError> {
    let addrs = net::lookup_host((config.host.as_str(), config.port))
      .await
      .map_err(|source| TcpError::Resolve {
        host: config.host.clone(),
        source,
      })?;

    let mut last_error = None;
    for addr in addrs.filter(|addr| config.network.allows(addr)) {
      match TcpStream::connect(addr).await {
        Ok(stream) => return Ok(stream),
        Err(error) => last_error = Some(error),
      }
    }

    Err(match last_error {
      Some(error) => TcpError::Connect(error),
      None => TcpError::NoAddress {
        host: config.host.clone(),
        network: config.network,
      },
    })
  }
}
