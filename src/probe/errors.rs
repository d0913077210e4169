//! A module describing probe errors.
//!
//! None of these ever leave a probe run: they are logged and folded into the
//! probe's gauges. Only [`ProbeError`] is returned to callers, when a probe
//! can't be constructed.

use std::io;

use thiserror::Error;

use crate::metrics::MetricsError;
use crate::probe::models::Network;

/// Errors that can occur while constructing a probe.
#[derive(Error, Debug)]
pub enum ProbeError {
  /// The probe's gauges could not be bound.
  #[error("Metrics error: {0}")]
  Metrics(#[from] MetricsError),
}

/// Errors that can occur while dialing a `TCP` endpoint.
#[derive(Error, Debug)]
pub enum TcpError {
  /// The host name could not be resolved.
  #[error("Failed to resolve {host:?}: {source}")]
  Resolve { host: String, source: io::Error },

  /// The host resolved, but not to any address of the requested family.
  #[error("No {network} address found for {host:?}")]
  NoAddress { host: String, network: Network },

  /// Every candidate address refused or failed the connection.
  #[error("Connection failed: {0}")]
  Connect(#[source] io::Error),

  /// The context deadline passed before the connection was established.
  #[error("Deadline exceeded while dialing")]
  Timeout,
}

/// Errors that can occur while extracting the kernel round trip time.
#[derive(Error, Debug)]
pub enum RttError {
  /// The socket behind the connection is not a `TCP` socket.
  #[error("Connection is not tcp (socket protocol {protocol})")]
  NotTcp { protocol: i32 },

  /// The raw socket descriptor is not accessible.
  #[error("Raw socket descriptor is not accessible: {0}")]
  Descriptor(#[source] io::Error),

  /// `getsockopt(TCP_INFO)` failed.
  #[error("TCP_INFO query failed: {0}")]
  Query(#[source] io::Error),

  /// The platform has no `TCP_INFO` facility.
  #[error("TCP_INFO is not supported on this platform")]
  Unsupported,
}

/// Errors that can occur during a `DNS` lookup.
#[derive(Error, Debug)]
pub enum DnsError {
  /// The custom resolver failed.
  #[error("DNS resolve error: {0}")]
  Resolve(#[from] trust_dns_resolver::error::ResolveError),

  /// The system resolver failed.
  #[error("System lookup error: {0}")]
  Lookup(#[from] io::Error),

  /// The lookup succeeded without any address.
  #[error("No records found for {host:?}")]
  NoRecords { host: String },

  /// The system resolver configuration could not be read.
  #[error("Unable to read system resolver configuration: {0}")]
  SystemConf(String),

  /// The context deadline passed before the lookup completed.
  #[error("Deadline exceeded while resolving")]
  Timeout,
}

/// Errors that can occur during an `HTTP` request.
#[derive(Error, Debug)]
pub enum HttpError {
  /// The transfer failed at transport level.
  #[error("Request failed: {0}")]
  Request(#[from] curl::Error),

  /// The blocking transfer task panicked or was cancelled.
  #[error("Request task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  /// The context deadline had already passed.
  #[error("Deadline exceeded before the request was sent")]
  Timeout,
}
