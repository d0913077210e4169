//! Probe configuration records, one per protocol.
//!
//! Records are deserialized from the settings file and read once when the
//! probe is built. A [`Network`] tag pins every check to a family.

use std::fmt;
use std::net::SocketAddr;

use curl::easy::IpResolve;
use serde::Deserialize;

/// Network family a probe is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
  /// IPv4 only.
  Tcp4,

  /// IPv6 only.
  Tcp6,

  /// Either family.
  Tcp,
}

impl Network {
  /// Tag used in configuration and metric labels.
  pub fn as_str(&self) -> &'static str {
    match self {
      Network::Tcp4 => "tcp4",
      Network::Tcp6 => "tcp6",
      Network::Tcp => "tcp",
    }
  }

  /// Whether `addr` belongs to this family.
  pub fn allows(&self, addr: &SocketAddr) -> bool {
    match self {
      Network::Tcp4 => addr.is_ipv4(),
      Network::Tcp6 => addr.is_ipv6(),
      Network::Tcp => true,
    }
  }

  pub(crate) fn ip_resolve(&self) -> IpResolve {
    match self {
      Network::Tcp4 => IpResolve::V4,
      Network::Tcp6 => IpResolve::V6,
      Network::Tcp => IpResolve::Any,
    }
  }
}

impl fmt::Display for Network {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Configuration for a `TCP` probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TcpConfig {
  /// Host name or IP address to connect to.
  pub host: String,

  /// Destination port.
  pub port: u16,

  /// Network family used for dialing.
  pub network: Network,
}

/// Configuration for a `DNS` probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsConfig {
  /// Host name to resolve.
  pub host: String,

  /// Network family the custom resolver dials its name servers with.
  pub network: Network,

  /// Use a resolver pinned to `network` instead of the system one.
  #[serde(default)]
  pub custom_resolver: bool,
}

impl DnsConfig {
  /// Value of the `resolver` label.
  pub fn resolver_kind(&self) -> &'static str {
    if self.custom_resolver {
      "custom"
    } else {
      "system"
    }
  }
}

/// Configuration for an `HTTP` probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
  /// Absolute `http://` or `https://` URL.
  pub url: String,

  /// Network family used for connecting.
  pub network: Network,

  /// Whether to follow `HTTP` redirects.
  #[serde(default)]
  pub redirect: bool,
}

/// Probe configuration, one variant per protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeConfig {
  Tcp(TcpConfig),
  Dns(DnsConfig),
  Http(HttpConfig),
}
