//! Configuration loading and validation.
//!
//! Settings are read from a `YAML` file and can be overridden with
//! environment variables prefixed by `CONNECTIVITY_`, nested keys separated by
//! `__` (e.g. `CONNECTIVITY_SERVER__INTERVAL=30`).
//!
//! ```yaml
//! server:
//!   address: "0.0.0.0:9100"
//!   interval: 10
//!   timeout: 5
//! logging:
//!   level: info
//!   structured: true
//! tests:
//!   tcp:
//!     enabled: true
//!     config:
//!       - { host: example.org, port: 443, network: tcp4 }
//!   dns:
//!     enabled: true
//!     config:
//!       - { host: example.org, network: tcp6, custom_resolver: true }
//!   http:
//!     enabled: true
//!     config:
//!       - { url: "https://example.org/", network: tcp, redirect: false }
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::logging::{LoggingConfig, LoggingError};
use crate::probe::models::{DnsConfig, HttpConfig, ProbeConfig, TcpConfig};

const DEFAULT_ADDRESS: &str = "0.0.0.0:9100";
const DEFAULT_INTERVAL_SECONDS: u64 = 10;

/// Errors raised while loading the configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
  /// The file could not be read or deserialized.
  #[error("Unable to load configuration: {0}")]
  Load(#[from] config::ConfigError),

  /// A value is out of range or malformed.
  #[error("Invalid configuration at {field}: {reason}")]
  Invalid { field: String, reason: String },

  /// The logging section is invalid.
  #[error("Invalid logging configuration: {0}")]
  Logging(#[from] LoggingError),
}

impl SettingsError {
  fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
    SettingsError::Invalid {
      field: field.into(),
      reason: reason.into(),
    }
  }
}

/// Exposition server and scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
  /// Bind address of the `/metrics` and `/health` endpoints.
  #[serde(default = "default_address")]
  pub address: String,

  /// Seconds between two ticks.
  #[serde(default = "default_interval")]
  pub interval: u64,

  /// Optional per-tick deadline in seconds.
  pub timeout: Option<u64>,
}

fn default_address() -> String {
  String::from(DEFAULT_ADDRESS)
}

fn default_interval() -> u64 {
  DEFAULT_INTERVAL_SECONDS
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self {
      address: default_address(),
      interval: default_interval(),
      timeout: None,
    }
  }
}

/// Probes of one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeSet<T> {
  #[serde(default)]
  pub enabled: bool,

  #[serde(default = "Vec::new")]
  pub config: Vec<T>,
}

impl<T> Default for ProbeSet<T> {
  fn default() -> Self {
    Self {
      enabled: false,
      config: Vec::new(),
    }
  }
}

impl<T> ProbeSet<T> {
  fn active(&self) -> &[T] {
    if self.enabled { &self.config } else { &[] }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Tests {
  #[serde(default)]
  pub tcp: ProbeSet<TcpConfig>,

  #[serde(default)]
  pub dns: ProbeSet<DnsConfig>,

  #[serde(default)]
  pub http: ProbeSet<HttpConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub server: ServerSettings,

  #[serde(default)]
  pub logging: LoggingConfig,

  #[serde(default)]
  pub tests: Tests,
}

impl Settings {
  /// Load and validate settings from a `YAML` file plus the environment.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    Self::build(Config::builder().add_source(File::from(path).format(FileFormat::Yaml)))
  }

  /// Load and validate settings from `YAML` text plus the environment.
  pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
    Self::build(Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml)))
  }

  fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
    let settings: Self = builder
      .add_source(
        Environment::with_prefix("CONNECTIVITY")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()?;

    settings.validate()?;

    Ok(settings)
  }

  /// Reject values no probe or server could work with.
  pub fn validate(&self) -> Result<(), SettingsError> {
    self.address()?;
    self.logging.validate()?;

    if self.server.interval == 0 {
      return Err(SettingsError::invalid("server.interval", "must be positive"));
    }
    if self.server.timeout == Some(0) {
      return Err(SettingsError::invalid("server.timeout", "must be positive"));
    }

    for (index, tcp) in self.tests.tcp.config.iter().enumerate() {
      if tcp.host.trim().is_empty() {
        return Err(SettingsError::invalid(format!("tests.tcp.config[{index}].host"), "is empty"));
      }
    }

    for (index, dns) in self.tests.dns.config.iter().enumerate() {
      if dns.host.trim().is_empty() {
        return Err(SettingsError::invalid(format!("tests.dns.config[{index}].host"), "is empty"));
      }
    }

    for (index, http) in self.tests.http.config.iter().enumerate() {
      if !(http.url.starts_with("http://") || http.url.starts_with("https://")) {
        return Err(SettingsError::invalid(
          format!("tests.http.config[{index}].url"),
          format!("{:?} is not an http(s) url", http.url),
        ));
      }
    }

    Ok(())
  }

  pub fn address(&self) -> Result<SocketAddr, SettingsError> {
    self
      .server
      .address
      .parse()
      .map_err(|error| SettingsError::invalid("server.address", format!("{error}")))
  }

  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.server.interval)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.server.timeout.map(Duration::from_secs)
  }

  /// Configurations of every enabled probe, `TCP` first, then `DNS` and `HTTP`.
  pub fn probes(&self) -> Vec<ProbeConfig> {
    let tcp = self.tests.tcp.active().iter().cloned().map(ProbeConfig::Tcp);
    let dns = self.tests.dns.active().iter().cloned().map(ProbeConfig::Dns);
    let http = self.tests.http.active().iter().cloned().map(ProbeConfig::Http);

    tcp.chain(dns).chain(http).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::probe::models::Network;

  const FULL: &str = r#"
server:
  address: "127.0.0.1:9200"
  interval: 30
  timeout: 5
logging:
  level: debug
  structured: true
tests:
  tcp:
    enabled: true
    config:
      - host: example.org
        port: 443
        network: tcp4
  dns:
    enabled: true
    config:
      - host: example.org
        network: tcp6
        custom_resolver: true
      - host: example.com
        network: tcp
  http:
    enabled: false
    config:
      - url: "https://example.org/"
        network: tcp
        redirect: true
"#;

  #[test]
  fn full_configuration() {
    let settings = Settings::from_yaml(FULL).unwrap();

    assert_eq!(settings.address().unwrap(), "127.0.0.1:9200".parse().unwrap());
    assert_eq!(settings.interval(), Duration::from_secs(30));
    assert_eq!(settings.timeout(), Some(Duration::from_secs(5)));
    assert_eq!(settings.logging.level, "debug");
    assert!(settings.logging.structured);
    assert_eq!(settings.tests.tcp.config[0], TcpConfig {
      host: String::from("example.org"),
      port: 443,
      network: Network::Tcp4,
    });
    assert!(settings.tests.dns.config[0].custom_resolver);
    assert!(
      !settings.tests.dns.config[1].custom_resolver,
      "system resolver by default"
    );
    assert!(settings.tests.http.config[0].redirect);
  }

  #[test]
  fn disabled_probes_are_skipped() {
    let settings = Settings::from_yaml(FULL).unwrap();

    let probes = settings.probes();

    assert_eq!(probes.len(), 3, "http probes are disabled");
    assert!(matches!(probes[0], ProbeConfig::Tcp(_)));
    assert!(matches!(probes[1], ProbeConfig::Dns(_)));
    assert!(matches!(probes[2], ProbeConfig::Dns(_)));
  }

  #[test]
  fn defaults() {
    let settings = Settings::from_yaml("{}").unwrap();

    assert_eq!(settings.server, ServerSettings::default());
    assert_eq!(settings.logging, LoggingConfig::default());
    assert!(settings.probes().is_empty(), "nothing is enabled");
  }

  #[test]
  fn unknown_network() {
    let yaml = r#"
tests:
  tcp:
    enabled: true
    config:
      - { host: example.org, port: 80, network: udp }
"#;

    assert!(
      matches!(Settings::from_yaml(yaml), Err(SettingsError::Load(_))),
      "unknown network family is rejected"
    );
  }

  #[test]
  fn zero_interval() {
    assert!(
      matches!(
        Settings::from_yaml("server: { interval: 0 }"),
        Err(SettingsError::Invalid { field, .. }) if field == "server.interval"
      ),
      "interval must be positive"
    );
  }

  #[test]
  fn zero_timeout() {
    assert!(
      matches!(
        Settings::from_yaml("server: { timeout: 0 }"),
        Err(SettingsError::Invalid { field, .. }) if field == "server.timeout"
      ),
      "timeout must be positive"
    );
  }

  #[test]
  fn malformed_address() {
    assert!(
      matches!(
        Settings::from_yaml("server: { address: localhost }"),
        Err(SettingsError::Invalid { field, .. }) if field == "server.address"
      ),
      "address must be ip:port"
    );
  }

  #[test]
  fn empty_host() {
    let yaml = r#"
tests:
  dns:
    config:
      - { host: " ", network: tcp4 }
"#;

    assert!(
      matches!(
        Settings::from_yaml(yaml),
        Err(SettingsError::Invalid { field, .. }) if field == "tests.dns.config[0].host"
      ),
      "host must not be empty"
    );
  }

  #[test]
  fn non_http_url() {
    let yaml = r#"
tests:
  http:
    enabled: true
    config:
      - { url: "ftp://example.org/", network: tcp }
"#;

    assert!(
      matches!(Settings::from_yaml(yaml), Err(SettingsError::Invalid { .. })),
      "only http(s) urls are probed"
    );
  }

  #[test]
  fn unknown_log_level() {
    assert!(
      matches!(
        Settings::from_yaml("logging: { level: verbose }"),
        Err(SettingsError::Logging(_))
      ),
      "log level is validated"
    );
  }

  #[test]
  fn missing_file() {
    assert!(
      matches!(
        Settings::load(Path::new("/nonexistent/connectivity.yaml")),
        Err(SettingsError::Load(_))
      ),
      "missing file is an error"
    );
  }
}
