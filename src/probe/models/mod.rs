//! A module containing the probe configuration and probe models.

mod config;
mod probe;

pub use config::{DnsConfig, HttpConfig, Network, ProbeConfig, TcpConfig};
pub use probe::Probe;
