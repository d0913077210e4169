//! A module for connectivity probes.
//!
//! A [`Probe`](models::Probe) checks one target over one protocol and writes
//! the outcome to gauges bound in a [`Registry`](crate::metrics::Registry) at
//! construction time.
//!
//! # Example
//!
//! ```rust, no_run
//! use limon_connectivity::context::Context;
//! use limon_connectivity::metrics::Registry;
//! use limon_connectivity::probe::models::{Network, Probe, ProbeConfig, TcpConfig};
//!
//! async fn probe_tcp() {
//!   let registry = Registry::new();
//!   let probe = Probe::new(
//!     ProbeConfig::Tcp(TcpConfig {
//!       host: "example.org".into(),
//!       port: 443,
//!       network: Network::Tcp4,
//!     }),
//!     &registry,
//!   )
//!   .unwrap();
//!
//!   probe.run(&Context::new()).await;
//!
//!   assert!(registry.encode().unwrap().contains("connectivity_tcp_success"));
//! }
//!
//! # tokio_test::block_on(async {
//! probe_tcp().await;
//! # })
//! ```

mod collectors;
mod run;

pub mod errors;
pub mod models;

pub use collectors::rtt;
pub use collectors::{Dns, Http, Response, Tcp};
