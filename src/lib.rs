#![deny(unsafe_code)]

//! Limon connectivity library.
//!
//! ## Features
//!
//! - **probe** – Provides the [Probe](probe::models::Probe) enum with its
//!   `TCP`, `DNS` and `HTTP` checks. Every probe reports its outcome as `0` or
//!   `1` to a gauge; `TCP` probes also report the kernel round trip time.
//! - **schedule** – Provides the [Schedule](schedule::Schedule) struct that
//!   runs all probes on a fixed interval without waiting for them.
//! - **metrics** – Provides the [Registry](metrics::Registry) the probes bind
//!   their gauges in and the exposition endpoint reads from.
//! - **context** – Provides the [Context](context::Context) carrying the
//!   deadline and the logger of a probe run.
//! - **settings**, **logging**, **server** – Configuration loading, logger
//!   construction and the `/metrics` and `/health` endpoints.

pub mod context;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod schedule;
pub mod server;
pub mod settings;
