use std::time::Duration;

use curl::easy::{Easy2, Handler, HttpVersion, WriteError};
use prometheus::Gauge;
use tokio::task;

use crate::context::Context;
use crate::metrics::{Desc, Registry};
use crate::probe::errors::{HttpError, ProbeError};
use crate::probe::models::HttpConfig;

pub(crate) const SUCCESS: Desc = Desc {
  name: "connectivity_http_success",
  help: "Successful http request",
  labels: &["network", "url"],
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Smallest transfer timeout handed to curl, which counts in whole
/// milliseconds and reads zero as no timeout at all.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

fn transfer_timeout(remaining: Duration) -> Duration {
  remaining.max(MIN_TIMEOUT)
}

/// Response body sink that only counts what it throws away.
#[derive(Default)]
struct Discard(usize);

impl Handler for Discard {
  fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
    self.0 += data.len();

    Ok(data.len())
  }
}

/// Outcome of a completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
  pub status: u32,
  pub body_bytes: usize,
}

pub struct Http {
  config: HttpConfig,
  success: Gauge,
}

impl Http {
  pub fn new(config: HttpConfig, registry: &Registry) -> Result<Self, ProbeError> {
    let labels = [config.network.as_str(), config.url.as_str()];

    Ok(Self {
      success: registry.gauge(&SUCCESS, &labels)?,
      config,
    })
  }

  pub fn config(&self) -> &HttpConfig {
    &self.config
  }

  pub async fn run(&self, ctx: &Context) {
    let config = &self.config;

    match Self::get(config, ctx).await {
      Ok(response) => {
        tracing::debug!(
          network = %config.network,
          url = %config.url,
          status = response.status,
          "Request succeeded"
        );
        self.success.set(1.0);
      }
      Err(error) => {
        self.success.set(0.0);
        tracing::info!(
          network = %config.network,
          url = %config.url,
          %error,
          "Request failed"
        );
      }
    }
  }

  /// Issue a `GET` over the configured network family.
  ///
  /// Any received response counts, whatever its status. With redirects
  /// disabled the first redirect response is the result.
  pub async fn get(config: &HttpConfig, ctx: &Context) -> Result<Response, HttpError> {
    let mut request = Easy2::new(Discard::default());
    request.url(config.url.as_str())?;
    request.get(true)?;
    request.ip_resolve(config.network.ip_resolve())?;
    request.follow_location(config.redirect)?;
    request.connect_timeout(CONNECT_TIMEOUT)?;
    request.tcp_keepalive(true)?;
    request.tcp_keepidle(TCP_KEEPALIVE)?;
    request.http_version(HttpVersion::V2TLS)?;

    if let Some(remaining) = ctx.remaining() {
      if remaining.is_zero() {
        return Err(HttpError::Timeout);
      }
      request.timeout(transfer_timeout(remaining))?;
    }

    let response = task::spawn_blocking(move || match request.perform() {
      Ok(()) => Ok(request),
      Err(error) => Err(HttpError::Request(error)),
    })
    .await??;

    Ok(Response {
      status: response.response_code()?,
      body_bytes: response.get_ref().0,
    })
  }
}

#[cfg(test)]
mod tests {
  use httpmock::prelude::*;

  use super::*;
  use crate::probe::models::Network;

  fn config(url: String, redirect: bool) -> HttpConfig {
    HttpConfig {
      url,
      network: Network::Tcp4,
      redirect,
    }
  }

  fn success(registry: &Registry, config: &HttpConfig) -> Gauge {
    registry
      .gauge(&SUCCESS, &[config.network.as_str(), config.url.as_str()])
      .unwrap()
  }

  #[test]
  fn discard_body() {
    let mut body = Discard::default();

    assert_eq!(body.write(&[0, 1, 2]).ok(), Some(3), "body is consumed");
    assert_eq!(body.0, 3, "consumed bytes are counted");
  }

  #[tokio::test]
  async fn ok_response() {
    let server = MockServer::start_async().await;

    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/check");
        then.status(200).body("index");
      })
      .await;

    let registry = Registry::new();
    let config = config(server.url("/check"), false);
    let probe = Http::new(config.clone(), &registry).unwrap();

    probe.run(&Context::new()).await;

    mock.assert();

    assert_eq!(success(&registry, &config).get(), 1.0, "request succeeded");
  }

  #[tokio::test]
  async fn server_error_is_success() {
    let server = MockServer::start_async().await;

    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/check");
        then.status(500);
      })
      .await;

    let registry = Registry::new();
    let config = config(server.url("/check"), false);
    let probe = Http::new(config.clone(), &registry).unwrap();

    probe.run(&Context::new()).await;

    mock.assert();

    assert_eq!(
      success(&registry, &config).get(),
      1.0,
      "status code is not inspected"
    );
  }

  #[tokio::test]
  async fn redirect_not_followed() {
    let server = MockServer::start_async().await;

    let redirect = server
      .mock_async(|when, then| {
        when.method(GET).path("/old");
        then.status(302).header("Location", "/new");
      })
      .await;

    let response = Http::get(&config(server.url("/old"), false), &Context::new())
      .await
      .unwrap();

    redirect.assert();

    assert_eq!(response.status, 302, "first redirect is the result");
  }

  #[tokio::test]
  async fn redirect_is_success() {
    let server = MockServer::start_async().await;

    let redirect = server
      .mock_async(|when, then| {
        when.method(GET).path("/old");
        then.status(302).header("Location", "/new");
      })
      .await;

    let registry = Registry::new();
    let config = config(server.url("/old"), false);
    let probe = Http::new(config.clone(), &registry).unwrap();

    probe.run(&Context::new()).await;

    redirect.assert();

    assert_eq!(
      success(&registry, &config).get(),
      1.0,
      "reaching the redirect counts as success"
    );
  }

  #[tokio::test]
  async fn redirect_followed() {
    let server = MockServer::start_async().await;

    let redirect = server
      .mock_async(|when, then| {
        when.method(GET).path("/old");
        then.status(301).header("Location", "/new");
      })
      .await;
    let target = server
      .mock_async(|when, then| {
        when.method(GET).path("/new");
        then.status(200).body("moved");
      })
      .await;

    let response = Http::get(&config(server.url("/old"), true), &Context::new())
      .await
      .unwrap();

    redirect.assert();
    target.assert();

    assert_eq!(response.status, 200, "redirect chain is followed");
    assert_eq!(response.body_bytes, 5, "body is drained");
  }

  #[tokio::test]
  async fn connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let registry = Registry::new();
    let config = config(format!("http://127.0.0.1:{port}/"), false);
    let probe = Http::new(config.clone(), &registry).unwrap();
    let gauge = success(&registry, &config);

    gauge.set(1.0);
    probe.run(&Context::new()).await;

    assert_eq!(gauge.get(), 0.0, "unreachable endpoint is a failure");
  }

  #[tokio::test]
  async fn expired_deadline() {
    let ctx = Context::new().with_deadline(tokio::time::Instant::now());
    tokio::time::sleep(Duration::from_millis(1)).await;

    let result = Http::get(&config(String::from("http://127.0.0.1:1/"), false), &ctx).await;

    assert!(
      matches!(result, Err(HttpError::Timeout)),
      "no request once the deadline passed"
    );
  }

  #[test]
  fn sub_millisecond_timeout() {
    assert_eq!(transfer_timeout(Duration::from_micros(900)), MIN_TIMEOUT);
    assert_eq!(transfer_timeout(Duration::from_secs(2)), Duration::from_secs(2));
  }

  #[tokio::test]
  async fn sub_millisecond_deadline() {
    // Accepted by the backlog but never answered.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let ctx = Context::new().with_timeout(Duration::from_micros(900));
    let cfg = config(format!("http://127.0.0.1:{port}/"), false);
    let request = Http::get(&cfg, &ctx);

    let result = tokio::time::timeout(Duration::from_secs(3), request)
      .await
      .expect("request outlived its deadline");

    assert!(result.is_err(), "silent endpoint is a failure");
    drop(listener);
  }
}
