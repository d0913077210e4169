//! Metrics exposition and health endpoints.
//!
//! - `GET /metrics` renders the [`Registry`] in the prometheus text format.
//! - `GET /health` answers `OK` as long as the process is serving.

use std::io;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;

use crate::metrics::Registry;

async fn metrics_handler(State(registry): State<Registry>) -> Response {
  match registry.encode() {
    Ok(body) => ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
    Err(error) => {
      tracing::error!(%error, "Failed to encode prometheus metrics");
      (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
    }
  }
}

async fn health_handler() -> &'static str {
  tracing::debug!("Health check");
  "OK"
}

pub fn router(registry: Registry) -> Router {
  Router::new()
    .route("/metrics", get(metrics_handler))
    .route("/health", get(health_handler))
    .with_state(registry)
}

/// Serve the endpoints on `listener` until the process stops.
pub async fn serve(listener: TcpListener, registry: Registry) -> io::Result<()> {
  tracing::info!(address = %listener.local_addr()?, "Metrics server listening");

  axum::serve(listener, router(registry)).await
}

#[cfg(test)]
mod tests {
  use std::net::SocketAddr;

  use curl::easy::Easy;
  use tokio::task;

  use super::*;
  use crate::metrics::Desc;

  const UP: Desc = Desc {
    name: "server_test_up",
    help: "Server test gauge",
    labels: &["host"],
  };

  async fn fetch(addr: SocketAddr, path: &'static str) -> (u32, String) {
    task::spawn_blocking(move || {
      let mut body = Vec::new();
      let mut request = Easy::new();
      request.url(&format!("http://{addr}{path}")).unwrap();

      {
        let mut transfer = request.transfer();
        transfer
          .write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
          })
          .unwrap();
        transfer.perform().unwrap();
      }

      (request.response_code().unwrap(), String::from_utf8(body).unwrap())
    })
    .await
    .unwrap()
  }

  async fn start(registry: Registry) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, registry));
    addr
  }

  #[tokio::test]
  async fn metrics_endpoint() {
    let registry = Registry::new();
    registry.gauge(&UP, &["localhost"]).unwrap().set(1.0);

    let (status, body) = fetch(start(registry).await, "/metrics").await;

    assert_eq!(status, 200, "metrics are served");
    assert!(
      body.contains(r#"server_test_up{host="localhost"} 1"#),
      "registry content is exposed"
    );
  }

  #[tokio::test]
  async fn health_endpoint() {
    let (status, body) = fetch(start(Registry::new()).await, "/health").await;

    assert_eq!(status, 200, "health is served");
    assert_eq!(body, "OK", "health body is OK");
  }

  #[tokio::test]
  async fn unknown_path() {
    let (status, _) = fetch(start(Registry::new()).await, "/missing").await;

    assert_eq!(status, 404, "unknown path is not found");
  }
}
