//! Tests for TCP probe handling

use probekit::{Assertion, ExecutorConfig, Operator, ProbeExecutor, ProbeRequest};
use tokio::net::TcpListener;

use crate::common::closed_port;

fn executor() -> ProbeExecutor {
    ProbeExecutor::new(ExecutorConfig::default()).expect("Failed to build executor")
}

async fn accepting_listener() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        while let Ok((_stream, _addr)) = listener.accept().await {
            // Just accept and drop connections
        }
    });
    addr
}

#[tokio::test]
async fn test_tcp_probe_success() {
    let addr = accepting_listener().await;

    let response = executor().execute(&ProbeRequest::tcp(addr.to_string())).await;

    assert!(response.is_up, "TCP probe should succeed: {response:?}");
    assert_eq!(response.status_code, 0);
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_tcp_probe_connection_refused() {
    let addr = closed_port().await;

    let response = executor().execute(&ProbeRequest::tcp(addr.to_string())).await;

    assert!(!response.is_up);
    assert_eq!(response.status_code, 0);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_tcp_probe_invalid_target() {
    let response = executor().execute(&ProbeRequest::tcp("no-port-here")).await;

    assert!(!response.is_up);
    assert!(response.error.unwrap().contains("host:port"));
}

#[tokio::test]
async fn test_tcp_probe_response_time_assertion() {
    let addr = accepting_listener().await;

    let request = ProbeRequest::tcp(addr.to_string())
        .with_assertion(Assertion::response_time(Operator::LessThan, 5_000));
    let response = executor().execute(&request).await;
    assert!(response.is_up);

    // Status assertions have nothing to look at on a bare TCP connect.
    let request = ProbeRequest::tcp(addr.to_string())
        .with_assertion(Assertion::status(Operator::Equals, 200u16));
    let response = executor().execute(&request).await;
    assert!(!response.is_up);
    assert_eq!(
        response.assertion_results.unwrap()[0].message,
        "No status code available"
    );
}
