//! The configured metrics address serves Prometheus scrape text over HTTP.
//!
//! Kept in its own test binary: it needs to own the process-wide recorder.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use startlist_runtime::OrchestratorConfig;
use startlist_runtime::config::METRICS_ADDR_VAR;
use startlist_runtime::metrics::CommandMetrics;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn free_local_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

async fn scrape(addr: std::net::SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("endpoint should accept connections");
    stream
        .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn configured_address_serves_scrape_endpoint() {
    let addr = free_local_addr();
    let lookup = |key: &str| (key == METRICS_ADDR_VAR).then(|| addr.clone());
    let config = OrchestratorConfig::from_lookup(lookup).unwrap();

    let mut server = config.metrics_server().expect("address is configured");
    server.start().unwrap();
    assert!(server.handle().is_some());

    CommandMetrics::record("ok", Duration::from_millis(5));

    let response = scrape(server.addr()).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("startlist_commands_total"), "{response}");
}
