//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mapserve::config::ServerConfig;
use mapserve::http::Outputs;
use mapserve::lifecycle::{prepare, Shutdown};
use mapserve::observability::MemorySink;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A running server bound to an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub access: Arc<MemorySink>,
    pub body: Arc<MemorySink>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with the given mappings, bound to `127.0.0.1:0`.
pub fn config(mappings: &[&str]) -> ServerConfig {
    let mut config = ServerConfig {
        mappings: mappings.iter().map(|m| m.to_string()).collect(),
        ..ServerConfig::default()
    };
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// Start a server for `config`, capturing access and body output.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let access = Arc::new(MemorySink::new());
    let body = Arc::new(MemorySink::new());
    let outputs = Outputs {
        access: access.clone(),
        body: body.clone(),
    };

    let prepared = prepare(&config, outputs).await.unwrap();
    let addr = prepared.listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = prepared.server.run(prepared.listener, &server_shutdown).await;
    });

    TestServer {
        addr,
        access,
        body,
        shutdown,
    }
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Start a mock backend that answers every request with its own request
/// head (request line and headers) as the body.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < 16 * 1024 {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            head.len()
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.write_all(&head).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
