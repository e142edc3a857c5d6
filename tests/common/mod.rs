//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use resilient_client::config::ClientConfig;
use resilient_client::{BreakerConfig, MetricSink, ServiceRegistry};

pub const SERVICE: &str = "recommendations";

/// Metric sink that remembers every name it was sent.
#[derive(Debug, Default)]
pub struct RecordingSink {
    names: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn last(&self) -> Option<String> {
        self.names.lock().unwrap().last().cloned()
    }
}

impl MetricSink for RecordingSink {
    fn send(&self, name: &str) {
        self.names.lock().unwrap().push(name.to_string());
    }
}

pub fn metric(kind: &str) -> String {
    format!("circuitbreaker.{}.{}", SERVICE, kind)
}

/// Client defaults with short timeouts and backoff so tests stay fast.
pub fn fast_client_config() -> ClientConfig {
    ClientConfig {
        timeout_ms: 200,
        base_backoff_ms: 10,
        backoff_cap_ms: 50,
        ..ClientConfig::default()
    }
}

/// Registry with one service at `addr` reporting to a recording sink.
pub fn registry(
    addr: SocketAddr,
    breaker: BreakerConfig,
    client: ClientConfig,
) -> (ServiceRegistry, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let http = reqwest::Client::builder().no_proxy().build().unwrap();

    let registry = ServiceRegistry::new(client)
        .unwrap()
        .with_http_client(http)
        .with_metric_sink(sink.clone())
        .with_service(SERVICE, &format!("http://{}/{}", addr, SERVICE), breaker)
        .unwrap();

    (registry, sink)
}

/// An address nothing listens on, so connections are refused.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Read one HTTP request (head and Content-Length body) from the socket.
pub async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a programmable backend; the handler sees the raw request text.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that accepts and reads requests but never answers.
/// Returns the address and a counter of accepted connections.
pub async fn start_silent_backend() -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let _ = read_request(&mut socket).await;
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, accepted)
}

/// Start a backend that reads each request and hangs up without answering.
/// Returns the address and a counter of accepted connections.
pub async fn start_hangup_backend() -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                drop(socket);
            });
        }
    });

    (addr, accepted)
}
