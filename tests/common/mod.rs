//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use failover_proxy::config::{BackendConfig, ProxyConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A running TCP backend that tags every reply with its name.
pub struct EchoBackend {
    pub name: String,
    pub addr: SocketAddr,
    accepts: Arc<AtomicUsize>,
}

impl EchoBackend {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections this backend has accepted.
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

/// Start a backend that answers every chunk with `"{name}: {chunk}"`.
pub async fn start_echo_backend(name: &str) -> EchoBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let tag = name.to_string();
    let counter = Arc::clone(&accepts);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let tag = tag.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let reply = format!("{}: {}", tag, String::from_utf8_lossy(&buf[..n]));
                            if socket.write_all(reply.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    EchoBackend {
        name: name.to_string(),
        addr,
        accepts,
    }
}

/// Start a health endpoint that answers 200 while `healthy` is set, 503 otherwise.
pub async fn start_health_endpoint(healthy: Arc<AtomicBool>) -> u16 {
    start_programmable_endpoint(move || {
        let healthy = Arc::clone(&healthy);
        async move {
            if healthy.load(Ordering::SeqCst) {
                200
            } else {
                503
            }
        }
    })
    .await
}

/// Start an HTTP endpoint whose status code is chosen per request.
pub async fn start_programmable_endpoint<F, Fut>(f: F) -> u16
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = Arc::clone(&f);
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let status_line = match f().await {
                    200 => "200 OK",
                    503 => "503 Service Unavailable",
                    _ => "500 Internal Server Error",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    port
}

pub fn backend_config(name: &str, port: u16, healthcheck_port: u16) -> BackendConfig {
    BackendConfig {
        name: name.to_string(),
        host: "127.0.0.1".to_string(),
        port,
        healthcheck_port,
    }
}

/// A config listening on an ephemeral port with health checks and the admin API off.
pub fn proxy_config(backends: Vec<BackendConfig>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backends = backends;
    config.health_check.enabled = false;
    config.api.enabled = false;
    config.observability.metrics_enabled = false;
    config.timeouts.connect_millis = 1_000;
    config
}

/// Send `message` and read back exactly `expected_len` bytes.
pub async fn exchange(stream: &mut TcpStream, message: &str, expected_len: usize) -> String {
    stream.write_all(message.as_bytes()).await.unwrap();
    let mut buf = vec![0u8; expected_len];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for reply")
        .unwrap();
    String::from_utf8(buf).unwrap()
}

/// True once the peer has closed `stream` (EOF or reset).
pub async fn is_closed_by_peer(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 64];
    match tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => true,
        Ok(Ok(_)) | Err(_) => false,
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
