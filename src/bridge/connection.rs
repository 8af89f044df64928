//! Socket-to-socket relay.
//!
//! # Responsibilities
//! - Copy bytes client → backend and backend → client concurrently
//! - Stop both directions as soon as either finishes or the bridge is closed
//! - Drop both sockets when the relay ends
//!
//! # Design Decisions
//! - Streaming copies (`tokio::io::copy`), no framing and no size limit
//! - Close is a watch signal so it can be fired under a lock without I/O
//! - Whatever is in flight on the surviving direction is best effort

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use super::Bridge;
use crate::net::connection::ConnectionId;

/// Why a relay stopped.
#[derive(Debug)]
pub enum RelayEnd {
    /// The client → backend copy finished first.
    ClientToBackend(io::Result<u64>),
    /// The backend → client copy finished first.
    BackendToClient(io::Result<u64>),
    /// The bridge was closed from outside (severance or shutdown).
    Closed,
}

impl RelayEnd {
    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayEnd::ClientToBackend(Ok(_)) => "client_eof",
            RelayEnd::ClientToBackend(Err(_)) => "client_error",
            RelayEnd::BackendToClient(Ok(_)) => "backend_eof",
            RelayEnd::BackendToClient(Err(_)) => "backend_error",
            RelayEnd::Closed => "closed",
        }
    }
}

/// A bridge between one client socket and one backend socket.
///
/// The sockets are handed to [`ConnectionBridge::relay`], which owns them for
/// the lifetime of the relay. [`Bridge::close`] may be called at any time,
/// from any task, any number of times.
#[derive(Debug)]
pub struct ConnectionBridge {
    id: ConnectionId,
    closed: AtomicBool,
    close_tx: watch::Sender<bool>,
}

impl ConnectionBridge {
    pub fn new(id: ConnectionId) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            id,
            closed: AtomicBool::new(false),
            close_tx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// True once the bridge has been closed by either path.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Relay bytes until either side finishes or the bridge is closed.
    ///
    /// Both sockets are dropped (and therefore closed) before this returns.
    /// A bridge that was already closed returns immediately.
    pub async fn relay<C, B>(&self, client: C, backend: B) -> RelayEnd
    where
        C: AsyncRead + AsyncWrite + Send,
        B: AsyncRead + AsyncWrite + Send,
    {
        let mut close_rx = self.close_tx.subscribe();
        let (mut client_read, mut client_write) = tokio::io::split(client);
        let (mut backend_read, mut backend_write) = tokio::io::split(backend);

        let end = tokio::select! {
            result = tokio::io::copy(&mut client_read, &mut backend_write) => {
                RelayEnd::ClientToBackend(result)
            }
            result = tokio::io::copy(&mut backend_read, &mut client_write) => {
                RelayEnd::BackendToClient(result)
            }
            _ = close_rx.wait_for(|closed| *closed) => RelayEnd::Closed,
        };

        self.close();
        tracing::debug!(connection_id = %self.id, reason = end.as_str(), "Bridge closed");
        end
    }
}

impl Bridge for ConnectionBridge {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.close_tx.send_replace(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn relays_both_directions() {
        let bridge = Arc::new(ConnectionBridge::new(ConnectionId::new()));
        let (mut client, client_leg) = duplex(64);
        let (backend_leg, mut backend) = duplex(64);

        let relay = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.relay(client_leg, backend_leg).await })
        };

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        backend.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        backend.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        bridge.close();
        let end = timeout(WAIT, relay).await.unwrap().unwrap();
        assert!(matches!(end, RelayEnd::Closed));
        assert!(bridge.is_closed());

        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
        assert_eq!(backend.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn client_eof_closes_backend_leg() {
        let bridge = ConnectionBridge::new(ConnectionId::new());
        let (client, client_leg) = duplex(64);
        let (backend_leg, mut backend) = duplex(64);

        drop(client);
        let end = timeout(WAIT, bridge.relay(client_leg, backend_leg))
            .await
            .unwrap();

        assert!(matches!(end, RelayEnd::ClientToBackend(Ok(0))));
        assert!(bridge.is_closed());
        let mut buf = [0u8; 1];
        assert_eq!(backend.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn backend_eof_closes_client_leg() {
        let bridge = ConnectionBridge::new(ConnectionId::new());
        let (mut client, client_leg) = duplex(64);
        let (backend_leg, backend) = duplex(64);

        drop(backend);
        let end = timeout(WAIT, bridge.relay(client_leg, backend_leg))
            .await
            .unwrap();

        assert!(matches!(end, RelayEnd::BackendToClient(Ok(0))));
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn streams_payloads_larger_than_buffers() {
        let bridge = Arc::new(ConnectionBridge::new(ConnectionId::new()));
        let (mut client, client_leg) = duplex(64);
        let (backend_leg, mut backend) = duplex(64);

        let relay = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.relay(client_leg, backend_leg).await })
        };

        let payload: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();
        let writer = tokio::spawn(async move {
            client.write_all(&payload).await.unwrap();
            client
        });

        let mut received = vec![0u8; expected.len()];
        timeout(WAIT, backend.read_exact(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, expected);

        let _client = writer.await.unwrap();
        bridge.close();
        timeout(WAIT, relay).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn close_before_relay_is_immediate() {
        let bridge = ConnectionBridge::new(ConnectionId::new());
        bridge.close();
        bridge.close();

        let (_client, client_leg) = duplex(64);
        let (backend_leg, _backend) = duplex(64);
        let end = timeout(WAIT, bridge.relay(client_leg, backend_leg))
            .await
            .unwrap();
        assert!(matches!(end, RelayEnd::Closed));
    }
}
