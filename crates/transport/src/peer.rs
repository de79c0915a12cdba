//! PeerHandle - one connected worker with an isolated bounded send queue

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::framing::write_frame;
use crate::metrics::ChannelMetrics;

/// Handle to a connected peer's writer task
///
/// The queue is the only buffering this layer provides: when it is full the
/// frame is refused immediately, never queued indefinitely.
pub struct PeerHandle {
    /// Remote address
    addr: SocketAddr,
    /// Channel to the writer task
    tx: mpsc::Sender<Bytes>,
    /// Shared channel metrics
    metrics: Arc<ChannelMetrics>,
    /// Writer task handle
    writer_handle: JoinHandle<()>,
}

impl PeerHandle {
    /// Create a new PeerHandle and spawn the writer task
    pub fn spawn<W>(
        socket: W,
        addr: SocketAddr,
        queue_capacity: usize,
        metrics: Arc<ChannelMetrics>,
    ) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let writer_metrics = Arc::clone(&metrics);

        let writer_handle = tokio::spawn(async move {
            peer_writer(socket, rx, writer_metrics, addr).await;
        });

        Self {
            addr,
            tx,
            metrics,
            writer_handle,
        }
    }

    /// Remote peer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the writer task has ended (socket gone)
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Offer a frame to this peer's queue (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full or the peer closed
    pub fn try_send(&self, frame: Bytes) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => {
                // Queue length approximation
                self.metrics.set_queue_len(self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_dropped_count();
                warn!(peer = %self.addr, "Peer queue full, frame refused");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(peer = %self.addr, "Peer writer closed");
                false
            }
        }
    }

    /// Shutdown the peer writer gracefully
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.writer_handle.await {
            error!(peer = %self.addr, error = ?e, "Peer writer task panicked");
        }
        debug!(peer = %self.addr, "PeerHandle shutdown complete");
    }
}

/// Writer task that drains the queue onto the socket
async fn peer_writer<W>(
    socket: W,
    mut rx: mpsc::Receiver<Bytes>,
    metrics: Arc<ChannelMetrics>,
    addr: SocketAddr,
) where
    W: AsyncWrite + Unpin,
{
    debug!(peer = %addr, "Peer writer started");
    let mut socket = BufWriter::new(socket);

    while let Some(frame) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        if let Err(e) = write_frame(&mut socket, &frame).await {
            metrics.inc_failure_count();
            error!(peer = %addr, error = %e, "Frame write failed, dropping peer");
            // Remaining queued frames are lost with the socket
            break;
        }
        metrics.inc_sent_count();
    }

    debug!(peer = %addr, "Peer writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_peer_writes_frames() {
        let (client, server) = tokio::io::duplex(1024);
        let metrics = Arc::new(ChannelMetrics::new());
        let handle = PeerHandle::spawn(client, test_addr(), 8, Arc::clone(&metrics));

        assert!(handle.try_send(Bytes::from_static(b"one")));
        assert!(handle.try_send(Bytes::from_static(b"two")));
        handle.shutdown().await;

        let mut lines = BufReader::new(server).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "one");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "two");
        assert_eq!(metrics.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_refuses_frame() {
        // Tiny duplex buffer keeps the writer blocked on the first frame
        let (client, _server) = tokio::io::duplex(1);
        let metrics = Arc::new(ChannelMetrics::new());
        let handle = PeerHandle::spawn(client, test_addr(), 1, Arc::clone(&metrics));

        let big = Bytes::from(vec![b'x'; 256]);
        handle.try_send(big.clone());
        handle.try_send(big.clone());

        // Queue of 1 with a stuck writer: further offers must be refused
        let mut refused = false;
        for _ in 0..8 {
            if !handle.try_send(big.clone()) {
                refused = true;
                break;
            }
        }
        assert!(refused);
        assert!(metrics.dropped_count() > 0);
    }
}
