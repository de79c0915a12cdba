//! Fanout channel - load-balanced push delivery
//!
//! The manager binds one endpoint; any number of workers connect. Each sent
//! frame goes to exactly one currently-ready peer, chosen round-robin over
//! the connected set. Sends never wait: with no peer connected, or every
//! per-peer queue full, the send fails synchronously.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{FrameSink, FrameSource, QueueError};
use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::framing::read_frame;
use crate::metrics::ChannelMetrics;
use crate::peer::PeerHandle;

/// Manager-side fanout endpoint
pub struct FanoutBinding {
    /// Bound local address
    local_addr: SocketAddr,
    /// Connected peers; closed ones are pruned on send
    peers: Arc<Mutex<Vec<PeerHandle>>>,
    /// Round-robin cursor
    cursor: AtomicUsize,
    /// Shared channel metrics
    metrics: Arc<ChannelMetrics>,
    /// Accept loop task handle
    accept_handle: JoinHandle<()>,
}

impl FanoutBinding {
    /// Bind the fanout endpoint and start accepting workers
    ///
    /// # Errors
    /// Bind failure is fatal and propagated to the caller.
    #[instrument(name = "fanout_bind", skip(host))]
    pub async fn bind(
        host: &str,
        port: u16,
        queue_capacity: usize,
    ) -> Result<Self, QueueError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| QueueError::transport(format!("fanout bind {host}:{port}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| QueueError::transport(format!("fanout local addr: {e}")))?;

        let peers: Arc<Mutex<Vec<PeerHandle>>> = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(ChannelMetrics::new());

        let accept_peers = Arc::clone(&peers);
        let accept_metrics = Arc::clone(&metrics);
        let accept_handle = tokio::spawn(async move {
            accept_workers(listener, accept_peers, accept_metrics, queue_capacity).await;
        });

        info!(addr = %local_addr, "Fanout endpoint bound");
        Ok(Self {
            local_addr,
            peers,
            cursor: AtomicUsize::new(0),
            metrics,
            accept_handle,
        })
    }

    /// Bound local address (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get channel metrics
    pub fn metrics(&self) -> &Arc<ChannelMetrics> {
        &self.metrics
    }

    /// Currently connected peer count
    pub fn peer_count(&self) -> usize {
        let mut peers = self.peers.lock().expect("peer registry poisoned");
        peers.retain(|p| !p.is_closed());
        peers.len()
    }

    /// Offer a frame to exactly one ready peer (non-blocking, zero wait)
    fn offer(&self, frame: Bytes) -> Result<(), QueueError> {
        let mut peers = self.peers.lock().expect("peer registry poisoned");
        peers.retain(|p| !p.is_closed());
        observability::record_peer_count(peers.len());

        if peers.is_empty() {
            self.metrics.inc_rejected_count();
            return Err(QueueError::no_ready_peer("no worker connected"));
        }

        // Round-robin fairness over the connected set
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for i in 0..peers.len() {
            let peer = &peers[(start + i) % peers.len()];
            if peer.try_send(frame.clone()) {
                return Ok(());
            }
        }

        self.metrics.inc_rejected_count();
        Err(QueueError::no_ready_peer("all peer queues full"))
    }

    /// Shutdown the endpoint: stop accepting, drain peer writers
    pub async fn shutdown(&self) {
        self.accept_handle.abort();
        let peers = {
            let mut guard = self.peers.lock().expect("peer registry poisoned");
            std::mem::take(&mut *guard)
        };
        for peer in peers {
            peer.shutdown().await;
        }
        debug!(addr = %self.local_addr, "Fanout endpoint shut down");
    }
}

impl Drop for FanoutBinding {
    fn drop(&mut self) {
        self.accept_handle.abort();
    }
}

impl FrameSink for FanoutBinding {
    async fn send(&self, frame: Bytes) -> Result<(), QueueError> {
        self.offer(frame)
    }
}

/// Accept loop: wrap each connecting worker in a PeerHandle
async fn accept_workers(
    listener: TcpListener,
    peers: Arc<Mutex<Vec<PeerHandle>>>,
    metrics: Arc<ChannelMetrics>,
    queue_capacity: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(peer = %addr, "Worker connected");
                let (_read_half, write_half) = stream.into_split();
                let handle =
                    PeerHandle::spawn(write_half, addr, queue_capacity, Arc::clone(&metrics));
                let mut guard = peers.lock().expect("peer registry poisoned");
                guard.push(handle);
                observability::record_peer_count(guard.len());
            }
            Err(e) => {
                // Transient accept failures are logged, the loop continues
                error!(error = %e, "Fanout accept failed");
            }
        }
    }
}

/// Worker-side fanout consumer
pub struct FanoutStream {
    reader: BufReader<OwnedReadHalf>,
    // Keep the write half alive so the manager does not see a half-closed socket
    _writer: tokio::net::tcp::OwnedWriteHalf,
    peer_addr: SocketAddr,
}

impl FanoutStream {
    /// Connect to the manager's fanout endpoint
    ///
    /// # Errors
    /// Connect failure is fatal and propagated to the caller.
    #[instrument(name = "fanout_connect", skip(host))]
    pub async fn connect(host: &str, port: u16) -> Result<Self, QueueError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| QueueError::transport(format!("fanout connect {host}:{port}: {e}")))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| QueueError::transport(format!("fanout peer addr: {e}")))?;
        let (read_half, write_half) = stream.into_split();

        info!(manager = %peer_addr, "Fanout stream connected");
        Ok(Self {
            reader: BufReader::new(read_half),
            _writer: write_half,
            peer_addr,
        })
    }

    /// Manager address this stream is connected to
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl FrameSource for FanoutStream {
    async fn recv(&mut self) -> Option<Bytes> {
        match read_frame(&mut self.reader).await {
            Ok(frame) => frame,
            Err(e) => {
                error!(manager = %self.peer_addr, error = %e, "Fanout read failed");
                None
            }
        }
    }
}
