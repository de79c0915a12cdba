//! Notify channel - request/reply outcome reporting
//!
//! Each worker opens one requesting connection; the manager replies. The
//! protocol is strict request-then-reply: a worker sends exactly one frame
//! and waits for the reply before it may send again on that connection, so
//! the manager's serving loop must answer every request it receives.

use std::net::SocketAddr;

use bytes::Bytes;
use contracts::{NotifyOutlet, QueueError};
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::framing::{read_frame, write_frame};

/// One received notify request with its pending reply slot
///
/// Dropping the request without calling [`reply`] closes the worker's
/// connection; the serving loop is expected to reply to every request.
///
/// [`reply`]: NotifyRequest::reply
pub struct NotifyRequest {
    /// Request frame as received
    pub frame: Bytes,
    reply_tx: oneshot::Sender<Bytes>,
    peer: SocketAddr,
}

impl NotifyRequest {
    /// Worker address this request came from
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Release the acknowledgement back to the requesting worker
    pub fn reply(self, frame: Bytes) {
        // A send failure means the worker already went away; nothing to do
        let _ = self.reply_tx.send(frame);
    }
}

/// Manager-side notify endpoint
pub struct NotifyBinding {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<NotifyRequest>,
    accept_handle: JoinHandle<()>,
}

impl NotifyBinding {
    /// Bind the notify endpoint and start accepting workers
    ///
    /// # Errors
    /// Bind failure is fatal and propagated to the caller.
    #[instrument(name = "notify_bind", skip(host))]
    pub async fn bind(host: &str, port: u16, queue_capacity: usize) -> Result<Self, QueueError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| QueueError::transport(format!("notify bind {host}:{port}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| QueueError::transport(format!("notify local addr: {e}")))?;

        let (tx, rx) = mpsc::channel(queue_capacity);
        let accept_handle = tokio::spawn(async move {
            accept_notifiers(listener, tx).await;
        });

        info!(addr = %local_addr, "Notify endpoint bound");
        Ok(Self {
            local_addr,
            rx,
            accept_handle,
        })
    }

    /// Bound local address (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receive the next request; `None` once the endpoint is shut down
    pub async fn next(&mut self) -> Option<NotifyRequest> {
        self.rx.recv().await
    }

    /// Stop accepting new connections
    pub fn shutdown(&self) {
        self.accept_handle.abort();
    }
}

impl Drop for NotifyBinding {
    fn drop(&mut self) {
        self.accept_handle.abort();
    }
}

/// Accept loop: one lock-step reader task per worker connection
async fn accept_notifiers(listener: TcpListener, tx: mpsc::Sender<NotifyRequest>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(peer = %addr, "Notifier connected");
                let conn_tx = tx.clone();
                tokio::spawn(async move {
                    serve_connection(stream, addr, conn_tx).await;
                });
            }
            Err(e) => {
                error!(error = %e, "Notify accept failed");
            }
        }
    }
}

/// Per-connection loop: read one request, forward it, await the reply,
/// write it back. Strictly sequential per connection by construction.
async fn serve_connection(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<NotifyRequest>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                error!(peer = %peer, error = %e, "Notify read failed");
                break;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = NotifyRequest {
            frame,
            reply_tx,
            peer,
        };
        if tx.send(request).await.is_err() {
            // Endpoint shut down
            break;
        }

        let Ok(reply) = reply_rx.await else {
            // Request dropped without a reply; close rather than stall the worker
            error!(peer = %peer, "Notify request dropped without reply");
            break;
        };
        if let Err(e) = write_frame(&mut write_half, &reply).await {
            error!(peer = %peer, error = %e, "Notify reply write failed");
            break;
        }
    }

    debug!(peer = %peer, "Notifier disconnected");
}

/// Worker-side notify requester
pub struct NotifyClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer_addr: SocketAddr,
}

impl NotifyClient {
    /// Connect to the manager's notify endpoint
    ///
    /// # Errors
    /// Connect failure is fatal and propagated to the caller.
    #[instrument(name = "notify_connect", skip(host))]
    pub async fn connect(host: &str, port: u16) -> Result<Self, QueueError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| QueueError::transport(format!("notify connect {host}:{port}: {e}")))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| QueueError::transport(format!("notify peer addr: {e}")))?;
        let (read_half, write_half) = stream.into_split();

        info!(manager = %peer_addr, "Notify client connected");
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer_addr,
        })
    }

    /// Manager address this client is connected to
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl NotifyOutlet for NotifyClient {
    async fn request(&mut self, frame: Bytes) -> Result<Bytes, QueueError> {
        write_frame(&mut self.writer, &frame)
            .await
            .map_err(|e| QueueError::transport(format!("notify send: {e}")))?;
        read_frame(&mut self.reader)
            .await
            .map_err(|e| QueueError::transport(format!("notify receive: {e}")))?
            .ok_or_else(|| QueueError::transport("notify connection closed"))
    }
}
