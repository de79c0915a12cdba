//! Channel traits - transport seams for dispatch and worker loops
//!
//! Abstract the two wire channels so the dispatcher and worker loop stay
//! generic over concrete sockets (and mockable in tests).

use bytes::Bytes;

use crate::QueueError;

/// Outbound fan-out endpoint (manager side)
///
/// Sends are non-blocking with zero wait: an accepted frame goes to exactly
/// one ready consumer; with no consumer immediately ready the send fails
/// synchronously instead of queuing indefinitely.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Offer one frame to exactly one ready peer
    ///
    /// # Errors
    /// [`QueueError::NoReadyPeer`] when no connected peer can accept the
    /// frame right now; [`QueueError::Transport`] on endpoint failure.
    async fn send(&self, frame: Bytes) -> Result<(), QueueError>;
}

/// Inbound fan-out endpoint (worker side)
#[trait_variant::make(FrameSource: Send)]
pub trait LocalFrameSource {
    /// Receive the next frame; `None` means the channel closed
    async fn recv(&mut self) -> Option<Bytes>;
}

/// Request/reply notification endpoint (worker side)
///
/// Strict lock-step: one request, then await the reply before the next
/// request may be issued on this connection (enforced by `&mut self`).
#[trait_variant::make(NotifyOutlet: Send)]
pub trait LocalNotifyOutlet {
    /// Send one request frame and await the acknowledgement frame
    async fn request(&mut self, frame: Bytes) -> Result<Bytes, QueueError>;
}
