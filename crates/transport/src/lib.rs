//! # Transport
//!
//! Wire channels for the dispatch subsystem, over TCP with one UTF-8 JSON
//! document per newline-terminated frame.
//!
//! - **Fan-out channel**: one bound manager endpoint, any number of
//!   connected workers; each accepted frame goes to exactly one ready peer
//!   (round-robin), sends are non-blocking with zero wait.
//! - **Notify channel**: strict request/reply from each worker back to the
//!   manager, used to report per-job outcome.
//!
//! Neither channel acknowledges receipt at the transport layer; delivery is
//! at-most-once by design.

mod fanout;
mod framing;
mod metrics;
mod notify;
mod peer;

pub use fanout::{FanoutBinding, FanoutStream};
pub use framing::{read_frame, write_frame};
pub use metrics::{ChannelMetrics, ChannelMetricsSnapshot};
pub use notify::{NotifyBinding, NotifyClient, NotifyRequest};
pub use peer::PeerHandle;
