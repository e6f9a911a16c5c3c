//! Live feed synchronization
//!
//! [`StreamingSyncClient`] owns one reconnecting connection per subject and
//! publishes a [`SyncSnapshot`] (status, payload, last update) to the view.

pub mod client;
pub mod reconnect;
pub mod status;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{StreamingSyncClient, SyncOptions};
pub use reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectTimer};
pub use status::{ConnectionStatus, SyncDiagnostic, SyncSnapshot, TransportEvent};
pub use transport::{FeedFrame, FeedStream, FeedTransport, TransportError, WebSocketTransport};
