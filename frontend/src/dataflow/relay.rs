//! Event streaming Relay
//!
//! Relays carry UI gestures and control events into Actors over unbounded
//! channels. Sending never blocks, so gesture handlers stay short.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

/// Type-safe event relay for the Actor+Relay architecture.
///
/// # Event-Source Naming Convention
///
/// Relays follow the `{source}_{event}_relay` pattern:
/// - `map_gesture_relay` - any pointer or toolbar gesture on the map
/// - `refresh_pressed_relay` - user asked for a manual reconnect
/// - `subject_changed_relay` - the selected conflict changed
///
/// # Examples
///
/// ```rust
/// use frontend::dataflow::relay;
/// use futures::StreamExt;
///
/// # futures::executor::block_on(async {
/// let (link_clicked_relay, mut link_clicked_stream) = relay::<String>();
/// link_clicked_relay.send("link-3".to_string());
/// assert_eq!(link_clicked_stream.next().await.as_deref(), Some("link-3"));
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: UnboundedSender<T>,
}

/// Error type for Relay operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The receiving Actor is gone (stream dropped)
    ChannelClosed,
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a Relay with its receiving stream. `relay()` is the short form.
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (Relay { sender }, receiver)
    }

    /// Send an event. Events sent after the Actor stopped are dropped.
    pub fn send(&self, value: T) {
        let _ = self.sender.unbounded_send(value);
    }

    /// Send an event and report whether anyone is still listening.
    pub fn try_send(&self, value: T) -> Result<(), RelayError> {
        self.sender
            .unbounded_send(value)
            .map_err(|_| RelayError::ChannelClosed)
    }

    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl<T> Default for Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A disconnected relay whose events are discarded.
    fn default() -> Self {
        let (relay, _receiver) = Self::new();
        relay
    }
}

/// Creates a new Relay with an associated receiver stream.
pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new()
}
