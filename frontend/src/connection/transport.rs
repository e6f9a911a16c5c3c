//! Physical feed connections
//!
//! A transport turns a URL into a stream of [`FeedFrame`]s. The stream ending
//! is the close event; dropping it closes the connection.

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio_tungstenite::tungstenite::{Error, Message};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    Text(String),
    /// Transport-level failure. The stream ends right after it.
    Error(String),
}

pub type FeedStream = BoxStream<'static, FeedFrame>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("connection to {url} refused: {reason}")]
    Refused { url: String, reason: String },
}

pub trait FeedTransport: Send + Sync + 'static {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FeedStream, TransportError>>;
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl FeedTransport for WebSocketTransport {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FeedStream, TransportError>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws_stream, _response) = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok(connected) => connected,
                // the server answered, but not with an upgrade
                Err(Error::Http(response)) => {
                    return Err(TransportError::Refused {
                        reason: format!("HTTP {}", response.status()),
                        url,
                    });
                }
                Err(source) => return Err(TransportError::Connect { url, source }),
            };
            log::debug!("WebSocket handshake with {} complete", url);

            let frames = stream::unfold(Some(ws_stream), |ws_stream| async move {
                let mut ws_stream = ws_stream?;
                loop {
                    match ws_stream.next().await {
                        Some(Ok(Message::Text(text))) => {
                            return Some((FeedFrame::Text(text), Some(ws_stream)));
                        }
                        Some(Ok(Message::Close(_))) | None => return None,
                        // pings are answered by tungstenite; binary frames are not part of the feed
                        Some(Ok(_)) => continue,
                        Some(Err(error)) => {
                            return Some((FeedFrame::Error(error.to_string()), None));
                        }
                    }
                }
            });
            Ok(frames.boxed())
        })
    }
}
