pub mod library;

use anyhow::{Context, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use shared::{FeedMsg, decode_subject};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

pub use library::{ReportLibrary, synthesize_report, threat_level};

const FEED_PATH_PREFIX: &str = "/ws/";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedServerOptions {
    /// Pause between `analyzing` and the report that follows it.
    pub analysis_delay: Duration,
    /// Pause between the end of one cycle and the next `analyzing`.
    pub update_interval: Duration,
}

impl Default for FeedServerOptions {
    fn default() -> Self {
        Self {
            analysis_delay: Duration::from_secs(2),
            update_interval: Duration::from_secs(60),
        }
    }
}

type FeedSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type FeedSource = SplitStream<WebSocketStream<TcpStream>>;

pub async fn run_server_daemon(
    port: u16,
    library: ReportLibrary,
    options: FeedServerOptions,
) -> Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Feed server listening on ws://{}{}{{subject}}", addr, FEED_PATH_PREFIX);
    start_server(listener, Arc::new(library), options).await
}

pub async fn start_server(
    listener: TcpListener,
    library: Arc<ReportLibrary>,
    options: FeedServerOptions,
) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("New connection from {}", peer);
        let library = library.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, library, options).await {
                log::error!("Connection error: {:#}", e);
            }
        });
    }
}

/// Subject encoded in a `/ws/{subject}` request path.
pub fn subject_from_path(path: &str) -> Option<String> {
    let segment = path.strip_prefix(FEED_PATH_PREFIX)?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    let subject = decode_subject(segment)?;
    if subject.trim().is_empty() {
        return None;
    }
    Some(subject)
}

async fn handle_connection(
    stream: TcpStream,
    library: Arc<ReportLibrary>,
    options: FeedServerOptions,
) -> Result<()> {
    let mut path = String::new();
    let capture_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };
    let ws_stream = accept_hdr_async(stream, capture_path)
        .await
        .context("WebSocket handshake failed")?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let Some(subject) = subject_from_path(&path) else {
        log::warn!("Rejecting unknown feed path {}", path);
        let message = FeedMsg::Error {
            message: format!("Unknown feed path: {}", path),
        };
        send(&mut ws_tx, &message).await?;
        ws_tx.close().await?;
        return Ok(());
    };

    log::info!("Client subscribed to '{}'", subject);
    tokio::select! {
        result = publish_cycles(&mut ws_tx, &library, &subject, options) => result?,
        () = wait_for_close(&mut ws_rx) => {
            log::info!("Client for '{}' disconnected", subject);
        }
    }
    Ok(())
}

/// `analyzing`, then the report, then wait; forever.
async fn publish_cycles(
    ws_tx: &mut FeedSink,
    library: &ReportLibrary,
    subject: &str,
    options: FeedServerOptions,
) -> Result<()> {
    let mut cycle = 0u64;
    loop {
        let analyzing = FeedMsg::Analyzing {
            conflict: Some(subject.to_string()),
        };
        send(ws_tx, &analyzing).await?;
        tokio::time::sleep(options.analysis_delay).await;

        let report = library.report_for(subject, cycle);
        log::info!("Cycle {} for '{}': {}", cycle, subject, report.status_tag());
        send(ws_tx, &report).await?;
        cycle += 1;
        tokio::time::sleep(options.update_interval).await;
    }
}

async fn wait_for_close(ws_rx: &mut FeedSource) {
    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Err(e) => {
                log::warn!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }
}

async fn send(ws_tx: &mut FeedSink, message: &FeedMsg) -> Result<()> {
    let json = message.to_json().context("Failed to encode feed message")?;
    ws_tx
        .send(Message::Text(json.into()))
        .await
        .context("Failed to send feed message")
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontend::connection::{
        ConnectionStatus, FeedFrame, FeedTransport, StreamingSyncClient, SyncOptions,
        WebSocketTransport,
    };
    use frontend::registry::EntityRegistry;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn spawn_server(library: ReportLibrary) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let options = FeedServerOptions {
            analysis_delay: Duration::from_millis(20),
            update_interval: Duration::from_millis(100),
        };
        tokio::spawn(start_server(listener, Arc::new(library), options));
        format!("ws://{}/ws", addr)
    }

    async fn next_message(frames: &mut frontend::connection::FeedStream) -> FeedMsg {
        match timeout(WAIT, frames.next()).await.unwrap() {
            Some(FeedFrame::Text(text)) => FeedMsg::parse(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[test]
    fn parses_subject_paths() {
        assert_eq!(subject_from_path("/ws/US-Iran").as_deref(), Some("US-Iran"));
        assert_eq!(
            subject_from_path("/ws/Israel%20Palestine").as_deref(),
            Some("Israel Palestine")
        );
        assert_eq!(subject_from_path("/ws/"), None);
        assert_eq!(subject_from_path("/ws/%20"), None);
        assert_eq!(subject_from_path("/api/ukraine"), None);
        assert_eq!(subject_from_path("/ws/a/b"), None);
    }

    #[tokio::test]
    async fn loopback_cycles_analyzing_then_report() {
        let base_url = spawn_server(ReportLibrary::new(EntityRegistry::builtin())).await;
        let mut frames = WebSocketTransport
            .connect(&format!("{}/Ukraine", base_url))
            .await
            .unwrap();

        assert_eq!(
            next_message(&mut frames).await,
            FeedMsg::Analyzing {
                conflict: Some("Ukraine".to_string())
            }
        );
        match next_message(&mut frames).await {
            FeedMsg::Report(report) => {
                assert_eq!(report.conflict, "Ukraine");
                assert!(report.geoint.is_some());
            }
            other => panic!("expected a report, got {:?}", other),
        }
        assert_eq!(next_message(&mut frames).await.status_tag(), "analyzing");
    }

    #[tokio::test]
    async fn unknown_path_gets_error_and_close() {
        let base_url = spawn_server(ReportLibrary::new(EntityRegistry::builtin())).await;
        let root = base_url.trim_end_matches("/ws");
        let mut frames = WebSocketTransport
            .connect(&format!("{}/status", root))
            .await
            .unwrap();

        assert_eq!(next_message(&mut frames).await.status_tag(), "error");
        assert_eq!(timeout(WAIT, frames.next()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sync_client_receives_fixture_report() {
        let mut library = ReportLibrary::new(EntityRegistry::builtin());
        library
            .insert_fixture(
                "Ukraine",
                FeedMsg::parse(r#"{"status": "ok", "conflict": "Ukraine", "escalation_score": 7.2}"#)
                    .unwrap(),
            )
            .unwrap();
        let base_url = spawn_server(library).await;

        let (client, _diagnostics) = StreamingSyncClient::new(
            "Ukraine",
            SyncOptions {
                base_url,
                reconnect_delay: Duration::from_millis(200),
            },
            Arc::new(WebSocketTransport),
        );

        let snapshot = timeout(
            WAIT,
            client.signal().wait_for(|snapshot| snapshot.payload.is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
        assert_eq!(
            snapshot.payload.and_then(|payload| payload.escalation_score),
            Some(7.2)
        );
        assert!(snapshot.last_updated.is_some());
        client.stop();
    }
}
