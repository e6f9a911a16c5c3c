//! Reconnecting feed client
//!
//! One [`StreamingSyncClient`] keeps one subject's view in sync with the
//! producer. A single task owns the physical connection, the pending connect
//! and the reconnect timer, so teardown is always "drop, then reopen".

use super::reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectTimer, poll_slot};
use super::status::{ConnectionStatus, SyncDiagnostic, SyncSnapshot, TransportEvent};
use super::transport::{FeedFrame, FeedStream, FeedTransport, TransportError};
use crate::dataflow::{Actor, Relay, relay};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::future::BoxFuture;
use futures::future::pending;
use shared::ConflictReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub base_url: String,
    pub reconnect_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&shared::FeedSection::default())
    }
}

impl From<&shared::FeedSection> for SyncOptions {
    fn from(feed: &shared::FeedSection) -> Self {
        Self {
            base_url: feed.base_url.clone(),
            reconnect_delay: Duration::from_millis(feed.reconnect_delay_ms),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StreamingSyncClient {
    state: Actor<SyncSnapshot>,
    pub refresh_pressed_relay: Relay<()>,
    pub subject_changed_relay: Relay<String>,
}

impl StreamingSyncClient {
    /// Starts connecting to `subject` immediately. Malformed messages are
    /// reported on the returned diagnostic stream.
    pub fn new(
        subject: impl Into<String>,
        options: SyncOptions,
        transport: Arc<dyn FeedTransport>,
    ) -> (Self, UnboundedReceiver<SyncDiagnostic>) {
        let subject = subject.into();
        let (refresh_pressed_relay, refresh_pressed_stream) = relay();
        let (subject_changed_relay, subject_changed_stream) = relay();
        let (diagnostic_sender, diagnostic_stream) = unbounded();

        let state = Actor::new(SyncSnapshot::new(subject.clone()), async move |state| {
            let reconnect_delay = if options.reconnect_delay.is_zero() {
                DEFAULT_RECONNECT_DELAY
            } else {
                options.reconnect_delay
            };
            let mut session = Session {
                state,
                transport,
                base_url: options.base_url,
                diagnostics: diagnostic_sender,
                connecting: None,
                frames: None,
                reconnect: ReconnectTimer::new(reconnect_delay),
                attempt: 0,
            };
            session
                .run(subject, subject_changed_stream, refresh_pressed_stream)
                .await;
        });

        (
            Self {
                state,
                refresh_pressed_relay,
                subject_changed_relay,
            },
            diagnostic_stream,
        )
    }

    pub fn current_payload(&self) -> Option<Arc<ConflictReport>> {
        self.state.with(|snapshot| snapshot.payload.clone())
    }

    pub fn current_status(&self) -> ConnectionStatus {
        self.state.with(|snapshot| snapshot.status)
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.with(|snapshot| snapshot.last_updated)
    }

    pub fn subject(&self) -> String {
        self.state.with(|snapshot| snapshot.subject.clone())
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.snapshot()
    }

    pub fn signal(&self) -> watch::Receiver<SyncSnapshot> {
        self.state.signal()
    }

    /// Force-close the current connection and reopen it right away.
    pub fn refresh(&self) {
        self.refresh_pressed_relay.send(());
    }

    pub fn on_subject_change(&self, subject: impl Into<String>) {
        self.subject_changed_relay.send(subject.into());
    }

    /// Close the connection and cancel any pending reconnect. The last
    /// snapshot stays readable.
    pub fn stop(&self) {
        self.state.stop();
    }
}

type ConnectFuture = BoxFuture<'static, Result<FeedStream, TransportError>>;

struct Session {
    state: watch::Sender<SyncSnapshot>,
    transport: Arc<dyn FeedTransport>,
    base_url: String,
    diagnostics: UnboundedSender<SyncDiagnostic>,
    connecting: Option<ConnectFuture>,
    frames: Option<FeedStream>,
    reconnect: ReconnectTimer,
    attempt: u64,
}

impl Session {
    async fn run(
        &mut self,
        subject: String,
        mut subject_changed_stream: UnboundedReceiver<String>,
        mut refresh_pressed_stream: UnboundedReceiver<()>,
    ) {
        self.open(&subject);

        loop {
            tokio::select! {
                biased;
                Some(subject) = subject_changed_stream.next() => {
                    if self.state.borrow().subject == subject {
                        log::debug!("Subject '{}' already active", subject);
                        continue;
                    }
                    self.teardown();
                    self.state.send_modify(|snapshot| snapshot.subject = subject.clone());
                    self.open(&subject);
                }
                Some(()) = refresh_pressed_stream.next() => {
                    let subject = self.state.borrow().subject.clone();
                    log::info!("Refreshing feed for '{}'", subject);
                    self.teardown();
                    self.open(&subject);
                }
                result = poll_slot(&mut self.connecting) => {
                    self.connecting = None;
                    match result {
                        Ok(frames) => {
                            log::info!("Feed connection #{} open", self.attempt);
                            self.frames = Some(frames);
                            self.apply(TransportEvent::Opened);
                        }
                        Err(error) => {
                            log::warn!("Feed connection #{} failed: {}", self.attempt, error);
                            self.apply(TransportEvent::TransportError(error.to_string()));
                            self.closed();
                        }
                    }
                }
                frame = next_frame(&mut self.frames) => match frame {
                    Some(FeedFrame::Text(text)) => self.apply(TransportEvent::Message(text)),
                    Some(FeedFrame::Error(reason)) => {
                        log::warn!("Feed connection #{} error: {}", self.attempt, reason);
                        self.apply(TransportEvent::TransportError(reason));
                    }
                    None => {
                        self.frames = None;
                        self.closed();
                    }
                },
                () = self.reconnect.fired() => {
                    let subject = self.state.borrow().subject.clone();
                    self.open(&subject);
                }
            }
        }
    }

    fn open(&mut self, subject: &str) {
        self.reconnect.cancel();
        self.attempt += 1;
        let url = shared::feed_url(&self.base_url, subject);
        log::info!("Opening feed connection #{} to {}", self.attempt, url);
        self.apply(TransportEvent::Opening);
        self.connecting = Some(self.transport.connect(&url));
    }

    /// Drop whatever connection exists without scheduling a reconnect.
    fn teardown(&mut self) {
        if self.reconnect.is_pending() {
            log::debug!("Cancelled pending reconnect after connection #{}", self.attempt);
        }
        self.reconnect.cancel();
        if self.connecting.take().is_some() || self.frames.take().is_some() {
            log::info!("Closed feed connection #{}", self.attempt);
        }
        self.apply(TransportEvent::Closed);
    }

    fn closed(&mut self) {
        log::info!(
            "Feed connection #{} closed, reconnecting in {:?}",
            self.attempt,
            self.reconnect.delay()
        );
        self.apply(TransportEvent::Closed);
        self.reconnect.schedule();
    }

    fn apply(&mut self, event: TransportEvent) {
        let now = Utc::now();
        let mut diagnostic = None;
        self.state.send_modify(|snapshot| {
            diagnostic = snapshot.apply(event, now);
        });
        if let Some(diagnostic) = diagnostic {
            let SyncDiagnostic::MalformedMessage { subject, error, .. } = &diagnostic;
            log::warn!("Discarding malformed feed message for '{}': {}", subject, error);
            let _ = self.diagnostics.unbounded_send(diagnostic);
        }
    }
}

async fn next_frame(frames: &mut Option<FeedStream>) -> Option<FeedFrame> {
    match frames.as_mut() {
        Some(frames) => frames.next().await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::MockTransport;
    use tokio::time::Instant;

    const REPORT_7_2: &str = r#"{
        "status": "ok",
        "conflict": "ukraine",
        "escalation_score": 7.2,
        "threat_level": "HIGH",
        "key_findings": ["Artillery exchanges intensify"],
        "scenarios": [{"description": "Frozen front", "probability": 0.6}],
        "summary": "Escalating"
    }"#;

    fn options() -> SyncOptions {
        SyncOptions {
            base_url: "ws://feed.test/ws".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    fn start(subject: &str, transport: &MockTransport) -> StreamingSyncClient {
        let (client, _diagnostics) =
            StreamingSyncClient::new(subject, options(), Arc::new(transport.clone()));
        client
    }

    async fn wait_status(client: &StreamingSyncClient, status: ConnectionStatus) {
        client
            .signal()
            .wait_for(|snapshot| snapshot.status == status)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn analyzing_keeps_payload_and_ok_replaces_it() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;
        assert_eq!(transport.url(0).as_deref(), Some("ws://feed.test/ws/ukraine"));

        assert!(transport.push(0, r#"{"status":"analyzing","conflict":"ukraine"}"#));
        wait_status(&client, ConnectionStatus::Analyzing).await;
        assert!(client.current_payload().is_none());
        assert!(client.last_updated_at().is_none());

        assert!(transport.push(0, REPORT_7_2));
        wait_status(&client, ConnectionStatus::Connected).await;
        let payload = client.current_payload().unwrap();
        assert_eq!(payload.escalation_score, Some(7.2));
        assert_eq!(payload.scenarios.len(), 1);
        assert!(client.last_updated_at().is_some());

        assert!(transport.push(0, r#"{"status":"analyzing"}"#));
        wait_status(&client, ConnectionStatus::Analyzing).await;
        assert_eq!(client.current_payload().unwrap().escalation_score, Some(7.2));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_close_reconnects_once_after_delay() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;

        let closed_at = Instant::now();
        transport.close(0);
        wait_status(&client, ConnectionStatus::Disconnected).await;

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(transport.attempts(), 1);

        wait_status(&client, ConnectionStatus::Connected).await;
        assert_eq!(transport.attempts(), 2);
        let reopened_at = transport.attempt_instant(1).unwrap();
        assert!(reopened_at - closed_at >= Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_goes_through_error_and_retries() {
        let transport = MockTransport::new();
        transport.refuse_next(1);
        let client = start("sudan", &transport);

        client
            .signal()
            .wait_for(|snapshot| snapshot.last_error.is_some())
            .await
            .unwrap();
        assert_eq!(client.current_status(), ConnectionStatus::Disconnected);
        assert_eq!(transport.attempts(), 1);

        wait_status(&client, ConnectionStatus::Connected).await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn subject_changes_keep_a_single_live_connection() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;
        transport.push(0, REPORT_7_2);
        client
            .signal()
            .wait_for(|snapshot| snapshot.payload.is_some())
            .await
            .unwrap();

        for subject in ["US-Iran", "Taiwan Strait", "syria"] {
            client.on_subject_change(subject);
        }
        client
            .signal()
            .wait_for(|snapshot| {
                snapshot.subject == "syria" && snapshot.status == ConnectionStatus::Connected
            })
            .await
            .unwrap();

        assert_eq!(transport.max_live_connections(), 1);
        assert_eq!(transport.live_connections(), 1);
        assert_eq!(
            transport.url(transport.attempts() - 1).as_deref(),
            Some("ws://feed.test/ws/syria")
        );
        assert_eq!(transport.url(1).as_deref(), Some("ws://feed.test/ws/US-Iran"));
        // previous subject's payload stays until the new subject reports
        assert_eq!(client.current_payload().unwrap().conflict, "ukraine");
    }

    #[tokio::test(start_paused = true)]
    async fn torn_down_connection_cannot_mutate_payload() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;

        client.on_subject_change("yemen");
        client
            .signal()
            .wait_for(|snapshot| {
                snapshot.subject == "yemen" && snapshot.status == ConnectionStatus::Connected
            })
            .await
            .unwrap();

        assert!(!transport.push(0, REPORT_7_2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(client.current_payload().is_none());
        assert_eq!(client.current_status(), ConnectionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn subject_change_cancels_pending_reconnect() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;

        transport.close(0);
        wait_status(&client, ConnectionStatus::Disconnected).await;
        client.on_subject_change("korea");
        wait_status(&client, ConnectionStatus::Connected).await;
        assert_eq!(transport.attempts(), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.url(1).as_deref(), Some("ws://feed.test/ws/korea"));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_reopens_and_cancels_pending_reconnect() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;

        client.refresh();
        client
            .signal()
            .wait_for(|_| transport.attempts() == 2)
            .await
            .unwrap();
        wait_status(&client, ConnectionStatus::Connected).await;
        assert!(!transport.push(0, r#"{"status":"analyzing"}"#));
        assert_eq!(transport.live_connections(), 1);

        transport.close(1);
        wait_status(&client, ConnectionStatus::Disconnected).await;
        client.refresh();
        wait_status(&client, ConnectionStatus::Connected).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_messages_only_reach_diagnostics() {
        let transport = MockTransport::new();
        let (client, mut diagnostics) =
            StreamingSyncClient::new("ukraine", options(), Arc::new(transport.clone()));
        wait_status(&client, ConnectionStatus::Connected).await;

        transport.push(0, "garbage");
        transport.push(0, r#"{"status":"celebrating"}"#);

        for _ in 0..2 {
            let diagnostic = diagnostics.next().await.unwrap();
            assert!(matches!(diagnostic, SyncDiagnostic::MalformedMessage { .. }));
        }
        assert_eq!(client.current_status(), ConnectionStatus::Connected);
        assert!(client.current_payload().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_connection_and_cancels_reconnect() {
        let transport = MockTransport::new();
        let client = start("ukraine", &transport);
        wait_status(&client, ConnectionStatus::Connected).await;
        transport.close(0);
        wait_status(&client, ConnectionStatus::Disconnected).await;

        client.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.attempts(), 1);
        assert_eq!(transport.live_connections(), 0);
    }
}
