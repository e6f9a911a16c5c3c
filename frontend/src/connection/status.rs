//! Connection state machine
//!
//! [`SyncSnapshot::apply`] is the only way the synchronized view changes.
//! The client task feeds it transport events in arrival order.

use chrono::{DateTime, Utc};
use shared::{ConflictReport, FeedMsg};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Analyzing,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Analyzing => "analyzing",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened on the current physical connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opening,
    Opened,
    TransportError(String),
    Message(String),
    Closed,
}

/// Out-of-band reports that never affect the synchronized state.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDiagnostic {
    MalformedMessage {
        subject: String,
        raw: String,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub subject: String,
    pub status: ConnectionStatus,
    /// Last accepted report. Survives errors, reconnects and subject changes.
    pub payload: Option<Arc<ConflictReport>>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Message of the most recent `error` envelope or transport failure.
    pub last_error: Option<String>,
}

impl SyncSnapshot {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            status: ConnectionStatus::Disconnected,
            payload: None,
            last_updated: None,
            last_error: None,
        }
    }

    pub fn apply(&mut self, event: TransportEvent, now: DateTime<Utc>) -> Option<SyncDiagnostic> {
        match event {
            TransportEvent::Opening => self.status = ConnectionStatus::Connecting,
            TransportEvent::Opened => self.status = ConnectionStatus::Connected,
            TransportEvent::TransportError(reason) => {
                if self.status != ConnectionStatus::Disconnected {
                    self.status = ConnectionStatus::Error;
                    self.last_error = Some(reason);
                }
            }
            TransportEvent::Closed => self.status = ConnectionStatus::Disconnected,
            TransportEvent::Message(raw) => match FeedMsg::parse(&raw) {
                Ok(FeedMsg::Analyzing { .. }) => self.status = ConnectionStatus::Analyzing,
                Ok(FeedMsg::Report(report)) => {
                    self.payload = Some(Arc::new(report));
                    self.last_updated = Some(now);
                    self.last_error = None;
                    self.status = ConnectionStatus::Connected;
                }
                Ok(FeedMsg::Error { message }) => {
                    self.status = ConnectionStatus::Error;
                    self.last_error = Some(message);
                }
                Err(error) => {
                    return Some(SyncDiagnostic::MalformedMessage {
                        subject: self.subject.clone(),
                        raw,
                        error: error.to_string(),
                    });
                }
            },
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(subject: &str) -> SyncSnapshot {
        let mut snapshot = SyncSnapshot::new(subject);
        snapshot.apply(TransportEvent::Opening, Utc::now());
        snapshot.apply(TransportEvent::Opened, Utc::now());
        snapshot
    }

    fn message(text: &str) -> TransportEvent {
        TransportEvent::Message(text.to_string())
    }

    #[test]
    fn opening_then_opened_reaches_connected() {
        let mut snapshot = SyncSnapshot::new("ukraine");
        assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
        snapshot.apply(TransportEvent::Opening, Utc::now());
        assert_eq!(snapshot.status, ConnectionStatus::Connecting);
        snapshot.apply(TransportEvent::Opened, Utc::now());
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
    }

    #[test]
    fn ok_replaces_payload_and_stamps_time() {
        let mut snapshot = connected("ukraine");
        let now = Utc::now();
        snapshot.apply(message(r#"{"status":"analyzing"}"#), now);
        assert_eq!(snapshot.status, ConnectionStatus::Analyzing);
        assert!(snapshot.payload.is_none());

        snapshot.apply(
            message(r#"{"status":"ok","conflict":"ukraine","escalation_score":7.2}"#),
            now,
        );
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
        assert_eq!(
            snapshot.payload.as_ref().and_then(|report| report.escalation_score),
            Some(7.2)
        );
        assert_eq!(snapshot.last_updated, Some(now));
    }

    #[test]
    fn later_ok_replaces_rather_than_merges() {
        let mut snapshot = connected("ukraine");
        snapshot.apply(
            message(r#"{"status":"ok","escalation_score":7.2,"key_findings":["a","b"]}"#),
            Utc::now(),
        );
        snapshot.apply(message(r#"{"status":"ok","threat_level":"LOW"}"#), Utc::now());

        let payload = snapshot.payload.unwrap();
        assert_eq!(payload.escalation_score, None);
        assert!(payload.key_findings.is_empty());
        assert_eq!(payload.threat_level.as_deref(), Some("LOW"));
    }

    #[test]
    fn error_envelope_keeps_last_payload() {
        let mut snapshot = connected("syria");
        snapshot.apply(message(r#"{"status":"ok","escalation_score":5.0}"#), Utc::now());
        snapshot.apply(message(r#"{"status":"error","message":"upstream down"}"#), Utc::now());

        assert_eq!(snapshot.status, ConnectionStatus::Error);
        assert_eq!(snapshot.last_error.as_deref(), Some("upstream down"));
        assert!(snapshot.payload.is_some());
    }

    #[test]
    fn malformed_message_changes_nothing() {
        let mut snapshot = connected("yemen");
        snapshot.apply(message(r#"{"status":"analyzing"}"#), Utc::now());
        let before = snapshot.clone();

        for raw in ["not json", r#"{"status":"unknown"}"#, r#"{"escalation_score":1}"#] {
            let diagnostic = snapshot.apply(message(raw), Utc::now());
            assert!(matches!(
                diagnostic,
                Some(SyncDiagnostic::MalformedMessage { ref subject, .. }) if subject == "yemen"
            ));
            assert_eq!(snapshot, before);
        }
    }

    #[test]
    fn transport_error_annotates_then_close_disconnects() {
        for setup in [
            r#"{"status":"analyzing"}"#,
            r#"{"status":"ok"}"#,
        ] {
            let mut snapshot = connected("korea");
            snapshot.apply(message(setup), Utc::now());
            snapshot.apply(TransportEvent::TransportError("reset".into()), Utc::now());
            assert_eq!(snapshot.status, ConnectionStatus::Error);
            snapshot.apply(TransportEvent::Closed, Utc::now());
            assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
        }

        let mut connecting = SyncSnapshot::new("korea");
        connecting.apply(TransportEvent::Opening, Utc::now());
        connecting.apply(TransportEvent::TransportError("refused".into()), Utc::now());
        assert_eq!(connecting.status, ConnectionStatus::Error);
    }

    #[test]
    fn transport_error_after_close_is_ignored() {
        let mut snapshot = connected("drc");
        snapshot.apply(TransportEvent::Closed, Utc::now());
        snapshot.apply(TransportEvent::TransportError("late".into()), Utc::now());
        assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
        assert_eq!(snapshot.last_error, None);
    }
}
