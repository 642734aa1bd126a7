//! Audit trail for verification attempts.
//!
//! At most one event is emitted per invocation. Sinks are fire-and-forget:
//! an unavailable sink is reported through the diagnostic log and the
//! verification proceeds untouched. The file sink writes JSON Lines, one
//! complete object per attempt, so run-script logs stay greppable and
//! machine-readable.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Peer placeholder when the environment exposes no remote address.
pub const UNKNOWN_PEER: &str = "UNKNOWN HOST";

/// One verification attempt as seen by the audit trail. Never contains the
/// password, the challenge, or unsanitized backend bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the attempt was recorded (UTC).
    pub timestamp: DateTime<Utc>,
    /// Remote peer address, or [`UNKNOWN_PEER`].
    pub peer: String,
    /// Sanitized backend text or bind verdict wording.
    pub detail: String,
}

impl AuditEvent {
    /// Create an event stamped with the current UTC time.
    pub fn new(detail: impl Into<String>, peer: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            peer: peer.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:IP:{}", self.detail, self.peer)
    }
}

/// Destination for audit events.
///
/// Implementations must make a best effort to persist the event; failures
/// are logged, never propagated, so auditing cannot abort a verification.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits the event into the diagnostic log stream (stderr under the mail
/// server's logger), preserving the historical `detail:IP:peer` shape.
#[derive(Debug, Clone, Copy)]
pub struct LogAudit;

impl AuditSink for LogAudit {
    fn record(&self, event: &AuditEvent) {
        info!(target: "audit", peer = %event.peer, "{}", event.detail);
    }
}

/// Appends one JSON line per event to a file.
///
/// The file is opened per event; the relay is single-shot, so there is
/// nothing to keep open between events.
#[derive(Debug)]
pub struct FileAudit {
    path: PathBuf,
}

impl FileAudit {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AuditSink for FileAudit {
    fn record(&self, event: &AuditEvent) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| {
                let json = serde_json::to_string(event).map_err(std::io::Error::other)?;
                file.write_all(json.as_bytes())?;
                file.write_all(b"\n")?;
                file.flush()
            });
        if let Err(e) = result {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to write audit event, event lost"
            );
        }
    }
}

/// Discards every event. Used when auditing is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _event: &AuditEvent) {}
}

/// Collects events in memory so tests can assert on what was emitted.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_event_display_shape() {
        let event = AuditEvent::new("auth ok", "203.0.113.9");
        assert_eq!(event.to_string(), "auth ok:IP:203.0.113.9");
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = AuditEvent::new("passdb: rejected", UNKNOWN_PEER);
        let json = serde_json::to_string(&event).unwrap();
        let back: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.detail, event.detail);
        assert_eq!(back.peer, event.peer);
        assert_eq!(back.timestamp, event.timestamp);
    }

    #[test]
    fn test_file_audit_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attempts.log");
        let sink = FileAudit::new(path.clone());

        sink.record(&AuditEvent::new("auth ok", "198.51.100.4"));
        sink.record(&AuditEvent::new("auth failed", UNKNOWN_PEER));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.detail, "auth ok");
        assert_eq!(first.peer, "198.51.100.4");
        let second: AuditEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.peer, UNKNOWN_PEER);
    }

    #[test]
    fn test_file_audit_unwritable_path_does_not_panic() {
        let sink = FileAudit::new(PathBuf::from("/nonexistent-dir/attempts.log"));
        sink.record(&AuditEvent::new("lost", UNKNOWN_PEER));
    }

    #[test]
    fn test_memory_audit_collects() {
        let sink = MemoryAudit::new();
        sink.record(&AuditEvent::new("one", "a"));
        sink.record(&AuditEvent::new("two", "b"));
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].detail, "one");
        assert_eq!(events[1].peer, "b");
    }

    #[test]
    fn test_null_audit_discards() {
        NullAudit.record(&AuditEvent::new("gone", "peer"));
    }
}
