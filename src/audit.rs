// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for authentication events.
//!
//! Every login attempt and every token check is recorded through an
//! [`AuditSink`]. Sinks never fail the operation being audited: write errors
//! are logged and dropped.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Credential events
    LoginSucceeded,
    LoginFailed,
    Registered,

    // Token events
    TokenAccepted,
    TokenRejected,

    Logout,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Identity involved (if known).
    pub user_id: Option<String>,
    /// IP address of the request (if available).
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    /// Failure reason.
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            ip_address: None,
            user_agent: None,
            success: true,
            error: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_ip(mut self, ip: Option<impl Into<String>>) -> Self {
        self.ip_address = ip.map(Into::into);
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<impl Into<String>>) -> Self {
        self.user_agent = user_agent.map(Into::into);
        self
    }

    /// Mark as failed with a reason.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        info!(
            target: "audit",
            event_id = %event.event_id,
            event_type = ?event.event_type,
            user_id = event.user_id.as_deref(),
            ip = event.ip_address.as_deref(),
            success = event.success,
            error = event.error.as_deref(),
            "Audit event"
        );
    }
}

/// Appends events to a file, one JSON object per line.
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every event in the file.
    pub fn read_events(&self) -> std::io::Result<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(std::io::Error::other))
            .collect()
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) {
        let mut line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize audit event");
                return;
            }
        };
        line.push('\n');

        let Ok(mut file) = self.file.lock() else {
            warn!("Audit log lock poisoned; event dropped");
            return;
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "Failed to write audit event");
        }
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::LoginSucceeded)
            .with_user("17")
            .with_ip(Some("192.168.1.1"))
            .with_user_agent(None::<String>);

        assert_eq!(event.event_type, AuditEventType::LoginSucceeded);
        assert_eq!(event.user_id.as_deref(), Some("17"));
        assert_eq!(event.ip_address.as_deref(), Some("192.168.1.1"));
        assert!(event.user_agent.is_none());
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::TokenRejected).failed("token has expired");
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("token has expired"));
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_value(AuditEvent::new(AuditEventType::TokenAccepted)).unwrap();
        assert_eq!(json["event_type"], "token_accepted");
    }

    #[test]
    fn jsonl_sink_appends_and_reads_back() {
        let temp = TempDir::new().unwrap();
        let sink = JsonlAuditSink::open(temp.path().join("audit.jsonl")).unwrap();

        sink.record(&AuditEvent::new(AuditEventType::LoginSucceeded).with_user("1"));
        sink.record(&AuditEvent::new(AuditEventType::LoginFailed).failed("invalid password"));

        let events = sink.read_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::LoginSucceeded);
        assert_eq!(events[1].error.as_deref(), Some("invalid password"));
    }

    #[test]
    fn jsonl_sink_keeps_existing_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.jsonl");
        JsonlAuditSink::open(&path)
            .unwrap()
            .record(&AuditEvent::new(AuditEventType::Logout));

        let sink = JsonlAuditSink::open(&path).unwrap();
        sink.record(&AuditEvent::new(AuditEventType::Logout));
        assert_eq!(sink.read_events().unwrap().len(), 2);
    }

    #[test]
    fn memory_sink_collects() {
        let sink = MemoryAuditSink::new();
        sink.record(&AuditEvent::new(AuditEventType::TokenAccepted));
        assert_eq!(sink.events().len(), 1);
    }
}
