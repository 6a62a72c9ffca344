//! Audit log for consent decisions
//!
//! Provides a trait-based audit system for recording what the user
//! decided and when. Consent managers typically have to evidence
//! recorded decisions, so every mutating store action emits one event.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

/// Error type for audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize audit event: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Type of consent event
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsentEventType {
    /// State hydrated from the backend
    Hydrated,
    /// Every permission accepted and persisted
    AllAccepted,
    /// Every permission declined in memory (nothing persisted)
    AllDeclined,
    /// Current choices persisted
    Saved,
    /// A single permission toggled
    Toggled,
    /// The detail panel was opened
    PanelOpened,
}

/// A recorded consent event
#[derive(Debug, Clone, Serialize)]
pub struct ConsentEvent {
    /// Event time, RFC 3339 UTC
    pub timestamp: String,
    /// What happened
    pub event_type: ConsentEventType,
    /// Affected permission, for per-permission events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

impl ConsentEvent {
    /// Create a new event stamped with the current time
    pub fn new(event_type: ConsentEventType) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type,
            permission: None,
        }
    }

    /// Attach the affected permission name
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }
}

/// Trait for audit event sinks
pub trait AuditSink: Send + Sync {
    /// Record a consent event
    fn record(&self, event: ConsentEvent) -> Result<(), AuditError>;

    /// Flush any buffered events
    fn flush(&self) -> Result<(), AuditError>;
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn record(&self, event: ConsentEvent) -> Result<(), AuditError> {
        (**self).record(event)
    }

    fn flush(&self) -> Result<(), AuditError> {
        (**self).flush()
    }
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Null audit sink (discards all events)
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl NullAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditSink {
    fn record(&self, _event: ConsentEvent) -> Result<(), AuditError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// In-memory audit sink for testing
pub struct MemoryAuditSink {
    events: RwLock<Vec<ConsentEvent>>,
}

impl MemoryAuditSink {
    /// Create a new empty sink
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Get all recorded events
    pub fn events(&self) -> Vec<ConsentEvent> {
        self.events.read().unwrap().clone()
    }

    /// Get event count
    pub fn count(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// Find events by type
    pub fn find_by_type(&self, event_type: ConsentEventType) -> Vec<ConsentEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: ConsentEvent) -> Result<(), AuditError> {
        self.events.write().unwrap().push(event);
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("count", &self.count())
            .finish()
    }
}

/// File-based audit sink (JSONL format)
///
/// Appends one JSON object per event.
pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditSink {
    /// Create a new file audit sink, appending to the file at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: ConsentEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        let mut writer = self.writer.lock().unwrap();
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish()
    }
}
