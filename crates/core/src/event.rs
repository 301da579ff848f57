//! Tool-use events observed from the assistant.
//!
//! Kinds are an open set: anything the host pipeline emits that we do not
//! recognise is kept verbatim as [`EventKind::Other`] and treated as its own
//! symbol by the pattern detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of an observed assistant action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Read,
    Grep,
    Edit,
    MultiEdit,
    Write,
    TodoUpdate,
    Other(String),
}

impl EventKind {
    /// Canonical name, as written in configs and snapshots.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Read => "Read",
            EventKind::Grep => "Grep",
            EventKind::Edit => "Edit",
            EventKind::MultiEdit => "MultiEdit",
            EventKind::Write => "Write",
            EventKind::TodoUpdate => "TodoUpdate",
            EventKind::Other(name) => name,
        }
    }

    /// Whether the subject of this kind is a project file.
    pub fn is_file_access(&self) -> bool {
        matches!(
            self,
            EventKind::Read | EventKind::Edit | EventKind::MultiEdit | EventKind::Write
        )
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim() {
            "Read" => EventKind::Read,
            "Grep" => EventKind::Grep,
            "Edit" => EventKind::Edit,
            "MultiEdit" => EventKind::MultiEdit,
            "Write" => EventKind::Write,
            "TodoUpdate" | "TodoWrite" => EventKind::TodoUpdate,
            other => EventKind::Other(other.to_string()),
        };
        Ok(kind)
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        EventKind::from(s.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as delivered by the host pipeline, before the log assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub kind: EventKind,

    /// File path or todo id
    #[serde(default)]
    pub subject: String,

    /// Defaults to the ingestion time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventInput {
    pub fn new(kind: impl Into<EventKind>, subject: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            subject: subject.into(),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// An event once appended to the log. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number assigned by the event log
    pub id: u64,
    pub kind: EventKind,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}
