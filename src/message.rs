//! Harness message types
//!
//! These types make up the wire protocol between a subject program and the
//! runner: `{home, name, body}` messages, report lines, and observations.
//! The same shapes are used over the in-process channel and, if serialized
//! for a remote harness, as JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// === Well-known homes ===

/// Home for DOM-interaction messages.
pub const HTML_HOME: &str = "_html";
/// Home for network-simulation messages.
pub const HTTP_HOME: &str = "_http";
/// Home for harness-control messages.
pub const HARNESS_HOME: &str = "_harness";
/// Runner-internal home driving the step protocol.
pub const SCENARIO_HOME: &str = "_scenario";
/// Home on which the subject reports observations.
pub const OBSERVER_HOME: &str = "_observer";

/// One unit of the protocol between subject and runner/plugins.
///
/// `home` identifies the owning subsystem, `name` the operation, and `body`
/// an operation-specific payload. Messages are immutable value objects; the
/// run loop never mutates one after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub home: String,
    pub name: String,
    #[serde(default)]
    pub body: Value,
}

impl Message {
    /// Build a message with an arbitrary JSON body
    pub fn new(home: &str, name: &str, body: Value) -> Self {
        Self {
            home: home.to_string(),
            name: name.to_string(),
            body,
        }
    }

    /// Build a message with a null body
    pub fn bare(home: &str, name: &str) -> Self {
        Self::new(home, name, Value::Null)
    }

    /// True when this message belongs to the given home
    pub fn is_for(&self, home: &str) -> bool {
        self.home == home
    }
}

// === Reports ===

/// One line of failure detail: a statement and optional supporting detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Ordered human-readable failure detail, rendered as-is by a reporter.
///
/// Lines are appended incrementally and never reordered.
pub type Report = Vec<ReportLine>;

/// Build a report line with supporting detail
pub fn line(statement: &str, detail: &str) -> ReportLine {
    ReportLine {
        statement: statement.to_string(),
        detail: Some(detail.to_string()),
    }
}

/// Build a report line with no detail
pub fn note(statement: &str) -> ReportLine {
    ReportLine {
        statement: statement.to_string(),
        detail: None,
    }
}

// === Observations ===

/// Verdict attached to an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Accept,
    Reject,
}

/// A reported assertion outcome.
///
/// Produced when the subject emits a message on the observer home, or
/// synthesized by the runner when a plugin aborts a step. A `reject`
/// conclusion always carries a non-empty report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub summary: String,
    #[serde(default)]
    pub message: String,
    pub conclusion: Conclusion,
    #[serde(default)]
    pub report: Report,
}

impl Observation {
    pub fn is_accepted(&self) -> bool {
        self.conclusion == Conclusion::Accept
    }
}
