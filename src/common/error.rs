//! Error types for the harness
//!
//! Only runner-level faults live here: conditions that end the current
//! subject. Expected step failures travel as reject observations with a
//! report instead, and never surface as an `Error`.

use std::fmt::Display;

use thiserror::Error;

use crate::message::Message;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Runner-level fault, fatal for the current subject only
#[derive(Error, Debug)]
pub enum Error {
    // === Routing Errors ===
    #[error("No plugin registered for message home '{home}'")]
    UnroutableHome { home: String },

    // === Program Contract Errors ===
    #[error("Subject '{subject}' requires a navigation key; use the browser-program entry point to run specs for navigable applications.")]
    NavigationKeyRequired { subject: String },

    #[error("Failed to initialize subject '{subject}': {reason}")]
    ProgramInit { subject: String, reason: String },

    #[error("Subject '{subject}' stalled: the work queue drained without a complete or finished signal")]
    SubjectStalled { subject: String },

    // === Message Errors ===
    #[error("Malformed '{name}' message for home '{home}': {detail}")]
    MessageFormat {
        home: String,
        name: String,
        detail: String,
    },

    // === Harness Session Errors ===
    #[error("No observation was produced for observer '{observer}'")]
    ObservationMissing { observer: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed-message error for the given message
    pub fn message_format(message: &Message, detail: impl Display) -> Self {
        Self::MessageFormat {
            home: message.home.clone(),
            name: message.name.clone(),
            detail: detail.to_string(),
        }
    }

    /// Create a program initialization error
    pub fn program_init(subject: &str, reason: impl Display) -> Self {
        Self::ProgramInit {
            subject: subject.to_string(),
            reason: reason.to_string(),
        }
    }
}
