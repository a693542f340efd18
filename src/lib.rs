//! Scenario Harness - deterministic testing for message-passing programs
//!
//! A subject program emits structured effect messages and receives
//! structured input messages instead of performing direct I/O. This crate
//! intercepts every outbound effect (DOM mutation intents, HTTP calls,
//! timers, custom channels), feeds back simulated responses, and collects
//! the subject's observations - without a real browser, network, or clock.

pub mod clock;
pub mod common;
pub mod message;
pub mod plugin;
pub mod program;
pub mod reporter;
pub mod runner;
pub mod sim;

// Re-export commonly used types
pub use common::{Error, Result};
pub use message::{Conclusion, Message, Observation, Report, ReportLine};
pub use runner::{ProgramRunner, RunOutcome, SuiteRunner};
