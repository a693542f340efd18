//! Runners: the dispatch loop and its orchestration
//!
//! `ProgramRunner` drives one subject through one run; `SuiteRunner`
//! sequences subjects and aggregates results; `HarnessSession` exposes an
//! externally driven mode for interactive or programmatic harnesses.

pub mod harness;
pub mod program;
pub mod suite;

pub use harness::HarnessSession;
pub use program::{ProgramRunner, RunOutcome, RunnerEvents};
pub use suite::{SuiteOptions, SuiteRunner, SuiteState, SuiteSummary};
