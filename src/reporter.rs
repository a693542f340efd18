//! Reporting interface and the console implementation
//!
//! The suite runner pushes every observation, log report, and runner fault
//! through a `Reporter` as it happens, so results stream instead of
//! arriving in one batch at the end.

use colored::Colorize;

use crate::common::Error;
use crate::message::{Observation, Report};
use crate::runner::SuiteSummary;

/// Streaming sink for suite results
pub trait Reporter {
    /// The suite is about to run
    fn start_suite(&mut self) {}

    /// A new subject is about to run
    fn start_subject(&mut self, _name: &str) {}

    /// A subject produced an observation
    fn record(&mut self, observation: &Observation);

    /// A subject emitted a log report mid-run
    fn log(&mut self, _report: &Report) {}

    /// A runner-level fault ended the current subject
    fn error(&mut self, error: &Error);

    /// The suite is done
    fn finish(&mut self, _summary: &SuiteSummary) {}
}

/// Prints results to stdout with check marks and colors
#[derive(Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn print_report(report: &Report) {
        for entry in report {
            println!("      {}", entry.statement.yellow());
            if let Some(detail) = &entry.detail {
                println!("        {}", detail.dimmed());
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn start_suite(&mut self) {
        println!("\nRunning specs...");
    }

    fn start_subject(&mut self, name: &str) {
        println!("\n  {}", name.bold());
    }

    fn record(&mut self, observation: &Observation) {
        if observation.is_accepted() {
            println!("    {} {}", "✓".green(), observation.summary);
        } else {
            println!("    {} {}", "✗".red(), observation.summary.red());
            if !observation.message.is_empty() {
                println!("      {}", observation.message);
            }
            Self::print_report(&observation.report);
        }
    }

    fn log(&mut self, report: &Report) {
        Self::print_report(report);
    }

    fn error(&mut self, error: &Error) {
        println!("    {} {}", "error:".red().bold(), error);
    }

    fn finish(&mut self, summary: &SuiteSummary) {
        let line = format!(
            "Accepted: {}  Rejected: {}  Errors: {}",
            summary.accepted, summary.rejected, summary.errors
        );
        if summary.is_passing() {
            println!("\n{}\n", line.green());
        } else {
            println!("\n{}\n", line.red());
        }
    }
}

/// Discards everything; useful when driving runs programmatically
#[derive(Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn record(&mut self, _observation: &Observation) {}

    fn error(&mut self, _error: &Error) {}
}
