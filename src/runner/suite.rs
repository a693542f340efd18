//! The suite runner
//!
//! Sequences a list of subjects through fresh, isolated runs and streams
//! results to a reporter. A fault in one subject never leaks into the next:
//! each subject gets its own document, server, and outbound channel, and
//! the shared clock is reset between runs.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::VirtualClock;
use crate::common::Error;
use crate::message::{Observation, Report, HARNESS_HOME, HTML_HOME, HTTP_HOME};
use crate::plugin::{HarnessPlugin, HtmlPlugin, HttpPlugin, PluginRegistry};
use crate::program::{
    Flags, NavigationKey, OutboundChannel, ProgramAdapter, ProgramDefinition, SubjectEnvironment,
};
use crate::reporter::Reporter;
use crate::sim::{DocumentSurface, FakeServer, SimDocument};

use super::program::{ProgramRunner, RunOutcome, RunnerEvents};

/// Version of the message protocol handed to subjects at init
pub const PROTOCOL_VERSION: u32 = 1;

/// Suite-wide run configuration
#[derive(Clone, Default)]
pub struct SuiteOptions {
    /// Tags forwarded to every subject's init flags
    pub tags: Vec<String>,
    /// Mint a navigation key for each subject, enabling navigable programs
    pub browser_mode: bool,
}

/// Where the suite runner is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SuiteState {
    Idle,
    /// Receiving the subject list, before the first run starts
    Discovering,
    RunningSubject(usize),
    Finished,
}

/// Aggregate counts for one suite run
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SuiteSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub errors: usize,
}

impl SuiteSummary {
    pub fn is_passing(&self) -> bool {
        self.rejected == 0 && self.errors == 0
    }
}

/// The plugin set every subject runs with
pub fn standard_registry(
    document: Rc<RefCell<SimDocument>>,
    server: FakeServer,
    clock: VirtualClock,
) -> PluginRegistry {
    let surface: Rc<RefCell<dyn DocumentSurface>> = document;
    let mut registry = PluginRegistry::new();
    registry.register(HTML_HOME, Box::new(HtmlPlugin::new(surface, clock)));
    registry.register(HTTP_HOME, Box::new(HttpPlugin::new(server)));
    registry.register(HARNESS_HOME, Box::new(HarnessPlugin::new()));
    registry
}

/// Forwards runner events to the reporter and keeps the counts
struct SuiteEvents<'r, R: Reporter> {
    reporter: &'r mut R,
    summary: &'r mut SuiteSummary,
}

impl<R: Reporter> RunnerEvents for SuiteEvents<'_, R> {
    fn on_observation(&mut self, observation: &Observation) {
        if observation.is_accepted() {
            self.summary.accepted += 1;
        } else {
            self.summary.rejected += 1;
        }
        self.reporter.record(observation);
    }

    fn on_log(&mut self, report: &Report) {
        self.reporter.log(report);
    }
}

/// Runs a list of subjects to completion
pub struct SuiteRunner<'a, R: Reporter> {
    clock: VirtualClock,
    reporter: &'a mut R,
    options: SuiteOptions,
    state: SuiteState,
}

impl<'a, R: Reporter> SuiteRunner<'a, R> {
    pub fn new(reporter: &'a mut R, options: SuiteOptions) -> Self {
        Self {
            clock: VirtualClock::new(),
            reporter,
            options,
            state: SuiteState::Idle,
        }
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    /// Run every subject in order.
    ///
    /// Subjects that fault are recorded and skipped; a `Finished` outcome
    /// from any subject ends the whole suite early.
    pub fn run_all(&mut self, definitions: &[ProgramDefinition]) -> SuiteSummary {
        let mut summary = SuiteSummary::default();
        self.state = SuiteState::Discovering;
        self.reporter.start_suite();

        for (index, definition) in definitions.iter().enumerate() {
            self.state = SuiteState::RunningSubject(index);
            self.reporter.start_subject(&definition.name);
            tracing::info!(subject = %definition.name, "running subject");

            match self.run_subject(definition, &mut summary) {
                RunOutcome::Complete => {}
                RunOutcome::Finished => break,
                RunOutcome::Idle => {
                    let error = Error::SubjectStalled {
                        subject: definition.name.clone(),
                    };
                    summary.errors += 1;
                    self.reporter.error(&error);
                }
                RunOutcome::Error(error) => {
                    summary.errors += 1;
                    self.reporter.error(&error);
                }
            }
        }

        self.state = SuiteState::Finished;
        self.reporter.finish(&summary);
        summary
    }

    fn run_subject(
        &mut self,
        definition: &ProgramDefinition,
        summary: &mut SuiteSummary,
    ) -> RunOutcome {
        // Fresh simulated world per subject; only the clock handle is
        // shared across runs, and it starts from zero each time
        self.clock.reset();
        let environment = SubjectEnvironment {
            document: Rc::new(RefCell::new(SimDocument::new())),
            server: FakeServer::new(),
            clock: self.clock.clone(),
            output: OutboundChannel::new(),
        };
        let registry = standard_registry(
            environment.document.clone(),
            environment.server.clone(),
            self.clock.clone(),
        );
        let flags = Flags {
            tags: self.options.tags.clone(),
            version: PROTOCOL_VERSION,
            navigation_key: self.options.browser_mode.then(NavigationKey::new),
        };

        let adapter = match ProgramAdapter::init(definition, flags, environment) {
            Ok(adapter) => adapter,
            Err(error) => return RunOutcome::Error(error),
        };

        let mut runner = ProgramRunner::new(adapter, registry);
        let mut events = SuiteEvents {
            reporter: &mut *self.reporter,
            summary,
        };
        runner.run(&mut events)
    }
}
