//! Externally driven harness sessions
//!
//! A harness session keeps one subject alive and lets the caller drive it
//! piecewise: install a setup, run named step sequences, and request named
//! observations, interleaved however the caller likes. The subject signals
//! the end of each requested unit with a harness `complete` message.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};

use crate::clock::VirtualClock;
use crate::common::{Error, Result};
use crate::message::{Message, Observation, Report, HARNESS_HOME};
use crate::program::{
    Flags, NavigationKey, OutboundChannel, ProgramAdapter, ProgramDefinition, SubjectEnvironment,
};

use super::program::{ProgramRunner, RunOutcome, RunnerEvents};
use super::suite::{standard_registry, SuiteOptions, PROTOCOL_VERSION};

/// Collects everything the subject surfaces across the session
#[derive(Default)]
struct SessionEvents {
    observations: Vec<Observation>,
    logs: Vec<Report>,
}

impl RunnerEvents for SessionEvents {
    fn on_observation(&mut self, observation: &Observation) {
        self.observations.push(observation.clone());
    }

    fn on_log(&mut self, report: &Report) {
        self.logs.push(report.clone());
    }
}

/// One live, externally driven subject
pub struct HarnessSession {
    runner: ProgramRunner,
    events: SessionEvents,
}

impl HarnessSession {
    /// Initialize the subject and wait for the first command.
    ///
    /// The initial drive is expected to settle without a terminal signal;
    /// a harness subject idles until told what to do.
    pub fn start(definition: &ProgramDefinition, options: &SuiteOptions) -> Result<Self> {
        let clock = VirtualClock::new();
        let environment = SubjectEnvironment {
            document: Rc::new(RefCell::new(crate::sim::SimDocument::new())),
            server: crate::sim::FakeServer::new(),
            clock: clock.clone(),
            output: OutboundChannel::new(),
        };
        let registry = standard_registry(
            environment.document.clone(),
            environment.server.clone(),
            clock,
        );
        let flags = Flags {
            tags: options.tags.clone(),
            version: PROTOCOL_VERSION,
            navigation_key: options.browser_mode.then(NavigationKey::new),
        };

        let adapter = ProgramAdapter::init(definition, flags, environment)?;
        let mut session = Self {
            runner: ProgramRunner::new(adapter, registry),
            events: SessionEvents::default(),
        };

        match session.runner.run(&mut session.events) {
            RunOutcome::Error(error) => Err(error),
            _ => Ok(session),
        }
    }

    /// Install a named setup in the subject
    pub fn setup(&mut self, name: &str, config: Value) -> Result<()> {
        self.drive(Message::new(
            HARNESS_HOME,
            "setup",
            json!({"setup": name, "config": config}),
        ))
    }

    /// Run a named step sequence to completion
    pub fn run_steps(&mut self, name: &str, config: Value) -> Result<()> {
        self.drive(Message::new(
            HARNESS_HOME,
            "steps",
            json!({"steps": name, "config": config}),
        ))
    }

    /// Request a named observation against an expected value
    pub fn observe(&mut self, name: &str, expected: Value) -> Result<Observation> {
        let seen = self.events.observations.len();
        self.drive(Message::new(
            HARNESS_HOME,
            "observe",
            json!({"observer": name, "expected": expected}),
        ))?;

        match self.events.observations.last() {
            Some(observation) if self.events.observations.len() > seen => {
                Ok(observation.clone())
            }
            _ => Err(Error::ObservationMissing {
                observer: name.to_string(),
            }),
        }
    }

    /// Every observation surfaced so far, in order
    pub fn observations(&self) -> &[Observation] {
        &self.events.observations
    }

    /// Every log report surfaced so far, in order
    pub fn logs(&self) -> &[Report] {
        &self.events.logs
    }

    /// Deliver one command and drive the subject until it signals
    /// completion of the requested unit.
    fn drive(&mut self, message: Message) -> Result<()> {
        match self.runner.send(message, &mut self.events) {
            RunOutcome::Complete | RunOutcome::Finished => Ok(()),
            RunOutcome::Idle => Err(Error::SubjectStalled {
                subject: self.runner.subject_name().to_string(),
            }),
            RunOutcome::Error(error) => Err(error),
        }
    }
}
