//! The program runner
//!
//! Drives exactly one subject instance through a scripted run: routes every
//! outbound message to the right plugin, reinjects simulated results,
//! enforces the step protocol, and surfaces observations. Dispatch is
//! depth-first and re-entrant-safe: messages emitted while one is being
//! processed are appended to an explicit work queue and drained in emission
//! order, never interleaved.

use std::collections::VecDeque;

use crate::common::{Error, Result};
use crate::message::{
    note, Conclusion, Message, Observation, Report, OBSERVER_HOME, SCENARIO_HOME,
};
use crate::plugin::{Control, EffectSink, PluginRegistry};
use crate::program::ProgramAdapter;

/// Subject state value signalling the current run unit finished normally
const STATE_COMPLETE: &str = "COMPLETE";
/// Subject state value signalling the whole suite is done
const STATE_FINISHED: &str = "FINISHED";

/// Listener for events surfaced while a runner drives a subject
pub trait RunnerEvents {
    /// The subject reported an observation
    fn on_observation(&mut self, observation: &Observation);

    /// The subject emitted a log report
    fn on_log(&mut self, _report: &Report) {}
}

/// How one driving message left the run loop
#[derive(Debug)]
pub enum RunOutcome {
    /// The current run unit finished; the loop accepts the next driving message
    Complete,
    /// The subject signalled there are no more steps anywhere
    Finished,
    /// The queue drained without a terminal signal.
    ///
    /// Normal between harness-session calls; a contract violation for a
    /// scripted scenario subject.
    Idle,
    /// Runner-level fault, fatal for this subject only
    Error(Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopState {
    Running,
    Complete,
    Finished,
}

/// Drives one subject instance
pub struct ProgramRunner {
    adapter: ProgramAdapter,
    registry: PluginRegistry,
    queue: VecDeque<Message>,
    state: LoopState,
}

impl ProgramRunner {
    pub fn new(adapter: ProgramAdapter, registry: PluginRegistry) -> Self {
        Self {
            adapter,
            registry,
            queue: VecDeque::new(),
            state: LoopState::Running,
        }
    }

    pub fn subject_name(&self) -> &str {
        self.adapter.name()
    }

    /// Start the run: send the scenario-start message and drive the queue
    /// to a terminal outcome.
    pub fn run(&mut self, events: &mut dyn RunnerEvents) -> RunOutcome {
        self.send(Message::bare(SCENARIO_HOME, "start"), events)
    }

    /// Deliver one driving message and drain everything it provokes.
    ///
    /// Used by `run` for the initial start message and by harness sessions
    /// for each externally driven request.
    pub fn send(&mut self, message: Message, events: &mut dyn RunnerEvents) -> RunOutcome {
        self.state = LoopState::Running;
        self.deliver(message);
        self.drain(events)
    }

    /// Send one message into the subject and queue whatever it emitted
    fn deliver(&mut self, message: Message) {
        self.adapter.send(message);
        self.queue.extend(self.adapter.drain_outbound());
    }

    /// Ask the scenario driver for the next queued step
    fn request_step(&mut self) {
        self.deliver(Message::bare(SCENARIO_HOME, "step"));
    }

    fn drain(&mut self, events: &mut dyn RunnerEvents) -> RunOutcome {
        while let Some(message) = self.queue.pop_front() {
            if let Err(error) = self.dispatch(&message, events) {
                tracing::error!(subject = %self.adapter.name(), %error, "runner fault");
                // No further messages reach a halted subject
                self.queue.clear();
                return RunOutcome::Error(error);
            }
        }

        // Terminal events surface only once the queue is fully drained
        match self.state {
            LoopState::Complete => RunOutcome::Complete,
            LoopState::Finished => RunOutcome::Finished,
            LoopState::Running => RunOutcome::Idle,
        }
    }

    fn dispatch(&mut self, message: &Message, events: &mut dyn RunnerEvents) -> Result<()> {
        tracing::debug!(home = %message.home, name = %message.name, "dispatch");

        if message.is_for(SCENARIO_HOME) {
            return self.handle_scenario(message, events);
        }

        if message.is_for(OBSERVER_HOME) {
            let observation: Observation = serde_json::from_value(message.body.clone())
                .map_err(|e| Error::message_format(message, e))?;
            events.on_observation(&observation);
            self.request_step();
            return Ok(());
        }

        let mut sink = EffectSink::new();
        match self.registry.get_mut(&message.home) {
            Some(plugin) => plugin.handle(message, &mut sink)?,
            None => {
                return Err(Error::UnroutableHome {
                    home: message.home.clone(),
                })
            }
        }

        let (outbox, control) = sink.into_parts();
        // Reinjections reach the subject before the next step is requested
        for reply in outbox {
            self.deliver(reply);
        }

        match control {
            Some(Control::Advance) => self.request_step(),
            Some(Control::Abort(report)) => {
                events.on_observation(&rejection_for(report));
                self.request_step();
            }
            Some(Control::Complete) => self.state = LoopState::Complete,
            None => {}
        }

        Ok(())
    }

    fn handle_scenario(&mut self, message: &Message, events: &mut dyn RunnerEvents) -> Result<()> {
        match message.name.as_str() {
            "state" => match message.body.as_str() {
                Some(STATE_COMPLETE) => self.state = LoopState::Complete,
                Some(STATE_FINISHED) => self.state = LoopState::Finished,
                other => {
                    tracing::warn!(state = ?other, "unknown scenario state");
                }
            },
            "log" => {
                let report: Report = serde_json::from_value(message.body.clone())
                    .map_err(|e| Error::message_format(message, e))?;
                events.on_log(&report);
            }
            _ => {
                tracing::warn!(name = %message.name, "unknown scenario message");
            }
        }
        Ok(())
    }
}

/// The reject observation synthesized when a plugin aborts a step
fn rejection_for(mut report: Report) -> Observation {
    if report.is_empty() {
        report.push(note("The step was aborted without detail"));
    }
    Observation {
        summary: "Scenario step aborted".to_string(),
        message: report[0].statement.clone(),
        conclusion: Conclusion::Reject,
        report,
    }
}
