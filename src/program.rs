//! The subject-program contract
//!
//! A subject is an opaque black box: it accepts input messages through
//! `send` and pushes every outbound message, in emission order, into the
//! single `OutboundChannel` attached when it is initialized. The harness
//! never looks inside a subject beyond this interface.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::clock::VirtualClock;
use crate::common::{Error, Result};
use crate::message::Message;
use crate::sim::{FakeServer, SimDocument};

/// The channel a subject emits outbound messages into.
///
/// Cloneable so a subject (or a clock callback it schedules) can emit from
/// anywhere, but a program instance gets exactly one subscription: the
/// adapter attaches this channel at init and drains it for the runner.
#[derive(Clone, Default)]
pub struct OutboundChannel {
    queue: Rc<RefCell<VecDeque<Message>>>,
}

impl OutboundChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one outbound message
    pub fn emit(&self, message: Message) {
        self.queue.borrow_mut().push_back(message);
    }

    /// Take every message emitted since the last drain, in emission order
    pub(crate) fn drain(&self) -> Vec<Message> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

/// Capability token proving the subject was started through the
/// navigation-capable entry point. Only the harness can mint one.
#[derive(Debug, Clone)]
pub struct NavigationKey(());

impl NavigationKey {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// Initialization flags handed to every subject factory
#[derive(Clone)]
pub struct Flags {
    pub tags: Vec<String>,
    pub version: u32,
    pub navigation_key: Option<NavigationKey>,
}

/// Simulated capabilities injected into a subject at init.
///
/// The subject renders through the document handle, issues requests
/// through the server handle, schedules through the clock, and emits
/// outbound messages through the output channel.
#[derive(Clone)]
pub struct SubjectEnvironment {
    pub document: Rc<RefCell<SimDocument>>,
    pub server: FakeServer,
    pub clock: VirtualClock,
    pub output: OutboundChannel,
}

/// A live subject instance
pub trait Program {
    /// Deliver one input message
    fn send(&mut self, message: Message);
}

/// Creates subject instances for the runner
pub trait ProgramFactory {
    /// True when this subject must be run with a navigation key
    fn requires_navigation(&self) -> bool {
        false
    }

    fn init(&self, flags: Flags, env: SubjectEnvironment) -> Result<Box<dyn Program>>;
}

/// One discoverable subject in a suite
pub struct ProgramDefinition {
    pub name: String,
    pub factory: Box<dyn ProgramFactory>,
}

impl ProgramDefinition {
    pub fn new(name: &str, factory: Box<dyn ProgramFactory>) -> Self {
        Self {
            name: name.to_string(),
            factory,
        }
    }
}

/// Wraps one subject instance for the runner: owns the instance, the
/// drain side of its outbound channel, and the contract checks performed
/// at initialization.
pub struct ProgramAdapter {
    name: String,
    program: Box<dyn Program>,
    outbox: OutboundChannel,
}

impl std::fmt::Debug for ProgramAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramAdapter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ProgramAdapter {
    /// Initialize a subject, enforcing the navigation-key contract
    pub fn init(
        definition: &ProgramDefinition,
        flags: Flags,
        env: SubjectEnvironment,
    ) -> Result<Self> {
        if definition.factory.requires_navigation() && flags.navigation_key.is_none() {
            return Err(Error::NavigationKeyRequired {
                subject: definition.name.clone(),
            });
        }

        let outbox = env.output.clone();
        let program = definition
            .factory
            .init(flags, env)
            .map_err(|e| Error::program_init(&definition.name, e))?;

        Ok(Self {
            name: definition.name.clone(),
            program,
            outbox,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver one input message to the subject
    pub fn send(&mut self, message: Message) {
        tracing::debug!(subject = %self.name, home = %message.home, name = %message.name, "send");
        self.program.send(message);
    }

    /// Collect everything the subject has emitted since the last call
    pub fn drain_outbound(&mut self) -> Vec<Message> {
        self.outbox.drain()
    }
}
