//! Plugins: effect-family handlers
//!
//! Each plugin owns the simulated state for one effect family and resolves
//! one outbound message at a time. Plugins communicate back through an
//! `EffectSink`: zero or more input messages to reinject into the subject,
//! plus exactly one control action deciding how the current step ends.

pub mod harness;
pub mod html;
pub mod http;
pub mod route;

use std::collections::HashMap;

use crate::common::Result;
use crate::message::{Message, Report};

pub use harness::HarnessPlugin;
pub use html::HtmlPlugin;
pub use http::HttpPlugin;
pub use route::{RoutePattern, RouteSpec};

/// How a plugin resolved the current message
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// The effect is fully resolved; request the next scenario step
    Advance,
    /// Unrecoverable failure for this step; reject with the given report
    Abort(Report),
    /// The current harness run unit is finished
    Complete,
}

/// Collector for a plugin's output while handling one message.
///
/// Reinjected messages are delivered to the subject, in order, before the
/// next scenario step is requested. The first control action wins; setting
/// a second one is a plugin contract violation and is logged and ignored.
#[derive(Debug, Default)]
pub struct EffectSink {
    outbox: Vec<Message>,
    control: Option<Control>,
}

impl EffectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinject an input message into the subject
    pub fn send(&mut self, message: Message) {
        self.outbox.push(message);
    }

    /// Signal that this effect is fully resolved
    pub fn advance(&mut self) {
        self.set_control(Control::Advance);
    }

    /// Signal unrecoverable failure for the current step
    pub fn abort(&mut self, report: Report) {
        self.set_control(Control::Abort(report));
    }

    /// Signal that the current harness run unit is finished
    pub fn complete(&mut self) {
        self.set_control(Control::Complete);
    }

    fn set_control(&mut self, control: Control) {
        if let Some(existing) = &self.control {
            tracing::warn!(
                ?existing,
                ignored = ?control,
                "plugin set more than one control action for a single message"
            );
            return;
        }
        self.control = Some(control);
    }

    pub(crate) fn into_parts(self) -> (Vec<Message>, Option<Control>) {
        (self.outbox, self.control)
    }
}

/// An effect-family handler.
///
/// `handle` is called once per outbound message addressed to this plugin's
/// home. Unrecognized message names should be logged and dropped, not
/// failed. An `Err` return is reserved for truly unexpected faults and
/// becomes a runner-level error for the current subject.
pub trait Plugin {
    fn handle(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()>;
}

/// Mapping from message home to plugin.
///
/// Populated once at program-runner construction and immutable thereafter.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin for a home. Replaces any previous registration.
    pub fn register(&mut self, home: &str, plugin: Box<dyn Plugin>) {
        self.plugins.insert(home.to_string(), plugin);
    }

    pub fn contains(&self, home: &str) -> bool {
        self.plugins.contains_key(home)
    }

    pub(crate) fn get_mut(&mut self, home: &str) -> Option<&mut Box<dyn Plugin>> {
        self.plugins.get_mut(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::note;

    #[test]
    fn test_sink_keeps_first_control_action() {
        let mut sink = EffectSink::new();
        sink.abort(vec![note("No match for selector")]);
        sink.advance();

        let (_, control) = sink.into_parts();
        assert_eq!(control, Some(Control::Abort(vec![note("No match for selector")])));
    }

    #[test]
    fn test_sink_preserves_message_order() {
        let mut sink = EffectSink::new();
        sink.send(Message::bare("app", "first"));
        sink.send(Message::bare("app", "second"));
        sink.advance();

        let (outbox, control) = sink.into_parts();
        assert_eq!(outbox[0].name, "first");
        assert_eq!(outbox[1].name, "second");
        assert_eq!(control, Some(Control::Advance));
    }
}
