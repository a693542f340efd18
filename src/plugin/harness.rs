//! Harness-control plugin
//!
//! Bridges an externally driven harness session. The interesting direction
//! here is subject-to-runner: when the subject signals that a harness run
//! unit is done, the plugin surfaces it as the runner's complete outcome so
//! the external caller's pending request can return. Reports are never
//! synthesized here; they flow from observations as usual.

use crate::common::Result;
use crate::message::Message;

use super::{EffectSink, Plugin};

/// Relays harness-session control signals
#[derive(Default)]
pub struct HarnessPlugin;

impl HarnessPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for HarnessPlugin {
    fn handle(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()> {
        match message.name.as_str() {
            "complete" => sink.complete(),
            _ => {
                tracing::warn!(name = %message.name, "unknown harness message");
                sink.advance();
            }
        }
        Ok(())
    }
}
