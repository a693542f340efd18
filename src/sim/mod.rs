//! Simulated effect surfaces
//!
//! The harness core never talks to a real browser or network. Plugins
//! consume the capability traits defined here; the bundled in-memory
//! implementations (`SimDocument`, `FakeServer`) satisfy them for tests
//! and can be swapped for richer simulation backends.

pub mod dom;
pub mod server;

use serde_json::Value;

use crate::message::Message;

pub use dom::{ElementSpec, SimDocument, ViewUpdate, DOCUMENT_TARGET};
pub use server::{FakeServer, RecordedRequest, RequestOutcome, StubResponse};

/// Where a simulated event is dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    Document,
    Window,
    Element(String),
}

/// The DOM-like surface the DOM-interaction plugin consumes.
///
/// Event dispatch returns the input messages registered for the fired
/// event, in registration order; the plugin reinjects them into the
/// subject. Queries return element descriptions as JSON values.
pub trait DocumentSurface {
    /// Describe the first element matching the selector, if any
    fn query(&self, selector: &str) -> Option<Value>;

    /// Describe every element matching the selector
    fn query_all(&self, selector: &str) -> Vec<Value>;

    /// True when at least one element matches the selector
    fn exists(&self, selector: &str) -> bool;

    /// Describe the simulated window (location, visibility, viewport)
    fn describe_window(&self) -> Value;

    /// Fire one simulated event and collect triggered handler messages
    fn dispatch(&mut self, target: &EventTarget, event: &str) -> Vec<Message>;

    /// Overwrite the current value of a form element
    fn set_value(&mut self, selector: &str, text: &str);

    /// Mark the option with the given label selected; false if no match
    fn select_option(&mut self, selector: &str, label: &str) -> bool;

    /// Resize the simulated window
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Change simulated document visibility
    fn set_visibility(&mut self, visible: bool);

    /// Change the simulated window location
    fn set_location(&mut self, url: &str);

    /// Apply all queued view updates to the document
    fn flush_renders(&mut self);
}
