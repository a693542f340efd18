//! In-memory DOM-like surface
//!
//! A deliberately small stand-in for a browser document: elements are
//! registered under a selector key, carry attributes, text, a form value,
//! and per-event handler messages. View updates queue until the next
//! render pass, which the DOM plugin runs through the virtual clock -
//! exactly the animation-frame gating a subject would see in a browser.
//!
//! Selector matching covers the forms the harness needs: the registration
//! key itself, `#id`, `.class`, and bare tag names. A full CSS engine is
//! an external collaborator, not something this surface reimplements.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::message::Message;

use super::{DocumentSurface, EventTarget};

/// Selector value addressing the document itself
pub const DOCUMENT_TARGET: &str = "_document_";

/// One simulated element
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    pub selector: String,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub value: String,
    /// Option labels, for select elements
    pub options: Vec<String>,
    /// Event name -> input message delivered to the subject when fired
    pub handlers: BTreeMap<String, Message>,
}

impl ElementSpec {
    pub fn new(selector: &str, tag: &str) -> Self {
        Self {
            selector: selector.to_string(),
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn with_options(mut self, labels: &[&str]) -> Self {
        self.options = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Register the input message delivered when `event` fires on this element
    pub fn on(mut self, event: &str, message: Message) -> Self {
        self.handlers.insert(event.to_string(), message);
        self
    }
}

/// One queued change to the simulated document
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    Upsert(ElementSpec),
    Remove(String),
}

/// The bundled in-memory document
pub struct SimDocument {
    elements: BTreeMap<String, ElementSpec>,
    pending: Vec<ViewUpdate>,
    document_handlers: BTreeMap<String, Message>,
    window_handlers: BTreeMap<String, Message>,
    viewport: (u32, u32),
    visible: bool,
    location: String,
    dispatched: Vec<(String, String)>,
}

impl Default for SimDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDocument {
    pub fn new() -> Self {
        Self {
            elements: BTreeMap::new(),
            pending: Vec::new(),
            document_handlers: BTreeMap::new(),
            window_handlers: BTreeMap::new(),
            viewport: (1280, 800),
            visible: true,
            location: "http://localhost/".to_string(),
            dispatched: Vec::new(),
        }
    }

    // === Subject-side API ===

    /// Queue a view update for the next render pass
    pub fn render(&mut self, update: ViewUpdate) {
        self.pending.push(update);
    }

    /// Register a document-level event handler message
    pub fn on_document_event(&mut self, event: &str, message: Message) {
        self.document_handlers.insert(event.to_string(), message);
    }

    /// Register a window-level event handler message
    pub fn on_window_event(&mut self, event: &str, message: Message) {
        self.window_handlers.insert(event.to_string(), message);
    }

    /// Current value of a form element
    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.find(selector).map(|e| e.value.clone())
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Every `(target, event)` pair dispatched so far, in dispatch order
    pub fn dispatched_events(&self) -> &[(String, String)] {
        &self.dispatched
    }

    // === Internals ===

    fn find(&self, selector: &str) -> Option<&ElementSpec> {
        self.elements
            .values()
            .find(|e| Self::matches(e, selector))
    }

    fn matches(element: &ElementSpec, selector: &str) -> bool {
        if element.selector == selector {
            return true;
        }
        if let Some(id) = selector.strip_prefix('#') {
            return element.attributes.get("id").is_some_and(|v| v == id);
        }
        if let Some(class) = selector.strip_prefix('.') {
            return element
                .attributes
                .get("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class));
        }
        element.tag == selector
    }

    fn describe(element: &ElementSpec) -> Value {
        let mut description = json!({
            "tag": element.tag,
            "attributes": element.attributes,
            "children": [{ "text": element.text }],
        });
        if !element.value.is_empty() {
            description["value"] = json!(element.value);
        }
        description
    }
}

impl DocumentSurface for SimDocument {
    fn query(&self, selector: &str) -> Option<Value> {
        self.find(selector).map(Self::describe)
    }

    fn query_all(&self, selector: &str) -> Vec<Value> {
        self.elements
            .values()
            .filter(|e| Self::matches(e, selector))
            .map(Self::describe)
            .collect()
    }

    fn exists(&self, selector: &str) -> bool {
        self.find(selector).is_some()
    }

    fn describe_window(&self) -> Value {
        json!({
            "location": self.location,
            "visible": self.visible,
            "viewport": { "width": self.viewport.0, "height": self.viewport.1 },
        })
    }

    fn dispatch(&mut self, target: &EventTarget, event: &str) -> Vec<Message> {
        let (label, handler) = match target {
            EventTarget::Document => (
                DOCUMENT_TARGET.to_string(),
                self.document_handlers.get(event).cloned(),
            ),
            EventTarget::Window => ("_window_".to_string(), self.window_handlers.get(event).cloned()),
            EventTarget::Element(selector) => (
                selector.clone(),
                self.find(selector).and_then(|e| e.handlers.get(event).cloned()),
            ),
        };
        self.dispatched.push((label, event.to_string()));
        handler.into_iter().collect()
    }

    fn set_value(&mut self, selector: &str, text: &str) {
        let key = self
            .elements
            .values()
            .find(|e| Self::matches(e, selector))
            .map(|e| e.selector.clone());
        if let Some(key) = key {
            if let Some(element) = self.elements.get_mut(&key) {
                element.value = text.to_string();
            }
        }
    }

    fn select_option(&mut self, selector: &str, label: &str) -> bool {
        let key = self
            .elements
            .values()
            .find(|e| Self::matches(e, selector))
            .map(|e| e.selector.clone());
        match key {
            Some(key) => {
                let element = self.elements.get_mut(&key);
                match element {
                    Some(element) if element.options.iter().any(|o| o == label) => {
                        element.value = label.to_string();
                        true
                    }
                    _ => false,
                }
            }
            None => false,
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_location(&mut self, url: &str) {
        self.location = url.to_string();
    }

    fn flush_renders(&mut self) {
        for update in self.pending.drain(..) {
            match update {
                ViewUpdate::Upsert(element) => {
                    self.elements.insert(element.selector.clone(), element);
                }
                ViewUpdate::Remove(selector) => {
                    self.elements.remove(&selector);
                }
            }
        }
    }
}
