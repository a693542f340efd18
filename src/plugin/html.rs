//! DOM-interaction plugin
//!
//! Resolves messages on the `_html` home against the simulated document:
//! queries, event dispatch, and window state changes. Every DOM-affecting
//! message first runs the pending render pass so the subject's latest view
//! state is reflected before any query or dispatch.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::clock::VirtualClock;
use crate::common::{Error, Result};
use crate::message::{line, Message, HTML_HOME};
use crate::sim::{DocumentSurface, EventTarget, DOCUMENT_TARGET};

use super::{EffectSink, Plugin};

#[derive(Deserialize)]
struct SelectorBody {
    selector: String,
}

#[derive(Deserialize)]
struct InputBody {
    text: String,
}

#[derive(Deserialize)]
struct CustomEventBody {
    name: String,
}

#[derive(Deserialize)]
struct ResizeBody {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct VisibilityBody {
    #[serde(rename = "isVisible")]
    is_visible: bool,
}

/// Simulates DOM interaction for one subject
pub struct HtmlPlugin {
    document: Rc<RefCell<dyn DocumentSurface>>,
    clock: VirtualClock,
    /// Selector remembered from the last successful `target` message
    targeted: Option<String>,
}

impl HtmlPlugin {
    pub fn new(document: Rc<RefCell<dyn DocumentSurface>>, clock: VirtualClock) -> Self {
        Self {
            document,
            clock,
            targeted: None,
        }
    }

    /// Flush animation-frame callbacks and queued view updates.
    ///
    /// Runs before every DOM-affecting message, mirroring the
    /// render-then-act ordering a browser would impose.
    fn render_pass(&self) {
        self.clock.run_to_frame();
        self.document.borrow_mut().flush_renders();
    }

    fn selected(body: Value) -> Message {
        Message::new(HTML_HOME, "selected", body)
    }

    /// Selector the next event message should act on: an explicit selector
    /// in the body wins over the remembered target.
    fn effective_selector(&self, message: &Message) -> Option<String> {
        message
            .body
            .get("selector")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.targeted.clone())
    }

    /// Check the preconditions shared by all event messages, then hand the
    /// resolved selector to the event handler.
    fn with_target(
        &mut self,
        event_name: &str,
        message: &Message,
        elements_only: bool,
        sink: &mut EffectSink,
        fire: impl FnOnce(&mut Self, &EventTarget, &mut EffectSink),
    ) {
        let selector = match self.effective_selector(message) {
            Some(selector) => selector,
            None => {
                sink.abort(vec![line("No element targeted for event", event_name)]);
                return;
            }
        };

        if selector == DOCUMENT_TARGET {
            if elements_only {
                sink.abort(vec![line(
                    "Event not supported when document is targeted",
                    event_name,
                )]);
                return;
            }
            fire(self, &EventTarget::Document, sink);
            sink.advance();
            return;
        }

        if !self.document.borrow().exists(&selector) {
            sink.abort(vec![line("No match for selector", &selector)]);
            return;
        }

        fire(self, &EventTarget::Element(selector), sink);
        sink.advance();
    }

    /// Dispatch one simulated event and reinject any triggered handler
    /// messages into the subject
    fn dispatch(&mut self, target: &EventTarget, event: &str, sink: &mut EffectSink) {
        let triggered = self.document.borrow_mut().dispatch(target, event);
        for message in triggered {
            sink.send(message);
        }
    }

    fn dispatch_all(&mut self, target: &EventTarget, events: &[&str], sink: &mut EffectSink) {
        for event in events {
            self.dispatch(target, event, sink);
        }
    }

    fn handle_target(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()> {
        // The target body is the selector itself, either bare or wrapped
        let selector = match message.body.as_str() {
            Some(selector) => selector.to_string(),
            None => parse_body::<SelectorBody>(message)?.selector,
        };

        if selector != DOCUMENT_TARGET && !self.document.borrow().exists(&selector) {
            sink.abort(vec![line("No match for selector", &selector)]);
            return Ok(());
        }

        self.targeted = Some(selector);
        sink.send(message.clone());
        sink.advance();
        Ok(())
    }
}

fn parse_body<'a, T: Deserialize<'a>>(message: &'a Message) -> Result<T> {
    T::deserialize(&message.body).map_err(|e| Error::message_format(message, e))
}

impl Plugin for HtmlPlugin {
    fn handle(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()> {
        if message.name == "nextAnimationFrame" {
            // Render on the clock's frame boundary instead of synchronously
            let document = self.document.clone();
            self.clock
                .schedule_frame(move || document.borrow_mut().flush_renders());
            sink.advance();
            return Ok(());
        }

        self.render_pass();

        match message.name.as_str() {
            "query" => {
                let body: SelectorBody = parse_body(message)?;
                let found = self.document.borrow().query(&body.selector);
                sink.send(Self::selected(found.unwrap_or(Value::Null)));
                sink.advance();
            }
            "queryAll" => {
                let body: SelectorBody = parse_body(message)?;
                let found = self.document.borrow().query_all(&body.selector);
                sink.send(Self::selected(json!(found)));
                sink.advance();
            }
            "query-window" => {
                let description = self.document.borrow().describe_window();
                sink.send(Self::selected(description));
                sink.advance();
            }
            "target" => {
                self.handle_target(message, sink)?;
            }
            "click" => {
                self.with_target("click", message, false, sink, |plugin, target, sink| {
                    plugin.dispatch_all(target, &["mousedown", "mouseup", "click"], sink);
                });
            }
            "doubleClick" => {
                self.with_target("doubleClick", message, true, sink, |plugin, target, sink| {
                    plugin.dispatch_all(target, &["mousedown", "mouseup", "click"], sink);
                    plugin.dispatch_all(target, &["mousedown", "mouseup", "click"], sink);
                    plugin.dispatch(target, "dblclick", sink);
                });
            }
            "mouseMoveIn" => {
                self.with_target("mouseMoveIn", message, true, sink, |plugin, target, sink| {
                    plugin.dispatch_all(target, &["mouseover", "mouseenter"], sink);
                });
            }
            "mouseMoveOut" => {
                self.with_target("mouseMoveOut", message, true, sink, |plugin, target, sink| {
                    plugin.dispatch_all(target, &["mouseout", "mouseleave"], sink);
                });
            }
            "focus" => {
                self.with_target("focus", message, true, sink, |plugin, target, sink| {
                    plugin.dispatch(target, "focus", sink);
                });
            }
            "blur" => {
                self.with_target("blur", message, true, sink, |plugin, target, sink| {
                    plugin.dispatch(target, "blur", sink);
                });
            }
            "input" => {
                let body: InputBody = parse_body(message)?;
                self.with_target("input", message, true, sink, |plugin, target, sink| {
                    if let EventTarget::Element(selector) = target {
                        plugin.document.borrow_mut().set_value(selector, &body.text);
                    }
                    plugin.dispatch(target, "input", sink);
                });
            }
            "select" => {
                let body: InputBody = parse_body(message)?;
                self.with_target("select", message, true, sink, |plugin, target, sink| {
                    if let EventTarget::Element(selector) = target {
                        if plugin.document.borrow_mut().select_option(selector, &body.text) {
                            plugin.dispatch_all(target, &["change", "input"], sink);
                        }
                    }
                });
            }
            "customEvent" => {
                let body: CustomEventBody = parse_body(message)?;
                self.with_target(&body.name.clone(), message, false, sink, |plugin, target, sink| {
                    plugin.dispatch(target, &body.name, sink);
                });
            }
            "resize" => {
                let body: ResizeBody = parse_body(message)?;
                self.document.borrow_mut().set_viewport(body.width, body.height);
                self.dispatch(&EventTarget::Window, "resize", sink);
                sink.advance();
            }
            "visibilityChange" => {
                let body: VisibilityBody = parse_body(message)?;
                self.document.borrow_mut().set_visibility(body.is_visible);
                self.dispatch(&EventTarget::Document, "visibilitychange", sink);
                sink.advance();
            }
            "set-location" => {
                let url = message
                    .body
                    .as_str()
                    .ok_or_else(|| Error::message_format(message, "expected a url string"))?;
                self.document.borrow_mut().set_location(url);
                sink.advance();
            }
            _ => {
                tracing::warn!(name = %message.name, "unknown html message");
                sink.advance();
            }
        }

        Ok(())
    }
}
