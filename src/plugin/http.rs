//! Network-simulation plugin
//!
//! Resolves messages on the `_http` home against the fake server: clearing
//! state between steps, registering response stubs, and fetching the
//! request log for assertions. The subject's own requests go straight
//! through the shared `FakeServer` handle and never appear here.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;

use crate::common::{Error, Result};
use crate::message::{Message, HTTP_HOME};
use crate::sim::{FakeServer, StubResponse};

use super::route::{RoutePattern, RouteSpec};
use super::{EffectSink, Plugin};

fn default_true() -> bool {
    true
}

fn default_status() -> u16 {
    200
}

#[derive(Deserialize)]
struct StubBody {
    route: RouteSpec,
    #[serde(rename = "shouldRespond", default = "default_true")]
    should_respond: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: String,
}

/// Simulates HTTP for one subject
pub struct HttpPlugin {
    server: FakeServer,
}

impl HttpPlugin {
    pub fn new(server: FakeServer) -> Self {
        Self { server }
    }

    fn handle_stub(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()> {
        let stub: StubBody = StubBody::deserialize(&message.body)
            .map_err(|e| Error::message_format(message, e))?;

        let response = if !stub.should_respond {
            StubResponse::NeverRespond
        } else {
            match stub.error.as_deref() {
                Some("network") => StubResponse::NetworkError,
                Some("timeout") => StubResponse::Timeout,
                Some(other) => {
                    return Err(Error::message_format(
                        message,
                        format!("unknown stubbed error kind '{}'", other),
                    ))
                }
                None => StubResponse::Respond {
                    status: stub.status,
                    headers: stub.headers,
                    body: stub.body,
                },
            }
        };

        self.server
            .add_stub(RoutePattern::compile(&stub.route), response);
        sink.advance();
        Ok(())
    }

    fn handle_fetch_requests(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()> {
        let spec: RouteSpec = RouteSpec::deserialize(&message.body)
            .map_err(|e| Error::message_format(message, e))?;
        let route = RoutePattern::compile(&spec);

        let matching: Vec<_> = self
            .server
            .requests()
            .into_iter()
            .filter_map(|request| {
                route
                    .match_request(&request.method, &request.url)
                    .map(|path_variables| {
                        json!({
                            "url": request.url,
                            "headers": request.headers,
                            "body": request.body,
                            "pathVariables": path_variables,
                        })
                    })
            })
            .collect();

        sink.send(Message::new(HTTP_HOME, "requests", json!(matching)));
        sink.advance();
        Ok(())
    }
}

impl Plugin for HttpPlugin {
    fn handle(&mut self, message: &Message, sink: &mut EffectSink) -> Result<()> {
        match message.name.as_str() {
            "setup" => {
                self.server.reset();
                sink.advance();
                Ok(())
            }
            "stub" => self.handle_stub(message, sink),
            "fetch-requests" => self.handle_fetch_requests(message, sink),
            _ => {
                tracing::warn!(name = %message.name, "unknown http message");
                sink.advance();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Control;
    use crate::sim::{RecordedRequest, RequestOutcome};
    use serde_json::Value;

    fn handle(plugin: &mut HttpPlugin, name: &str, body: Value) -> (Vec<Message>, Option<Control>) {
        let mut sink = EffectSink::new();
        plugin
            .handle(&Message::new(HTTP_HOME, name, body), &mut sink)
            .unwrap();
        sink.into_parts()
    }

    fn get(url: &str) -> RecordedRequest {
        RecordedRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[test]
    fn test_stub_answers_matching_requests() {
        let server = FakeServer::new();
        let mut plugin = HttpPlugin::new(server.clone());

        let (_, control) = handle(
            &mut plugin,
            "stub",
            json!({
                "route": {"method": "GET", "path": "/users/:id"},
                "status": 201,
                "body": "created",
            }),
        );
        assert_eq!(control, Some(Control::Advance));

        match server.issue(get("/users/42")) {
            RequestOutcome::Response { status, body, .. } => {
                assert_eq!(status, 201);
                assert_eq!(body, "created");
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_stub_can_simulate_network_error_and_timeout() {
        let server = FakeServer::new();
        let mut plugin = HttpPlugin::new(server.clone());

        handle(
            &mut plugin,
            "stub",
            json!({"route": {"method": "GET", "path": "/flaky"}, "error": "network"}),
        );
        assert_eq!(server.issue(get("/flaky")), RequestOutcome::NetworkError);

        handle(
            &mut plugin,
            "stub",
            json!({"route": {"method": "GET", "path": "/slow"}, "error": "timeout"}),
        );
        assert_eq!(server.issue(get("/slow")), RequestOutcome::TimedOut);
    }

    #[test]
    fn test_stub_with_should_respond_false_leaves_request_pending() {
        let server = FakeServer::new();
        let mut plugin = HttpPlugin::new(server.clone());

        handle(
            &mut plugin,
            "stub",
            json!({"route": {"method": "GET", "path": "/quiet"}, "shouldRespond": false}),
        );
        assert_eq!(server.issue(get("/quiet")), RequestOutcome::Pending);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let server = FakeServer::new();
        let mut plugin = HttpPlugin::new(server.clone());

        handle(
            &mut plugin,
            "stub",
            json!({"route": {"method": "GET", "path": "/users"}}),
        );
        server.issue(get("/users"));

        handle(&mut plugin, "setup", Value::Null);
        handle(&mut plugin, "setup", Value::Null);
        assert_eq!(server.stub_count(), 0);
        assert_eq!(server.request_count(), 0);
    }

    #[test]
    fn test_fetch_requests_replies_with_path_variables() {
        let server = FakeServer::new();
        let mut plugin = HttpPlugin::new(server.clone());
        server.issue(get("/users/42"));
        server.issue(get("/orders/42"));

        let (outbox, control) = handle(
            &mut plugin,
            "fetch-requests",
            json!({"method": "GET", "path": "/users/:id"}),
        );

        assert_eq!(control, Some(Control::Advance));
        assert_eq!(outbox[0].name, "requests");
        let listed = outbox[0].body.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["url"], "/users/42");
        assert_eq!(listed[0]["pathVariables"]["id"], "42");
    }

    #[test]
    fn test_malformed_stub_is_a_runner_level_fault() {
        let server = FakeServer::new();
        let mut plugin = HttpPlugin::new(server);

        let mut sink = EffectSink::new();
        let result = plugin.handle(
            &Message::new(HTTP_HOME, "stub", json!({"status": 200})),
            &mut sink,
        );
        assert!(matches!(result, Err(Error::MessageFormat { .. })));
    }
}
