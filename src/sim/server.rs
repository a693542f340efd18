//! In-memory XHR-like surface
//!
//! Simulates HTTP without sockets. The subject issues requests through a
//! cloneable `FakeServer` handle and is answered synchronously at issue
//! time from the stub table; the network plugin manages that table and
//! reads the request log for assertions. No stub means the request stays
//! perpetually pending, mirroring "no response configured".

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::plugin::route::RoutePattern;

/// One request issued by the subject, as logged
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// What a stub delivers when its route matches
#[derive(Debug, Clone, PartialEq)]
pub enum StubResponse {
    Respond {
        status: u16,
        headers: BTreeMap<String, String>,
        body: String,
    },
    NetworkError,
    Timeout,
    NeverRespond,
}

/// The answer the subject receives when issuing a request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Response {
        status: u16,
        headers: BTreeMap<String, String>,
        body: String,
    },
    NetworkError,
    TimedOut,
    Pending,
}

#[derive(Default)]
struct ServerState {
    requests: Vec<RecordedRequest>,
    stubs: Vec<(RoutePattern, StubResponse)>,
}

/// Cloneable handle over the simulated server state
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Rc<RefCell<ServerState>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the request log and stub table
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.requests.clear();
        state.stubs.clear();
    }

    /// Register a responder for a route. Later registrations win.
    pub fn add_stub(&self, route: RoutePattern, response: StubResponse) {
        self.state.borrow_mut().stubs.push((route, response));
    }

    /// Issue a request and answer it from the stub table.
    ///
    /// The request is always logged, matched or not.
    pub fn issue(&self, request: RecordedRequest) -> RequestOutcome {
        let mut state = self.state.borrow_mut();
        let outcome = state
            .stubs
            .iter()
            .rev()
            .find(|(route, _)| route.match_request(&request.method, &request.url).is_some())
            .map(|(_, response)| match response {
                StubResponse::Respond {
                    status,
                    headers,
                    body,
                } => RequestOutcome::Response {
                    status: *status,
                    headers: headers.clone(),
                    body: body.clone(),
                },
                StubResponse::NetworkError => RequestOutcome::NetworkError,
                StubResponse::Timeout => RequestOutcome::TimedOut,
                StubResponse::NeverRespond => RequestOutcome::Pending,
            })
            .unwrap_or(RequestOutcome::Pending);
        state.requests.push(request);
        outcome
    }

    /// Snapshot of the request log, in issue order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn stub_count(&self) -> usize {
        self.state.borrow().stubs.len()
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }
}
