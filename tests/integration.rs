//! End-to-end tests driving full subjects through the standard plugin set

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{json, Value};

use scenario_harness::message::{
    Conclusion, Message, Observation, HARNESS_HOME, HTML_HOME, HTTP_HOME, OBSERVER_HOME,
    SCENARIO_HOME,
};
use scenario_harness::program::{
    Flags, OutboundChannel, Program, ProgramDefinition, ProgramFactory, SubjectEnvironment,
};
use scenario_harness::reporter::Reporter;
use scenario_harness::runner::{HarnessSession, SuiteOptions, SuiteRunner, SuiteSummary};
use scenario_harness::sim::{
    ElementSpec, FakeServer, RecordedRequest, RequestOutcome, SimDocument, ViewUpdate,
};
use scenario_harness::{Error, Result};

/// Reporter that records everything for assertions
#[derive(Default)]
struct Recording {
    observations: Vec<Observation>,
    errors: Vec<String>,
    subjects: Vec<String>,
}

impl Reporter for Recording {
    fn start_subject(&mut self, name: &str) {
        self.subjects.push(name.to_string());
    }

    fn record(&mut self, observation: &Observation) {
        self.observations.push(observation.clone());
    }

    fn error(&mut self, error: &Error) {
        self.errors.push(error.to_string());
    }
}

fn run_suite(definitions: &[ProgramDefinition]) -> (SuiteSummary, Recording) {
    let mut reporter = Recording::default();
    let summary =
        SuiteRunner::new(&mut reporter, SuiteOptions::default()).run_all(definitions);
    (summary, reporter)
}

// === A counter application driven through the DOM plugin ===

/// Renders a button and a count, clicks the button a configured number of
/// times, then observes the rendered count against an expected value.
struct Counter {
    count: u32,
    clicks_remaining: u32,
    expected: u32,
    observed: bool,
    done: bool,
    document: Rc<RefCell<SimDocument>>,
    output: OutboundChannel,
}

impl Counter {
    fn render_count(&mut self) {
        self.document.borrow_mut().render(ViewUpdate::Upsert(
            ElementSpec::new("#count", "div")
                .with_attribute("id", "count")
                .with_text(&self.count.to_string()),
        ));
    }

    fn next_step(&mut self) {
        if self.clicks_remaining > 0 {
            self.clicks_remaining -= 1;
            self.output.emit(Message::new(
                HTML_HOME,
                "click",
                json!({"selector": "#counter-button"}),
            ));
        } else if !self.observed {
            self.output.emit(Message::new(
                HTML_HOME,
                "query",
                json!({"selector": "#count"}),
            ));
        } else if !self.done {
            self.done = true;
            self.output
                .emit(Message::new(SCENARIO_HOME, "state", json!("COMPLETE")));
        }
    }

    fn observe_count(&mut self, description: &Value) {
        self.observed = true;
        let shown = description["children"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let expected = self.expected.to_string();
        let observation = if shown == expected {
            json!({
                "summary": "the count shows the clicked total",
                "message": "",
                "conclusion": "accept",
                "report": [],
            })
        } else {
            let message = format!("Expected {} but the counter showed {}", expected, shown);
            json!({
                "summary": "the count shows the clicked total",
                "message": message,
                "conclusion": "reject",
                "report": [{"statement": message}],
            })
        };
        self.output
            .emit(Message::new(OBSERVER_HOME, "observation", observation));
    }
}

impl Program for Counter {
    fn send(&mut self, message: Message) {
        if message.is_for(SCENARIO_HOME) {
            match message.name.as_str() {
                "start" => {
                    self.document.borrow_mut().render(ViewUpdate::Upsert(
                        ElementSpec::new("#counter-button", "button")
                            .with_attribute("id", "counter-button")
                            .with_text("Count up")
                            .on("click", Message::bare("app", "increment")),
                    ));
                    self.render_count();
                    self.next_step();
                }
                "step" => self.next_step(),
                _ => {}
            }
        } else if message.is_for("app") && message.name == "increment" {
            self.count += 1;
            self.render_count();
        } else if message.is_for(HTML_HOME) && message.name == "selected" {
            let description = message.body.clone();
            self.observe_count(&description);
        }
    }
}

struct CounterFactory {
    clicks: u32,
    expected: u32,
}

impl ProgramFactory for CounterFactory {
    fn init(&self, _flags: Flags, env: SubjectEnvironment) -> Result<Box<dyn Program>> {
        Ok(Box::new(Counter {
            count: 0,
            clicks_remaining: self.clicks,
            expected: self.expected,
            observed: false,
            done: false,
            document: env.document.clone(),
            output: env.output.clone(),
        }))
    }
}

fn counter(name: &str, clicks: u32, expected: u32) -> ProgramDefinition {
    ProgramDefinition::new(name, Box::new(CounterFactory { clicks, expected }))
}

#[test]
fn test_counter_scenario_accepts_the_clicked_total() {
    let (summary, reporter) = run_suite(&[counter("Counter", 5, 5)]);

    assert!(summary.is_passing());
    assert_eq!(summary.accepted, 1);
    assert_eq!(reporter.observations[0].summary, "the count shows the clicked total");
    assert!(reporter.observations[0].is_accepted());
}

#[test]
fn test_counter_scenario_rejects_a_wrong_expectation() {
    let (summary, reporter) = run_suite(&[counter("Counter", 4, 5)]);

    assert!(!summary.is_passing());
    assert_eq!(summary.rejected, 1);
    let observation = &reporter.observations[0];
    assert_eq!(observation.conclusion, Conclusion::Reject);
    assert_eq!(observation.message, "Expected 5 but the counter showed 4");
    assert_eq!(observation.report[0].statement, "Expected 5 but the counter showed 4");
}

#[test]
fn test_identical_runs_produce_identical_observation_streams() {
    let serialize = || {
        let (_, reporter) = run_suite(&[counter("Counter", 5, 5), counter("Again", 3, 4)]);
        serde_json::to_string(&reporter.observations).unwrap()
    };

    assert_eq!(serialize(), serialize());
}

#[test]
fn test_faulting_subject_is_isolated_from_the_rest() {
    struct Broken {
        output: OutboundChannel,
    }
    impl Program for Broken {
        fn send(&mut self, message: Message) {
            if message.is_for(SCENARIO_HOME) && message.name == "start" {
                self.output.emit(Message::bare("_nowhere", "lost"));
            }
        }
    }
    struct BrokenFactory;
    impl ProgramFactory for BrokenFactory {
        fn init(&self, _flags: Flags, env: SubjectEnvironment) -> Result<Box<dyn Program>> {
            Ok(Box::new(Broken {
                output: env.output.clone(),
            }))
        }
    }

    let definitions = vec![
        ProgramDefinition::new("Broken", Box::new(BrokenFactory)),
        counter("Counter", 2, 2),
    ];
    let (summary, reporter) = run_suite(&definitions);

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.accepted, 1);
    assert_eq!(reporter.subjects, vec!["Broken", "Counter"]);
    assert!(reporter.errors[0].contains("_nowhere"));
}

// === An API client driven through the network plugin ===

/// Stubs a route, issues a request against it, then observes the request
/// log including extracted path variables.
struct ApiClient {
    phase: u32,
    response_ok: bool,
    server: FakeServer,
    output: OutboundChannel,
}

impl Program for ApiClient {
    fn send(&mut self, message: Message) {
        if message.is_for(SCENARIO_HOME) {
            match message.name.as_str() {
                "start" => self.output.emit(Message::bare(HTTP_HOME, "setup")),
                "step" => {
                    self.phase += 1;
                    match self.phase {
                        1 => self.output.emit(Message::new(
                            HTTP_HOME,
                            "stub",
                            json!({
                                "route": {"method": "GET", "path": "/api/items/:id"},
                                "status": 200,
                                "body": "widget",
                            }),
                        )),
                        2 => {
                            let outcome = self.server.issue(RecordedRequest {
                                method: "GET".to_string(),
                                url: "/api/items/7".to_string(),
                                headers: BTreeMap::new(),
                                body: None,
                            });
                            self.response_ok = matches!(
                                outcome,
                                RequestOutcome::Response { status: 200, ref body, .. }
                                    if body == "widget"
                            );
                            self.output.emit(Message::new(
                                HTTP_HOME,
                                "fetch-requests",
                                json!({"method": "GET", "path": "/api/items/:id"}),
                            ));
                        }
                        _ => self
                            .output
                            .emit(Message::new(SCENARIO_HOME, "state", json!("COMPLETE"))),
                    }
                }
                _ => {}
            }
        } else if message.is_for(HTTP_HOME) && message.name == "requests" {
            let listed = message.body.as_array().cloned().unwrap_or_default();
            let logged_ok = listed.len() == 1 && listed[0]["pathVariables"]["id"] == json!("7");
            let observation = if self.response_ok && logged_ok {
                json!({
                    "summary": "the stubbed item is fetched",
                    "message": "",
                    "conclusion": "accept",
                    "report": [],
                })
            } else {
                json!({
                    "summary": "the stubbed item is fetched",
                    "message": "The request log did not match",
                    "conclusion": "reject",
                    "report": [{"statement": "The request log did not match"}],
                })
            };
            self.output
                .emit(Message::new(OBSERVER_HOME, "observation", observation));
        }
    }
}

struct ApiClientFactory;

impl ProgramFactory for ApiClientFactory {
    fn init(&self, _flags: Flags, env: SubjectEnvironment) -> Result<Box<dyn Program>> {
        Ok(Box::new(ApiClient {
            phase: 0,
            response_ok: false,
            server: env.server.clone(),
            output: env.output.clone(),
        }))
    }
}

#[test]
fn test_stubbed_request_round_trip_with_path_variables() {
    let definitions = vec![ProgramDefinition::new("ApiClient", Box::new(ApiClientFactory))];
    let (summary, reporter) = run_suite(&definitions);

    assert!(summary.is_passing(), "errors: {:?}", reporter.errors);
    assert_eq!(summary.accepted, 1);
    assert!(reporter.observations[0].is_accepted());
}

// === A subject driven piecewise through a harness session ===

/// Counts clicks on command: setup renders the view, a steps request
/// clicks a configured number of times, observe checks the tally.
struct CommandCounter {
    count: u32,
    pending_clicks: u32,
    document: Rc<RefCell<SimDocument>>,
    output: OutboundChannel,
}

impl CommandCounter {
    fn click(&mut self) {
        self.output.emit(Message::new(
            HTML_HOME,
            "click",
            json!({"selector": "#counter-button"}),
        ));
    }

    fn complete(&mut self) {
        self.output.emit(Message::bare(HARNESS_HOME, "complete"));
    }
}

impl Program for CommandCounter {
    fn send(&mut self, message: Message) {
        if message.is_for(HARNESS_HOME) {
            match message.name.as_str() {
                "setup" => {
                    self.count = 0;
                    self.document.borrow_mut().render(ViewUpdate::Upsert(
                        ElementSpec::new("#counter-button", "button")
                            .with_attribute("id", "counter-button")
                            .on("click", Message::bare("app", "increment")),
                    ));
                    self.complete();
                }
                "steps" => {
                    self.pending_clicks = message.body["config"].as_u64().unwrap_or(0) as u32;
                    if self.pending_clicks > 0 {
                        self.pending_clicks -= 1;
                        self.click();
                    } else {
                        self.complete();
                    }
                }
                "observe" => {
                    let expected = message.body["expected"].as_u64().unwrap_or(0) as u32;
                    let accepted = self.count == expected;
                    self.output.emit(Message::new(
                        OBSERVER_HOME,
                        "observation",
                        json!({
                            "summary": "the tally matches",
                            "message": "",
                            "conclusion": if accepted { "accept" } else { "reject" },
                            "report": [],
                        }),
                    ));
                    self.complete();
                }
                _ => {}
            }
        } else if message.is_for(SCENARIO_HOME) && message.name == "step" {
            if self.pending_clicks > 0 {
                self.pending_clicks -= 1;
                self.click();
            } else {
                self.complete();
            }
        } else if message.is_for("app") && message.name == "increment" {
            self.count += 1;
        }
    }
}

struct CommandCounterFactory;

impl ProgramFactory for CommandCounterFactory {
    fn init(&self, _flags: Flags, env: SubjectEnvironment) -> Result<Box<dyn Program>> {
        Ok(Box::new(CommandCounter {
            count: 0,
            pending_clicks: 0,
            document: env.document.clone(),
            output: env.output.clone(),
        }))
    }
}

#[test]
fn test_harness_session_drives_a_subject_piecewise() {
    let definition = ProgramDefinition::new("CommandCounter", Box::new(CommandCounterFactory));
    let mut session = HarnessSession::start(&definition, &SuiteOptions::default()).unwrap();

    session.setup("default", Value::Null).unwrap();
    session.run_steps("click", json!(3)).unwrap();
    let observation = session.observe("tally", json!(3)).unwrap();
    assert!(observation.is_accepted());

    // The same live subject keeps its state across further commands
    session.run_steps("click", json!(2)).unwrap();
    let observation = session.observe("tally", json!(5)).unwrap();
    assert!(observation.is_accepted());

    let observation = session.observe("tally", json!(99)).unwrap();
    assert_eq!(observation.conclusion, Conclusion::Reject);
}

#[test]
fn test_empty_suite_passes() {
    let (summary, reporter) = run_suite(&[]);
    assert!(summary.is_passing());
    assert!(reporter.subjects.is_empty());
}
