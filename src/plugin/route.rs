//! Route patterns for the network plugin
//!
//! A route is a method plus a path pattern like `/users/:id`. Patterns
//! compile to a segment matcher; matching a request URL yields the
//! extracted path variables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Wire shape of a route inside stub and fetch-requests bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A compiled method + path-pattern matcher
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePattern {
    method: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a route. Path segments starting with `:` become variables.
    pub fn compile(spec: &RouteSpec) -> Self {
        let segments = split_path(&spec.path)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Variable(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            method: spec.method.to_uppercase(),
            segments,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Match a request against this route.
    ///
    /// The method must match exactly (case-insensitive) and every path
    /// segment must line up; variables capture their segment. Returns the
    /// extracted path variables on a match.
    pub fn match_request(&self, method: &str, url: &str) -> Option<BTreeMap<String, String>> {
        if !method.eq_ignore_ascii_case(&self.method) {
            return None;
        }
        self.match_url(url)
    }

    /// Match a URL path, ignoring the method
    pub fn match_url(&self, url: &str) -> Option<BTreeMap<String, String>> {
        let segments: Vec<&str> = split_path(path_of(url)).collect();
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut variables = BTreeMap::new();
        for (pattern, actual) in self.segments.iter().zip(segments) {
            match pattern {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Variable(name) => {
                    variables.insert(name.clone(), actual.to_string());
                }
            }
        }
        Some(variables)
    }
}

/// Strip scheme, host, query, and fragment from a URL
fn path_of(url: &str) -> &str {
    let after_host = match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "",
            }
        }
        None => url,
    };
    let end = after_host
        .find(['?', '#'])
        .unwrap_or(after_host.len());
    &after_host[..end]
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
