//! Endpoint lookup and dispatch.
//!
//! # Responsibilities
//! - Store adapters by endpoint
//! - Look up the adapter for a request path
//! - Answer unmatched paths (404, or a redirect onto a subtree)
//!
//! # Design Decisions
//! - Immutable after startup (shared without locks)
//! - Exact endpoints in a HashMap, O(1) lookup
//! - Subtrees kept sorted longest-first so the first hit is the most specific
//! - Rebinding an endpoint replaces the earlier adapter

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::SharedAdapter;
use crate::http::response::not_found;
use crate::routing::matcher::EndpointPattern;

/// Result of looking up a request path.
pub enum RouteMatch<'a> {
    /// The adapter bound to the best matching endpoint.
    Handler(&'a SharedAdapter),
    /// Only the slash-terminated form of the path is bound.
    RedirectToSubtree(String),
    NotFound,
}

/// Dispatch table from endpoints to adapters.
#[derive(Debug, Default)]
pub struct Dispatch {
    exact: HashMap<String, SharedAdapter>,
    /// Sorted by descending pattern length.
    subtrees: Vec<(EndpointPattern, SharedAdapter)>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `adapter` at `endpoint`. Returns true if an earlier binding was replaced.
    pub fn bind(&mut self, endpoint: &str, adapter: SharedAdapter) -> bool {
        let pattern = EndpointPattern::new(endpoint);
        match pattern {
            EndpointPattern::Exact(path) => self.exact.insert(path, adapter).is_some(),
            subtree @ EndpointPattern::Subtree(_) => {
                if let Some(slot) = self.subtrees.iter_mut().find(|(p, _)| *p == subtree) {
                    slot.1 = adapter;
                    return true;
                }
                self.subtrees.push((subtree, adapter));
                self.subtrees
                    .sort_by(|(a, _), (b, _)| b.as_str().len().cmp(&a.as_str().len()));
                false
            }
        }
    }

    /// Whether an adapter is bound at exactly `endpoint`.
    pub fn contains(&self, endpoint: &str) -> bool {
        match EndpointPattern::new(endpoint) {
            EndpointPattern::Exact(path) => self.exact.contains_key(&path),
            subtree => self.subtrees.iter().any(|(p, _)| *p == subtree),
        }
    }

    /// Find the adapter for `path`.
    pub fn lookup(&self, path: &str) -> RouteMatch<'_> {
        if let Some(adapter) = self.exact.get(path) {
            return RouteMatch::Handler(adapter);
        }
        if let Some((_, adapter)) = self.subtrees.iter().find(|(p, _)| p.matches(path)) {
            return RouteMatch::Handler(adapter);
        }

        let with_slash = format!("{}/", path);
        if self.subtrees.iter().any(|(p, _)| p.as_str() == with_slash) {
            return RouteMatch::RedirectToSubtree(with_slash);
        }
        RouteMatch::NotFound
    }

    /// Route `request` to its adapter and await the response.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let path = request.uri().path().to_string();
        match self.lookup(&path) {
            RouteMatch::Handler(adapter) => adapter.serve(request).await,
            RouteMatch::RedirectToSubtree(mut location) => {
                if let Some(query) = request.uri().query() {
                    location.push('?');
                    location.push_str(query);
                }
                (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
            }
            RouteMatch::NotFound => {
                tracing::debug!(path = %path, "no endpoint matched");
                not_found()
            }
        }
    }

    /// All bound endpoints, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .exact
            .keys()
            .cloned()
            .chain(self.subtrees.iter().map(|(p, _)| p.as_str().to_string()))
            .collect();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.subtrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
