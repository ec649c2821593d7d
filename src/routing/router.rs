//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes with their bound handlers
//! - Look up the matching route for a request path
//! - Return matched route, a canonicalising redirect, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact lookup via HashMap
//! - Subtree patterns kept longest-first, so the first hit is the most specific
//! - Duplicate sources are rejected instead of silently shadowing

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::matcher::{clean_path, Pattern, RoutingError};

struct Entry<H> {
    pattern: Pattern,
    handler: H,
}

/// Immutable routing table mapping path patterns to handlers.
pub struct RouteTable<H> {
    entries: Vec<Entry<H>>,
    /// Every pattern by its literal text (subtree patterns included).
    exact: HashMap<String, usize>,
    /// Indices of subtree patterns, longest pattern first.
    subtrees: Vec<usize>,
}

/// Outcome of resolving a request against the table.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a, H> {
    /// The request is served by this route.
    Matched { pattern: &'a Pattern, handler: &'a H },
    /// The client should retry at this location (301).
    Redirect(String),
    /// No route selects this path.
    NotFound,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            exact: HashMap::new(),
            subtrees: Vec::new(),
        }
    }

    /// Build a table from `(source, handler)` pairs, failing on the first bad one.
    pub fn from_routes<I, S>(routes: I) -> Result<Self, RoutingError>
    where
        I: IntoIterator<Item = (S, H)>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for (source, handler) in routes {
            table.insert(source.as_ref(), handler)?;
        }
        Ok(table)
    }

    /// Register a handler under a source pattern.
    pub fn insert(&mut self, source: &str, handler: H) -> Result<(), RoutingError> {
        let pattern = Pattern::parse(source)?;
        if self.exact.contains_key(source) {
            return Err(RoutingError::DuplicateRoute(source.to_string()));
        }

        let index = self.entries.len();
        self.exact.insert(source.to_string(), index);
        if pattern.is_subtree() {
            let pos = self
                .subtrees
                .partition_point(|&i| self.entries[i].pattern.as_str().len() >= source.len());
            self.subtrees.insert(pos, index);
        }
        self.entries.push(Entry { pattern, handler });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered patterns and handlers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &H)> {
        self.entries.iter().map(|e| (&e.pattern, &e.handler))
    }

    /// Select the route for a path: exact registration first, then the
    /// longest subtree prefix.
    pub fn lookup(&self, path: &str) -> Option<(&Pattern, &H)> {
        let index = self.exact.get(path).copied().or_else(|| {
            self.subtrees
                .iter()
                .copied()
                .find(|&i| self.entries[i].pattern.matches(path))
        })?;
        let entry = &self.entries[index];
        Some((&entry.pattern, &entry.handler))
    }

    /// Resolve a request, applying the canonical-path and trailing-slash redirects.
    pub fn resolve(&self, method: &Method, path: &str, query: Option<&str>) -> Resolution<'_, H> {
        if method != Method::CONNECT {
            let cleaned = clean_path(path);
            if let Some(location) = self.slash_redirect(&cleaned, query) {
                return Resolution::Redirect(location);
            }
            if cleaned != path {
                return Resolution::Redirect(with_query(cleaned, query));
            }
        } else if let Some(location) = self.slash_redirect(path, query) {
            return Resolution::Redirect(location);
        }

        match self.lookup(path) {
            Some((pattern, handler)) => Resolution::Matched { pattern, handler },
            None => Resolution::NotFound,
        }
    }

    // `/tree` redirects to `/tree/` when only the subtree is registered.
    fn slash_redirect(&self, path: &str, query: Option<&str>) -> Option<String> {
        if path.is_empty() || self.exact.contains_key(path) {
            return None;
        }
        let with_slash = format!("{path}/");
        if self.exact.contains_key(&with_slash) {
            Some(with_query(with_slash, query))
        } else {
            None
        }
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> std::fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.pattern))
            .finish()
    }
}

fn with_query(path: String, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path,
    }
}
