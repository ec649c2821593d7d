//! Route pattern matching.
//!
//! # Responsibilities
//! - Classify a route source as an exact path or a subtree (trailing `/`)
//! - Match request paths against a pattern (case-sensitive)
//! - Canonicalise request paths for redirect decisions
//!
//! # Design Decisions
//! - No regex: exact comparison or byte prefix only
//! - A subtree pattern also matches its own path exactly
//! - Path cleaning mirrors `path.Clean` semantics but keeps a trailing slash
//! - `%2e` counts as `.` when deciding what a dot segment is, because upstream
//!   URL building collapses those forms too

use thiserror::Error;

/// Error type for route registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("invalid route pattern {0:?}: must be non-empty and begin with '/'")]
    InvalidPattern(String),

    #[error("multiple registrations for {0}")]
    DuplicateRoute(String),
}

/// A registered path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Matches only this exact path.
    Exact(String),
    /// Ends in `/`; matches every path sharing the prefix.
    Subtree(String),
}

impl Pattern {
    /// Classify a route source path.
    pub fn parse(source: &str) -> Result<Self, RoutingError> {
        if !source.starts_with('/') {
            return Err(RoutingError::InvalidPattern(source.to_string()));
        }
        if source.ends_with('/') {
            Ok(Pattern::Subtree(source.to_string()))
        } else {
            Ok(Pattern::Exact(source.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Exact(p) | Pattern::Subtree(p) => p,
        }
    }

    pub fn is_subtree(&self) -> bool {
        matches!(self, Pattern::Subtree(_))
    }

    /// Returns true if `path` is selected by this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(p) => path == p,
            Pattern::Subtree(p) => path.starts_with(p.as_str()),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return the canonical form of a request path.
///
/// Resolves `.` and `..` segments (including escaped forms such as `%2e%2e`),
/// collapses repeated slashes, forces a leading `/` and preserves a trailing `/`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match dot_segment(segment) {
            Some(DotSegment::Current) => {}
            Some(DotSegment::Parent) => {
                segments.pop();
            }
            None if segment.is_empty() => {}
            None => segments.push(segment),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() || (path.ends_with('/') && !cleaned.ends_with('/')) {
        cleaned.push('/');
    }
    cleaned
}

enum DotSegment {
    Current,
    Parent,
}

// `.`, `%2e`, `..`, `.%2e`, `%2e.`, `%2e%2e`, ASCII case-insensitive.
fn dot_segment(segment: &str) -> Option<DotSegment> {
    let mut rest = segment.as_bytes();
    let mut dots = 0;
    while !rest.is_empty() {
        if rest[0] == b'.' {
            rest = &rest[1..];
        } else if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case(b"%2e") {
            rest = &rest[3..];
        } else {
            return None;
        }
        dots += 1;
    }
    match dots {
        1 => Some(DotSegment::Current),
        2 => Some(DotSegment::Parent),
        _ => None,
    }
}
