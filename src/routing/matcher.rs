//! Endpoint pattern matching.
//!
//! # Responsibilities
//! - Classify an endpoint as exact or subtree (trailing `/`)
//! - Match request paths against a pattern
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Subtree patterns match themselves and every deeper path
//! - No regex; plain prefix comparison

/// A bound endpoint, either matched exactly or as a whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointPattern {
    Exact(String),
    Subtree(String),
}

/// Endpoint in its served form, with a leading `/`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{}", endpoint)
    }
}

impl EndpointPattern {
    /// Build a pattern from an endpoint string.
    ///
    /// A missing leading slash is added; a trailing slash makes it a subtree.
    pub fn new(endpoint: &str) -> Self {
        let endpoint = normalize_endpoint(endpoint);
        if endpoint.ends_with('/') {
            EndpointPattern::Subtree(endpoint)
        } else {
            EndpointPattern::Exact(endpoint)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EndpointPattern::Exact(s) | EndpointPattern::Subtree(s) => s,
        }
    }

    pub fn is_subtree(&self) -> bool {
        matches!(self, EndpointPattern::Subtree(_))
    }

    /// Returns true if `path` falls under this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            EndpointPattern::Exact(e) => path == e,
            EndpointPattern::Subtree(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let p = EndpointPattern::new("/foo");
        assert!(!p.is_subtree());
        assert!(p.matches("/foo"));
        assert!(!p.matches("/foo/"));
        assert!(!p.matches("/foo/bar"));
        assert!(!p.matches("/FOO"));
    }

    #[test]
    fn test_subtree_pattern() {
        let p = EndpointPattern::new("/docs/");
        assert!(p.is_subtree());
        assert!(p.matches("/docs/"));
        assert!(p.matches("/docs/a/b.txt"));
        assert!(!p.matches("/docs"));
        assert!(!p.matches("/docsx"));
    }

    #[test]
    fn test_leading_slash_added() {
        assert_eq!(EndpointPattern::new("foo").as_str(), "/foo");
        assert_eq!(EndpointPattern::new("/").as_str(), "/");
        assert_eq!(normalize_endpoint("docs/"), "/docs/");
        assert_eq!(normalize_endpoint("/docs/"), "/docs/");
    }
}
