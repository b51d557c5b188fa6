//! Host pattern matching.
//!
//! # Responsibilities
//! - Compile a vhost pattern into an exact or wildcard matcher
//! - Strip the port from a `Host` header value
//!
//! # Design Decisions
//! - A leading `*` makes a suffix pattern: `*.example.com` matches any host
//!   ending in `.example.com`
//! - A bare `*` has an empty suffix and therefore matches every host
//! - Matching is case-sensitive, exactly as configured
//! - No regex to guarantee O(n) matching

/// A compiled vhost pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// Literal hostname.
    Exact(String),
    /// Everything after the leading `*`.
    Wildcard { suffix: String },
}

impl HostPattern {
    /// Compile a pattern as written in configuration.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_prefix('*') {
            Some(suffix) => HostPattern::Wildcard {
                suffix: suffix.to_string(),
            },
            None => HostPattern::Exact(pattern.to_string()),
        }
    }

    /// Returns true if `host` (already stripped of its port) matches.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Exact(expected) => host == expected,
            HostPattern::Wildcard { suffix } => host.ends_with(suffix.as_str()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, HostPattern::Wildcard { .. })
    }
}

/// Extract the hostname from a `Host` header value.
///
/// Everything from the first `:` on is dropped. Returns `None` when no
/// hostname remains.
pub fn bare_hostname(host_header: &str) -> Option<&str> {
    let host = host_header.split(':').next().unwrap_or(host_header);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let pattern = HostPattern::parse("api.example.com");
        assert!(!pattern.is_wildcard());
        assert!(pattern.matches("api.example.com"));
        assert!(!pattern.matches("www.api.example.com"));
        assert!(!pattern.matches("API.EXAMPLE.COM"));
    }

    #[test]
    fn test_wildcard_pattern() {
        let pattern = HostPattern::parse("*.example.com");
        assert!(pattern.is_wildcard());
        assert!(pattern.matches("api.example.com"));
        assert!(pattern.matches("a.b.example.com"));
        assert!(!pattern.matches("example.com"));
        assert!(!pattern.matches("example.org"));
    }

    #[test]
    fn test_wildcard_without_dot_matches_plain_suffix() {
        let pattern = HostPattern::parse("*example.com");
        assert!(pattern.matches("example.com"));
        assert!(pattern.matches("myexample.com"));
    }

    #[test]
    fn test_bare_star_matches_everything() {
        let pattern = HostPattern::parse("*");
        assert!(pattern.matches("anything.at.all"));
        assert!(pattern.matches("localhost"));
    }

    #[test]
    fn test_bare_hostname() {
        assert_eq!(bare_hostname("example.com"), Some("example.com"));
        assert_eq!(bare_hostname("example.com:8080"), Some("example.com"));
        assert_eq!(bare_hostname(":8080"), None);
        assert_eq!(bare_hostname(""), None);
    }
}
