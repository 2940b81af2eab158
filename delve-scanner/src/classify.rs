use serde::{Deserialize, Serialize};

/// Where a visited URL lands in a root's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Carries at least one `key=value` in its query string
    VulnCandidate,
    /// Ends in `/` inside the root's scope; promoted to a crawl root later
    Directory,
    /// Anything else, only recorded as found
    Plain,
}

/// Classify a visited URL against its root's scope prefix.
///
/// The query check runs first: `http://x/a/?id=1` is a candidate, never a
/// directory. Both predicates are plain string tests on purpose and must
/// stay in this order.
pub fn classify(url: &str, scope_prefix: &str) -> Classification {
    if url.contains('?') && url.contains('=') {
        Classification::VulnCandidate
    } else if url.ends_with('/') && url.starts_with(scope_prefix) {
        Classification::Directory
    } else {
        Classification::Plain
    }
}

/// A form submits via POST when its method, trimmed and lowercased, is
/// `post`. A missing method means `get`.
pub fn is_post_method(method: Option<&str>) -> bool {
    method
        .map(|m| m.trim().eq_ignore_ascii_case("post"))
        .unwrap_or(false)
}
