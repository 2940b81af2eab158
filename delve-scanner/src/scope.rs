//! URL normalization and scope prefixes.
//!
//! Every set membership test, queue insertion and scope comparison in the
//! crawler goes through [`normalize_url`], so both sides of a comparison
//! always carry the same shape.

use url::Url;

/// Trim surrounding whitespace and drop the fragment.
///
/// Returns an empty string for empty or whitespace-only input, which the
/// crawler treats as "no URL". The query string is kept as is; nothing is
/// percent-decoded and trailing slashes are left alone.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    // Whitespace in front of the '#' must not survive, or a second pass
    // would trim it and change the value.
    without_fragment.trim_end().to_string()
}

/// Containment prefix for a crawl root.
///
/// A root ending in `/` is its own prefix. Anything else is cut back to
/// its last `/` (inclusive), so `http://a.test/app/index.php` scopes to
/// `http://a.test/app/`.
pub fn scope_of(root: &str) -> String {
    if root.ends_with('/') {
        return root.to_string();
    }

    match root.rfind('/') {
        Some(idx) => root[..=idx].to_string(),
        None => format!("{}/", root),
    }
}

/// Whether `url` falls under `scope_prefix`.
pub fn in_scope(url: &str, scope_prefix: &str) -> bool {
    url.starts_with(scope_prefix)
}

/// Resolve `reference` against `base` and normalize the result.
///
/// Returns `None` when `base` is not an absolute URL or the join fails.
pub fn resolve_url(base: &str, reference: &str) -> Option<String> {
    let base_url = Url::parse(base).ok()?;
    let joined = base_url.join(reference.trim()).ok()?;
    Some(normalize_url(joined.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_fragment() {
        assert_eq!(
            normalize_url("http://a.test/app/search.php?q=1#frag"),
            "http://a.test/app/search.php?q=1"
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_url("  http://a.test/x \n"), "http://a.test/x");
    }

    #[test]
    fn test_normalize_empty_and_blank() {
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("   \t"), "");
        assert_eq!(normalize_url("#only-fragment"), "");
    }

    #[test]
    fn test_normalize_keeps_query_and_slashes() {
        assert_eq!(
            normalize_url("http://a.test/dir//?a=%20b"),
            "http://a.test/dir//?a=%20b"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            " ",
            "http://a.test/",
            "http://a.test/x #y",
            "  http://a.test/x?y=1#z#w ",
            "#",
            "relative/path#frag",
            "\thttp://a.test/ ?q=1 # trailing",
        ];

        for sample in samples {
            let once = normalize_url(sample);
            assert_eq!(normalize_url(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_scope_of_directory_root() {
        assert_eq!(scope_of("http://a.test/app/"), "http://a.test/app/");
    }

    #[test]
    fn test_scope_of_file_root() {
        assert_eq!(scope_of("http://a.test/app/index.php"), "http://a.test/app/");
    }

    #[test]
    fn test_scope_of_query_with_slash() {
        // The last '/' wins, even inside the query string.
        assert_eq!(
            scope_of("http://a.test/app/view?p=a/b"),
            "http://a.test/app/view?p=a/"
        );
    }

    #[test]
    fn test_in_scope() {
        let prefix = scope_of("http://a.test/app/");
        assert!(in_scope("http://a.test/app/sub/", &prefix));
        assert!(in_scope("http://a.test/app/", &prefix));
        assert!(!in_scope("http://a.test/other/x.php", &prefix));
        assert!(!in_scope("http://b.test/app/", &prefix));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_url("http://a.test/app/index.php", "submit.php").as_deref(),
            Some("http://a.test/app/submit.php")
        );
        assert_eq!(
            resolve_url("http://a.test/app/sub/", "../up.php#x").as_deref(),
            Some("http://a.test/app/up.php")
        );
    }

    #[test]
    fn test_resolve_absolute_reference() {
        assert_eq!(
            resolve_url("http://a.test/app/", "https://b.test/z?q=1").as_deref(),
            Some("https://b.test/z?q=1")
        );
    }

    #[test]
    fn test_resolve_invalid_base() {
        assert_eq!(resolve_url("not a url", "x.php"), None);
    }
}
