//! Bounded capture of request query parameters.
//!
//! Each decoded name and value is cut to `each_limit` characters. Once the
//! accumulated string grows past `total_limit`, the marker `...` is
//! appended and capture stops.

use std::collections::HashSet;

pub const DEFAULT_EACH_LIMIT: usize = 64;
pub const DEFAULT_TOTAL_LIMIT: usize = 512;
pub const TRUNCATION_MARKER: &str = "...";

/// Render query parameters as `k=v&k=v`, bounded.
///
/// Keys appear in first-appearance order; a repeated key keeps its first
/// value.
pub fn request_parameters(query: Option<&str>, each_limit: usize, total_limit: usize) -> String {
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return String::new(),
    };

    let mut params = String::with_capacity(64);
    let mut length = 0usize;
    let mut seen = HashSet::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if !seen.insert(key.clone()) {
            continue;
        }
        if length != 0 {
            params.push('&');
            length += 1;
        }
        if length > total_limit {
            params.push_str(TRUNCATION_MARKER);
            return params;
        }
        length += push_truncated(&mut params, &key, each_limit);
        params.push('=');
        length += 1;
        length += push_truncated(&mut params, &value, each_limit);
    }
    params
}

/// Append at most `limit` characters of `s`, returning how many were added.
fn push_truncated(out: &mut String, s: &str, limit: usize) -> usize {
    match s.char_indices().nth(limit) {
        Some((end, _)) => {
            out.push_str(&s[..end]);
            limit
        }
        None => {
            out.push_str(s);
            s.chars().count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_query() {
        assert_eq!(
            request_parameters(Some("a=1&b=two%20words&c"), 64, 512),
            "a=1&b=two words&c="
        );
        assert_eq!(request_parameters(None, 64, 512), "");
        assert_eq!(request_parameters(Some(""), 64, 512), "");
    }

    #[test]
    fn test_repeated_key_keeps_first() {
        assert_eq!(request_parameters(Some("a=1&b=2&a=3"), 64, 512), "a=1&b=2");
    }

    #[test]
    fn test_each_limit() {
        let name = "n".repeat(100);
        let query = format!("{}=v", name);

        let params = request_parameters(Some(&query), 64, 512);
        assert_eq!(params, format!("{}=v", "n".repeat(64)));
    }

    #[test]
    fn test_each_limit_counts_characters() {
        let params = request_parameters(Some("k=%C3%A9%C3%A9%C3%A9"), 2, 512);
        assert_eq!(params, "k=éé");
    }

    #[test]
    fn test_total_limit() {
        let query: Vec<String> = (0..40).map(|i| format!("key{:02}={}", i, "v".repeat(20))).collect();
        let query = query.join("&");

        let params = request_parameters(Some(&query), 64, 512);
        assert!(params.ends_with("&..."));
        assert_eq!(params.matches(TRUNCATION_MARKER).count(), 1);

        // 26 chars per parameter plus a separator: the cap trips after 19
        let kept = params.trim_end_matches("&...").split('&').count();
        assert_eq!(kept, 19);
        assert!(params.contains("key18="));
        assert!(!params.contains("key19="));
    }
}
