//! URL exclusion filtering.
//!
//! # Responsibilities
//! - Decide whether a request path is excluded from tracing
//!
//! # Design Decisions
//! - Patterns are comma-separated; surrounding whitespace is ignored
//! - Ant-style segments: `*` and `?` match within one segment, `**` spans
//!   zero or more segments (`/static/**` also matches `/static`)
//! - Path matching is case-sensitive
//! - No regex on the hot path

use std::fmt::Debug;

/// Returns true when a path must NOT be traced.
pub trait UrlFilter: Send + Sync + Debug {
    fn filter(&self, path: &str) -> bool;
}

/// Never excludes anything.
#[derive(Debug, Clone, Default)]
pub struct SkipFilter;

impl UrlFilter for SkipFilter {
    fn filter(&self, _path: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    AnyDepth,
    Glob(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .map(|s| match s {
                "**" => Segment::AnyDepth,
                other => Segment::Glob(other.to_string()),
            })
            .collect();
        Self { segments }
    }

    fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').collect();
        match_segments(&self.segments, &parts)
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::Glob(glob), rest)) => match path.split_first() {
            Some((part, tail)) => match_glob(glob, part) && match_segments(rest, tail),
            None => false,
        },
    }
}

/// `*` matches any run of characters, `?` exactly one.
fn match_glob(glob: &str, text: &str) -> bool {
    let glob: Vec<char> = glob.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match glob.get(g) {
            Some(&'*') => {
                backtrack = Some((g, t));
                g += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                g += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    g = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }
    glob[g..].iter().all(|&c| c == '*')
}

/// Excludes paths matching any configured pattern.
#[derive(Debug, Clone)]
pub struct ExcludePathFilter {
    patterns: Vec<PathPattern>,
}

impl ExcludePathFilter {
    pub fn new(patterns: &str) -> Self {
        Self {
            patterns: patterns
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathPattern::parse)
                .collect(),
        }
    }
}

impl UrlFilter for ExcludePathFilter {
    fn filter(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Filter for the configured `exclude_url` value. Empty → [`SkipFilter`].
pub fn from_config(exclude_url: &str) -> Box<dyn UrlFilter> {
    if exclude_url.trim().is_empty() {
        Box::new(SkipFilter)
    } else {
        Box::new(ExcludePathFilter::new(exclude_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_prefix() {
        let filter = ExcludePathFilter::new("/health, /static/**,/internal*");

        assert!(filter.filter("/health"));
        assert!(!filter.filter("/health/deep"));
        assert!(filter.filter("/static"));
        assert!(filter.filter("/static/app.js"));
        assert!(!filter.filter("/staticfiles"));
        assert!(filter.filter("/internal-metrics"));
        assert!(!filter.filter("/HEALTH"));
        assert!(!filter.filter("/orders"));
    }

    #[test]
    fn test_single_segment_wildcards() {
        let filter = ExcludePathFilter::new("/api/*/health,/assets/*,/v?/ping");

        assert!(filter.filter("/api/v1/health"));
        assert!(!filter.filter("/api/v1/x/health"));
        assert!(!filter.filter("/api/health"));
        assert!(filter.filter("/assets/app.js"));
        assert!(!filter.filter("/assets/js/app.js"));
        assert!(filter.filter("/v1/ping"));
        assert!(!filter.filter("/v10/ping"));
    }

    #[test]
    fn test_any_depth_in_the_middle() {
        let filter = ExcludePathFilter::new("/api/**/health, /**/*.css");

        assert!(filter.filter("/api/health"));
        assert!(filter.filter("/api/a/b/health"));
        assert!(!filter.filter("/api/a/b/healthz"));
        assert!(filter.filter("/theme/dark/site.css"));
        assert!(!filter.filter("/theme/site.js"));
    }

    #[test]
    fn test_from_config() {
        assert!(!from_config("").filter("/anything"));
        assert!(!from_config(" , ").filter("/anything"));
        assert!(from_config("/a").filter("/a"));
    }
}
