//! Shell-style file name patterns.

use crate::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};

/// A glob matched against base names, such as `70-snap.foo.*rules`.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    matcher: GlobMatcher,
}

impl Pattern {
    /// Patterns apply to base names only and must not contain `/`.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() || raw.contains('/') {
            return Err(Error::InvalidPattern {
                pattern: raw,
                reason: "must be a non-empty base name".into(),
            });
        }
        let matcher = GlobBuilder::new(&raw)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: raw.clone(),
                reason: e.kind().to_string(),
            })?
            .compile_matcher();
        Ok(Self { raw, matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        let p = Pattern::new("70-snap.foo.rules").unwrap();
        assert!(p.matches("70-snap.foo.rules"));
        assert!(!p.matches("70-snap.foo.rules~"));
    }

    #[test]
    fn test_star() {
        let p = Pattern::new("70-snap.foo.*rules").unwrap();
        assert!(p.matches("70-snap.foo.rules"));
        assert!(p.matches("70-snap.foo.hook.configure.rules"));
        assert!(!p.matches("70-snap.foobar.rules"));
        assert!(!p.matches("70-snap.foo.rules.bak"));
        assert!(!p.matches(".tmpA1b2"));
    }

    #[test]
    fn test_multiple_stars() {
        let p = Pattern::new("a*b*c").unwrap();
        assert!(p.matches("abc"));
        assert!(p.matches("axxbyyc"));
        assert!(!p.matches("acb"));
    }

    #[test]
    fn test_invalid() {
        assert!(Pattern::new("").is_err());
        assert!(Pattern::new("dir/*.rules").is_err());

        let err = Pattern::new("70-snap.[foo.rules").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "70-snap.[foo.rules"));
    }
}
