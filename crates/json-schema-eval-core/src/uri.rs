//! Absolute URI wrapper over [`url::Url`].
//!
//! Schema identifiers are always absolute once compiled; relative references
//! (`$ref` values, relative `$id`s) are kept as plain strings until they are
//! resolved against a base with [`Uri::resolve`]. Fragment-only references
//! are special-cased so they also work against non-hierarchical bases such
//! as the auto-generated `urn:uuid:` identifiers.

use std::fmt;

use url::Url;

use crate::error::UriError;

/// A normalized absolute URI, optionally carrying a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    url: Url,
}

impl Uri {
    /// Parse an absolute URI.
    ///
    /// Returns [`UriError::NotAbsolute`] for relative references; resolve
    /// those against a base with [`Uri::resolve`] instead.
    pub fn parse(value: &str) -> Result<Self, UriError> {
        match Url::parse(value) {
            Ok(url) => Ok(Self { url }),
            Err(url::ParseError::RelativeUrlWithoutBase) => Err(UriError::NotAbsolute {
                value: value.to_string(),
            }),
            Err(e) => Err(UriError::Malformed {
                value: value.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Resolve a URI reference against `self` as the base (RFC 3986 §5).
    pub fn resolve(&self, reference: &str) -> Result<Self, UriError> {
        // Fragment-only references must work against cannot-be-a-base URIs
        // (urn:uuid:...), which Url::join rejects.
        if let Some(fragment) = reference.strip_prefix('#') {
            let mut url = self.url.clone();
            url.set_fragment(if fragment.is_empty() {
                None
            } else {
                Some(fragment)
            });
            return Ok(Self { url });
        }
        if reference.is_empty() {
            return Ok(self.strip_fragment());
        }
        match Url::parse(reference) {
            Ok(url) => Ok(Self { url }),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.url.join(reference).map(|url| Self { url }).map_err(|_| {
                    UriError::NotResolvable {
                        reference: reference.to_string(),
                        base: self.to_string(),
                    }
                })
            }
            Err(e) => Err(UriError::Malformed {
                value: reference.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// A copy of this URI without its fragment.
    pub fn strip_fragment(&self) -> Self {
        let mut url = self.url.clone();
        url.set_fragment(None);
        Self { url }
    }

    /// A copy of this URI with the given fragment (raw, already escaped).
    pub fn with_fragment(&self, fragment: Option<&str>) -> Self {
        let mut url = self.url.clone();
        url.set_fragment(fragment);
        Self { url }
    }

    /// The raw (escaped) fragment, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    pub fn has_fragment(&self) -> bool {
        self.url.fragment().is_some()
    }

    /// Generate a unique `urn:uuid:` URI for an anonymous schema resource.
    pub fn random_urn() -> Self {
        let url = Url::parse(&format!("urn:uuid:{}", uuid::Uuid::new_v4()))
            .expect("a urn:uuid URI is always valid");
        Self { url }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let uri = Uri::parse("https://example.com/schemas/tree").unwrap();
        assert_eq!(uri.as_str(), "https://example.com/schemas/tree");
        assert!(!uri.has_fragment());
    }

    #[test]
    fn test_parse_relative_rejected() {
        assert!(matches!(
            Uri::parse("schemas/tree"),
            Err(UriError::NotAbsolute { .. })
        ));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = Uri::parse("https://example.com/root.json").unwrap();
        let resolved = base.resolve("nested.json").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/nested.json");
    }

    #[test]
    fn test_resolve_fragment_only() {
        let base = Uri::parse("https://example.com/root.json").unwrap();
        let resolved = base.resolve("#/$defs/a").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/root.json#/$defs/a");
    }

    #[test]
    fn test_resolve_fragment_against_urn() {
        let base = Uri::random_urn();
        let resolved = base.resolve("#anchor").unwrap();
        assert_eq!(resolved.fragment(), Some("anchor"));
        assert_eq!(resolved.strip_fragment(), base);
    }

    #[test]
    fn test_resolve_absolute_reference_ignores_base() {
        let base = Uri::parse("https://example.com/root.json").unwrap();
        let resolved = base.resolve("https://other.org/s.json").unwrap();
        assert_eq!(resolved.as_str(), "https://other.org/s.json");
    }

    #[test]
    fn test_relative_path_against_urn_fails() {
        let base = Uri::random_urn();
        assert!(matches!(
            base.resolve("other.json"),
            Err(UriError::NotResolvable { .. })
        ));
    }

    #[test]
    fn test_strip_and_with_fragment() {
        let uri = Uri::parse("https://example.com/s#frag").unwrap();
        assert_eq!(uri.fragment(), Some("frag"));
        let stripped = uri.strip_fragment();
        assert!(!stripped.has_fragment());
        let refragmented = stripped.with_fragment(Some("other"));
        assert_eq!(refragmented.fragment(), Some("other"));
    }

    #[test]
    fn test_random_urns_are_unique() {
        assert_ne!(Uri::random_urn(), Uri::random_urn());
    }
}
