//! Sources map URIs to raw JSON documents.
//!
//! A [`Source`] is registered in a catalog under a base URI prefix; the
//! catalog hands it the path remainder. The engine performs source I/O only
//! during compilation, never during evaluation.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::SourceError;

/// A resolver from a relative path to a raw JSON document.
pub trait Source: Send + Sync {
    fn load(&self, relative_path: &str) -> Result<Value, SourceError>;
}

/// Loads schemas from a directory tree, optionally appending a suffix
/// (typically `.json`) to the relative path.
pub struct LocalSource {
    base_dir: PathBuf,
    suffix: Option<String>,
}

impl LocalSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            suffix: None,
        }
    }

    pub fn with_suffix(base_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            suffix: Some(suffix.into()),
        }
    }
}

impl Source for LocalSource {
    fn load(&self, relative_path: &str) -> Result<Value, SourceError> {
        let mut filepath = self.base_dir.join(relative_path);
        if let Some(suffix) = &self.suffix {
            let mut name = filepath.into_os_string();
            name.push(suffix);
            filepath = PathBuf::from(name);
        }
        let location = filepath.display().to_string();
        tracing::trace!(path = %location, "loading schema from local source");

        let text = std::fs::read_to_string(&filepath).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound { location: location.clone() }
            } else {
                SourceError::Read {
                    location: location.clone(),
                    reason: e.to_string(),
                }
            }
        })?;
        serde_json::from_str(&text).map_err(|e| SourceError::Parse {
            location,
            reason: e.to_string(),
        })
    }
}

/// Loads schemas over HTTP with a blocking client.
#[cfg(feature = "remote")]
pub struct RemoteSource {
    base_url: crate::uri::Uri,
    suffix: Option<String>,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl RemoteSource {
    pub fn new(base_url: crate::uri::Uri) -> Self {
        Self {
            base_url,
            suffix: None,
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_suffix(base_url: crate::uri::Uri, suffix: impl Into<String>) -> Self {
        Self {
            suffix: Some(suffix.into()),
            ..Self::new(base_url)
        }
    }
}

#[cfg(feature = "remote")]
impl Source for RemoteSource {
    fn load(&self, relative_path: &str) -> Result<Value, SourceError> {
        let resolved = self
            .base_url
            .resolve(relative_path)
            .map_err(|e| SourceError::Read {
                location: relative_path.to_string(),
                reason: e.to_string(),
            })?;
        let mut url = resolved.to_string();
        if let Some(suffix) = &self.suffix {
            url.push_str(suffix);
        }
        tracing::debug!(%url, "fetching schema from remote source");

        let response = self.client.get(&url).send().map_err(|e| SourceError::Read {
            location: url.clone(),
            reason: e.to_string(),
        })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound { location: url });
        }
        let response = response.error_for_status().map_err(|e| SourceError::Read {
            location: url.clone(),
            reason: e.to_string(),
        })?;
        let text = response.text().map_err(|e| SourceError::Read {
            location: url.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| SourceError::Parse {
            location: url,
            reason: e.to_string(),
        })
    }
}

/// Compile-time bundled documents (the shipped metaschemas).
pub(crate) struct EmbeddedSource {
    pub(crate) files: &'static [(&'static str, &'static str)],
}

impl Source for EmbeddedSource {
    fn load(&self, relative_path: &str) -> Result<Value, SourceError> {
        let text = self
            .files
            .iter()
            .find(|(path, _)| *path == relative_path)
            .map(|(_, text)| *text)
            .ok_or_else(|| SourceError::NotFound {
                location: relative_path.to_string(),
            })?;
        serde_json::from_str(text).map_err(|e| SourceError::Parse {
            location: relative_path.to_string(),
            reason: e.to_string(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_local_source_loads_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut f = std::fs::File::create(dir.path().join("tree.json")).unwrap();
        write!(f, "{}", json!({"type": "object"})).unwrap();

        let source = LocalSource::with_suffix(dir.path(), ".json");
        let loaded = source.load("tree").unwrap();
        assert_eq!(loaded, json!({"type": "object"}));
    }

    #[test]
    fn test_local_source_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = LocalSource::new(dir.path());
        assert!(matches!(
            source.load("missing.json"),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_local_source_invalid_json() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let source = LocalSource::new(dir.path());
        assert!(matches!(
            source.load("bad.json"),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn test_embedded_source() {
        let source = EmbeddedSource {
            files: &[("schema", r#"{"type": "object"}"#)],
        };
        assert_eq!(source.load("schema").unwrap(), json!({"type": "object"}));
        assert!(matches!(
            source.load("other"),
            Err(SourceError::NotFound { .. })
        ));
    }
}
