//! Structural validation boundary.
//!
//! XML-Schema validation itself lives outside this engine; it is consumed
//! as a pass/fail check with a list of violations. Any compliant validator
//! can be plugged in through [`StructuralValidator`].

use curator_xml::XmlDocument;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::{fs, io};

/// One structural violation: an optional source line plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    pub line: Option<usize>,
    pub message: String,
}

impl ValidationMessage {
    pub fn new(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A structural (schema file) validator.
///
/// Implementations return every violation at once so the submitter sees
/// the full list rather than one failure at a time.
pub trait StructuralValidator {
    fn validate(
        &self,
        doc: &XmlDocument,
        schema_type: &str,
    ) -> std::result::Result<(), Vec<ValidationMessage>>;
}

/// Validator that accepts every document.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopValidator;

impl StructuralValidator for NoopValidator {
    fn validate(
        &self,
        _doc: &XmlDocument,
        _schema_type: &str,
    ) -> std::result::Result<(), Vec<ValidationMessage>> {
        Ok(())
    }
}

impl<F> StructuralValidator for F
where
    F: Fn(&XmlDocument, &str) -> std::result::Result<(), Vec<ValidationMessage>>,
{
    fn validate(
        &self,
        doc: &XmlDocument,
        schema_type: &str,
    ) -> std::result::Result<(), Vec<ValidationMessage>> {
        self(doc, schema_type)
    }
}

/// Cache of loaded schema files, keyed by resolved path.
///
/// Populated lazily and idempotently: a racing second load re-reads the
/// file but both callers observe one cached entry afterwards. Concurrent
/// submissions share the [`schema_cache`] instance; it is never torn down
/// mid-run.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<PathBuf, Arc<str>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a schema file, reusing the cached content when present.
    pub fn load(&self, path: &Path) -> io::Result<Arc<str>> {
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(hit.clone());
        }

        let content: Arc<str> = fs::read_to_string(path)?.into();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .entry(path.to_path_buf())
            .or_insert(content)
            .clone())
    }

    /// Number of cached schema files.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The process-wide schema cache.
pub fn schema_cache() -> &'static SchemaCache {
    static CACHE: Lazy<SchemaCache> = Lazy::new(SchemaCache::new);
    &CACHE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cache_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.xsd");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "<xs:schema/>").unwrap();

        let cache = SchemaCache::new();
        let first = cache.load(&path).unwrap();
        assert_eq!(&*first, "<xs:schema/>");
        assert_eq!(cache.len(), 1);

        // A change on disk is not observed; the cache entry wins.
        fs::write(&path, "<xs:schema version=\"2\"/>").unwrap();
        let second = cache.load(&path).unwrap();
        assert_eq!(&*second, "<xs:schema/>");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_missing_file() {
        let cache = SchemaCache::new();
        assert!(cache.load(Path::new("/nonexistent/study.xsd")).is_err());
    }

    #[test]
    fn test_validation_message_display() {
        let with_line = ValidationMessage::new(Some(12), "missing TITLE");
        assert_eq!(with_line.to_string(), "line 12: missing TITLE");

        let without = ValidationMessage::new(None, "missing TITLE");
        assert_eq!(without.to_string(), "missing TITLE");
    }
}
