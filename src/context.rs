//! Loading of the static context file prepended to every completion.
//!
//! The file is newline-delimited JSON: one object per line with an optional
//! `content` string. Loading is all-or-nothing; the first bad line aborts.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ContextError;

/// One line of the context file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextRecord {
    #[serde(default)]
    pub content: Option<String>,
}

impl ContextRecord {
    /// Parse one line. Only JSON objects are records.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(line)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde::de::Error::custom("expected a JSON object")),
        }
    }
}

/// Concatenated context, each record followed by a newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextText(String);

impl ContextText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContextText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read and concatenate every record of the context file at `path`.
pub fn load_context(path: impl AsRef<Path>) -> Result<ContextText, ContextError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|cause| match cause.kind() {
        ErrorKind::NotFound => ContextError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ContextError::Io { cause },
    })?;

    let mut text = String::new();
    let mut records = 0usize;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|cause| ContextError::Io { cause })?;
        if line.trim().is_empty() {
            continue;
        }

        let record = ContextRecord::parse(&line).map_err(|cause| ContextError::Malformed {
            line_number: index + 1,
            raw_line: line.clone(),
            cause,
        })?;

        text.push_str(record.content.as_deref().unwrap_or_default());
        text.push('\n');
        records += 1;
    }

    debug!(path = %path.display(), records, bytes = text.len(), "Loaded context");
    Ok(ContextText(text))
}

/// Whether parsed context is kept between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Re-read the file on every request.
    #[default]
    Disabled,
    /// Reuse the parsed context until the file's modification time changes.
    ModifiedTime,
}

#[derive(Debug)]
struct CachedContext {
    modified: SystemTime,
    text: ContextText,
}

/// The context file a service reads from, with optional caching.
#[derive(Debug)]
pub struct ContextStore {
    path: PathBuf,
    policy: CachePolicy,
    cached: RwLock<Option<CachedContext>>,
}

impl ContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_policy(path, CachePolicy::Disabled)
    }

    pub fn with_policy(path: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Load the context, honouring the cache policy.
    pub fn load(&self) -> Result<ContextText, ContextError> {
        match self.policy {
            CachePolicy::Disabled => load_context(&self.path),
            CachePolicy::ModifiedTime => self.load_cached(),
        }
    }

    fn load_cached(&self) -> Result<ContextText, ContextError> {
        let modified = self.modified_time()?;

        if let Ok(guard) = self.cached.read() {
            if let Some(cached) = guard.as_ref().filter(|c| c.modified == modified) {
                return Ok(cached.text.clone());
            }
        }

        let text = load_context(&self.path)?;
        // A poisoned lock only costs us the cache; the fresh text is still valid.
        if let Ok(mut guard) = self.cached.write() {
            *guard = Some(CachedContext {
                modified,
                text: text.clone(),
            });
        }
        Ok(text)
    }

    fn modified_time(&self) -> Result<SystemTime, ContextError> {
        std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|cause| match cause.kind() {
                ErrorKind::NotFound => ContextError::NotFound {
                    path: self.path.clone(),
                },
                _ => ContextError::Io { cause },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn context_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_concatenates_records_in_order() {
        let file = context_file("{\"content\":\"A\"}\n{\"content\":\"B\"}\n");
        let text = load_context(file.path()).unwrap();
        assert_eq!(text.as_str(), "A\nB\n");
    }

    #[test]
    fn test_missing_content_counts_as_empty() {
        let file = context_file("{\"content\":\"A\"}\n{\"title\":\"x\"}\n{\"content\":null}\n");
        let text = load_context(file.path()).unwrap();
        assert_eq!(text.as_str(), "A\n\n\n");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let file = context_file("\n{\"content\":\"A\"}\n   \n{\"content\":\"B\"}");
        let text = load_context(file.path()).unwrap();
        assert_eq!(text.as_str(), "A\nB\n");
    }

    #[test]
    fn test_empty_file_gives_empty_context() {
        let file = context_file("");
        let text = load_context(file.path()).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_malformed_line_aborts_with_line_number() {
        let file = context_file("{\"content\":\"A\"}\n\nnot json\n{\"content\":\"B\"}\n");
        match load_context(file.path()) {
            Err(ContextError::Malformed {
                line_number,
                raw_line,
                ..
            }) => {
                assert_eq!(line_number, 3);
                assert_eq!(raw_line, "not json");
            }
            other => panic!("Expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_and_non_string_content_are_malformed() {
        let file = context_file("[\"A\"]\n");
        assert!(matches!(
            load_context(file.path()),
            Err(ContextError::Malformed { line_number: 1, .. })
        ));

        let file = context_file("{\"content\":\"A\"}\n{\"content\":7}\n");
        assert!(matches!(
            load_context(file.path()),
            Err(ContextError::Malformed { line_number: 2, .. })
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.jsonl");
        match load_context(&path) {
            Err(ContextError::NotFound { path: reported }) => assert_eq!(reported, path),
            other => panic!("Expected not found error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"content\":\"\xFF\xFE\"}\n").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_context(file.path()),
            Err(ContextError::Io { .. })
        ));
    }

    #[test]
    fn test_store_without_cache_rereads() {
        let file = context_file("{\"content\":\"A\"}\n");
        let store = ContextStore::new(file.path());
        assert_eq!(store.load().unwrap().as_str(), "A\n");

        std::fs::write(file.path(), "{\"content\":\"B\"}\n").unwrap();
        assert_eq!(store.load().unwrap().as_str(), "B\n");
    }

    #[test]
    fn test_store_cache_follows_modified_time() {
        let file = context_file("{\"content\":\"A\"}\n");
        let store = ContextStore::with_policy(file.path(), CachePolicy::ModifiedTime);
        assert_eq!(store.load().unwrap().as_str(), "A\n");

        let original = std::fs::metadata(file.path()).unwrap().modified().unwrap();
        std::fs::write(file.path(), "{\"content\":\"B\"}\n").unwrap();
        // Pin the mtime back so the change is invisible to the cache.
        File::options()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_modified(original)
            .unwrap();
        assert_eq!(store.load().unwrap().as_str(), "A\n");

        File::options()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_modified(original + Duration::from_secs(5))
            .unwrap();
        assert_eq!(store.load().unwrap().as_str(), "B\n");
    }

    #[test]
    fn test_store_cache_keeps_failures_out() {
        let file = context_file("{\"content\":\"A\"}\n");
        let store = ContextStore::with_policy(file.path(), CachePolicy::ModifiedTime);
        assert_eq!(store.load().unwrap().as_str(), "A\n");
        let original = std::fs::metadata(file.path()).unwrap().modified().unwrap();

        std::fs::write(file.path(), "oops\n").unwrap();
        let handle = File::options().write(true).open(file.path()).unwrap();
        handle
            .set_modified(original + Duration::from_secs(5))
            .unwrap();
        assert!(matches!(
            store.load(),
            Err(ContextError::Malformed { line_number: 1, .. })
        ));

        // The earlier good load is still what the original mtime maps to.
        handle.set_modified(original).unwrap();
        assert_eq!(store.load().unwrap().as_str(), "A\n");
    }
}
