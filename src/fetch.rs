//! Fetch collaborator abstraction.
//!
//! The poll schedulers never talk to a remote service directly. They call a
//! [`Fetcher`], which returns an arbitrary decoded value - a single record,
//! a record collection, or a nested analyzer-style structure - or nothing.
//! Timeout enforcement belongs inside the fetcher, not the scheduler.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde_json::Value;

use crate::retry::ErrorClass;

/// Error produced by a failed fetch.
///
/// Carries an optional retry-after hint supplied by the collaborator for
/// rate-limited responses. None of the bundled fetchers populate the hint;
/// the scheduler falls back to doubling the base interval.
#[derive(Debug, Clone)]
pub struct FetchError {
    message: String,
    retry_after: Option<Duration>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Attach a retry-after hint for rate-limited errors.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Classify this error for retry handling.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::classify(&self.message)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// Trait for executing one query attempt against a data backend.
///
/// Implementations should be cheap to call repeatedly: the schedulers invoke
/// `fetch` once per poll cycle with at most one call outstanding at a time.
///
/// # Example
///
/// ```
/// use querywatch::{Fetcher, FileFetcher};
///
/// let mut fetcher = FileFetcher::new("results.json");
/// let _ = fetcher.fetch();
/// ```
pub trait Fetcher: Send {
    /// Execute one fetch attempt.
    ///
    /// Returns `Ok(Some(value))` with the decoded response, `Ok(None)` for
    /// an empty result, or a [`FetchError`] for the scheduler to classify.
    fn fetch(&mut self) -> Result<Option<Value>, FetchError>;

    /// Human-readable description of the backend, for status display.
    fn description(&self) -> &str;
}

/// A fetcher that re-reads a JSON file on every poll.
///
/// Useful for tailing files written by another process, and for demos.
#[derive(Debug)]
pub struct FileFetcher {
    path: PathBuf,
    description: String,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&mut self) -> Result<Option<Value>, FetchError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| FetchError::new(format!("read {}: {}", self.path.display(), e)))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&content)
            .map_err(|e| FetchError::new(format!("parse {}: {}", self.path.display(), e)))?;
        Ok(Some(value))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// A fetcher that runs a shell command and decodes its stdout as JSON.
///
/// The command is executed synchronously; any timeout discipline belongs in
/// the command itself (e.g. `curl --max-time`).
#[derive(Debug)]
pub struct CommandFetcher {
    command: String,
    description: String,
}

impl CommandFetcher {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let description = format!("exec: {}", command);
        Self {
            command,
            description,
        }
    }
}

impl Fetcher for CommandFetcher {
    fn fetch(&mut self) -> Result<Option<Value>, FetchError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .map_err(|e| FetchError::new(format!("spawn {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::new(format!(
                "command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(stdout.trim())
            .map_err(|e| FetchError::new(format!("parse command output: {}", e)))?;
        Ok(Some(value))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_fetcher_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"cpu": [1, 2, 3]}}"#).unwrap();

        let mut fetcher = FileFetcher::new(file.path());
        let value = fetcher.fetch().unwrap().unwrap();
        assert!(value.get("cpu").is_some());
    }

    #[test]
    fn test_file_fetcher_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut fetcher = FileFetcher::new(file.path());
        assert!(fetcher.fetch().unwrap().is_none());
    }

    #[test]
    fn test_file_fetcher_missing_file() {
        let mut fetcher = FileFetcher::new("/nonexistent/results.json");
        let err = fetcher.fetch().unwrap_err();
        assert!(err.message().contains("read"));
    }

    #[test]
    fn test_retry_after_hint() {
        let err = FetchError::new("rate limit").with_retry_after(Duration::from_secs(5));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_fetch_error_without_hint() {
        let err = FetchError::new("timeout");
        assert!(err.retry_after().is_none());
    }
}
