//! Store error types
//!
//! Error codes:
//! - MODB_VALIDATION_ERROR (ERROR severity)
//! - MODB_WRITE_FAILED (ERROR severity)
//! - MODB_READ_FAILED (ERROR severity)
//! - MODB_CORRUPT_ENTRY (FATAL severity)
//! - MODB_ENGINE_OPEN_FAILED (FATAL severity)
//!
//! Errors are returned to the immediate caller as-is. Engine failures are
//! kept as the error `source` and never retried here.

use std::error::Error as StdError;
use std::fmt;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// The store can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Store error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Key or payload rejected before anything was written
    Validation,
    /// Engine failed to commit a log entry
    WriteFailed,
    /// Engine failed while scanning
    ReadFailed,
    /// A log entry could not be decoded
    CorruptEntry,
    /// Engine could not be opened or its namespaces created
    EngineOpen,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::Validation => "MODB_VALIDATION_ERROR",
            StoreErrorCode::WriteFailed => "MODB_WRITE_FAILED",
            StoreErrorCode::ReadFailed => "MODB_READ_FAILED",
            StoreErrorCode::CorruptEntry => "MODB_CORRUPT_ENTRY",
            StoreErrorCode::EngineOpen => "MODB_ENGINE_OPEN_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::Validation => Severity::Error,
            StoreErrorCode::WriteFailed => Severity::Error,
            StoreErrorCode::ReadFailed => Severity::Error,
            StoreErrorCode::CorruptEntry => Severity::Fatal,
            StoreErrorCode::EngineOpen => Severity::Fatal,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with code, context and the underlying engine error
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    details: Option<String>,
    source: Option<BoxedSource>,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a validation error (bad key or payload)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Validation, message)
    }

    /// Create a write failure wrapping the engine error
    pub fn write_failed<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Self::new(StoreErrorCode::WriteFailed, message).with_source(source)
    }

    /// Create a read failure wrapping the engine error
    pub fn read_failed<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Self::new(StoreErrorCode::ReadFailed, message).with_source(source)
    }

    /// Create a failure for an operation issued after `close()`
    pub fn closed(code: StoreErrorCode) -> Self {
        Self::new(code, "store is closed")
    }

    /// Create a failure for a store whose engine lock was poisoned by a
    /// panicking thread
    pub fn poisoned(code: StoreErrorCode) -> Self {
        Self::new(code, "engine lock poisoned")
    }

    /// Create a corrupt-entry error naming the offending log key
    pub fn corrupt_entry(log_key: &[u8], reason: impl Into<String>) -> Self {
        let mut err = Self::new(StoreErrorCode::CorruptEntry, reason);
        err.details = Some(format!("log_key: {}", String::from_utf8_lossy(log_key)));
        err
    }

    /// Create an engine open failure
    pub fn engine_open<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Self::new(StoreErrorCode::EngineOpen, message).with_source(source)
    }

    fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        self.source = Some(source.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreErrorCode::Validation.code(), "MODB_VALIDATION_ERROR");
        assert_eq!(StoreErrorCode::WriteFailed.code(), "MODB_WRITE_FAILED");
        assert_eq!(StoreErrorCode::ReadFailed.code(), "MODB_READ_FAILED");
        assert_eq!(StoreErrorCode::CorruptEntry.code(), "MODB_CORRUPT_ENTRY");
        assert_eq!(StoreErrorCode::EngineOpen.code(), "MODB_ENGINE_OPEN_FAILED");
    }

    #[test]
    fn test_corruption_and_open_failures_are_fatal() {
        assert!(StoreError::corrupt_entry(b"log:a:1", "no separator").is_fatal());
        let err = StoreError::engine_open("lock held", io::Error::new(io::ErrorKind::Other, "busy"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_write_failure_keeps_source() {
        let err = StoreError::write_failed(
            "commit failed",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        assert!(!err.is_fatal());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_display_contains_details() {
        let err = StoreError::corrupt_entry(b"log:chilts:01", "value has no separator");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("MODB_CORRUPT_ENTRY"));
        assert!(display.contains("log_key: log:chilts:01"));
    }
}
