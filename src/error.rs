use std::path::PathBuf;

use thiserror::Error;

/// Main error type for kgextract
#[derive(Error, Debug)]
pub enum KgError {
    /// Source file missing/unreadable or sink not writable
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line that does not parse into the schema's column count
    #[error("Malformed line {line} in {}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External cancellation observed between chunks
    #[error("Cancelled during {stage}")]
    Cancelled { stage: String },

    /// In-memory deduplication refused to grow past its guard
    #[error("Deduplication limit exceeded: more than {limit} rows collected")]
    DedupLimit { limit: usize },

    /// Run report serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KgError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KgError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, KgError::Cancelled { .. })
    }
}

/// Convenient Result type using KgError
pub type Result<T> = std::result::Result<T, KgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KgError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_malformed_display_carries_line_and_path() {
        let err = KgError::Malformed {
            path: PathBuf::from("MRREL.RRF"),
            line: 42,
            reason: "expected 16 fields, found 17".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("MRREL.RRF"));
        assert!(msg.contains("expected 16 fields"));
    }

    #[test]
    fn test_io_helper_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = KgError::io("/data/MRSTY.RRF", io_err);
        assert!(matches!(err, KgError::Io { .. }));
        assert!(err.to_string().contains("/data/MRSTY.RRF"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: KgError = json_err.into();
        assert!(matches!(err, KgError::Serialization(_)));
    }
}
