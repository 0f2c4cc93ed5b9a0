//! Error types for the sync engine
//!
//! Provides error handling for:
//! - Store access (read/write of either side, per scope)
//! - User input and scope availability
//! - Rule lookup for edit/delete

use rulesync_core::{InputError, Scope};
use std::path::PathBuf;

/// Failures of the persistent store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Workspace scope addressed while no workspace is open
    #[error("no workspace is open")]
    WorkspaceUnavailable,

    /// IO error on the backing file
    #[error("io error at {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing document could not be decoded or encoded
    #[error("malformed settings at {path}: {source}")]
    Malformed {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Store-specific failure
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create decoding error for path
    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// User-supplied key or value rejected
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    /// Scope cannot be addressed right now
    #[error("{0} scope is not available: no workspace is open")]
    ScopeUnavailable(Scope),

    /// No rule with this id in the scope
    #[error("rule #{id} not found in {scope} scope")]
    RuleNotFound {
        /// Scope searched
        scope: Scope,
        /// Id looked up
        id: i64,
    },

    /// Store read or write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether the error stems from the request rather than the environment
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::ScopeUnavailable(_) | Self::RuleNotFound { .. }
        )
    }

    /// Whether the error was already reported where it happened
    ///
    /// Store failures are surfaced at the failing call.
    #[inline]
    #[must_use]
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result type alias for engine operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_unavailable_display() {
        let err = SyncError::ScopeUnavailable(Scope::Workspace);
        assert_eq!(
            err.to_string(),
            "workspace scope is not available: no workspace is open"
        );
    }

    #[test]
    fn error_classification() {
        assert!(SyncError::from(InputError::EmptyKey).is_user_error());
        assert!(SyncError::RuleNotFound {
            scope: Scope::Global,
            id: 3
        }
        .is_user_error());

        let store = SyncError::from(StoreError::Backend("disk full".to_string()));
        assert!(!store.is_user_error());
        assert!(store.is_reported());
    }

    #[test]
    fn io_error_mentions_path() {
        let err = StoreError::io_error(
            "/tmp/settings.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/settings.json"));
    }
}
