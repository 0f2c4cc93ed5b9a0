//! Error types for rulesync core
//!
//! Only user-supplied data can be rejected here. Malformed stored data is
//! never an error at this layer; it is repaired instead.

/// Rejection of a user-supplied key or value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Key is empty after trimming
    #[error("rule key must not be empty")]
    EmptyKey,

    /// Key contains a colon, which would split differently when parsed back
    #[error("rule key '{0}' must not contain ':'")]
    KeyContainsColon(String),

    /// Key spans several lines
    #[error("rule key '{0}' must fit on a single line")]
    KeyContainsNewline(String),

    /// Key already used by another rule of the same scope
    #[error("a rule with key '{0}' already exists")]
    DuplicateKey(String),

    /// Value contains the entry separator and would be split in two
    #[error("value for '{key}' must not contain four consecutive newlines")]
    ValueContainsSeparator {
        /// Key the value belongs to
        key: String,
    },
}
