//! rulesync core
//!
//! Pure building blocks for keeping an ordered rule list and its flattened
//! `key: value` export consistent. Nothing in this crate performs I/O.
//!
//! # Core Concepts
//!
//! - [`Rule`] and [`Scope`]: the structured side, one ordered list per scope
//! - [`codec`]: parse/build of the flattened string
//! - [`repair`]: unique-id assignment and duplicate-key renaming
//! - [`validation`]: checks applied to user-supplied keys and values
//!
//! # Example
//!
//! ```rust
//! use rulesync_core::{codec, repair, Rule};
//!
//! let rules = vec![Rule::new(1, "x"), Rule::new(2, "x")];
//! let repaired = repair::repair(&rules);
//! assert!(repaired.changed);
//! assert_eq!(repaired.rules[1].key, "x_duplicate_1");
//!
//! let parsed = codec::parse("x: first");
//! assert_eq!(parsed.value_of("x"), Some("first"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod codec;
pub mod error;
pub mod repair;
pub mod rule;
pub mod validation;

// Re-exports
pub use codec::{build, parse, Entry, Parsed, SEPARATOR};
pub use error::InputError;
pub use repair::{allocate_id, renumber, repair, KeyRename, KeyRenames, Repaired};
pub use rule::{next_id, Rule, Scope};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with rule sets
    pub use crate::codec::{build, parse, Entry, Parsed};
    pub use crate::error::InputError;
    pub use crate::repair::{repair, KeyRenames, Repaired};
    pub use crate::rule::{Rule, Scope};
}
