//! rulesync engine
//!
//! Keeps each scope's rule list and flattened string consistent while either
//! side is edited independently.
//!
//! # Architecture
//!
//! ```text
//! change event ─► SyncEngine ─┬─► repair + regenerate (rule list changed)
//!                             └─► Reconciler           (flattened string changed)
//!                                    │
//!                        ScopeStore ◄┘  Prompter (decisions, messages)
//! ```
//!
//! - [`ScopeStore`]: per-scope storage of both items
//! - [`Prompter`]: input, pick lists, confirmations and messages
//! - [`Reconciler`]: divergence detection, pull / push resolution
//! - [`SyncEngine`]: event routing, regeneration, initial import
//! - [`CommandLayer`]: add / edit / delete / view / force-sync
//!
//! # Example
//!
//! ```rust
//! use rulesync_engine::prelude::*;
//! use rulesync_engine::store::MemoryStore;
//! use std::sync::Arc;
//!
//! struct Silent;
//!
//! #[async_trait::async_trait]
//! impl Prompter for Silent {
//!     async fn input(&self, _: InputRequest) -> Option<String> { None }
//!     async fn pick(&self, _: &str, _: &[Choice]) -> Option<usize> { None }
//!     async fn confirm(&self, _: &str) -> bool { false }
//!     fn notify(&self, _: Severity, _: &str) {}
//! }
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = SyncEngine::new(store, Arc::new(Silent), SyncConfig::default());
//! assert_eq!(engine.available_scopes(), vec![Scope::Global]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod access;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod observer;
pub mod prompt;
pub mod reconcile;
pub mod store;

// Re-exports
pub use commands::{Command, CommandLayer, CommandOutcome, RuleView};
pub use config::{Resolution, SyncConfig, Watched};
pub use engine::{ChangeEvent, EventOutcome, ImportOutcome, SyncEngine, SyncReport};
pub use error::{StoreError, SyncError, SyncResult};
pub use observer::{Observers, RefreshObserver};
pub use prompt::{Choice, InputRequest, Prompter, Severity};
pub use reconcile::{Divergence, ReconcileOutcome, Reconciler};
pub use store::{MemoryStore, ScopeStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosting the engine
    pub use crate::commands::{Command, CommandLayer, CommandOutcome};
    pub use crate::config::{Resolution, SyncConfig};
    pub use crate::engine::{ChangeEvent, EventOutcome, SyncEngine};
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::prompt::{Choice, InputRequest, Prompter, Severity};
    pub use crate::store::ScopeStore;
    pub use rulesync_core::{Rule, Scope};
}
