//! rulesync command line host
//!
//! Hosts the sync engine on plain files:
//!
//! - [`settings`]: JSON settings files as the scope store
//! - [`config`]: TOML engine configuration
//! - [`terminal`]: stdin/stderr prompts
//! - [`watch`]: file watching that feeds change events to the engine

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod settings;
pub mod terminal;
pub mod watch;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "rulesync=info";

/// Install the global tracing subscriber, logging to stderr
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
