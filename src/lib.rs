#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! remotekit: gesture recognition and action dispatch for virtual remote-control surfaces.
//!
//! Pointer events on remote elements (buttons, touchpads) are turned into gestures by
//! clock-free recognizers, resolved to configured actions and dispatched to a host.
//! Modules:
//! - `config`: Configuration models, built-in key tables, loader and schema helpers.
//! - `gesture`: Button and touchpad recognizers plus their timer bookkeeping.
//! - `executor`: Action resolution, confirmation, dispatch, elements and the tokio runtime.
//! - `host`: Collaborator traits (command surface, states, prompts, haptics) and console implementations.
//! - `sources`: Input sources (stdin, replay files) and the configuration watcher.
//! - `tracker`: Values displayed by elements, derived from entity state.
//! - `utils`: The default template evaluator.
//!
//! Use `remotekit::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (models, loader, schema helpers).
pub mod config;
/// Public module: execution engine (resolver, dispatcher, elements, runtime).
pub mod executor;
/// Public module: gesture recognizers.
pub mod gesture;
/// Public module: host collaborators.
pub mod host;
/// Public module: input sources (stdin, replay, config watcher).
pub mod sources;
pub mod tracker;
/// Public module: utilities (interpolation).
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a plain level name (trace|debug|info|warn|error).
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - `level` wins when given; otherwise `RUST_LOG` is read as a plain level.
/// - Falls back to `info` level.
///
/// Logs go to stderr so stdout stays free for NDJSON commands.
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::fmt;

    let level = level
        .and_then(parse_level)
        .or_else(|| std::env::var("RUST_LOG").ok().as_deref().and_then(parse_level))
        .unwrap_or(tracing::Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use remotekit::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;
    pub use tokio::time::sleep;

    pub use crate as remotekit;
    pub use crate::config::RemoteConfig;
    pub use crate::executor::{DispatchError, Input, Runtime};
    pub use crate::gesture::{PointerEvent, Recognizer};
    pub use crate::host::Host;

    // Frequently used internal modules
    pub use crate::{config, executor, gesture, host, sources, tracker, utils};
}
