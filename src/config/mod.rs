//! Configuration module for remotekit.
//!
//! This module wires together the data models, the built-in named actions and the
//! loading/validation helpers. Import from here for a convenient, stable API.
//!
//! Example:
//! use remotekit::config::{RemoteConfig, load_from_path};
//!
//! let cfg = load_from_path("config/remote.json")?;

pub mod defaults;
pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{
    ActionDescriptor, ActionKind, ActionSet, ActionSlot, Confirmation, ConfirmationPrompt,
    ElementConfig, ElementKind, Exemption, KeyEntry, KeyTable, Millis, RemoteConfig,
    SourceConfig, TouchpadConfig,
};

// Re-export loader utilities
pub use loader::{
    generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    validate_config, write_schema_to_writer,
};
