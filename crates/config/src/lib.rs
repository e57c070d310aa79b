//! Configuration loading, validation, and management for TicketWise.
//!
//! Configuration is layered: a **base** document, then an optional
//! **environment** overlay, then an optional **region** overlay, deep-merged
//! in that order. Overlays may only override keys the base schema already
//! declares. Every numeric threshold is checked against declared validation
//! bounds before a snapshot is installed.
//!
//! A reload is all-or-nothing: any read, parse, merge, or bounds failure
//! leaves the previously installed snapshot active.

pub mod manager;
pub mod model;
pub mod overlay;

pub use manager::{ConfigManager, LayeredPaths};
pub use model::{
    ConfigSnapshot, FeatureFlags, LlmConfig, RoutingDefaults, SlaConfig, Thresholds,
};
pub use overlay::merge_layers;

use std::path::PathBuf;

/// Configuration errors.
///
/// These never escalate into a crash: the manager logs them and keeps the
/// prior snapshot active.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Overlay introduces unknown key: {path}")]
    UnknownKey { path: String },

    #[error("Overlay value for {path} has the wrong shape (table vs value)")]
    ShapeMismatch { path: String },

    #[error("{key} = {value} is outside its validation bounds [{min}, {max}]")]
    OutOfBounds {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
