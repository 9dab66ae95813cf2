//! Error types for Insight Hunter.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the key-value / relational backend.
///
/// None of these is normal control flow ("no such step" and "cache miss" are
/// ordinary `Option` returns), and none of the detail reaches HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Step-catalog errors, including startup chain verification.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Canonical step '{0}' missing from catalog")]
    MissingStep(String),

    #[error(
        "Step chain diverges at '{slug}': catalog points to {found:?}, canonical order expects {expected:?}"
    )]
    ChainDiverged {
        slug: String,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("Step chain does not terminate (revisits '{0}')")]
    Cycle(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Sequencer errors — the expected control-flow outcomes of the progression
/// operations. `Unauthorized` and `UnknownStep` surface directly as 401/404
/// at the router and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("Sign-in required")]
    Unauthorized,

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
