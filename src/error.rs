//! Error taxonomy for the catalog/sales pipeline.
//!
//! Transient failures never leave the fetcher as an error — they resolve to
//! `None` and the caller decides what to do. Missing resources are
//! likewise represented as `Option::None` at call sites rather than as an
//! error variant. Everything that can legitimately stop a phase is named
//! here.

use std::path::PathBuf;

/// Top-level error type returned by fallible pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An entire catalog source adapter could not make any progress and has
    /// no fallback to hand off to.
    #[error("catalog source failed: {0}")]
    SourceFatal(String),

    /// The built or loaded catalog failed the minimum-size/coverage checks.
    #[error(
        "catalog validation failed: {cards} cards ({english} english), need >= {min_cards} total / >= {min_english} english"
    )]
    Validation {
        cards: usize,
        english: usize,
        min_cards: usize,
        min_english: usize,
    },

    /// An invariant the code assumes always holds was violated.
    #[error("invariant violation: {0}")]
    Programmer(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
