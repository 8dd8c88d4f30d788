//! Key-Value Caches.
//!
//! Two persistent, read-through, on-disk JSON caches: national-dex-id to
//! English species name, and Japanese species name to
//! `{dexId, enName, normalizedKey}`. Both follow the same shape: load
//! lazily from disk, serve reads from memory, and write through to disk
//! after every successful resolution so a crash mid-run loses at most the
//! in-flight entry.
//!
//! Concurrent access is the only shared mutable state in the pipeline: a
//! miss takes an exclusive per-key lock before calling out, so two
//! bounded-parallel workers racing on the same key coalesce into one
//! outbound request instead of two.

pub mod dex_cache;
pub mod species_cache;

pub use dex_cache::DexCache;
pub use species_cache::{SpeciesCache, SpeciesEntry};

use std::fs;
use std::path::{Path, PathBuf};

/// Load a JSON-backed map from disk, defaulting to empty when the file is
/// missing, empty, or unparseable — any of those triggers a rebuild on the
/// next successful write rather than a hard failure.
pub(crate) fn load_or_default<T: Default + serde::de::DeserializeOwned>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => {
            serde_json::from_str(&contents).unwrap_or_default()
        }
        _ => T::default(),
    }
}

pub(crate) fn save_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), crate::error::PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| crate::error::PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string(value)?;
    let tmp: PathBuf = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|source| crate::error::PipelineError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| crate::error::PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
