//! Mapping set store.
//!
//! Loads and saves [`MappingSet`]s as SSSOM TSV files. Saves are atomic;
//! a well-formed file survives `save(load(path))` byte-for-byte.

mod atomic;
pub mod tsv;

pub use atomic::{atomic_read_json, atomic_write_json, atomic_write_text};

use crate::model::{MappingSet, MappingSetMetadata, SemanticMapping};
use crate::{CuratorError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Load a mapping set. Fails with `NotFound` if the file does not exist.
pub fn load(path: &Path) -> Result<MappingSet> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CuratorError::NotFound(path.to_path_buf()),
        _ => CuratorError::io_with_path(e, path),
    })?;
    let set = tsv::parse(&text, path)?;
    debug!("Loaded {} mappings from {}", set.len(), path.display());
    Ok(set)
}

/// Load a mapping set, treating a missing file as an empty set with `metadata`.
pub fn load_or_empty(path: &Path, metadata: &MappingSetMetadata) -> Result<MappingSet> {
    match load(path) {
        Err(CuratorError::NotFound(_)) => {
            debug!("{} does not exist, starting empty", path.display());
            Ok(MappingSet::new(metadata))
        }
        other => other,
    }
}

/// Atomically write a mapping set to `path`.
pub fn save(set: &MappingSet, path: &Path) -> Result<()> {
    atomic_write_text(path, &tsv::render(set))?;
    debug!("Saved {} mappings to {}", set.len(), path.display());
    Ok(())
}

/// Return a copy of `set` with `records` appended in order.
///
/// Identities already present (or repeated within `records`) are skipped.
pub fn append(set: &MappingSet, records: impl IntoIterator<Item = SemanticMapping>) -> MappingSet {
    let mut appended = set.clone();
    appended.extend_unique(records);
    appended
}
