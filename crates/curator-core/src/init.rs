//! Project scaffolding.

use crate::config::{FileNames, RepositoryConfig};
use crate::model::{MappingSet, MappingSetMetadata};
use crate::repository::{CurationState, Repository};
use crate::store::{self, atomic_write_text};
use crate::{CuratorError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Base URI used to mint each file's `mapping_set_id`.
    pub purl_base: Option<String>,
    /// Metadata template written into every stub file.
    pub mapping_set: MappingSetMetadata,
    pub basename: Option<String>,
}

/// Create the four stub mapping files and `curator.json` in `directory`,
/// and list the project lock file in `.gitignore`.
///
/// Fails with `FileExists` before writing anything if any of them exists.
pub fn initialize_folder(directory: &Path, options: InitOptions) -> Result<Repository> {
    fs::create_dir_all(directory).map_err(|e| CuratorError::io_with_path(e, directory))?;

    let config = RepositoryConfig {
        purl_base: options
            .purl_base
            .map(|base| base.trim_end_matches('/').to_string()),
        mapping_set: options.mapping_set,
        basename: options.basename,
        ..Default::default()
    };
    let repository = Repository::new(directory, config.clone());

    let mut targets: Vec<PathBuf> = CurationState::ALL
        .iter()
        .map(|&state| repository.path(state))
        .collect();
    targets.push(directory.join(FileNames::CONFIG));
    if let Some(existing) = targets.into_iter().find(|p| p.exists()) {
        return Err(CuratorError::FileExists(existing));
    }

    for state in CurationState::ALL {
        let set = MappingSet::new(&repository.default_metadata(state));
        store::save(&set, &repository.path(state))?;
    }
    config.save(directory)?;
    ignore_lock_file(directory)?;

    info!("Initialized curation project in {}", directory.display());
    Ok(repository)
}

/// Append the lock file to `.gitignore` unless it is already listed.
fn ignore_lock_file(directory: &Path) -> Result<()> {
    let path = directory.join(FileNames::GITIGNORE);
    let mut text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(CuratorError::io_with_path(e, &path)),
    };
    if text.lines().any(|line| line.trim() == FileNames::LOCK) {
        return Ok(());
    }
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(FileNames::LOCK);
    text.push('\n');
    atomic_write_text(&path, &text)
}
