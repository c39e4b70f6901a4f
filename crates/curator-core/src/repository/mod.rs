//! Curation engine.
//!
//! A [`Repository`] owns the paths of the four mapping sets of a project and
//! moves mappings between them. Every mutation is a self-contained cycle:
//!
//! 1. Take the project lock and load the sets from disk
//! 2. Apply the change in memory
//! 3. Rebuild the index and verify the touched identities
//! 4. Save the destination set, then the source set
//! 5. Notify the persist hook
//!
//! A failure before step 4 leaves every file untouched.

mod hook;
mod ingest;
mod lock;
mod state;

pub use hook::{commit_message, GitHook, NoopHook, PersistHook};
pub use ingest::{IngestOptions, IngestSummary, PredictionGateway};
pub use lock::ProjectLock;
pub use state::{CurationState, Decision, Mark, StateSets};

use crate::config::{FileNames, RepositoryConfig, Vocabulary};
use crate::index::{self, ConflictIndex, IntegrityIssue};
use crate::model::{IdentityKey, MappingSet, MappingSetMetadata, Reference, SemanticMapping};
use crate::store;
use crate::{CuratorError, Result};
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct Repository {
    root: PathBuf,
    config: RepositoryConfig,
    hook: Box<dyn PersistHook>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Open the project at `root`, reading `curator.json` when present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CuratorError::NotFound(root));
        }
        let config = match RepositoryConfig::load(&root) {
            Ok(config) => config,
            Err(CuratorError::NotFound(_)) => {
                debug!("No {} in {}, using defaults", FileNames::CONFIG, root.display());
                RepositoryConfig::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(root, config))
    }

    pub fn new(root: impl Into<PathBuf>, config: RepositoryConfig) -> Self {
        Self {
            root: root.into(),
            config,
            hook: Box::new(NoopHook),
        }
    }

    pub fn with_hook(mut self, hook: impl PersistHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Path of the file backing `state`.
    pub fn path(&self, state: CurationState) -> PathBuf {
        let relative = match state {
            CurationState::Predictions => &self.config.predictions_path,
            CurationState::Positive => &self.config.positives_path,
            CurationState::Negative => &self.config.negatives_path,
            CurationState::Unsure => &self.config.unsure_path,
        };
        self.root.join(relative)
    }

    /// Metadata for a newly created set backing `state`.
    pub fn default_metadata(&self, state: CurationState) -> MappingSetMetadata {
        let path = self.path(state);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        MappingSetMetadata {
            id: self.config.mint_set_id(&file_name),
            ..Default::default()
        }
        .or(&self.config.mapping_set)
    }

    // ========================================
    // Loading
    // ========================================

    /// Load one set; a missing file is an empty set.
    pub fn load_state(&self, state: CurationState) -> Result<MappingSet> {
        store::load_or_empty(&self.path(state), &self.default_metadata(state))
    }

    pub fn load_all(&self) -> Result<StateSets> {
        StateSets::try_from_fn(|state| self.load_state(state))
    }

    /// The current set for `state`.
    pub fn export(&self, state: CurationState) -> Result<MappingSet> {
        self.load_state(state)
    }

    /// Every integrity problem across the four files. Never writes.
    pub fn validate(&self) -> Result<Vec<IntegrityIssue>> {
        let sets = self.load_all()?;
        let issues = index::issues(&sets);
        if issues.is_empty() {
            debug!(
                "No integrity issues across {} mapping(s) in {}",
                sets.total(),
                self.root.display()
            );
        } else {
            warn!("{} integrity issue(s) in {}", issues.len(), self.root.display());
        }
        Ok(issues)
    }

    fn lock(&self) -> Result<ProjectLock> {
        ProjectLock::acquire(&self.root.join(FileNames::LOCK))
    }

    // ========================================
    // Mutations
    // ========================================

    /// Add generator output to predictions.
    pub fn append_predicted_mappings(
        &self,
        records: impl IntoIterator<Item = SemanticMapping>,
    ) -> Result<IngestSummary> {
        self.append_predicted_mappings_with(records, IngestOptions::default())
    }

    pub fn append_predicted_mappings_with(
        &self,
        records: impl IntoIterator<Item = SemanticMapping>,
        options: IngestOptions,
    ) -> Result<IngestSummary> {
        let _lock = self.lock()?;
        let mut sets = self.load_all()?;
        let summary = PredictionGateway::new(options).ingest(&mut sets, records.into_iter().collect())?;
        if summary.changed() {
            self.persist(&sets, &[CurationState::Predictions])?;
        }
        Ok(summary)
    }

    /// Move a predicted mapping into the curated set for `decision`.
    ///
    /// Refuses with `AlreadyCurated` when the identity has a different curated
    /// state, `StateCollision` when it has several, and `MappingNotFound` when
    /// it is not predicted.
    pub fn curate(
        &self,
        key: impl Into<IdentityKey>,
        decision: Decision,
        curator: &Reference,
        justification: &Reference,
    ) -> Result<SemanticMapping> {
        self.curate_as(key.into(), decision, curator, justification, None)
    }

    /// Curate with a reviewer mark, rewriting the predicate for broad and
    /// narrow matches.
    pub fn mark(
        &self,
        key: impl Into<IdentityKey>,
        mark: Mark,
        curator: &Reference,
    ) -> Result<SemanticMapping> {
        let manual = Reference::parse(Vocabulary::MANUAL_MAPPING_CURATION)?;
        self.curate_as(key.into(), mark.decision(), curator, &manual, mark.predicate())
    }

    fn curate_as(
        &self,
        key: IdentityKey,
        decision: Decision,
        curator: &Reference,
        justification: &Reference,
        predicate: Option<Reference>,
    ) -> Result<SemanticMapping> {
        let target = decision.state();
        let _lock = self.lock()?;
        let mut sets = self.load_all()?;
        let index = ConflictIndex::build(&sets);

        let stored_key = match &predicate {
            Some(p) => IdentityKey::new(&key.subject, p.curie(), &key.object),
            None => key.clone(),
        };
        for k in [&key, &stored_key] {
            if let Some(state) = index.curated_state(k)? {
                if state != target {
                    return Err(CuratorError::AlreadyCurated {
                        key: k.clone(),
                        state,
                    });
                }
            }
        }

        let predictions = sets.get_mut(CurationState::Predictions);
        let mut removed = predictions.remove(&key);
        if removed.is_empty() {
            return Err(CuratorError::MappingNotFound {
                key,
                state: CurationState::Predictions,
            });
        }
        if stored_key != key {
            predictions.remove(&stored_key);
        }

        let mut record = removed.swap_remove(0);
        if let Some(p) = predicate {
            record = record.with_predicate(p);
        }
        let record = record.curated(curator.clone(), justification.clone(), self.curation_date());
        sets.get_mut(target).replace(record.clone());

        ConflictIndex::build(&sets).verify(&[key.clone(), stored_key])?;
        self.persist(&sets, &[target, CurationState::Predictions])?;
        info!("Curated {} as {} ({})", key, target, curator);
        Ok(record)
    }

    /// Re-classify an already curated mapping.
    ///
    /// Moves between curated sets, or re-stamps in place when the state is
    /// unchanged. Curator, justification and date are always replaced.
    pub fn recurate(
        &self,
        key: impl Into<IdentityKey>,
        decision: Decision,
        curator: &Reference,
        justification: &Reference,
    ) -> Result<SemanticMapping> {
        let key = key.into();
        let target = decision.state();
        let _lock = self.lock()?;
        let mut sets = self.load_all()?;

        let current = ConflictIndex::build(&sets)
            .curated_state(&key)?
            .ok_or_else(|| CuratorError::MappingNotFound {
                key: key.clone(),
                state: target,
            })?;

        let mut removed = sets.get_mut(current).remove(&key);
        if removed.is_empty() {
            return Err(CuratorError::MappingNotFound {
                key,
                state: current,
            });
        }
        let record = removed.swap_remove(0).curated(
            curator.clone(),
            justification.clone(),
            self.curation_date(),
        );
        sets.get_mut(target).replace(record.clone());

        let mut touched = vec![target];
        if current != target {
            touched.push(current);
        }
        if !sets.get_mut(CurationState::Predictions).remove(&key).is_empty() {
            debug!("Dropped stale prediction for {}", key);
            touched.push(CurationState::Predictions);
        }

        ConflictIndex::build(&sets).verify(std::slice::from_ref(&key))?;
        self.persist(&sets, &touched)?;
        info!("Recurated {} from {} to {} ({})", key, current, target, curator);
        Ok(record)
    }

    /// Delete every row with this identity from one set.
    pub fn remove(
        &self,
        key: impl Into<IdentityKey>,
        state: CurationState,
    ) -> Result<Vec<SemanticMapping>> {
        let key = key.into();
        let _lock = self.lock()?;
        let mut sets = self.load_all()?;

        let removed = sets.get_mut(state).remove(&key);
        if removed.is_empty() {
            return Err(CuratorError::MappingNotFound { key, state });
        }
        self.persist(&sets, &[state])?;
        info!("Removed {} from {}", key, state);
        Ok(removed)
    }

    // ========================================
    // Helpers
    // ========================================

    fn curation_date(&self) -> Option<String> {
        self.config
            .add_date
            .then(|| Utc::now().format("%Y-%m-%d").to_string())
    }

    /// Save `states` in order, then notify the hook.
    fn persist(&self, sets: &StateSets, states: &[CurationState]) -> Result<()> {
        let mut written = Vec::with_capacity(states.len());
        for &state in states {
            let path = self.path(state);
            store::save(sets.get(state), &path)?;
            written.push(path);
        }
        if let Err(e) = self.hook.persisted(&written) {
            warn!("Persist hook failed: {}", e);
        }
        Ok(())
    }
}
