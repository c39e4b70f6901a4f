//! Prediction ingestion gateway.
//!
//! # Algorithm
//!
//! 1. **Validate**: every candidate must carry a justification and a mapping
//!    tool and no curator; one bad candidate rejects the whole batch
//! 2. **Classify**: ask the index which candidates are already curated or
//!    already predicted (including repeats within the batch)
//! 3. **Append**: add the residue to predictions in input order
//!
//! Nothing is written here; the repository saves the predictions set when the
//! summary reports a change.

use super::state::{CurationState, StateSets};
use crate::index::{ConflictIndex, ConflictKind};
use crate::model::SemanticMapping;
use crate::{CuratorError, Result};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Merge the evidence of duplicates into the stored prediction instead of
    /// ignoring them.
    pub refresh_existing: bool,
}

/// Counts reported by one ingestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// New predictions appended.
    pub added: usize,
    /// Candidates already predicted or repeated in the batch.
    pub skipped_duplicate: usize,
    /// Candidates whose identity already has a curated state.
    pub skipped_already_curated: usize,
    /// Duplicates whose evidence was merged into the stored row.
    pub refreshed: usize,
}

impl IngestSummary {
    /// Whether the predictions set changed.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.refreshed > 0
    }
}

/// Filters generator output into the predictions set.
#[derive(Debug, Default, Clone, Copy)]
pub struct PredictionGateway {
    options: IngestOptions,
}

impl PredictionGateway {
    pub fn new(options: IngestOptions) -> Self {
        Self { options }
    }

    /// Reject candidates that could never be valid predictions.
    pub fn validate(candidates: &[SemanticMapping]) -> Result<()> {
        for candidate in candidates {
            candidate.validate()?;
            if candidate.mapping_tool().is_none() {
                return Err(CuratorError::validation(
                    "mapping_tool",
                    format!("prediction {} has no mapping tool", candidate.identity_key()),
                ));
            }
            if candidate.curator().is_some() {
                return Err(CuratorError::validation(
                    "author_id",
                    format!(
                        "prediction {} must not carry a curator",
                        candidate.identity_key()
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn ingest(
        &self,
        sets: &mut StateSets,
        candidates: Vec<SemanticMapping>,
    ) -> Result<IngestSummary> {
        Self::validate(&candidates)?;

        let before = ConflictIndex::build(sets);
        let reports = before.find_conflicts(&candidates, CurationState::Predictions)?;

        let mut summary = IngestSummary::default();
        let predictions = sets.get_mut(CurationState::Predictions);
        for (candidate, report) in candidates.into_iter().zip(reports) {
            match report.conflict {
                ConflictKind::AlreadyCurated { state } => {
                    debug!("Skipping {}: already curated as {}", report.key, state);
                    summary.skipped_already_curated += 1;
                }
                ConflictKind::AlreadyPredicted => {
                    summary.skipped_duplicate += 1;
                    if self.options.refresh_existing {
                        predictions.upsert(candidate)?;
                        summary.refreshed += 1;
                    }
                }
                ConflictKind::NoConflict => {
                    if predictions.push_unique(candidate) {
                        summary.added += 1;
                    }
                }
            }
        }

        let diff = ConflictIndex::diff(&before, &ConflictIndex::build(sets));
        info!(
            "Ingested predictions: {} new, {} duplicate, {} already curated ({} identities added to index)",
            summary.added,
            summary.skipped_duplicate,
            summary.skipped_already_curated,
            diff.added.len()
        );
        Ok(summary)
    }
}
