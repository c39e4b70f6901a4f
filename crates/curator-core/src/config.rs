//! Centralized configuration for the curator.
//!
//! Constants for file names, vocabulary terms and SSSOM column names, plus the
//! per-project [`RepositoryConfig`] document stored as `curator.json`.

use crate::model::MappingSetMetadata;
use crate::store::{atomic_read_json, atomic_write_json};
use crate::{CuratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file names inside a curation project.
pub struct FileNames;

impl FileNames {
    pub const CONFIG: &'static str = "curator.json";
    pub const PREDICTIONS: &'static str = "predictions.sssom.tsv";
    pub const POSITIVES: &'static str = "positive.sssom.tsv";
    pub const NEGATIVES: &'static str = "negative.sssom.tsv";
    pub const UNSURE: &'static str = "unsure.sssom.tsv";
    pub const LOCK: &'static str = ".curator.lock";
    pub const GITIGNORE: &'static str = ".gitignore";
}

/// Vocabulary terms the engine stamps onto mappings.
pub struct Vocabulary;

impl Vocabulary {
    pub const EXACT_MATCH: &'static str = "skos:exactMatch";
    pub const BROAD_MATCH: &'static str = "skos:broadMatch";
    pub const NARROW_MATCH: &'static str = "skos:narrowMatch";
    pub const MANUAL_MAPPING_CURATION: &'static str = "semapv:ManualMappingCuration";
    pub const DEFAULT_LICENSE: &'static str = "spdx:CC0-1.0";
}

/// SSSOM column names understood by the store.
pub struct ColumnNames;

impl ColumnNames {
    pub const SUBJECT_ID: &'static str = "subject_id";
    pub const SUBJECT_LABEL: &'static str = "subject_label";
    pub const PREDICATE_ID: &'static str = "predicate_id";
    pub const PREDICATE_MODIFIER: &'static str = "predicate_modifier";
    pub const OBJECT_ID: &'static str = "object_id";
    pub const OBJECT_LABEL: &'static str = "object_label";
    pub const MAPPING_JUSTIFICATION: &'static str = "mapping_justification";
    pub const AUTHOR_ID: &'static str = "author_id";
    pub const MAPPING_TOOL: &'static str = "mapping_tool";
    pub const CONFIDENCE: &'static str = "confidence";
    pub const MAPPING_DATE: &'static str = "mapping_date";
    pub const COMMENT: &'static str = "comment";
    pub const SEE_ALSO: &'static str = "see_also";

    /// Every column with a typed field on `SemanticMapping`, in canonical order.
    pub const KNOWN: [&'static str; 13] = [
        Self::SUBJECT_ID,
        Self::SUBJECT_LABEL,
        Self::PREDICATE_ID,
        Self::PREDICATE_MODIFIER,
        Self::OBJECT_ID,
        Self::OBJECT_LABEL,
        Self::MAPPING_JUSTIFICATION,
        Self::AUTHOR_ID,
        Self::MAPPING_TOOL,
        Self::CONFIDENCE,
        Self::MAPPING_DATE,
        Self::COMMENT,
        Self::SEE_ALSO,
    ];

    /// Columns written into freshly initialized files.
    pub const STUB: [&'static str; 10] = [
        Self::SUBJECT_ID,
        Self::SUBJECT_LABEL,
        Self::PREDICATE_ID,
        Self::PREDICATE_MODIFIER,
        Self::OBJECT_ID,
        Self::OBJECT_LABEL,
        Self::MAPPING_JUSTIFICATION,
        Self::AUTHOR_ID,
        Self::MAPPING_TOOL,
        Self::CONFIDENCE,
    ];

    pub fn is_known(name: &str) -> bool {
        Self::KNOWN.contains(&name)
    }
}

fn default_predictions_path() -> PathBuf {
    PathBuf::from(FileNames::PREDICTIONS)
}

fn default_positives_path() -> PathBuf {
    PathBuf::from(FileNames::POSITIVES)
}

fn default_negatives_path() -> PathBuf {
    PathBuf::from(FileNames::NEGATIVES)
}

fn default_unsure_path() -> PathBuf {
    PathBuf::from(FileNames::UNSURE)
}

fn default_add_date() -> bool {
    true
}

/// Per-project configuration stored in `curator.json`.
///
/// Paths are relative to the project directory unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_predictions_path")]
    pub predictions_path: PathBuf,
    #[serde(default = "default_positives_path")]
    pub positives_path: PathBuf,
    #[serde(default = "default_negatives_path")]
    pub negatives_path: PathBuf,
    #[serde(default = "default_unsure_path")]
    pub unsure_path: PathBuf,
    /// Base URI used to mint `mapping_set_id`s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl_base: Option<String>,
    /// Metadata template applied to newly created sets and exports.
    #[serde(default)]
    pub mapping_set: MappingSetMetadata,
    /// File stem for merged exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basename: Option<String>,
    /// Stamp `mapping_date` on curation.
    #[serde(default = "default_add_date")]
    pub add_date: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            predictions_path: default_predictions_path(),
            positives_path: default_positives_path(),
            negatives_path: default_negatives_path(),
            unsure_path: default_unsure_path(),
            purl_base: None,
            mapping_set: MappingSetMetadata::default(),
            basename: None,
            add_date: default_add_date(),
        }
    }
}

impl RepositoryConfig {
    /// Load `curator.json` from a project directory.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(FileNames::CONFIG);
        atomic_read_json(&path)?.ok_or(CuratorError::NotFound(path))
    }

    /// Write `curator.json` into a project directory.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        atomic_write_json(&project_dir.join(FileNames::CONFIG), self, false)
    }

    /// Mint a `mapping_set_id` for a file name under `purl_base`.
    pub fn mint_set_id(&self, file_name: &str) -> Option<String> {
        self.purl_base
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: RepositoryConfig =
            serde_json::from_str(r#"{"purl_base": "https://example.org/ms/"}"#).unwrap();
        assert_eq!(config.predictions_path, PathBuf::from(FileNames::PREDICTIONS));
        assert_eq!(config.unsure_path, PathBuf::from(FileNames::UNSURE));
        assert!(config.add_date);
        assert_eq!(
            config.mint_set_id("positive.sssom.tsv").as_deref(),
            Some("https://example.org/ms/positive.sssom.tsv")
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config = RepositoryConfig {
            basename: Some("demo".into()),
            add_date: false,
            ..Default::default()
        };
        config.save(temp_dir.path()).unwrap();

        let loaded = RepositoryConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let err = RepositoryConfig::load(temp_dir.path()).unwrap_err();
        assert!(matches!(err, CuratorError::NotFound(_)));
    }

    #[test]
    fn test_known_columns() {
        assert!(ColumnNames::is_known("subject_id"));
        assert!(!ColumnNames::is_known("curation_rule_text"));
    }
}
