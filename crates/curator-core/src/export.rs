//! Merged export of a curated project.
//!
//! Writes one SSSOM file holding positives, negatives (negated with
//! `predicate_modifier: Not`) and predictions. Projects with a `purl_base`
//! also get a JSON description of the merged set.

use crate::config::Vocabulary;
use crate::model::{MappingSet, MappingSetMetadata, PredicateModifier};
use crate::repository::{CurationState, Repository};
use crate::store::{self, atomic_write_json};
use crate::{CuratorError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written by [`merge`].
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutput {
    pub tsv_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_path: Option<PathBuf>,
    pub positive: usize,
    pub negative: usize,
    pub predictions: usize,
}

#[derive(Serialize)]
struct MergedDescription<'a> {
    #[serde(flatten)]
    metadata: &'a MappingSetMetadata,
    mapping_count: usize,
    counts: BTreeMap<CurationState, usize>,
}

/// File stem for exports: `basename`, else the slugified title.
pub fn export_stem(repository: &Repository) -> Result<String> {
    let config = repository.config();
    if let Some(basename) = &config.basename {
        return Ok(basename.clone());
    }
    config
        .mapping_set
        .title
        .as_deref()
        .map(|title| title.to_lowercase().replace(' ', "-"))
        .ok_or_else(|| CuratorError::Config {
            message: "basename or mapping set title must be set to export".into(),
        })
}

pub fn merge(repository: &Repository, directory: &Path) -> Result<MergeOutput> {
    let stem = export_stem(repository)?;
    let tsv_path = directory.join(format!("{}.sssom.tsv", stem));

    let mut metadata = repository.config().mapping_set.clone();
    metadata.id = repository.config().mint_set_id(&format!("{}.sssom.tsv", stem));
    if metadata.license.is_none() {
        metadata.license = Some(Vocabulary::DEFAULT_LICENSE.to_string());
    }

    let positive = repository.load_state(CurationState::Positive)?;
    let negative = repository.load_state(CurationState::Negative)?;
    let predictions = repository.load_state(CurationState::Predictions)?;

    let mut merged = MappingSet::new(&metadata);
    merged.extend_unique(positive.iter().cloned());
    merged.extend_unique(
        negative
            .iter()
            .map(|m| m.clone().with_predicate_modifier(Some(PredicateModifier::Not))),
    );
    merged.extend_unique(predictions.iter().cloned());
    store::save(&merged, &tsv_path)?;

    let json_name = format!("{}.sssom.json", stem);
    let json_path = match repository.config().mint_set_id(&json_name) {
        Some(id) => {
            let json_path = directory.join(&json_name);
            let description = MergedDescription {
                metadata: &MappingSetMetadata {
                    id: Some(id),
                    ..metadata.clone()
                },
                mapping_count: merged.len(),
                counts: BTreeMap::from([
                    (CurationState::Positive, positive.len()),
                    (CurationState::Negative, negative.len()),
                    (CurationState::Predictions, predictions.len()),
                ]),
            };
            atomic_write_json(&json_path, &description, false)?;
            Some(json_path)
        }
        None => None,
    };

    info!(
        "Exported {} mappings to {}",
        merged.len(),
        tsv_path.display()
    );
    Ok(MergeOutput {
        tsv_path,
        json_path,
        positive: positive.len(),
        negative: negative.len(),
        predictions: predictions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;
    use crate::model::{IdentityKey, Reference, SemanticMapping};
    use crate::repository::Mark;
    use tempfile::TempDir;

    fn setup_repository(config: RepositoryConfig) -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repository = Repository::new(temp_dir.path(), config);
        let predicted = |s: &str, o: &str| {
            SemanticMapping::from_curies(s, "skos:exactMatch", o, "semapv:LexicalMatching")
                .unwrap()
                .with_mapping_tool("lexical")
        };
        repository
            .append_predicted_mappings(vec![
                predicted("ex:1", "ex:2"),
                predicted("ex:3", "ex:4"),
                predicted("ex:5", "ex:6"),
            ])
            .unwrap();
        let curator = Reference::parse("orcid:0000-0000-0000-0001").unwrap();
        repository
            .mark(IdentityKey::new("ex:1", "skos:exactMatch", "ex:2"), Mark::Correct, &curator)
            .unwrap();
        repository
            .mark(IdentityKey::new("ex:3", "skos:exactMatch", "ex:4"), Mark::Incorrect, &curator)
            .unwrap();
        (temp_dir, repository)
    }

    #[test]
    fn test_stem_from_title() {
        let config = RepositoryConfig {
            mapping_set: MappingSetMetadata {
                title: Some("Demo Mappings".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let repository = Repository::new("/tmp/unused", config);
        assert_eq!(export_stem(&repository).unwrap(), "demo-mappings");
    }

    #[test]
    fn test_stem_required() {
        let repository = Repository::new("/tmp/unused", RepositoryConfig::default());
        assert!(matches!(
            export_stem(&repository),
            Err(CuratorError::Config { .. })
        ));
    }

    #[test]
    fn test_merge_negates_negatives() {
        let config = RepositoryConfig {
            basename: Some("demo".into()),
            purl_base: Some("https://example.org/demo".into()),
            add_date: false,
            ..Default::default()
        };
        let (temp_dir, repository) = setup_repository(config);
        let out_dir = temp_dir.path().join("export");

        let output = merge(&repository, &out_dir).unwrap();
        assert_eq!((output.positive, output.negative, output.predictions), (1, 1, 1));

        let merged = store::load(&output.tsv_path).unwrap();
        assert_eq!(merged.len(), 3);
        let negated = merged
            .get(&IdentityKey::new("ex:3", "skos:exactMatch", "ex:4"))
            .unwrap();
        assert_eq!(negated.predicate_modifier(), Some(PredicateModifier::Not));
        assert_eq!(
            merged.metadata().id.as_deref(),
            Some("https://example.org/demo/demo.sssom.tsv")
        );

        let json_path = output.json_path.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["mapping_count"], 3);
        assert_eq!(json["counts"]["negative"], 1);
        assert_eq!(
            json["mapping_set_id"],
            "https://example.org/demo/demo.sssom.json"
        );
        assert_eq!(json["license"], Vocabulary::DEFAULT_LICENSE);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_merge_without_purl_base_skips_json() {
        let config = RepositoryConfig {
            basename: Some("demo".into()),
            add_date: false,
            ..Default::default()
        };
        let (temp_dir, repository) = setup_repository(config);
        let out_dir = temp_dir.path().join("export");

        let output = merge(&repository, &out_dir).unwrap();
        assert!(output.json_path.is_none());
        assert!(output.tsv_path.exists());
        assert!(!out_dir.join("demo.sssom.json").exists());
    }
}
