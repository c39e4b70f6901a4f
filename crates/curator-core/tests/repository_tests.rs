//! Integration tests for the curation engine.
//!
//! Every test works on a real project directory so the on-disk files are
//! what gets checked, not just the in-memory sets.

use curator_core::store;
use curator_core::{
    initialize_folder, CurationState, CuratorError, Decision, IdentityKey, InitOptions,
    IntegrityIssue, PersistHook, Reference, Repository, SemanticMapping,
};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create an initialized project with dates disabled.
fn create_test_project() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let options = InitOptions {
        purl_base: Some("https://example.org/demo".into()),
        ..Default::default()
    };
    initialize_folder(temp_dir.path(), options).unwrap();

    let mut config = curator_core::RepositoryConfig::load(temp_dir.path()).unwrap();
    config.add_date = false;
    config.save(temp_dir.path()).unwrap();

    let repository = Repository::open(temp_dir.path()).unwrap();
    (temp_dir, repository)
}

fn predicted(subject: &str, object: &str) -> SemanticMapping {
    SemanticMapping::from_curies(subject, "skos:exactMatch", object, "semapv:LexicalMatching")
        .unwrap()
        .with_mapping_tool("generate_mappings.py")
        .with_confidence(0.95)
        .unwrap()
}

fn key(subject: &str, object: &str) -> IdentityKey {
    IdentityKey::new(subject, "skos:exactMatch", object)
}

fn alice() -> Reference {
    Reference::parse("orcid:alice").unwrap()
}

fn manual() -> Reference {
    Reference::parse("semapv:ManualMappingCuration").unwrap()
}

/// Raw bytes of the four files, for unchanged-on-refusal checks.
fn snapshot(repository: &Repository) -> Vec<Vec<u8>> {
    CurationState::ALL
        .iter()
        .map(|&state| fs::read(repository.path(state)).unwrap())
        .collect()
}

fn keys(repository: &Repository, state: CurationState) -> Vec<IdentityKey> {
    repository
        .export(state)
        .unwrap()
        .iter()
        .map(SemanticMapping::identity_key)
        .collect()
}

#[derive(Default, Clone)]
struct RecordingHook {
    calls: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl PersistHook for RecordingHook {
    fn persisted(&self, paths: &[PathBuf]) -> curator_core::Result<()> {
        self.calls.lock().unwrap().push(paths.to_vec());
        Ok(())
    }
}

struct FailingHook;

impl PersistHook for FailingHook {
    fn persisted(&self, _paths: &[PathBuf]) -> curator_core::Result<()> {
        Err(CuratorError::Other("hook down".into()))
    }
}

#[test]
fn test_ingestion_is_idempotent() {
    let (_temp_dir, repository) = create_test_project();
    let batch = vec![predicted("chebi:1", "mesh:C1"), predicted("chebi:2", "mesh:C2")];

    let first = repository.append_predicted_mappings(batch.clone()).unwrap();
    assert_eq!(first.added, 2);
    let after_first = snapshot(&repository);

    let second = repository.append_predicted_mappings(batch).unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped_duplicate, 2);
    assert_eq!(snapshot(&repository), after_first);
}

#[test]
fn test_curate_scenario() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![predicted("ex:A", "ex:B")])
        .unwrap();

    let record = repository
        .curate(key("ex:A", "ex:B"), Decision::Positive, &alice(), &manual())
        .unwrap();

    assert!(keys(&repository, CurationState::Predictions).is_empty());
    assert_eq!(keys(&repository, CurationState::Positive), vec![key("ex:A", "ex:B")]);

    let stored = repository.export(CurationState::Positive).unwrap();
    let stored = &stored.mappings()[0];
    assert_eq!(stored, &record);
    assert_eq!(stored.curator(), Some(&alice()));
    assert_eq!(stored.justification(), Some(&manual()));
    assert!(stored.confidence().is_none());
    assert!(stored.mapping_tool().is_none());
}

#[test]
fn test_promotion_invariant() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![
            predicted("ex:1", "ex:2"),
            predicted("ex:3", "ex:4"),
        ])
        .unwrap();

    repository
        .curate(&predicted("ex:1", "ex:2"), Decision::Negative, &alice(), &manual())
        .unwrap();

    assert_eq!(keys(&repository, CurationState::Predictions), vec![key("ex:3", "ex:4")]);
    assert_eq!(keys(&repository, CurationState::Negative), vec![key("ex:1", "ex:2")]);
    assert!(repository.validate().unwrap().is_empty());
}

#[test]
fn test_refusal_leaves_files_unchanged() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2")])
        .unwrap();
    repository
        .curate(key("ex:1", "ex:2"), Decision::Negative, &alice(), &manual())
        .unwrap();

    // Put the same identity back into predictions by hand.
    let path = repository.path(CurationState::Predictions);
    let predictions = store::append(&store::load(&path).unwrap(), vec![predicted("ex:1", "ex:2")]);
    store::save(&predictions, &path).unwrap();
    let before = snapshot(&repository);

    let err = repository
        .curate(key("ex:1", "ex:2"), Decision::Positive, &alice(), &manual())
        .unwrap_err();
    assert!(matches!(
        err,
        CuratorError::AlreadyCurated {
            state: CurationState::Negative,
            ..
        }
    ));
    assert!(err.is_refusal());
    assert_eq!(snapshot(&repository), before);
}

#[test]
fn test_curate_missing_prediction() {
    let (_temp_dir, repository) = create_test_project();
    let before = snapshot(&repository);
    let err = repository
        .curate(key("ex:9", "ex:9"), Decision::Unsure, &alice(), &manual())
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
    assert_eq!(snapshot(&repository), before);
}

#[test]
fn test_ingest_already_curated_scenario() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![predicted("ex:A", "ex:B")])
        .unwrap();
    repository
        .curate(key("ex:A", "ex:B"), Decision::Positive, &alice(), &manual())
        .unwrap();

    let summary = repository
        .append_predicted_mappings(vec![predicted("ex:A", "ex:B")])
        .unwrap();
    assert_eq!(summary.skipped_already_curated, 1);
    assert_eq!(summary.added, 0);
    assert!(keys(&repository, CurationState::Predictions).is_empty());
}

#[test]
fn test_hand_edited_collision_scenario() {
    let (_temp_dir, repository) = create_test_project();
    let curated = predicted("ex:A", "ex:B").curated(alice(), manual(), None);
    for state in [CurationState::Positive, CurationState::Negative] {
        let path = repository.path(state);
        let set = store::append(&store::load(&path).unwrap(), vec![curated.clone()]);
        store::save(&set, &path).unwrap();
    }

    let issues = repository.validate().unwrap();
    let collisions: Vec<&IntegrityIssue> = issues
        .iter()
        .filter(|i| matches!(i, IntegrityIssue::StateCollision { .. }))
        .collect();
    assert_eq!(
        collisions,
        vec![&IntegrityIssue::StateCollision {
            key: key("ex:A", "ex:B"),
            states: vec![CurationState::Positive, CurationState::Negative],
        }]
    );

    // Mutations touching the identity refuse instead of picking a side.
    let err = repository
        .recurate(key("ex:A", "ex:B"), Decision::Unsure, &alice(), &manual())
        .unwrap_err();
    assert!(matches!(err, CuratorError::StateCollision { .. }));
    let err = repository
        .append_predicted_mappings(vec![predicted("ex:A", "ex:B")])
        .unwrap_err();
    assert_eq!(err.code(), "state_collision");
}

#[test]
fn test_curated_sets_stay_disjoint() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings((0..6).map(|i| predicted(&format!("ex:{i}"), "ex:target")))
        .unwrap();

    let decisions = [Decision::Positive, Decision::Negative, Decision::Unsure];
    for i in 0..6 {
        repository
            .curate(
                IdentityKey::new(format!("ex:{i}"), "skos:exactMatch", "ex:target"),
                decisions[i % 3],
                &alice(),
                &manual(),
            )
            .unwrap();
    }
    // A second curate of the same identity toward another state is refused.
    assert!(repository
        .curate(
            IdentityKey::new("ex:0", "skos:exactMatch", "ex:target"),
            Decision::Negative,
            &alice(),
            &manual(),
        )
        .is_err());

    let mut all: Vec<IdentityKey> = CurationState::CURATED
        .iter()
        .flat_map(|&state| keys(&repository, state))
        .collect();
    let total = all.len();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), total);
    assert_eq!(total, 6);
    assert!(repository.validate().unwrap().is_empty());
}

#[test]
fn test_recurate_moves_between_states() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2")])
        .unwrap();
    repository
        .curate(key("ex:1", "ex:2"), Decision::Unsure, &alice(), &manual())
        .unwrap();

    let bob = Reference::parse("orcid:bob").unwrap();
    let record = repository
        .recurate(key("ex:1", "ex:2"), Decision::Positive, &bob, &manual())
        .unwrap();
    assert_eq!(record.curator(), Some(&bob));
    assert!(keys(&repository, CurationState::Unsure).is_empty());
    assert_eq!(keys(&repository, CurationState::Positive), vec![key("ex:1", "ex:2")]);

    // Same state re-stamps in place.
    repository
        .recurate(key("ex:1", "ex:2"), Decision::Positive, &alice(), &manual())
        .unwrap();
    let positives = repository.export(CurationState::Positive).unwrap();
    assert_eq!(positives.len(), 1);
    assert_eq!(positives.mappings()[0].curator(), Some(&alice()));

    let err = repository
        .recurate(key("ex:7", "ex:8"), Decision::Negative, &alice(), &manual())
        .unwrap_err();
    assert!(matches!(err, CuratorError::MappingNotFound { .. }));
}

#[test]
fn test_round_trip_preserves_hand_written_file() {
    let (_temp_dir, repository) = create_test_project();
    let text = "\
#mapping_set_id: https://example.org/demo/positive.sssom.tsv
#curie_map:
#  chebi: http://purl.obolibrary.org/obo/CHEBI_
#  mesh: http://id.nlm.nih.gov/mesh/
subject_id\tsubject_label\tpredicate_id\tobject_id\tobject_label\tmapping_justification\tauthor_id\tcuration_rule_text\tsee_also
chebi:133530\ttyramine sulfate\tskos:exactMatch\tmesh:C027957\ttyramine O-sulfate\tsemapv:ManualMappingCuration\torcid:0000-0003-4423-4370\tlexical rule 7\thttps://a.example|https://b.example
chebi:28646\t\tskos:exactMatch\tmesh:D014439\t\tsemapv:ManualMappingCuration\torcid:0000-0003-4423-4370\t\t
";
    let path = repository.path(CurationState::Positive);
    fs::write(&path, text).unwrap();

    store::save(&store::load(&path).unwrap(), &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), text);

    // A mutation of another file leaves this one byte-identical too.
    repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2")])
        .unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn test_editor_saved_files_stay_usable() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2"), predicted("ex:3", "ex:4")])
        .unwrap();

    // Rewrite predictions with CRLF endings and a blank trailing line.
    let predictions = repository.path(CurationState::Predictions);
    let text = fs::read_to_string(&predictions).unwrap().replace('\n', "\r\n") + "\r\n";
    fs::write(&predictions, &text).unwrap();

    assert!(repository.validate().unwrap().is_empty());
    repository
        .curate(key("ex:1", "ex:2"), Decision::Positive, &alice(), &manual())
        .unwrap();

    let after = fs::read_to_string(&predictions).unwrap();
    assert!(after.ends_with("\r\n\r\n"));
    assert!(!after.replace("\r\n", "").contains('\n'));
    assert_eq!(keys(&repository, CurationState::Predictions), vec![key("ex:3", "ex:4")]);
}

#[test]
fn test_curation_keeps_extension_columns() {
    let (_temp_dir, repository) = create_test_project();
    repository
        .append_predicted_mappings(vec![
            predicted("ex:1", "ex:2").with_extension("curation_rule_text", "rule 7")
        ])
        .unwrap();
    repository
        .curate(key("ex:1", "ex:2"), Decision::Positive, &alice(), &manual())
        .unwrap();

    let text = fs::read_to_string(repository.path(CurationState::Positive)).unwrap();
    let header = text.lines().find(|l| !l.starts_with('#')).unwrap();
    assert!(header.ends_with("\tcuration_rule_text"));
    assert!(text.contains("\trule 7\n"));
}

#[test]
fn test_hook_sees_destination_before_source() {
    let (_temp_dir, repository) = create_test_project();
    let hook = RecordingHook::default();
    let repository = Repository::open(repository.root())
        .unwrap()
        .with_hook(hook.clone());

    repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2")])
        .unwrap();
    repository
        .curate(key("ex:1", "ex:2"), Decision::Negative, &alice(), &manual())
        .unwrap();
    // Nothing new: no save, no notification.
    repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2")])
        .unwrap();

    let calls = hook.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            vec![repository.path(CurationState::Predictions)],
            vec![
                repository.path(CurationState::Negative),
                repository.path(CurationState::Predictions),
            ],
        ]
    );
}

#[test]
fn test_hook_failure_does_not_undo_mutation() {
    let (temp_dir, _repository) = create_test_project();
    let repository = Repository::open(temp_dir.path())
        .unwrap()
        .with_hook(FailingHook);
    let summary = repository
        .append_predicted_mappings(vec![predicted("ex:1", "ex:2")])
        .unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(keys(&repository, CurationState::Predictions), vec![key("ex:1", "ex:2")]);
}

#[test]
fn test_malformed_file_is_reported_with_line() {
    let (_temp_dir, repository) = create_test_project();
    fs::write(
        repository.path(CurationState::Unsure),
        "subject_id\tpredicate_id\tobject_id\nex:1\tskos:exactMatch\n",
    )
    .unwrap();

    match repository.validate().unwrap_err() {
        CuratorError::Format { line, path, .. } => {
            assert_eq!(line, 2);
            assert_eq!(path, repository.path(CurationState::Unsure));
        }
        other => panic!("unexpected error: {other}"),
    }
}
