//! Identity and conflict index.
//!
//! Maps every identity key to the places it occurs across the four sets.
//! The index is built from freshly loaded sets for each operation and is
//! never cached.

use crate::model::IdentityKey;
use crate::repository::{CurationState, StateSets};
use crate::{CuratorError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// One occurrence of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub state: CurationState,
    pub row: usize,
}

/// Outcome of checking one candidate against the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictKind {
    NoConflict,
    AlreadyCurated { state: CurationState },
    AlreadyPredicted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub key: IdentityKey,
    pub conflict: ConflictKind,
}

impl ConflictReport {
    pub fn is_conflict(&self) -> bool {
        self.conflict != ConflictKind::NoConflict
    }
}

/// Identities whose set membership changed between two index builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDiff {
    pub added: Vec<IdentityKey>,
    pub removed: Vec<IdentityKey>,
    /// Key with the states it was in before and after.
    pub moved: Vec<(IdentityKey, Vec<CurationState>, Vec<CurationState>)>,
}

impl IndexDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.moved.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    locations: BTreeMap<IdentityKey, Vec<Location>>,
}

impl ConflictIndex {
    pub fn build(sets: &StateSets) -> Self {
        let mut locations: BTreeMap<IdentityKey, Vec<Location>> = BTreeMap::new();
        for (state, set) in sets.iter() {
            for (row, mapping) in set.iter().enumerate() {
                locations
                    .entry(mapping.identity_key())
                    .or_default()
                    .push(Location { state, row });
            }
        }
        Self { locations }
    }

    pub fn locations(&self, key: &IdentityKey) -> &[Location] {
        self.locations.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Distinct states holding `key`, in state order.
    pub fn states(&self, key: &IdentityKey) -> Vec<CurationState> {
        let states: BTreeSet<CurationState> =
            self.locations(key).iter().map(|l| l.state).collect();
        states.into_iter().collect()
    }

    pub fn curated_states(&self, key: &IdentityKey) -> Vec<CurationState> {
        self.states(key)
            .into_iter()
            .filter(CurationState::is_curated)
            .collect()
    }

    pub fn is_predicted(&self, key: &IdentityKey) -> bool {
        self.locations(key)
            .iter()
            .any(|l| l.state == CurationState::Predictions)
    }

    /// The single curated state of `key`, if any.
    ///
    /// Fails with `StateCollision` when the key is curated more than once.
    pub fn curated_state(&self, key: &IdentityKey) -> Result<Option<CurationState>> {
        let states = self.curated_states(key);
        match states.as_slice() {
            [] => Ok(None),
            [state] => Ok(Some(*state)),
            _ => Err(CuratorError::StateCollision {
                key: key.clone(),
                states,
            }),
        }
    }

    /// Check candidates destined for `target` against the index.
    ///
    /// Curated states other than `target` count as conflicts; when `target`
    /// is predictions every curated state counts, as do existing predictions
    /// and repeats earlier in the same batch.
    pub fn find_conflicts<'a, I, K>(
        &self,
        candidates: I,
        target: CurationState,
    ) -> Result<Vec<ConflictReport>>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a + ?Sized,
        &'a K: Into<IdentityKey>,
    {
        let mut seen: HashSet<IdentityKey> = HashSet::new();
        let mut reports = Vec::new();

        for candidate in candidates {
            let key: IdentityKey = candidate.into();
            let conflict = match self.curated_state(&key)? {
                Some(state) if !target.is_curated() || state != target => {
                    ConflictKind::AlreadyCurated { state }
                }
                _ if target == CurationState::Predictions
                    && (self.is_predicted(&key) || seen.contains(&key)) =>
                {
                    ConflictKind::AlreadyPredicted
                }
                _ => ConflictKind::NoConflict,
            };
            if target == CurationState::Predictions {
                seen.insert(key.clone());
            }
            reports.push(ConflictReport { key, conflict });
        }

        Ok(reports)
    }

    /// Check that each touched key sits in at most one curated state and is
    /// not also predicted once curated.
    pub fn verify(&self, keys: &[IdentityKey]) -> Result<()> {
        for key in keys {
            if let Some(state) = self.curated_state(key)? {
                if self.is_predicted(key) {
                    return Err(CuratorError::AlreadyCurated {
                        key: key.clone(),
                        state,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn diff(old: &ConflictIndex, new: &ConflictIndex) -> IndexDiff {
        let mut diff = IndexDiff::default();
        for key in new.locations.keys() {
            if !old.locations.contains_key(key) {
                diff.added.push(key.clone());
            }
        }
        for key in old.locations.keys() {
            if !new.locations.contains_key(key) {
                diff.removed.push(key.clone());
                continue;
            }
            let before = old.states(key);
            let after = new.states(key);
            if before != after {
                diff.moved.push((key.clone(), before, after));
            }
        }
        diff
    }
}

/// A problem found by [`issues`] in the files of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    DuplicateIdentity {
        state: CurationState,
        key: IdentityKey,
        count: usize,
    },
    StateCollision {
        key: IdentityKey,
        states: Vec<CurationState>,
    },
    CuratedStillPredicted {
        key: IdentityKey,
        state: CurationState,
    },
    MissingCurator {
        state: CurationState,
        key: IdentityKey,
    },
    MissingJustification {
        state: CurationState,
        key: IdentityKey,
    },
    MissingMappingTool {
        key: IdentityKey,
    },
    UnexpectedCurator {
        key: IdentityKey,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DuplicateIdentity { state, key, count } => {
                write!(f, "{} appears {} times in {}", key, count, state)
            }
            IntegrityIssue::StateCollision { key, states } => {
                let names: Vec<&str> = states.iter().map(|s| s.as_str()).collect();
                write!(f, "{} is curated as {}", key, names.join(" and "))
            }
            IntegrityIssue::CuratedStillPredicted { key, state } => {
                write!(f, "{} is curated as {} but still predicted", key, state)
            }
            IntegrityIssue::MissingCurator { state, key } => {
                write!(f, "{} in {} has no curator", key, state)
            }
            IntegrityIssue::MissingJustification { state, key } => {
                write!(f, "{} in {} has no justification", key, state)
            }
            IntegrityIssue::MissingMappingTool { key } => {
                write!(f, "prediction {} has no mapping tool", key)
            }
            IntegrityIssue::UnexpectedCurator { key } => {
                write!(f, "prediction {} carries a curator", key)
            }
        }
    }
}

/// Collect every integrity problem across the four sets.
pub fn issues(sets: &StateSets) -> Vec<IntegrityIssue> {
    let index = ConflictIndex::build(sets);
    let mut issues = Vec::new();

    for (key, locations) in &index.locations {
        for state in CurationState::ALL {
            let count = locations.iter().filter(|l| l.state == state).count();
            if count > 1 {
                issues.push(IntegrityIssue::DuplicateIdentity {
                    state,
                    key: key.clone(),
                    count,
                });
            }
        }

        let curated = index.curated_states(key);
        if curated.len() > 1 {
            issues.push(IntegrityIssue::StateCollision {
                key: key.clone(),
                states: curated.clone(),
            });
        }
        if let Some(&state) = curated.first() {
            if index.is_predicted(key) {
                issues.push(IntegrityIssue::CuratedStillPredicted {
                    key: key.clone(),
                    state,
                });
            }
        }
    }

    for (state, set) in sets.iter() {
        for mapping in set.iter() {
            let key = mapping.identity_key();
            if mapping.justification().is_none() {
                issues.push(IntegrityIssue::MissingJustification {
                    state,
                    key: key.clone(),
                });
            }
            if state.is_curated() {
                if mapping.curator().is_none() {
                    issues.push(IntegrityIssue::MissingCurator { state, key });
                }
            } else if mapping.curator().is_some() {
                issues.push(IntegrityIssue::UnexpectedCurator { key });
            } else if mapping.mapping_tool().is_none() {
                issues.push(IntegrityIssue::MissingMappingTool { key });
            }
        }
    }

    issues
}
