//! Curation states, decisions and the four-set aggregate.

use crate::config::Vocabulary;
use crate::model::{MappingSet, Reference};
use crate::{CuratorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role a mapping set plays in a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurationState {
    Predictions,
    Positive,
    Negative,
    Unsure,
}

impl CurationState {
    pub const ALL: [CurationState; 4] = [
        CurationState::Predictions,
        CurationState::Positive,
        CurationState::Negative,
        CurationState::Unsure,
    ];

    pub const CURATED: [CurationState; 3] = [
        CurationState::Positive,
        CurationState::Negative,
        CurationState::Unsure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurationState::Predictions => "predictions",
            CurationState::Positive => "positive",
            CurationState::Negative => "negative",
            CurationState::Unsure => "unsure",
        }
    }

    pub fn is_curated(&self) -> bool {
        !matches!(self, CurationState::Predictions)
    }

    fn index(&self) -> usize {
        match self {
            CurationState::Predictions => 0,
            CurationState::Positive => 1,
            CurationState::Negative => 2,
            CurationState::Unsure => 3,
        }
    }
}

impl fmt::Display for CurationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurationState {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "predictions" | "predicted" => Ok(CurationState::Predictions),
            "positive" | "positives" => Ok(CurationState::Positive),
            "negative" | "negatives" => Ok(CurationState::Negative),
            "unsure" => Ok(CurationState::Unsure),
            other => Err(CuratorError::validation(
                "state",
                format!("unknown curation state {:?}", other),
            )),
        }
    }
}

/// A terminal curation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Positive,
    Negative,
    Unsure,
}

impl Decision {
    pub fn state(&self) -> CurationState {
        match self {
            Decision::Positive => CurationState::Positive,
            Decision::Negative => CurationState::Negative,
            Decision::Unsure => CurationState::Unsure,
        }
    }
}

impl From<Decision> for CurationState {
    fn from(decision: Decision) -> Self {
        decision.state()
    }
}

impl FromStr for Decision {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<CurationState>()? {
            CurationState::Positive => Ok(Decision::Positive),
            CurationState::Negative => Ok(Decision::Negative),
            CurationState::Unsure => Ok(Decision::Unsure),
            CurationState::Predictions => Err(CuratorError::validation(
                "decision",
                "predictions is not a curation decision",
            )),
        }
    }
}

/// A reviewer's verdict as given in a review surface.
///
/// `Broad` and `Narrow` accept the mapping with a rewritten predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Correct,
    Broad,
    Narrow,
    Incorrect,
    Unsure,
}

impl Mark {
    pub fn decision(&self) -> Decision {
        match self {
            Mark::Correct | Mark::Broad | Mark::Narrow => Decision::Positive,
            Mark::Incorrect => Decision::Negative,
            Mark::Unsure => Decision::Unsure,
        }
    }

    /// Predicate the curated record is stored under, if it changes.
    pub fn predicate(&self) -> Option<Reference> {
        let curie = match self {
            Mark::Broad => Vocabulary::BROAD_MATCH,
            Mark::Narrow => Vocabulary::NARROW_MATCH,
            _ => return None,
        };
        Reference::parse(curie).ok()
    }
}

impl FromStr for Mark {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "correct" | "yup" => Ok(Mark::Correct),
            "broad" | "BROAD" => Ok(Mark::Broad),
            "narrow" | "NARROW" => Ok(Mark::Narrow),
            "incorrect" | "nope" => Ok(Mark::Incorrect),
            "unsure" => Ok(Mark::Unsure),
            other => Err(CuratorError::validation(
                "mark",
                format!("unknown mark {:?}", other),
            )),
        }
    }
}

/// The four mapping sets of a project, one per [`CurationState`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateSets {
    sets: [MappingSet; 4],
}

impl StateSets {
    /// Build all four sets, stopping at the first failure.
    pub fn try_from_fn<F>(mut f: F) -> Result<Self>
    where
        F: FnMut(CurationState) -> Result<MappingSet>,
    {
        let [predictions, positive, negative, unsure] = CurationState::ALL;
        Ok(Self {
            sets: [f(predictions)?, f(positive)?, f(negative)?, f(unsure)?],
        })
    }

    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(CurationState) -> MappingSet,
    {
        Self {
            sets: CurationState::ALL.map(&mut f),
        }
    }

    pub fn get(&self, state: CurationState) -> &MappingSet {
        &self.sets[state.index()]
    }

    pub fn get_mut(&mut self, state: CurationState) -> &mut MappingSet {
        &mut self.sets[state.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurationState, &MappingSet)> {
        CurationState::ALL.into_iter().zip(self.sets.iter())
    }

    /// Total number of rows across all four sets.
    pub fn total(&self) -> usize {
        self.sets.iter().map(MappingSet::len).sum()
    }
}
