//! Filtering, sorting and paging of predictions for review surfaces.
//!
//! Text filters are case-insensitive substring matches.

use crate::config::Vocabulary;
use crate::model::SemanticMapping;
use crate::repository::{CurationState, Repository};
use crate::{CuratorError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Increasing confidence.
    Asc,
    /// Decreasing confidence.
    Desc,
    /// By subject CURIE.
    Subject,
    /// By object CURIE.
    Object,
}

impl FromStr for SortOrder {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            "subject" => Ok(SortOrder::Subject),
            "object" => Ok(SortOrder::Object),
            other => Err(CuratorError::validation(
                "sort",
                format!("unknown sort order {:?}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionQuery {
    /// Substring of subject/object CURIE or label, or mapping tool.
    pub query: Option<String>,
    pub subject_query: Option<String>,
    pub subject_prefix: Option<String>,
    pub object_query: Option<String>,
    pub object_prefix: Option<String>,
    /// Substring of either CURIE.
    pub prefix: Option<String>,
    pub mapping_tool: Option<String>,
    /// Only exact matches whose subject and object labels agree.
    pub same_text: bool,
    /// Only mappings whose subject or object is one of these CURIEs.
    pub targets: Option<BTreeSet<String>>,
    pub sort: Option<SortOrder>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

fn contains(needle: &str, haystacks: &[Option<&str>]) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
}

impl PredictionQuery {
    /// Whether `mapping` passes every filter. Sorting and paging are ignored.
    pub fn matches(&self, mapping: &SemanticMapping) -> bool {
        let subject = mapping.subject().curie();
        let object = mapping.object().curie();
        let subject_label = mapping.subject().name.as_deref();
        let object_label = mapping.object().name.as_deref();

        if let Some(targets) = &self.targets {
            if !targets.contains(&subject) && !targets.contains(&object) {
                return false;
            }
        }

        let checks = [
            (
                &self.query,
                vec![
                    Some(subject.as_str()),
                    subject_label,
                    Some(object.as_str()),
                    object_label,
                    mapping.mapping_tool(),
                ],
            ),
            (&self.subject_prefix, vec![Some(subject.as_str())]),
            (&self.subject_query, vec![Some(subject.as_str()), subject_label]),
            (&self.object_query, vec![Some(object.as_str()), object_label]),
            (&self.object_prefix, vec![Some(object.as_str())]),
            (&self.prefix, vec![Some(subject.as_str()), Some(object.as_str())]),
            (&self.mapping_tool, vec![mapping.mapping_tool()]),
        ];
        for (needle, haystacks) in checks {
            if let Some(needle) = needle {
                if !contains(needle, &haystacks) {
                    return false;
                }
            }
        }

        if self.same_text {
            let same = match (subject_label, object_label) {
                (Some(s), Some(o)) => s.to_lowercase() == o.to_lowercase(),
                _ => false,
            };
            if !same || mapping.predicate().curie() != Vocabulary::EXACT_MATCH {
                return false;
            }
        }
        true
    }

    /// Filter, sort and page `mappings`.
    pub fn apply<'a>(
        &self,
        mappings: impl IntoIterator<Item = &'a SemanticMapping>,
    ) -> Vec<&'a SemanticMapping> {
        let mut selected: Vec<&SemanticMapping> =
            mappings.into_iter().filter(|m| self.matches(m)).collect();

        if let Some(order) = self.sort {
            let confidence = |m: &SemanticMapping| m.confidence().map_or(0.0, |c| c.value());
            match order {
                SortOrder::Asc => selected.sort_by(|a, b| {
                    confidence(a)
                        .partial_cmp(&confidence(b))
                        .unwrap_or(Ordering::Equal)
                }),
                SortOrder::Desc => selected.sort_by(|a, b| {
                    confidence(b)
                        .partial_cmp(&confidence(a))
                        .unwrap_or(Ordering::Equal)
                }),
                SortOrder::Subject => selected.sort_by_key(|m| m.subject().curie()),
                SortOrder::Object => selected.sort_by_key(|m| m.object().curie()),
            }
        }

        selected
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn count<'a>(&self, mappings: impl IntoIterator<Item = &'a SemanticMapping>) -> usize {
        mappings.into_iter().filter(|m| self.matches(m)).count()
    }
}

/// Number of mappings per (subject prefix, object prefix) pair.
pub fn prefix_counts<'a>(
    mappings: impl IntoIterator<Item = &'a SemanticMapping>,
) -> BTreeMap<(String, String), usize> {
    let mut counts = BTreeMap::new();
    for mapping in mappings {
        let pair = (
            mapping.subject().prefix().to_string(),
            mapping.object().prefix().to_string(),
        );
        *counts.entry(pair).or_insert(0) += 1;
    }
    counts
}

impl Repository {
    /// Predictions matching `query`, sorted and paged.
    pub fn predictions(&self, query: &PredictionQuery) -> Result<Vec<SemanticMapping>> {
        let set = self.load_state(CurationState::Predictions)?;
        Ok(query.apply(set.iter()).into_iter().cloned().collect())
    }

    /// Number of predictions passing the filters of `query`.
    pub fn count_predictions(&self, query: &PredictionQuery) -> Result<usize> {
        let set = self.load_state(CurationState::Predictions)?;
        Ok(query.count(set.iter()))
    }

    pub fn prefix_counts(&self, query: &PredictionQuery) -> Result<BTreeMap<(String, String), usize>> {
        let set = self.load_state(CurationState::Predictions)?;
        Ok(prefix_counts(set.iter().filter(|m| query.matches(m))))
    }
}
