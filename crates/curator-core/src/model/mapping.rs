//! The semantic mapping record and its identity key.

use super::reference::{NamedReference, Reference};
use crate::{CuratorError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A confidence score in `[0, 1]`.
///
/// Keeps the text it was parsed from so a file can be written back
/// byte-for-byte; equality and ordering use the numeric value only.
#[derive(Debug, Clone)]
pub struct Confidence {
    value: f64,
    text: String,
}

impl Confidence {
    pub fn new(value: f64) -> Result<Self> {
        Self::check(value)?;
        Ok(Self {
            value,
            text: value.to_string(),
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value: f64 = text.parse().map_err(|_| {
            CuratorError::validation("confidence", format!("{:?} is not a number", text))
        })?;
        Self::check(value)?;
        Ok(Self {
            value,
            text: text.to_string(),
        })
    }

    fn check(value: f64) -> Result<()> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(CuratorError::validation(
                "confidence",
                format!("{} is outside [0, 1]", value),
            ));
        }
        Ok(())
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Confidence {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Negation of the predicate (SSSOM `predicate_modifier`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateModifier {
    Not,
}

impl PredicateModifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateModifier::Not => "Not",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Not" => Ok(PredicateModifier::Not),
            other => Err(CuratorError::validation(
                "predicate_modifier",
                format!("unknown predicate modifier {:?}", other),
            )),
        }
    }
}

/// The `(subject, predicate, object)` triple used for deduplication.
///
/// Labels, confidence and provenance are not part of identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl IdentityKey {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into().trim().to_string(),
            predicate: predicate.into().trim().to_string(),
            object: object.into().trim().to_string(),
        }
    }

    /// Stable digest usable as a record id (`sha256:<hex>`).
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.subject.as_bytes());
        hasher.update(b"\t");
        hasher.update(self.predicate.as_bytes());
        hasher.update(b"\t");
        hasher.update(self.object.as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

impl FromStr for IdentityKey {
    type Err = CuratorError;

    /// Parse the whitespace-separated `subject predicate object` form.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [subject, predicate, object] => Ok(Self::new(*subject, *predicate, *object)),
            _ => Err(CuratorError::validation(
                "identity",
                format!("expected `subject predicate object`, got {:?}", s),
            )),
        }
    }
}

impl From<&SemanticMapping> for IdentityKey {
    fn from(mapping: &SemanticMapping) -> Self {
        mapping.identity_key()
    }
}

impl From<&IdentityKey> for IdentityKey {
    fn from(key: &IdentityKey) -> Self {
        key.clone()
    }
}

/// One semantic mapping plus its evidence and provenance.
///
/// Values are built once and then only transformed through consuming
/// `with_*` methods, so a record read from one file never changes under a
/// caller holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMapping {
    subject: NamedReference,
    predicate: Reference,
    predicate_modifier: Option<PredicateModifier>,
    object: NamedReference,
    justification: Option<Reference>,
    confidence: Option<Confidence>,
    mapping_tool: Option<String>,
    curator: Option<Reference>,
    mapping_date: Option<String>,
    comment: Option<String>,
    see_also: Vec<String>,
    extensions: BTreeMap<String, String>,
}

impl SemanticMapping {
    pub fn new(
        subject: impl Into<NamedReference>,
        predicate: Reference,
        object: impl Into<NamedReference>,
        justification: Reference,
    ) -> Self {
        Self::from_parts(subject.into(), predicate, object.into(), Some(justification))
    }

    /// Build a mapping from CURIE strings, validating every reference.
    pub fn from_curies(
        subject: &str,
        predicate: &str,
        object: &str,
        justification: &str,
    ) -> Result<Self> {
        if predicate.is_empty() {
            return Err(CuratorError::validation("predicate_id", "predicate is empty"));
        }
        Ok(Self::new(
            Reference::parse_field(subject, "subject_id")?,
            Reference::parse_field(predicate, "predicate_id")?,
            Reference::parse_field(object, "object_id")?,
            Reference::parse_field(justification, "mapping_justification")?,
        ))
    }

    /// Assemble a record from already-parsed columns (used by the TSV reader).
    pub(crate) fn from_parts(
        subject: NamedReference,
        predicate: Reference,
        object: NamedReference,
        justification: Option<Reference>,
    ) -> Self {
        Self {
            subject,
            predicate,
            predicate_modifier: None,
            object,
            justification,
            confidence: None,
            mapping_tool: None,
            curator: None,
            mapping_date: None,
            comment: None,
            see_also: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Check the record is complete enough to be stored.
    ///
    /// References and confidence are validated when they are set, so this
    /// only has to look at fields that may be missing in hand-edited files.
    pub fn validate(&self) -> Result<()> {
        if self.justification.is_none() {
            return Err(CuratorError::validation(
                "mapping_justification",
                format!("missing justification for {}", self.identity_key()),
            ));
        }
        Ok(())
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(
            self.subject.curie(),
            self.predicate.curie(),
            self.object.curie(),
        )
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn subject(&self) -> &NamedReference {
        &self.subject
    }

    pub fn predicate(&self) -> &Reference {
        &self.predicate
    }

    pub fn predicate_modifier(&self) -> Option<PredicateModifier> {
        self.predicate_modifier
    }

    pub fn object(&self) -> &NamedReference {
        &self.object
    }

    pub fn justification(&self) -> Option<&Reference> {
        self.justification.as_ref()
    }

    pub fn confidence(&self) -> Option<&Confidence> {
        self.confidence.as_ref()
    }

    pub fn mapping_tool(&self) -> Option<&str> {
        self.mapping_tool.as_deref()
    }

    pub fn curator(&self) -> Option<&Reference> {
        self.curator.as_ref()
    }

    pub fn mapping_date(&self) -> Option<&str> {
        self.mapping_date.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn see_also(&self) -> &[String] {
        &self.see_also
    }

    /// Cells of columns the store does not model, keyed by column name.
    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }

    // ========================================
    // Builders
    // ========================================

    pub fn with_subject_label(mut self, label: impl Into<String>) -> Self {
        self.subject.name = Some(label.into()).filter(|l| !l.is_empty());
        self
    }

    pub fn with_object_label(mut self, label: impl Into<String>) -> Self {
        self.object.name = Some(label.into()).filter(|l| !l.is_empty());
        self
    }

    pub fn with_predicate(mut self, predicate: Reference) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn with_predicate_modifier(mut self, modifier: Option<PredicateModifier>) -> Self {
        self.predicate_modifier = modifier;
        self
    }

    pub fn with_justification(mut self, justification: Reference) -> Self {
        self.justification = Some(justification);
        self
    }

    /// Attach a confidence score; fails outside `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        self.confidence = Some(Confidence::new(confidence)?);
        Ok(self)
    }

    pub(crate) fn with_parsed_confidence(mut self, confidence: Option<Confidence>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_mapping_tool(mut self, tool: impl Into<String>) -> Self {
        self.mapping_tool = Some(tool.into()).filter(|t| !t.is_empty());
        self
    }

    pub fn with_curator(mut self, curator: Reference) -> Self {
        self.curator = Some(curator);
        self
    }

    pub fn with_mapping_date(mut self, date: impl Into<String>) -> Self {
        self.mapping_date = Some(date.into()).filter(|d| !d.is_empty());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into()).filter(|c| !c.is_empty());
        self
    }

    /// Links are kept as given, empty segments included, so a parsed
    /// `see_also` cell renders back unchanged.
    pub fn with_see_also(mut self, links: Vec<String>) -> Self {
        self.see_also = links;
        self
    }

    pub fn with_extension(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.extensions.insert(column.into(), value);
        }
        self
    }

    /// Stamp a curation decision onto this record.
    ///
    /// Prediction evidence (confidence, mapping tool) is dropped: a curated
    /// record is justified by the curator, not by the generator.
    pub fn curated(
        self,
        curator: Reference,
        justification: Reference,
        date: Option<String>,
    ) -> Self {
        Self {
            curator: Some(curator),
            justification: Some(justification),
            confidence: None,
            mapping_tool: None,
            mapping_date: date,
            ..self
        }
    }

    /// Merge evidence from another record with the same identity.
    ///
    /// Fields present on `other` win; absent fields keep their current value.
    /// See-also links are unioned and extension cells are overlaid.
    pub fn merge_evidence(&mut self, other: &SemanticMapping) -> Result<()> {
        if self.identity_key() != other.identity_key() {
            return Err(CuratorError::validation(
                "identity",
                format!(
                    "cannot merge {} into {}",
                    other.identity_key(),
                    self.identity_key()
                ),
            ));
        }

        if other.subject.name.is_some() {
            self.subject.name = other.subject.name.clone();
        }
        if other.object.name.is_some() {
            self.object.name = other.object.name.clone();
        }
        if other.predicate_modifier.is_some() {
            self.predicate_modifier = other.predicate_modifier;
        }
        if other.justification.is_some() {
            self.justification = other.justification.clone();
        }
        if other.confidence.is_some() {
            self.confidence = other.confidence.clone();
        }
        if other.mapping_tool.is_some() {
            self.mapping_tool = other.mapping_tool.clone();
        }
        if other.curator.is_some() {
            self.curator = other.curator.clone();
        }
        if other.mapping_date.is_some() {
            self.mapping_date = other.mapping_date.clone();
        }
        if other.comment.is_some() {
            self.comment = other.comment.clone();
        }
        for link in &other.see_also {
            if !self.see_also.contains(link) {
                self.see_also.push(link.clone());
            }
        }
        for (column, value) in &other.extensions {
            self.extensions.insert(column.clone(), value.clone());
        }
        Ok(())
    }
}
