//! Compact URIs (CURIEs) for subjects, objects, predicates and curators.

use crate::{CuratorError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Valid CURIE prefix: a letter or underscore followed by word characters, dots or dashes.
static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

/// A `prefix:identifier` reference into a controlled vocabulary.
///
/// Comparison is case-sensitive on both parts. Registry validation of the
/// prefix is out of scope; only the syntax is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    prefix: String,
    identifier: String,
}

impl Reference {
    /// Build a reference from its parts.
    pub fn new(prefix: impl Into<String>, identifier: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let identifier = identifier.into();

        if prefix.is_empty() {
            return Err(CuratorError::validation("prefix", "prefix is empty"));
        }
        if !PREFIX_PATTERN.is_match(&prefix) {
            return Err(CuratorError::validation(
                "prefix",
                format!("invalid prefix {:?}", prefix),
            ));
        }
        if identifier.is_empty() {
            return Err(CuratorError::validation(
                "identifier",
                format!("identifier is empty for prefix {:?}", prefix),
            ));
        }
        if identifier.chars().any(char::is_whitespace) {
            return Err(CuratorError::validation(
                "identifier",
                format!("identifier {:?} contains whitespace", identifier),
            ));
        }

        Ok(Self { prefix, identifier })
    }

    /// Parse a CURIE, splitting on the first `:`.
    pub fn parse(curie: &str) -> Result<Self> {
        Self::parse_field(curie, "curie")
    }

    /// Parse a CURIE, reporting failures against the given field name.
    pub fn parse_field(curie: &str, field: &str) -> Result<Self> {
        let (prefix, identifier) = curie.split_once(':').ok_or_else(|| {
            CuratorError::validation(field, format!("{:?} is not a prefix:identifier CURIE", curie))
        })?;
        Self::new(prefix, identifier).map_err(|e| match e {
            CuratorError::Validation { message, .. } => CuratorError::validation(field, message),
            other => other,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn curie(&self) -> String {
        format!("{}:{}", self.prefix, self.identifier)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.identifier)
    }
}

impl FromStr for Reference {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Reference {
    type Error = CuratorError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        value.curie()
    }
}

/// A reference with an optional human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedReference {
    pub reference: Reference,
    pub name: Option<String>,
}

impl NamedReference {
    pub fn new(reference: Reference, name: Option<String>) -> Self {
        Self {
            reference,
            name: name.filter(|n| !n.is_empty()),
        }
    }

    /// Parse a CURIE with an optional label.
    pub fn parse(curie: &str, name: Option<&str>) -> Result<Self> {
        Ok(Self::new(Reference::parse(curie)?, name.map(String::from)))
    }

    pub fn prefix(&self) -> &str {
        self.reference.prefix()
    }

    pub fn curie(&self) -> String {
        self.reference.curie()
    }
}

impl From<Reference> for NamedReference {
    fn from(reference: Reference) -> Self {
        Self {
            reference,
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_curie() {
        let r = Reference::parse("chebi:28646").unwrap();
        assert_eq!(r.prefix(), "chebi");
        assert_eq!(r.identifier(), "28646");
        assert_eq!(r.to_string(), "chebi:28646");
    }

    #[test]
    fn test_identifier_keeps_later_colons() {
        let r = Reference::parse("obo:GO:0008150").unwrap();
        assert_eq!(r.prefix(), "obo");
        assert_eq!(r.identifier(), "GO:0008150");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(Reference::parse(":123").is_err());
        assert!(Reference::parse("mesh:").is_err());
        assert!(Reference::parse("mesh").is_err());
        assert!(Reference::parse("mesh:C 1").is_err());
        assert!(Reference::parse(" mesh:C1").is_err());
        assert!(Reference::parse("1mesh:C1").is_err());
    }

    #[test]
    fn test_parse_field_reports_field() {
        let err = Reference::parse_field("nope", "subject_id").unwrap_err();
        match err {
            CuratorError::Validation { field, .. } => assert_eq!(field, "subject_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(
            Reference::parse("mesh:c1").unwrap(),
            Reference::parse("mesh:C1").unwrap()
        );
    }

    #[test]
    fn test_serde_as_string() {
        let r = Reference::parse("orcid:0000-0003-4423-4370").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"orcid:0000-0003-4423-4370\"");
        let back: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert!(serde_json::from_str::<Reference>("\"broken\"").is_err());
    }

    #[test]
    fn test_empty_label_is_absent() {
        let n = NamedReference::parse("ex:1", Some("")).unwrap();
        assert!(n.name.is_none());
    }
}
