//! Ordered collections of mappings plus set-level metadata.

use super::mapping::{IdentityKey, SemanticMapping};
use crate::config::ColumnNames;
use serde::{Deserialize, Serialize};

/// Set-level metadata carried in the SSSOM header.
///
/// Serializes under the SSSOM slot names, so the JSON form is SSSOM metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSetMetadata {
    #[serde(rename = "mapping_set_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "mapping_set_title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "mapping_set_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(
        rename = "mapping_set_description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(rename = "creator_id", default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

impl MappingSetMetadata {
    /// Header keys in the order they are written for new sets.
    const KEYS: [&'static str; 6] = [
        "mapping_set_id",
        "mapping_set_title",
        "mapping_set_version",
        "license",
        "mapping_set_description",
        "creator_id",
    ];

    fn field(&self, key: &str) -> Option<&String> {
        match key {
            "mapping_set_id" => self.id.as_ref(),
            "mapping_set_title" => self.title.as_ref(),
            "mapping_set_version" => self.version.as_ref(),
            "license" => self.license.as_ref(),
            "mapping_set_description" => self.description.as_ref(),
            "creator_id" => self.creator.as_ref(),
            _ => None,
        }
    }

    /// Fill unset fields from `defaults`.
    pub fn or(mut self, defaults: &MappingSetMetadata) -> Self {
        self.id = self.id.or_else(|| defaults.id.clone());
        self.title = self.title.or_else(|| defaults.title.clone());
        self.version = self.version.or_else(|| defaults.version.clone());
        self.license = self.license.or_else(|| defaults.license.clone());
        self.description = self.description.or_else(|| defaults.description.clone());
        self.creator = self.creator.or_else(|| defaults.creator.clone());
        self
    }
}

/// One `#` line of the metadata header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderLine {
    raw: String,
    /// Parsed `key: value` when the line is a top-level scalar.
    entry: Option<(String, String)>,
}

impl HeaderLine {
    fn parse(raw: String) -> Self {
        let entry = raw.strip_prefix('#').and_then(parse_scalar);
        Self { raw, entry }
    }

    fn scalar(key: &str, value: &str) -> Self {
        Self {
            raw: format!("#{}: {}", key, value),
            entry: Some((key.to_string(), value.to_string())),
        }
    }
}

fn parse_scalar(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key_ok = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let value = value.trim();
    if !key_ok || value.is_empty() {
        return None;
    }
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key.to_string(), value.to_string()))
}

/// The `#`-prefixed metadata block of an SSSOM file.
///
/// Lines are kept verbatim; only lines touched through [`MetadataHeader::set`]
/// are re-rendered, so untouched headers survive a load/save cycle unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataHeader {
    lines: Vec<HeaderLine>,
}

impl MetadataHeader {
    pub fn from_metadata(metadata: &MappingSetMetadata) -> Self {
        let mut header = Self::default();
        for key in MappingSetMetadata::KEYS {
            if let Some(value) = metadata.field(key) {
                header.set(key, value);
            }
        }
        header
    }

    /// Append a raw line (including its leading `#`).
    pub fn push_raw(&mut self, raw: impl Into<String>) {
        self.lines.push(HeaderLine::parse(raw.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match &line.entry {
            Some((k, v)) if k == key => Some(v.as_str()),
            _ => None,
        })
    }

    /// Set a scalar, replacing the existing line or appending a new one.
    pub fn set(&mut self, key: &str, value: &str) {
        let replacement = HeaderLine::scalar(key, value);
        match self
            .lines
            .iter_mut()
            .find(|line| matches!(&line.entry, Some((k, _)) if k == key))
        {
            Some(line) => {
                if line.entry.as_ref().map(|(_, v)| v.as_str()) != Some(value) {
                    *line = replacement;
                }
            }
            None => self.lines.push(replacement),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.raw.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn metadata(&self) -> MappingSetMetadata {
        let get = |key: &str| self.get(key).map(String::from);
        MappingSetMetadata {
            id: get("mapping_set_id"),
            title: get("mapping_set_title"),
            version: get("mapping_set_version"),
            license: get("license"),
            description: get("mapping_set_description"),
            creator: get("creator_id"),
        }
    }
}

/// Line layout of a set's text, kept so a load/save cycle reproduces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextLayout {
    pub(crate) crlf: bool,
    /// Line breaks after the last line, verbatim.
    pub(crate) tail: String,
}

impl TextLayout {
    pub(crate) fn line_ending(&self) -> &'static str {
        if self.crlf {
            "\r\n"
        } else {
            "\n"
        }
    }
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            crlf: false,
            tail: "\n".to_string(),
        }
    }
}

/// A named, ordered collection of mappings backing one curation state.
///
/// Rows loaded from disk are kept as-is, duplicates included, so integrity
/// checks can report them; every insertion path skips identities that are
/// already present.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingSet {
    header: MetadataHeader,
    columns: Vec<String>,
    mappings: Vec<SemanticMapping>,
    layout: TextLayout,
}

impl MappingSet {
    /// Create an empty set with the stub column layout.
    pub fn new(metadata: &MappingSetMetadata) -> Self {
        Self::with_columns(
            metadata,
            ColumnNames::STUB.iter().map(|c| c.to_string()).collect(),
        )
    }

    pub fn with_columns(metadata: &MappingSetMetadata, columns: Vec<String>) -> Self {
        Self {
            header: MetadataHeader::from_metadata(metadata),
            columns,
            mappings: Vec::new(),
            layout: TextLayout::default(),
        }
    }

    pub(crate) fn from_parts(
        header: MetadataHeader,
        columns: Vec<String>,
        mappings: Vec<SemanticMapping>,
        layout: TextLayout,
    ) -> Self {
        Self {
            header,
            columns,
            mappings,
            layout,
        }
    }

    pub fn metadata(&self) -> MappingSetMetadata {
        self.header.metadata()
    }

    pub fn header(&self) -> &MetadataHeader {
        &self.header
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn mappings(&self) -> &[SemanticMapping] {
        &self.mappings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SemanticMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub(crate) fn layout(&self) -> &TextLayout {
        &self.layout
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.position(key).is_some()
    }

    pub fn position(&self, key: &IdentityKey) -> Option<usize> {
        self.mappings.iter().position(|m| &m.identity_key() == key)
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&SemanticMapping> {
        self.position(key).map(|i| &self.mappings[i])
    }

    /// Append a mapping unless its identity is already present.
    ///
    /// Returns `true` when the mapping was added.
    pub fn push_unique(&mut self, mapping: SemanticMapping) -> bool {
        if self.contains(&mapping.identity_key()) {
            return false;
        }
        self.ensure_columns(&mapping);
        self.mappings.push(mapping);
        true
    }

    /// Append mappings in order, skipping known identities. Returns the number added.
    pub fn extend_unique(&mut self, mappings: impl IntoIterator<Item = SemanticMapping>) -> usize {
        let mut added = 0;
        for mapping in mappings {
            if self.push_unique(mapping) {
                added += 1;
            }
        }
        added
    }

    /// Insert a new mapping, or merge its evidence into the existing row.
    ///
    /// Returns `true` when a new row was added.
    pub fn upsert(&mut self, mapping: SemanticMapping) -> crate::Result<bool> {
        match self.position(&mapping.identity_key()) {
            Some(i) => {
                self.mappings[i].merge_evidence(&mapping)?;
                let merged = self.mappings[i].clone();
                self.ensure_columns(&merged);
                Ok(false)
            }
            None => Ok(self.push_unique(mapping)),
        }
    }

    /// Replace the row for `mapping`'s identity in place, or append it.
    ///
    /// Extra rows with the same identity are dropped.
    pub fn replace(&mut self, mapping: SemanticMapping) {
        let key = mapping.identity_key();
        match self.position(&key) {
            Some(i) => {
                self.ensure_columns(&mapping);
                self.mappings[i] = mapping;
                let mut seen = false;
                self.mappings.retain(|m| {
                    if m.identity_key() != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => {
                self.push_unique(mapping);
            }
        }
    }

    /// Remove every row with this identity, returning the removed rows.
    pub fn remove(&mut self, key: &IdentityKey) -> Vec<SemanticMapping> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.mappings)
            .into_iter()
            .partition(|m| &m.identity_key() == key);
        self.mappings = kept;
        removed
    }

    /// Make sure every populated field of `mapping` has a column to live in.
    fn ensure_columns(&mut self, mapping: &SemanticMapping) {
        let needed = populated_columns(mapping);
        for column in needed {
            if !self.columns.iter().any(|c| c == &column) {
                self.columns.push(column);
            }
        }
    }
}

/// Columns that carry a value for this mapping, known columns first.
fn populated_columns(mapping: &SemanticMapping) -> Vec<String> {
    let mut columns: Vec<String> = vec![
        ColumnNames::SUBJECT_ID.to_string(),
        ColumnNames::PREDICATE_ID.to_string(),
        ColumnNames::OBJECT_ID.to_string(),
    ];
    let mut add = |present: bool, name: &str| {
        if present {
            columns.push(name.to_string());
        }
    };
    add(mapping.subject().name.is_some(), ColumnNames::SUBJECT_LABEL);
    add(
        mapping.predicate_modifier().is_some(),
        ColumnNames::PREDICATE_MODIFIER,
    );
    add(mapping.object().name.is_some(), ColumnNames::OBJECT_LABEL);
    add(
        mapping.justification().is_some(),
        ColumnNames::MAPPING_JUSTIFICATION,
    );
    add(mapping.curator().is_some(), ColumnNames::AUTHOR_ID);
    add(mapping.mapping_tool().is_some(), ColumnNames::MAPPING_TOOL);
    add(mapping.confidence().is_some(), ColumnNames::CONFIDENCE);
    add(mapping.mapping_date().is_some(), ColumnNames::MAPPING_DATE);
    add(mapping.comment().is_some(), ColumnNames::COMMENT);
    add(!mapping.see_also().is_empty(), ColumnNames::SEE_ALSO);
    columns.extend(mapping.extensions().keys().cloned());
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(s: &str, o: &str) -> SemanticMapping {
        SemanticMapping::from_curies(s, "skos:exactMatch", o, "semapv:LexicalMatching").unwrap()
    }

    #[test]
    fn test_push_unique_is_idempotent() {
        let mut set = MappingSet::new(&MappingSetMetadata::default());
        assert!(set.push_unique(mapping("ex:1", "ex:2")));
        assert!(!set.push_unique(mapping("ex:1", "ex:2").with_confidence(0.3).unwrap()));
        assert_eq!(set.len(), 1);
        // Earlier evidence is kept.
        assert!(set.mappings()[0].confidence().is_none());
    }

    #[test]
    fn test_extend_unique_keeps_order() {
        let mut set = MappingSet::new(&MappingSetMetadata::default());
        let added = set.extend_unique(vec![
            mapping("ex:3", "ex:4"),
            mapping("ex:1", "ex:2"),
            mapping("ex:3", "ex:4"),
        ]);
        assert_eq!(added, 2);
        let subjects: Vec<String> = set.iter().map(|m| m.subject().curie()).collect();
        assert_eq!(subjects, vec!["ex:3", "ex:1"]);
    }

    #[test]
    fn test_upsert_merges_evidence() {
        let mut set = MappingSet::new(&MappingSetMetadata::default());
        set.push_unique(mapping("ex:1", "ex:2"));
        let inserted = set
            .upsert(mapping("ex:1", "ex:2").with_confidence(0.8).unwrap())
            .unwrap();
        assert!(!inserted);
        assert_eq!(set.len(), 1);
        assert_eq!(set.mappings()[0].confidence().unwrap().value(), 0.8);
    }

    #[test]
    fn test_new_columns_are_appended() {
        let mut set = MappingSet::new(&MappingSetMetadata::default());
        set.push_unique(
            mapping("ex:1", "ex:2")
                .with_mapping_date("2025-01-01")
                .with_extension("curation_rule_text", "x"),
        );
        assert!(set.columns().iter().any(|c| c == "mapping_date"));
        assert_eq!(set.columns().last().map(String::as_str), Some("curation_rule_text"));
    }

    #[test]
    fn test_remove_drops_all_duplicates() {
        let m = mapping("ex:1", "ex:2");
        let mut set = MappingSet::from_parts(
            MetadataHeader::default(),
            ColumnNames::STUB.iter().map(|c| c.to_string()).collect(),
            vec![m.clone(), mapping("ex:3", "ex:4"), m.clone()],
            TextLayout::default(),
        );
        let removed = set.remove(&m.identity_key());
        assert_eq!(removed.len(), 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_replace_collapses_duplicates() {
        let m = mapping("ex:1", "ex:2");
        let mut set = MappingSet::from_parts(
            MetadataHeader::default(),
            ColumnNames::STUB.iter().map(|c| c.to_string()).collect(),
            vec![m.clone(), mapping("ex:3", "ex:4"), m.clone()],
            TextLayout::default(),
        );
        set.replace(m.clone().with_comment("reviewed"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.mappings()[0].comment(), Some("reviewed"));
    }

    #[test]
    fn test_header_round_trip_and_set() {
        let mut header = MetadataHeader::default();
        header.push_raw("#mapping_set_id:   https://example.org/a.tsv");
        header.push_raw("#curie_map:");
        header.push_raw("#  ex: https://example.org/");
        header.push_raw("#license: 'spdx:CC0-1.0'");

        assert_eq!(header.get("mapping_set_id"), Some("https://example.org/a.tsv"));
        assert_eq!(header.get("license"), Some("spdx:CC0-1.0"));
        assert_eq!(header.get("curie_map"), None);
        assert_eq!(header.get("ex"), None);

        // Setting the same value leaves the raw line untouched.
        header.set("mapping_set_id", "https://example.org/a.tsv");
        assert_eq!(
            header.lines().next(),
            Some("#mapping_set_id:   https://example.org/a.tsv")
        );

        header.set("mapping_set_title", "Demo");
        assert_eq!(header.lines().last(), Some("#mapping_set_title: Demo"));
        assert_eq!(header.metadata().title.as_deref(), Some("Demo"));
    }

    #[test]
    fn test_metadata_defaults() {
        let template = MappingSetMetadata {
            title: Some("Template".into()),
            license: Some("spdx:CC0-1.0".into()),
            ..Default::default()
        };
        let filled = MappingSetMetadata {
            title: Some("Own".into()),
            ..Default::default()
        }
        .or(&template);
        assert_eq!(filled.title.as_deref(), Some("Own"));
        assert_eq!(filled.license.as_deref(), Some("spdx:CC0-1.0"));
    }
}
