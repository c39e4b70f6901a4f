//! SSSOM TSV codec.
//!
//! A file is zero or more `#` metadata lines, one column header row, then
//! one tab-separated row per mapping. Empty cells are absent values.
//! Blank lines are skipped and `\r\n` line endings are accepted; the line
//! ending and the trailing line breaks are kept for rendering.

use crate::config::ColumnNames;
use crate::model::{
    Confidence, MappingSet, MetadataHeader, NamedReference, PredicateModifier, Reference,
    SemanticMapping, TextLayout,
};
use crate::{CuratorError, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

const SEE_ALSO_SEPARATOR: &str = "|";

/// Parse the text of an SSSOM TSV file. `path` is only used in errors.
pub fn parse(text: &str, path: &Path) -> Result<MappingSet> {
    let format_err = |line: usize, message: String| CuratorError::Format {
        path: path.to_path_buf(),
        line,
        message,
    };

    let body = text.trim_end_matches(['\r', '\n']);
    let layout = TextLayout {
        crlf: text.find('\n').is_some_and(|i| text[..i].ends_with('\r')),
        tail: text[body.len()..].to_string(),
    };
    let mut lines = body
        .split('\n')
        .enumerate()
        .map(|(i, l)| (i + 1, l.strip_suffix('\r').unwrap_or(l)))
        .filter(|(_, l)| !l.is_empty());

    let mut header = MetadataHeader::default();
    let mut columns: Option<(usize, Vec<String>)> = None;
    for (number, line) in lines.by_ref() {
        if line.starts_with('#') {
            header.push_raw(line);
        } else {
            columns = Some((number, line.split('\t').map(String::from).collect()));
            break;
        }
    }

    let (header_line, columns) =
        columns.ok_or_else(|| format_err(0, "missing header row".into()))?;

    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, column) in columns.iter().enumerate() {
        if index.insert(column.as_str(), i).is_some() {
            return Err(format_err(
                header_line,
                format!("duplicate column {:?}", column),
            ));
        }
    }
    for required in [
        ColumnNames::SUBJECT_ID,
        ColumnNames::PREDICATE_ID,
        ColumnNames::OBJECT_ID,
    ] {
        if !index.contains_key(required) {
            return Err(format_err(
                header_line,
                format!("missing required column {:?}", required),
            ));
        }
    }

    let mut mappings = Vec::new();
    for (number, line) in lines {
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != columns.len() {
            return Err(format_err(
                number,
                format!(
                    "expected {} columns, found {}",
                    columns.len(),
                    cells.len()
                ),
            ));
        }
        let mapping =
            parse_row(&columns, &index, &cells).map_err(|e| format_err(number, row_message(e)))?;
        mappings.push(mapping);
    }

    Ok(MappingSet::from_parts(
        header,
        columns,
        mappings,
        layout,
    ))
}

fn row_message(err: CuratorError) -> String {
    match err {
        CuratorError::Validation { field, message } => format!("{}: {}", field, message),
        other => other.to_string(),
    }
}

fn parse_row(
    columns: &[String],
    index: &HashMap<&str, usize>,
    cells: &[&str],
) -> Result<SemanticMapping> {
    let get = |name: &str| {
        index
            .get(name)
            .map(|&i| cells[i])
            .filter(|cell| !cell.is_empty())
    };
    let reference = |name: &str| Reference::parse_field(get(name).unwrap_or_default(), name);
    let optional_reference = |name: &str| {
        get(name)
            .map(|curie| Reference::parse_field(curie, name))
            .transpose()
    };

    let subject = NamedReference::new(
        reference(ColumnNames::SUBJECT_ID)?,
        get(ColumnNames::SUBJECT_LABEL).map(String::from),
    );
    let object = NamedReference::new(
        reference(ColumnNames::OBJECT_ID)?,
        get(ColumnNames::OBJECT_LABEL).map(String::from),
    );
    let predicate = reference(ColumnNames::PREDICATE_ID)?;
    let justification = optional_reference(ColumnNames::MAPPING_JUSTIFICATION)?;

    let mut mapping = SemanticMapping::from_parts(subject, predicate, object, justification)
        .with_predicate_modifier(
            get(ColumnNames::PREDICATE_MODIFIER)
                .map(PredicateModifier::parse)
                .transpose()?,
        )
        .with_parsed_confidence(get(ColumnNames::CONFIDENCE).map(Confidence::parse).transpose()?);

    if let Some(curator) = optional_reference(ColumnNames::AUTHOR_ID)? {
        mapping = mapping.with_curator(curator);
    }
    if let Some(tool) = get(ColumnNames::MAPPING_TOOL) {
        mapping = mapping.with_mapping_tool(tool);
    }
    if let Some(date) = get(ColumnNames::MAPPING_DATE) {
        mapping = mapping.with_mapping_date(date);
    }
    if let Some(comment) = get(ColumnNames::COMMENT) {
        mapping = mapping.with_comment(comment);
    }
    if let Some(links) = get(ColumnNames::SEE_ALSO) {
        mapping = mapping.with_see_also(
            links
                .split(SEE_ALSO_SEPARATOR)
                .map(String::from)
                .collect(),
        );
    }
    for (i, column) in columns.iter().enumerate() {
        if !ColumnNames::is_known(column) {
            mapping = mapping.with_extension(column.as_str(), cells[i]);
        }
    }

    Ok(mapping)
}

/// Render a mapping set as SSSOM TSV text.
pub fn render(set: &MappingSet) -> String {
    let mut lines: Vec<Cow<'_, str>> = set.header().lines().map(Cow::Borrowed).collect();
    lines.push(Cow::Owned(set.columns().join("\t")));
    for mapping in set.iter() {
        let row: Vec<Cow<'_, str>> = set
            .columns()
            .iter()
            .map(|column| cell(mapping, column))
            .collect();
        lines.push(Cow::Owned(row.join("\t")));
    }

    let layout = set.layout();
    let mut text = lines.join(layout.line_ending());
    text.push_str(&layout.tail);
    text
}

fn cell<'a>(mapping: &'a SemanticMapping, column: &str) -> Cow<'a, str> {
    let text = |value: Option<&'a str>| Cow::Borrowed(value.unwrap_or_default());
    match column {
        ColumnNames::SUBJECT_ID => Cow::Owned(mapping.subject().curie()),
        ColumnNames::SUBJECT_LABEL => text(mapping.subject().name.as_deref()),
        ColumnNames::PREDICATE_ID => Cow::Owned(mapping.predicate().curie()),
        ColumnNames::PREDICATE_MODIFIER => text(mapping.predicate_modifier().map(|m| m.as_str())),
        ColumnNames::OBJECT_ID => Cow::Owned(mapping.object().curie()),
        ColumnNames::OBJECT_LABEL => text(mapping.object().name.as_deref()),
        ColumnNames::MAPPING_JUSTIFICATION => {
            Cow::Owned(mapping.justification().map(Reference::curie).unwrap_or_default())
        }
        ColumnNames::AUTHOR_ID => {
            Cow::Owned(mapping.curator().map(Reference::curie).unwrap_or_default())
        }
        ColumnNames::MAPPING_TOOL => text(mapping.mapping_tool()),
        ColumnNames::CONFIDENCE => text(mapping.confidence().map(Confidence::as_str)),
        ColumnNames::MAPPING_DATE => text(mapping.mapping_date()),
        ColumnNames::COMMENT => text(mapping.comment()),
        ColumnNames::SEE_ALSO => {
            Cow::Owned(mapping.see_also().join(SEE_ALSO_SEPARATOR))
        }
        other => text(mapping.extensions().get(other).map(String::as_str)),
    }
}
