//! Target path derivation for timeline documents
//!
//! A document's path is computed from its title, date and the detail texts of the
//! timeline entry it belongs to. The layout is:
//!
//! - account and custody statements: `[subfolder/]Abschlüsse/<filename>/<category>.pdf`
//! - everything else: `[subfolder/]<category>/<filename>.pdf`
//!
//! where `<filename>` is the configured [`FilenameTemplate`] rendered with
//! [`FilenameFields`]. Every derived component is passed through
//! [`sanitize_component`] before it is joined onto the output root.

use crate::error::{Error, Result};
use crate::types::DocumentDescriptor;
use crate::utils::sanitize_component;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Categories stored in a folder per statement period instead of a flat category folder
pub const STATEMENT_CATEGORIES: &[&str] = &["Kontoauszug", "Depotauszug"];

/// Folder that collects statement periods
pub const STATEMENTS_FOLDER: &str = "Abschlüsse";

/// Extension of every downloaded document
const DOCUMENT_EXTENSION: &str = "pdf";

/// Time-of-day token in detail subtitles, e.g. "Ausgeführt am 01.02.2023 um 10:32 Uhr"
#[allow(clippy::expect_used)]
static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"um (\d+:\d+) Uhr").expect("time pattern is a valid regex"));

/// Values available to the filename template
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilenameFields {
    /// Detail date in ISO order, e.g. "2023-02-01"
    pub iso_date: String,
    /// `" HH:MM"` when the subtitle carries a time token, otherwise empty
    pub time: String,
    /// Detail title with newlines removed and `/` replaced by `-`
    pub title: String,
    /// Detail subtitle with newlines removed and `/` replaced by `-`
    pub subtitle: String,
    /// `" N"` when the document title ends in a bare number, otherwise empty
    pub doc_num: String,
}

/// Category and template fields derived from one descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameParts {
    /// Document title without its trailing number, e.g. "Kosteninformation"
    pub category: String,
    /// Template fields
    pub fields: FilenameFields,
}

impl NameParts {
    /// Derive category and template fields from a descriptor
    pub fn from_descriptor(descriptor: &DocumentDescriptor) -> Self {
        let (category, doc_num) = split_doc_number(&descriptor.display_title);
        let time = extract_time(&descriptor.subtitle_text)
            .map(|t| format!(" {t}"))
            .unwrap_or_default();

        Self {
            category,
            fields: FilenameFields {
                iso_date: iso_date(&descriptor.detail_date),
                time,
                title: clean_text(&descriptor.title_text),
                subtitle: clean_text(&descriptor.subtitle_text),
                doc_num,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    IsoDate,
    Time,
    Title,
    Subtitle,
    DocNum,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "iso_date" => Some(Field::IsoDate),
            "time" => Some(Field::Time),
            "title" => Some(Field::Title),
            "subtitle" => Some(Field::Subtitle),
            "doc_num" => Some(Field::DocNum),
            _ => None,
        }
    }

    fn value<'a>(&self, fields: &'a FilenameFields) -> &'a str {
        match self {
            Field::IsoDate => &fields.iso_date,
            Field::Time => &fields.time,
            Field::Title => &fields.title,
            Field::Subtitle => &fields.subtitle,
            Field::DocNum => &fields.doc_num,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(Field),
}

/// Parsed filename template with `{placeholder}` substitution
///
/// # Examples
///
/// ```
/// use timeline_dl::naming::{FilenameFields, FilenameTemplate};
///
/// let template = FilenameTemplate::parse("{iso_date}{time} {title}{doc_num}").unwrap();
/// let fields = FilenameFields {
///     iso_date: "2023-03-15".into(),
///     title: "Kosteninformation".into(),
///     doc_num: " 2".into(),
///     ..Default::default()
/// };
/// assert_eq!(template.render(&fields), "2023-03-15 Kosteninformation 2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilenameTemplate {
    parts: Vec<Part>,
}

impl FilenameTemplate {
    /// Parse a template string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] for unknown placeholders, unclosed `{`
    /// or an unmatched `}`.
    pub fn parse(format: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = format.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(Error::InvalidTemplate(format!(
                                    "unclosed placeholder in {format:?}"
                                )));
                            }
                        }
                    }
                    let field = Field::from_name(&name).ok_or_else(|| {
                        Error::InvalidTemplate(format!(
                            "unknown placeholder {{{name}}} in {format:?}"
                        ))
                    })?;
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Field(field));
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(Error::InvalidTemplate(format!(
                        "unmatched '}}' in {format:?}"
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self { parts })
    }

    /// Substitute the fields into the template
    pub fn render(&self, fields: &FilenameFields) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Field(field) => out.push_str(field.value(fields)),
            }
        }
        out
    }
}

/// Reverse a dotted date into ISO order ("01.02.2023" -> "2023-02-01")
pub fn iso_date(detail_date: &str) -> String {
    detail_date.split('.').rev().collect::<Vec<_>>().join("-")
}

/// Extract the "HH:MM" token from a subtitle such as "... um 10:32 Uhr"
pub fn extract_time(subtitle: &str) -> Option<String> {
    TIME_PATTERN
        .captures(subtitle)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Split a trailing bare number off a document title
///
/// Returns `(category, doc_num)` where `doc_num` is `" N"` or empty:
/// `"Kosteninformation 2"` becomes `("Kosteninformation", " 2")`.
pub fn split_doc_number(display_title: &str) -> (String, String) {
    let mut words: Vec<&str> = display_title.split(' ').collect();
    let doc_num = match words.last() {
        Some(last) if !last.is_empty() && last.chars().all(char::is_numeric) => {
            let num = format!(" {last}");
            words.pop();
            num
        }
        _ => String::new(),
    };
    (words.join(" "), doc_num)
}

/// Remove newlines and replace `/` so free text cannot introduce path levels
pub fn clean_text(text: &str) -> String {
    text.replace('\n', "").replace('/', "-")
}

/// Compute the sanitized target path of a document below `output_dir`
///
/// A `/` in the template itself (not in the substituted texts) creates
/// subdirectories, each sanitized on its own.
pub fn derive_target_path(
    output_dir: &Path,
    template: &FilenameTemplate,
    descriptor: &DocumentDescriptor,
) -> PathBuf {
    let NameParts { category, fields } = NameParts::from_descriptor(descriptor);
    let filename = template.render(&fields);
    let segments: Vec<&str> = filename.split('/').collect();

    let mut path = output_dir.to_path_buf();
    if let Some(subfolder) = &descriptor.subfolder {
        path.push(sanitize_component(subfolder));
    }

    if STATEMENT_CATEGORIES.contains(&category.as_str()) {
        path.push(STATEMENTS_FOLDER);
        for segment in &segments {
            path.push(sanitize_component(segment));
        }
        path.push(sanitize_component(&format!(
            "{category}.{DOCUMENT_EXTENSION}"
        )));
    } else {
        path.push(sanitize_component(&category));
        if let Some((last, dirs)) = segments.split_last() {
            for segment in dirs {
                path.push(sanitize_component(segment));
            }
            path.push(sanitize_component(&format!("{last}.{DOCUMENT_EXTENSION}")));
        }
    }

    path
}
