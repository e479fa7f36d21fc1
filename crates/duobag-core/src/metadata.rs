//! `fs:metadata` XML document builder.

use crate::bag::DocumentProducer;
use crate::error::{BagError, BagResult};
use chrono::NaiveDate;
use std::fmt::Write as _;

pub const FS_NAMESPACE: &str = "http://studentweb.no/terms/";
pub const DCTERMS_NAMESPACE: &str = "http://purl.org/dc/terms/";

pub const NAME: &str = "fs:name";
pub const GIVEN_NAME: &str = "fs:givenName";
pub const FAMILY_NAME: &str = "fs:familyName";
pub const STUDENT_NUMBER: &str = "fs:studentNumber";
pub const UID: &str = "fs:uid";
pub const FOEDSELSNUMMER: &str = "fs:foedselsnummer";
pub const POSTAL_ADDRESS: &str = "fs:postalAddress";
pub const EMAIL: &str = "fs:email";
pub const TELEPHONE_NUMBER: &str = "fs:telephoneNumber";
pub const UNITCODE: &str = "fs:unitcode";
pub const UNIT_NAME: &str = "fs:unitName";
pub const GRADE: &str = "fs:grade";
pub const EMBARGO_TYPE: &str = "fs:embargoType";
pub const EMBARGO_END_DATE: &str = "fs:embargoEndDate";
pub const TITLE: &str = "dcterms:title";
pub const LANGUAGE: &str = "dcterms:language";
pub const ABSTRACT: &str = "dcterms:abstract";
pub const TYPE: &str = "dcterms:type";

const SUBJECT: &str = "fs:subject";
const SUBJECT_CODE: &str = "fs:subjectCode";
const SUBJECT_TITLE: &str = "fs:subjectTitle";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Field {
        name: String,
        value: String,
        lang: Option<String>,
    },
    /// Position of the single `fs:subject` element.
    Subjects,
}

/// Builds the metadata document stored as `data/metadata/metadata.xml`.
///
/// Elements are emitted in insertion order. Field names carrying an `fs:`
/// prefix go to the studentweb namespace; anything else is a DC term. The
/// local part of a name must be an XML NCName.
///
/// ```
/// use duobag_core::metadata::{self, MetadataDocument};
///
/// let mut doc = MetadataDocument::new();
/// doc.add_field(metadata::TITLE, "101 days around some of the world").unwrap();
/// doc.add_field_with_lang(metadata::TITLE, "101 days in the Pacific", "nob").unwrap();
/// doc.add_subject("AST3220", "Kosmologi I");
/// assert!(doc.to_xml().contains(r#"<dcterms:title xml:lang="nob">"#));
/// assert!(doc.add_field("dc title", "x").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDocument {
    items: Vec<Item>,
    subjects: Vec<(String, String)>,
}

impl MetadataDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: &str, value: impl Into<String>) -> BagResult<()> {
        self.push_field(name, value.into(), None)
    }

    /// Add a field tagged with `xml:lang`.
    pub fn add_field_with_lang(
        &mut self,
        name: &str,
        value: impl Into<String>,
        lang: &str,
    ) -> BagResult<()> {
        if let Some(reason) = lang_problem(lang) {
            return Err(BagError::InvalidField {
                name: name.to_string(),
                reason: format!("language tag {lang:?} {reason}"),
            });
        }
        self.push_field(name, value.into(), Some(lang.to_string()))
    }

    pub fn add_subject(&mut self, code: impl Into<String>, title: impl Into<String>) {
        if self.subjects.is_empty() {
            self.items.push(Item::Subjects);
        }
        self.subjects.push((code.into(), title.into()));
    }

    /// Set the embargo type and end date, replacing any previous embargo.
    pub fn set_embargo(&mut self, embargo_type: impl Into<String>, end_date: NaiveDate) {
        self.items.retain(|item| {
            !matches!(item, Item::Field { name, .. } if name == EMBARGO_TYPE || name == EMBARGO_END_DATE)
        });
        self.items.push(Item::Field {
            name: EMBARGO_TYPE.to_string(),
            value: embargo_type.into(),
            lang: None,
        });
        self.items.push(Item::Field {
            name: EMBARGO_END_DATE.to_string(),
            value: end_date.format("%Y-%m-%d").to_string(),
            lang: None,
        });
    }

    /// All values of a field, in insertion order.
    pub fn field(&self, name: &str) -> Vec<&str> {
        let name = qualified(name);
        self.fields()
            .filter(|(n, _, _)| *n == name)
            .map(|(_, value, _)| value)
            .collect()
    }

    /// Values of a field carrying the given language tag.
    pub fn field_with_lang(&self, name: &str, lang: &str) -> Vec<&str> {
        let name = qualified(name);
        self.fields()
            .filter(|(n, _, l)| *n == name && *l == Some(lang))
            .map(|(_, value, _)| value)
            .collect()
    }

    /// `(code, title)` pairs.
    pub fn subjects(&self) -> impl Iterator<Item = (&str, &str)> {
        self.subjects
            .iter()
            .map(|(code, title)| (code.as_str(), title.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        let _ = writeln!(
            out,
            "<fs:metadata xmlns:fs=\"{FS_NAMESPACE}\" xmlns:dcterms=\"{DCTERMS_NAMESPACE}\">"
        );
        for item in &self.items {
            match item {
                Item::Field { name, value, lang } => {
                    let _ = match lang {
                        Some(lang) => writeln!(
                            out,
                            "    <{name} xml:lang=\"{}\">{}</{name}>",
                            escape(lang),
                            escape(value)
                        ),
                        None => writeln!(out, "    <{name}>{}</{name}>", escape(value)),
                    };
                }
                Item::Subjects => {
                    let _ = writeln!(out, "    <{SUBJECT}>");
                    for (code, title) in &self.subjects {
                        let _ = writeln!(out, "        <{SUBJECT_CODE}>{}</{SUBJECT_CODE}>", escape(code));
                        let _ = writeln!(out, "        <{SUBJECT_TITLE}>{}</{SUBJECT_TITLE}>", escape(title));
                    }
                    let _ = writeln!(out, "    </{SUBJECT}>");
                }
            }
        }
        out.push_str("</fs:metadata>\n");
        out
    }

    fn push_field(&mut self, name: &str, value: String, lang: Option<String>) -> BagResult<()> {
        let qualified = qualified(name);
        if let Some(reason) = name_problem(&qualified) {
            return Err(BagError::InvalidField {
                name: name.to_string(),
                reason: reason.to_string(),
            });
        }
        self.items.push(Item::Field {
            name: qualified,
            value,
            lang,
        });
        Ok(())
    }

    fn fields(&self) -> impl Iterator<Item = (&str, &str, Option<&str>)> {
        self.items.iter().filter_map(|item| match item {
            Item::Field { name, value, lang } => {
                Some((name.as_str(), value.as_str(), lang.as_deref()))
            }
            Item::Subjects => None,
        })
    }
}

impl DocumentProducer for MetadataDocument {
    fn serialize_to_xml(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

fn qualified(name: &str) -> String {
    if name.starts_with("fs:") || name.starts_with("dcterms:") {
        name.to_string()
    } else {
        format!("dcterms:{name}")
    }
}

/// Why a prefixed element name cannot be written, if it cannot.
fn name_problem(qualified: &str) -> Option<&'static str> {
    let local = qualified
        .strip_prefix("fs:")
        .or_else(|| qualified.strip_prefix("dcterms:"))?;
    let mut chars = local.chars();
    let Some(first) = chars.next() else {
        return Some("local name is empty");
    };
    if !(first.is_alphabetic() || first == '_') {
        return Some("local name must start with a letter or underscore");
    }
    if !chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Some("local name may only hold letters, digits, '_', '-' and '.'");
    }
    None
}

/// BCP 47 shape: alphanumeric subtags of 1 to 8 characters joined by '-'.
fn lang_problem(lang: &str) -> Option<&'static str> {
    let well_formed = lang
        .split('-')
        .all(|tag| (1..=8).contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_alphanumeric()));
    (!well_formed).then_some("is not a well-formed language tag")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
