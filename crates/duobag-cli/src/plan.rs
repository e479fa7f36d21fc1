//! YAML bag plan for `duobag create`.
//!
//! ```yaml
//! final:
//!   - path: thesis.pdf
//!   - path: appendix.pdf
//!     sequence: 10
//! supporting:
//!   - path: data.csv
//!     access: open
//!     content_type: text/csv
//! licence:
//!   path: licence.txt
//! metadata:
//!   fields:
//!     - { name: "fs:name", value: "Thor Heyerdahl" }
//!     - { name: "dcterms:title", value: "101 days in the Pacific", lang: nob }
//!   subjects:
//!     - { code: AST3220, title: Kosmologi I }
//!   embargo: { type: 5 years, end_date: 2030-01-01 }
//! ```
//!
//! `metadata` may instead name a prepared document with `file:`. Relative
//! paths resolve against the plan file's directory.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use duobag_core::{Access, ContentSource, MetadataDocument, Registry};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    #[serde(default, rename = "final")]
    pub finals: Vec<FinalEntry>,
    #[serde(default)]
    pub supporting: Vec<SupportingEntry>,
    pub licence: Option<FileEntry>,
    pub metadata: Option<MetadataSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalEntry {
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub sequence: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupportingEntry {
    pub path: PathBuf,
    pub access: String,
    pub content_type: Option<String>,
    pub sequence: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntry {
    pub path: PathBuf,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataSpec {
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub subjects: Vec<SubjectSpec>,
    pub embargo: Option<EmbargoSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    pub value: String,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectSpec {
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbargoSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub end_date: NaiveDate,
}

impl Plan {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("invalid plan {}", path.display()))
    }

    /// Build a registry for `destination`, resolving relative paths
    /// against `plan_dir`.
    pub fn into_registry(self, plan_dir: &Path, destination: &Path) -> Result<Registry> {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                plan_dir.join(p)
            }
        };

        let mut registry = Registry::for_destination(destination);
        for entry in self.finals {
            registry.add_final(
                ContentSource::file(resolve(&entry.path)),
                entry.content_type.as_deref(),
                entry.sequence,
            );
        }
        for entry in self.supporting {
            let access: Access = entry.access.parse().map_err(anyhow::Error::msg).with_context(
                || format!("supporting file {}", entry.path.display()),
            )?;
            registry.add_supporting(
                ContentSource::file(resolve(&entry.path)),
                entry.content_type.as_deref(),
                entry.sequence,
                access,
            );
        }
        if let Some(licence) = self.licence {
            registry.add_licence(
                ContentSource::file(resolve(&licence.path)),
                licence.content_type.as_deref(),
            );
        }
        if let Some(metadata) = self.metadata {
            match metadata.file.clone() {
                Some(file) => {
                    if metadata.has_inline() {
                        bail!("metadata takes either `file` or inline fields, not both");
                    }
                    registry.add_metadata(ContentSource::file(resolve(&file)));
                }
                None => registry.add_metadata_document(metadata.into_document()?),
            }
        }
        Ok(registry)
    }
}

impl MetadataSpec {
    fn has_inline(&self) -> bool {
        !self.fields.is_empty() || !self.subjects.is_empty() || self.embargo.is_some()
    }

    pub fn into_document(self) -> Result<MetadataDocument> {
        let mut doc = MetadataDocument::new();
        for field in self.fields {
            let name = field.name;
            let added = match field.lang {
                Some(lang) => doc.add_field_with_lang(&name, field.value, &lang),
                None => doc.add_field(&name, field.value),
            };
            added.with_context(|| format!("metadata field {name:?}"))?;
        }
        for subject in self.subjects {
            doc.add_subject(subject.code, subject.title);
        }
        if let Some(embargo) = self.embargo {
            doc.set_embargo(embargo.kind, embargo.end_date);
        }
        Ok(doc)
    }
}
