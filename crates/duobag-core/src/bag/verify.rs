//! Fixity verification against the payload and tag manifests.

use super::digest::md5_hex;
use super::layout;
use super::reader::{Bag, BagReader};
use crate::error::BagResult;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;

/// Outcome for a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    Match,
    Mismatch { expected: String, actual: String },
    /// Listed in a manifest but absent from the container.
    Missing,
    /// Present in the container but not listed.
    Unlisted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCheck {
    /// Manifest the entry was checked against.
    pub manifest: &'static str,
    pub path: String,
    #[serde(flatten)]
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub entries: Vec<EntryCheck>,
}

impl VerifyReport {
    /// True only when every checked entry matched.
    pub fn is_ok(&self) -> bool {
        self.entries.iter().all(|e| e.status == EntryStatus::Match)
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryCheck> {
        self.entries.iter().filter(|e| e.status != EntryStatus::Match)
    }

    pub fn status_of(&self, path: &str) -> Option<&EntryStatus> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| &e.status)
    }
}

impl Bag {
    /// Compare payload digests taken while loading, and tag file digests,
    /// with the recorded manifests. A bag without either manifest never
    /// verifies.
    pub fn verify(&self) -> VerifyReport {
        let mut entries = Vec::new();

        let payload: BTreeMap<&str, String> = self
            .payload
            .iter()
            .map(|entry| (entry.path.as_str(), entry.md5.clone()))
            .collect();
        check(layout::MANIFEST, &self.manifest_rows, &payload, &[], &mut entries);

        let tags: BTreeMap<&str, String> = self
            .tag_files
            .iter()
            .filter(|(path, _)| path.as_str() != layout::TAG_MANIFEST)
            .map(|(path, data)| (path.as_str(), md5_hex(data)))
            .collect();
        check(
            layout::TAG_MANIFEST,
            &self.tag_manifest_rows,
            &tags,
            &[layout::BAGIT_TXT],
            &mut entries,
        );

        for required in [layout::MANIFEST, layout::TAG_MANIFEST] {
            let reported = entries.iter().any(|e| e.path == required);
            if !self.tag_files.contains_key(required) && !reported {
                entries.push(EntryCheck {
                    manifest: required,
                    path: required.to_string(),
                    status: EntryStatus::Missing,
                });
            }
        }

        let failed = entries.iter().filter(|e| e.status != EntryStatus::Match).count();
        if failed == 0 {
            tracing::debug!(entries = entries.len(), "bag verified");
        } else {
            tracing::warn!(entries = entries.len(), failed, "bag failed verification");
        }
        VerifyReport { entries }
    }
}

fn check(
    manifest: &'static str,
    rows: &[(String, String)],
    actual: &BTreeMap<&str, String>,
    exempt: &[&str],
    out: &mut Vec<EntryCheck>,
) {
    let mut listed = HashSet::new();
    for (path, expected) in rows {
        listed.insert(path.as_str());
        let status = match actual.get(path.as_str()) {
            None => EntryStatus::Missing,
            Some(digest) if digest == expected => EntryStatus::Match,
            Some(digest) => EntryStatus::Mismatch {
                expected: expected.clone(),
                actual: digest.clone(),
            },
        };
        out.push(EntryCheck {
            manifest,
            path: path.clone(),
            status,
        });
    }
    for path in actual.keys() {
        if !listed.contains(path) && !exempt.contains(path) {
            out.push(EntryCheck {
                manifest,
                path: path.to_string(),
                status: EntryStatus::Unlisted,
            });
        }
    }
}

/// Load a bag from a stream and verify it.
pub fn verify_bag<R: Read + Seek>(reader: R) -> BagResult<VerifyReport> {
    Ok(BagReader::default().load(reader)?.verify())
}

/// Load a bag from a file and verify it.
pub fn verify_bag_path(path: impl AsRef<Path>) -> BagResult<VerifyReport> {
    Ok(BagReader::default().load_path(path)?.verify())
}
