//! Fixed on-disk layout of a bag.
//!
//! ```text
//! <base>/
//!   bagit.txt
//!   manifest-md5.txt
//!   tagmanifest-md5.txt
//!   data/{final,supporting,licence,metadata}/<name>
//!   tagfiles/{formats,final.sequence,supporting.sequence,supporting.access}.txt
//! ```
//!
//! All paths written into tag files and manifests are relative to `<base>`.

use super::member::Role;

pub const BAGIT_TXT: &str = "bagit.txt";
pub const MANIFEST: &str = "manifest-md5.txt";
pub const TAG_MANIFEST: &str = "tagmanifest-md5.txt";

pub const DATA_DIR: &str = "data";
pub const TAGFILES_DIR: &str = "tagfiles";

pub const FORMATS: &str = "tagfiles/formats.txt";
pub const FINAL_SEQUENCE: &str = "tagfiles/final.sequence.txt";
pub const SUPPORTING_SEQUENCE: &str = "tagfiles/supporting.sequence.txt";
pub const SUPPORTING_ACCESS: &str = "tagfiles/supporting.access.txt";

pub const BAGIT_VERSION: &str = "0.97";
pub const TAG_FILE_ENCODING: &str = "UTF-8";

pub const METADATA_NAME: &str = "metadata.xml";
pub const METADATA_CONTENT_TYPE: &str = "text/xml";

/// Packaging identifier handed to deposit endpoints.
pub const PACKAGING: &str = "http://duo.uio.no/terms/package/FSBagIt";

/// Extensions stripped from a container file name to derive the base dir.
const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar", ".gz", ".zip"];

/// `bagit.txt` body.
pub fn declaration() -> String {
    format!("BagIt-Version: {BAGIT_VERSION}\nTag-File-Character-Encoding: {TAG_FILE_ENCODING}\n")
}

/// Bag-relative path of a payload member.
pub fn payload_path(role: Role, display_name: &str) -> String {
    format!("{DATA_DIR}/{}/{display_name}", role.dir())
}

/// Full archive entry path.
pub fn entry_path(base_dir: &str, relative: &str) -> String {
    format!("{base_dir}/{relative}")
}

/// Base directory name for a container file name.
///
/// `thesis.tar.gz` -> `thesis`. Names that reduce to nothing yield `bag`.
pub fn base_dir_for(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    let stem = ARCHIVE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &file_name[..file_name.len() - ext.len()])
        .unwrap_or_else(|| match file_name.rfind('.') {
            Some(0) | None => file_name,
            Some(idx) => &file_name[..idx],
        });

    if stem.is_empty() || stem == "." || stem == ".." {
        "bag".to_string()
    } else {
        stem.to_string()
    }
}

/// Why `segment` cannot be used as a single path component, if it cannot.
///
/// Applies to member display names and to the base directory.
pub(crate) fn segment_problem(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        Some("name is empty")
    } else if segment == "." || segment == ".." {
        Some("name is a relative directory reference")
    } else if segment.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if segment.contains(['\t', '\n', '\r']) {
        Some("name contains a tab or line break")
    } else {
        None
    }
}

/// Classify a bag-relative path as a payload entry.
///
/// Returns the role and display name (last path segment) for paths under
/// one of the four data directories.
pub fn classify_payload(relative: &str) -> Option<(Role, &str)> {
    let rest = relative.strip_prefix(DATA_DIR)?.strip_prefix('/')?;
    let (dir, name) = rest.split_once('/')?;
    let role = Role::from_dir(dir)?;
    let display = name.rsplit('/').next().unwrap_or(name);
    if display.is_empty() {
        return None;
    }
    Some((role, display))
}
