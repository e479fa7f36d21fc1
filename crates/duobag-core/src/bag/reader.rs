//! Bag reader.
//!
//! Loads a container in two bounded passes: the raw bytes are hashed for
//! the whole-archive digest, then every entry is scanned once. Payload
//! digests are computed during the scan and index files are parsed
//! eagerly. Bags loaded from a file leave payload bytes in the container
//! and reopen it on demand; bags loaded from a stream keep them in memory
//! up to [`ReadLimits::max_retained_bytes`].

use super::container::{ArchivedEntry, ContainerFormat, EntryLocation};
use super::digest::HashingReader;
use super::layout;
use super::limits::{
    EintrReader, LimitReader, ReadLimits, LIMIT_TAG_ARCHIVE, LIMIT_TAG_DECODE,
};
use super::member::{Access, ContentSource, Member, Role};
use super::registry::Registry;
use super::tagfile::{parse_rows, parse_table, IndexWarning};
use crate::error::{BagError, BagResult};
use bytes::Bytes;
use flate2::read::GzDecoder;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

/// Parsed `bagit.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BagDeclaration {
    pub version: Option<String>,
    pub encoding: Option<String>,
}

impl BagDeclaration {
    fn parse(content: &[u8]) -> Self {
        let text = String::from_utf8_lossy(content);
        let mut decl = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "BagIt-Version" => decl.version = Some(value),
                "Tag-File-Character-Encoding" => decl.encoding = Some(value),
                _ => {}
            }
        }
        decl
    }
}

/// MD5 and length of a payload entry as found in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PayloadDigest {
    pub(crate) path: String,
    pub(crate) md5: String,
    pub(crate) bytes: u64,
}

/// A loaded, read-only bag.
#[derive(Debug, Clone)]
pub struct Bag {
    pub(crate) registry: Registry,
    pub(crate) format: ContainerFormat,
    pub(crate) declaration: Option<BagDeclaration>,
    pub(crate) warnings: Vec<IndexWarning>,
    /// Digests taken while scanning, one per payload entry.
    pub(crate) payload: Vec<PayloadDigest>,
    /// Bag-relative path -> bytes, for tag files, manifests and `bagit.txt`.
    pub(crate) tag_files: BTreeMap<String, Bytes>,
    pub(crate) manifest_rows: Vec<(String, String)>,
    pub(crate) tag_manifest_rows: Vec<(String, String)>,
    pub(crate) archive_md5: String,
    pub(crate) archive_path: Option<PathBuf>,
}

impl Bag {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Root directory inside the container, as found in the container.
    pub fn base_dir(&self) -> &str {
        self.registry.base_dir()
    }

    pub fn declaration(&self) -> Option<&BagDeclaration> {
        self.declaration.as_ref()
    }

    /// Tag-file lines skipped while loading.
    pub fn warnings(&self) -> &[IndexWarning] {
        &self.warnings
    }

    /// Raw bytes of a tag file, e.g. `tagfiles/formats.txt`.
    pub fn tag_file(&self, path: &str) -> Option<&[u8]> {
        self.tag_files.get(path).map(|b| b.as_ref())
    }

    pub fn sequenced_finals(&self) -> Vec<&Member> {
        self.registry.sequenced_finals()
    }

    pub fn sequenced_supporting(&self, access: Access) -> Vec<&Member> {
        self.registry.sequenced_supporting(access)
    }

    pub fn metadata(&self) -> Option<&Member> {
        self.registry.metadata()
    }

    pub fn licence(&self) -> Option<&Member> {
        self.registry.licence()
    }

    pub fn supporting_access(&self, path: &str) -> Option<Access> {
        self.registry.supporting_access(path)
    }

    /// MD5 over the raw container bytes.
    pub fn whole_archive_digest(&self) -> &str {
        &self.archive_md5
    }

    /// File name of the container, when loaded from a path.
    pub fn whole_archive_name(&self) -> Option<&str> {
        self.archive_path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    }

    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }

    /// Re-open the container file for transfer.
    pub fn open_whole_archive(&self) -> BagResult<File> {
        let path = self.archive_path.as_deref().ok_or_else(|| {
            BagError::structural("<stream>", "bag was not loaded from a file")
        })?;
        File::open(path).map_err(|e| BagError::io(path, e))
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    /// Payload bytes as found in the container.
    pub fn payload_bytes(&self) -> u64 {
        self.payload.iter().map(|p| p.bytes).sum()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn packaging(&self) -> &'static str {
        layout::PACKAGING
    }
}

/// Loads bag containers.
///
/// # Example
///
/// ```no_run
/// use duobag_core::{Access, BagReader};
///
/// let bag = BagReader::default().load_path("thesis.tar.gz").unwrap();
/// for member in bag.sequenced_supporting(Access::Open) {
///     println!("{:?} {}", member.sequence(), member.display_name());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BagReader {
    limits: ReadLimits,
}

/// Where scanned payload bytes end up.
enum Retention {
    /// Left in this container file and reopened on demand.
    Lazy(PathBuf),
    /// Copied into memory, `used` of `budget` bytes so far.
    InMemory { budget: u64, used: u64 },
}

/// A payload entry seen during the scan.
struct ScannedPayload {
    relative: String,
    role: Role,
    name: String,
    md5: String,
    bytes: u64,
    source: ContentSource,
}

/// An entry that passed the path and size checks.
struct Admitted {
    relative: String,
    full: String,
    /// Role and display name for payload entries, `None` for tag files.
    payload: Option<(Role, String)>,
}

/// Accumulated state of the pass over the container entries.
struct Scan {
    retention: Retention,
    base_dir: Option<String>,
    entries: usize,
    seen: HashSet<String>,
    payload: Vec<ScannedPayload>,
    tag_files: BTreeMap<String, Bytes>,
}

impl Scan {
    fn new(retention: Retention) -> Self {
        Self {
            retention,
            base_dir: None,
            entries: 0,
            seen: HashSet::new(),
            payload: Vec::new(),
            tag_files: BTreeMap::new(),
        }
    }
}

impl BagReader {
    pub fn new(limits: ReadLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ReadLimits {
        &self.limits
    }

    /// Load a bag from a file. Payload stays in the file.
    pub fn load_path(&self, path: impl AsRef<Path>) -> BagResult<Bag> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BagError::io(path, e))?;
        let label = path.display().to_string();
        let retention = Retention::Lazy(path.to_path_buf());
        let mut bag = self.load_labelled(BufReader::new(file), &label, retention)?;
        bag.archive_path = Some(path.to_path_buf());
        Ok(bag)
    }

    /// Load a bag from a seekable stream, keeping payload bytes in memory.
    pub fn load<R: Read + Seek>(&self, reader: R) -> BagResult<Bag> {
        let retention = Retention::InMemory {
            budget: self.limits.max_retained_bytes,
            used: 0,
        };
        self.load_labelled(reader, "<stream>", retention)
    }

    fn load_labelled<R: Read + Seek>(
        &self,
        mut reader: R,
        label: &str,
        retention: Retention,
    ) -> BagResult<Bag> {
        let (archive_md5, archive_bytes) = self.digest_container(&mut reader, label)?;

        reader.rewind().map_err(|e| read_error(label, e))?;
        let mut magic = Vec::with_capacity(4);
        (&mut reader)
            .take(4)
            .read_to_end(&mut magic)
            .map_err(|e| read_error(label, e))?;
        let format = ContainerFormat::sniff(&magic)
            .ok_or_else(|| BagError::structural(label, "not a tar.gz or zip container"))?;
        reader.rewind().map_err(|e| read_error(label, e))?;

        let mut scan = Scan::new(retention);
        match format {
            ContainerFormat::TarGz => self.scan_tar_gz(&mut reader, label, &mut scan)?,
            ContainerFormat::Zip => self.scan_zip(&mut reader, label, &mut scan)?,
        }

        let base_dir = scan
            .base_dir
            .take()
            .ok_or_else(|| BagError::structural(label, "container has no entries"))?;

        let bag = self.assemble(base_dir, format, scan, archive_md5);
        tracing::info!(
            archive = %label,
            format = format.mime_type(),
            base_dir = %bag.base_dir(),
            members = bag.registry.len(),
            bytes = archive_bytes,
            warnings = bag.warnings.len(),
            "bag loaded"
        );
        Ok(bag)
    }

    /// MD5 and length of the raw container, bounded by the archive limit.
    fn digest_container<R: Read>(&self, reader: R, label: &str) -> BagResult<(String, u64)> {
        let limited = LimitReader::new(
            EintrReader::new(reader),
            self.limits.max_archive_bytes,
            LIMIT_TAG_ARCHIVE,
        );
        let mut hashing = HashingReader::new(limited);
        io::copy(&mut hashing, &mut io::sink()).map_err(|e| read_error(label, e))?;
        Ok(hashing.finish())
    }

    fn scan_tar_gz<R: Read>(&self, reader: R, label: &str, scan: &mut Scan) -> BagResult<()> {
        let decoder = GzDecoder::new(EintrReader::new(reader));
        let limited = LimitReader::new(decoder, self.limits.max_decode_bytes, LIMIT_TAG_DECODE);
        let mut archive = tar::Archive::new(limited);

        let entries = archive.entries().map_err(|e| read_error(label, e))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| read_error(label, e))?;
            let raw_path = entry
                .path()
                .map_err(|e| read_error(label, e))?
                .into_owned();
            let is_file = entry.header().entry_type().is_file();
            let Some(admitted) = self.admit(&raw_path, is_file, entry.size(), label, scan)?
            else {
                continue;
            };
            let location = EntryLocation::TarGz {
                offset: entry.raw_file_position(),
            };
            take_entry(&mut entry, admitted, location, scan)?;
        }
        Ok(())
    }

    fn scan_zip<R: Read + Seek>(&self, reader: R, label: &str, scan: &mut Scan) -> BagResult<()> {
        let mut archive = ZipArchive::new(reader).map_err(|e| zip_error(label, e))?;
        let mut decoded = 0u64;

        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|e| zip_error(label, e))?;
            let raw_path = PathBuf::from(entry.name());
            let Some(admitted) =
                self.admit(&raw_path, entry.is_file(), entry.size(), label, scan)?
            else {
                continue;
            };
            let location = match entry.compression() {
                CompressionMethod::Stored => EntryLocation::ZipStored {
                    data_start: entry.data_start(),
                },
                CompressionMethod::Deflated => EntryLocation::ZipDeflated {
                    data_start: entry.data_start(),
                    compressed: entry.compressed_size(),
                },
                other => {
                    return Err(BagError::structural(
                        admitted.full,
                        format!("unsupported compression method {other:?}"),
                    ))
                }
            };
            let remaining = self.limits.max_decode_bytes.saturating_sub(decoded);
            let limited = LimitReader::new(entry, remaining, LIMIT_TAG_DECODE);
            decoded += take_entry(limited, admitted, location, scan)?;
        }
        Ok(())
    }

    /// Apply entry, path and size checks. `None` for entries the bag does
    /// not use.
    fn admit(
        &self,
        raw_path: &Path,
        is_file: bool,
        size: u64,
        label: &str,
        scan: &mut Scan,
    ) -> BagResult<Option<Admitted>> {
        scan.entries += 1;
        if scan.entries > self.limits.max_entries {
            return Err(BagError::Limit {
                path: label.to_string(),
                message: format!("more than {} entries", self.limits.max_entries),
            });
        }

        let segments = checked_segments(raw_path, label)?;
        let full = segments.join("/");
        if full.len() > self.limits.max_path_len {
            return Err(BagError::Limit {
                path: full,
                message: format!("path longer than {} bytes", self.limits.max_path_len),
            });
        }

        let Some((first, rest)) = segments.split_first() else {
            return Ok(None);
        };
        let base = scan.base_dir.get_or_insert_with(|| first.clone());
        if *first != *base {
            tracing::debug!(path = %full, base = %base, "entry outside bag root ignored");
            return Ok(None);
        }
        if !is_file || rest.is_empty() {
            return Ok(None);
        }

        let relative = rest.join("/");
        let is_tag = relative.starts_with(&format!("{}/", layout::TAGFILES_DIR))
            || relative == layout::MANIFEST
            || relative == layout::TAG_MANIFEST
            || relative == layout::BAGIT_TXT;
        let payload = layout::classify_payload(&relative)
            .map(|(role, name)| (role, name.to_string()));
        if payload.is_none() && !is_tag {
            tracing::debug!(path = %full, "unrecognised entry ignored");
            return Ok(None);
        }

        if !scan.seen.insert(relative.clone()) {
            return Err(BagError::structural(full, "duplicate entry in container"));
        }
        if size > self.limits.max_entry_bytes {
            return Err(BagError::Limit {
                path: full,
                message: format!("entry larger than {} bytes", self.limits.max_entry_bytes),
            });
        }

        Ok(Some(Admitted {
            relative,
            full,
            payload,
        }))
    }

    fn assemble(
        &self,
        base_dir: String,
        format: ContainerFormat,
        scan: Scan,
        archive_md5: String,
    ) -> Bag {
        let max_line = self.limits.max_tag_line_bytes;
        let mut warnings = Vec::new();
        let empty = Bytes::new();
        let tag = |path: &str| scan.tag_files.get(path).unwrap_or(&empty).clone();

        let formats: HashMap<String, String> =
            parse_table(layout::FORMATS, &tag(layout::FORMATS), max_line, &mut warnings, |v| {
                Ok(v.to_string())
            });
        let final_sequence = parse_table(
            layout::FINAL_SEQUENCE,
            &tag(layout::FINAL_SEQUENCE),
            max_line,
            &mut warnings,
            parse_sequence,
        );
        let supporting_sequence = parse_table(
            layout::SUPPORTING_SEQUENCE,
            &tag(layout::SUPPORTING_SEQUENCE),
            max_line,
            &mut warnings,
            parse_sequence,
        );
        let supporting_access = parse_table(
            layout::SUPPORTING_ACCESS,
            &tag(layout::SUPPORTING_ACCESS),
            max_line,
            &mut warnings,
            |v| v.parse::<Access>(),
        );
        let manifest_rows = checksum_rows(layout::MANIFEST, &tag(layout::MANIFEST), max_line, &mut warnings);
        let tag_manifest_rows = checksum_rows(
            layout::TAG_MANIFEST,
            &tag(layout::TAG_MANIFEST),
            max_line,
            &mut warnings,
        );
        let recorded: HashMap<&str, &str> = manifest_rows
            .iter()
            .map(|(path, md5)| (path.as_str(), md5.as_str()))
            .collect();

        let mut members = Vec::with_capacity(scan.payload.len());
        let mut payload = Vec::with_capacity(scan.payload.len());
        for entry in scan.payload {
            let relative = entry.relative;
            let (sequence, access) = match entry.role {
                Role::Final => (final_sequence.get(&relative).copied(), None),
                Role::Supporting => (
                    supporting_sequence.get(&relative).copied(),
                    supporting_access.get(&relative).copied(),
                ),
                Role::Licence | Role::Metadata => (None, None),
            };
            members.push(Member {
                role: entry.role,
                source: entry.source,
                display_name: entry.name,
                sequence,
                access,
                content_type: formats.get(&relative).cloned(),
                checksum: recorded.get(relative.as_str()).map(|s| s.to_string()),
            });
            payload.push(PayloadDigest {
                path: relative,
                md5: entry.md5,
                bytes: entry.bytes,
            });
        }

        for warning in &warnings {
            tracing::warn!(file = %warning.file, line = warning.line, reason = %warning.reason, "tag file line skipped");
        }

        let declaration = scan
            .tag_files
            .get(layout::BAGIT_TXT)
            .map(|b| BagDeclaration::parse(b));

        Bag {
            registry: Registry::from_loaded(base_dir, members),
            format,
            declaration,
            warnings,
            payload,
            tag_files: scan.tag_files,
            manifest_rows,
            tag_manifest_rows,
            archive_md5,
            archive_path: None,
        }
    }
}

/// Read one admitted entry, hashing payload on the way through. Returns
/// the number of bytes read.
fn take_entry<R: Read>(
    mut reader: R,
    admitted: Admitted,
    location: EntryLocation,
    scan: &mut Scan,
) -> BagResult<u64> {
    let Admitted {
        relative,
        full,
        payload,
    } = admitted;

    let Some((role, name)) = payload else {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| read_error(&full, e))?;
        let bytes = data.len() as u64;
        tracing::debug!(path = %relative, bytes, "tag file read");
        scan.tag_files.insert(relative, Bytes::from(data));
        return Ok(bytes);
    };

    let mut hashing = HashingReader::new(reader);
    let source = match &mut scan.retention {
        Retention::Lazy(archive) => {
            let size = io::copy(&mut hashing, &mut io::sink()).map_err(|e| read_error(&full, e))?;
            ContentSource::Archived(ArchivedEntry {
                archive: archive.clone(),
                name: name.clone(),
                location,
                size,
            })
        }
        Retention::InMemory { budget, used } => {
            let mut data = Vec::new();
            hashing
                .read_to_end(&mut data)
                .map_err(|e| read_error(&full, e))?;
            *used += data.len() as u64;
            if *used > *budget {
                return Err(BagError::Limit {
                    path: full,
                    message: format!("more than {budget} payload bytes to hold in memory"),
                });
            }
            ContentSource::Bytes {
                name: name.clone(),
                data: Bytes::from(data),
            }
        }
    };

    let (md5, bytes) = hashing.finish();
    tracing::debug!(path = %relative, md5 = %md5, bytes, "payload entry read");
    scan.payload.push(ScannedPayload {
        relative,
        role,
        name,
        md5,
        bytes,
        source,
    });
    Ok(bytes)
}

fn parse_sequence(value: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|e| format!("invalid sequence {value:?}: {e}"))
}

fn checksum_rows(
    file: &str,
    content: &[u8],
    max_line: usize,
    warnings: &mut Vec<IndexWarning>,
) -> Vec<(String, String)> {
    parse_rows(file, content, max_line, warnings)
        .into_iter()
        .map(|row| (row.path, row.value.to_ascii_lowercase()))
        .collect()
}

/// Path segments of an entry, rejecting absolute paths and traversal.
fn checked_segments(path: &Path, label: &str) -> BagResult<Vec<String>> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    BagError::structural(label, format!("non UTF-8 entry path {}", path.display()))
                })?;
                segments.push(part.to_string());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(BagError::structural(
                    path.display().to_string(),
                    "path traversal in entry name",
                ))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(BagError::structural(
                    path.display().to_string(),
                    "absolute entry path",
                ))
            }
        }
    }
    Ok(segments)
}

fn zip_error(label: &str, err: ZipError) -> BagError {
    match err {
        ZipError::Io(e) => read_error(label, e),
        other => BagError::structural(label, format!("unreadable container: {other}")),
    }
}

fn read_error(label: &str, err: io::Error) -> BagError {
    let message = err.to_string();
    if message.contains(LIMIT_TAG_ARCHIVE) || message.contains(LIMIT_TAG_DECODE) {
        BagError::Limit {
            path: label.to_string(),
            message,
        }
    } else {
        BagError::structural(label, format!("unreadable container: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::options::WriterOptions;
    use crate::bag::writer::BagWriter;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Cursor;

    /// Build a tar.gz by hand so malformed bags can be tested.
    fn raw_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::fast());
        let mut tar = tar::Builder::new(encoder);
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            tar.append_data(&mut header, path, data.as_bytes()).unwrap();
        }
        tar.into_inner().unwrap().finish().unwrap()
    }

    fn sample() -> Registry {
        let mut reg = Registry::new("thesis");
        reg.add_final(ContentSource::bytes("main.pdf", "%PDF main body"), None, None);
        reg.add_supporting(
            ContentSource::bytes("data.csv", "a,b\n1,2\n".repeat(200)),
            None,
            None,
            Access::Open,
        );
        reg.add_licence(ContentSource::bytes("licence.txt", "CC-BY"), None);
        reg
    }

    /// Write `sample()` to a file in `dir` with the given format and level.
    fn write_file(dir: &Path, name: &str, format: ContainerFormat, level: u32) -> PathBuf {
        let path = dir.join(name);
        BagWriter::new(WriterOptions {
            compression_level: level,
            format: Some(format),
            ..WriterOptions::default()
        })
        .write_to_path(&sample(), &path)
        .unwrap();
        path
    }

    fn assert_members_readable(bag: &Bag) {
        let finals = bag.sequenced_finals();
        assert_eq!(finals[0].read_all().unwrap(), b"%PDF main body");
        let open = bag.sequenced_supporting(Access::Open);
        assert_eq!(
            open[0].read_all().unwrap(),
            "a,b\n1,2\n".repeat(200).into_bytes()
        );
        assert_eq!(bag.licence().unwrap().read_all().unwrap(), b"CC-BY");
        assert!(bag.verify().is_ok());
    }

    #[test]
    fn test_base_dir_comes_from_first_entry() {
        let mut reg = Registry::new("original-name");
        reg.add_final(ContentSource::bytes("a.pdf", "a"), None, None);
        let mut out = Cursor::new(Vec::new());
        BagWriter::default().write(&reg, &mut out).unwrap();

        let bag = BagReader::default().load(Cursor::new(out.into_inner())).unwrap();
        assert_eq!(bag.base_dir(), "original-name");
        assert_eq!(bag.declaration().unwrap().version.as_deref(), Some("0.97"));
        assert_eq!(
            bag.declaration().unwrap().encoding.as_deref(),
            Some("UTF-8")
        );
    }

    #[test]
    fn test_empty_container_is_structural_error() {
        let archive = raw_archive(&[]);
        let err = BagReader::default().load(Cursor::new(archive)).unwrap_err();
        assert!(matches!(err, BagError::Structural { .. }));
    }

    #[test]
    fn test_garbage_is_structural_error() {
        let err = BagReader::default()
            .load(Cursor::new(b"definitely not gzip".to_vec()))
            .unwrap_err();
        assert!(matches!(err, BagError::Structural { .. }));
    }

    #[test]
    fn test_traversal_rejected() {
        let mut archive_bytes = Vec::new();
        {
            // tar::Builder refuses `..` paths, so write the name into the header directly.
            let encoder = GzEncoder::new(&mut archive_bytes, Compression::fast());
            let mut tar = tar::Builder::new(encoder);
            let mut header = tar::Header::new_old();
            let name = b"bag/../../etc/passwd";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_size(1);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append(&header, &b"x"[..]).unwrap();
            tar.into_inner().unwrap().finish().unwrap();
        }
        let err = BagReader::default()
            .load(Cursor::new(archive_bytes))
            .unwrap_err();
        assert!(matches!(err, BagError::Structural { ref message, .. } if message.contains("traversal")));
    }

    #[test]
    fn test_unknown_entries_ignored_and_foreign_roots_skipped() {
        let archive = raw_archive(&[
            ("bag/data/final/a.pdf", "a"),
            ("bag/notes/readme.txt", "ignored"),
            ("other/data/final/b.pdf", "b"),
            ("bag/tagfiles/final.sequence.txt", "4\tdata/final/a.pdf\n"),
        ]);
        let bag = BagReader::default().load(Cursor::new(archive)).unwrap();
        assert_eq!(bag.registry().len(), 1);
        assert_eq!(bag.sequenced_finals()[0].sequence(), Some(4));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let archive = raw_archive(&[
            ("bag/data/final/a.pdf", "a"),
            ("bag/data/final/a.pdf", "b"),
        ]);
        let err = BagReader::default().load(Cursor::new(archive)).unwrap_err();
        assert!(matches!(err, BagError::Structural { .. }));
    }

    #[test]
    fn test_entry_limit_enforced() {
        let archive = raw_archive(&[
            ("bag/data/final/a.pdf", "a"),
            ("bag/data/final/b.pdf", "b"),
        ]);
        let limits = ReadLimits {
            max_entries: 1,
            ..ReadLimits::default()
        };
        let err = BagReader::new(limits).load(Cursor::new(archive)).unwrap_err();
        assert!(matches!(err, BagError::Limit { .. }));
    }

    #[test]
    fn test_decode_limit_enforced() {
        let big = "0".repeat(64 * 1024);
        let archive = raw_archive(&[("bag/data/final/big.bin", big.as_str())]);
        let limits = ReadLimits {
            max_decode_bytes: 4 * 1024,
            ..ReadLimits::default()
        };
        let err = BagReader::new(limits).load(Cursor::new(archive)).unwrap_err();
        assert!(matches!(err, BagError::Limit { .. }));
    }

    #[test]
    fn test_malformed_index_lines_become_warnings() {
        let archive = raw_archive(&[
            ("bag/data/supporting/a.csv", "a"),
            ("bag/data/supporting/b.csv", "b"),
            (
                "bag/tagfiles/supporting.sequence.txt",
                "1\tdata/supporting/a.csv\ngarbage\nx\tdata/supporting/b.csv\n",
            ),
            (
                "bag/tagfiles/supporting.access.txt",
                "open\tdata/supporting/a.csv\nmaybe\tdata/supporting/b.csv\n",
            ),
        ]);
        let bag = BagReader::default().load(Cursor::new(archive)).unwrap();
        assert_eq!(bag.warnings().len(), 3);
        assert_eq!(bag.sequenced_supporting(Access::Open).len(), 1);
        assert!(bag.sequenced_supporting(Access::Closed).is_empty());

        let b = bag.registry().member("data/supporting/b.csv").unwrap();
        assert_eq!(b.sequence(), None);
        assert_eq!(b.access(), None);
    }

    #[test]
    fn test_whole_archive_digest_matches_raw_bytes() {
        let archive = raw_archive(&[("bag/data/licence/l.txt", "CC0")]);
        let bag = BagReader::default().load(Cursor::new(&archive)).unwrap();
        assert_eq!(
            bag.whole_archive_digest(),
            crate::bag::digest::md5_hex(&archive)
        );
        assert!(bag.whole_archive_name().is_none());
        assert!(bag.open_whole_archive().is_err());
    }

    #[test]
    fn test_path_load_reopens_tar_gz_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "thesis.tar.gz", ContainerFormat::TarGz, 9);
        let bag = BagReader::default().load_path(&path).unwrap();

        assert_eq!(bag.format(), ContainerFormat::TarGz);
        assert_eq!(bag.mime_type(), "application/gzip");
        for member in bag.registry().members() {
            assert!(matches!(member.source(), ContentSource::Archived(_)));
        }
        let ContentSource::Archived(entry) = bag.sequenced_finals()[0].source() else {
            panic!("payload should stay in the container");
        };
        assert_eq!(entry.archive(), path.as_path());
        assert_eq!(entry.name(), "main.pdf");
        assert_eq!(entry.size(), 14);
        assert_members_readable(&bag);
        assert_members_readable(&bag);
    }

    #[test]
    fn test_path_load_reopens_zip_entries() {
        let dir = tempfile::tempdir().unwrap();
        for (name, level) in [("deflated.zip", 6), ("stored.zip", 0)] {
            let path = write_file(dir.path(), name, ContainerFormat::Zip, level);
            let bag = BagReader::default().load_path(&path).unwrap();

            assert_eq!(bag.format(), ContainerFormat::Zip);
            assert_eq!(bag.mime_type(), "application/zip");
            assert_eq!(bag.base_dir(), "thesis");
            assert!(bag.warnings().is_empty());
            assert_members_readable(&bag);
        }
    }

    #[test]
    fn test_stream_load_of_zip_keeps_bytes() {
        let mut out = Cursor::new(Vec::new());
        BagWriter::new(WriterOptions {
            format: Some(ContainerFormat::Zip),
            ..WriterOptions::default()
        })
        .write(&sample(), &mut out)
        .unwrap();

        let bag = BagReader::default().load(Cursor::new(out.into_inner())).unwrap();
        assert_eq!(bag.mime_type(), "application/zip");
        assert!(matches!(
            bag.sequenced_finals()[0].source(),
            ContentSource::Bytes { .. }
        ));
        assert_members_readable(&bag);
    }

    #[test]
    fn test_stream_load_respects_retained_budget() {
        let mut out = Cursor::new(Vec::new());
        BagWriter::default().write(&sample(), &mut out).unwrap();
        let limits = ReadLimits {
            max_retained_bytes: 64,
            ..ReadLimits::default()
        };
        let err = BagReader::new(limits)
            .load(Cursor::new(out.into_inner()))
            .unwrap_err();
        assert!(matches!(err, BagError::Limit { ref message, .. } if message.contains("memory")));
    }

    #[test]
    fn test_path_load_ignores_retained_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "thesis.tar.gz", ContainerFormat::TarGz, 9);
        let limits = ReadLimits {
            max_retained_bytes: 64,
            ..ReadLimits::default()
        };
        let bag = BagReader::new(limits).load_path(&path).unwrap();
        assert_eq!(bag.payload_bytes(), 14 + 1600 + 5);
    }
}
