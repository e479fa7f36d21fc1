//! Deterministic bag writer.
//!
//! Streams every member into a tar.gz or zip container while hashing it,
//! then emits the index files, both manifests and `bagit.txt`. Byte-for-byte
//! reproducible for the same registry contents and format.

use super::container::ContainerFormat;
use super::digest::{md5_file, md5_hex, HashingReader};
use super::layout;
use super::member::{Member, Role};
use super::options::WriterOptions;
use super::registry::Registry;
use super::tagfile::TagFileBuilder;
use crate::content_type::OCTET_STREAM;
use crate::error::{BagError, BagResult};
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One entry written into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenEntry {
    /// Bag-relative path.
    pub path: String,
    /// Lower-case hex MD5.
    pub md5: String,
    pub bytes: u64,
    /// Payload members only.
    pub content_type: Option<String>,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub base_dir: String,
    pub format: ContainerFormat,
    /// Payload members in write order.
    pub payload: Vec<WrittenEntry>,
    /// Index files, manifests and `bagit.txt` in write order.
    pub tag_files: Vec<WrittenEntry>,
    /// Container file name, for path writes.
    pub archive_name: Option<String>,
    /// MD5 over the compressed container, for path writes.
    pub archive_md5: Option<String>,
}

/// Writes a [`Registry`] as a bag container.
///
/// # Example
///
/// ```no_run
/// use duobag_core::{BagWriter, ContentSource, Registry};
///
/// let mut registry = Registry::for_destination("out/thesis.tar.gz");
/// registry.add_final(ContentSource::file("thesis.pdf"), None, None);
/// let summary = BagWriter::default()
///     .write_to_path(&registry, "out/thesis.tar.gz")
///     .unwrap();
/// println!("{} {:?}", summary.base_dir, summary.archive_md5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BagWriter {
    options: WriterOptions,
}

/// In-progress index and manifest rows.
#[derive(Default)]
struct TagBuilders {
    formats: TagFileBuilder,
    final_sequence: TagFileBuilder,
    supporting_sequence: TagFileBuilder,
    supporting_access: TagFileBuilder,
    manifest: TagFileBuilder,
    tag_manifest: TagFileBuilder,
}

impl TagBuilders {
    fn record(&mut self, member: &Member, path: &str, md5: &str) {
        let content_type = member.content_type().unwrap_or(OCTET_STREAM);
        self.formats.push(content_type, path);

        match member.role() {
            Role::Final => {
                if let Some(seq) = member.sequence() {
                    self.final_sequence.push(seq, path);
                }
            }
            Role::Supporting => {
                if let Some(seq) = member.sequence() {
                    self.supporting_sequence.push(seq, path);
                }
                if let Some(access) = member.access() {
                    self.supporting_access.push(access, path);
                }
            }
            Role::Licence | Role::Metadata => {}
        }

        self.manifest.push(md5, path);
    }

    /// Index files in write order, consuming their builders.
    fn take_index_files(&mut self) -> [(&'static str, Vec<u8>); 4] {
        [
            (
                layout::FORMATS,
                std::mem::take(&mut self.formats).into_bytes(),
            ),
            (
                layout::FINAL_SEQUENCE,
                std::mem::take(&mut self.final_sequence).into_bytes(),
            ),
            (
                layout::SUPPORTING_SEQUENCE,
                std::mem::take(&mut self.supporting_sequence).into_bytes(),
            ),
            (
                layout::SUPPORTING_ACCESS,
                std::mem::take(&mut self.supporting_access).into_bytes(),
            ),
        ]
    }
}

impl BagWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Write the bag to `dest` atomically.
    ///
    /// The container is streamed into a hidden sibling file and renamed
    /// into place only once complete. On failure the temp file is removed
    /// and `dest` is left untouched. The format follows
    /// [`WriterOptions::format_for`] the destination name.
    pub fn write_to_path(
        &self,
        registry: &Registry,
        dest: impl AsRef<Path>,
    ) -> BagResult<WriteSummary> {
        let dest = dest.as_ref();
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BagError::io(
                    dest,
                    io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
                )
            })?;
        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp_path = temp_sibling(parent, &file_name);
        let format = self.options.format_for(&file_name);

        let file = File::create(&tmp_path).map_err(|e| BagError::io(&tmp_path, e))?;
        let result = self
            .write_stream(registry, BufWriter::new(file), format, &tmp_path)
            .and_then(|(summary, buffered)| {
                let file = buffered
                    .into_inner()
                    .map_err(|e| BagError::io(&tmp_path, e.into_error()))?;
                file.sync_all().map_err(|e| BagError::io(&tmp_path, e))?;
                let archive_md5 = md5_file(&tmp_path).map_err(|e| BagError::io(&tmp_path, e))?;
                fs::rename(&tmp_path, dest).map_err(|e| BagError::io(dest, e))?;
                Ok((summary, archive_md5))
            });

        match result {
            Ok((mut summary, archive_md5)) => {
                tracing::info!(
                    path = %dest.display(),
                    md5 = %archive_md5,
                    format = format.mime_type(),
                    members = summary.payload.len(),
                    "bag written"
                );
                summary.archive_name = Some(file_name);
                summary.archive_md5 = Some(archive_md5);
                Ok(summary)
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path);
                tracing::warn!(path = %dest.display(), error = %err, "bag write aborted");
                Err(err)
            }
        }
    }

    /// Write the bag to an arbitrary sink, as tar.gz unless the options
    /// name a format.
    ///
    /// On error the sink holds an incomplete container that must not be
    /// used.
    pub fn write<W: Write + Seek>(&self, registry: &Registry, out: W) -> BagResult<WriteSummary> {
        let format = self.options.format.unwrap_or_default();
        let (summary, _) = self.write_stream(registry, out, format, Path::new("<stream>"))?;
        Ok(summary)
    }

    fn write_stream<W: Write + Seek>(
        &self,
        registry: &Registry,
        out: W,
        format: ContainerFormat,
        out_label: &Path,
    ) -> BagResult<(WriteSummary, W)> {
        check_members(registry)?;

        let base = registry.base_dir();
        let mut sink = Sink::open(format, out, &self.options);

        let mut tags = TagBuilders::default();
        let mut summary = WriteSummary {
            base_dir: base.to_string(),
            format,
            payload: Vec::with_capacity(registry.len()),
            tag_files: Vec::new(),
            archive_name: None,
            archive_md5: None,
        };

        for member in registry.members() {
            let path = member.path();
            let (reader, len) = member.source().open()?;
            let mut hashing = HashingReader::new(reader.take(len));
            sink.append(
                &layout::entry_path(base, &path),
                len,
                &mut hashing,
                out_label,
            )?;

            let (md5, written) = hashing.finish();
            if written != len {
                return Err(BagError::io(
                    source_label(member),
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("expected {len} bytes, source yielded {written}"),
                    ),
                ));
            }

            tracing::debug!(path = %path, md5 = %md5, bytes = len, "payload entry written");
            tags.record(member, &path, &md5);
            summary.payload.push(WrittenEntry {
                path,
                md5,
                bytes: len,
                content_type: member.content_type().map(str::to_string),
            });
        }

        for (path, bytes) in tags.take_index_files() {
            let entry = sink.append_bytes(base, path, &bytes, out_label)?;
            tags.tag_manifest.push(&entry.md5, path);
            summary.tag_files.push(entry);
        }

        let manifest = std::mem::take(&mut tags.manifest).into_bytes();
        let entry = sink.append_bytes(base, layout::MANIFEST, &manifest, out_label)?;
        tags.tag_manifest.push(&entry.md5, layout::MANIFEST);
        summary.tag_files.push(entry);

        let tag_manifest = std::mem::take(&mut tags.tag_manifest).into_bytes();
        let entry = sink.append_bytes(base, layout::TAG_MANIFEST, &tag_manifest, out_label)?;
        summary.tag_files.push(entry);

        let declaration = layout::declaration();
        let entry = sink.append_bytes(
            base,
            layout::BAGIT_TXT,
            declaration.as_bytes(),
            out_label,
        )?;
        summary.tag_files.push(entry);

        let mut out = sink.finish().map_err(|e| BagError::io(out_label, e))?;
        out.flush().map_err(|e| BagError::io(out_label, e))?;

        Ok((summary, out))
    }
}

/// Container being filled.
enum Sink<W: Write + Seek> {
    TarGz {
        tar: Builder<GzEncoder<W>>,
        owner: String,
    },
    Zip {
        zip: ZipWriter<W>,
        level: u32,
    },
}

impl<W: Write + Seek> Sink<W> {
    fn open(format: ContainerFormat, out: W, options: &WriterOptions) -> Self {
        match format {
            ContainerFormat::TarGz => {
                let encoder = GzBuilder::new()
                    .mtime(0)
                    .operating_system(255)
                    .write(out, Compression::new(options.compression_level));
                let mut tar = Builder::new(encoder);
                tar.mode(tar::HeaderMode::Deterministic);
                Sink::TarGz {
                    tar,
                    owner: options.owner.clone(),
                }
            }
            ContainerFormat::Zip => Sink::Zip {
                zip: ZipWriter::new(out),
                level: options.compression_level,
            },
        }
    }

    /// Append `size` bytes from `data` under the full entry path.
    fn append<R: Read>(
        &mut self,
        entry: &str,
        size: u64,
        data: &mut R,
        out_label: &Path,
    ) -> BagResult<()> {
        match self {
            Sink::TarGz { tar, owner } => {
                let mut header = tar_header(owner, size)?;
                tar.append_data(&mut header, entry, data)
                    .map_err(|e| BagError::io(out_label, e))
            }
            Sink::Zip { zip, level } => {
                zip.start_file(entry, zip_options(*level, size))
                    .map_err(|e| BagError::io(out_label, io::Error::from(e)))?;
                io::copy(data, zip).map_err(|e| BagError::io(out_label, e))?;
                Ok(())
            }
        }
    }

    fn append_bytes(
        &mut self,
        base: &str,
        path: &str,
        data: &[u8],
        out_label: &Path,
    ) -> BagResult<WrittenEntry> {
        let bytes = data.len() as u64;
        self.append(&layout::entry_path(base, path), bytes, &mut &data[..], out_label)?;
        let md5 = md5_hex(data);
        tracing::debug!(path = %path, md5 = %md5, bytes, "tag file written");
        Ok(WrittenEntry {
            path: path.to_string(),
            md5,
            bytes,
            content_type: None,
        })
    }

    fn finish(self) -> io::Result<W> {
        match self {
            Sink::TarGz { tar, .. } => tar.into_inner()?.finish(),
            Sink::Zip { zip, .. } => zip.finish().map_err(io::Error::from),
        }
    }
}

fn tar_header(owner: &str, size: u64) -> BagResult<Header> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
        .set_username(owner)
        .and_then(|_| header.set_groupname(owner))
        .map_err(|e| BagError::InvalidMember {
            name: owner.to_string(),
            reason: format!("unusable tar owner name: {e}"),
        })?;
    Ok(header)
}

/// Fixed timestamp and permissions so zip output is reproducible.
fn zip_options(level: u32, size: u64) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644)
        .large_file(size >= u64::from(u32::MAX));
    if level == 0 {
        options.compression_method(CompressionMethod::Stored)
    } else {
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)))
    }
}

/// Names must be usable and archive paths unique before anything is written.
fn check_members(registry: &Registry) -> BagResult<()> {
    let base = registry.base_dir();
    if let Some(reason) = layout::segment_problem(base) {
        return Err(BagError::InvalidMember {
            name: base.to_string(),
            reason: format!("unusable base directory: {reason}"),
        });
    }

    let mut seen = HashSet::with_capacity(registry.len());
    for member in registry.members() {
        member.validate_name()?;
        let path = member.path();
        if !seen.insert(path.clone()) {
            return Err(BagError::DuplicatePath { path });
        }
    }
    Ok(())
}

fn source_label(member: &Member) -> PathBuf {
    match member.source() {
        super::member::ContentSource::File(path) => path.clone(),
        _ => PathBuf::from(member.path()),
    }
}

fn temp_sibling(parent: &Path, file_name: &str) -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    parent.join(format!(
        ".{}.tmp-{}-{}",
        file_name,
        std::process::id(),
        stamp
    ))
}
