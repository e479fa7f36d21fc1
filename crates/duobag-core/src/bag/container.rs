//! Container formats and lazily reopened entries.
//!
//! A bag can live in a deterministic tar.gz or a zip. The format is picked
//! from the destination name when writing and sniffed from the leading
//! bytes when reading.

use flate2::read::{DeflateDecoder, GzDecoder};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Container kind of a bag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerFormat {
    #[default]
    TarGz,
    Zip,
}

impl ContainerFormat {
    /// MIME type handed to hosting applications.
    pub fn mime_type(self) -> &'static str {
        match self {
            ContainerFormat::TarGz => "application/gzip",
            ContainerFormat::Zip => "application/zip",
        }
    }

    /// Format implied by a container file name. Anything but `.zip` is tar.gz.
    pub fn for_file_name(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".zip") {
            ContainerFormat::Zip
        } else {
            ContainerFormat::TarGz
        }
    }

    /// Detect the format from the first bytes of a container.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&GZIP_MAGIC) {
            return Some(ContainerFormat::TarGz);
        }
        if header.len() >= 4
            && header[..2] == *b"PK"
            && matches!((header[2], header[3]), (3, 4) | (5, 6))
        {
            return Some(ContainerFormat::Zip);
        }
        None
    }
}

/// Where the bytes of an entry sit inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryLocation {
    /// Offset into the decompressed tar stream.
    TarGz { offset: u64 },
    /// Uncompressed zip member starting at `data_start`.
    ZipStored { data_start: u64 },
    /// Deflated zip member of `compressed` bytes starting at `data_start`.
    ZipDeflated { data_start: u64, compressed: u64 },
}

/// A payload entry left in its container file and reopened on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedEntry {
    pub(crate) archive: PathBuf,
    /// Last path segment of the entry.
    pub(crate) name: String,
    pub(crate) location: EntryLocation,
    pub(crate) size: u64,
}

impl ArchivedEntry {
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reopen the container and position a reader on this entry.
    pub(crate) fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        let mut file = BufReader::new(File::open(&self.archive)?);
        match self.location {
            EntryLocation::TarGz { offset } => {
                let mut decoder = GzDecoder::new(file);
                let skipped = io::copy(&mut (&mut decoder).take(offset), &mut io::sink())?;
                if skipped != offset {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "container ends before the entry",
                    ));
                }
                Ok(Box::new(decoder.take(self.size)))
            }
            EntryLocation::ZipStored { data_start } => {
                file.seek(SeekFrom::Start(data_start))?;
                Ok(Box::new(file.take(self.size)))
            }
            EntryLocation::ZipDeflated {
                data_start,
                compressed,
            } => {
                file.seek(SeekFrom::Start(data_start))?;
                Ok(Box::new(
                    DeflateDecoder::new(file.take(compressed)).take(self.size),
                ))
            }
        }
    }
}
