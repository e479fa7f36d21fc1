//! Resource limits and bounded readers for loading bags.

use serde::Deserialize;
use std::io::{self, Read};

/// Resource limits applied while loading a bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Compressed container size.
    pub max_archive_bytes: u64,
    /// Total decompressed tar stream size.
    pub max_decode_bytes: u64,
    /// Size of any single entry.
    pub max_entry_bytes: u64,
    pub max_entries: usize,
    pub max_path_len: usize,
    pub max_tag_line_bytes: usize,
    /// Payload bytes kept in memory when the bag is loaded from a stream
    /// rather than a file.
    pub max_retained_bytes: u64,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: 4 * 1024 * 1024 * 1024, // 4 GB compressed
            max_decode_bytes: 8 * 1024 * 1024 * 1024,  // 8 GB uncompressed
            max_entry_bytes: 2 * 1024 * 1024 * 1024,   // 2 GB
            max_entries: 10_000,
            max_path_len: 1024,
            max_tag_line_bytes: 8 * 1024,
            max_retained_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Partial overrides for `ReadLimits`. Used for CLI/config parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadLimitsOverrides {
    pub max_archive_bytes: Option<u64>,
    pub max_decode_bytes: Option<u64>,
    pub max_entry_bytes: Option<u64>,
    pub max_entries: Option<usize>,
    pub max_path_len: Option<usize>,
    pub max_tag_line_bytes: Option<usize>,
    pub max_retained_bytes: Option<u64>,
}

impl ReadLimits {
    /// Apply overrides onto these limits. Only `Some` values override.
    pub fn apply(self, overrides: ReadLimitsOverrides) -> Self {
        Self {
            max_archive_bytes: overrides
                .max_archive_bytes
                .unwrap_or(self.max_archive_bytes),
            max_decode_bytes: overrides.max_decode_bytes.unwrap_or(self.max_decode_bytes),
            max_entry_bytes: overrides.max_entry_bytes.unwrap_or(self.max_entry_bytes),
            max_entries: overrides.max_entries.unwrap_or(self.max_entries),
            max_path_len: overrides.max_path_len.unwrap_or(self.max_path_len),
            max_tag_line_bytes: overrides
                .max_tag_line_bytes
                .unwrap_or(self.max_tag_line_bytes),
            max_retained_bytes: overrides
                .max_retained_bytes
                .unwrap_or(self.max_retained_bytes),
        }
    }
}

/// Tags carried in the io errors raised by [`LimitReader`], so the loader
/// can tell a limit hit from a corrupt stream.
pub(crate) const LIMIT_TAG_ARCHIVE: &str = "LimitArchiveBytes";
pub(crate) const LIMIT_TAG_DECODE: &str = "LimitDecodeBytes";

/// Passes at most `limit` bytes through and errors if the inner stream
/// has more to give.
pub(crate) struct LimitReader<R> {
    inner: R,
    remaining: u64,
    limit: u64,
    tag: &'static str,
}

impl<R: Read> LimitReader<R> {
    pub(crate) fn new(inner: R, limit: u64, tag: &'static str) -> Self {
        Self {
            inner,
            remaining: limit,
            limit,
            tag,
        }
    }
}

impl<R: Read> Read for LimitReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            let mut extra = [0u8; 1];
            return match self.inner.read(&mut extra)? {
                0 => Ok(0),
                _ => Err(io::Error::other(format!(
                    "{}: exceeded limit of {} bytes",
                    self.tag, self.limit
                ))),
            };
        }

        let window = self.remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..window])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

const MAX_INTERRUPTS: usize = 16;

/// Retries reads interrupted by a signal, up to [`MAX_INTERRUPTS`] in a row.
pub(crate) struct EintrReader<R> {
    inner: R,
}

impl<R: Read> EintrReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for EintrReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for _ in 0..MAX_INTERRUPTS {
            match self.inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
        Err(io::Error::new(
            io::ErrorKind::Interrupted,
            format!("read interrupted {MAX_INTERRUPTS} times in a row"),
        ))
    }
}
