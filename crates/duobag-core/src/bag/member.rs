//! Package members: role, access tier and content source.

use super::container::ArchivedEntry;
use crate::error::{BagError, BagResult};
use bytes::Bytes;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// What a member is for. Determines its data directory and which index
/// files it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Final,
    Supporting,
    Licence,
    Metadata,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Final, Role::Supporting, Role::Licence, Role::Metadata];

    /// Directory under `data/`.
    pub fn dir(self) -> &'static str {
        match self {
            Role::Final => "final",
            Role::Supporting => "supporting",
            Role::Licence => "licence",
            Role::Metadata => "metadata",
        }
    }

    pub fn from_dir(dir: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.dir() == dir)
    }

    /// Whether members of this role carry a sequence number.
    pub fn is_sequenced(self) -> bool {
        match self {
            Role::Final | Role::Supporting => true,
            Role::Licence | Role::Metadata => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// Access tier of a supporting member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Open,
    Closed,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Open => "open",
            Access::Closed => "closed",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("open") {
            Ok(Access::Open)
        } else if s.eq_ignore_ascii_case("closed") {
            Ok(Access::Closed)
        } else {
            Err(format!("unknown access tier {s:?} (expected open or closed)"))
        }
    }
}

/// Produces a generated XML document, e.g. the submission metadata.
pub trait DocumentProducer: Send + Sync + fmt::Debug {
    fn serialize_to_xml(&self) -> Vec<u8>;
}

/// Where a member's bytes come from.
///
/// Every variant can be opened any number of times.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// A file on disk, re-opened on every read.
    File(PathBuf),
    /// An in-memory buffer with the name it should carry in the bag.
    Bytes { name: String, data: Bytes },
    /// A document rendered on demand.
    Document(Arc<dyn DocumentProducer>),
    /// An entry of a loaded container, read back from the container file.
    Archived(ArchivedEntry),
}

impl ContentSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn document(producer: impl DocumentProducer + 'static) -> Self {
        Self::Document(Arc::new(producer))
    }

    /// Natural name of the source. Documents have none.
    pub fn name(&self) -> Option<String> {
        match self {
            Self::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            Self::Bytes { name, .. } => Some(name.clone()),
            Self::Document(_) => None,
            Self::Archived(entry) => Some(entry.name.clone()),
        }
    }

    /// Open a fresh reader and report the exact number of bytes it yields.
    pub fn open(&self) -> BagResult<(Box<dyn Read + Send>, u64)> {
        match self {
            Self::File(path) => {
                let file = std::fs::File::open(path).map_err(|e| BagError::io(path, e))?;
                let len = file.metadata().map_err(|e| BagError::io(path, e))?.len();
                Ok((Box::new(file), len))
            }
            Self::Bytes { data, .. } => {
                let len = data.len() as u64;
                Ok((Box::new(Cursor::new(data.clone())), len))
            }
            Self::Document(producer) => {
                let xml = Bytes::from(producer.serialize_to_xml());
                let len = xml.len() as u64;
                Ok((Box::new(Cursor::new(xml)), len))
            }
            Self::Archived(entry) => {
                let reader = entry.open().map_err(|e| BagError::io(self.describe(), e))?;
                Ok((reader, entry.size))
            }
        }
    }

    /// Read the whole content into memory.
    pub fn read_all(&self) -> BagResult<Vec<u8>> {
        let (mut reader, len) = self.open()?;
        let mut buf = Vec::with_capacity(len as usize);
        reader
            .read_to_end(&mut buf)
            .map_err(|e| BagError::io(self.describe(), e))?;
        Ok(buf)
    }

    fn describe(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Bytes { name, .. } => PathBuf::from(name),
            Self::Document(_) => PathBuf::from("<document>"),
            Self::Archived(entry) => entry.archive.join(&entry.name),
        }
    }
}

/// One file inside (or destined for) a bag.
#[derive(Debug, Clone)]
pub struct Member {
    pub(crate) role: Role,
    pub(crate) source: ContentSource,
    pub(crate) display_name: String,
    pub(crate) sequence: Option<u32>,
    pub(crate) access: Option<Access>,
    pub(crate) content_type: Option<String>,
    pub(crate) checksum: Option<String>,
}

impl Member {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// Base name inside the bag.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    pub fn access(&self) -> Option<Access> {
        self.access
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// MD5 recorded in the payload manifest. Only set on loaded bags.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Bag-relative path, e.g. `data/final/thesis.pdf`.
    pub fn path(&self) -> String {
        super::layout::payload_path(self.role, &self.display_name)
    }

    /// Open the member's bytes. Repeatable.
    pub fn open(&self) -> BagResult<Box<dyn Read + Send>> {
        self.source.open().map(|(reader, _)| reader)
    }

    /// Read the member's bytes into memory.
    pub fn read_all(&self) -> BagResult<Vec<u8>> {
        self.source.read_all()
    }

    /// Reject names that cannot be a single entry inside a data directory.
    pub(crate) fn validate_name(&self) -> BagResult<()> {
        match super::layout::segment_problem(&self.display_name) {
            Some(reason) => Err(BagError::InvalidMember {
                name: self.display_name.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Display name for a source, falling back to the path's lossy rendering.
pub(crate) fn display_name_for(source: &ContentSource) -> String {
    source.name().unwrap_or_else(|| match source {
        ContentSource::File(path) => Path::new(path).to_string_lossy().into_owned(),
        _ => String::new(),
    })
}
