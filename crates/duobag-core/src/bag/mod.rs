//! Bag container: members, registry, writer, reader and verification.
//!
//! The container is a tar.gz or a zip.
//!
//! On-disk layout (rooted at the base directory):
//!
//! ```text
//! <base>/data/final/...            final thesis files
//! <base>/data/supporting/...       supporting material
//! <base>/data/licence/...          licence
//! <base>/data/metadata/metadata.xml
//! <base>/tagfiles/formats.txt
//! <base>/tagfiles/final.sequence.txt
//! <base>/tagfiles/supporting.sequence.txt
//! <base>/tagfiles/supporting.access.txt
//! <base>/manifest-md5.txt
//! <base>/tagmanifest-md5.txt
//! <base>/bagit.txt
//! ```

pub mod container;
pub mod digest;
pub mod layout;
pub mod limits;
pub mod member;
pub mod options;
pub mod reader;
pub mod registry;
pub mod tagfile;
pub mod verify;
pub mod writer;

pub use container::{ArchivedEntry, ContainerFormat};
pub use limits::{ReadLimits, ReadLimitsOverrides};
pub use member::{Access, ContentSource, DocumentProducer, Member, Role};
pub use options::{WriterOptions, WriterOptionsOverrides};
pub use reader::{Bag, BagDeclaration, BagReader};
pub use registry::Registry;
pub use tagfile::IndexWarning;
pub use verify::{verify_bag, verify_bag_path, EntryCheck, EntryStatus, VerifyReport};
pub use writer::{BagWriter, WriteSummary, WrittenEntry};
