//! Thesis submission bags.
//!
//! A bag is a deterministic tar.gz or zip container holding the final version of a
//! thesis, its supporting material, a licence and a metadata document, along
//! with flat tag files that record ordering, access and content types, and
//! MD5 manifests over everything.
//!
//! - [`Registry`] collects members and assigns sequence numbers.
//! - [`BagWriter`] seals a registry into a container in one pass.
//! - [`BagReader`] loads an existing container back into a read-only [`Bag`].
//!
//! ```no_run
//! use duobag_core::{Access, BagReader, BagWriter, ContentSource, Registry};
//!
//! let mut registry = Registry::for_destination("thesis.tar.gz");
//! registry.add_final(ContentSource::file("thesis.pdf"), None, None);
//! registry.add_supporting(ContentSource::file("data.csv"), None, None, Access::Open);
//! BagWriter::default().write_to_path(&registry, "thesis.tar.gz").unwrap();
//!
//! let bag = BagReader::default().load_path("thesis.tar.gz").unwrap();
//! assert!(bag.verify().is_ok());
//! ```

pub mod bag;
pub mod content_type;
pub mod error;
pub mod metadata;

pub use bag::{
    verify_bag, verify_bag_path, Access, ArchivedEntry, Bag, BagDeclaration, BagReader, BagWriter,
    ContainerFormat, ContentSource, DocumentProducer, EntryCheck, EntryStatus, IndexWarning, Member, ReadLimits,
    ReadLimitsOverrides, Registry, Role, VerifyReport, WriteSummary, WrittenEntry,
    WriterOptions, WriterOptionsOverrides,
};
pub use content_type::{ContentTypeGuesser, ExtensionTable};
pub use error::{BagError, BagResult};
pub use metadata::MetadataDocument;

// Re-export bytes so callers can build in-memory sources without a direct dependency
pub use bytes::Bytes;
