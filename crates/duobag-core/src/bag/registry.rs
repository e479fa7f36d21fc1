//! Ordered member collection with per-role sequence counters.

use super::layout;
use super::member::{display_name_for, Access, ContentSource, DocumentProducer, Member, Role};
use crate::content_type::{ContentTypeGuesser, ExtensionTable};
use std::path::Path;
use std::sync::Arc;

/// Ordered collection of bag members.
///
/// Iteration order is insertion order and is the order members are written
/// in. Sequence order is only applied by the `sequenced_*` queries.
#[derive(Debug, Clone)]
pub struct Registry {
    base_dir: String,
    members: Vec<Member>,
    final_counter: u32,
    supporting_counter: u32,
    guesser: Arc<dyn ContentTypeGuesser>,
}

impl Registry {
    /// Empty registry whose container root directory is `base_dir`.
    pub fn new(base_dir: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            members: Vec::new(),
            final_counter: 0,
            supporting_counter: 0,
            guesser: Arc::new(ExtensionTable),
        }
    }

    /// Empty registry named after the container it will be written to.
    pub fn for_destination(path: impl AsRef<Path>) -> Self {
        let base = path
            .as_ref()
            .file_name()
            .map(|n| layout::base_dir_for(&n.to_string_lossy()))
            .unwrap_or_else(|| "bag".to_string());
        Self::new(base)
    }

    /// Replace the MIME guesser used for members added from now on.
    pub fn with_guesser(mut self, guesser: Arc<dyn ContentTypeGuesser>) -> Self {
        self.guesser = guesser;
        self
    }

    pub(crate) fn from_loaded(base_dir: String, members: Vec<Member>) -> Self {
        let max_of = |role: Role| {
            members
                .iter()
                .filter(|m| m.role == role)
                .filter_map(|m| m.sequence)
                .max()
                .unwrap_or(0)
        };
        let final_counter = max_of(Role::Final);
        let supporting_counter = max_of(Role::Supporting);
        Self {
            base_dir,
            members,
            final_counter,
            supporting_counter,
            guesser: Arc::new(ExtensionTable),
        }
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// All members in insertion order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a final-version file. Returns the sequence number it was given.
    ///
    /// Without an explicit `sequence` the member goes after the highest
    /// final sequence seen so far (the first one gets 1).
    pub fn add_final(
        &mut self,
        source: ContentSource,
        content_type: Option<&str>,
        sequence: Option<u32>,
    ) -> u32 {
        let seq = assign_sequence(&mut self.final_counter, sequence);
        self.push(Role::Final, source, content_type, Some(seq), None);
        seq
    }

    /// Add a supporting file with its access tier. Returns its sequence.
    pub fn add_supporting(
        &mut self,
        source: ContentSource,
        content_type: Option<&str>,
        sequence: Option<u32>,
        access: Access,
    ) -> u32 {
        let seq = assign_sequence(&mut self.supporting_counter, sequence);
        self.push(Role::Supporting, source, content_type, Some(seq), Some(access));
        seq
    }

    /// Add a licence file. Consumers expect at most one.
    pub fn add_licence(&mut self, source: ContentSource, content_type: Option<&str>) {
        self.push(Role::Licence, source, content_type, None, None);
    }

    /// Set the metadata document, replacing any earlier one.
    ///
    /// Always stored as `metadata.xml` with type `text/xml`.
    pub fn add_metadata(&mut self, source: ContentSource) {
        let member = Member {
            role: Role::Metadata,
            source,
            display_name: layout::METADATA_NAME.to_string(),
            sequence: None,
            access: None,
            content_type: Some(layout::METADATA_CONTENT_TYPE.to_string()),
            checksum: None,
        };
        match self.members.iter_mut().find(|m| m.role == Role::Metadata) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }

    /// Set the metadata from a document producer.
    pub fn add_metadata_document(&mut self, producer: impl DocumentProducer + 'static) {
        self.add_metadata(ContentSource::document(producer));
    }

    fn push(
        &mut self,
        role: Role,
        source: ContentSource,
        content_type: Option<&str>,
        sequence: Option<u32>,
        access: Option<Access>,
    ) {
        let display_name = display_name_for(&source);
        let content_type = match content_type {
            Some(ct) => ct.to_string(),
            None => self.guesser.guess_type(&display_name),
        };
        tracing::debug!(
            role = %role,
            name = %display_name,
            sequence = ?sequence,
            content_type = %content_type,
            "member added"
        );
        self.members.push(Member {
            role,
            source,
            display_name,
            sequence,
            access,
            content_type: Some(content_type),
            checksum: None,
        });
    }

    /// Final members ordered by sequence.
    ///
    /// Ties keep insertion order; members without a recorded sequence come
    /// last.
    pub fn sequenced_finals(&self) -> Vec<&Member> {
        self.sequenced(Role::Final, |_| true)
    }

    /// Supporting members with the given access tier, ordered by sequence.
    ///
    /// Members with no recorded access tier are never returned.
    pub fn sequenced_supporting(&self, access: Access) -> Vec<&Member> {
        self.sequenced(Role::Supporting, |m| m.access == Some(access))
    }

    fn sequenced(&self, role: Role, keep: impl Fn(&Member) -> bool) -> Vec<&Member> {
        let mut out: Vec<&Member> = self
            .members
            .iter()
            .filter(|m| m.role == role && keep(*m))
            .collect();
        out.sort_by_key(|m| (m.sequence.is_none(), m.sequence));
        out
    }

    /// The metadata member, if any.
    pub fn metadata(&self) -> Option<&Member> {
        self.first_of(Role::Metadata)
    }

    /// The licence member, if any. The first one wins if several exist.
    pub fn licence(&self) -> Option<&Member> {
        self.first_of(Role::Licence)
    }

    fn first_of(&self, role: Role) -> Option<&Member> {
        self.members.iter().find(|m| m.role == role)
    }

    /// Member at a bag-relative path such as `data/final/thesis.pdf`.
    pub fn member(&self, path: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.path() == path)
    }

    /// Access tier recorded for a supporting member path.
    pub fn supporting_access(&self, path: &str) -> Option<Access> {
        self.member(path)
            .filter(|m| m.role == Role::Supporting)
            .and_then(|m| m.access)
    }
}

fn assign_sequence(counter: &mut u32, requested: Option<u32>) -> u32 {
    let seq = requested.unwrap_or_else(|| counter.saturating_add(1));
    *counter = (*counter).max(seq);
    seq
}
