//! Write-then-load integration tests.

use duobag_core::metadata::{self, MetadataDocument};
use duobag_core::{
    Access, BagReader, BagWriter, ContentSource, Member, Registry, Role,
};
use duobag_core::{ContainerFormat, WriterOptions};
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;

/// Comparable view of a member: name, type, sequence, access.
fn view(members: Vec<&Member>) -> Vec<(String, Option<String>, Option<u32>, Option<Access>)> {
    members
        .into_iter()
        .map(|m| {
            (
                m.display_name().to_string(),
                m.content_type().map(str::to_string),
                m.sequence(),
                m.access(),
            )
        })
        .collect()
}

#[test]
fn test_round_trip_preserves_queries() {
    let dir = tempdir().unwrap();
    let thesis = dir.path().join("thesis.pdf");
    let appendix = dir.path().join("appendix.docx");
    fs::write(&thesis, b"%PDF-1.7 thesis body").unwrap();
    fs::write(&appendix, b"appendix").unwrap();

    let dest = dir.path().join("submission.tar.gz");
    let mut reg = Registry::for_destination(&dest);
    reg.add_final(ContentSource::file(&thesis), None, None);
    reg.add_final(ContentSource::file(&appendix), None, Some(5));
    reg.add_final(ContentSource::bytes("errata.txt", "p. 4"), Some("text/plain"), Some(2));
    reg.add_supporting(ContentSource::bytes("data.csv", "a,b\n1,2\n"), None, None, Access::Open);
    reg.add_supporting(ContentSource::bytes("raw.zip", vec![0u8; 128]), None, None, Access::Closed);
    reg.add_supporting(ContentSource::bytes("notes.txt", "n"), None, Some(1), Access::Open);
    reg.add_licence(ContentSource::bytes("licence.txt", "CC-BY 4.0"), None);

    let mut doc = MetadataDocument::new();
    doc.add_field(metadata::NAME, "Thor Heyerdahl").unwrap();
    doc.add_subject("AST3220", "Kosmologi I");
    reg.add_metadata_document(doc.clone());

    let summary = BagWriter::default().write_to_path(&reg, &dest).unwrap();
    assert_eq!(summary.base_dir, "submission");
    assert_eq!(summary.payload.len(), 8);

    let bag = BagReader::default().load_path(&dest).unwrap();
    assert_eq!(bag.base_dir(), "submission");
    assert!(bag.warnings().is_empty());

    assert_eq!(view(bag.sequenced_finals()), view(reg.sequenced_finals()));
    assert_eq!(
        view(bag.sequenced_supporting(Access::Open)),
        view(reg.sequenced_supporting(Access::Open))
    );
    assert_eq!(
        view(bag.sequenced_supporting(Access::Closed)),
        view(reg.sequenced_supporting(Access::Closed))
    );

    let finals: Vec<_> = bag
        .sequenced_finals()
        .iter()
        .map(|m| m.display_name().to_string())
        .collect();
    assert_eq!(finals, vec!["thesis.pdf", "errata.txt", "appendix.docx"]);

    let licence = bag.licence().unwrap();
    assert_eq!(licence.display_name(), "licence.txt");
    assert_eq!(licence.content_type(), Some("text/plain"));
    assert_eq!(licence.read_all().unwrap(), b"CC-BY 4.0");

    let meta = bag.metadata().unwrap();
    assert_eq!(meta.role(), Role::Metadata);
    assert_eq!(meta.display_name(), "metadata.xml");
    assert_eq!(meta.content_type(), Some("text/xml"));
    assert_eq!(meta.read_all().unwrap(), doc.to_xml().into_bytes());

    let thesis_member = bag.registry().member("data/final/thesis.pdf").unwrap();
    assert_eq!(thesis_member.read_all().unwrap(), b"%PDF-1.7 thesis body");
    // Reading twice yields the same bytes.
    assert_eq!(thesis_member.read_all().unwrap(), b"%PDF-1.7 thesis body");
    assert_eq!(
        thesis_member.checksum(),
        summary
            .payload
            .iter()
            .find(|e| e.path == "data/final/thesis.pdf")
            .map(|e| e.md5.as_str())
    );

    assert_eq!(bag.supporting_access("data/supporting/raw.zip"), Some(Access::Closed));
    assert_eq!(bag.whole_archive_name(), Some("submission.tar.gz"));
    assert_eq!(Some(bag.whole_archive_digest()), summary.archive_md5.as_deref());
    assert!(bag.verify().is_ok());
}

#[test]
fn test_sequence_defaults_survive_round_trip() {
    let mut reg = Registry::new("seq");
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        reg.add_final(ContentSource::bytes(name, name), None, None);
    }
    assert_eq!(reg.add_final(ContentSource::bytes("d.pdf", "d"), None, Some(10)), 10);
    assert_eq!(reg.add_final(ContentSource::bytes("e.pdf", "e"), None, None), 11);

    let mut out = Cursor::new(Vec::new());
    BagWriter::default().write(&reg, &mut out).unwrap();
    let bag = BagReader::default().load(Cursor::new(out.into_inner())).unwrap();

    let seqs: Vec<_> = bag
        .sequenced_finals()
        .iter()
        .map(|m| m.sequence().unwrap())
        .collect();
    assert_eq!(seqs, vec![1, 2, 3, 10, 11]);
}

#[test]
fn test_access_filtering_after_load() {
    let mut reg = Registry::new("access");
    reg.add_supporting(ContentSource::bytes("o2.csv", "2"), None, Some(2), Access::Open);
    reg.add_supporting(ContentSource::bytes("c.csv", "c"), None, None, Access::Closed);
    reg.add_supporting(ContentSource::bytes("o1.csv", "1"), None, Some(1), Access::Open);

    let mut out = Cursor::new(Vec::new());
    BagWriter::default().write(&reg, &mut out).unwrap();
    let bag = BagReader::default().load(Cursor::new(out.into_inner())).unwrap();

    let open: Vec<_> = bag
        .sequenced_supporting(Access::Open)
        .iter()
        .map(|m| m.display_name().to_string())
        .collect();
    assert_eq!(open, vec!["o1.csv", "o2.csv"]);

    let closed = bag.sequenced_supporting(Access::Closed);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].display_name(), "c.csv");
}

#[test]
fn test_empty_bag_round_trip() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("empty.tar.gz");
    BagWriter::default()
        .write_to_path(&Registry::for_destination(&dest), &dest)
        .unwrap();

    let bag = BagReader::default().load_path(&dest).unwrap();
    assert_eq!(bag.base_dir(), "empty");
    assert!(bag.sequenced_finals().is_empty());
    assert!(bag.sequenced_supporting(Access::Open).is_empty());
    assert!(bag.sequenced_supporting(Access::Closed).is_empty());
    assert!(bag.metadata().is_none());
    assert!(bag.licence().is_none());
    assert!(bag.verify().is_ok());
}

#[test]
fn test_renamed_container_keeps_base_dir() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("thesis-2024.tar.gz");
    let mut reg = Registry::for_destination(&original);
    reg.add_final(ContentSource::bytes("main.pdf", "body"), None, None);
    BagWriter::default().write_to_path(&reg, &original).unwrap();

    let renamed = dir.path().join("upload-17.tgz");
    fs::rename(&original, &renamed).unwrap();

    let bag = BagReader::default().load_path(&renamed).unwrap();
    assert_eq!(bag.base_dir(), "thesis-2024");
    assert_eq!(bag.whole_archive_name(), Some("upload-17.tgz"));
    assert_eq!(bag.sequenced_finals().len(), 1);
}

#[test]
fn test_identical_registries_give_identical_containers() {
    let build = || {
        let mut reg = Registry::new("same");
        reg.add_final(ContentSource::bytes("a.pdf", "a"), None, None);
        reg.add_licence(ContentSource::bytes("l.txt", "l"), None);
        let mut out = Cursor::new(Vec::new());
        BagWriter::default().write(&reg, &mut out).unwrap();
        out.into_inner()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_names_with_surrounding_spaces_keep_their_index_rows() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("spaces.tar.gz");
    let mut reg = Registry::for_destination(&dest);
    reg.add_final(ContentSource::bytes("notes.pdf ", "trailing"), None, Some(4));
    reg.add_final(ContentSource::bytes(" lead.pdf", "leading"), None, Some(2));
    reg.add_supporting(
        ContentSource::bytes("data.csv ", "a,b\n"),
        Some("text/csv"),
        None,
        Access::Open,
    );
    BagWriter::default().write_to_path(&reg, &dest).unwrap();

    let bag = BagReader::default().load_path(&dest).unwrap();
    assert!(bag.warnings().is_empty(), "{:?}", bag.warnings());
    assert_eq!(view(bag.sequenced_finals()), view(reg.sequenced_finals()));

    let notes = bag.registry().member("data/final/notes.pdf ").unwrap();
    assert_eq!(notes.sequence(), Some(4));
    assert_eq!(notes.content_type(), Some("application/pdf"));

    let open = bag.sequenced_supporting(Access::Open);
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].display_name(), "data.csv ");
    assert_eq!(open[0].content_type(), Some("text/csv"));
    assert_eq!(bag.supporting_access("data/supporting/data.csv "), Some(Access::Open));
    assert!(bag.verify().is_ok());
}

#[test]
fn test_zip_round_trip_preserves_queries() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("submission.zip");
    let mut reg = Registry::for_destination(&dest);
    reg.add_final(ContentSource::bytes("thesis.pdf", "%PDF body"), None, None);
    reg.add_supporting(ContentSource::bytes("raw.bin", vec![7u8; 4096]), None, Some(3), Access::Closed);
    reg.add_licence(ContentSource::bytes("licence.txt", "CC0"), None);

    let summary = BagWriter::default().write_to_path(&reg, &dest).unwrap();
    assert_eq!(summary.format, ContainerFormat::Zip);
    assert_eq!(summary.base_dir, "submission");

    let bag = BagReader::default().load_path(&dest).unwrap();
    assert_eq!(bag.mime_type(), "application/zip");
    assert_eq!(bag.base_dir(), "submission");
    assert_eq!(
        view(bag.sequenced_supporting(Access::Closed)),
        view(reg.sequenced_supporting(Access::Closed))
    );
    assert_eq!(
        bag.registry().member("data/supporting/raw.bin").unwrap().read_all().unwrap(),
        vec![7u8; 4096]
    );
    assert_eq!(Some(bag.whole_archive_digest()), summary.archive_md5.as_deref());
    assert!(bag.verify().is_ok());
}

#[test]
fn test_identical_registries_give_identical_zips() {
    let build = || {
        let mut reg = Registry::new("same");
        reg.add_final(ContentSource::bytes("a.pdf", "a"), None, None);
        let mut out = Cursor::new(Vec::new());
        BagWriter::new(WriterOptions {
            format: Some(ContainerFormat::Zip),
            ..WriterOptions::default()
        })
        .write(&reg, &mut out)
        .unwrap();
        out.into_inner()
    };
    assert_eq!(build(), build());
}
