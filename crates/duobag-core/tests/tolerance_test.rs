//! Loading bags with incomplete or damaged index files.

use duobag_core::{Access, BagError, BagReader};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Cursor;

fn archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, path, data.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn test_final_without_sequence_row_loads_unsequenced() {
    let bytes = archive(&[
        ("bag/data/final/a.pdf", "a"),
        ("bag/data/final/b.pdf", "b"),
        ("bag/tagfiles/final.sequence.txt", "1\tdata/final/a.pdf\n"),
        ("bag/tagfiles/formats.txt", "application/pdf\tdata/final/a.pdf\n"),
    ]);
    let bag = BagReader::default().load(Cursor::new(bytes)).unwrap();

    let finals = bag.sequenced_finals();
    assert_eq!(finals.len(), 2);
    assert_eq!(finals[0].display_name(), "a.pdf");
    assert_eq!(finals[0].sequence(), Some(1));
    assert_eq!(finals[0].content_type(), Some("application/pdf"));
    // Unindexed members sort last with attributes unset.
    assert_eq!(finals[1].display_name(), "b.pdf");
    assert_eq!(finals[1].sequence(), None);
    assert_eq!(finals[1].content_type(), None);
    assert!(bag.warnings().is_empty());
}

#[test]
fn test_no_index_files_at_all() {
    let bytes = archive(&[
        ("legacy/data/supporting/s.csv", "s"),
        ("legacy/data/licence/l.txt", "l"),
    ]);
    let bag = BagReader::default().load(Cursor::new(bytes)).unwrap();

    // Supporting members without access are excluded from both tiers.
    assert!(bag.sequenced_supporting(Access::Open).is_empty());
    assert!(bag.sequenced_supporting(Access::Closed).is_empty());
    assert_eq!(bag.licence().unwrap().display_name(), "l.txt");
    assert!(bag.declaration().is_none());
    // Nothing listed in any manifest.
    assert!(!bag.verify().is_ok());
}

#[test]
fn test_malformed_and_crlf_lines() {
    let bytes = archive(&[
        ("bag/data/final/a.pdf", "a"),
        ("bag/data/final/b.pdf", "b"),
        (
            "bag/tagfiles/final.sequence.txt",
            "\r\n2\tdata/final/a.pdf\r\nno-tab-here\n\n1 data/final/b.pdf\n",
        ),
    ]);
    let bag = BagReader::default().load(Cursor::new(bytes)).unwrap();

    let names: Vec<_> = bag
        .sequenced_finals()
        .iter()
        .map(|m| (m.display_name().to_string(), m.sequence()))
        .collect();
    // A space is not a separator: the last row is malformed, so b.pdf has
    // no sequence and sorts last.
    assert_eq!(
        names,
        vec![("a.pdf".to_string(), Some(2)), ("b.pdf".to_string(), None)]
    );

    let lines: Vec<_> = bag.warnings().iter().map(|w| w.line).collect();
    assert_eq!(lines, vec![3, 5]);
    assert!(bag
        .warnings()
        .iter()
        .all(|w| w.file == "tagfiles/final.sequence.txt"));
}

#[test]
fn test_entries_outside_root_and_unknown_dirs_ignored() {
    let bytes = archive(&[
        ("bag/data/final/a.pdf", "a"),
        ("bag/data/other/x.bin", "x"),
        ("bag/README", "hello"),
        ("elsewhere/data/final/z.pdf", "z"),
    ]);
    let bag = BagReader::default().load(Cursor::new(bytes)).unwrap();
    assert_eq!(bag.registry().len(), 1);
}

#[test]
fn test_truncated_container_is_fatal() {
    let mut bytes = archive(&[("bag/data/final/a.pdf", "some content here")]);
    bytes.truncate(bytes.len() / 2);
    let err = BagReader::default().load(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, BagError::Structural { .. }), "{err}");
    assert_eq!(err.exit_code(), 3);
}
