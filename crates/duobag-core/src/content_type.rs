//! MIME type guessing from file names.

use std::path::Path;

/// Fallback when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guesses a content type from a file name.
///
/// Implementations must not touch the filesystem.
pub trait ContentTypeGuesser: Send + Sync + std::fmt::Debug {
    fn guess_type(&self, file_name: &str) -> String;
}

/// Extension-based guesser covering the formats thesis submissions
/// usually carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionTable;

const TABLE: &[(&str, &str)] = &[
    // documents
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("rtf", "application/rtf"),
    ("tex", "application/x-tex"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("xml", "text/xml"),
    ("ps", "application/postscript"),
    ("epub", "application/epub+zip"),
    // data
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("json", "application/json"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    // images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    // audio / video
    ("mp3", "audio/mpeg"),
    ("wav", "audio/x-wav"),
    ("ogg", "audio/ogg"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    // archives
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("7z", "application/x-7z-compressed"),
];

impl ContentTypeGuesser for ExtensionTable {
    fn guess_type(&self, file_name: &str) -> String {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        ext.and_then(|ext| {
            TABLE
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| (*mime).to_string())
        })
        .unwrap_or_else(|| OCTET_STREAM.to_string())
    }
}
