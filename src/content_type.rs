//! Content type detection for uploads.
//!
//! Looks at the leading bytes first, then at the file extension.

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// How many leading bytes [`detect`] looks at.
pub const SNIFF_LEN: usize = 1024;

const EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("wasm", "application/wasm"),
];

/// Picks a content type for `head`, the first bytes of a file named `name`.
pub fn detect(head: &[u8], name: &str) -> &'static str {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }
    if let Some(found) = by_extension(name) {
        return found;
    }
    if !head.contains(&0) && looks_like_utf8(head) {
        return "text/plain; charset=utf-8";
    }
    OCTET_STREAM
}

fn by_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Valid UTF-8, allowing a multi-byte sequence cut off at the end of the
/// sniffed window.
fn looks_like_utf8(head: &[u8]) -> bool {
    if head.is_empty() {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && head.len() - e.valid_up_to() < 4,
    }
}
