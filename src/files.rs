//! Path sanitization and content-type guessing for file responses.
//!
//! Wildcard captures arrive raw from the request line. Before they touch
//! the filesystem they are percent-decoded and normalized, and any path
//! that would climb above the serving root is rejected outright.

use std::path::Path;

use percent_encoding::percent_decode_str;

use crate::response::{MIME_HTML, MIME_JSON, MIME_OCTET_STREAM, MIME_TEXT};

/// Percent-decodes a captured path and resolves it to a clean relative
/// path. Returns `None` for non-UTF-8 escapes and for `..` traversal that
/// would escape the serving root.
pub(crate) fn sanitize(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}

/// Content type by file extension; `application/octet-stream` when unknown.
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "html" | "htm" => MIME_HTML,
        "json" => MIME_JSON,
        "txt" => MIME_TEXT,
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        _ => MIME_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass_through() {
        assert_eq!(sanitize("css/site.css").as_deref(), Some("css/site.css"));
        assert_eq!(sanitize("").as_deref(), Some(""));
    }

    #[test]
    fn dot_segments_are_collapsed() {
        assert_eq!(sanitize("a/./b").as_deref(), Some("a/b"));
        assert_eq!(sanitize("a/x/../b").as_deref(), Some("a/b"));
        assert_eq!(sanitize("a//b").as_deref(), Some("a/b"));
    }

    #[test]
    fn escapes_above_the_root_are_rejected() {
        assert_eq!(sanitize(".."), None);
        assert_eq!(sanitize("../etc/passwd"), None);
        assert_eq!(sanitize("a/../../etc"), None);
        // Encoded traversal is decoded before the check.
        assert_eq!(sanitize("%2e%2e/secret"), None);
    }

    #[test]
    fn percent_encoding_is_decoded() {
        assert_eq!(sanitize("with%20space.txt").as_deref(), Some("with space.txt"));
    }

    #[test]
    fn extension_maps_to_content_type() {
        assert_eq!(content_type_for(Path::new("index.html")), MIME_HTML);
        assert_eq!(content_type_for(Path::new("logo.png")), "image/png");
        assert_eq!(content_type_for(Path::new("blob.bin")), MIME_OCTET_STREAM);
    }
}
