//! MIME tree extraction: body text selection and attachment enumeration

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::models::{Attachment, MimePart};

/// Defensive cap on recursion depth.
const MAX_PART_DEPTH: usize = 100;

/// Decode URL-safe base64 text (padded or not) into a UTF-8 string.
///
/// Invalid byte sequences become replacement characters; any decode
/// failure yields an empty string rather than an error.
pub fn decode_text(data: &str) -> String {
    let trimmed = data.trim_end_matches('=');
    match URL_SAFE_NO_PAD.decode(trimmed) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Extract the best-effort plain-text body from a MIME tree.
///
/// Multipart nodes prefer a direct `text/plain` child; failing that, the
/// second pass descends into nested multiparts and settles for `text/html`.
/// Leaf nodes decode their own data. Returns an empty string when nothing
/// usable is found, never an error.
pub fn extract_body(node: &MimePart) -> String {
    extract_at(node, 0)
}

fn extract_at(node: &MimePart, depth: usize) -> String {
    if depth > MAX_PART_DEPTH {
        return String::new();
    }

    if !node.parts.is_empty() {
        // First pass: a direct plain-text child wins outright
        for child in &node.parts {
            if child.mime_type == "text/plain" {
                if let Some(data) = non_empty_data(child) {
                    return decode_text(data);
                }
            }
        }
        // Second pass: recurse into nested containers, else take HTML
        for child in &node.parts {
            if !child.parts.is_empty() {
                let nested = extract_at(child, depth + 1);
                if !nested.is_empty() {
                    return nested;
                }
            }
            if child.mime_type == "text/html" {
                if let Some(data) = non_empty_data(child) {
                    return decode_text(data);
                }
            }
        }
        return String::new();
    }

    match non_empty_data(node) {
        Some(data) => decode_text(data),
        None => String::new(),
    }
}

/// Enumerate named leaves of a MIME tree in depth-first pre-order.
///
/// Only the node's children are scanned; the node itself is never emitted.
/// A child carrying both a filename and nested parts is emitted and then
/// descended into. No dedup, no size filtering.
pub fn list_attachments(node: &MimePart) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    scan_parts(&node.parts, &mut attachments, 0);
    attachments
}

fn scan_parts(parts: &[MimePart], out: &mut Vec<Attachment>, depth: usize) {
    if depth > MAX_PART_DEPTH {
        return;
    }

    for part in parts {
        if let Some(filename) = part.filename.as_deref() {
            if !filename.is_empty() {
                out.push(Attachment {
                    filename: filename.to_string(),
                    mime_type: part.mime_type.clone(),
                    attachment_id: part.attachment_id.clone(),
                    size: part.size.unwrap_or(0),
                });
            }
        }
        if !part.parts.is_empty() {
            scan_parts(&part.parts, out, depth + 1);
        }
    }
}

fn non_empty_data(part: &MimePart) -> Option<&str> {
    part.data.as_deref().filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;
    use proptest::prelude::*;

    fn text_part(mime_type: &str, text: &str) -> MimePart {
        MimePart {
            mime_type: mime_type.to_string(),
            data: Some(URL_SAFE_NO_PAD.encode(text)),
            ..Default::default()
        }
    }

    fn container(mime_type: &str, parts: Vec<MimePart>) -> MimePart {
        MimePart {
            mime_type: mime_type.to_string(),
            parts,
            ..Default::default()
        }
    }

    fn attachment_part(filename: &str, mime_type: &str) -> MimePart {
        MimePart {
            mime_type: mime_type.to_string(),
            filename: Some(filename.to_string()),
            attachment_id: Some(format!("att-{}", filename)),
            size: Some(1024),
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // Body extraction
    // ------------------------------------------------------------------

    #[test]
    fn test_leaf_decodes_unpadded_data() {
        let node = MimePart {
            mime_type: "text/plain".to_string(),
            data: Some("aGVsbG8".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_body(&node), "hello");
    }

    #[test]
    fn test_leaf_decodes_padded_data() {
        let node = MimePart {
            mime_type: "text/plain".to_string(),
            data: Some("aGVsbG8=".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_body(&node), "hello");
    }

    #[test]
    fn test_leaf_without_data_is_empty() {
        let node = MimePart {
            mime_type: "text/plain".to_string(),
            ..Default::default()
        };
        assert_eq!(extract_body(&node), "");
    }

    #[test]
    fn test_invalid_base64_is_empty() {
        let node = MimePart {
            mime_type: "text/plain".to_string(),
            data: Some("not*valid*base64!".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_body(&node), "");
    }

    #[test]
    fn test_invalid_utf8_uses_replacement_chars() {
        let node = MimePart {
            mime_type: "text/plain".to_string(),
            data: Some(URL_SAFE_NO_PAD.encode([0xff, 0xfe])),
            ..Default::default()
        };
        assert_eq!(extract_body(&node), "\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_plain_text_preferred_over_html() {
        let node = container(
            "multipart/alternative",
            vec![
                text_part("text/html", "<p>rich</p>"),
                text_part("text/plain", "plain wins"),
            ],
        );
        assert_eq!(extract_body(&node), "plain wins");
    }

    #[test]
    fn test_first_plain_text_child_wins() {
        let node = container(
            "multipart/mixed",
            vec![
                text_part("text/plain", "first"),
                text_part("text/plain", "second"),
            ],
        );
        assert_eq!(extract_body(&node), "first");
    }

    #[test]
    fn test_html_only_child_is_used() {
        let node = container(
            "multipart/alternative",
            vec![text_part("text/html", "<p>only html</p>")],
        );
        assert_eq!(extract_body(&node), "<p>only html</p>");
    }

    #[test]
    fn test_empty_plain_text_falls_back_to_html() {
        let empty_plain = MimePart {
            mime_type: "text/plain".to_string(),
            data: Some(String::new()),
            ..Default::default()
        };
        let node = container(
            "multipart/alternative",
            vec![empty_plain, text_part("text/html", "<p>fallback</p>")],
        );
        assert_eq!(extract_body(&node), "<p>fallback</p>");
    }

    #[test]
    fn test_nested_grandchild_plain_text_found() {
        let inner = container(
            "multipart/alternative",
            vec![text_part("text/plain", "buried text")],
        );
        let node = container(
            "multipart/mixed",
            vec![attachment_part("data.bin", "application/octet-stream"), inner],
        );
        assert_eq!(extract_body(&node), "buried text");
    }

    #[test]
    fn test_multipart_with_no_text_is_empty() {
        let node = container(
            "multipart/mixed",
            vec![
                attachment_part("a.bin", "application/octet-stream"),
                attachment_part("b.bin", "application/octet-stream"),
            ],
        );
        assert_eq!(extract_body(&node), "");
    }

    // ------------------------------------------------------------------
    // Attachment enumeration
    // ------------------------------------------------------------------

    #[test]
    fn test_single_attachment_child() {
        let node = container(
            "multipart/mixed",
            vec![
                text_part("text/plain", "see attached"),
                attachment_part("report.pdf", "application/pdf"),
            ],
        );

        let attachments = list_attachments(&node);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "report.pdf");
        assert_eq!(attachments[0].mime_type, "application/pdf");
        assert_eq!(attachments[0].attachment_id.as_deref(), Some("att-report.pdf"));
        assert_eq!(attachments[0].size, 1024);
    }

    #[test]
    fn test_leaf_node_has_no_attachments() {
        let node = MimePart {
            mime_type: "text/plain".to_string(),
            filename: Some("orphan.txt".to_string()),
            ..Default::default()
        };
        // The node itself is never emitted, only its children
        assert!(list_attachments(&node).is_empty());
    }

    #[test]
    fn test_missing_id_and_size_default() {
        let bare = MimePart {
            mime_type: "image/png".to_string(),
            filename: Some("logo.png".to_string()),
            ..Default::default()
        };
        let node = container("multipart/mixed", vec![bare]);

        let attachments = list_attachments(&node);
        assert_eq!(attachments.len(), 1);
        assert!(attachments[0].attachment_id.is_none());
        assert_eq!(attachments[0].size, 0);
    }

    #[test]
    fn test_nested_attachments_in_preorder() {
        let forwarded = MimePart {
            mime_type: "message/rfc822".to_string(),
            filename: Some("original.eml".to_string()),
            parts: vec![attachment_part("inner.pdf", "application/pdf")],
            ..Default::default()
        };
        let node = container(
            "multipart/mixed",
            vec![attachment_part("cover.txt", "text/plain"), forwarded],
        );

        let names: Vec<_> = list_attachments(&node)
            .into_iter()
            .map(|a| a.filename)
            .collect();
        // Container node is emitted before the attachments nested in it
        assert_eq!(names, vec!["cover.txt", "original.eml", "inner.pdf"]);
    }

    #[test]
    fn test_duplicate_filenames_not_deduped() {
        let node = container(
            "multipart/mixed",
            vec![
                attachment_part("scan.jpg", "image/jpeg"),
                attachment_part("scan.jpg", "image/jpeg"),
            ],
        );
        assert_eq!(list_attachments(&node).len(), 2);
    }

    #[test]
    fn test_empty_filename_not_emitted() {
        let unnamed = MimePart {
            mime_type: "text/plain".to_string(),
            filename: Some(String::new()),
            ..Default::default()
        };
        let node = container("multipart/mixed", vec![unnamed]);
        assert!(list_attachments(&node).is_empty());
    }

    // ------------------------------------------------------------------
    // Decode round trips
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_unpadded_round_trip(text in ".*") {
            let node = MimePart {
                mime_type: "text/plain".to_string(),
                data: Some(URL_SAFE_NO_PAD.encode(&text)),
                ..Default::default()
            };
            if text.is_empty() {
                prop_assert_eq!(extract_body(&node), "");
            } else {
                prop_assert_eq!(extract_body(&node), text);
            }
        }

        #[test]
        fn prop_padded_round_trip(text in ".+") {
            let node = MimePart {
                mime_type: "text/plain".to_string(),
                data: Some(URL_SAFE.encode(&text)),
                ..Default::default()
            };
            prop_assert_eq!(extract_body(&node), text);
        }
    }
}
