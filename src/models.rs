use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use google_gmail1::api;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// Normalized view of one fetched message.
///
/// Built once by the fetch layer and read-only afterward. Header fields
/// default to empty strings when the message lacks the header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailRecord {
    pub id: String,
    pub subject: String,
    #[serde(rename = "from")]
    pub sender: String,
    pub to: String,
    pub date: String,
    /// Extracted plain text, possibly empty.
    pub body: String,
    /// Provider-supplied short preview.
    pub snippet: String,
    /// Label identifiers currently applied to the message.
    pub labels: Vec<String>,
}

impl EmailRecord {
    /// Build a record from a full-format API message.
    ///
    /// Individual missing pieces degrade to empty values; only a missing
    /// message id is an error.
    pub fn from_message(msg: api::Message) -> Result<Self> {
        let id = msg
            .id
            .ok_or_else(|| TriageError::InvalidMessageFormat("Missing message ID".to_string()))?;
        let snippet = msg.snippet.unwrap_or_default();
        let labels = msg.label_ids.unwrap_or_default();

        let (subject, sender, to, date, body) = match msg.payload {
            Some(payload) => {
                let (subject, sender, to, date) = {
                    let headers = payload.headers.as_deref().unwrap_or(&[]);
                    (
                        header_value(headers, "Subject"),
                        header_value(headers, "From"),
                        header_value(headers, "To"),
                        header_value(headers, "Date"),
                    )
                };
                let body = crate::mime::extract_body(&MimePart::from(payload));
                (subject, sender, to, date, body)
            }
            None => Default::default(),
        };

        Ok(EmailRecord {
            id,
            subject,
            sender,
            to,
            date,
            body,
            snippet,
            labels,
        })
    }
}

/// Case-insensitive header lookup; first match wins, absent headers
/// resolve to an empty string.
pub fn header_value(headers: &[api::MessagePartHeader], name: &str) -> String {
    headers
        .iter()
        .find(|h| {
            h.name
                .as_deref()
                .map_or(false, |n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.value.clone())
        .unwrap_or_default()
}

/// One node of a (possibly multipart) MIME tree, as delivered by the
/// provider. `data` stays in the provider's URL-safe base64 text form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MimePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MimePart>,
}

impl From<api::MessagePart> for MimePart {
    fn from(part: api::MessagePart) -> Self {
        // The SDK decodes body bytes during deserialization; re-encode so
        // the tree carries the wire form the extractor is defined over.
        let (data, attachment_id, size) = match part.body {
            Some(body) => (
                body.data.map(|bytes| URL_SAFE_NO_PAD.encode(bytes)),
                body.attachment_id,
                body.size,
            ),
            None => (None, None, None),
        };

        MimePart {
            mime_type: part.mime_type.unwrap_or_default(),
            filename: part.filename,
            data,
            attachment_id,
            size,
            parts: part
                .parts
                .map(|children| children.into_iter().map(MimePart::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Summary of one named MIME leaf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub attachment_id: Option<String>,
    pub size: i32,
}

/// One named category with its matching rules.
///
/// Absent `from_domains`/`subject_patterns` mean the corresponding check
/// is skipped. Rule order in the containing list is semantic: earlier
/// categories win ties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRule {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub from_domains: Vec<String>,
    #[serde(default)]
    pub subject_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}
