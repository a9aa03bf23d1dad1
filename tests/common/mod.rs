//! Common test utilities and fixtures

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gmail_triage::client::{LabelInfo, MailClient};
use gmail_triage::error::Result;
use gmail_triage::models::{EmailRecord, MimePart};
use mockall::mock;

/// Create a test record with default values
pub fn create_test_record(id: &str, sender: &str, subject: &str) -> EmailRecord {
    EmailRecord {
        id: id.to_string(),
        subject: subject.to_string(),
        sender: sender.to_string(),
        to: "me@example.com".to_string(),
        date: "Mon, 24 Aug 2026 10:00:00 +0000".to_string(),
        body: String::new(),
        snippet: "Email snippet...".to_string(),
        labels: vec!["INBOX".to_string()],
    }
}

/// Create a test record with a specific plain-text body
pub fn create_record_with_body(id: &str, sender: &str, subject: &str, body: &str) -> EmailRecord {
    let mut record = create_test_record(id, sender, subject);
    record.body = body.to_string();
    record
}

/// Leaf MIME part carrying base64url-encoded text
pub fn text_part(mime_type: &str, text: &str) -> MimePart {
    MimePart {
        mime_type: mime_type.to_string(),
        data: Some(URL_SAFE_NO_PAD.encode(text)),
        ..Default::default()
    }
}

/// Leaf MIME part describing a named attachment
pub fn attachment_part(
    filename: &str,
    mime_type: &str,
    attachment_id: Option<&str>,
    size: i32,
) -> MimePart {
    MimePart {
        mime_type: mime_type.to_string(),
        filename: Some(filename.to_string()),
        attachment_id: attachment_id.map(|s| s.to_string()),
        size: Some(size),
        ..Default::default()
    }
}

/// Container part with children
pub fn multipart(mime_type: &str, parts: Vec<MimePart>) -> MimePart {
    MimePart {
        mime_type: mime_type.to_string(),
        parts,
        ..Default::default()
    }
}

/// Create a test LabelInfo
pub fn create_test_label(id: &str, name: &str) -> LabelInfo {
    LabelInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

// Mock implementation of MailClient for testing
mock! {
    pub MailClient {}

    #[async_trait::async_trait]
    impl MailClient for MailClient {
        async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;
        async fn get_message(&self, id: &str) -> Result<EmailRecord>;
        async fn get_payload(&self, id: &str) -> Result<MimePart>;
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
        async fn create_label(&self, name: &str) -> Result<String>;
        async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()>;
        async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;
        async fn send_message(&self, raw: Vec<u8>) -> Result<String>;
        async fn profile_email(&self) -> Result<String>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_record() {
        let record = create_test_record("msg1", "test@example.com", "Test Subject");
        assert_eq!(record.id, "msg1");
        assert_eq!(record.sender, "test@example.com");
        assert_eq!(record.subject, "Test Subject");
        assert!(record.body.is_empty());
    }

    #[test]
    fn test_create_record_with_body() {
        let record = create_record_with_body("msg1", "a@b.c", "Subject", "body text");
        assert_eq!(record.body, "body text");
    }

    #[test]
    fn test_text_part_round_trips_through_decoder() {
        let part = text_part("text/plain", "hello world");
        assert_eq!(gmail_triage::mime::extract_body(&part), "hello world");
    }

    #[test]
    fn test_attachment_part_shape() {
        let part = attachment_part("a.pdf", "application/pdf", Some("att-1"), 42);
        assert_eq!(part.filename.as_deref(), Some("a.pdf"));
        assert_eq!(part.attachment_id.as_deref(), Some("att-1"));
        assert_eq!(part.size, Some(42));
        assert!(part.parts.is_empty());
    }

    #[test]
    fn test_multipart_nests_children() {
        let tree = multipart("multipart/mixed", vec![text_part("text/plain", "x")]);
        assert_eq!(tree.parts.len(), 1);
        assert!(tree.data.is_none());
    }

    #[test]
    fn test_create_test_label() {
        let label = create_test_label("L1", "Work");
        assert_eq!(label.id, "L1");
        assert_eq!(label.name, "Work");
    }
}
