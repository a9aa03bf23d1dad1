//! Attachment listing and download-to-disk tests

mod common;

use common::{attachment_part, multipart, text_part, MockMailClient};
use gmail_triage::error::TriageError;
use gmail_triage::scanner::EmailScanner;
use std::sync::Arc;

#[tokio::test]
async fn test_attachments_listed_in_document_order() {
    let payload = multipart(
        "multipart/mixed",
        vec![
            text_part("text/plain", "see attached"),
            attachment_part("report.pdf", "application/pdf", Some("att-1"), 2048),
            multipart(
                "multipart/alternative",
                vec![attachment_part("photo.jpg", "image/jpeg", Some("att-2"), 4096)],
            ),
        ],
    );

    let mut mock = MockMailClient::new();
    mock.expect_get_payload()
        .withf(|id| id == "msg-1")
        .returning(move |_| Ok(payload.clone()));

    let scanner = EmailScanner::new(Arc::new(mock), 2);
    let attachments = scanner.attachments("msg-1").await.unwrap();

    let names: Vec<&str> = attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, vec!["report.pdf", "photo.jpg"]);
    assert_eq!(attachments[0].mime_type, "application/pdf");
    assert_eq!(attachments[0].size, 2048);
}

#[tokio::test]
async fn test_download_attachments_writes_files() {
    let dir = tempfile::tempdir().unwrap();

    let payload = multipart(
        "multipart/mixed",
        vec![
            attachment_part("report.pdf", "application/pdf", Some("att-1"), 11),
            attachment_part("notes.txt", "text/plain", Some("att-2"), 9),
        ],
    );

    let mut mock = MockMailClient::new();
    mock.expect_get_payload().returning(move |_| Ok(payload.clone()));
    mock.expect_get_attachment()
        .withf(|id, att| id == "msg-1" && att == "att-1")
        .returning(|_, _| Ok(b"pdf content".to_vec()));
    mock.expect_get_attachment()
        .withf(|id, att| id == "msg-1" && att == "att-2")
        .returning(|_, _| Ok(b"some text".to_vec()));

    let scanner = EmailScanner::new(Arc::new(mock), 2);
    let saved = scanner
        .download_attachments("msg-1", dir.path())
        .await
        .unwrap();

    assert_eq!(saved.len(), 2);
    assert_eq!(
        std::fs::read(dir.path().join("report.pdf")).unwrap(),
        b"pdf content"
    );
    assert_eq!(
        std::fs::read(dir.path().join("notes.txt")).unwrap(),
        b"some text"
    );
}

#[tokio::test]
async fn test_download_skips_attachment_without_id() {
    let dir = tempfile::tempdir().unwrap();

    let payload = multipart(
        "multipart/mixed",
        vec![
            attachment_part("inline.png", "image/png", None, 100),
            attachment_part("real.bin", "application/octet-stream", Some("att-1"), 3),
        ],
    );

    let mut mock = MockMailClient::new();
    mock.expect_get_payload().returning(move |_| Ok(payload.clone()));
    mock.expect_get_attachment()
        .times(1)
        .withf(|_, att| att == "att-1")
        .returning(|_, _| Ok(vec![1, 2, 3]));

    let scanner = EmailScanner::new(Arc::new(mock), 2);
    let saved = scanner
        .download_attachments("msg-1", dir.path())
        .await
        .unwrap();

    assert_eq!(saved.len(), 1);
    assert!(dir.path().join("real.bin").exists());
    assert!(!dir.path().join("inline.png").exists());
}

#[tokio::test]
async fn test_download_continues_past_failed_fetch() {
    let dir = tempfile::tempdir().unwrap();

    let payload = multipart(
        "multipart/mixed",
        vec![
            attachment_part("broken.pdf", "application/pdf", Some("att-1"), 10),
            attachment_part("intact.txt", "text/plain", Some("att-2"), 6),
        ],
    );

    let mut mock = MockMailClient::new();
    mock.expect_get_payload().returning(move |_| Ok(payload.clone()));
    mock.expect_get_attachment()
        .withf(|_, att| att == "att-1")
        .returning(|_, _| {
            Err(TriageError::ServerError {
                status: 500,
                message: "backend error".to_string(),
            })
        });
    mock.expect_get_attachment()
        .times(1)
        .withf(|_, att| att == "att-2")
        .returning(|_, _| Ok(b"intact".to_vec()));

    let scanner = EmailScanner::new(Arc::new(mock), 2);
    let saved = scanner
        .download_attachments("msg-1", dir.path())
        .await
        .unwrap();

    // The failed fetch is skipped; the remaining attachment still lands
    assert_eq!(saved, vec![dir.path().join("intact.txt")]);
    assert_eq!(
        std::fs::read(dir.path().join("intact.txt")).unwrap(),
        b"intact"
    );
    assert!(!dir.path().join("broken.pdf").exists());
}

#[tokio::test]
async fn test_download_strips_directory_components() {
    let dir = tempfile::tempdir().unwrap();

    let payload = multipart(
        "multipart/mixed",
        vec![attachment_part("../../escape.sh", "text/x-sh", Some("att-1"), 4)],
    );

    let mut mock = MockMailClient::new();
    mock.expect_get_payload().returning(move |_| Ok(payload.clone()));
    mock.expect_get_attachment()
        .returning(|_, _| Ok(b"echo".to_vec()));

    let scanner = EmailScanner::new(Arc::new(mock), 2);
    let saved = scanner
        .download_attachments("msg-1", dir.path())
        .await
        .unwrap();

    // The file lands inside the output directory under its bare name
    assert_eq!(saved, vec![dir.path().join("escape.sh")]);
    assert!(dir.path().join("escape.sh").exists());
    assert!(!dir.path().parent().unwrap().join("escape.sh").exists());
}

#[tokio::test]
async fn test_message_without_attachments_downloads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out");

    let payload = text_part("text/plain", "just a body");

    let mut mock = MockMailClient::new();
    mock.expect_get_payload().returning(move |_| Ok(payload.clone()));

    let scanner = EmailScanner::new(Arc::new(mock), 2);
    let saved = scanner.download_attachments("msg-1", &target).await.unwrap();

    assert!(saved.is_empty());
    // The output directory is not even created
    assert!(!target.exists());
}
