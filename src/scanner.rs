//! Concurrent message fetching and attachment download

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::MailClient;
use crate::error::Result;
use crate::models::{Attachment, EmailRecord};

/// Fetches batches of messages and attachment payloads through a
/// [`MailClient`].
pub struct EmailScanner {
    client: Arc<dyn MailClient>,
    concurrency: usize,
}

impl EmailScanner {
    pub fn new(client: Arc<dyn MailClient>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency,
        }
    }

    /// Fetch the most recent messages matching `query`.
    ///
    /// Messages are fetched concurrently but returned in list order
    /// (newest first). A message that fails to fetch is logged and
    /// skipped rather than failing the whole batch.
    pub async fn fetch_recent(&self, query: &str, max_results: u32) -> Result<Vec<EmailRecord>> {
        let ids = self.client.list_message_ids(query, max_results).await?;

        if ids.is_empty() {
            info!("No messages matched the query");
            return Ok(Vec::new());
        }

        info!(
            "Fetching {} messages with {} concurrent workers",
            ids.len(),
            self.concurrency
        );

        let results: Vec<Result<EmailRecord>> = stream::iter(ids)
            .map(|id| {
                let client = Arc::clone(&self.client);
                async move {
                    debug!("Fetching message: {}", id);
                    client.get_message(&id).await
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::new();
        let mut failed = 0usize;

        for result in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Failed to fetch message: {}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            warn!("Skipped {} messages that failed to fetch", failed);
        }

        info!("Fetched {} messages", records.len());
        Ok(records)
    }

    /// List the attachments of one message without downloading them.
    pub async fn attachments(&self, message_id: &str) -> Result<Vec<Attachment>> {
        let payload = self.client.get_payload(message_id).await?;
        Ok(crate::mime::list_attachments(&payload))
    }

    /// Download every attachment of one message into `output_dir`.
    ///
    /// Attachment names are reduced to their final path component before
    /// writing, so a hostile filename cannot escape the output directory.
    /// An attachment whose fetch fails is skipped with a warning; the rest
    /// still download. Returns the paths written.
    pub async fn download_attachments(
        &self,
        message_id: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let attachments = self.attachments(message_id).await?;

        if attachments.is_empty() {
            info!("Message {} has no attachments", message_id);
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(output_dir).await?;

        let mut written = Vec::new();

        for attachment in &attachments {
            let attachment_id = match attachment.attachment_id.as_deref() {
                Some(id) => id,
                None => {
                    warn!(
                        "Attachment '{}' has no attachment ID, skipping",
                        attachment.filename
                    );
                    continue;
                }
            };

            let file_name = match safe_file_name(&attachment.filename) {
                Some(name) => name,
                None => {
                    warn!(
                        "Attachment name '{}' is not a usable file name, skipping",
                        attachment.filename
                    );
                    continue;
                }
            };

            let data = match self.client.get_attachment(message_id, attachment_id).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        "Failed to fetch attachment '{}': {}, skipping",
                        attachment.filename, e
                    );
                    continue;
                }
            };
            let path = output_dir.join(file_name);

            tokio::fs::write(&path, &data).await?;
            info!("Saved attachment {:?} ({} bytes)", path, data.len());
            written.push(path);
        }

        Ok(written)
    }
}

/// Reduce an attachment name to a bare file name, rejecting anything
/// that resolves to no final component (empty names, `..`, bare
/// separators).
fn safe_file_name(name: &str) -> Option<String> {
    let candidate = Path::new(name).file_name()?.to_str()?;
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name_plain() {
        assert_eq!(safe_file_name("report.pdf"), Some("report.pdf".to_string()));
    }

    #[test]
    fn test_safe_file_name_strips_directories() {
        assert_eq!(
            safe_file_name("some/dir/report.pdf"),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            safe_file_name("/etc/passwd"),
            Some("passwd".to_string())
        );
    }

    #[test]
    fn test_safe_file_name_traversal() {
        assert_eq!(
            safe_file_name("../../escape.sh"),
            Some("escape.sh".to_string())
        );
        assert_eq!(safe_file_name(".."), None);
    }

    #[test]
    fn test_safe_file_name_empty() {
        assert_eq!(safe_file_name(""), None);
        assert_eq!(safe_file_name("dir/"), Some("dir".to_string()));
    }
}
