//! Gmail API client with rate limiting and retry logic

use async_trait::async_trait;
use google_gmail1::api::{Label, Message, ModifyMessageRequest};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::GmailHub;
use crate::error::{Result, TriageError};
use crate::models::{EmailRecord, MimePart};

const GMAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Label info returned from the Gmail API
#[derive(Debug, Clone, PartialEq)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
}

/// Mailbox operations the triage pipeline needs, behind a trait so tests
/// can substitute a mock for the real API.
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List message IDs matching a query, newest first, up to `max_results`.
    async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;

    /// Fetch one message in full format and convert it to an [`EmailRecord`].
    async fn get_message(&self, id: &str) -> Result<EmailRecord>;

    /// Fetch the MIME tree of one message.
    async fn get_payload(&self, id: &str) -> Result<MimePart>;

    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// Create a new user label, returning its ID
    async fn create_label(&self, name: &str) -> Result<String>;

    /// Apply a label to a message
    async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()>;

    /// Download one attachment body by ID
    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;

    /// Send a raw RFC 2822 message, returning the sent message ID
    async fn send_message(&self, raw: Vec<u8>) -> Result<String>;

    /// Email address of the authenticated account
    async fn profile_email(&self) -> Result<String>;
}

/// Production Gmail client with semaphore-based rate limiting and
/// exponential backoff retries for idempotent calls.
pub struct ProductionGmailClient {
    hub: GmailHub,
    rate_limiter: Arc<Semaphore>,
}

impl ProductionGmailClient {
    /// Create a client enforcing at most `max_concurrent` in-flight requests.
    pub fn new(hub: GmailHub, max_concurrent: usize) -> Self {
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.rate_limiter
            .acquire()
            .await
            .map_err(|e| TriageError::Unknown(format!("Failed to acquire rate limit permit: {}", e)))
    }

    /// Check if an error is retryable
    fn should_retry(error: &TriageError) -> bool {
        matches!(
            error,
            TriageError::ServerError { .. }
                | TriageError::RateLimitExceeded { .. }
                | TriageError::NetworkError(_)
        )
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_full_message(&self, id: &str) -> Result<Message> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("get_message", DEFAULT_MAX_RETRIES, || async {
            let (_, msg) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("full")
                .add_scope(GMAIL_SCOPE)
                .doit()
                .await?;
            Ok(msg)
        })
        .await
    }
}

#[async_trait]
impl MailClient for ProductionGmailClient {
    async fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let _permit = self.acquire_permit().await?;

        // One page is enough: max_results is capped at 500, the Gmail
        // list page limit.
        let response = Self::with_retry("list_messages", DEFAULT_MAX_RETRIES, || async {
            let mut call = self
                .hub
                .users()
                .messages_list("me")
                .max_results(max_results);

            if !query.is_empty() {
                call = call.q(query);
            }

            let (_, response) = call.add_scope(GMAIL_SCOPE).doit().await?;
            Ok(response)
        })
        .await?;

        let ids: Vec<String> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg_ref| msg_ref.id)
            .collect();

        debug!("Listed {} message IDs", ids.len());
        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> Result<EmailRecord> {
        let msg = self.fetch_full_message(id).await?;
        EmailRecord::from_message(msg)
    }

    async fn get_payload(&self, id: &str) -> Result<MimePart> {
        let msg = self.fetch_full_message(id).await?;
        Ok(msg.payload.map(MimePart::from).unwrap_or_default())
    }

    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("list_labels", DEFAULT_MAX_RETRIES, || async {
            // Wrap the API call in a timeout to prevent indefinite hangs
            let timeout_duration = Duration::from_secs(30);
            let api_call = async {
                debug!("Calling Gmail API to list labels...");
                let result = self
                    .hub
                    .users()
                    .labels_list("me")
                    .add_scope(GMAIL_SCOPE)
                    .doit()
                    .await;
                debug!("Gmail API list labels call completed");
                result
            };

            let (_, response) = match tokio::time::timeout(timeout_duration, api_call).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        "Gmail API list_labels call timed out after {:?}",
                        timeout_duration
                    );
                    return Err(TriageError::NetworkError(format!(
                        "API call timed out after {:?}",
                        timeout_duration
                    )));
                }
            };

            let labels: Vec<LabelInfo> = response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(LabelInfo { id, name }),
                    _ => None,
                })
                .collect();

            debug!("Successfully parsed {} labels", labels.len());
            Ok(labels)
        })
        .await
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        let _permit = self.acquire_permit().await?;

        let name = name.to_string();
        Self::with_retry("create_label", DEFAULT_MAX_RETRIES, || async {
            let label = Label {
                name: Some(name.clone()),
                message_list_visibility: Some("show".to_string()),
                label_list_visibility: Some("labelShow".to_string()),
                ..Default::default()
            };

            let (_, created_label) = self
                .hub
                .users()
                .labels_create(label, "me")
                .add_scope(GMAIL_SCOPE)
                .doit()
                .await?;

            created_label
                .id
                .ok_or_else(|| TriageError::LabelError("Created label has no ID".to_string()))
        })
        .await
    }

    async fn apply_label(&self, message_id: &str, label_id: &str) -> Result<()> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("apply_label", DEFAULT_MAX_RETRIES, || async {
            // Adding a label a message already has is a no-op, so
            // retrying after a timeout is safe.
            let modify_request = ModifyMessageRequest {
                add_label_ids: Some(vec![label_id.to_string()]),
                remove_label_ids: None,
            };

            self.hub
                .users()
                .messages_modify(modify_request, "me", message_id)
                .add_scope(GMAIL_SCOPE)
                .doit()
                .await?;

            Ok(())
        })
        .await
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("get_attachment", DEFAULT_MAX_RETRIES, || async {
            let (_, body) = self
                .hub
                .users()
                .messages_attachments_get("me", message_id, attachment_id)
                .add_scope(GMAIL_SCOPE)
                .doit()
                .await?;

            body.data.ok_or_else(|| {
                TriageError::InvalidMessageFormat("Attachment body has no data".to_string())
            })
        })
        .await
    }

    async fn send_message(&self, raw: Vec<u8>) -> Result<String> {
        let _permit = self.acquire_permit().await?;

        // No retry here: a send that times out after reaching the server
        // would be duplicated on the next attempt.
        let (_, sent) = self
            .hub
            .users()
            .messages_send(Message::default(), "me")
            .add_scope(GMAIL_SCOPE)
            .upload(Cursor::new(raw), "message/rfc822".parse().unwrap())
            .await?;

        sent.id
            .ok_or_else(|| TriageError::ApiError("Sent message has no ID".to_string()))
    }

    async fn profile_email(&self) -> Result<String> {
        let _permit = self.acquire_permit().await?;

        Self::with_retry("get_profile", DEFAULT_MAX_RETRIES, || async {
            let (_, profile) = self
                .hub
                .users()
                .get_profile("me")
                .add_scope(GMAIL_SCOPE)
                .doit()
                .await?;

            profile
                .email_address
                .ok_or_else(|| TriageError::ApiError("Profile has no email address".to_string()))
        })
        .await
    }
}
