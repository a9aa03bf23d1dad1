//! Gmail Triage Assistant
//!
//! A personal email triage helper that fetches recent messages, classifies them
//! against an ordered rule set, and files them under Gmail labels. It can also
//! pull attachments to disk and send templated emails.
//!
//! # Overview
//!
//! This library provides the building blocks for inbox triage:
//! - **Authentication**: OAuth2 installed-app flow with token caching
//! - **Fetching**: Concurrent message fetching behind a narrow client trait
//! - **Classification**: Ordered first-match-wins category rules
//! - **MIME handling**: Plain-text body selection and attachment enumeration
//! - **Label Management**: Cached get-or-create label resolution
//! - **Templated Send**: Built-in Jinja-style templates rendered to RFC 2822
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_triage::{auth, client::ProductionGmailClient, config::Config, scanner::EmailScanner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     // Authenticate
//!     let hub = auth::authenticate(
//!         "credentials.json".as_ref(),
//!         ".gmail-triage/token.json".as_ref(),
//!     ).await?;
//!
//!     // Create rate-limited client and fetch the latest messages
//!     let client = Arc::new(ProductionGmailClient::new(hub, config.fetch.concurrency));
//!     let scanner = EmailScanner::new(client, config.fetch.concurrency);
//!     let records = scanner.fetch_recent(&config.fetch.query, config.fetch.max_results).await?;
//!
//!     // Categorize them
//!     let classifier = config.classifier()?;
//!     for record in &records {
//!         println!("{} -> {}", record.subject, classifier.classify(record));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail hub construction
//! - [`classifier`] - Ordered rule-based email categorization
//! - [`cli`] - Command-line interface and command pipelines
//! - [`client`] - Rate-limited Gmail API client with retry logic
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`label_manager`] - Cached Gmail label resolution
//! - [`mime`] - MIME tree body selection and attachment enumeration
//! - [`models`] - Core data structures
//! - [`scanner`] - Concurrent fetching and attachment download
//! - [`send`] - Built-in templates and templated sending

pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod label_manager;
pub mod mime;
pub mod models;
pub mod scanner;
pub mod send;

// Re-export commonly used types for convenience
pub use error::{Result, TriageError};

// Core data models
pub use models::{Attachment, CategoryRule, EmailRecord, MimePart};

// Classifier types
pub use classifier::{Classifier, UNCATEGORIZED};

// MIME helpers
pub use mime::{extract_body, list_attachments};

// Config types
pub use config::{AttachmentConfig, Config, FetchConfig, LabelConfig};

// Client traits
pub use client::{LabelInfo, MailClient, ProductionGmailClient};

// Pipeline types
pub use label_manager::LabelManager;
pub use scanner::EmailScanner;

// Send types
pub use send::{ParsedEmail, TemplateSet, TEMPLATE_NAMES};

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};
