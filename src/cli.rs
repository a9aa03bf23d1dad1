//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gmail-triage")]
#[command(version = "0.1.0")]
#[command(about = "Rule-based Gmail inbox triage assistant", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-triage/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Force re-authentication even if a cached token exists
        #[arg(long)]
        force: bool,
    },

    /// Fetch recent messages, categorize them, and label them
    Triage {
        /// Dry run mode (print categories, don't apply labels)
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of messages to fetch (overrides config)
        #[arg(long)]
        max_results: Option<u32>,

        /// Gmail search query (overrides config)
        #[arg(short, long)]
        query: Option<String>,
    },

    /// List or download attachments of a message
    Attachments {
        /// Message ID to inspect
        message_id: String,

        /// Download the attachments to disk
        #[arg(long)]
        download: bool,

        /// Directory to save attachments into (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Render a built-in template and send it as an email
    Send {
        /// Recipient address (defaults to the authenticated account)
        #[arg(long)]
        to: Option<String>,

        /// Template name
        #[arg(short, long)]
        template: String,

        /// Template variable as KEY=VALUE (repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Truncate a string to max_len characters, adding "..." if truncated
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len.saturating_sub(3)).collect::<String>())
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }

    /// Build a reporter on an existing MultiProgress so progress bars share a
    /// draw target with the tracing writer
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        // Use {elapsed} for human-readable format (e.g., "1s", "234ms")
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        println!("  ✓ {}", msg);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

use crate::auth;
use crate::classifier::UNCATEGORIZED;
use crate::client::{MailClient, ProductionGmailClient};
use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::label_manager::LabelManager;
use crate::models::EmailRecord;
use crate::scanner::EmailScanner;
use crate::send::TemplateSet;
use chrono::{Datelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Fetch recent messages, categorize each one, and apply the resolved labels
pub async fn run_triage(
    cli: &Cli,
    dry_run: bool,
    max_results: Option<u32>,
    query: Option<String>,
    multi: MultiProgress,
) -> Result<()> {
    let reporter = ProgressReporter::with_multi_progress(multi);

    let config_spinner = reporter.add_spinner("Loading configuration...");
    let config = Config::load(&cli.config).await?;
    reporter.finish_spinner(
        &config_spinner,
        &format!("Configuration loaded from {:?}", cli.config),
    );

    let max_results = max_results.unwrap_or(config.fetch.max_results);
    let query = query.unwrap_or_else(|| config.fetch.query.clone());

    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let hub = auth::authenticate(&cli.credentials, &cli.token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated successfully");

    let client = Arc::new(ProductionGmailClient::new(hub, config.fetch.concurrency));
    let scanner = EmailScanner::new(client.clone(), config.fetch.concurrency);

    let fetch_spinner = reporter.add_spinner("Fetching recent messages...");
    let records = scanner.fetch_recent(&query, max_results).await?;
    reporter.finish_spinner(&fetch_spinner, &format!("Fetched {} messages", records.len()));

    if records.is_empty() {
        println!("\nNo messages matched the query.");
        return Ok(());
    }

    let classifier = config.classifier()?;
    let classified: Vec<(&EmailRecord, &str)> = records
        .iter()
        .map(|record| (record, classifier.classify(record)))
        .collect();

    print_triage_table(&classified);

    if dry_run {
        println!("\nDry run completed! No labels were applied.");
        return Ok(());
    }
    if !config.labels.apply {
        println!("\nLabel application is disabled in the configuration.");
        return Ok(());
    }

    let label_spinner = reporter.add_spinner("Loading existing labels...");
    let mut label_manager = LabelManager::new(client.clone());
    let existing = label_manager.load_existing_labels().await?;
    reporter.finish_spinner(&label_spinner, &format!("Found {} existing labels", existing));

    let apply_bar = reporter.add_progress_bar(classified.len() as u64, "Applying labels...");
    let mut applied = 0;
    for (record, category) in &classified {
        // Unmatched messages are listed in the table but never labelled
        if *category == UNCATEGORIZED {
            apply_bar.inc(1);
            continue;
        }
        let label_name = classifier.label_for(category);
        match label_manager.get_or_create_label(&label_name).await {
            Ok(label_id) => {
                if let Err(e) = client.apply_label(&record.id, &label_id).await {
                    warn!("Failed to label message {}: {}", record.id, e);
                } else {
                    applied += 1;
                }
            }
            Err(e) => warn!("Failed to resolve label '{}': {}", label_name, e),
        }
        apply_bar.inc(1);
    }
    apply_bar.finish_with_message(format!(
        "Applied labels to {} of {} messages",
        applied,
        classified.len()
    ));

    println!(
        "\nTriage completed: {} of {} messages labelled.",
        applied,
        classified.len()
    );
    Ok(())
}

fn print_triage_table(classified: &[(&EmailRecord, &str)]) {
    println!("\n{:<52} {:<14} {}", "Subject", "Category", "From");
    println!("{}", "-".repeat(100));
    for (record, category) in classified {
        let subject = if record.subject.is_empty() {
            "(no subject)".to_string()
        } else {
            truncate_string(&record.subject, 50)
        };
        println!(
            "{:<52} {:<14} {}",
            subject,
            category,
            truncate_string(&record.sender, 40)
        );
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, category) in classified {
        *counts.entry(category).or_insert(0) += 1;
    }
    let mut breakdown: Vec<_> = counts.into_iter().collect();
    breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    println!();
    for (category, count) in breakdown {
        println!("  {:<14} {}", category, count);
    }
}

/// List the attachments of a message, optionally saving them to disk
pub async fn run_attachments(
    cli: &Cli,
    message_id: &str,
    download: bool,
    output_dir: Option<PathBuf>,
    multi: MultiProgress,
) -> Result<()> {
    let config = Config::load(&cli.config).await?;

    let reporter = ProgressReporter::with_multi_progress(multi);
    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let hub = auth::authenticate(&cli.credentials, &cli.token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated successfully");

    let client = Arc::new(ProductionGmailClient::new(hub, config.fetch.concurrency));
    let scanner = EmailScanner::new(client, config.fetch.concurrency);

    let attachments = scanner.attachments(message_id).await?;
    if attachments.is_empty() {
        println!("No attachments found on message {}", message_id);
        return Ok(());
    }

    println!("\nAttachments on message {}:", message_id);
    for attachment in &attachments {
        println!(
            "  {} ({}, {:.1} KB)",
            attachment.filename,
            attachment.mime_type,
            attachment.size as f64 / 1024.0
        );
    }

    if download {
        let output_dir =
            output_dir.unwrap_or_else(|| PathBuf::from(&config.attachments.output_dir));
        let saved = scanner.download_attachments(message_id, &output_dir).await?;
        println!(
            "\nSaved {} of {} attachments to {:?}",
            saved.len(),
            attachments.len(),
            output_dir
        );
    }

    Ok(())
}

/// Render a template and send it through the authenticated account
pub async fn run_send(
    cli: &Cli,
    to: Option<String>,
    template: &str,
    vars: &[String],
    multi: MultiProgress,
) -> Result<()> {
    let mut context = parse_template_vars(vars)?;
    context
        .entry("year".to_string())
        .or_insert_with(|| serde_json::Value::from(Utc::now().year()));

    let templates = TemplateSet::new()?;

    let reporter = ProgressReporter::with_multi_progress(multi);
    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let hub = auth::authenticate(&cli.credentials, &cli.token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated successfully");

    let client = ProductionGmailClient::new(hub, 1);
    let profile = client.profile_email().await?;
    let to = to.unwrap_or_else(|| profile.clone());

    let send_spinner = reporter.add_spinner(&format!("Sending '{}' to {}...", template, to));
    let message_id =
        crate::send::send_templated(&client, &templates, &to, Some(&profile), template, &context)
            .await?;
    reporter.finish_spinner(&send_spinner, &format!("Sent message {}", message_id));

    Ok(())
}

/// Parse repeated `--var KEY=VALUE` arguments into a template context
fn parse_template_vars(vars: &[String]) -> Result<HashMap<String, serde_json::Value>> {
    let mut context = HashMap::new();
    for var in vars {
        let (key, value) = var.split_once('=').ok_or_else(|| {
            TriageError::BadRequest(format!(
                "Invalid template variable '{}', expected KEY=VALUE",
                var
            ))
        })?;
        context.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }
    Ok(context)
}
