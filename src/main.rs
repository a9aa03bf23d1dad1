use anyhow::Result;
use clap::Parser;
use gmail_triage::cli::{self, Cli, Commands};
use gmail_triage::client::{MailClient, ProductionGmailClient};
use gmail_triage::config::Config;
use gmail_triage::error::TriageError;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self.buffer.lock().unwrap();
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            // Remove trailing newline for cleaner output
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                let _ = self.multi.println(msg);
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl MultiProgressMakeWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self { multi }
    }
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs; on Windows, use ring
    // (no NASM/CMake required)
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing with level based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_triage=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_triage=info,warn,error"))
    };

    // Create shared MultiProgress for coordinated progress bar + logging
    let multi_progress = Arc::new(MultiProgress::new());
    let make_writer = MultiProgressMakeWriter::new(Arc::clone(&multi_progress));

    // Set up tracing with MultiProgress writer - logs will print above progress bars
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Ensure .gmail-triage directory exists for the token cache
    tokio::fs::create_dir_all(".gmail-triage").await?;

    // Execute command
    match &cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");

            // Ensure token cache directory exists
            if let Some(parent) = cli.token_cache.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            // Delete existing token if force flag is set
            if *force && cli.token_cache.exists() {
                tokio::fs::remove_file(&cli.token_cache).await?;
                tracing::info!("Removed existing token cache");
            }

            // Validate the credentials file up front so a malformed one
            // fails before the browser flow starts
            if cli.credentials.exists() {
                let creds = gmail_triage::auth::load_credentials(&cli.credentials).await?;
                tracing::info!(
                    "Using OAuth client from project: {}",
                    creds.installed.project_id
                );
            }

            // Build the hub (will trigger the OAuth flow if needed)
            let hub =
                gmail_triage::auth::authenticate(&cli.credentials, &cli.token_cache).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", cli.token_cache);

            // Test the connection
            let client = ProductionGmailClient::new(hub, 1);
            println!("Connected to account: {}", client.profile_email().await?);

            Ok(())
        }

        Commands::Triage {
            dry_run,
            max_results,
            query,
        } => {
            tracing::info!("Starting triage run");
            if *dry_run {
                println!("Running in DRY RUN mode - no changes will be made");
            }

            cli::run_triage(
                &cli,
                *dry_run,
                *max_results,
                query.clone(),
                (*multi_progress).clone(),
            )
            .await?;

            Ok(())
        }

        Commands::Attachments {
            message_id,
            download,
            output_dir,
        } => {
            cli::run_attachments(
                &cli,
                message_id,
                *download,
                output_dir.clone(),
                (*multi_progress).clone(),
            )
            .await?;

            Ok(())
        }

        Commands::Send { to, template, vars } => {
            cli::run_send(&cli, to.clone(), template, vars, (*multi_progress).clone()).await?;

            Ok(())
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            // Check if file exists
            if output.exists() && !force {
                return Err(TriageError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            // Create example config
            Config::create_example(output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nPlease edit this file to customize your settings.");
            println!("Key settings to review:");
            println!("  - fetch.max_results: How many recent messages to triage");
            println!("  - fetch.query: Gmail search query restricting the fetch");
            println!("  - labels.apply: Whether triage applies Gmail labels");
            println!("  - [[rules]]: Ordered category rules (first match wins)");

            Ok(())
        }
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    // Display error chain
    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    // Display helpful hints based on error type
    if let Some(triage_err) = error.downcast_ref::<TriageError>() {
        match triage_err {
            TriageError::AuthError(_) => {
                eprintln!("\nHint: Make sure your credentials.json file is valid.");
                eprintln!("      You can download it from Google Cloud Console.");
                eprintln!("      Try running: gmail-triage auth --force");
            }
            TriageError::ApiError(_) => {
                eprintln!("\nHint: This may be a temporary API error.");
                eprintln!("      Try running the command again.");
            }
            TriageError::RateLimitExceeded { .. } => {
                eprintln!("\nHint: You've hit Gmail API rate limits.");
                eprintln!("      Wait a few seconds and try again.");
                eprintln!("      Consider reducing fetch.concurrency in config.");
            }
            TriageError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-triage init-config --force");
            }
            TriageError::TemplateError(_) => {
                eprintln!("\nHint: Run with a built-in template name.");
                eprintln!("      Pass variables as: --var name=value");
            }
            _ => {}
        }
    }
}
