//! OAuth2 authentication for the Gmail API

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use yup_oauth2::ApplicationSecret;

use crate::error::{Result, TriageError};

/// Scopes requested during the OAuth2 flow.
///
/// gmail.modify covers everything triage does: reading messages,
/// managing labels, and sending mail (but no permanent deletion).
pub const REQUIRED_SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.modify"];

/// Fixed port for the local OAuth2 redirect listener.
pub const OAUTH_PORT: u16 = 8080;

/// Type alias for the Gmail hub to simplify signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Authenticate and initialize a Gmail API hub.
///
/// Runs the InstalledFlow (desktop app) OAuth2 flow, persisting tokens
/// to `token_cache_path` so later runs skip the browser step. The cache
/// file is restricted to owner read/write after a successful flow.
///
/// When `credentials_path` does not exist, credentials are read from the
/// `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET` environment variables.
pub async fn authenticate(credentials_path: &Path, token_cache_path: &Path) -> Result<GmailHub> {
    let secret = if credentials_path.exists() {
        yup_oauth2::read_application_secret(credentials_path)
            .await
            .map_err(|e| TriageError::AuthError(format!("Failed to read credentials: {}", e)))?
    } else {
        tracing::debug!(
            "Credentials file {:?} not found, trying environment variables",
            credentials_path
        );
        load_credentials_from_env().map_err(|_| {
            TriageError::AuthError(format!(
                "No credentials found: {:?} does not exist and GMAIL_CLIENT_ID/GMAIL_CLIENT_SECRET are not set",
                credentials_path
            ))
        })?
    };

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPPortRedirect(OAUTH_PORT),
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| TriageError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Acquire a token up front so failures surface here instead of on
    // the first API call, and so the cache lands with the right scopes.
    let _token = auth
        .token(REQUIRED_SCOPES)
        .await
        .map_err(|e| TriageError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }

    // HTTP/1 with TLS; google-gmail1 works best over HTTP/1
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| TriageError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Credential structure matching Google's OAuth2 credentials JSON format
#[derive(Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub installed: InstalledApp,
}

/// Installed application credentials (desktop/CLI app)
#[derive(Debug, Serialize, Deserialize)]
pub struct InstalledApp {
    pub client_id: String,
    pub project_id: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
}

/// Load and parse an OAuth2 credentials JSON file.
///
/// Used to validate the file and report its project before the flow runs.
pub async fn load_credentials(path: &Path) -> Result<Credentials> {
    let content = tokio::fs::read_to_string(path).await?;
    let creds = serde_json::from_str(&content)?;
    Ok(creds)
}

/// Build an application secret from environment variables.
///
/// Reads `GMAIL_CLIENT_ID` and `GMAIL_CLIENT_SECRET`; the redirect URI
/// defaults to the local listener on [`OAUTH_PORT`] and can be overridden
/// with `GMAIL_REDIRECT_URI`.
pub fn load_credentials_from_env() -> Result<ApplicationSecret> {
    let client_id = env::var("GMAIL_CLIENT_ID")
        .map_err(|_| TriageError::ConfigError("GMAIL_CLIENT_ID not set".to_string()))?;
    let client_secret = env::var("GMAIL_CLIENT_SECRET")
        .map_err(|_| TriageError::ConfigError("GMAIL_CLIENT_SECRET not set".to_string()))?;
    let redirect_uri = env::var("GMAIL_REDIRECT_URI")
        .unwrap_or_else(|_| format!("http://localhost:{}", OAUTH_PORT));

    Ok(ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uris: vec![redirect_uri],
        ..Default::default()
    })
}

/// Restrict the token cache to owner read/write (0600).
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows uses ACLs instead of Unix permission bits; nothing to do here.
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
