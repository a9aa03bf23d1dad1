use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::Classifier;
use crate::error::{Result, TriageError};
use crate::models::CategoryRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub attachments: AttachmentConfig,
    /// Ordered category rules; earlier entries win ties.
    #[serde(default = "default_rules")]
    pub rules: Vec<CategoryRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            labels: LabelConfig::default(),
            attachments: AttachmentConfig::default(),
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            query: String::new(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_apply")]
    pub apply: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            apply: default_apply(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_max_results() -> u32 {
    10
}

fn default_concurrency() -> usize {
    4
}

fn default_apply() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("attachments")
}

/// Built-in category rules, in priority order.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        rule(
            "work",
            &["meeting", "project", "deadline", "invoice", "urgent"],
            &["company.com", "work.com", "enterprise.com"],
            &[],
            "Work",
        ),
        rule(
            "personal",
            &["family", "friend", "birthday", "dinner", "vacation"],
            &[],
            &[],
            "Personal",
        ),
        rule(
            "newsletter",
            &["unsubscribe", "newsletter", "weekly digest"],
            &[],
            &["newsletter", "digest", "updates?"],
            "Newsletters",
        ),
        rule(
            "promotion",
            &["sale", "discount", "offer", "deal", "promo"],
            &[],
            &[r"\d+%\s*off", r"\bsale\b", r"\bdiscount\b"],
            "Promotions",
        ),
        rule(
            "important",
            &["important", "critical", "action required", "asap"],
            &[],
            &[],
            "Important",
        ),
    ]
}

fn rule(
    name: &str,
    keywords: &[&str],
    from_domains: &[&str],
    subject_patterns: &[&str],
    label: &str,
) -> CategoryRule {
    CategoryRule {
        name: name.to_string(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        from_domains: from_domains.iter().map(|s| s.to_string()).collect(),
        subject_patterns: subject_patterns.iter().map(|s| s.to_string()).collect(),
        label: Some(label.to_string()),
    }
}

/// Commented starter configuration written by `init-config`.
///
/// A test keeps this in sync with `Config::default()`.
const EXAMPLE_TOML: &str = r##"# gmail-triage configuration

[fetch]
# How many recent messages one triage run pulls (1-500)
max_results = 10
# Gmail search query applied when listing, e.g. "is:unread"
query = ""
# Concurrent message fetches (1-16)
concurrency = 4

[labels]
# Apply the resolved label to every categorized message
apply = true

[attachments]
# Where `attachments --download` writes files
output_dir = "attachments"

# Rules are checked top to bottom; the first matching category wins.
# Within a category: keywords (subject+sender+body), then from_domains
# (sender only), then subject_patterns (searched against the lowercased
# subject, so write them in lowercase).

[[rules]]
name = "work"
keywords = ["meeting", "project", "deadline", "invoice", "urgent"]
from_domains = ["company.com", "work.com", "enterprise.com"]
label = "Work"

[[rules]]
name = "personal"
keywords = ["family", "friend", "birthday", "dinner", "vacation"]
label = "Personal"

[[rules]]
name = "newsletter"
keywords = ["unsubscribe", "newsletter", "weekly digest"]
subject_patterns = ["newsletter", "digest", "updates?"]
label = "Newsletters"

[[rules]]
name = "promotion"
keywords = ["sale", "discount", "offer", "deal", "promo"]
subject_patterns = ['\d+%\s*off', '\bsale\b', '\bdiscount\b']
label = "Promotions"

[[rules]]
name = "important"
keywords = ["important", "critical", "action required", "asap"]
label = "Important"
"##;

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // Missing file is not an error; the defaults are a full working setup
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| TriageError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TriageError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TriageError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values, including compiling the rule set so
    /// a bad pattern surfaces at load time rather than mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_results == 0 {
            return Err(TriageError::ConfigError(
                "fetch.max_results must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_results > 500 {
            return Err(TriageError::ConfigError(
                "fetch.max_results cannot exceed 500 (Gmail list page limit)".to_string(),
            ));
        }

        if self.fetch.concurrency == 0 {
            return Err(TriageError::ConfigError(
                "fetch.concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch.concurrency > 16 {
            return Err(TriageError::ConfigError(
                "fetch.concurrency cannot exceed 16 (Gmail API rate limits)".to_string(),
            ));
        }

        Classifier::new(self.rules.clone())?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Build the classifier from the configured rules.
    pub fn classifier(&self) -> Result<Classifier> {
        Classifier::new(self.rules.clone())
    }

    /// Write the commented starter configuration.
    pub async fn create_example(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TriageError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        tokio::fs::write(path, EXAMPLE_TOML)
            .await
            .map_err(|e| TriageError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote example configuration to {:?}", path);
        Ok(())
    }
}
