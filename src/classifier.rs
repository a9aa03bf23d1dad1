//! Rule-based email categorization

use std::collections::HashSet;

use regex::Regex;

use crate::error::{Result, TriageError};
use crate::models::{CategoryRule, EmailRecord};

/// Sentinel category returned when no rule matches.
pub const UNCATEGORIZED: &str = "uncategorized";

/// One category with its subject patterns compiled.
#[derive(Debug)]
struct CompiledRule {
    name: String,
    label: Option<String>,
    keywords: Vec<String>,
    from_domains: Vec<String>,
    subject_patterns: Vec<Regex>,
}

/// Ordered rule set evaluated first-match-wins.
///
/// Rule order is semantic: when a record satisfies several categories, the
/// earliest configured one is returned. Within a category the checks run
/// keywords, then sender domains, then subject patterns, returning on the
/// first hit.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<CompiledRule>,
}

impl Classifier {
    /// Compile an ordered rule list.
    ///
    /// Fails on duplicate category names and on unparsable subject
    /// patterns, so a broken rule never silently drops a check.
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            if !seen.insert(rule.name.clone()) {
                return Err(TriageError::InvalidRule {
                    category: rule.name,
                    reason: "duplicate category name".to_string(),
                });
            }

            let mut subject_patterns = Vec::with_capacity(rule.subject_patterns.len());
            for pattern in &rule.subject_patterns {
                // Patterns run against the lowercased subject, so literal
                // uppercase in a pattern can never match
                let regex = Regex::new(pattern).map_err(|e| TriageError::InvalidRule {
                    category: rule.name.clone(),
                    reason: e.to_string(),
                })?;
                subject_patterns.push(regex);
            }

            compiled.push(CompiledRule {
                name: rule.name,
                label: rule.label,
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                from_domains: rule.from_domains.iter().map(|d| d.to_lowercase()).collect(),
                subject_patterns,
            });
        }

        Ok(Classifier { rules: compiled })
    }

    /// Classify one record, returning the first matching category name or
    /// [`UNCATEGORIZED`].
    ///
    /// Keywords match against lowercased subject + sender + body; when the
    /// body is empty the snippet stands in. Domains match the sender only,
    /// subject patterns search the subject only. Empty fields simply fail
    /// to match; this never errors.
    pub fn classify(&self, record: &EmailRecord) -> &str {
        let subject = record.subject.to_lowercase();
        let sender = record.sender.to_lowercase();
        let body_text = if record.body.is_empty() {
            &record.snippet
        } else {
            &record.body
        };
        let full_text = format!("{} {} {}", subject, sender, body_text.to_lowercase());

        for rule in &self.rules {
            if rule.keywords.iter().any(|kw| full_text.contains(kw.as_str())) {
                return &rule.name;
            }
            if rule
                .from_domains
                .iter()
                .any(|domain| sender.contains(domain.as_str()))
            {
                return &rule.name;
            }
            if rule.subject_patterns.iter().any(|p| p.is_match(&subject)) {
                return &rule.name;
            }
        }

        UNCATEGORIZED
    }

    /// Display label for a category: the configured label, else the
    /// category name capitalized.
    pub fn label_for(&self, category: &str) -> String {
        self.rules
            .iter()
            .find(|r| r.name == category)
            .and_then(|r| r.label.clone())
            .unwrap_or_else(|| capitalize(category))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Category names in evaluation order.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }
}

/// First character uppercased, remainder lowercased.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}
