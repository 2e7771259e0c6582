use std::sync::OnceLock;
use regex::Regex;
use crate::shared::settings::SecuritySettings;

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Content larger than this skips the secret scan
const SECRET_SCAN_LIMIT: usize = 10_000;

fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            // GitHub Personal Access Token
            r"ghp_[a-zA-Z0-9]{36}",
            // Stripe Live Key
            r"sk_live_[a-zA-Z0-9]{24}",
            // Slack Token
            r"xox[baprs]-[a-zA-Z0-9]{10,48}",
            // AWS Access Key ID
            r"AKIA[0-9A-Z]{16}",
            // Google API Key
            r"AIza[0-9A-Za-z\-_]{35}",
            // Generic Private Key Block
            r"-----BEGIN (RSA|DSA|EC|PGP|OPENSSH) PRIVATE KEY-----",
        ]
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!(error = %e, "Invalid built-in secret pattern");
                None
            }
        })
        .collect()
    })
}

/// True when `content` contains any exclusion pattern, ignoring case
pub fn should_filter(content: &str, exclude_patterns: &[String]) -> bool {
    let lower = content.to_lowercase();
    exclude_patterns
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// True when `content` has more than `max_length` characters
pub fn is_too_long(content: &str, max_length: usize) -> bool {
    content.chars().count() > max_length
}

/// True when `content` matches a known credential format
pub fn contains_secret(content: &str) -> bool {
    // Avoid running regex on very long content
    if content.len() > SECRET_SCAN_LIMIT {
        return false;
    }

    get_secret_patterns().iter().any(|pattern| pattern.is_match(content))
}

/// Why a piece of content was accepted or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accept,
    Excluded,
    TooLong,
    Secret,
}

impl FilterVerdict {
    pub fn is_accepted(self) -> bool {
        self == FilterVerdict::Accept
    }
}

/// Security policy applied before anything reaches the store
#[derive(Debug, Clone)]
pub struct PolicyFilter {
    exclude_patterns: Vec<String>,
    max_content_length: usize,
    filter_passwords: bool,
}

impl PolicyFilter {
    pub fn from_settings(settings: &SecuritySettings) -> Self {
        Self {
            exclude_patterns: settings.exclude_patterns.clone(),
            max_content_length: settings.max_content_length,
            filter_passwords: settings.filter_passwords,
        }
    }

    /// The length limit always applies; pattern and secret checks only when password filtering is on
    pub fn evaluate(&self, content: &str) -> FilterVerdict {
        if self.filter_passwords {
            if should_filter(content, &self.exclude_patterns) {
                return FilterVerdict::Excluded;
            }
            if contains_secret(content) {
                return FilterVerdict::Secret;
            }
        }
        if is_too_long(content, self.max_content_length) {
            return FilterVerdict::TooLong;
        }
        FilterVerdict::Accept
    }
}
