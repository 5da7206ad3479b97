//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_IMAGE_MAX_AGE_DAYS: u64 = 36_500;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `cache_version` is blank or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - a precache path or `offline_path` does not start with `/`
    /// - `precache` does not contain `offline_path`
    /// - `image_max_age_days` is 0 or exceeds 100 years
    ///
    /// Returns `ConfigError::Missing` if no site domain is configured and
    /// local hosts are not allowed (nothing would ever be intercepted).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_version.trim().is_empty() || self.cache_version.contains(char::is_whitespace) {
            return Err(invalid("cache_version", "must be a non-empty tag without whitespace"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            _ => return Err(invalid("origin", "must be an absolute http(s) URL")),
        }

        if let Some(path) = self.precache.iter().chain(&self.precache_static).find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("path {path:?} must start with '/'")));
        }
        if !self.offline_path.starts_with('/') {
            return Err(invalid("offline_path", "must start with '/'"));
        }
        if !self.precache.contains(&self.offline_path) {
            return Err(invalid("precache", format!("must include the offline document {}", self.offline_path)));
        }

        if self.image_max_age_days == 0 {
            return Err(invalid("image_max_age_days", "must be greater than 0"));
        }
        if self.image_max_age_days > MAX_IMAGE_MAX_AGE_DAYS {
            return Err(invalid("image_max_age_days", format!("must not exceed {MAX_IMAGE_MAX_AGE_DAYS}")));
        }

        if self.site_domains.is_empty() && !self.allow_local_hosts {
            return Err(ConfigError::Missing {
                field: "site_domains".into(),
                hint: "Set EGECACHE_SITE_DOMAINS or EGECACHE_ALLOW_LOCAL_HOSTS=true".into(),
            });
        }

        if self.network_first_prefixes.iter().any(|p| p == "/") {
            tracing::warn!("network_first_prefixes contains '/'; every page request will be served network-first");
        }

        Ok(())
    }
}
