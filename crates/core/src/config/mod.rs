//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EGECACHE_*)
//! 2. TOML config file (if EGECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EGECACHE_*)
/// 2. TOML config file (if EGECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the cache partitions.
    ///
    /// Set via EGECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Site origin that precache and offline paths are resolved against.
    ///
    /// Set via EGECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Hostnames considered same-site. Subdomains of each entry match too.
    ///
    /// Set via EGECACHE_SITE_DOMAINS environment variable (e.g. `[a.com,b.com]`).
    #[serde(default = "default_site_domains")]
    pub site_domains: Vec<String>,

    /// Whether `localhost` and loopback addresses are intercepted.
    ///
    /// Set via EGECACHE_ALLOW_LOCAL_HOSTS environment variable.
    #[serde(default = "default_true")]
    pub allow_local_hosts: bool,

    /// Version tag suffixed to every partition name. Bump on deploy.
    ///
    /// Set via EGECACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths stored in the page partition at install time.
    ///
    /// Set via EGECACHE_PRECACHE environment variable.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Paths stored in the static partition at install time.
    ///
    /// Set via EGECACHE_PRECACHE_STATIC environment variable.
    #[serde(default)]
    pub precache_static: Vec<String>,

    /// Path of the offline fallback document. Must be part of `precache`.
    ///
    /// Set via EGECACHE_OFFLINE_PATH environment variable.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// Maximum age of a cached image before it is refreshed.
    ///
    /// Set via EGECACHE_IMAGE_MAX_AGE_DAYS environment variable.
    #[serde(default = "default_image_max_age_days")]
    pub image_max_age_days: u64,

    /// Path prefixes served network-first (e.g. `/api/`).
    ///
    /// Set via EGECACHE_NETWORK_FIRST_PREFIXES environment variable.
    #[serde(default)]
    pub network_first_prefixes: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via EGECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via EGECACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via EGECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the network client follows redirects itself.
    ///
    /// Set via EGECACHE_FOLLOW_REDIRECTS environment variable.
    #[serde(default)]
    pub follow_redirects: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./egecache.sqlite")
}

fn default_origin() -> String {
    "https://egepenakcayapi.com.tr".into()
}

fn default_site_domains() -> Vec<String> {
    vec!["egepenakcayapi.com.tr".into()]
}

fn default_cache_version() -> String {
    "v3".into()
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/offline.html".into(), "/manifest.json".into()]
}

fn default_offline_path() -> String {
    "/offline.html".into()
}

fn default_image_max_age_days() -> u64 {
    30
}

fn default_user_agent() -> String {
    "egecache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            site_domains: default_site_domains(),
            allow_local_hosts: true,
            cache_version: default_cache_version(),
            precache: default_precache(),
            precache_static: Vec::new(),
            offline_path: default_offline_path(),
            image_max_age_days: default_image_max_age_days(),
            network_first_prefixes: Vec::new(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            follow_redirects: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Image max age as a chrono duration for `Date` header comparisons.
    ///
    /// Fails for day counts chrono cannot represent.
    pub fn image_max_age(&self) -> Result<chrono::Duration, ConfigError> {
        i64::try_from(self.image_max_age_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .ok_or_else(|| ConfigError::Invalid {
                field: "image_max_age_days".into(),
                reason: format!("{} days is out of range", self.image_max_age_days),
            })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EGECACHE_`
    /// 2. TOML file from `EGECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EGECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EGECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./egecache.sqlite"));
        assert_eq!(config.origin, "https://egepenakcayapi.com.tr");
        assert_eq!(config.cache_version, "v3");
        assert_eq!(config.precache, vec!["/", "/offline.html", "/manifest.json"]);
        assert_eq!(config.offline_path, "/offline.html");
        assert_eq!(config.image_max_age_days, 30);
        assert!(config.precache_static.is_empty());
        assert!(config.network_first_prefixes.is_empty());
        assert!(config.allow_local_hosts);
        assert!(!config.follow_redirects);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_image_max_age() {
        let config = AppConfig::default();
        assert_eq!(config.image_max_age().unwrap(), chrono::Duration::days(30));
    }

    #[test]
    fn test_image_max_age_out_of_range() {
        let huge = AppConfig { image_max_age_days: 200_000_000_000, ..Default::default() };
        assert!(matches!(huge.image_max_age(), Err(ConfigError::Invalid { .. })));

        let wrapping = AppConfig { image_max_age_days: u64::MAX, ..Default::default() };
        assert!(wrapping.image_max_age().is_err());
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "egecache.toml",
                r#"
                cache_version = "v4"
                image_max_age_days = 7
                "#,
            )?;
            jail.set_env("EGECACHE_CONFIG_FILE", "egecache.toml");
            jail.set_env("EGECACHE_CACHE_VERSION", "v5");
            jail.set_env("EGECACHE_NETWORK_FIRST_PREFIXES", r#"["/api/"]"#);

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version, "v5");
            assert_eq!(config.image_max_age_days, 7);
            assert_eq!(config.network_first_prefixes, vec!["/api/"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("EGECACHE_OFFLINE_PATH", "/cevrimdisi.html");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
