//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use yatube_core::domain::DEFAULT_PER_PAGE;
#[cfg(feature = "postgres")]
use yatube_infra::DatabaseConfig;

/// Settings handlers read at request time.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub posts_per_page: u64,
    /// Lifetime of a cached index page.
    pub index_cache_ttl: Duration,
    pub max_upload_bytes: usize,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            posts_per_page: DEFAULT_PER_PAGE,
            index_cache_ttl: Duration::from_secs(20),
            max_upload_bytes: 5 * 1024 * 1024,
            secure_cookies: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    /// Set when `REDIS_URL` is present.
    pub redis_enabled: bool,
    pub media_root: PathBuf,
    pub site: SiteSettings,
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = SiteSettings::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("PORT", 8080),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            redis_enabled: env::var("REDIS_URL").is_ok_and(|url| !url.is_empty()),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            site: SiteSettings {
                posts_per_page: parse_or("POSTS_PER_PAGE", defaults.posts_per_page).max(1),
                index_cache_ttl: Duration::from_secs(parse_or(
                    "INDEX_CACHE_TTL_SECS",
                    defaults.index_cache_ttl.as_secs(),
                )),
                max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
                secure_cookies: env::var("SECURE_COOKIES")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(defaults.secure_cookies),
            },
        }
    }
}
