use anyhow::Context;
use std::env;

/// Lowest value an admin may set the global item size ceiling to (MB)
pub const MIN_ITEM_SIZE_LIMIT_MB: i32 = 1;
/// Highest value an admin may set the global item size ceiling to (MB)
pub const MAX_ITEM_SIZE_LIMIT_MB: i32 = 10;

pub const MIN_USER_LIMIT_MB: i32 = 5;
pub const MAX_USER_LIMIT_MB: i32 = 25;
pub const DEFAULT_USER_LIMIT_MB: i32 = 10;

pub const MIN_GROUP_LIMIT: i32 = 10;
pub const DEFAULT_GROUP_LIMIT: i32 = 25;

/// Name of the group every account is enrolled in
pub const DEFAULT_GROUP_NAME: &str = "default";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Secret used to sign session tokens
    pub session_secret: String,

    /// Session lifetime in minutes (default: 30)
    pub session_ttl_minutes: i64,

    /// Mark cookies `Secure` (default: false, enable behind TLS)
    pub secure_cookies: bool,

    /// Item size ceiling seeded into the admin settings on first start (default: 3 MB)
    pub default_item_size_limit_mb: i32,

    /// Account promoted to admin at startup, if both are set
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_secret: "secret".to_string(),
            session_ttl_minutes: 30,
            secure_cookies: false,
            default_item_size_limit_mb: 3,
            admin_username: None,
            admin_password: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            session_secret: env::var("SESSION_SECRET").unwrap_or(default.session_secret),

            session_ttl_minutes: env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.session_ttl_minutes),

            secure_cookies: env::var("SECURE_COOKIES")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.secure_cookies),

            default_item_size_limit_mb: env::var("DEFAULT_ITEM_SIZE_LIMIT_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|v: i32| v.clamp(MIN_ITEM_SIZE_LIMIT_MB, MAX_ITEM_SIZE_LIMIT_MB))
                .unwrap_or(default.default_item_size_limit_mb),

            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (long sessions, plain cookies)
    pub fn development() -> Self {
        Self {
            session_ttl_minutes: 24 * 60,
            ..Self::default()
        }
    }

    /// Create config for production (secure cookies, secret required)
    pub fn production() -> anyhow::Result<Self> {
        let session_secret =
            env::var("SESSION_SECRET").context("CRITICAL: SESSION_SECRET must be set")?;
        Ok(Self {
            session_secret,
            secure_cookies: true,
            ..Self::from_env()
        })
    }

    /// Picks the profile named by `APP_ENV` (`production`, `development`),
    /// falling back to plain environment variables.
    pub fn for_environment() -> anyhow::Result<Self> {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Self::production(),
            Ok("development") => Ok(Self::development()),
            _ => Ok(Self::from_env()),
        }
    }

    /// Largest request body accepted on item routes: the highest possible
    /// item ceiling plus room for the multipart envelope.
    pub fn max_body_size(&self) -> usize {
        (MAX_ITEM_SIZE_LIMIT_MB as usize + 1) * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.session_ttl_minutes, 30);
        assert_eq!(config.default_item_size_limit_mb, 3);
        assert!(!config.secure_cookies);
        assert!(config.admin_username.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.session_ttl_minutes, 24 * 60);
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_production_config() {
        unsafe { env::set_var("SESSION_SECRET", "test_secret") };
        let config = AppConfig::production().unwrap();
        unsafe { env::remove_var("SESSION_SECRET") };
        assert!(config.secure_cookies);
        assert_eq!(config.session_secret, "test_secret");
    }

    #[test]
    fn test_body_limit_covers_largest_item() {
        let config = AppConfig::default();
        assert!(config.max_body_size() > MAX_ITEM_SIZE_LIMIT_MB as usize * 1024 * 1024);
    }

    #[test]
    fn test_from_env_cors_fallback() {
        unsafe { env::remove_var("ALLOWED_ORIGINS") };
        let config = AppConfig::from_env();
        assert_eq!(config.allowed_origins, AppConfig::default().allowed_origins);
        assert!(!config.allowed_origins.contains(&"*".to_string()));
    }
}
