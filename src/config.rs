//! Runtime configuration read from the environment.
//!
//! Every setting has a default so a local server starts with only
//! `JWT_SECRET` set.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

pub const MIN_JWT_SECRET_LEN: usize = 32;
/// Token lifetime bounds in hours; thirty days at most.
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 30;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters long")]
    WeakSecret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Env: `BIND_ADDR`, default `0.0.0.0:8080`
    pub bind_addr: String,
    /// Origin allowed by CORS and used in password-reset links.
    /// Env: `FRONTEND_URL`, default `http://localhost:5173`
    pub frontend_url: String,
    /// Env: `CAREHUB_DATA_DIR`, default `data`
    pub data_dir: PathBuf,
    /// Env: `JWT_TTL_HOURS`, default 24, kept within 1..=`MAX_JWT_TTL_HOURS`
    pub jwt_ttl_hours: i64,
    /// Emails granted the admin role at sign-in, lowercase.
    /// Env: `ADMIN_EMAILS` (comma separated)
    pub admin_emails: Vec<String>,
    /// Env: `MAIL_WEBHOOK_URL`; unset means reset links are only logged.
    pub mail_webhook_url: Option<String>,
    /// Env: `ENABLE_HSTS`
    pub enable_hsts: bool,
    /// Env: `RATE_LIMIT_ENABLED`, default true
    pub rate_limit_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            frontend_url: "http://localhost:5173".into(),
            data_dir: PathBuf::from("data"),
            jwt_ttl_hours: 24,
            admin_emails: Vec::new(),
            mail_webhook_url: None,
            enable_hsts: false,
            rate_limit_enabled: true,
        }
    }
}

fn flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("invalid {key} value '{raw}', using default");
            default
        }),
        Err(_) => default,
    }
}

pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let cfg = Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(d.bind_addr),
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or(d.frontend_url),
            data_dir: std::env::var("CAREHUB_DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            jwt_ttl_hours: parsed("JWT_TTL_HOURS", d.jwt_ttl_hours),
            admin_emails: std::env::var("ADMIN_EMAILS").map(|v| parse_email_list(&v)).unwrap_or_default(),
            mail_webhook_url: std::env::var("MAIL_WEBHOOK_URL").ok().filter(|v| !v.trim().is_empty()),
            enable_hsts: std::env::var("ENABLE_HSTS").map(|v| flag(&v)).unwrap_or(d.enable_hsts),
            rate_limit_enabled: std::env::var("RATE_LIMIT_ENABLED").map(|v| flag(&v)).unwrap_or(d.rate_limit_enabled),
        };
        let ttl = cfg.jwt_ttl_hours.clamp(1, MAX_JWT_TTL_HOURS);
        if ttl != cfg.jwt_ttl_hours {
            warn!(requested = cfg.jwt_ttl_hours, used = ttl, "JWT_TTL_HOURS out of range, clamped");
        }
        let cfg = Self { jwt_ttl_hours: ttl, ..cfg };
        if cfg.admin_emails.is_empty() {
            info!("ADMIN_EMAILS not set; only profiles flagged isAdmin get the admin role");
        }
        cfg
    }

    pub fn jwt_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt_ttl_hours.clamp(1, MAX_JWT_TTL_HOURS))
    }

    /// Checks the settings the server refuses to start without.
    pub fn validate() -> Result<(), ConfigError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_list_is_normalised() {
        assert_eq!(parse_email_list(" Admin@Care.my, ,ops@care.my"), vec!["admin@care.my", "ops@care.my"]);
    }

    #[test]
    #[serial_test::serial]
    fn validate_requires_long_secret() {
        std::env::remove_var("JWT_SECRET");
        assert_eq!(AppConfig::validate(), Err(ConfigError::Missing("JWT_SECRET")));
        std::env::set_var("JWT_SECRET", "short");
        assert_eq!(AppConfig::validate(), Err(ConfigError::WeakSecret));
        std::env::set_var("JWT_SECRET", "x".repeat(MIN_JWT_SECRET_LEN));
        assert_eq!(AppConfig::validate(), Ok(()));
    }

    #[test]
    #[serial_test::serial]
    fn from_env_reads_overrides() {
        std::env::set_var("ADMIN_EMAILS", "Admin@gmail.com");
        std::env::set_var("JWT_TTL_HOURS", "not-a-number");
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let cfg = AppConfig::from_env();
        for key in ["ADMIN_EMAILS", "JWT_TTL_HOURS", "RATE_LIMIT_ENABLED"] {
            std::env::remove_var(key);
        }
        assert_eq!(cfg.admin_emails, vec!["admin@gmail.com"]);
        assert_eq!(cfg.jwt_ttl_hours, 24);
        assert!(!cfg.rate_limit_enabled);
    }

    #[test]
    #[serial_test::serial]
    fn huge_token_lifetime_is_clamped() {
        std::env::set_var("JWT_TTL_HOURS", i64::MAX.to_string());
        let cfg = AppConfig::from_env();
        std::env::remove_var("JWT_TTL_HOURS");
        assert_eq!(cfg.jwt_ttl_hours, MAX_JWT_TTL_HOURS);

        let raw = AppConfig { jwt_ttl_hours: i64::MIN, ..AppConfig::default() };
        assert_eq!(raw.jwt_ttl(), chrono::Duration::hours(1));
        assert_eq!(AppConfig::default().jwt_ttl(), chrono::Duration::hours(24));
    }
}
