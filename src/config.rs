use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::utils::jwt::{JwtKeys, JwtSecretError};

pub const DEFAULT_JWT_ISSUER: &str = "library-management-system";
pub const DEFAULT_JWT_AUDIENCE: &str = "library-clients";
/// Request body cap for the multipart book routes (50 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error(transparent)]
    JwtSecret(#[from] JwtSecretError),
}

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub keys: JwtKeys,
    pub issuer: String,
    pub audience: String,
    pub token_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub auth_per_second: u64,
    pub auth_burst: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub upload_dir: String,
    pub upload_max_bytes: usize,
    pub auth: AuthSettings,
    pub stripe: StripeSettings,
    pub smtp: SmtpSettings,
    pub rate_limit: RateLimitSettings,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = required("DATABASE_URL")?;
        let frontend_origin = required("FRONTEND_ORIGIN")?;

        let bind_addr = parsed("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?;
        let request_timeout = Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", 30u64)?);

        let jwt_secret = required("JWT_SECRET")?;
        let auth = AuthSettings {
            keys: JwtKeys::from_secret(jwt_secret)?,
            issuer: optional("JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
            audience: optional("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string()),
            token_ttl: Duration::from_secs(parsed("TOKEN_TTL_HOURS", 24u64)? * 3600),
        };

        let stripe = StripeSettings {
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            currency: optional("STRIPE_CURRENCY")
                .unwrap_or_else(|| "usd".to_string())
                .to_lowercase(),
            success_url: optional("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|| format!("{}/subscription/success", frontend_origin)),
            cancel_url: optional("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|| format!("{}/subscription/cancel", frontend_origin)),
        };

        let smtp = SmtpSettings {
            host: required("SMTP_HOST")?,
            port: parsed("SMTP_PORT", 587u16)?,
            username: optional("SMTP_USERNAME"),
            password: optional("SMTP_PASSWORD"),
            from: required("SMTP_FROM")?,
            tls_disabled: optional("SMTP_TLS_DISABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        let rate_limit = RateLimitSettings {
            auth_per_second: parsed("RATE_LIMITER_AUTH_SECONDS", 1u64)?,
            auth_burst: parsed("RATE_LIMITER_AUTH_BURST", 10u32)?,
        };

        Ok(Config {
            database_url,
            frontend_origin,
            bind_addr,
            request_timeout,
            upload_dir: optional("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            upload_max_bytes: parsed("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            auth,
            stripe,
            smtp,
            rate_limit,
        })
    }
}
