use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub log_level: String,
    pub scheduler: SchedulerConfig,
    pub reply_api: Option<ReplyApiConfig>,
    pub moderation: Option<ModerationConfig>,
}

/// Settings for the deferred auto-reply dispatcher.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub batch_size: i64,
    pub max_attempts: i32,
    pub retry_backoff_base_secs: u64,
    pub retry_backoff_cap_secs: u64,
    pub stale_claim_secs: u64,
    pub reply_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ReplyApiConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("REPLYPOST_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid REPLYPOST_HOST: {e}"))?;

        let port: u16 = env_or("REPLYPOST_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid REPLYPOST_PORT: {e}"))?;

        let max_body_size: usize = env_or("REPLYPOST_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid REPLYPOST_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("REPLYPOST_LOG_LEVEL", "info");

        let scheduler = SchedulerConfig {
            poll_interval_secs: env_parsed("REPLYPOST_POLL_INTERVAL_SECS", "5")?,
            batch_size: env_parsed("REPLYPOST_BATCH_SIZE", "10")?,
            max_attempts: env_parsed("REPLYPOST_MAX_ATTEMPTS", "5")?,
            retry_backoff_base_secs: env_parsed("REPLYPOST_RETRY_BACKOFF_BASE_SECS", "2")?,
            retry_backoff_cap_secs: env_parsed("REPLYPOST_RETRY_BACKOFF_CAP_SECS", "300")?,
            stale_claim_secs: env_parsed("REPLYPOST_STALE_CLAIM_SECS", "300")?,
            reply_timeout_secs: env_parsed("REPLYPOST_REPLY_TIMEOUT_SECS", "30")?,
        };

        let reply_api = match (
            std::env::var("REPLYPOST_REPLY_API_URL").ok(),
            std::env::var("REPLYPOST_REPLY_API_KEY").ok(),
        ) {
            (Some(url), Some(api_key)) => Some(ReplyApiConfig {
                url,
                api_key,
                model: env_or("REPLYPOST_REPLY_MODEL", "gemini-1.5-flash"),
            }),
            _ => None,
        };

        let moderation = std::env::var("REPLYPOST_MODERATION_API_URL")
            .ok()
            .map(|url| ModerationConfig {
                url,
                api_key: std::env::var("REPLYPOST_MODERATION_API_KEY").ok(),
            });

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            log_level,
            scheduler,
            reply_api,
            moderation,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}
