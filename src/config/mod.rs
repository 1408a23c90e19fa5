use std::str::FromStr;
use std::time::Duration;

use crate::errors::{RelayError, RelayResult};

const DEFAULT_USER_AGENT: &str = "subrelay/0.1";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    /// The only Telegram user allowed to manage sources
    pub admin_id: i64,
    /// Chat that receives relayed posts
    pub chat_id: i64,
    pub db_path: String,
    pub poll_interval: Duration,
    pub fetch_limit: u32,
    pub body_limit: usize,
    pub gallery_limit: usize,
    pub video_max_bytes: u64,
    pub http_timeout: Duration,
    pub item_delay: Duration,
    pub source_delay: Duration,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> RelayResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        let telegram_token = required("TELEGRAM_TOKEN")?;
        let reddit_client_id = required("REDDIT_CLIENT_ID")?;
        let reddit_client_secret = required("REDDIT_CLIENT_SECRET")?;

        let admin_id: i64 = parse_var("ADMIN_ID", 0)?;
        if admin_id == 0 {
            return Err(RelayError::MissingEnvVar("ADMIN_ID".to_string()));
        }

        let reddit_user_agent = std::env::var("REDDIT_USER_AGENT")
            .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let chat_id = parse_var("RELAY_CHAT_ID", admin_id)?;

        // Default db_path is relative to executable directory
        let db_path = std::env::var("RELAY_DB_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("data.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./data.db".to_string())
        });

        let poll_interval = Duration::from_secs(parse_var("POLL_INTERVAL_SECS", 60)?);
        if poll_interval.is_zero() {
            return Err(RelayError::Config(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let video_max_bytes = megabytes("VIDEO_MAX_MB", parse_var("VIDEO_MAX_MB", 50)?)?;

        Ok(Self {
            telegram_token,
            reddit_client_id,
            reddit_client_secret,
            reddit_user_agent,
            admin_id,
            chat_id,
            db_path,
            poll_interval,
            fetch_limit: parse_var("FETCH_LIMIT", 25)?,
            body_limit: parse_var("BODY_LIMIT", 500)?,
            gallery_limit: parse_var("GALLERY_LIMIT", 10)?,
            video_max_bytes,
            http_timeout: Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", 30)?),
            item_delay: Duration::from_millis(parse_var("ITEM_DELAY_MS", 1000)?),
            source_delay: Duration::from_millis(parse_var("SOURCE_DELAY_MS", 2000)?),
        })
    }
}

fn required(name: &str) -> RelayResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RelayError::MissingEnvVar(name.to_string()))
}

fn parse_var<T: FromStr>(name: &str, default: T) -> RelayResult<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw),
        _ => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> RelayResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{} has an invalid value: {}", name, raw)))
}

fn megabytes(name: &str, mb: u64) -> RelayResult<u64> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| RelayError::Config(format!("{} is too large: {}", name, mb)))
}
