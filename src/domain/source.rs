use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::errors::{RelayError, RelayResult};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]{2,21}$").expect("source name pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    New,
    Hot,
    TopDaily,
    TopWeekly,
    TopMonthly,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::New => "new",
            SortMode::Hot => "hot",
            SortMode::TopDaily => "top_daily",
            SortMode::TopWeekly => "top_weekly",
            SortMode::TopMonthly => "top_monthly",
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(SortMode::New),
            "hot" => Ok(SortMode::Hot),
            "top_daily" | "top-daily" | "top-day" | "top" | "day" => Ok(SortMode::TopDaily),
            "top_weekly" | "top-weekly" | "top-week" | "week" => Ok(SortMode::TopWeekly),
            "top_monthly" | "top-monthly" | "top-month" | "month" => Ok(SortMode::TopMonthly),
            _ => Err(format!("Unknown sort mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub sort_mode: SortMode,
    pub created_at: Option<String>,
}

impl Source {
    pub fn new(name: String, sort_mode: SortMode) -> Self {
        Self {
            name,
            sort_mode,
            created_at: None,
        }
    }

    /// Normalize user input ("r/Rust", "/r/rust ", "rust") to a registry key
    pub fn normalize_name(raw: &str) -> RelayResult<String> {
        let trimmed = raw.trim();
        let name = trimmed
            .strip_prefix("/r/")
            .or_else(|| trimmed.strip_prefix("r/"))
            .unwrap_or(trimmed)
            .trim_end_matches('/')
            .to_lowercase();

        if NAME_PATTERN.is_match(&name) {
            Ok(name)
        } else {
            Err(RelayError::InvalidSourceName(raw.trim().to_string()))
        }
    }
}

/// Outcome of the most recent poll of a source, kept in memory only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Pending,
    Healthy {
        at: DateTime<Utc>,
        delivered: usize,
    },
    Unavailable {
        at: DateTime<Utc>,
        reason: String,
    },
    NotFound {
        at: DateTime<Utc>,
    },
}

impl SourceStatus {
    pub fn describe(&self) -> String {
        match self {
            SourceStatus::Pending => "not polled yet".to_string(),
            SourceStatus::Healthy { at, delivered } => format!(
                "ok at {}, {} new",
                at.format("%H:%M:%S"),
                delivered
            ),
            SourceStatus::Unavailable { at, reason } => {
                format!("unavailable at {}: {}", at.format("%H:%M:%S"), reason)
            }
            SourceStatus::NotFound { at } => {
                format!("not found upstream since {}", at.format("%Y-%m-%d %H:%M"))
            }
        }
    }
}
