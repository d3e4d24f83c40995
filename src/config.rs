use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc, Weekday};

use crate::error::AppError;
use crate::records::RecordsConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://coursedesk.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TARGET_GPA: f64 = 3.8;

#[derive(Clone, Debug, PartialEq)]
pub enum StoreBackend {
    Sqlite { database_url: String },
    Memory,
    Hosted(RecordsConfig),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    pub week_start: Weekday,
    /// Viewer timezone used to turn due dates and "now" into calendar dates.
    pub utc_offset: FixedOffset,
    pub target_gpa: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend: StoreBackend::Memory,
            week_start: Weekday::Sun,
            utc_offset: Utc.fix(),
            target_gpa: DEFAULT_TARGET_GPA,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR: {}", e)))?;

        let backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("sqlite") => StoreBackend::Sqlite {
                database_url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            },
            Some("memory") => StoreBackend::Memory,
            Some("hosted") => StoreBackend::Hosted(records_config(&lookup)?),
            Some(other) => {
                return Err(AppError::Config(format!(
                    "STORE_BACKEND must be sqlite, memory or hosted, got {:?}",
                    other
                )));
            }
        };

        let week_start = match lookup("CALENDAR_WEEK_START") {
            None => Weekday::Sun,
            Some(raw) => Weekday::from_str(raw.trim())
                .map_err(|_| AppError::Config(format!("CALENDAR_WEEK_START: unknown weekday {:?}", raw)))?,
        };

        let utc_offset = match lookup("CALENDAR_UTC_OFFSET") {
            None => Utc.fix(),
            Some(raw) => parse_offset(&raw)?,
        };

        let target_gpa = match lookup("DASHBOARD_TARGET_GPA") {
            None => DEFAULT_TARGET_GPA,
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|gpa| *gpa > 0.0 && *gpa <= 4.0)
                .ok_or_else(|| {
                    AppError::Config(format!("DASHBOARD_TARGET_GPA must be in (0, 4], got {:?}", raw))
                })?,
        };

        Ok(Self {
            bind_addr,
            backend,
            week_start,
            utc_offset,
            target_gpa,
        })
    }
}

fn records_config(lookup: &impl Fn(&str) -> Option<String>) -> Result<RecordsConfig, AppError> {
    let var = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
    };

    Ok(RecordsConfig {
        api_url: var("RECORDS_API_URL")?.trim_end_matches('/').to_string(),
        project_id: var("RECORDS_PROJECT_ID")?,
        public_key: var("RECORDS_PUBLIC_KEY")?,
    })
}

fn parse_offset(raw: &str) -> Result<FixedOffset, AppError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return Ok(Utc.fix());
    }
    raw.parse::<FixedOffset>()
        .map_err(|_| AppError::Config(format!("CALENDAR_UTC_OFFSET must look like +HH:MM, got {:?}", raw)))
}
