use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_LIMIT: i64 = 100;
pub const DEFAULT_SNOOZE_MINUTES: i64 = 15;
pub const DEFAULT_MAX_SNOOZE_COUNT: u32 = 5;
pub const DEFAULT_PROCESS_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_UPCOMING_DAYS: i64 = 7;
pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_REMINDER_URL: &str = "/hub/reminder/{refid}";

/// Top-level config (hub.toml + HUB_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub urls: UrlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Reminder processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Upper bound on reminders handled by one processing pass.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,
    /// Snooze duration used when the caller does not pass one.
    #[serde(default = "default_snooze_minutes")]
    pub default_snooze_minutes: i64,
    /// Advisory only: reported in metrics, never enforced on snooze.
    #[serde(default = "default_max_snooze_count")]
    pub max_snooze_count: u32,
    /// Cadence of the periodic due-reminder pass.
    #[serde(default = "default_process_interval_minutes")]
    pub process_interval_minutes: u64,
    /// Window used by the upcoming-reminders listing.
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            default_snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            max_snooze_count: DEFAULT_MAX_SNOOZE_COUNT,
            process_interval_minutes: DEFAULT_PROCESS_INTERVAL_MINUTES,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }
}

/// Link patterns placed in outbound notices. `{refid}` is substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_reminder_url")]
    pub reminder: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reminder: default_reminder_url(),
        }
    }
}

fn default_batch_limit() -> i64 {
    DEFAULT_BATCH_LIMIT
}
fn default_snooze_minutes() -> i64 {
    DEFAULT_SNOOZE_MINUTES
}
fn default_max_snooze_count() -> u32 {
    DEFAULT_MAX_SNOOZE_COUNT
}
fn default_process_interval_minutes() -> u64 {
    DEFAULT_PROCESS_INTERVAL_MINUTES
}
fn default_upcoming_days() -> i64 {
    DEFAULT_UPCOMING_DAYS
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_reminder_url() -> String {
    DEFAULT_REMINDER_URL.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.hub/hub.db", home)
}

impl HubConfig {
    /// Load config from a TOML file with HUB_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `HUB_REMINDERS__BATCH_LIMIT=50` sets `reminders.batch_limit`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("HUB_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        figment
            .extract()
            .map_err(|e| crate::error::HubError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.hub/hub.toml", home)
}
