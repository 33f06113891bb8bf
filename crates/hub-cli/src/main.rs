use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use hub_core::HubConfig;
use hub_reminders::{
    ChannelNotifier, LogNotifier, NoticeRenderer, Notifier, ReminderManager, SqliteReminderStore,
    SystemClock,
};
use tracing::info;

mod commands;

/// Hub reminders: process due reminders and manage them from the shell.
#[derive(Debug, Parser)]
#[command(name = "hub", version)]
struct Cli {
    /// Path to hub.toml (falls back to $HUB_CONFIG, then ~/.hub/hub.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process due reminders once and dispatch notifications.
    Remind {
        /// Maximum reminders to process (default: reminders.batch_limit).
        #[arg(short, long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    /// Run the due-reminder pass periodically until interrupted.
    Run,
    /// Create a reminder.
    Add(AddArgs),
    /// Show one reminder.
    Show { refid: String },
    /// Push a reminder back.
    Snooze {
        refid: String,
        /// Minutes to snooze for (default: reminders.default_snooze_minutes).
        #[arg(short, long)]
        minutes: Option<i64>,
    },
    /// Cancel a reminder.
    Cancel { refid: String },
    /// Mark a reminder done without waiting for it to fire.
    Complete { refid: String },
    /// List a user's pending reminders due soon.
    Upcoming {
        #[arg(long)]
        user: i64,
        /// Window in days (default: reminders.upcoming_days).
        #[arg(long)]
        days: Option<i64>,
    },
    /// Show reminder counts and completion rate.
    Metrics,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// User to remind.
    #[arg(long)]
    pub user: i64,
    #[arg(long)]
    pub message: String,
    /// Absolute trigger time, RFC 3339.
    #[arg(long, conflicts_with = "in_minutes", required_unless_present = "in_minutes")]
    pub at: Option<chrono::DateTime<chrono::Utc>>,
    /// Trigger time relative to now.
    #[arg(long)]
    pub in_minutes: Option<i64>,
    /// none, daily, weekly, monthly or yearly.
    #[arg(long, default_value = "none")]
    pub repeat: hub_reminders::RepeatInterval,
    /// Type of the entity the reminder is about (thread, message, or a host type).
    #[arg(long, requires = "subject_id")]
    pub subject_kind: Option<hub_reminders::SubjectKind>,
    #[arg(long, requires = "subject_kind")]
    pub subject_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hub_cli=info,hub_reminders=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // load config: --config > HUB_CONFIG env > ~/.hub/hub.toml
    let config_path = cli.config.clone().or_else(|| std::env::var("HUB_CONFIG").ok());
    let config = HubConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        HubConfig::default()
    });

    let store = Arc::new(open_store(&config)?);
    let renderer = NoticeRenderer::new(&config.urls);

    match cli.command {
        Command::Run => {
            // Notices: engine pass -> delivery task
            let (notice_tx, notice_rx) = tokio::sync::mpsc::channel(256);
            let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new(renderer, notice_tx));
            let manager = Arc::new(ReminderManager::new(
                store,
                notifier,
                Arc::new(SystemClock),
                config.reminders.clone(),
            ));
            commands::run(manager, &config.reminders, notice_rx).await
        }
        command => {
            let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new(renderer));
            let manager = ReminderManager::new(
                store,
                notifier,
                Arc::new(SystemClock),
                config.reminders.clone(),
            );
            dispatch(&manager, command, cli.json)
        }
    }
}

fn dispatch(manager: &ReminderManager, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Remind { limit } => commands::remind(manager, limit, json),
        Command::Add(args) => commands::add(manager, args, json),
        Command::Show { refid } => commands::show(manager, &refid, json),
        Command::Snooze { refid, minutes } => commands::snooze(manager, &refid, minutes, json),
        Command::Cancel { refid } => commands::cancel(manager, &refid, json),
        Command::Complete { refid } => commands::complete(manager, &refid, json),
        Command::Upcoming { user, days } => commands::upcoming(manager, user, days, json),
        Command::Metrics => commands::metrics(manager, json),
        Command::Run => unreachable!("run is handled before dispatch"),
    }
}

/// Open the SQLite database and initialise the reminder schema.
fn open_store(config: &HubConfig) -> anyhow::Result<SqliteReminderStore> {
    let db_path = &config.database.path;
    ensure_parent_dir(db_path)?;
    info!(path = %db_path, "opening SQLite database");

    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(SqliteReminderStore::new(conn)?)
}

fn ensure_parent_dir(path: &str) -> hub_core::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remind_accepts_negative_limit() {
        let cli = Cli::try_parse_from(["hub", "remind", "--limit", "-3"]).unwrap();
        assert!(matches!(cli.command, Command::Remind { limit: Some(-3) }));
    }

    #[test]
    fn add_requires_a_time() {
        assert!(Cli::try_parse_from(["hub", "add", "--user", "1", "--message", "x"]).is_err());
        assert!(Cli::try_parse_from([
            "hub", "add", "--user", "1", "--message", "x", "--in-minutes", "5", "--at",
            "2026-01-01T00:00:00Z",
        ])
        .is_err());
    }

    #[test]
    fn add_parses_repeat_and_subject() {
        let cli = Cli::try_parse_from([
            "hub", "add", "--user", "1", "--message", "x", "--at", "2026-01-01T09:00:00Z",
            "--repeat", "monthly", "--subject-kind", "thread", "--subject-id", "t1",
        ])
        .unwrap();
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.repeat, hub_reminders::RepeatInterval::Monthly);
        assert_eq!(args.subject_kind, Some(hub_reminders::SubjectKind::Thread));
    }

    #[test]
    fn unknown_repeat_is_rejected() {
        assert!(Cli::try_parse_from([
            "hub", "add", "--user", "1", "--message", "x", "--in-minutes", "5", "--repeat",
            "hourly",
        ])
        .is_err());
    }
}
