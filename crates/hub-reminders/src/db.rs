use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::{ReminderError, Result};

/// Initialise the reminder schema in `conn`.
///
/// Creates the `hub_reminder` table (idempotent) plus the indexes the due and
/// upcoming queries filter on.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS hub_reminder (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            refid            TEXT    NOT NULL UNIQUE,
            user_id          INTEGER NOT NULL,
            subject_type     TEXT,               -- NULL together with subject_id
            subject_id       TEXT,
            message          TEXT    NOT NULL,
            remind_at        TEXT    NOT NULL,   -- fixed-width RFC 3339 UTC
            repeat_interval  TEXT    NOT NULL DEFAULT 'none',
            status           TEXT    NOT NULL DEFAULT 'pending',
            completed_at     TEXT,
            snoozed_until    TEXT,
            snooze_count     INTEGER NOT NULL DEFAULT 0,
            metadata         TEXT    NOT NULL DEFAULT '{}',
            created_at       TEXT    NOT NULL,
            updated_at       TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_hub_reminder_user ON hub_reminder (user_id);
        CREATE INDEX IF NOT EXISTS idx_hub_reminder_status ON hub_reminder (status);
        CREATE INDEX IF NOT EXISTS idx_hub_reminder_remind_at ON hub_reminder (remind_at);
        CREATE INDEX IF NOT EXISTS idx_hub_reminder_snoozed_until ON hub_reminder (snoozed_until);
        CREATE INDEX IF NOT EXISTS idx_hub_reminder_subject
            ON hub_reminder (subject_type, subject_id);
        ",
    )?;
    Ok(())
}

/// Format a timestamp for storage.
///
/// Always microsecond precision with a `Z` suffix, so string comparison in
/// SQL orders the same way as the instants do.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whether `ts` survives a `fmt_ts` / `parse_ts` round trip.
///
/// Outside years 0000-9999 RFC 3339 has no representation; chrono writes a
/// signed, wider year that neither parses back nor sorts correctly in SQL.
pub fn is_storable(ts: DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// [`is_storable`] as a validation step for new schedule times.
pub(crate) fn ensure_storable(ts: DateTime<Utc>, what: &str) -> Result<()> {
    if is_storable(ts) {
        Ok(())
    } else {
        Err(ReminderError::InvalidReminder(format!(
            "{what} {} is outside years 0000-9999",
            fmt_ts(ts)
        )))
    }
}

pub fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ReminderError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
