use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    db::{fmt_ts, init_db, parse_ts},
    error::{ReminderError, Result},
    types::{NewReminder, Reminder, ReminderStatus, SubjectKind, SubjectRef},
};

/// Persistence collaborator for reminders.
///
/// Every lookup from outside the subsystem goes through `refid`; the internal
/// row id stays inside the implementation.
pub trait ReminderStore: Send + Sync {
    /// Persist a new reminder. Status is always `pending`.
    fn insert(&self, new: NewReminder, now: DateTime<Utc>) -> Result<Reminder>;

    fn find_by_ref(&self, refid: &str) -> Result<Option<Reminder>>;

    /// Write back the mutable columns of `reminder` and bump `updated_at`.
    fn save(&self, reminder: &mut Reminder, now: DateTime<Utc>) -> Result<()>;

    /// Reminders that are pending or snoozed and whose effective trigger
    /// (`snoozed_until`, else `remind_at`) is at or before `now`.
    ///
    /// `limit <= 0` returns an empty list.
    fn find_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Reminder>>;

    /// Pending reminders of `user_id` with `remind_at` no later than
    /// `now + days`, earliest first.
    fn upcoming_for_user(&self, user_id: i64, now: DateTime<Utc>, days: i64)
        -> Result<Vec<Reminder>>;

    /// Number of reminders per status. Statuses with no rows are absent.
    fn status_counts(&self) -> Result<HashMap<ReminderStatus, u64>>;

    /// Active reminders whose `snooze_count` is at least `count`.
    fn count_snoozed_at_least(&self, count: u32) -> Result<u64>;
}

/// Random 128-bit token (UUID v4, hex) used as the public reference.
pub fn generate_refid() -> String {
    Uuid::new_v4().simple().to_string()
}

const COLUMNS: &str = "id, refid, user_id, subject_type, subject_id, message, remind_at,
                       repeat_interval, status, completed_at, snoozed_until, snooze_count,
                       metadata, created_at, updated_at";

/// SQLite-backed [`ReminderStore`].
///
/// Wraps a single connection in a `Mutex`; one processing pass touches
/// reminders one at a time, so there is no contention worth pooling for.
pub struct SqliteReminderStore {
    db: Mutex<Connection>,
}

impl SqliteReminderStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| ReminderError::Internal("reminder store mutex poisoned".to_string()))
    }

    /// Run a multi-row SELECT and decode every row.
    ///
    /// Rows that fail to decode (unknown enum value, bad timestamp) are logged
    /// and skipped so one corrupt record cannot stall every pass.
    fn query_reminders(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Reminder>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows: Vec<ReminderRow> = stmt
            .query_map(params, ReminderRow::read)?
            .collect::<rusqlite::Result<_>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let refid = row.refid.clone();
                match row.decode() {
                    Ok(reminder) => Some(reminder),
                    Err(e) => {
                        error!(reminder_ref = %refid, "skipping undecodable reminder row: {e}");
                        None
                    }
                }
            })
            .collect())
    }
}

impl ReminderStore for SqliteReminderStore {
    fn insert(&self, new: NewReminder, now: DateTime<Utc>) -> Result<Reminder> {
        new.validate()?;
        let refid = generate_refid();
        let now_str = fmt_ts(now);
        let metadata = serde_json::to_string(&new.metadata)?;
        let (subject_type, subject_id) = match &new.subject {
            Some(s) => (Some(s.kind.to_string()), Some(s.id.clone())),
            None => (None, None),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO hub_reminder
             (refid, user_id, subject_type, subject_id, message, remind_at,
              repeat_interval, status, completed_at, snoozed_until, snooze_count,
              metadata, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,'pending',NULL,NULL,0,?8,?9,?9)",
            rusqlite::params![
                refid,
                new.user_id,
                subject_type,
                subject_id,
                new.message,
                fmt_ts(new.remind_at),
                new.repeat_interval.as_str(),
                metadata,
                now_str,
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!(reminder_ref = %refid, user_id = new.user_id, repeat = %new.repeat_interval, "reminder created");

        Ok(Reminder {
            id,
            refid,
            user_id: new.user_id,
            subject: new.subject,
            message: new.message,
            remind_at: new.remind_at,
            repeat_interval: new.repeat_interval,
            status: ReminderStatus::Pending,
            completed_at: None,
            snoozed_until: None,
            snooze_count: 0,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    fn find_by_ref(&self, refid: &str) -> Result<Option<Reminder>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM hub_reminder WHERE refid = ?1"),
                [refid],
                ReminderRow::read,
            )
            .optional()?;
        row.map(ReminderRow::decode).transpose()
    }

    fn save(&self, reminder: &mut Reminder, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE hub_reminder SET remind_at=?1, status=?2, completed_at=?3,
              snoozed_until=?4, snooze_count=?5, metadata=?6, updated_at=?7
             WHERE id=?8",
            rusqlite::params![
                fmt_ts(reminder.remind_at),
                reminder.status.as_str(),
                reminder.completed_at.map(fmt_ts),
                reminder.snoozed_until.map(fmt_ts),
                reminder.snooze_count,
                serde_json::to_string(&reminder.metadata)?,
                fmt_ts(now),
                reminder.id,
            ],
        )?;
        if n == 0 {
            return Err(ReminderError::NotFound {
                refid: reminder.refid.clone(),
            });
        }
        reminder.updated_at = now;
        debug!(reminder_ref = %reminder.refid, status = %reminder.status, "reminder saved");
        Ok(())
    }

    fn find_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Reminder>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        Self::query_reminders(
            &conn,
            &format!(
                "SELECT {COLUMNS} FROM hub_reminder
                 WHERE status IN ('pending', 'snoozed')
                   AND ((snoozed_until IS NULL AND remind_at <= ?1) OR snoozed_until <= ?1)
                 ORDER BY COALESCE(snoozed_until, remind_at), id
                 LIMIT ?2"
            ),
            rusqlite::params![fmt_ts(now), limit],
        )
    }

    fn upcoming_for_user(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        days: i64,
    ) -> Result<Vec<Reminder>> {
        let until = Duration::try_days(days)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| ReminderError::InvalidReminder(format!("{days} days overflows")))?;
        let conn = self.conn()?;
        Self::query_reminders(
            &conn,
            &format!(
                "SELECT {COLUMNS} FROM hub_reminder
                 WHERE user_id = ?1 AND status = 'pending' AND remind_at <= ?2
                 ORDER BY remind_at ASC, id"
            ),
            rusqlite::params![user_id, fmt_ts(until)],
        )
    }

    fn status_counts(&self) -> Result<HashMap<ReminderStatus, u64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare_cached("SELECT status, COUNT(*) FROM hub_reminder GROUP BY status")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter()
            .map(|(status, n)| Ok((status.parse::<ReminderStatus>()?, n.max(0) as u64)))
            .collect()
    }

    fn count_snoozed_at_least(&self, count: u32) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM hub_reminder
             WHERE status IN ('pending', 'snoozed') AND snooze_count >= ?1",
            [count],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as u64)
    }
}

/// Raw column values, decoded into a [`Reminder`] outside the rusqlite closure
/// so decode failures surface as [`ReminderError`] rather than SQL errors.
struct ReminderRow {
    id: i64,
    refid: String,
    user_id: i64,
    subject_type: Option<String>,
    subject_id: Option<String>,
    message: String,
    remind_at: String,
    repeat_interval: String,
    status: String,
    completed_at: Option<String>,
    snoozed_until: Option<String>,
    snooze_count: u32,
    metadata: String,
    created_at: String,
    updated_at: String,
}

impl ReminderRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            refid: row.get(1)?,
            user_id: row.get(2)?,
            subject_type: row.get(3)?,
            subject_id: row.get(4)?,
            message: row.get(5)?,
            remind_at: row.get(6)?,
            repeat_interval: row.get(7)?,
            status: row.get(8)?,
            completed_at: row.get(9)?,
            snoozed_until: row.get(10)?,
            snooze_count: row.get(11)?,
            metadata: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn decode(self) -> Result<Reminder> {
        let subject = match (self.subject_type, self.subject_id) {
            (Some(kind), Some(id)) => Some(SubjectRef::new(kind.parse::<SubjectKind>()?, id)),
            (None, None) => None,
            _ => {
                return Err(ReminderError::InvalidReminder(format!(
                    "{}: subject_type and subject_id must be set together",
                    self.refid
                )))
            }
        };
        let metadata: Map<String, Value> = serde_json::from_str(&self.metadata)?;

        Ok(Reminder {
            id: self.id,
            refid: self.refid,
            user_id: self.user_id,
            subject,
            message: self.message,
            remind_at: parse_ts(&self.remind_at)?,
            repeat_interval: self.repeat_interval.parse()?,
            status: self.status.parse()?,
            completed_at: self.completed_at.as_deref().map(parse_ts).transpose()?,
            snoozed_until: self.snoozed_until.as_deref().map(parse_ts).transpose()?,
            snooze_count: self.snooze_count,
            metadata,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}
