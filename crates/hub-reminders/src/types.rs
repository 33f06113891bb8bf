use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReminderError;

/// Lifecycle state of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Waiting for its trigger time.
    Pending,
    /// Fired and finished. Terminal for non-repeating reminders.
    Completed,
    /// Pushed back until `snoozed_until`.
    Snoozed,
    /// Withdrawn by the owner. Terminal.
    Cancelled,
}

impl ReminderStatus {
    pub const ALL: [ReminderStatus; 4] = [
        ReminderStatus::Pending,
        ReminderStatus::Completed,
        ReminderStatus::Snoozed,
        ReminderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Snoozed => "snoozed",
            ReminderStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "Pending",
            ReminderStatus::Completed => "Completed",
            ReminderStatus::Snoozed => "Snoozed",
            ReminderStatus::Cancelled => "Cancelled",
        }
    }

    /// Pending and snoozed reminders can still fire.
    pub fn is_active(&self) -> bool {
        matches!(self, ReminderStatus::Pending | ReminderStatus::Snoozed)
    }
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = ReminderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "completed" => Ok(ReminderStatus::Completed),
            "snoozed" => Ok(ReminderStatus::Snoozed),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            other => Err(ReminderError::UnknownValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// How often a reminder recurs after it fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatInterval {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatInterval::None => "none",
            RepeatInterval::Daily => "daily",
            RepeatInterval::Weekly => "weekly",
            RepeatInterval::Monthly => "monthly",
            RepeatInterval::Yearly => "yearly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepeatInterval::None => "Does not repeat",
            RepeatInterval::Daily => "Daily",
            RepeatInterval::Weekly => "Weekly",
            RepeatInterval::Monthly => "Monthly",
            RepeatInterval::Yearly => "Yearly",
        }
    }

    pub fn repeats(&self) -> bool {
        *self != RepeatInterval::None
    }
}

impl std::fmt::Display for RepeatInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RepeatInterval {
    type Err = ReminderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(RepeatInterval::None),
            "daily" => Ok(RepeatInterval::Daily),
            "weekly" => Ok(RepeatInterval::Weekly),
            "monthly" => Ok(RepeatInterval::Monthly),
            "yearly" => Ok(RepeatInterval::Yearly),
            other => Err(ReminderError::UnknownValue {
                field: "repeat_interval",
                value: other.to_string(),
            }),
        }
    }
}

/// Kind tag of the entity a reminder is about.
///
/// The hub's own entities get named variants; anything the host application
/// attaches travels as `Other` with its type name verbatim. `Other` may not
/// carry a named variant's text (`thread`, `message`): new reminders using it
/// are rejected, since it would load back as the named variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Thread,
    Message,
    Other(String),
}

impl SubjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            SubjectKind::Thread => "thread",
            SubjectKind::Message => "message",
            SubjectKind::Other(name) => name,
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubjectKind {
    type Err = ReminderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" => Err(ReminderError::UnknownValue {
                field: "subject_type",
                value: String::new(),
            }),
            "thread" => Ok(SubjectKind::Thread),
            "message" => Ok(SubjectKind::Message),
            other => Ok(SubjectKind::Other(other.to_string())),
        }
    }
}

/// Tagged reference to the external entity a reminder concerns.
///
/// Carried, never dereferenced here; see [`crate::notify::SubjectResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: String,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// A persisted reminder record.
///
/// Output-only for serde: records come from the store, which owns the row id,
/// so there is deliberately no `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    /// Internal row id. Never leaves the store.
    #[serde(skip)]
    pub(crate) id: i64,
    /// Public random token used for every external lookup.
    pub refid: String,
    /// User to notify.
    pub user_id: i64,
    pub subject: Option<SubjectRef>,
    pub message: String,
    /// Scheduled trigger time; advanced on recurrence.
    pub remind_at: DateTime<Utc>,
    pub repeat_interval: RepeatInterval,
    pub status: ReminderStatus,
    /// Set only while `status == Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only while `status == Snoozed`.
    pub snoozed_until: Option<DateTime<Utc>>,
    pub snooze_count: u32,
    /// Opaque key-value bag owned by the caller.
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// `snoozed_until` when set, otherwise `remind_at`.
    pub fn effective_trigger(&self) -> DateTime<Utc> {
        self.snoozed_until.unwrap_or(self.remind_at)
    }

    /// Same predicate the store's due query applies in SQL.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.effective_trigger() <= now
    }

    pub fn repeats(&self) -> bool {
        self.repeat_interval.repeats()
    }

    /// Reporting only: snoozing past the limit is still allowed.
    pub fn snooze_limit_reached(&self, max_snooze_count: u32) -> bool {
        self.snooze_count >= max_snooze_count
    }
}

/// Validated input for a new reminder. Produced by [`crate::builder::ReminderBuilder`].
///
/// Carries no status: every reminder starts out pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub user_id: i64,
    pub subject: Option<SubjectRef>,
    pub message: String,
    pub remind_at: DateTime<Utc>,
    pub repeat_interval: RepeatInterval,
    pub metadata: Map<String, Value>,
}
