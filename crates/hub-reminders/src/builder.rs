use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde_json::{Map, Value};

use crate::db::ensure_storable;
use crate::error::{ReminderError, Result};
use crate::types::{NewReminder, RepeatInterval, SubjectKind, SubjectRef};

/// Fluent constructor for [`NewReminder`].
///
/// Relative helpers (`in_minutes`, `tomorrow`, ...) are anchored to the `now`
/// passed to [`ReminderBuilder::new`], so a builder is deterministic under a
/// test clock.
///
/// ```ignore
/// let new = ReminderBuilder::new(clock.now())
///     .owner(42)
///     .message("Review the release notes")
///     .tomorrow(9, 0)
///     .weekly()
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ReminderBuilder {
    now: DateTime<Utc>,
    user_id: Option<i64>,
    subject: Option<SubjectRef>,
    message: String,
    remind_at: Option<DateTime<Utc>>,
    repeat_interval: RepeatInterval,
    metadata: Map<String, Value>,
}

impl ReminderBuilder {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            user_id: None,
            subject: None,
            message: String::new(),
            remind_at: None,
            repeat_interval: RepeatInterval::None,
            metadata: Map::new(),
        }
    }

    /// The user to remind.
    pub fn owner(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach the reminder to an external entity.
    pub fn about(mut self, subject: SubjectRef) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn at(mut self, remind_at: DateTime<Utc>) -> Self {
        self.remind_at = Some(remind_at);
        self
    }

    pub fn in_minutes(self, minutes: i64) -> Self {
        self.offset(Duration::try_minutes(minutes))
    }

    pub fn in_hours(self, hours: i64) -> Self {
        self.offset(Duration::try_hours(hours))
    }

    pub fn in_days(self, days: i64) -> Self {
        self.offset(Duration::try_days(days))
    }

    // Out-of-range offsets leave the schedule unset.
    fn offset(mut self, delta: Option<Duration>) -> Self {
        self.remind_at = delta.and_then(|d| self.now.checked_add_signed(d));
        self
    }

    /// Tomorrow at `hour:minute` UTC. Out-of-range times leave the schedule unset,
    /// which `build` reports.
    pub fn tomorrow(mut self, hour: u32, minute: u32) -> Self {
        let day = self.now.date_naive().succ_opt();
        self.remind_at = day
            .zip(NaiveTime::from_hms_opt(hour, minute, 0))
            .map(|(day, time)| day.and_time(time).and_utc());
        self
    }

    pub fn repeat(mut self, interval: RepeatInterval) -> Self {
        self.repeat_interval = interval;
        self
    }

    pub fn daily(self) -> Self {
        self.repeat(RepeatInterval::Daily)
    }

    pub fn weekly(self) -> Self {
        self.repeat(RepeatInterval::Weekly)
    }

    pub fn monthly(self) -> Self {
        self.repeat(RepeatInterval::Monthly)
    }

    pub fn yearly(self) -> Self {
        self.repeat(RepeatInterval::Yearly)
    }

    /// Replace the metadata bag.
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one metadata key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<NewReminder> {
        let user_id = self
            .user_id
            .ok_or_else(|| ReminderError::InvalidReminder("owner is required".to_string()))?;
        let remind_at = self.remind_at.ok_or_else(|| {
            ReminderError::InvalidReminder("a valid reminder time is required".to_string())
        })?;

        let new = NewReminder {
            user_id,
            subject: self.subject,
            message: self.message.trim().to_string(),
            remind_at,
            repeat_interval: self.repeat_interval,
            metadata: self.metadata,
        };
        new.validate()?;
        Ok(new)
    }
}

impl NewReminder {
    /// Checks applied to every insert, whether or not it went through the builder.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(ReminderError::InvalidReminder(
                "message must not be empty".to_string(),
            ));
        }
        if let Some(subject) = &self.subject {
            if subject.id.is_empty() || subject.kind.as_str().is_empty() {
                return Err(ReminderError::InvalidReminder(
                    "subject needs both a type and an id".to_string(),
                ));
            }
            // Stored as plain text, so `Other("thread")` would load back as `Thread`.
            if let SubjectKind::Other(name) = &subject.kind {
                if !matches!(name.parse::<SubjectKind>(), Ok(SubjectKind::Other(_))) {
                    return Err(ReminderError::InvalidReminder(format!(
                        "subject type '{name}' is reserved; use the named kind"
                    )));
                }
            }
        }
        ensure_storable(self.remind_at, "remind_at")?;
        Ok(())
    }
}
