//! Status transitions for [`Reminder`].
//!
//! | From      | complete  | snooze  | cancel    | reschedule_next (repeats) |
//! |-----------|-----------|---------|-----------|---------------------------|
//! | pending   | completed | snoozed | cancelled | pending, new `remind_at`  |
//! | snoozed   | completed | snoozed | cancelled | pending, new `remind_at`  |
//! | completed | illegal   | illegal | illegal   | illegal                   |
//! | cancelled | illegal   | illegal | illegal   | illegal                   |
//!
//! Transitions only touch the in-memory record; persisting it is the store's
//! job. An illegal transition returns an error and leaves the record as it was.

use chrono::{DateTime, Duration, Utc};

use crate::db::ensure_storable;
use crate::error::{ReminderError, Result};
use crate::recurrence::next_occurrence;
use crate::types::{Reminder, ReminderStatus};

impl Reminder {
    fn ensure_active(&self, op: &'static str) -> Result<()> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(ReminderError::IllegalTransition {
                op,
                from: self.status,
            })
        }
    }

    /// Mark the reminder done.
    ///
    /// `snoozed_until` is cleared so it stays set only while snoozed;
    /// `snooze_count` is kept as history.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active("complete")?;
        self.status = ReminderStatus::Completed;
        self.completed_at = Some(now);
        self.snoozed_until = None;
        Ok(())
    }

    /// Push the reminder back by `minutes` from `now`.
    ///
    /// A second snooze replaces the first offset rather than adding to it.
    /// There is no cap on how often a reminder may be snoozed.
    pub fn snooze(&mut self, now: DateTime<Utc>, minutes: i64) -> Result<()> {
        self.ensure_active("snooze")?;
        let until = Duration::try_minutes(minutes)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                ReminderError::InvalidReminder(format!("snooze of {minutes} minutes overflows"))
            })?;
        ensure_storable(until, "snoozed_until")?;
        self.status = ReminderStatus::Snoozed;
        self.snoozed_until = Some(until);
        self.snooze_count = self.snooze_count.saturating_add(1);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_active("cancel")?;
        self.status = ReminderStatus::Cancelled;
        self.snoozed_until = None;
        Ok(())
    }

    /// Advance a repeating reminder to its next occurrence.
    ///
    /// The next date is computed from the current `remind_at`, not from `now`
    /// or `snoozed_until`. Returns `Ok(false)` without touching anything when
    /// the reminder does not repeat.
    pub fn reschedule_next(&mut self) -> Result<bool> {
        if !self.repeats() {
            return Ok(false);
        }
        self.ensure_active("reschedule")?;
        self.remind_at = next_occurrence(self.repeat_interval, self.remind_at)?;
        self.status = ReminderStatus::Pending;
        self.snoozed_until = None;
        self.snooze_count = 0;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::Map;

    use super::*;
    use crate::types::RepeatInterval;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap()
    }

    fn reminder(repeat: RepeatInterval) -> Reminder {
        Reminder {
            id: 1,
            refid: "r1".to_string(),
            user_id: 42,
            subject: None,
            message: "pay rent".to_string(),
            remind_at: now(),
            repeat_interval: repeat,
            status: ReminderStatus::Pending,
            completed_at: None,
            snoozed_until: None,
            snooze_count: 0,
            metadata: Map::new(),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn complete_sets_completed_at() {
        let mut r = reminder(RepeatInterval::None);
        r.complete(now()).unwrap();
        assert_eq!(r.status, ReminderStatus::Completed);
        assert_eq!(r.completed_at, Some(now()));
    }

    #[test]
    fn complete_from_snoozed_clears_snooze_but_keeps_count() {
        let mut r = reminder(RepeatInterval::None);
        r.snooze(now(), 15).unwrap();
        r.complete(now()).unwrap();
        assert_eq!(r.snoozed_until, None);
        assert_eq!(r.snooze_count, 1);
    }

    #[test]
    fn second_snooze_overwrites_offset() {
        let mut r = reminder(RepeatInterval::None);
        r.snooze(now(), 15).unwrap();
        let later = now() + Duration::minutes(5);
        r.snooze(later, 15).unwrap();
        assert_eq!(r.status, ReminderStatus::Snoozed);
        assert_eq!(r.snooze_count, 2);
        assert_eq!(r.snoozed_until, Some(later + Duration::minutes(15)));
    }

    #[test]
    fn snooze_past_year_9999_is_rejected_and_leaves_record() {
        let mut r = reminder(RepeatInterval::None);
        let before = r.clone();
        let err = r.snooze(now(), 5_000_000_000).unwrap_err();
        assert_eq!(err.code(), "INVALID_REMINDER");
        assert_eq!(r, before);
    }

    #[test]
    fn snooze_has_no_cap() {
        let mut r = reminder(RepeatInterval::None);
        for _ in 0..20 {
            r.snooze(now(), 1).unwrap();
        }
        assert_eq!(r.snooze_count, 20);
        assert!(r.snooze_limit_reached(5));
    }

    #[test]
    fn cancel_is_terminal() {
        let mut r = reminder(RepeatInterval::Daily);
        r.cancel().unwrap();
        assert_eq!(r.status, ReminderStatus::Cancelled);

        let before = r.clone();
        assert!(matches!(
            r.complete(now()),
            Err(ReminderError::IllegalTransition { op: "complete", .. })
        ));
        assert!(r.snooze(now(), 15).is_err());
        assert!(r.cancel().is_err());
        assert!(r.reschedule_next().is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn completed_cannot_be_snoozed() {
        let mut r = reminder(RepeatInterval::None);
        r.complete(now()).unwrap();
        let err = r.snooze(now(), 15).unwrap_err();
        assert_eq!(err.to_string(), "Cannot snooze a completed reminder");
    }

    #[test]
    fn reschedule_without_repeat_is_noop() {
        let mut r = reminder(RepeatInterval::None);
        let before = r.clone();
        assert!(!r.reschedule_next().unwrap());
        assert_eq!(r, before);
    }

    #[test]
    fn reschedule_monthly_from_jan_31() {
        let mut r = reminder(RepeatInterval::Monthly);
        r.snooze(now(), 30).unwrap();
        r.snooze(now(), 30).unwrap();

        assert!(r.reschedule_next().unwrap());
        assert_eq!(r.remind_at, Utc.with_ymd_and_hms(2026, 2, 28, 8, 0, 0).unwrap());
        assert_eq!(r.status, ReminderStatus::Pending);
        assert_eq!(r.snoozed_until, None);
        assert_eq!(r.snooze_count, 0);
    }

    #[test]
    fn reschedule_uses_remind_at_not_snooze_time() {
        let mut r = reminder(RepeatInterval::Weekly);
        r.snooze(now() + Duration::days(3), 60).unwrap();
        r.reschedule_next().unwrap();
        assert_eq!(r.remind_at, now() + Duration::days(7));
    }
}
