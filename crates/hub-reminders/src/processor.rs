use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::{ReminderError, Result};
use crate::notify::Notifier;
use crate::store::ReminderStore;
use crate::types::Reminder;

/// One reminder that could not be fully processed in a pass.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub refid: String,
    pub code: &'static str,
    pub error: String,
}

impl ItemFailure {
    fn new(refid: &str, err: &ReminderError) -> Self {
        Self {
            refid: refid.to_string(),
            code: err.code(),
            error: err.to_string(),
        }
    }
}

/// Outcome of one processing pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessReport {
    /// Due reminders fetched and attempted.
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
}

impl ProcessReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Fires due reminders: notify the owner, then complete or reschedule.
///
/// Items are independent. A failure on one is logged with its `refid`,
/// counted, and never stops the rest of the pass. Only a failure to fetch
/// the due set propagates.
pub struct DueReminderProcessor {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl DueReminderProcessor {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Process at most `limit` due reminders. `limit <= 0` does no work.
    pub fn process(&self, limit: i64) -> Result<ProcessReport> {
        if limit <= 0 {
            return Ok(ProcessReport::default());
        }

        let due = self.store.find_due(self.clock.now(), limit)?;
        let mut report = ProcessReport {
            total: due.len(),
            ..ProcessReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        for mut reminder in due {
            match self.process_one(&mut reminder) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!(reminder_ref = %reminder.refid, code = e.code(), "reminder failed: {e}");
                    report.failures.push(ItemFailure::new(&reminder.refid, &e));
                }
            }
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed(),
            "due reminder pass finished"
        );
        Ok(report)
    }

    /// Notify, then advance. The transition runs even if the notification
    /// failed; the first error seen is what the item reports.
    fn process_one(&self, reminder: &mut Reminder) -> Result<()> {
        let owner = reminder.user_id;
        let notified = self.notifier.notify(reminder, owner);
        if let Err(ref e) = notified {
            warn!(reminder_ref = %reminder.refid, "notification failed: {e}");
        }

        let now = self.clock.now();
        if reminder.repeats() {
            reminder.reschedule_next()?;
        } else {
            reminder.complete(now)?;
        }
        self.store.save(reminder, now)?;

        notified
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rusqlite::Connection;

    use super::*;
    use crate::builder::ReminderBuilder;
    use crate::clock::ManualClock;
    use crate::store::SqliteReminderStore;
    use crate::types::{NewReminder, ReminderStatus};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap()
    }

    /// Records every notification; fails for refids in `fail_for`.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, i64)>>,
        fail_for: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, reminder: &Reminder, owner_user_id: i64) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((reminder.refid.clone(), owner_user_id));
            if self.fail_for.lock().unwrap().contains(&reminder.refid) {
                return Err(ReminderError::Notification("smtp down".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<SqliteReminderStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
        processor: DueReminderProcessor,
    }

    fn fixture() -> Fixture {
        let store =
            Arc::new(SqliteReminderStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(start()));
        let processor = DueReminderProcessor::new(store.clone(), notifier.clone(), clock.clone());
        Fixture {
            store,
            notifier,
            clock,
            processor,
        }
    }

    fn create(f: &Fixture, new: NewReminder) -> Reminder {
        f.store.insert(new, f.clock.now()).unwrap()
    }

    fn base(f: &Fixture) -> ReminderBuilder {
        ReminderBuilder::new(f.clock.now()).owner(77).message("water the plants")
    }

    #[test]
    fn one_shot_reminder_completes() {
        let f = fixture();
        let r = create(&f, base(&f).in_hours(-1).build().unwrap());

        let report = f.processor.process(100).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 0);

        let loaded = f.store.find_by_ref(&r.refid).unwrap().unwrap();
        assert_eq!(loaded.status, ReminderStatus::Completed);
        assert_eq!(loaded.completed_at, Some(start()));
        assert_eq!(*f.notifier.sent.lock().unwrap(), vec![(r.refid, 77)]);
    }

    #[test]
    fn weekly_reminder_is_rescheduled() {
        let f = fixture();
        let r = create(&f, base(&f).at(start()).weekly().build().unwrap());

        let report = f.processor.process(100).unwrap();
        assert_eq!(report.succeeded, 1);

        let loaded = f.store.find_by_ref(&r.refid).unwrap().unwrap();
        assert_eq!(loaded.status, ReminderStatus::Pending);
        assert_eq!(loaded.remind_at, start() + Duration::days(7));
        assert_eq!(loaded.snooze_count, 0);
        assert_eq!(loaded.snoozed_until, None);
        assert_eq!(loaded.completed_at, None);
        assert_eq!(f.notifier.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn snoozed_repeating_reminder_resets_snooze_state() {
        let f = fixture();
        let mut r = create(&f, base(&f).at(start()).daily().build().unwrap());
        r.snooze(start(), 15).unwrap();
        f.store.save(&mut r, start()).unwrap();

        assert!(f.processor.process(100).unwrap().is_empty());

        f.clock.advance(Duration::minutes(15));
        assert_eq!(f.processor.process(100).unwrap().succeeded, 1);
        let loaded = f.store.find_by_ref(&r.refid).unwrap().unwrap();
        assert_eq!(loaded.remind_at, start() + Duration::days(1));
        assert_eq!(loaded.status, ReminderStatus::Pending);
        assert_eq!(loaded.snooze_count, 0);
    }

    #[test]
    fn notification_failure_is_isolated() {
        let f = fixture();
        let first = create(&f, base(&f).in_minutes(-10).build().unwrap());
        let second = create(&f, base(&f).in_minutes(-5).build().unwrap());
        f.notifier.fail_for.lock().unwrap().push(first.refid.clone());

        let report = f.processor.process(100).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].refid, first.refid);
        assert_eq!(report.failures[0].code, "NOTIFICATION_FAILED");

        let second = f.store.find_by_ref(&second.refid).unwrap().unwrap();
        assert_eq!(second.status, ReminderStatus::Completed);
        // The transition is not conditioned on the notification.
        let first = f.store.find_by_ref(&first.refid).unwrap().unwrap();
        assert_eq!(first.status, ReminderStatus::Completed);
    }

    #[test]
    fn second_pass_without_clock_advance_finds_nothing() {
        let f = fixture();
        create(&f, base(&f).in_minutes(-1).build().unwrap());
        create(&f, base(&f).in_minutes(-2).daily().build().unwrap());

        assert_eq!(f.processor.process(100).unwrap().succeeded, 2);
        let again = f.processor.process(100).unwrap();
        assert!(again.is_empty());
        assert_eq!(f.notifier.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn zero_or_negative_limit_does_nothing() {
        let f = fixture();
        create(&f, base(&f).in_minutes(-1).build().unwrap());

        for limit in [0, -5] {
            let report = f.processor.process(limit).unwrap();
            assert_eq!(report.total, 0);
            assert_eq!(report.succeeded, 0);
            assert_eq!(report.failed(), 0);
        }
        assert!(f.notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn limit_bounds_one_pass() {
        let f = fixture();
        for i in 1..=3 {
            create(&f, base(&f).in_minutes(-i).build().unwrap());
        }
        assert_eq!(f.processor.process(2).unwrap().total, 2);
        assert_eq!(f.processor.process(2).unwrap().total, 1);
    }

    /// Delegates to SQLite but refuses to save the refids in `fail_for`.
    struct FlakySave {
        inner: SqliteReminderStore,
        fail_for: Mutex<Vec<String>>,
    }

    impl ReminderStore for FlakySave {
        fn insert(&self, new: NewReminder, now: DateTime<Utc>) -> Result<Reminder> {
            self.inner.insert(new, now)
        }
        fn find_by_ref(&self, refid: &str) -> Result<Option<Reminder>> {
            self.inner.find_by_ref(refid)
        }
        fn save(&self, reminder: &mut Reminder, now: DateTime<Utc>) -> Result<()> {
            if self.fail_for.lock().unwrap().contains(&reminder.refid) {
                return Err(ReminderError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    Some("database is locked".to_string()),
                )));
            }
            self.inner.save(reminder, now)
        }
        fn find_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Reminder>> {
            self.inner.find_due(now, limit)
        }
        fn upcoming_for_user(&self, user_id: i64, now: DateTime<Utc>, days: i64) -> Result<Vec<Reminder>> {
            self.inner.upcoming_for_user(user_id, now, days)
        }
        fn status_counts(&self) -> Result<HashMap<ReminderStatus, u64>> {
            self.inner.status_counts()
        }
        fn count_snoozed_at_least(&self, count: u32) -> Result<u64> {
            self.inner.count_snoozed_at_least(count)
        }
    }

    #[test]
    fn save_failure_is_isolated_and_retried_next_pass() {
        let store = Arc::new(FlakySave {
            inner: SqliteReminderStore::new(Connection::open_in_memory().unwrap()).unwrap(),
            fail_for: Mutex::new(Vec::new()),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(start()));
        let processor = DueReminderProcessor::new(store.clone(), notifier.clone(), clock.clone());

        let new = || ReminderBuilder::new(start()).owner(77).message("water the plants");
        let stuck = store.insert(new().in_minutes(-10).build().unwrap(), start()).unwrap();
        let fine = store.insert(new().in_minutes(-5).build().unwrap(), start()).unwrap();
        store.fail_for.lock().unwrap().push(stuck.refid.clone());

        let report = processor.process(100).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].refid, stuck.refid);
        assert_eq!(report.failures[0].code, "DATABASE_ERROR");

        assert_eq!(
            store.find_by_ref(&fine.refid).unwrap().unwrap().status,
            ReminderStatus::Completed
        );
        let unchanged = store.find_by_ref(&stuck.refid).unwrap().unwrap();
        assert_eq!(unchanged.status, ReminderStatus::Pending);
        assert_eq!(unchanged.completed_at, None);

        // Still due, so the next pass picks it up again.
        let due = store.find_due(clock.now(), 100).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].refid, stuck.refid);

        store.fail_for.lock().unwrap().clear();
        let retry = processor.process(100).unwrap();
        assert_eq!((retry.total, retry.succeeded, retry.failed()), (1, 1, 0));
        assert_eq!(
            store.find_by_ref(&stuck.refid).unwrap().unwrap().status,
            ReminderStatus::Completed
        );
        assert_eq!(notifier.sent.lock().unwrap().len(), 3);
    }

    /// Store whose due query always fails, to check the pass aborts.
    struct Unreachable;

    impl ReminderStore for Unreachable {
        fn insert(&self, _: NewReminder, _: DateTime<Utc>) -> Result<Reminder> {
            unreachable!()
        }
        fn find_by_ref(&self, _: &str) -> Result<Option<Reminder>> {
            unreachable!()
        }
        fn save(&self, _: &mut Reminder, _: DateTime<Utc>) -> Result<()> {
            unreachable!()
        }
        fn find_due(&self, _: DateTime<Utc>, _: i64) -> Result<Vec<Reminder>> {
            Err(ReminderError::Database(rusqlite::Error::InvalidQuery))
        }
        fn upcoming_for_user(&self, _: i64, _: DateTime<Utc>, _: i64) -> Result<Vec<Reminder>> {
            unreachable!()
        }
        fn status_counts(&self) -> Result<HashMap<ReminderStatus, u64>> {
            unreachable!()
        }
        fn count_snoozed_at_least(&self, _: u32) -> Result<u64> {
            unreachable!()
        }
    }

    #[test]
    fn due_query_failure_is_fatal() {
        let processor = DueReminderProcessor::new(
            Arc::new(Unreachable),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ManualClock::new(start())),
        );
        let err = processor.process(10).unwrap_err();
        assert_eq!(err.code(), "DATABASE_ERROR");
    }
}
