use std::sync::Arc;

use hub_core::config::ReminderConfig;
use tracing::{info, instrument, warn};

use crate::builder::ReminderBuilder;
use crate::clock::Clock;
use crate::error::{ReminderError, Result};
use crate::metrics::ReminderMetrics;
use crate::notify::Notifier;
use crate::processor::{DueReminderProcessor, ProcessReport};
use crate::store::ReminderStore;
use crate::types::{NewReminder, Reminder};

/// Caller-facing reminder operations, all keyed by `refid`.
///
/// Snooze, cancel and complete check the current status before touching the
/// record; an illegal transition comes back as
/// [`ReminderError::IllegalTransition`] and nothing is written.
pub struct ReminderManager {
    store: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
    processor: DueReminderProcessor,
}

impl ReminderManager {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        let processor = DueReminderProcessor::new(store.clone(), notifier, clock.clone());
        Self {
            store,
            clock,
            config,
            processor,
        }
    }

    /// Start a builder anchored to the manager's clock.
    pub fn builder(&self) -> ReminderBuilder {
        ReminderBuilder::new(self.clock.now())
    }

    pub fn create(&self, new: NewReminder) -> Result<Reminder> {
        self.store.insert(new, self.clock.now())
    }

    pub fn find(&self, refid: &str) -> Result<Reminder> {
        self.store
            .find_by_ref(refid)?
            .ok_or_else(|| ReminderError::NotFound {
                refid: refid.to_string(),
            })
    }

    /// Snooze for `minutes`, or the configured default.
    ///
    /// Going past `max_snooze_count` is logged, not refused.
    #[instrument(skip(self))]
    pub fn snooze(&self, refid: &str, minutes: Option<i64>) -> Result<Reminder> {
        let minutes = minutes.unwrap_or(self.config.default_snooze_minutes);
        let now = self.clock.now();
        let mut reminder = self.find(refid)?;
        reminder.snooze(now, minutes)?;
        self.store.save(&mut reminder, now)?;

        if reminder.snooze_limit_reached(self.config.max_snooze_count) {
            warn!(
                reminder_ref = %reminder.refid,
                snooze_count = reminder.snooze_count,
                max = self.config.max_snooze_count,
                "reminder snoozed past the advisory limit"
            );
        }
        Ok(reminder)
    }

    #[instrument(skip(self))]
    pub fn cancel(&self, refid: &str) -> Result<Reminder> {
        let mut reminder = self.find(refid)?;
        reminder.cancel()?;
        self.store.save(&mut reminder, self.clock.now())?;
        info!(reminder_ref = %reminder.refid, "reminder cancelled");
        Ok(reminder)
    }

    /// Mark done by hand. Unlike a processing pass this never reschedules,
    /// even for repeating reminders.
    #[instrument(skip(self))]
    pub fn complete(&self, refid: &str) -> Result<Reminder> {
        let now = self.clock.now();
        let mut reminder = self.find(refid)?;
        reminder.complete(now)?;
        self.store.save(&mut reminder, now)?;
        info!(reminder_ref = %reminder.refid, "reminder completed");
        Ok(reminder)
    }

    /// Pending reminders for `user_id` due within `days` (default from config).
    pub fn upcoming(&self, user_id: i64, days: Option<i64>) -> Result<Vec<Reminder>> {
        let days = days.unwrap_or(self.config.upcoming_days);
        self.store
            .upcoming_for_user(user_id, self.clock.now(), days)
    }

    pub fn metrics(&self) -> Result<ReminderMetrics> {
        let counts = self.store.status_counts()?;
        let over = self
            .store
            .count_snoozed_at_least(self.config.max_snooze_count)?;
        Ok(ReminderMetrics::from_counts(&counts, over))
    }

    /// Run one due-reminder pass, bounded by `limit` or the configured batch size.
    pub fn process_due(&self, limit: Option<i64>) -> Result<ProcessReport> {
        self.processor
            .process(limit.unwrap_or(self.config.batch_limit))
    }
}
