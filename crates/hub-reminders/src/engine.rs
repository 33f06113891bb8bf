use std::sync::Arc;
use std::time::Duration;

use hub_core::config::ReminderConfig;
use tokio::sync::watch;
use tracing::{error, info};

use crate::manager::ReminderManager;

/// One year. Longer periods would overflow timer deadlines.
const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Declarative registration of a recurring task: what runs and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicTask {
    pub name: &'static str,
    pub every: Duration,
}

impl PeriodicTask {
    /// The due-reminder pass, every `process_interval_minutes` (30 by default).
    pub fn due_reminders(config: &ReminderConfig) -> Self {
        Self {
            name: "remind",
            every: Duration::from_secs(
                config
                    .process_interval_minutes
                    .clamp(1, MAX_INTERVAL_MINUTES)
                    .saturating_mul(60),
            ),
        }
    }
}

/// Runs the due-reminder pass on a fixed interval.
///
/// Passes never overlap within one engine: each tick runs to completion
/// before the next is awaited, and missed ticks are skipped rather than
/// bunched up.
pub struct ReminderEngine {
    manager: Arc<ReminderManager>,
    task: PeriodicTask,
}

impl ReminderEngine {
    pub fn new(manager: Arc<ReminderManager>, task: PeriodicTask) -> Self {
        Self { manager, task }
    }

    /// Main loop. Ticks immediately, then every `task.every`, until
    /// `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(task = self.task.name, every_secs = self.task.every.as_secs(), "reminder engine started");

        let mut interval = tokio::time::interval(self.task.every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reminder engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn tick(&self) {
        match self.manager.process_due(None) {
            Ok(report) if report.failed() > 0 => {
                error!(
                    task = self.task.name,
                    failed = report.failed(),
                    succeeded = report.succeeded,
                    "pass finished with failures"
                );
            }
            Ok(_) => {}
            Err(e) => error!(task = self.task.name, "due reminder pass aborted: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cadence_is_thirty_minutes() {
        let task = PeriodicTask::due_reminders(&ReminderConfig::default());
        assert_eq!(task.name, "remind");
        assert_eq!(task.every, Duration::from_secs(30 * 60));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = ReminderConfig {
            process_interval_minutes: 0,
            ..ReminderConfig::default()
        };
        assert_eq!(PeriodicTask::due_reminders(&config).every, Duration::from_secs(60));
    }

    #[test]
    fn huge_interval_is_capped_at_a_year() {
        let config = ReminderConfig {
            process_interval_minutes: u64::MAX,
            ..ReminderConfig::default()
        };
        assert_eq!(
            PeriodicTask::due_reminders(&config).every,
            Duration::from_secs(365 * 24 * 60 * 60)
        );
    }
}
