use std::collections::HashMap;

use serde::Serialize;

use crate::types::ReminderStatus;

/// Aggregate reminder counts for operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReminderMetrics {
    pub total: u64,
    pub pending: u64,
    pub snoozed: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Completed share of all reminders, percent, one decimal.
    pub completion_rate: f64,
    /// Active reminders snoozed at least `max_snooze_count` times.
    pub over_snooze_limit: u64,
}

impl ReminderMetrics {
    pub fn from_counts(counts: &HashMap<ReminderStatus, u64>, over_snooze_limit: u64) -> Self {
        let get = |status| counts.get(&status).copied().unwrap_or(0);
        let pending = get(ReminderStatus::Pending);
        let snoozed = get(ReminderStatus::Snoozed);
        let completed = get(ReminderStatus::Completed);
        let cancelled = get(ReminderStatus::Cancelled);
        let total = pending + snoozed + completed + cancelled;

        let completion_rate = if total > 0 {
            (completed as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            total,
            pending,
            snoozed,
            completed,
            cancelled,
            completion_rate,
            over_snooze_limit,
        }
    }
}
