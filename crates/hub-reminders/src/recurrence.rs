use chrono::{DateTime, Duration, Months, Utc};

use crate::db::is_storable;
use crate::error::{ReminderError, Result};
use crate::types::RepeatInterval;

/// Compute the occurrence that follows `remind_at` for a repeating reminder.
///
/// Calendar steps clamp the day of month to the target month's length, so
/// Jan 31 + 1 month lands on the last day of February and Feb 29 + 1 year
/// lands on Feb 28.
///
/// Calling this with [`RepeatInterval::None`] is a programming error and
/// returns [`ReminderError::Internal`], as does stepping past year 9999.
pub fn next_occurrence(
    interval: RepeatInterval,
    remind_at: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let next = match interval {
        RepeatInterval::None => {
            return Err(ReminderError::Internal(
                "next_occurrence called for a non-repeating reminder".to_string(),
            ))
        }
        RepeatInterval::Daily => remind_at.checked_add_signed(Duration::days(1)),
        RepeatInterval::Weekly => remind_at.checked_add_signed(Duration::days(7)),
        RepeatInterval::Monthly => remind_at.checked_add_months(Months::new(1)),
        RepeatInterval::Yearly => remind_at.checked_add_months(Months::new(12)),
    };

    next.filter(|n| is_storable(*n)).ok_or_else(|| {
        ReminderError::Internal(format!(
            "{interval} recurrence overflows after {remind_at}"
        ))
    })
}
