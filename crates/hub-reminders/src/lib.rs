//! `hub-reminders` — scheduled reminders with SQLite persistence.
//!
//! # Overview
//!
//! Reminders live in the `hub_reminder` table. A [`processor::DueReminderProcessor`]
//! pass selects every reminder whose effective trigger time has passed,
//! notifies its owner through a [`notify::Notifier`], then either completes
//! it or, for repeating reminders, moves it to the next occurrence. The
//! [`engine::ReminderEngine`] runs that pass on a fixed interval.
//!
//! # Repeat intervals
//!
//! | Interval  | Next occurrence                                      |
//! |-----------|------------------------------------------------------|
//! | `none`    | Completed after firing                               |
//! | `daily`   | `remind_at` + 1 day                                  |
//! | `weekly`  | `remind_at` + 7 days                                 |
//! | `monthly` | `remind_at` + 1 calendar month, day clamped          |
//! | `yearly`  | `remind_at` + 1 calendar year, Feb 29 to Feb 28      |

pub mod builder;
pub mod clock;
pub mod db;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod metrics;
pub mod notify;
pub mod processor;
pub mod recurrence;
pub mod store;
pub mod types;

pub use builder::ReminderBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{PeriodicTask, ReminderEngine};
pub use error::{ReminderError, Result};
pub use manager::ReminderManager;
pub use metrics::ReminderMetrics;
pub use notify::{ChannelNotifier, LogNotifier, NoticeRenderer, Notifier, ReminderNotice, SubjectResolver};
pub use processor::{DueReminderProcessor, ItemFailure, ProcessReport};
pub use store::{ReminderStore, SqliteReminderStore};
pub use types::{NewReminder, Reminder, ReminderStatus, RepeatInterval, SubjectKind, SubjectRef};
