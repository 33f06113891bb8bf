use std::sync::Arc;

use hub_core::config::UrlConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::error::{ReminderError, Result};
use crate::types::{Reminder, SubjectRef};

/// Receives one call per due reminder from the processor.
///
/// Implementations may fail; the processor records the failure and still
/// advances the reminder.
pub trait Notifier: Send + Sync {
    fn notify(&self, reminder: &Reminder, owner_user_id: i64) -> Result<()>;
}

/// Host-supplied lookup for the entity a reminder is about.
pub trait SubjectResolver: Send + Sync {
    /// Human-readable title of `subject`, if the host still knows it.
    fn title(&self, subject: &SubjectRef) -> Option<String>;
}

/// Everything a delivery channel (mail, push, chat) needs to tell a user
/// their reminder is due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderNotice {
    pub refid: String,
    pub user_id: i64,
    /// e.g. `Reminder: Review the release notes`
    pub subject_line: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_title: Option<String>,
    pub action_url: String,
}

/// Turns a [`Reminder`] into a [`ReminderNotice`].
#[derive(Clone)]
pub struct NoticeRenderer {
    base_url: String,
    reminder_pattern: String,
    resolver: Option<Arc<dyn SubjectResolver>>,
}

impl NoticeRenderer {
    pub fn new(urls: &UrlConfig) -> Self {
        Self {
            base_url: urls.base_url.trim_end_matches('/').to_string(),
            reminder_pattern: urls.reminder.clone(),
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn SubjectResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// `base_url` + the reminder pattern with `{refid}` substituted.
    pub fn action_url(&self, refid: &str) -> String {
        let path = self.reminder_pattern.replace("{refid}", refid);
        if path.starts_with("http://") || path.starts_with("https://") {
            path
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn render(&self, reminder: &Reminder, owner_user_id: i64) -> ReminderNotice {
        let resource_title = match (&self.resolver, &reminder.subject) {
            (Some(resolver), Some(subject)) => resolver.title(subject),
            _ => None,
        };
        ReminderNotice {
            refid: reminder.refid.clone(),
            user_id: owner_user_id,
            subject_line: format!("Reminder: {}", reminder.message),
            message: reminder.message.clone(),
            resource_title,
            action_url: self.action_url(&reminder.refid),
        }
    }
}

/// Forwards rendered notices to a delivery task over a bounded channel.
///
/// Uses `try_send` so a slow consumer never stalls a processing pass; a full
/// or closed channel counts as a failed notification.
pub struct ChannelNotifier {
    renderer: NoticeRenderer,
    tx: mpsc::Sender<ReminderNotice>,
}

impl ChannelNotifier {
    pub fn new(renderer: NoticeRenderer, tx: mpsc::Sender<ReminderNotice>) -> Self {
        Self { renderer, tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, reminder: &Reminder, owner_user_id: i64) -> Result<()> {
        let notice = self.renderer.render(reminder, owner_user_id);
        self.tx.try_send(notice).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ReminderError::Notification("delivery channel full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                ReminderError::Notification("delivery channel closed".to_string())
            }
        })
    }
}

/// Writes each notice to the log. Used by one-shot CLI passes where there is
/// no delivery task listening.
pub struct LogNotifier {
    renderer: NoticeRenderer,
}

impl LogNotifier {
    pub fn new(renderer: NoticeRenderer) -> Self {
        Self { renderer }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, reminder: &Reminder, owner_user_id: i64) -> Result<()> {
        let notice = self.renderer.render(reminder, owner_user_id);
        info!(
            reminder_ref = %notice.refid,
            user_id = notice.user_id,
            url = %notice.action_url,
            "{}",
            notice.subject_line
        );
        Ok(())
    }
}
