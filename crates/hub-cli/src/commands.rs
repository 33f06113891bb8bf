use std::sync::Arc;

use hub_core::config::ReminderConfig;
use hub_reminders::{
    PeriodicTask, Reminder, ReminderEngine, ReminderManager, ReminderNotice, SubjectRef,
};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::AddArgs;

/// `hub remind`: one pass. Per-item failures are reported, not fatal.
pub fn remind(manager: &ReminderManager, limit: Option<i64>, json: bool) -> anyhow::Result<()> {
    let report = manager.process_due(limit)?;
    if json {
        return print_json(&report);
    }

    for failure in &report.failures {
        println!("  FAILED {} [{}] {}", failure.refid, failure.code, failure.error);
    }
    println!(
        "Processed {} reminder(s): {} succeeded, {} failed",
        report.total,
        report.succeeded,
        report.failed()
    );
    Ok(())
}

/// `hub run`: periodic engine plus a delivery task until ctrl-c.
pub async fn run(
    manager: Arc<ReminderManager>,
    config: &ReminderConfig,
    mut notices: mpsc::Receiver<ReminderNotice>,
) -> anyhow::Result<()> {
    let delivery = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            info!(
                reminder_ref = %notice.refid,
                user_id = notice.user_id,
                url = %notice.action_url,
                title = notice.resource_title.as_deref().unwrap_or(""),
                "{}",
                notice.subject_line
            );
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = ReminderEngine::new(manager, PeriodicTask::due_reminders(config));
    let engine_handle = tokio::spawn(engine.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("ctrl-c received, stopping");
    let _ = shutdown_tx.send(true);
    engine_handle.await?;
    // engine dropped -> notifier sender dropped -> delivery drains and exits
    delivery.await?;
    Ok(())
}

pub fn add(manager: &ReminderManager, args: AddArgs, json: bool) -> anyhow::Result<()> {
    let mut builder = manager
        .builder()
        .owner(args.user)
        .message(args.message)
        .repeat(args.repeat);
    if let Some(at) = args.at {
        builder = builder.at(at);
    }
    if let Some(minutes) = args.in_minutes {
        builder = builder.in_minutes(minutes);
    }
    if let (Some(kind), Some(id)) = (args.subject_kind, args.subject_id) {
        builder = builder.about(SubjectRef::new(kind, id));
    }

    let reminder = manager.create(builder.build()?)?;
    print_reminder(&reminder, json)
}

pub fn show(manager: &ReminderManager, refid: &str, json: bool) -> anyhow::Result<()> {
    print_reminder(&manager.find(refid)?, json)
}

pub fn snooze(
    manager: &ReminderManager,
    refid: &str,
    minutes: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    print_reminder(&manager.snooze(refid, minutes)?, json)
}

pub fn cancel(manager: &ReminderManager, refid: &str, json: bool) -> anyhow::Result<()> {
    print_reminder(&manager.cancel(refid)?, json)
}

pub fn complete(manager: &ReminderManager, refid: &str, json: bool) -> anyhow::Result<()> {
    print_reminder(&manager.complete(refid)?, json)
}

pub fn upcoming(
    manager: &ReminderManager,
    user_id: i64,
    days: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let reminders = manager.upcoming(user_id, days)?;
    if json {
        return print_json(&reminders);
    }
    if reminders.is_empty() {
        println!("No upcoming reminders.");
    }
    for r in &reminders {
        println!("{}", summary_line(r));
    }
    Ok(())
}

pub fn metrics(manager: &ReminderManager, json: bool) -> anyhow::Result<()> {
    let m = manager.metrics()?;
    if json {
        return print_json(&m);
    }
    println!("total:            {}", m.total);
    println!("pending:          {}", m.pending);
    println!("snoozed:          {}", m.snoozed);
    println!("completed:        {}", m.completed);
    println!("cancelled:        {}", m.cancelled);
    println!("completion rate:  {:.1}%", m.completion_rate);
    println!("over snooze cap:  {}", m.over_snooze_limit);
    Ok(())
}

fn print_reminder(r: &Reminder, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(r);
    }
    println!("{}", summary_line(r));
    if let Some(subject) = &r.subject {
        println!("  about:   {}:{}", subject.kind, subject.id);
    }
    if let Some(until) = r.snoozed_until {
        println!("  snoozed: until {} ({}x)", until.to_rfc3339(), r.snooze_count);
    }
    if let Some(done) = r.completed_at {
        println!("  done:    {}", done.to_rfc3339());
    }
    Ok(())
}

fn summary_line(r: &Reminder) -> String {
    format!(
        "{}  {:<9}  {}  {:<7}  {}",
        r.refid,
        r.status.as_str(),
        r.remind_at.format("%Y-%m-%d %H:%M UTC"),
        r.repeat_interval.as_str(),
        r.message
    )
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
