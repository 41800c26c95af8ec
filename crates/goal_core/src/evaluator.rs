//! Done-ness and eligibility rules for a single task.

use crate::error::AppError;
use crate::model::{RecurrenceKind, Task};
use crate::period::{current_period_bounds, day_bounds};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Which count a periodic task's target is compared against when deciding
/// whether it counts as done for goal progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonePolicy {
    /// Lifetime `completed_count` against the per-period target. Once a
    /// periodic task has reached its target once it stays done.
    #[default]
    Lifetime,
    /// Completions inside the current period against the per-period target.
    /// The task drops back to not done when a new period begins.
    CurrentPeriod,
}

impl DonePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DonePolicy::Lifetime => "lifetime",
            DonePolicy::CurrentPeriod => "current_period",
        }
    }
}

impl FromStr for DonePolicy {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lifetime" => Ok(DonePolicy::Lifetime),
            "current_period" | "period" => Ok(DonePolicy::CurrentPeriod),
            other => Err(AppError::invalid_input(format!(
                "unknown done policy '{other}'"
            ))),
        }
    }
}

/// Lifetime done-ness used for goal progress.
pub fn is_done(task: &Task) -> bool {
    match task.recurrence.map(|rule| rule.kind) {
        None => task.legacy_completed,
        Some(RecurrenceKind::TotalCount { total_occurrences }) => {
            task.completed_count >= total_occurrences.get()
        }
        Some(RecurrenceKind::Periodic {
            times_per_period, ..
        }) => task.completed_count >= times_per_period.get(),
    }
}

pub fn is_done_with(task: &Task, policy: DonePolicy, now: OffsetDateTime) -> bool {
    match (policy, task.recurrence.map(|rule| rule.kind)) {
        (
            DonePolicy::CurrentPeriod,
            Some(RecurrenceKind::Periodic {
                times_per_period, ..
            }),
        ) => completions_in_current_period(task, now) >= times_per_period.get(),
        _ => is_done(task),
    }
}

/// Ledger entries inside the period containing `now`. Periods without a
/// window (semiannual, annual) report the lifetime count; tasks without a
/// periodic rule report 0.
pub fn completions_in_current_period(task: &Task, now: OffsetDateTime) -> u32 {
    let Some(period) = task.recurrence.and_then(|rule| rule.period()) else {
        return 0;
    };

    match current_period_bounds(period, now) {
        Some(bounds) => count_within(task, |instant| bounds.contains(instant)),
        None => task.completed_count,
    }
}

pub fn completions_today(task: &Task, now: OffsetDateTime) -> u32 {
    match day_bounds(now) {
        Some(bounds) => count_within(task, |instant| bounds.contains(instant)),
        None => 0,
    }
}

/// Whether one more completion may be recorded at `now` without exceeding
/// the task's quota. Independent of `legacy_completed`.
pub fn can_complete_today(task: &Task, now: OffsetDateTime) -> bool {
    match task.recurrence.map(|rule| rule.kind) {
        None => task.completed_count < 1,
        Some(RecurrenceKind::TotalCount { total_occurrences }) => {
            task.completed_count < total_occurrences.get()
        }
        Some(RecurrenceKind::Periodic {
            times_per_period, ..
        }) => completions_in_current_period(task, now) < times_per_period.get(),
    }
}

/// Flip the done flag of a non-recurring task and return the new value.
/// Recurring tasks are left untouched and yield `None`.
pub fn toggle_legacy(task: &mut Task) -> Option<bool> {
    if task.is_recurring() {
        return None;
    }
    task.legacy_completed = !task.legacy_completed;
    Some(task.legacy_completed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub done: bool,
    pub eligible: bool,
    pub in_period: u32,
    pub target: u32,
    pub completions_today: u32,
    pub label: String,
}

pub fn task_progress(task: &Task, now: OffsetDateTime, policy: DonePolicy) -> TaskProgress {
    let (in_period, target, label) = match task.recurrence {
        Some(rule) => match rule.period() {
            Some(period) => {
                let in_period = completions_in_current_period(task, now);
                (
                    in_period,
                    rule.target(),
                    format!("{}/{} {}", in_period, rule.target(), period),
                )
            }
            None => (
                task.completed_count,
                rule.target(),
                format!("{}/{} total", task.completed_count, rule.target()),
            ),
        },
        None => (
            task.completed_count,
            1,
            format!("{}/1 total", task.completed_count),
        ),
    };

    TaskProgress {
        done: is_done_with(task, policy, now),
        eligible: can_complete_today(task, now),
        in_period,
        target,
        completions_today: completions_today(task, now),
        label,
    }
}

fn count_within(task: &Task, within: impl Fn(OffsetDateTime) -> bool) -> u32 {
    let count = task
        .completion_ledger
        .iter()
        .filter(|entry| within(entry.completed_at))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
