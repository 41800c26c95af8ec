//! Roll-up of task done-ness into goal percentages, and habit progress.

use crate::evaluator::{DonePolicy, is_done, is_done_with};
use crate::model::{Goal, HabitTracking};
use crate::period::{day_bounds, expected_completions};
use serde::Serialize;
use time::OffsetDateTime;

/// Percentage of done tasks using the lifetime rule. A goal without tasks is at 0.
pub fn goal_progress(goal: &Goal) -> u8 {
    let done = goal.tasks.iter().filter(|task| is_done(task)).count();
    percent(done, goal.tasks.len())
}

pub fn goal_progress_with(goal: &Goal, policy: DonePolicy, now: OffsetDateTime) -> u8 {
    let done = goal
        .tasks
        .iter()
        .filter(|task| is_done_with(task, policy, now))
        .count();
    percent(done, goal.tasks.len())
}

/// `round(100 * part / whole)` with halves rounded up, capped at 100.
/// Zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part as u128;
    let whole = whole as u128;
    let rounded = (200 * part + whole) / (2 * whole);
    rounded.min(100) as u8
}

/// Habit completions against the count expected since `start_date`.
///
/// `percent` is clamped to 100, so a habit done more often than expected
/// still reads 100. Use `actual` and `expected` for the unclamped ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HabitProgress {
    pub expected: u32,
    pub actual: u32,
    pub percent: u8,
    pub can_complete_today: bool,
}

pub fn habit_progress(habit: &HabitTracking, now: OffsetDateTime) -> HabitProgress {
    let expected = expected_completions(&habit.frequency, habit.start_date, now);
    let actual = u32::try_from(habit.completed_dates.len()).unwrap_or(u32::MAX);

    HabitProgress {
        expected,
        actual,
        percent: percent(actual as usize, expected as usize),
        can_complete_today: habit_can_complete_today(habit, now),
    }
}

/// A habit takes at most one completion per calendar day.
pub fn habit_can_complete_today(habit: &HabitTracking, now: OffsetDateTime) -> bool {
    match day_bounds(now) {
        Some(today) => !habit
            .completed_dates
            .iter()
            .any(|entry| today.contains(entry.completed_at)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{goal_progress, goal_progress_with, habit_progress, percent};
    use crate::evaluator::DonePolicy;
    use crate::ledger::record_completion;
    use crate::model::{
        CompletionEntry, Goal, HabitFrequency, HabitTracking, Period, RecurrenceInput, Task,
    };
    use time::macros::{date, datetime};

    fn goal() -> Goal {
        Goal::new(
            "goal-1".into(),
            "get fit".into(),
            "run more".into(),
            date!(2027 - 01 - 01),
            datetime!(2026-10-01 08:00 UTC),
        )
    }

    fn once_task(id: &str) -> Task {
        let rule = RecurrenceInput {
            total_occurrences: Some(1),
            due_date: Some(date!(2026 - 12 - 31)),
            ..RecurrenceInput::default()
        }
        .build(date!(2026 - 10 - 01))
        .unwrap();
        Task::new(id.into(), id.into(), Some(rule), datetime!(2026-10-01 08:00 UTC))
    }

    #[test]
    fn empty_goal_is_at_zero() {
        assert_eq!(goal_progress(&goal()), 0);
    }

    #[test]
    fn one_of_two_done_is_fifty() {
        let mut goal = goal();
        let mut done = once_task("task-a");
        record_completion(&mut done, datetime!(2026-10-19 09:00 UTC));
        goal.tasks.push(done);
        goal.tasks.push(once_task("task-b"));

        assert_eq!(goal_progress(&goal), 50);
    }

    #[test]
    fn progress_is_monotonic_and_reaches_hundred() {
        let mut goal = goal();
        for id in ["task-a", "task-b", "task-c"] {
            goal.tasks.push(once_task(id));
        }

        let mut previous = goal_progress(&goal);
        assert_eq!(previous, 0);
        for index in 0..goal.tasks.len() {
            record_completion(&mut goal.tasks[index], datetime!(2026-10-19 09:00 UTC));
            let current = goal_progress(&goal);
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 100);
    }

    #[test]
    fn plain_tasks_count_by_flag() {
        let mut goal = goal();
        let mut flagged = Task::new(
            "task-a".into(),
            "plan".into(),
            None,
            datetime!(2026-10-01 08:00 UTC),
        );
        flagged.legacy_completed = true;
        goal.tasks.push(flagged);
        goal.tasks.push(once_task("task-b"));
        goal.tasks.push(once_task("task-c"));

        // 1/3 = 33.3
        assert_eq!(goal_progress(&goal), 33);
    }

    #[test]
    fn policy_changes_periodic_rollup() {
        let mut goal = goal();
        let rule = RecurrenceInput {
            period: Some(Period::Daily),
            times_per_period: Some(1),
            total_occurrences: None,
            due_date: Some(date!(2026 - 12 - 31)),
        }
        .build(date!(2026 - 10 - 01))
        .unwrap();
        let mut daily = Task::new(
            "task-a".into(),
            "walk".into(),
            Some(rule),
            datetime!(2026-10-01 08:00 UTC),
        );
        record_completion(&mut daily, datetime!(2026-10-18 09:00 UTC));
        goal.tasks.push(daily);

        let now = datetime!(2026-10-19 09:00 UTC);
        assert_eq!(goal_progress_with(&goal, DonePolicy::Lifetime, now), 100);
        assert_eq!(goal_progress_with(&goal, DonePolicy::CurrentPeriod, now), 0);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(9, 4), 100);
    }

    #[test]
    fn daily_habit_progress_scenario() {
        let now = datetime!(2026-10-19 20:00 UTC);
        let mut habit = HabitTracking::new(HabitFrequency::Daily, datetime!(2026-10-15 08:00 UTC));
        habit.completed_dates.push(CompletionEntry {
            completed_at: datetime!(2026-10-15 09:00 UTC),
        });
        habit.completed_dates.push(CompletionEntry {
            completed_at: datetime!(2026-10-17 09:00 UTC),
        });

        let progress = habit_progress(&habit, now);
        assert_eq!(progress.expected, 5);
        assert_eq!(progress.actual, 2);
        assert_eq!(progress.percent, 40);
        assert!(progress.can_complete_today);

        habit.completed_dates.push(CompletionEntry {
            completed_at: datetime!(2026-10-19 07:00 UTC),
        });
        assert!(!habit_progress(&habit, now).can_complete_today);
    }

    #[test]
    fn habit_with_future_start_reports_zero() {
        let habit = HabitTracking::new(HabitFrequency::Weekly, datetime!(2026-11-01 08:00 UTC));
        let progress = habit_progress(&habit, datetime!(2026-10-19 08:00 UTC));
        assert_eq!(progress.expected, 0);
        assert_eq!(progress.percent, 0);
    }

    #[test]
    fn habit_done_more_than_expected_reads_hundred() {
        let mut habit = HabitTracking::new(HabitFrequency::Weekly, datetime!(2026-10-15 08:00 UTC));
        for day in [15, 16, 17] {
            habit.completed_dates.push(CompletionEntry {
                completed_at: datetime!(2026-10-15 09:00 UTC).replace_day(day).unwrap(),
            });
        }

        let progress = habit_progress(&habit, datetime!(2026-10-19 20:00 UTC));
        assert_eq!(progress.expected, 1);
        assert_eq!(progress.actual, 3);
        assert_eq!(progress.percent, 100);
    }
}
