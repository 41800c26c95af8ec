use crate::analysis::{Analysis, AnalysisRequest, GoalAnalyzer, analyze_with_fallback};
use crate::book::{GoalBook, GoalUpdate, TaskDraft, TaskUpdate};
use crate::error::AppError;
use crate::evaluator::{DonePolicy, TaskProgress, task_progress};
use crate::model::{Goal, HabitFrequency};
use crate::progress::{HabitProgress, habit_progress};
use crate::storage::{GoalStore, JsonGoalStore};
use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

/// A goal with the derived state of its tasks and habit at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct GoalReport {
    pub goal: Goal,
    /// Same order as `goal.tasks`.
    pub task_progress: Vec<TaskProgress>,
    pub habit_progress: Option<HabitProgress>,
}

pub fn goal_report(goal: Goal, policy: DonePolicy, now: OffsetDateTime) -> GoalReport {
    let task_progress = goal
        .tasks
        .iter()
        .map(|task| task_progress(task, now, policy))
        .collect();
    let habit_progress = goal.habit.as_ref().map(|habit| habit_progress(habit, now));
    GoalReport {
        goal,
        task_progress,
        habit_progress,
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

fn default_store() -> Result<JsonGoalStore, AppError> {
    JsonGoalStore::from_env()
}

pub fn list_goals(policy: DonePolicy) -> Result<Vec<Goal>, AppError> {
    list_goals_with_store(&default_store()?, policy)
}

pub fn show_goal(policy: DonePolicy, id: &str) -> Result<GoalReport, AppError> {
    show_goal_with_store(&default_store()?, policy, id)
}

pub fn add_goal(
    policy: DonePolicy,
    title: &str,
    description: &str,
    deadline: Date,
) -> Result<Goal, AppError> {
    add_goal_with_store(&default_store()?, policy, title, description, deadline)
}

pub fn update_goal(policy: DonePolicy, id: &str, update: GoalUpdate) -> Result<Goal, AppError> {
    update_goal_with_store(&default_store()?, policy, id, update)
}

pub fn delete_goal(policy: DonePolicy, id: &str) -> Result<Goal, AppError> {
    delete_goal_with_store(&default_store()?, policy, id)
}

pub fn add_task(
    policy: DonePolicy,
    goal_id: &str,
    draft: TaskDraft,
) -> Result<TaskUpdate, AppError> {
    add_task_with_store(&default_store()?, policy, goal_id, draft)
}

pub fn remove_task(
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    remove_task_with_store(&default_store()?, policy, goal_id, task_id)
}

pub fn complete_task(
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    complete_task_with_store(&default_store()?, policy, goal_id, task_id)
}

pub fn uncomplete_task(
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    uncomplete_task_with_store(&default_store()?, policy, goal_id, task_id)
}

pub fn toggle_task(
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    toggle_task_with_store(&default_store()?, policy, goal_id, task_id)
}

pub fn set_habit(
    policy: DonePolicy,
    goal_id: &str,
    frequency: HabitFrequency,
) -> Result<Goal, AppError> {
    set_habit_with_store(&default_store()?, policy, goal_id, frequency)
}

pub fn clear_habit(policy: DonePolicy, goal_id: &str) -> Result<Goal, AppError> {
    clear_habit_with_store(&default_store()?, policy, goal_id)
}

pub fn complete_habit(policy: DonePolicy, goal_id: &str) -> Result<Goal, AppError> {
    complete_habit_with_store(&default_store()?, policy, goal_id)
}

pub fn analyze_goal(
    policy: DonePolicy,
    goal_id: &str,
    analyzer: &dyn GoalAnalyzer,
) -> Result<(Goal, Analysis), AppError> {
    analyze_goal_with_store(&default_store()?, policy, goal_id, analyzer)
}

pub fn record_analysis(
    policy: DonePolicy,
    goal_id: &str,
    analysis: &Analysis,
) -> Result<Goal, AppError> {
    record_analysis_with_store(&default_store()?, policy, goal_id, analysis)
}

fn load_book(
    store: &dyn GoalStore,
    policy: DonePolicy,
    now: OffsetDateTime,
) -> Result<GoalBook, AppError> {
    Ok(GoalBook::new(store.load_goals()?, policy, now))
}

pub fn list_goals_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
) -> Result<Vec<Goal>, AppError> {
    Ok(load_book(store, policy, local_now())?.into_goals())
}

pub fn show_goal_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    id: &str,
) -> Result<GoalReport, AppError> {
    let now = local_now();
    let book = load_book(store, policy, now)?;
    let goal = book.goal(id)?.clone();
    Ok(goal_report(goal, policy, now))
}

pub fn add_goal_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    title: &str,
    description: &str,
    deadline: Date,
) -> Result<Goal, AppError> {
    let now = local_now();
    let mut book = load_book(store, policy, now)?;
    let goal = book.add_goal(title, description, deadline, now)?;
    store.save_goal(&goal)?;
    Ok(goal)
}

pub fn update_goal_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    id: &str,
    update: GoalUpdate,
) -> Result<Goal, AppError> {
    let now = local_now();
    let mut book = load_book(store, policy, now)?;
    let goal = book.update_goal(id, update, now)?;
    store.save_goal(&goal)?;
    Ok(goal)
}

pub fn delete_goal_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    id: &str,
) -> Result<Goal, AppError> {
    let mut book = load_book(store, policy, local_now())?;
    let goal = book.remove_goal(id)?;
    store.delete_goal(&goal.id)?;
    Ok(goal)
}

fn apply_task_change(
    store: &dyn GoalStore,
    policy: DonePolicy,
    change: impl FnOnce(&mut GoalBook, OffsetDateTime) -> Result<TaskUpdate, AppError>,
) -> Result<TaskUpdate, AppError> {
    let now = local_now();
    let mut book = load_book(store, policy, now)?;
    let update = change(&mut book, now)?;
    store.save_goal(&update.goal)?;
    Ok(update)
}

fn apply_goal_change(
    store: &dyn GoalStore,
    policy: DonePolicy,
    change: impl FnOnce(&mut GoalBook, OffsetDateTime) -> Result<Goal, AppError>,
) -> Result<Goal, AppError> {
    let now = local_now();
    let mut book = load_book(store, policy, now)?;
    let goal = change(&mut book, now)?;
    store.save_goal(&goal)?;
    Ok(goal)
}

pub fn add_task_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    draft: TaskDraft,
) -> Result<TaskUpdate, AppError> {
    apply_task_change(store, policy, |book, now| book.add_task(goal_id, draft, now))
}

pub fn remove_task_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    apply_task_change(store, policy, |book, now| {
        book.remove_task(goal_id, task_id, now)
    })
}

pub fn complete_task_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    apply_task_change(store, policy, |book, now| {
        book.complete_task(goal_id, task_id, now)
    })
}

pub fn uncomplete_task_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    apply_task_change(store, policy, |book, now| {
        book.uncomplete_task(goal_id, task_id, now)
    })
}

pub fn toggle_task_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    task_id: &str,
) -> Result<TaskUpdate, AppError> {
    apply_task_change(store, policy, |book, now| {
        book.toggle_task(goal_id, task_id, now)
    })
}

pub fn set_habit_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    frequency: HabitFrequency,
) -> Result<Goal, AppError> {
    apply_goal_change(store, policy, |book, now| {
        book.set_habit(goal_id, frequency, now)
    })
}

pub fn clear_habit_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
) -> Result<Goal, AppError> {
    apply_goal_change(store, policy, |book, now| book.clear_habit(goal_id, now))
}

pub fn complete_habit_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
) -> Result<Goal, AppError> {
    apply_goal_change(store, policy, |book, now| book.complete_habit(goal_id, now))
}

/// Score the goal synchronously and store the score. Analyzer failures are
/// absorbed into the fallback analysis; store failures are not.
pub fn analyze_goal_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    analyzer: &dyn GoalAnalyzer,
) -> Result<(Goal, Analysis), AppError> {
    let now = local_now();
    let mut book = load_book(store, policy, now)?;
    let request = AnalysisRequest::from_goal(book.goal(goal_id)?);
    let analysis = analyze_with_fallback(analyzer, &request);
    let goal = book.record_analysis(goal_id, &analysis, now)?;
    store.save_goal(&goal)?;
    Ok((goal, analysis))
}

pub fn record_analysis_with_store(
    store: &dyn GoalStore,
    policy: DonePolicy,
    goal_id: &str,
    analysis: &Analysis,
) -> Result<Goal, AppError> {
    apply_goal_change(store, policy, |book, now| {
        book.record_analysis(goal_id, analysis, now)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FALLBACK_SUGGESTION, INCOMPLETE_SUGGESTION, OfflineAnalyzer};
    use crate::model::{Period, RecurrenceInput};
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::date;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("goaltrack-{nanos}-{file_name}"))
    }

    /// In-memory store that remembers which ids were written.
    #[derive(Default)]
    struct RecordingStore {
        goals: RefCell<Vec<Goal>>,
        saved: RefCell<Vec<String>>,
    }

    impl GoalStore for RecordingStore {
        fn load_goals(&self) -> Result<Vec<Goal>, AppError> {
            Ok(self.goals.borrow().clone())
        }

        fn save_goal(&self, goal: &Goal) -> Result<(), AppError> {
            self.saved.borrow_mut().push(goal.id.clone());
            let mut goals = self.goals.borrow_mut();
            match goals.iter_mut().find(|stored| stored.id == goal.id) {
                Some(stored) => *stored = goal.clone(),
                None => goals.push(goal.clone()),
            }
            Ok(())
        }

        fn delete_goal(&self, id: &str) -> Result<(), AppError> {
            self.goals.borrow_mut().retain(|goal| goal.id != id);
            Ok(())
        }
    }

    const FAR: Date = date!(2099 - 12 - 31);

    fn weekly_draft(title: &str, times: u32) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            recurrence: RecurrenceInput {
                period: Some(Period::Weekly),
                times_per_period: Some(times),
                total_occurrences: None,
                due_date: Some(FAR),
            },
        }
    }

    #[test]
    fn every_mutation_saves_the_touched_goal() {
        let store = RecordingStore::default();
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Swim", "laps", FAR).unwrap();
        let draft = weekly_draft("pool", 2);
        let task = add_task_with_store(&store, DonePolicy::Lifetime, &goal.id, draft)
            .unwrap()
            .task;
        complete_task_with_store(&store, DonePolicy::Lifetime, &goal.id, &task.id).unwrap();

        assert_eq!(store.saved.borrow().len(), 3);
        let stored = &store.goals.borrow()[0];
        assert_eq!(stored.tasks[0].completed_count, 1);
        assert_eq!(stored.progress, 0);
    }

    #[test]
    fn failed_mutation_saves_nothing() {
        let store = RecordingStore::default();
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Swim", "laps", FAR).unwrap();
        let draft = weekly_draft("pool", 1);
        let task = add_task_with_store(&store, DonePolicy::Lifetime, &goal.id, draft)
            .unwrap()
            .task;
        complete_task_with_store(&store, DonePolicy::Lifetime, &goal.id, &task.id).unwrap();
        let saved_before = store.saved.borrow().len();

        let err =
            complete_task_with_store(&store, DonePolicy::Lifetime, &goal.id, &task.id).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(store.saved.borrow().len(), saved_before);
    }

    #[test]
    fn json_store_round_trip_through_api() {
        let path = temp_path("api.json");
        let store = JsonGoalStore::new(&path);
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Read", "books", FAR).unwrap();
        let plain = add_task_with_store(
            &store,
            DonePolicy::Lifetime,
            &goal.id,
            TaskDraft {
                title: "buy a book".into(),
                ..TaskDraft::default()
            },
        )
        .unwrap()
        .task;
        let update =
            toggle_task_with_store(&store, DonePolicy::Lifetime, &goal.id, &plain.id).unwrap();
        assert_eq!(update.goal.progress, 100);

        let report = show_goal_with_store(&store, DonePolicy::Lifetime, &goal.id).unwrap();
        fs::remove_file(&path).ok();

        assert!(report.goal.tasks[0].legacy_completed);
        assert_eq!(report.task_progress.len(), 1);
        assert_eq!(report.task_progress[0].label, "0/1 total");
        assert!(report.habit_progress.is_none());
    }

    #[test]
    fn delete_goal_removes_from_store() {
        let store = RecordingStore::default();
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Swim", "", FAR).unwrap();

        let removed = delete_goal_with_store(&store, DonePolicy::Lifetime, &goal.id).unwrap();
        assert_eq!(removed.id, goal.id);
        assert!(list_goals_with_store(&store, DonePolicy::Lifetime).unwrap().is_empty());

        let err = delete_goal_with_store(&store, DonePolicy::Lifetime, &goal.id).unwrap_err();
        assert_eq!(err.message(), "goal not found");
    }

    #[test]
    fn habit_flow_through_api() {
        let store = RecordingStore::default();
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Meditate", "", FAR).unwrap();
        set_habit_with_store(&store, DonePolicy::Lifetime, &goal.id, HabitFrequency::Daily)
            .unwrap();
        let goal = complete_habit_with_store(&store, DonePolicy::Lifetime, &goal.id).unwrap();
        assert_eq!(goal.habit.as_ref().unwrap().completed_dates.len(), 1);

        let report = show_goal_with_store(&store, DonePolicy::Lifetime, &goal.id).unwrap();
        let progress = report.habit_progress.unwrap();
        assert_eq!(progress.actual, 1);
        assert!(!progress.can_complete_today);

        let goal = clear_habit_with_store(&store, DonePolicy::Lifetime, &goal.id).unwrap();
        assert!(goal.habit.is_none());
    }

    #[test]
    fn analyze_goal_stores_fallback_score() {
        let store = RecordingStore::default();
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Swim", "", FAR).unwrap();

        let (stored, analysis) =
            analyze_goal_with_store(&store, DonePolicy::Lifetime, &goal.id, &OfflineAnalyzer)
                .unwrap();
        assert_eq!(analysis.suggestion, INCOMPLETE_SUGGESTION);
        assert_eq!(stored.smart_score, Some(0));

        update_goal_with_store(
            &store,
            DonePolicy::Lifetime,
            &goal.id,
            GoalUpdate {
                description: Some("a mile without stopping".into()),
                ..GoalUpdate::default()
            },
        )
        .unwrap();
        add_task_with_store(&store, DonePolicy::Lifetime, &goal.id, weekly_draft("laps", 3))
            .unwrap();
        let (_, analysis) =
            analyze_goal_with_store(&store, DonePolicy::Lifetime, &goal.id, &OfflineAnalyzer)
                .unwrap();
        assert_eq!(analysis.suggestion, FALLBACK_SUGGESTION);
    }

    #[test]
    fn record_analysis_keeps_latest_score() {
        let store = RecordingStore::default();
        let goal = add_goal_with_store(&store, DonePolicy::Lifetime, "Swim", "", FAR).unwrap();
        let analysis = Analysis {
            score: 64,
            suggestion: "Name a distance.".into(),
        };

        let goal = record_analysis_with_store(&store, DonePolicy::Lifetime, &goal.id, &analysis)
            .unwrap();
        assert_eq!(goal.smart_score, Some(64));
    }
}
