pub mod analysis;
pub mod book;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod goal_api;
pub mod ledger;
pub mod model;
pub mod period;
pub mod progress;
pub mod storage;
pub mod suggest;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Goal, Task};
    use time::macros::{date, datetime};

    #[test]
    fn new_goal_and_task_start_empty() {
        let goal = Goal::new(
            "goal-1".to_string(),
            "demo".to_string(),
            String::new(),
            date!(2027 - 01 - 01),
            datetime!(2026-10-19 00:00 UTC),
        );
        let task = Task::new(
            "task-1".to_string(),
            "demo".to_string(),
            None,
            datetime!(2026-10-19 00:00 UTC),
        );

        assert!(goal.tasks.is_empty());
        assert_eq!(goal.progress, 0);
        assert!(goal.habit.is_none());
        assert_eq!(goal.smart_score, None);
        assert_eq!(task.completed_count, 0);
        assert!(task.completion_ledger.is_empty());
        assert!(!task.legacy_completed);
        assert!(!task.is_recurring());
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing title");
    }
}
