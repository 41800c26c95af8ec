//! In-memory goal list and the mutations the user can apply to it. Every
//! mutation recomputes the progress of the goal it touched.

use crate::analysis::Analysis;
use crate::error::AppError;
use crate::evaluator::{DonePolicy, can_complete_today, toggle_legacy};
use crate::ledger::{reconcile, record_completion, undo_last_completion};
use crate::model::{
    CompletionEntry, Goal, HabitFrequency, HabitTracking, RecurrenceInput, Task, required_title,
};
use crate::progress::{goal_progress_with, habit_can_complete_today};
use time::{Date, OffsetDateTime};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<Date>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub recurrence: RecurrenceInput,
}

/// A goal snapshot after a task mutation, plus the task as it now stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub goal: Goal,
    pub task: Task,
}

#[derive(Debug, Clone, Default)]
pub struct GoalBook {
    goals: Vec<Goal>,
    policy: DonePolicy,
}

impl GoalBook {
    /// Wrap loaded goals, bringing every stored count and progress back in
    /// line with the ledgers.
    pub fn new(mut goals: Vec<Goal>, policy: DonePolicy, now: OffsetDateTime) -> Self {
        for goal in &mut goals {
            for task in &mut goal.tasks {
                reconcile(task);
            }
            goal.progress = goal_progress_with(goal, policy, now);
        }
        Self { goals, policy }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn into_goals(self) -> Vec<Goal> {
        self.goals
    }

    pub fn goal(&self, id: &str) -> Result<&Goal, AppError> {
        let index = self.goal_index(id)?;
        Ok(&self.goals[index])
    }

    pub fn add_goal(
        &mut self,
        title: &str,
        description: &str,
        deadline: Date,
        now: OffsetDateTime,
    ) -> Result<Goal, AppError> {
        let title = required_title(title)?;
        ensure_not_past(deadline, now, "deadline cannot be in the past")?;

        let id = self.fresh_id("goal");
        let goal = Goal::new(id, title, description.trim().to_string(), deadline, now);
        debug!(goal_id = %goal.id, "added goal");
        self.goals.push(goal.clone());
        Ok(goal)
    }

    pub fn update_goal(
        &mut self,
        id: &str,
        update: GoalUpdate,
        now: OffsetDateTime,
    ) -> Result<Goal, AppError> {
        let index = self.goal_index(id)?;
        let title = update.title.as_deref().map(required_title).transpose()?;
        if let Some(deadline) = update.deadline {
            ensure_not_past(deadline, now, "deadline cannot be in the past")?;
        }

        let goal = &mut self.goals[index];
        if let Some(title) = title {
            goal.title = title;
        }
        if let Some(description) = update.description {
            goal.description = description.trim().to_string();
        }
        if let Some(deadline) = update.deadline {
            goal.deadline = deadline;
        }
        Ok(self.refresh(index, now))
    }

    pub fn remove_goal(&mut self, id: &str) -> Result<Goal, AppError> {
        let index = self.goal_index(id)?;
        let removed = self.goals.remove(index);
        debug!(goal_id = %removed.id, "removed goal");
        Ok(removed)
    }

    pub fn add_task(
        &mut self,
        goal_id: &str,
        draft: TaskDraft,
        now: OffsetDateTime,
    ) -> Result<TaskUpdate, AppError> {
        let index = self.goal_index(goal_id)?;
        let title = required_title(&draft.title)?;
        let recurrence = if draft.recurrence.is_empty() {
            None
        } else {
            Some(draft.recurrence.build(now.date())?)
        };

        let task = Task::new(self.fresh_id("task"), title, recurrence, now);
        debug!(goal_id = %self.goals[index].id, task_id = %task.id, "added task");
        self.goals[index].tasks.push(task.clone());
        Ok(TaskUpdate {
            goal: self.refresh(index, now),
            task,
        })
    }

    pub fn remove_task(
        &mut self,
        goal_id: &str,
        task_id: &str,
        now: OffsetDateTime,
    ) -> Result<TaskUpdate, AppError> {
        let (index, position) = self.task_position(goal_id, task_id)?;
        let task = self.goals[index].tasks.remove(position);
        Ok(TaskUpdate {
            goal: self.refresh(index, now),
            task,
        })
    }

    /// Append a completion at `now` if the task still has room in its quota.
    pub fn complete_task(
        &mut self,
        goal_id: &str,
        task_id: &str,
        now: OffsetDateTime,
    ) -> Result<TaskUpdate, AppError> {
        let (index, position) = self.task_position(goal_id, task_id)?;
        let task = &mut self.goals[index].tasks[position];
        if !can_complete_today(task, now) {
            return Err(AppError::invalid_input(
                "task cannot be completed in the current period",
            ));
        }
        record_completion(task, now);
        Ok(self.task_update(index, position, now))
    }

    /// Drop the most recent completion. A task with an empty ledger is
    /// returned unchanged.
    pub fn uncomplete_task(
        &mut self,
        goal_id: &str,
        task_id: &str,
        now: OffsetDateTime,
    ) -> Result<TaskUpdate, AppError> {
        let (index, position) = self.task_position(goal_id, task_id)?;
        undo_last_completion(&mut self.goals[index].tasks[position]);
        Ok(self.task_update(index, position, now))
    }

    pub fn toggle_task(
        &mut self,
        goal_id: &str,
        task_id: &str,
        now: OffsetDateTime,
    ) -> Result<TaskUpdate, AppError> {
        let (index, position) = self.task_position(goal_id, task_id)?;
        toggle_legacy(&mut self.goals[index].tasks[position]).ok_or_else(|| {
            AppError::invalid_input("recurring tasks are completed, not toggled")
        })?;
        Ok(self.task_update(index, position, now))
    }

    /// Start tracking a habit on the goal, or change the frequency of the
    /// existing one while keeping its history.
    pub fn set_habit(
        &mut self,
        goal_id: &str,
        frequency: HabitFrequency,
        now: OffsetDateTime,
    ) -> Result<Goal, AppError> {
        let index = self.goal_index(goal_id)?;
        let habit = self.goals[index]
            .habit
            .get_or_insert_with(|| HabitTracking::new(frequency, now));
        habit.frequency = frequency;
        Ok(self.refresh(index, now))
    }

    pub fn clear_habit(&mut self, goal_id: &str, now: OffsetDateTime) -> Result<Goal, AppError> {
        let index = self.goal_index(goal_id)?;
        self.goals[index].habit = None;
        Ok(self.refresh(index, now))
    }

    pub fn complete_habit(&mut self, goal_id: &str, now: OffsetDateTime) -> Result<Goal, AppError> {
        let index = self.goal_index(goal_id)?;
        let habit = self.goals[index]
            .habit
            .as_mut()
            .ok_or_else(|| AppError::invalid_input("goal has no habit"))?;
        if !habit_can_complete_today(habit, now) {
            return Err(AppError::invalid_input("habit already completed today"));
        }
        habit.completed_dates.push(CompletionEntry { completed_at: now });
        Ok(self.refresh(index, now))
    }

    pub fn record_analysis(
        &mut self,
        goal_id: &str,
        analysis: &Analysis,
        now: OffsetDateTime,
    ) -> Result<Goal, AppError> {
        let index = self.goal_index(goal_id)?;
        self.goals[index].smart_score = Some(analysis.score);
        Ok(self.refresh(index, now))
    }

    fn refresh(&mut self, index: usize, now: OffsetDateTime) -> Goal {
        let policy = self.policy;
        let goal = &mut self.goals[index];
        goal.progress = goal_progress_with(goal, policy, now);
        goal.clone()
    }

    fn task_update(&mut self, index: usize, position: usize, now: OffsetDateTime) -> TaskUpdate {
        let goal = self.refresh(index, now);
        let task = goal.tasks[position].clone();
        TaskUpdate { goal, task }
    }

    fn goal_index(&self, id: &str) -> Result<usize, AppError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }
        self.goals
            .iter()
            .position(|goal| goal.id == trimmed)
            .ok_or_else(|| AppError::invalid_input("goal not found"))
    }

    fn task_position(&self, goal_id: &str, task_id: &str) -> Result<(usize, usize), AppError> {
        let index = self.goal_index(goal_id)?;
        let trimmed = task_id.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }
        let position = self.goals[index]
            .tasks
            .iter()
            .position(|task| task.id == trimmed)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;
        Ok((index, position))
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let mut nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        loop {
            let candidate = format!("{prefix}-{nanos}");
            let taken = self.goals.iter().any(|goal| {
                goal.id == candidate || goal.tasks.iter().any(|task| task.id == candidate)
            });
            if !taken {
                return candidate;
            }
            nanos += 1;
        }
    }
}

fn ensure_not_past(date: Date, now: OffsetDateTime, message: &str) -> Result<(), AppError> {
    if date < now.date() {
        return Err(AppError::invalid_input(message));
    }
    Ok(())
}
