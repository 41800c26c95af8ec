pub mod json_store;

use crate::error::AppError;
use crate::model::Goal;

pub use json_store::JsonGoalStore;

/// Persistence collaborator. Receives whole goal snapshots, nested tasks and
/// ledgers included; it has no say in done-ness or eligibility.
pub trait GoalStore {
    fn load_goals(&self) -> Result<Vec<Goal>, AppError>;

    /// Insert the goal, or replace the stored goal with the same id.
    fn save_goal(&self, goal: &Goal) -> Result<(), AppError>;

    fn delete_goal(&self, id: &str) -> Result<(), AppError>;
}
