use crate::error::AppError;
use crate::model::Goal;
use crate::storage::GoalStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "goals.json";
const STORE_ENV_VAR: &str = "GOALTRACK_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredGoals {
    schema_version: u32,
    #[serde(default)]
    goals: Vec<Goal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalState {
    pub goals: Vec<Goal>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("goaltrack").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("goaltrack")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<GoalState, AppError> {
    if !path.exists() {
        return Ok(GoalState { goals: Vec::new() });
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredGoals =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    let mut goal_ids = HashSet::new();
    for goal in &stored.goals {
        if !goal_ids.insert(goal.id.as_str()) {
            return Err(AppError::invalid_data(format!("duplicate goal id {}", goal.id)));
        }
        let mut task_ids = HashSet::new();
        for task in &goal.tasks {
            if !task_ids.insert(task.id.as_str()) {
                return Err(AppError::invalid_data(format!("duplicate task id {}", task.id)));
            }
        }
    }

    Ok(GoalState {
        goals: stored.goals,
    })
}

pub fn save_state(path: &Path, state: &GoalState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredGoals {
        schema_version: SCHEMA_VERSION,
        goals: state.goals.to_vec(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    info!(path = %path.display(), goals = state.goals.len(), "saved goals");
    Ok(())
}

/// Goal store backed by a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonGoalStore {
    path: PathBuf,
}

impl JsonGoalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_path()?))
    }
}

impl GoalStore for JsonGoalStore {
    fn load_goals(&self) -> Result<Vec<Goal>, AppError> {
        Ok(load_state(&self.path)?.goals)
    }

    fn save_goal(&self, goal: &Goal) -> Result<(), AppError> {
        let mut state = load_state(&self.path)?;
        match state.goals.iter_mut().find(|stored| stored.id == goal.id) {
            Some(stored) => *stored = goal.clone(),
            None => state.goals.push(goal.clone()),
        }
        save_state(&self.path, &state)
    }

    fn delete_goal(&self, id: &str) -> Result<(), AppError> {
        let mut state = load_state(&self.path)?;
        let before = state.goals.len();
        state.goals.retain(|goal| goal.id != id);
        if state.goals.len() == before {
            return Err(AppError::invalid_input("goal not found"));
        }
        save_state(&self.path, &state)
    }
}
