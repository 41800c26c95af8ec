use super::{HabitTracking, Task};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Derived by the progress aggregator after every mutation.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub habit: Option<HabitTracking>,
    #[serde(default)]
    pub smart_score: Option<u8>,
}

impl Goal {
    pub fn new(
        id: String,
        title: String,
        description: String,
        deadline: Date,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            title,
            description,
            deadline,
            created_at,
            tasks: Vec::new(),
            progress: 0,
            habit: None,
            smart_score: None,
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }
}
