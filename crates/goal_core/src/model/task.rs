use super::RecurrenceRule;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub completed_count: u32,
    #[serde(default)]
    pub completion_ledger: Vec<CompletionEntry>,
    #[serde(default)]
    pub legacy_completed: bool,
}

impl Task {
    pub fn new(
        id: String,
        title: String,
        recurrence: Option<RecurrenceRule>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            title,
            created_at,
            recurrence,
            completed_count: 0,
            completion_ledger: Vec::new(),
            legacy_completed: false,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}
