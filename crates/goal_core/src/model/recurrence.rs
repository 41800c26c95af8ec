use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use time::Date;

/// Calendar window a periodic task's quota is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Semiannual,
    Annual,
}

impl Period {
    pub const ALL: [Period; 7] = [
        Period::Daily,
        Period::Weekly,
        Period::Biweekly,
        Period::Monthly,
        Period::Bimonthly,
        Period::Semiannual,
        Period::Annual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Biweekly => "biweekly",
            Period::Monthly => "monthly",
            Period::Bimonthly => "bimonthly",
            Period::Semiannual => "semiannual",
            Period::Annual => "annual",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Period::ALL
            .into_iter()
            .find(|period| period.as_str() == wanted)
            .ok_or_else(|| AppError::invalid_input(format!("unknown period '{}'", raw.trim())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceKind {
    /// Complete the task `total_occurrences` times over its lifetime.
    TotalCount { total_occurrences: NonZeroU32 },
    /// Complete the task `times_per_period` times within every `period`.
    Periodic {
        times_per_period: NonZeroU32,
        period: Period,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub kind: RecurrenceKind,
    pub due_date: Date,
}

impl RecurrenceRule {
    pub fn period(&self) -> Option<Period> {
        match self.kind {
            RecurrenceKind::Periodic { period, .. } => Some(period),
            RecurrenceKind::TotalCount { .. } => None,
        }
    }

    /// Count the rule asks for: per period for periodic rules, lifetime otherwise.
    pub fn target(&self) -> u32 {
        match self.kind {
            RecurrenceKind::TotalCount { total_occurrences } => total_occurrences.get(),
            RecurrenceKind::Periodic {
                times_per_period, ..
            } => times_per_period.get(),
        }
    }
}

/// Recurrence fields as they arrive from the user, before validation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecurrenceInput {
    pub period: Option<Period>,
    pub times_per_period: Option<u32>,
    pub total_occurrences: Option<u32>,
    pub due_date: Option<Date>,
}

impl RecurrenceInput {
    pub fn is_empty(&self) -> bool {
        self.period.is_none()
            && self.times_per_period.is_none()
            && self.total_occurrences.is_none()
            && self.due_date.is_none()
    }

    /// Validate the raw fields into a rule. `today` is the local calendar date
    /// the rule is created on; a due date before it is rejected.
    pub fn build(&self, today: Date) -> Result<RecurrenceRule, AppError> {
        let kind = match (self.period, self.times_per_period, self.total_occurrences) {
            (Some(period), Some(times), None) => RecurrenceKind::Periodic {
                times_per_period: positive(times, "times per period")?,
                period,
            },
            (None, None, Some(total)) => RecurrenceKind::TotalCount {
                total_occurrences: positive(total, "total occurrences")?,
            },
            (Some(_), None, None) => {
                return Err(AppError::invalid_input(
                    "times per period is required for periodic tasks",
                ));
            }
            (None, Some(_), _) => {
                return Err(AppError::invalid_input("times per period requires a period"));
            }
            (Some(_), _, Some(_)) => {
                return Err(AppError::invalid_input(
                    "total occurrences cannot be combined with a period",
                ));
            }
            (None, None, None) => {
                return Err(AppError::invalid_input(
                    "a period with times per period or total occurrences is required",
                ));
            }
        };

        let due_date = self
            .due_date
            .ok_or_else(|| AppError::invalid_input("due date is required"))?;
        if due_date < today {
            return Err(AppError::invalid_input("due date cannot be in the past"));
        }

        Ok(RecurrenceRule { kind, due_date })
    }
}

fn positive(value: u32, field: &str) -> Result<NonZeroU32, AppError> {
    NonZeroU32::new(value)
        .ok_or_else(|| AppError::invalid_input(format!("{field} must be positive")))
}
