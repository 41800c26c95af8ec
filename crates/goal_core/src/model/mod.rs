mod goal;
mod habit;
mod recurrence;
mod task;

pub use goal::Goal;
pub use habit::{CustomPeriod, HabitFrequency, HabitTracking};
pub use recurrence::{Period, RecurrenceInput, RecurrenceKind, RecurrenceRule};
pub use task::{CompletionEntry, Task};

use crate::error::AppError;
use time::Date;
use time::macros::format_description;

/// Parse a `YYYY-MM-DD` calendar date as entered by the user.
pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("date is required"));
    }

    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input("date must be YYYY-MM-DD"))
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub(crate) fn required_title(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }
    Ok(trimmed.to_string())
}
