//! Calendar windows for periodic tasks and expected-completion estimates for
//! habits.
//!
//! Every calculation happens in the UTC offset carried by `now`; callers pass
//! a `now` already converted to the user's local offset. Weeks start on
//! Monday.

use crate::model::{HabitFrequency, Period};
use time::{Date, Duration, Month, OffsetDateTime};

/// Half-open interval `[start, end)` of the period containing a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl PeriodBounds {
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Bounds of the period containing `now`.
///
/// `Biweekly` shares the one-week window: a "twice weekly" quota is counted
/// inside the same Monday-to-Monday window as `Weekly`. Likewise `Bimonthly`
/// uses the calendar month. `Semiannual` and `Annual` have no window and
/// return `None`; their current-period count is the lifetime count.
pub fn current_period_bounds(period: Period, now: OffsetDateTime) -> Option<PeriodBounds> {
    let today = now.date();
    let (start, end) = match period {
        Period::Daily => (today, today.next_day()?),
        Period::Weekly | Period::Biweekly => {
            let monday = week_start(today);
            (monday, monday + Duration::weeks(1))
        }
        Period::Monthly | Period::Bimonthly => {
            let first = today.replace_day(1).ok()?;
            (first, first_of_next_month(first)?)
        }
        Period::Semiannual | Period::Annual => return None,
    };

    let offset = now.offset();
    Some(PeriodBounds {
        start: start.midnight().assume_offset(offset),
        end: end.midnight().assume_offset(offset),
    })
}

/// Bounds of the calendar day containing `now`.
pub fn day_bounds(now: OffsetDateTime) -> Option<PeriodBounds> {
    current_period_bounds(Period::Daily, now)
}

pub fn week_start(date: Date) -> Date {
    date - Duration::days(i64::from(date.weekday().number_days_from_monday()))
}

fn first_of_next_month(first: Date) -> Option<Date> {
    let (year, month) = match first.month() {
        Month::December => (first.year() + 1, Month::January),
        month => (first.year(), month.next()),
    };
    Date::from_calendar_date(year, month, 1).ok()
}

/// Whole calendar days between the dates of `start` and `now`, both read in
/// `now`'s offset. Negative when `start` lies after `now`.
pub fn days_elapsed(start: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let start_date = start.to_offset(now.offset()).date();
    (now.date() - start_date).whole_days()
}

/// How many completions a habit should have by `now`, counting the start day.
///
/// Monthly and custom month units use a fixed 30-day month. A habit that
/// starts after `now` expects nothing yet.
pub fn expected_completions(
    frequency: &HabitFrequency,
    start: OffsetDateTime,
    now: OffsetDateTime,
) -> u32 {
    let elapsed = days_elapsed(start, now);
    if elapsed < 0 {
        return 0;
    }
    let days = elapsed + 1;

    let expected = match frequency {
        HabitFrequency::Daily => days,
        HabitFrequency::Weekly => ceil_div(days, 7),
        // ceil(days / 3.5)
        HabitFrequency::Biweekly => ceil_div(days * 2, 7),
        HabitFrequency::Monthly => ceil_div(days, 30),
        HabitFrequency::Custom {
            custom_frequency,
            custom_period,
        } => {
            let period_days = i64::from(custom_period.days()) * i64::from(custom_frequency.get());
            ceil_div(days, period_days)
        }
    };

    u32::try_from(expected).unwrap_or(u32::MAX)
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}
