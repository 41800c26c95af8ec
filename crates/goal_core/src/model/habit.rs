use super::CompletionEntry;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomPeriod {
    Days,
    Weeks,
    Months,
}

impl CustomPeriod {
    /// Length of one unit in days. Months are a flat 30 days.
    pub fn days(self) -> u32 {
        match self {
            CustomPeriod::Days => 1,
            CustomPeriod::Weeks => 7,
            CustomPeriod::Months => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CustomPeriod::Days => "days",
            CustomPeriod::Weeks => "weeks",
            CustomPeriod::Months => "months",
        }
    }
}

impl FromStr for CustomPeriod {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(CustomPeriod::Days),
            "week" | "weeks" => Ok(CustomPeriod::Weeks),
            "month" | "months" => Ok(CustomPeriod::Months),
            other => Err(AppError::invalid_input(format!(
                "unknown custom period '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    /// Twice a week.
    Biweekly,
    Monthly,
    /// Once every `custom_frequency` units of `custom_period`.
    Custom {
        custom_frequency: NonZeroU32,
        custom_period: CustomPeriod,
    },
}

impl HabitFrequency {
    /// Build a frequency from CLI-style fields. The custom fields must be
    /// present exactly when the kind is `custom`.
    pub fn parse(
        kind: &str,
        custom_frequency: Option<u32>,
        custom_period: Option<&str>,
    ) -> Result<Self, AppError> {
        let kind = kind.trim().to_ascii_lowercase();
        let simple = match kind.as_str() {
            "daily" => Some(HabitFrequency::Daily),
            "weekly" => Some(HabitFrequency::Weekly),
            "biweekly" => Some(HabitFrequency::Biweekly),
            "monthly" => Some(HabitFrequency::Monthly),
            "custom" => None,
            other => {
                return Err(AppError::invalid_input(format!(
                    "unknown habit frequency '{other}'"
                )));
            }
        };

        match simple {
            Some(frequency) => {
                if custom_frequency.is_some() || custom_period.is_some() {
                    return Err(AppError::invalid_input(
                        "custom frequency fields require the custom frequency",
                    ));
                }
                Ok(frequency)
            }
            None => {
                let every = custom_frequency
                    .ok_or_else(|| AppError::invalid_input("custom frequency is required"))?;
                let every = NonZeroU32::new(every)
                    .ok_or_else(|| AppError::invalid_input("custom frequency must be positive"))?;
                let unit = custom_period
                    .ok_or_else(|| AppError::invalid_input("custom period is required"))?
                    .parse::<CustomPeriod>()?;
                Ok(HabitFrequency::Custom {
                    custom_frequency: every,
                    custom_period: unit,
                })
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            HabitFrequency::Daily => "daily".to_string(),
            HabitFrequency::Weekly => "weekly".to_string(),
            HabitFrequency::Biweekly => "twice a week".to_string(),
            HabitFrequency::Monthly => "monthly".to_string(),
            HabitFrequency::Custom {
                custom_frequency,
                custom_period,
            } => format!("every {} {}", custom_frequency, custom_period.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitTracking {
    pub frequency: HabitFrequency,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(default)]
    pub completed_dates: Vec<CompletionEntry>,
    /// Carried from older stores; not derived here.
    #[serde(default)]
    pub streak: u32,
}

impl HabitTracking {
    pub fn new(frequency: HabitFrequency, start_date: OffsetDateTime) -> Self {
        Self {
            frequency,
            start_date,
            completed_dates: Vec::new(),
            streak: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomPeriod, HabitFrequency};

    #[test]
    fn parse_simple_frequencies() {
        assert_eq!(
            HabitFrequency::parse("Daily", None, None).unwrap(),
            HabitFrequency::Daily
        );
        assert_eq!(
            HabitFrequency::parse("biweekly", None, None).unwrap(),
            HabitFrequency::Biweekly
        );
    }

    #[test]
    fn parse_custom_requires_both_fields() {
        let parsed = HabitFrequency::parse("custom", Some(2), Some("weeks")).unwrap();
        match parsed {
            HabitFrequency::Custom {
                custom_frequency,
                custom_period,
            } => {
                assert_eq!(custom_frequency.get(), 2);
                assert_eq!(custom_period, CustomPeriod::Weeks);
            }
            other => panic!("unexpected frequency: {other:?}"),
        }

        assert!(HabitFrequency::parse("custom", None, Some("days")).is_err());
        assert!(HabitFrequency::parse("custom", Some(3), None).is_err());
        assert!(HabitFrequency::parse("custom", Some(0), Some("days")).is_err());
    }

    #[test]
    fn parse_rejects_custom_fields_on_simple_frequency() {
        let err = HabitFrequency::parse("weekly", Some(2), None).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn custom_label_mentions_unit() {
        let frequency = HabitFrequency::parse("custom", Some(3), Some("day")).unwrap();
        assert_eq!(frequency.label(), "every 3 days");
    }
}
