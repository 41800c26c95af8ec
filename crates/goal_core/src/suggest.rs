//! Canned SMART examples keyed off the goal title.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Learning,
    Fitness,
    Career,
    Business,
}

impl GoalCategory {
    /// First matching keyword group wins; anything else is treated as learning.
    pub fn from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|word| title.contains(word));

        if has_any(&["learn", "study", "course"]) {
            GoalCategory::Learning
        } else if has_any(&["run", "exercise", "gym", "health"]) {
            GoalCategory::Fitness
        } else if has_any(&["promotion", "career", "job"]) {
            GoalCategory::Career
        } else if has_any(&["business", "startup", "revenue"]) {
            GoalCategory::Business
        } else {
            GoalCategory::Learning
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalCategory::Learning => "learning",
            GoalCategory::Fitness => "fitness",
            GoalCategory::Career => "career",
            GoalCategory::Business => "business",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartCriteria {
    pub category: GoalCategory,
    pub specific: &'static str,
    pub measurable: &'static str,
    pub achievable: &'static str,
    pub relevant: &'static str,
    pub time_bound: &'static str,
}

pub fn smart_suggestions(title: &str) -> SmartCriteria {
    let category = GoalCategory::from_title(title);
    match category {
        GoalCategory::Learning => SmartCriteria {
            category,
            specific: "Finish two intermediate courses and ship three small projects that use them",
            measurable: "Count completed lessons and keep a checklist of project milestones",
            achievable: "Set aside one focused hour each weekday, building on what you already know",
            relevant: "Pick skills that the role you want next actually asks for",
            time_bound: "Six months, with a self-review at the end of every month",
        },
        GoalCategory::Fitness => SmartCriteria {
            category,
            specific: "Run 10 km without stopping in under 60 minutes",
            measurable: "Log three sessions a week and add 1 km to the long run every fortnight",
            achievable: "Follow a beginner plan that keeps two rest days per week",
            relevant: "Better stamina for daily life and a clearer head at work",
            time_bound: "Twelve weeks, with a timed test run every fourth week",
        },
        GoalCategory::Career => SmartCriteria {
            category,
            specific: "Move into a senior position on the current team",
            measurable: "Own two projects end to end and earn one recognised certification",
            achievable: "Ask for stretch work in each planning cycle and meet a mentor monthly",
            relevant: "Matches where you want to be in five years",
            time_bound: "Twelve months, checked against each quarterly review",
        },
        GoalCategory::Business => SmartCriteria {
            category,
            specific: "Open an online shop with a first catalogue of 50 products",
            measurable: "Reach 500 monthly visitors and a steady stream of weekly orders",
            achievable: "Spend fifteen hours a week on it, funded from savings already set aside",
            relevant: "Builds a second income that you control",
            time_bound: "Six months, with a revenue checkpoint at the end of each month",
        },
    }
}
