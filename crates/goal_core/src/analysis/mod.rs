//! Goal analysis collaborator: scores a goal against the SMART criteria and
//! suggests an improvement. The scoring itself happens elsewhere (an HTTP
//! chat-completions service); this module owns the request shape, the
//! fallback policy and the supervision of debounced requests.

mod http;
mod reply;
mod supervisor;

pub use http::HttpAnalyzer;
pub use reply::parse_analysis_reply;
pub use supervisor::{AnalysisOutcome, AnalysisSupervisor, AnalysisTicket, AnalysisWorker};

use crate::config::AnalysisConfig;
use crate::error::AppError;
use crate::model::{Goal, format_date};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const INCOMPLETE_SUGGESTION: &str = "Fill out all fields to get a SMART score.";
pub const FALLBACK_SUGGESTION: &str =
    "Unable to analyze the goal right now. Make sure every field is filled in.";
pub const DEFAULT_SUGGESTION: &str = "Keep refining your goal to make it more SMART.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub title: String,
    pub description: String,
    pub task_titles: Vec<String>,
    pub deadline: String,
}

impl AnalysisRequest {
    pub fn from_goal(goal: &Goal) -> Self {
        Self {
            title: goal.title.clone(),
            description: goal.description.clone(),
            task_titles: goal
                .tasks
                .iter()
                .map(|task| task.title.trim().to_string())
                .filter(|title| !title.is_empty())
                .collect(),
            deadline: format_date(goal.deadline),
        }
    }

    /// Analysis is only worth asking for once title, description and at
    /// least one task title are present.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && self.task_titles.iter().any(|title| !title.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// 0 to 100.
    pub score: u8,
    pub suggestion: String,
}

impl Analysis {
    pub fn fallback() -> Self {
        Self {
            score: 0,
            suggestion: FALLBACK_SUGGESTION.to_string(),
        }
    }

    pub fn incomplete() -> Self {
        Self {
            score: 0,
            suggestion: INCOMPLETE_SUGGESTION.to_string(),
        }
    }
}

pub trait GoalAnalyzer: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AppError>;
}

/// Stand-in used when no API key is configured. Always fails, so callers
/// land on the fallback analysis.
pub struct OfflineAnalyzer;

impl GoalAnalyzer for OfflineAnalyzer {
    fn analyze(&self, _request: &AnalysisRequest) -> Result<Analysis, AppError> {
        Err(AppError::analysis("goal analysis is not configured"))
    }
}

pub fn analyzer_from_config(config: &AnalysisConfig) -> Box<dyn GoalAnalyzer> {
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => {
            Box::new(HttpAnalyzer::new(config.clone(), key.trim().to_string()))
        }
        _ => {
            debug!(env = %config.api_key_env, "no analysis key, using offline analyzer");
            Box::new(OfflineAnalyzer)
        }
    }
}

/// Run the analyzer, never failing: incomplete requests and analyzer
/// errors both produce a zero score with a fixed message.
pub fn analyze_with_fallback(analyzer: &dyn GoalAnalyzer, request: &AnalysisRequest) -> Analysis {
    if !request.is_complete() {
        return Analysis::incomplete();
    }

    match analyzer.analyze(request) {
        Ok(analysis) => analysis,
        Err(err) => {
            warn!(error = %err, "goal analysis failed, using fallback");
            Analysis::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Analysis, AnalysisRequest, FALLBACK_SUGGESTION, GoalAnalyzer, INCOMPLETE_SUGGESTION,
        OfflineAnalyzer, analyze_with_fallback,
    };
    use crate::error::AppError;
    use crate::model::{Goal, Task};
    use time::macros::{date, datetime};

    struct FixedAnalyzer(Result<Analysis, AppError>);

    impl GoalAnalyzer for FixedAnalyzer {
        fn analyze(&self, _request: &AnalysisRequest) -> Result<Analysis, AppError> {
            self.0.clone()
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            title: "Run a marathon".into(),
            description: "Finish under four hours".into(),
            task_titles: vec!["Long run".into()],
            deadline: "2027-04-01".into(),
        }
    }

    #[test]
    fn request_from_goal_skips_blank_task_titles() {
        let mut goal = Goal::new(
            "goal-1".into(),
            "Run".into(),
            "far".into(),
            date!(2027 - 04 - 01),
            datetime!(2026-10-01 08:00 UTC),
        );
        goal.tasks.push(Task::new(
            "task-1".into(),
            "  ".into(),
            None,
            datetime!(2026-10-01 08:00 UTC),
        ));
        goal.tasks.push(Task::new(
            "task-2".into(),
            "intervals".into(),
            None,
            datetime!(2026-10-01 08:00 UTC),
        ));

        let request = AnalysisRequest::from_goal(&goal);
        assert_eq!(request.task_titles, vec!["intervals".to_string()]);
        assert_eq!(request.deadline, "2027-04-01");
        assert!(request.is_complete());
    }

    #[test]
    fn incomplete_request_skips_analyzer() {
        let analyzer = FixedAnalyzer(Ok(Analysis {
            score: 90,
            suggestion: "great".into(),
        }));
        let mut incomplete = request();
        incomplete.description = " ".into();

        let analysis = analyze_with_fallback(&analyzer, &incomplete);
        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.suggestion, INCOMPLETE_SUGGESTION);
    }

    #[test]
    fn analyzer_result_passes_through() {
        let analyzer = FixedAnalyzer(Ok(Analysis {
            score: 81,
            suggestion: "Add a pacing plan.".into(),
        }));
        let analysis = analyze_with_fallback(&analyzer, &request());
        assert_eq!(analysis.score, 81);
    }

    #[test]
    fn failures_fall_back_to_zero() {
        let analysis = analyze_with_fallback(&OfflineAnalyzer, &request());
        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.suggestion, FALLBACK_SUGGESTION);

        let analyzer = FixedAnalyzer(Err(AppError::io("connection refused")));
        assert_eq!(analyze_with_fallback(&analyzer, &request()), Analysis::fallback());
    }
}
