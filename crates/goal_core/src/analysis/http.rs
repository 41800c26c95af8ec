use super::{Analysis, AnalysisRequest, GoalAnalyzer, parse_analysis_reply};
use crate::config::AnalysisConfig;
use crate::error::AppError;
use std::time::Duration;
use tracing::debug;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 500;

const SYSTEM_PROMPT: &str = "You are a goal coach. Score the goal on each SMART criterion \
from 0 to 20 and answer with one line per criterion in the form `Specific: N`, \
`Measurable: N`, `Achievable: N`, `Relevant: N`, `Time-bound: N`, followed by a single \
line `Suggestion: <one concrete improvement>`.";

/// Analyzer backed by an OpenAI-compatible chat-completions endpoint.
pub struct HttpAnalyzer {
    config: AnalysisConfig,
    api_key: String,
}

impl HttpAnalyzer {
    pub fn new(config: AnalysisConfig, api_key: String) -> Self {
        Self { config, api_key }
    }

    fn prompt(request: &AnalysisRequest) -> String {
        let tasks = request
            .task_titles
            .iter()
            .map(|title| format!("- {title}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Goal: {}\nDescription: {}\nDeadline: {}\nTasks:\n{}",
            request.title.trim(),
            request.description.trim(),
            request.deadline,
            tasks
        )
    }
}

impl GoalAnalyzer for HttpAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AppError> {
        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::prompt(request) },
            ],
        });
        let body =
            serde_json::to_string(&body).map_err(|err| AppError::analysis(err.to_string()))?;

        debug!(url = %url, model = %self.config.model, "requesting goal analysis");
        let response = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_string(&body)
            .map_err(|err| AppError::analysis(err.to_string()))?;

        let text = response
            .into_string()
            .map_err(|err| AppError::analysis(err.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|err| AppError::analysis(err.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AppError::analysis("reply has no message content"))?;
        Ok(parse_analysis_reply(content))
    }
}
