use super::{Analysis, DEFAULT_SUGGESTION};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const COMPONENT_MAX: u32 = 20;

static RE_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(specific|measurable|achievable|relevant|time[\s-]?bound)\W*:\s*\**\s*(\d+)")
        .unwrap()
});

/// Turn a free-text model reply into a score and a suggestion.
///
/// Each SMART component is looked for as `Component: N` (markdown emphasis
/// tolerated), capped at 20, and the five are summed. A repeated component
/// keeps its last value. The suggestion is the text after the colon on the
/// last line mentioning "suggestion".
pub fn parse_analysis_reply(reply: &str) -> Analysis {
    let mut scores: HashMap<String, u32> = HashMap::new();
    let mut suggestion = None;

    for line in reply.lines() {
        if let Some(captures) = RE_COMPONENT.captures(line) {
            let component: String = captures[1]
                .chars()
                .filter(|ch| ch.is_ascii_alphabetic())
                .map(|ch| ch.to_ascii_lowercase())
                .collect();
            let value = captures[2].parse::<u32>().unwrap_or(0).min(COMPONENT_MAX);
            scores.insert(component, value);
        } else if line.to_ascii_lowercase().contains("suggestion")
            && let Some((_, text)) = line.split_once(':')
        {
            let text = text.trim().trim_matches('*').trim();
            if !text.is_empty() {
                suggestion = Some(text.to_string());
            }
        }
    }

    let total: u32 = scores.values().sum();
    Analysis {
        score: u8::try_from(total.min(100)).unwrap_or(100),
        suggestion: suggestion.unwrap_or_else(|| DEFAULT_SUGGESTION.to_string()),
    }
}
