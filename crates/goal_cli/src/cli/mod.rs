use clap::{Parser, Subcommand};
use goal_core::config::ConfigOverrides;
use goal_core::evaluator::DonePolicy;

#[derive(Parser, Debug)]
#[command(name = "goal", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new goal
    ///
    /// Example: goal add "Run a 10k" --deadline 2027-03-01 -d "under an hour"
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        deadline: String,
    },
    /// Edit a goal's title, description or deadline
    ///
    /// Example: goal edit goal-1 --title "Run a half marathon"
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        deadline: Option<String>,
    },
    /// Delete a goal with its tasks and habit
    ///
    /// Example: goal delete goal-1
    Delete { id: String },
    /// List goals with their progress
    ///
    /// Example: goal list
    List,
    /// Show a goal's tasks and habit
    ///
    /// Example: goal show goal-1
    Show { id: String },
    /// Score a goal against the SMART criteria
    ///
    /// Example: goal analyze goal-1
    Analyze { id: String },
    /// Print SMART examples for a goal title
    ///
    /// Example: goal suggest "Learn Spanish"
    Suggest { title: String },
    /// Manage the tasks of a goal
    Task {
        #[command(subcommand)]
        task: TaskCommand,
    },
    /// Track a habit on a goal
    Habit {
        #[command(subcommand)]
        habit: HabitCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task, optionally recurring
    ///
    /// Example: goal task add goal-1 "Long run" --period weekly --times 2 --due 2027-03-01
    /// Example: goal task add goal-1 "Race" --total 1 --due 2027-03-01
    /// Example: goal task add goal-1 "Buy shoes"
    Add {
        goal_id: String,
        title: String,
        /// daily, weekly, biweekly, monthly, bimonthly, semiannual or annual
        #[arg(long)]
        period: Option<String>,
        /// Completions wanted in every period
        #[arg(long = "times", value_name = "N")]
        times_per_period: Option<u32>,
        /// Completions wanted over the task's lifetime
        #[arg(long = "total", value_name = "N")]
        total_occurrences: Option<u32>,
        #[arg(long = "due", value_name = "YYYY-MM-DD")]
        due_date: Option<String>,
    },
    /// Remove a task from its goal
    ///
    /// Example: goal task remove goal-1 task-1
    Remove { goal_id: String, task_id: String },
    /// Record a completion now
    ///
    /// Example: goal task done goal-1 task-1
    Done { goal_id: String, task_id: String },
    /// Remove the most recent completion
    ///
    /// Example: goal task undo goal-1 task-1
    Undo { goal_id: String, task_id: String },
    /// Flip the done flag of a non-recurring task
    ///
    /// Example: goal task toggle goal-1 task-1
    Toggle { goal_id: String, task_id: String },
}

#[derive(Subcommand, Debug)]
pub enum HabitCommand {
    /// Start tracking a habit or change its frequency
    ///
    /// Example: goal habit set goal-1 daily
    /// Example: goal habit set goal-1 custom --every 3 --unit days
    Set {
        goal_id: String,
        /// daily, weekly, biweekly, monthly or custom
        frequency: String,
        #[arg(long = "every", value_name = "N")]
        custom_frequency: Option<u32>,
        /// days, weeks or months
        #[arg(long = "unit")]
        custom_period: Option<String>,
    },
    /// Stop tracking the habit
    ///
    /// Example: goal habit clear goal-1
    Clear { goal_id: String },
    /// Mark the habit done for today
    ///
    /// Example: goal habit done goal-1
    Done { goal_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    DonePolicy,
    AnalysisEndpoint,
    AnalysisModel,
    AnalysisApiKeyEnv,
    AnalysisTimeoutSecs,
    AnalysisDebounceMs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    match canonical_field.as_str() {
        "done_policy" => {
            if remainder.is_some() {
                Err("done_policy override cannot have subfields".to_string())
            } else {
                Ok(ParsedConfigOverride {
                    target: ConfigOverrideTarget::DonePolicy,
                    value,
                })
            }
        }
        "analysis" => {
            let subfield = remainder
                .and_then(canonicalize_flag_name)
                .ok_or_else(|| "analysis override requires a field name".to_string())?;
            let target = match subfield.as_str() {
                "endpoint" => ConfigOverrideTarget::AnalysisEndpoint,
                "model" => ConfigOverrideTarget::AnalysisModel,
                "api_key_env" => ConfigOverrideTarget::AnalysisApiKeyEnv,
                "timeout_secs" => ConfigOverrideTarget::AnalysisTimeoutSecs,
                "debounce_ms" => ConfigOverrideTarget::AnalysisDebounceMs,
                other => return Err(format!("unknown analysis field '{other}'")),
            };
            Ok(ParsedConfigOverride { target, value })
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

/// Fold every `--config-override` argument into one set of overrides.
/// Later arguments win.
pub fn config_overrides_from_args(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::DonePolicy => {
                let policy = parsed
                    .value
                    .parse::<DonePolicy>()
                    .map_err(|err| err.message().to_string())?;
                overrides.done_policy = Some(policy);
            }
            ConfigOverrideTarget::AnalysisEndpoint => overrides.endpoint = Some(parsed.value),
            ConfigOverrideTarget::AnalysisModel => overrides.model = Some(parsed.value),
            ConfigOverrideTarget::AnalysisApiKeyEnv => overrides.api_key_env = Some(parsed.value),
            ConfigOverrideTarget::AnalysisTimeoutSecs => {
                overrides.timeout_secs = Some(positive_number(&parsed.value, "timeout_secs")?);
            }
            ConfigOverrideTarget::AnalysisDebounceMs => {
                overrides.debounce_ms = Some(parsed.value.parse::<u64>().map_err(|_| {
                    "analysis.debounce_ms must be a whole number".to_string()
                })?);
            }
        }
    }
    Ok(overrides)
}

fn positive_number(raw: &str, field: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("analysis.{field} must be a positive number")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
