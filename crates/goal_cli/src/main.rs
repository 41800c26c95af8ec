use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use goal_cli::cli::{Cli, Command, HabitCommand, TaskCommand, config_overrides_from_args};
use goal_core::analysis::{AnalysisOutcome, AnalysisRequest, AnalysisWorker, analyzer_from_config};
use goal_core::book::{GoalUpdate, TaskDraft, TaskUpdate};
use goal_core::config::{Config, load_config_with_fallback, merge_overrides};
use goal_core::error::AppError;
use goal_core::evaluator::task_progress;
use goal_core::goal_api::{self, GoalReport, local_now};
use goal_core::model::{Goal, HabitFrequency, Period, RecurrenceInput, format_date, parse_date};
use goal_core::progress::habit_progress;
use goal_core::suggest::smart_suggestions;
use serde::Serialize;
use std::io::{self, BufRead};
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "GOALTRACK_LOG";

#[derive(Tabled)]
struct GoalRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "DEADLINE")]
    deadline: String,
    #[tabled(rename = "TASKS")]
    tasks: usize,
    #[tabled(rename = "PROGRESS")]
    progress: String,
    #[tabled(rename = "HABIT")]
    habit: String,
    #[tabled(rename = "SMART")]
    smart: String,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "PROGRESS")]
    progress: String,
    #[tabled(rename = "DONE")]
    done: &'static str,
    #[tabled(rename = "TODAY")]
    today: u32,
    #[tabled(rename = "DUE")]
    due: String,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_goals_plain(goals: &[Goal]) {
    if goals.is_empty() {
        println!("No goals yet.");
        return;
    }

    let rows = goals.iter().map(|goal| GoalRow {
        id: goal.id.clone(),
        title: goal.title.clone(),
        deadline: format_date(goal.deadline),
        tasks: goal.tasks.len(),
        progress: format!("{}%", goal.progress),
        habit: goal
            .habit
            .as_ref()
            .map(|habit| habit.frequency.label())
            .unwrap_or_else(|| "-".to_string()),
        smart: goal
            .smart_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "-".to_string()),
    });
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn print_report_plain(report: &GoalReport) {
    let goal = &report.goal;
    println!("{} ({})", goal.title, goal.id);
    if !goal.description.is_empty() {
        println!("Description: {}", goal.description);
    }
    println!("Deadline: {}", format_date(goal.deadline));
    println!("Progress: {}%", goal.progress);
    match goal.smart_score {
        Some(score) => println!("SMART score: {score}/100"),
        None => println!("SMART score: -"),
    }

    if goal.tasks.is_empty() {
        println!("No tasks.");
    } else {
        let rows = goal
            .tasks
            .iter()
            .zip(&report.task_progress)
            .map(|(task, progress)| TaskRow {
                id: task.id.clone(),
                title: task.title.clone(),
                progress: progress.label.clone(),
                done: yes_no(progress.done),
                today: progress.completions_today,
                due: task
                    .recurrence
                    .map(|rule| format_date(rule.due_date))
                    .unwrap_or_else(|| "-".to_string()),
            });
        let mut table = Table::new(rows);
        table.with(Style::psql());
        println!("{table}");
    }

    if let (Some(habit), Some(progress)) = (goal.habit.as_ref(), report.habit_progress) {
        println!(
            "Habit: {}, {}/{} ({}%), done today: {}, streak: {}",
            habit.frequency.label(),
            progress.actual,
            progress.expected,
            progress.percent,
            yes_no(!progress.can_complete_today),
            habit.streak
        );
    }
}

fn print_task_update(verb: &str, update: &TaskUpdate, config: &Config) {
    let progress = task_progress(&update.task, local_now(), config.done_policy);
    println!(
        "{} task: {} ({}) {}, goal progress {}%",
        verb, update.task.title, update.task.id, progress.label, update.goal.progress
    );
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        warn!(error = %err, "config unreadable, using defaults");
    }
    let overrides = config_overrides_from_args(raw_overrides).map_err(AppError::invalid_input)?;
    Ok(merge_overrides(&loaded.config, &overrides))
}

fn optional_date(raw: Option<String>) -> Result<Option<time::Date>, AppError> {
    raw.as_deref().map(parse_date).transpose()
}

/// Run one parsed command. Returns the id of a goal whose title,
/// description or task list changed, so interactive mode can re-score it.
fn run_command(cli: Cli) -> Result<Option<String>, AppError> {
    let config = resolve_config(&cli.config_override)?;
    let policy = config.done_policy;

    match cli.command {
        Command::Add {
            title,
            description,
            deadline,
        } => {
            let deadline = parse_date(&deadline)?;
            let goal = goal_api::add_goal(policy, &title, &description, deadline)?;
            if cli.json {
                print_json(&goal)?;
            } else {
                println!("Added goal: {} ({})", goal.title, goal.id);
            }
            Ok(Some(goal.id))
        }
        Command::Edit {
            id,
            title,
            description,
            deadline,
        } => {
            if title.is_none() && description.is_none() && deadline.is_none() {
                return Err(AppError::invalid_input(
                    "nothing to update; pass --title, --description or --deadline",
                ));
            }
            let update = GoalUpdate {
                title,
                description,
                deadline: optional_date(deadline)?,
            };
            let goal = goal_api::update_goal(policy, &id, update)?;
            if cli.json {
                print_json(&goal)?;
            } else {
                println!("Updated goal: {} ({})", goal.title, goal.id);
            }
            Ok(Some(goal.id))
        }
        Command::Delete { id } => {
            let goal = goal_api::delete_goal(policy, &id)?;
            if cli.json {
                print_json(&goal)?;
            } else {
                println!("Deleted goal: {} ({})", goal.title, goal.id);
            }
            Ok(None)
        }
        Command::List => {
            let goals = goal_api::list_goals(policy)?;
            if cli.json {
                print_json(&goals)?;
            } else {
                print_goals_plain(&goals);
            }
            Ok(None)
        }
        Command::Show { id } => {
            let report = goal_api::show_goal(policy, &id)?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_report_plain(&report);
            }
            Ok(None)
        }
        Command::Analyze { id } => {
            let analyzer = analyzer_from_config(&config.analysis);
            let (goal, analysis) = goal_api::analyze_goal(policy, &id, analyzer.as_ref())?;
            if cli.json {
                print_json(&serde_json::json!({
                    "goal_id": goal.id,
                    "score": analysis.score,
                    "suggestion": analysis.suggestion,
                }))?;
            } else {
                println!("SMART score for {}: {}/100", goal.title, analysis.score);
                println!("Suggestion: {}", analysis.suggestion);
            }
            Ok(None)
        }
        Command::Suggest { title } => {
            let criteria = smart_suggestions(&title);
            if cli.json {
                print_json(&criteria)?;
            } else {
                println!("Category: {}", criteria.category.as_str());
                println!("Specific: {}", criteria.specific);
                println!("Measurable: {}", criteria.measurable);
                println!("Achievable: {}", criteria.achievable);
                println!("Relevant: {}", criteria.relevant);
                println!("Time-bound: {}", criteria.time_bound);
            }
            Ok(None)
        }
        Command::Task { task } => run_task_command(task, cli.json, &config),
        Command::Habit { habit } => run_habit_command(habit, cli.json, &config),
    }
}

fn run_task_command(
    command: TaskCommand,
    json: bool,
    config: &Config,
) -> Result<Option<String>, AppError> {
    let policy = config.done_policy;
    let (verb, update, rescore) = match command {
        TaskCommand::Add {
            goal_id,
            title,
            period,
            times_per_period,
            total_occurrences,
            due_date,
        } => {
            let recurrence = RecurrenceInput {
                period: period.as_deref().map(str::parse::<Period>).transpose()?,
                times_per_period,
                total_occurrences,
                due_date: optional_date(due_date)?,
            };
            let draft = TaskDraft { title, recurrence };
            ("Added", goal_api::add_task(policy, &goal_id, draft)?, true)
        }
        TaskCommand::Remove { goal_id, task_id } => (
            "Removed",
            goal_api::remove_task(policy, &goal_id, &task_id)?,
            true,
        ),
        TaskCommand::Done { goal_id, task_id } => (
            "Completed",
            goal_api::complete_task(policy, &goal_id, &task_id)?,
            false,
        ),
        TaskCommand::Undo { goal_id, task_id } => (
            "Reverted",
            goal_api::uncomplete_task(policy, &goal_id, &task_id)?,
            false,
        ),
        TaskCommand::Toggle { goal_id, task_id } => (
            "Toggled",
            goal_api::toggle_task(policy, &goal_id, &task_id)?,
            false,
        ),
    };

    if json {
        print_json(&serde_json::json!({
            "goal_id": update.goal.id,
            "goal_progress": update.goal.progress,
            "task": update.task,
            "task_progress": task_progress(&update.task, local_now(), policy),
        }))?;
    } else {
        print_task_update(verb, &update, config);
    }

    Ok(rescore.then_some(update.goal.id))
}

fn run_habit_command(
    command: HabitCommand,
    json: bool,
    config: &Config,
) -> Result<Option<String>, AppError> {
    let policy = config.done_policy;
    let goal = match command {
        HabitCommand::Set {
            goal_id,
            frequency,
            custom_frequency,
            custom_period,
        } => {
            let frequency =
                HabitFrequency::parse(&frequency, custom_frequency, custom_period.as_deref())?;
            let goal = goal_api::set_habit(policy, &goal_id, frequency)?;
            if !json {
                println!("Tracking habit on {}: {}", goal.title, frequency.label());
            }
            goal
        }
        HabitCommand::Clear { goal_id } => {
            let goal = goal_api::clear_habit(policy, &goal_id)?;
            if !json {
                println!("Stopped tracking habit on {}", goal.title);
            }
            goal
        }
        HabitCommand::Done { goal_id } => {
            let goal = goal_api::complete_habit(policy, &goal_id)?;
            if !json && let Some(habit) = goal.habit.as_ref() {
                let progress = habit_progress(habit, local_now());
                println!(
                    "Habit done for today on {}: {}/{} ({}%)",
                    goal.title, progress.actual, progress.expected, progress.percent
                );
            }
            goal
        }
    };

    if json {
        let progress = goal
            .habit
            .as_ref()
            .map(|habit| habit_progress(habit, local_now()));
        print_json(&serde_json::json!({
            "goal_id": goal.id,
            "habit": goal.habit,
            "habit_progress": progress,
        }))?;
    }

    Ok(None)
}

fn apply_outcome(outcome: AnalysisOutcome, config: &Config) {
    match goal_api::record_analysis(config.done_policy, &outcome.goal_id, &outcome.analysis) {
        Ok(goal) => println!(
            "SMART score for {}: {}/100 - {}",
            goal.title, outcome.analysis.score, outcome.analysis.suggestion
        ),
        // The goal may have been deleted while it was being scored.
        Err(err) => warn!(goal_id = %outcome.goal_id, error = %err, "analysis result dropped"),
    }
}

fn submit_for_analysis(worker: &mut AnalysisWorker, config: &Config, goal_id: &str) {
    let queued = goal_api::show_goal(config.done_policy, goal_id)
        .and_then(|report| worker.submit(goal_id, AnalysisRequest::from_goal(&report.goal)));
    match queued {
        Ok(generation) => debug!(goal_id, generation, "queued goal analysis"),
        Err(err) => warn!(goal_id, error = %err, "could not queue goal analysis"),
    }
}

fn run_interactive() -> Result<(), AppError> {
    let config = resolve_config(&[])?;
    let debounce = Duration::from_millis(config.analysis.debounce_ms);
    let mut worker = AnalysisWorker::spawn(analyzer_from_config(&config.analysis), debounce)?;

    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        while let Some(outcome) = worker.try_next() {
            apply_outcome(outcome, &config);
        }

        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("goal".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if err.kind() == ErrorKind::DisplayHelp => {
                println!("{}", err.render());
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        match run_command(cli) {
            Ok(Some(goal_id)) => submit_for_analysis(&mut worker, &config, &goal_id),
            Ok(None) => {}
            Err(err) => eprintln!("ERROR: {}", err),
        }
    }

    let grace = debounce + Duration::from_secs(config.analysis.timeout_secs + 1);
    while worker.has_pending() {
        match worker.recv_timeout(grace) {
            Some(outcome) => apply_outcome(outcome, &config),
            None => break,
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
