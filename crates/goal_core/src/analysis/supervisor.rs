use super::{Analysis, AnalysisRequest, GoalAnalyzer, analyze_with_fallback};
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// A request waiting for its debounce window to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub goal_id: String,
    pub request: AnalysisRequest,
    pub due_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub generation: u64,
    pub goal_id: String,
    pub analysis: Analysis,
}

/// Per-goal debounce and "latest request wins" bookkeeping, with time
/// passed in.
///
/// A submission replaces the pending ticket of the same goal only; other
/// goals keep their own windows. A result is accepted when its generation is
/// still the latest one submitted for its goal.
#[derive(Debug)]
pub struct AnalysisSupervisor {
    debounce: Duration,
    next_generation: u64,
    latest: HashMap<String, u64>,
    pending: HashMap<String, AnalysisTicket>,
}

impl AnalysisSupervisor {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            next_generation: 0,
            latest: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn submit(&mut self, goal_id: String, request: AnalysisRequest, at: Instant) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.latest.insert(goal_id.clone(), generation);

        let ticket = AnalysisTicket {
            generation,
            goal_id: goal_id.clone(),
            request,
            due_at: at + self.debounce,
        };
        if let Some(previous) = self.pending.insert(goal_id, ticket) {
            debug!(
                goal_id = %previous.goal_id,
                generation = previous.generation,
                "superseded pending analysis"
            );
        }
        generation
    }

    /// Time until the earliest pending ticket is due; `None` when nothing is
    /// pending.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|ticket| ticket.due_at.saturating_duration_since(now))
            .min()
    }

    /// Earliest ticket whose window has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<AnalysisTicket> {
        let goal_id = self
            .pending
            .values()
            .filter(|ticket| ticket.due_at <= now)
            .min_by_key(|ticket| (ticket.due_at, ticket.generation))
            .map(|ticket| ticket.goal_id.clone())?;
        self.pending.remove(&goal_id)
    }

    pub fn is_current(&self, goal_id: &str, generation: u64) -> bool {
        self.latest.get(goal_id) == Some(&generation)
    }

    pub fn accept(&self, outcome: AnalysisOutcome) -> Option<AnalysisOutcome> {
        if self.is_current(&outcome.goal_id, outcome.generation) {
            Some(outcome)
        } else {
            debug!(
                goal_id = %outcome.goal_id,
                generation = outcome.generation,
                "discarded stale analysis"
            );
            None
        }
    }
}

enum Command {
    Submit {
        goal_id: String,
        request: AnalysisRequest,
    },
    Shutdown,
}

/// Background thread that runs the analyzer once a goal's input has been
/// quiet for the debounce window, reporting only the latest result per goal.
pub struct AnalysisWorker {
    commands: mpsc::Sender<Command>,
    outcomes: mpsc::Receiver<AnalysisOutcome>,
    handle: Option<thread::JoinHandle<()>>,
    // Mirrors the thread's generations; commands are processed in order.
    // An entry is removed once its outcome has been handed out.
    next_generation: u64,
    latest: HashMap<String, u64>,
}

impl AnalysisWorker {
    pub fn spawn(analyzer: Box<dyn GoalAnalyzer>, debounce: Duration) -> Result<Self, AppError> {
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (outcome_tx, outcome_rx) = mpsc::channel::<AnalysisOutcome>();

        let handle = thread::Builder::new()
            .name("goal-analysis".into())
            .spawn(move || run_worker(analyzer, debounce, command_rx, outcome_tx))
            .map_err(|err| AppError::io(format!("failed to spawn analysis thread: {err}")))?;

        Ok(Self {
            commands: command_tx,
            outcomes: outcome_rx,
            handle: Some(handle),
            next_generation: 0,
            latest: HashMap::new(),
        })
    }

    /// Queue a goal for analysis, returning its generation.
    pub fn submit(
        &mut self,
        goal_id: impl Into<String>,
        request: AnalysisRequest,
    ) -> Result<u64, AppError> {
        let goal_id = goal_id.into();
        self.commands
            .send(Command::Submit {
                goal_id: goal_id.clone(),
                request,
            })
            .map_err(|_| AppError::analysis("analysis worker has stopped"))?;

        self.next_generation += 1;
        self.latest.insert(goal_id, self.next_generation);
        Ok(self.next_generation)
    }

    /// True while a submitted goal has not reported its latest outcome.
    pub fn has_pending(&self) -> bool {
        !self.latest.is_empty()
    }

    /// Next current outcome, without blocking.
    pub fn try_next(&mut self) -> Option<AnalysisOutcome> {
        while let Ok(outcome) = self.outcomes.try_recv() {
            if self.take_current(&outcome) {
                return Some(outcome);
            }
        }
        None
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<AnalysisOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.outcomes.recv_timeout(remaining) {
                Ok(outcome) if self.take_current(&outcome) => return Some(outcome),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    fn take_current(&mut self, outcome: &AnalysisOutcome) -> bool {
        if self.latest.get(&outcome.goal_id) == Some(&outcome.generation) {
            self.latest.remove(&outcome.goal_id);
            true
        } else {
            false
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(
    analyzer: Box<dyn GoalAnalyzer>,
    debounce: Duration,
    commands: mpsc::Receiver<Command>,
    outcomes: mpsc::Sender<AnalysisOutcome>,
) {
    let mut supervisor = AnalysisSupervisor::new(debounce);

    loop {
        if let Some(ticket) = supervisor.take_due(Instant::now()) {
            let analysis = analyze_with_fallback(analyzer.as_ref(), &ticket.request);

            // A submission for the same goal made while the analyzer ran
            // supersedes this result.
            let mut shutdown = false;
            loop {
                match commands.try_recv() {
                    Ok(Command::Submit { goal_id, request }) => {
                        supervisor.submit(goal_id, request, Instant::now());
                    }
                    Ok(Command::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => {
                        shutdown = true;
                        break;
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                }
            }

            let outcome = AnalysisOutcome {
                generation: ticket.generation,
                goal_id: ticket.goal_id,
                analysis,
            };
            if let Some(outcome) = supervisor.accept(outcome)
                && outcomes.send(outcome).is_err()
            {
                return;
            }
            if shutdown {
                return;
            }
            continue;
        }

        let command = match supervisor.time_until_due(Instant::now()) {
            Some(wait) => match commands.recv_timeout(wait) {
                Ok(command) => command,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => return,
            },
            None => match commands.recv() {
                Ok(command) => command,
                Err(_) => return,
            },
        };

        match command {
            Command::Submit { goal_id, request } => {
                supervisor.submit(goal_id, request, Instant::now());
            }
            Command::Shutdown => return,
        }
    }
}
