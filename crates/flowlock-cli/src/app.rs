//! Shared state for every command: the store, the config and the persisted
//! countdown.

use chrono::{Local, NaiveDate};
use flowlock_core::shell::{self, CompletionReport};
use flowlock_core::{
    Completion, Config, CoreError, CountdownEngine, Database, HabitTemplate, RecurrenceExpander,
    SystemClock, Task, TaskStore, TimerSession,
};
use tracing::{info, warn};

const ENGINE_KEY: &str = "timer_session";

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub struct App {
    pub db: Database,
    pub config: Config,
}

impl App {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let db = Database::open()?;
        Ok(Self { db, config })
    }

    /// Open and expand today's habits when `habits.auto_generate` is on.
    pub fn open_with_habits() -> CliResult<Self> {
        let app = Self::open()?;
        if app.config.habits.auto_generate {
            app.generate_habits(today());
        }
        Ok(app)
    }

    fn generate_habits(&self, date: NaiveDate) {
        match shell::generate_today(&self.db, &RecurrenceExpander::local(), date) {
            Ok(report) if !report.created.is_empty() => {
                info!(count = report.created.len(), "generated habit tasks");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "habit generation skipped"),
        }
    }

    pub fn load_engine(&self) -> CountdownEngine {
        match self.db.kv_get(ENGINE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<TimerSession>(&json) {
                Ok(session) => return CountdownEngine::with_session(session, SystemClock),
                Err(e) => warn!(error = %e, "stored timer session unreadable; starting idle"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read timer session; starting idle"),
        }
        CountdownEngine::new(SystemClock)
    }

    pub fn save_engine(&self, engine: &CountdownEngine) -> CliResult {
        let json = serde_json::to_string(engine.session())?;
        self.db.kv_set(ENGINE_KEY, &json)?;
        Ok(())
    }

    /// Persist a completion and tell the user about partial failures.
    pub fn record(&self, completion: &Completion) -> CompletionReport {
        let report = shell::record_completion(&self.db, completion);
        for failure in &report.failures {
            eprintln!("warning: {:?} failed: {}", failure.step, failure.message);
        }
        report
    }

    /// Look a task up by full id or unique id prefix.
    pub fn resolve_task(&self, id: &str) -> CliResult<Task> {
        if let Some(task) = self.db.get_task(id)? {
            return Ok(task);
        }
        let tasks = self.db.list_tasks()?;
        let found = unique_prefix(tasks, id, |t| &t.id, "task")?;
        Ok(found)
    }

    pub fn resolve_habit(&self, id: &str) -> CliResult<HabitTemplate> {
        let habits = self.db.list_habits()?;
        let found = unique_prefix(habits, id, |h| &h.id, "habit")?;
        Ok(found)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn unique_prefix<T>(
    items: Vec<T>,
    prefix: &str,
    id_of: impl Fn(&T) -> &String,
    kind: &'static str,
) -> CliResult<T> {
    let prefix = prefix.trim();
    let mut matches: Vec<T> = items
        .into_iter()
        .filter(|item| !prefix.is_empty() && id_of(item).starts_with(prefix))
        .collect();
    match matches.len() {
        0 => Err(CoreError::NotFound {
            kind,
            id: prefix.to_string(),
        }
        .into()),
        1 => Ok(matches.remove(0)),
        n => Err(format!("{n} {kind}s match '{prefix}'; use a longer id").into()),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// First eight characters of an id, enough to address it from the CLI.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
