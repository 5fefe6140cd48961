use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use flowlock_core::time::{format_clock, format_duration};
use flowlock_core::{
    BreakActivity, CountdownEngine, Discarded, Event, SessionKind, TaskStore, TimerStatus,
    TimerView,
};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app::{print_json, short_id, App, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the countdown for a task, discarding any other session
    Start {
        /// Task ID or unique prefix
        id: String,
    },
    /// Pause a running countdown or resume a paused one
    Toggle,
    /// Stop and rewind to the full estimate
    Reset,
    /// Finish the active task now, crediting the time used
    Done,
    /// Drop the active session without crediting it
    Cancel,
    /// Take a break with no task attached, replacing any running session
    Break {
        /// breathing, doodling or stretches
        #[arg(long, short)]
        activity: Option<BreakActivity>,
        /// Length in minutes (default: the activity's length, else timer.break_minutes)
        #[arg(long, short, value_parser = clap::value_parser!(u64).range(1..=60))]
        minutes: Option<u64>,
    },
    /// End the current break early
    Skip,
    /// Print current timer state as JSON
    Status,
    /// Show a live countdown until it completes or Ctrl-C
    Watch,
}

pub fn run(action: TimerAction) -> CliResult {
    let app = App::open_with_habits()?;
    let mut engine = app.load_engine();

    // Time kept passing while no command was running.
    let expired = engine.resync();
    if let Some(event) = &expired {
        if let Some(completion) = event.completion() {
            app.record(completion);
        }
        app.save_engine(&engine)?;
        if !matches!(action, TimerAction::Status) {
            match event {
                Event::Completed(completion) => eprintln!(
                    "note: countdown for {} finished while no command was running",
                    completion.task_id
                ),
                Event::BreakEnded { .. } => {
                    eprintln!("note: break finished while no command was running")
                }
                _ => {}
            }
        }
    }

    match action {
        TimerAction::Start { id } => {
            let task = app.resolve_task(&id)?;
            if task.completed {
                return Err(format!("task {} is already completed", task.id).into());
            }
            let (dropped, event) = engine.switch_to(task.id.clone(), task.estimated_secs);
            if let Some(dropped) = dropped {
                note_discarded(&dropped);
            }
            emit(&app, &engine, event)?;
        }
        TimerAction::Break { activity, minutes } => {
            if let Some(dropped) = engine.cancel() {
                note_discarded(&dropped);
            }
            let secs = break_secs(minutes, activity, app.config.timer.break_minutes);
            let event = engine.start_break(secs, activity);
            emit(&app, &engine, event)?;
        }
        TimerAction::Skip => {
            let event = engine.skip_break();
            emit(&app, &engine, event)?;
        }
        TimerAction::Toggle => {
            let event = engine.toggle();
            emit(&app, &engine, event)?;
        }
        TimerAction::Reset => {
            let event = engine.reset();
            emit(&app, &engine, event)?;
        }
        TimerAction::Done => {
            let event = engine.mark_done();
            emit(&app, &engine, event)?;
        }
        TimerAction::Cancel => {
            match engine.cancel() {
                Some(dropped) => print_json(&serde_json::json!({
                    "type": "timer_cancelled",
                    "session_id": dropped.session_id,
                    "task_id": dropped.task_id,
                    "elapsed_secs": dropped.elapsed_secs,
                }))?,
                None => print_json(&engine.snapshot())?,
            }
            app.save_engine(&engine)?;
        }
        TimerAction::Status => {
            match &expired {
                Some(event) => print_json(event)?,
                None => print_json(&engine.snapshot())?,
            }
        }
        TimerAction::Watch => {
            if !engine.session().is_active() {
                println!("No countdown running.");
                return Ok(());
            }
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(watch(&app))?;
        }
    }

    Ok(())
}

fn note_discarded(dropped: &Discarded) {
    warn!(
        task_id = %dropped.task_id,
        elapsed_secs = dropped.elapsed_secs,
        "previous session discarded without credit"
    );
    eprintln!(
        "note: discarded {} of progress on {}",
        format_duration(dropped.elapsed_secs),
        dropped.task_id
    );
}

/// An explicit length wins, then the activity's own length, then config.
fn break_secs(minutes: Option<u64>, activity: Option<BreakActivity>, default_minutes: u64) -> u64 {
    match (minutes, activity) {
        (Some(minutes), _) => minutes * 60,
        (None, Some(activity)) => activity.default_secs(),
        (None, None) => default_minutes * 60,
    }
}

/// Persist the engine, write any completion through, and print the event.
/// Commands that do not apply to the current state print a snapshot.
fn emit(app: &App, engine: &CountdownEngine, event: Option<Event>) -> CliResult {
    if let Some(completion) = event.as_ref().and_then(Event::completion) {
        app.record(completion);
    }
    app.save_engine(engine)?;
    match event {
        Some(event) => print_json(&event),
        None => print_json(&engine.snapshot()),
    }
}

/// Redraw the countdown at `timer.tick_interval_ms`.
///
/// The session is reloaded on every tick so `toggle` from another terminal
/// shows up here. Only a completion or the end of a break is written back.
/// With `timer.auto_break` a finished focus countdown rolls straight into a
/// break and the watch carries on.
async fn watch(app: &App) -> CliResult {
    let period = Duration::from_millis(app.config.timer.tick_interval_ms);
    let initial = app.load_engine();
    let mut session_id = initial.session_id();
    let mut title = label(app, &initial)?;

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_tick = Instant::now();
    let pad = " ".repeat(12);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                return Ok(());
            }
            _ = interval.tick() => {
                let mut engine = app.load_engine();
                if engine.session_id() != session_id || !engine.session().is_active() {
                    println!("\nSession ended.");
                    return Ok(());
                }

                let gap = last_tick.elapsed();
                last_tick = Instant::now();
                let event = if gap > period * 4 {
                    debug!(gap_ms = gap.as_millis() as u64, "resyncing after a stall");
                    engine.resync()
                } else {
                    engine.tick_session(session_id)
                };

                match event {
                    Some(Event::Completed(completion)) => {
                        app.record(&completion);
                        ring(app);
                        println!(
                            "\r{title}: done, {} focused{pad}",
                            format_duration(completion.elapsed_secs)
                        );
                        if !app.config.timer.auto_break {
                            app.save_engine(&engine)?;
                            println!("Take a break: flowlock timer break [--activity breathing|doodling|stretches]");
                            return Ok(());
                        }
                        engine.start_break(app.config.timer.break_minutes * 60, None);
                        app.save_engine(&engine)?;
                        info!(session = %engine.session_id(), "break started automatically");
                        session_id = engine.session_id();
                        title = label(app, &engine)?;
                        continue;
                    }
                    Some(Event::BreakEnded { .. }) => {
                        app.save_engine(&engine)?;
                        ring(app);
                        println!("\rBreak over.{pad}");
                        print_up_next(app)?;
                        return Ok(());
                    }
                    _ => {}
                }

                print!("\r{}", render(&engine.view(), &title));
                std::io::stdout().flush()?;
            }
        }
    }
}

fn ring(app: &App) {
    if app.config.timer.bell {
        print!("\x07");
    }
}

/// Task title for a focus session, activity title for a break.
fn label(app: &App, engine: &CountdownEngine) -> CliResult<String> {
    if engine.session().is_break() {
        let title = engine.session().activity().map_or("Break", BreakActivity::title);
        return Ok(title.to_string());
    }
    Ok(match engine.active_task_id() {
        Some(id) => app.db.get_task(id)?.map(|t| t.title).unwrap_or_default(),
        None => String::new(),
    })
}

/// After a break: offer the open tasks to continue with, or call it a day.
fn print_up_next(app: &App) -> CliResult {
    let open: Vec<_> = app
        .db
        .list_tasks()?
        .into_iter()
        .filter(|t| !t.completed)
        .collect();
    if open.is_empty() {
        println!("All tasks done. Nice work.");
        return Ok(());
    }
    println!("Up next:");
    for task in &open {
        println!("  {}  {}", short_id(&task.id), task.title);
    }
    println!("Continue with: flowlock timer start <id>");
    Ok(())
}

fn render(view: &TimerView, title: &str) -> String {
    let timed = view.estimated_secs > 0;
    let clock = if timed {
        format_clock(view.remaining_secs)
    } else {
        format_clock(view.elapsed_secs)
    };
    let state = match view.status {
        TimerStatus::Running if view.kind == SessionKind::Break => "break",
        TimerStatus::Running if timed => "remaining",
        TimerStatus::Running => "elapsed",
        TimerStatus::Paused => "paused",
        TimerStatus::Idle => "idle",
    };
    format!("{clock} {state}  {title}    ")
}
