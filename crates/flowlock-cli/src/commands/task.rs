//! Task management commands for CLI.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::Subcommand;
use flowlock_core::shell::{self, Repeat};
use flowlock_core::time::{format_duration, parse_duration, parse_time_of_day};
use flowlock_core::{NewTask, RecurrenceExpander, RepeatRule, Task, TaskPatch, TaskStore};
use tracing::warn;

use crate::app::{print_json, short_id, today, App, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Estimated time: bare minutes or units like 1h30m; 0 tracks without a countdown
        #[arg(long, short, default_value = "25m")]
        estimate: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        purpose: Option<String>,
        /// Time of day (HH:MM); a time already past today means tomorrow
        #[arg(long)]
        at: Option<String>,
        /// Make this a habit: daily or weekly
        #[arg(long)]
        repeat: Option<String>,
        /// Weekday for weekly habits, 0 = Sunday (default: today)
        #[arg(long, requires = "repeat")]
        day: Option<u8>,
        #[arg(long)]
        json: bool,
    },
    /// List tasks
    List {
        /// Hide completed tasks
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show one task
    Show {
        /// Task ID or unique prefix
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Edit a task; an empty string clears an optional field
    Edit {
        /// Task ID or unique prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        estimate: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete a task
    Delete {
        /// Task ID or unique prefix
        id: String,
    },
    /// Mark a task completed, crediting the countdown if it is the active task
    Done {
        /// Task ID or unique prefix
        id: String,
        /// Mark as not completed instead
        #[arg(long)]
        undo: bool,
    },
    /// Remove completed tasks from the list
    FinishDay,
}

pub fn run(action: TaskAction) -> CliResult {
    let app = App::open_with_habits()?;

    match action {
        TaskAction::Add {
            title,
            estimate,
            location,
            purpose,
            at,
            repeat,
            day,
            json,
        } => {
            let estimated_secs = parse_duration(&estimate)?;
            let time = at.as_deref().map(parse_time_of_day).transpose()?;
            let expander = RecurrenceExpander::local();
            let repeat = repeat
                .map(|kind| RepeatRule::parse(&kind, day, today()))
                .transpose()?
                .map(|rule| Repeat {
                    rule,
                    scheduled_time: time,
                });
            // Habit instances are scheduled by the shell on their own day.
            let scheduled_at = match repeat {
                Some(_) => None,
                None => time.and_then(|t| {
                    let date = schedule_date(t, Local::now().naive_local());
                    expander.scheduled_instant(date, t)
                }),
            };

            let new_task = NewTask::new(title, estimated_secs)
                .with_location(location)
                .with_purpose(purpose)
                .with_scheduled_at(scheduled_at);
            let created = shell::create_task(&app.db, &expander, new_task, repeat, Utc::now())?;

            if json {
                match (&created.task, &created.habit) {
                    (Some(task), _) => print_json(task)?,
                    (None, Some(habit)) => print_json(habit)?,
                    (None, None) => {}
                }
            } else {
                if let Some(task) = &created.task {
                    println!("Task created: {}", task.id);
                }
                if let Some(habit) = &created.habit {
                    println!("Habit created: {} (repeats {})", habit.id, habit.repeat.describe());
                    if created.task.is_none() {
                        println!("The first task appears on its next scheduled day.");
                    }
                }
            }
        }
        TaskAction::List { pending, json } => {
            let tasks: Vec<Task> = app
                .db
                .list_tasks()?
                .into_iter()
                .filter(|t| !(pending && t.completed))
                .collect();
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                let active = app.load_engine().active_task_id().map(str::to_string);
                for task in &tasks {
                    println!("{}", list_line(task, active.as_deref() == Some(task.id.as_str())));
                }
            }
        }
        TaskAction::Show { id, json } => {
            let task = app.resolve_task(&id)?;
            if json {
                print_json(&task)?;
            } else {
                print_details(&task);
            }
        }
        TaskAction::Edit {
            id,
            title,
            estimate,
            location,
            purpose,
            at,
            json,
        } => {
            let mut task = app.resolve_task(&id)?;
            let scheduled_at = match at.as_deref().map(str::trim) {
                None => None,
                Some("") => Some(None),
                Some(text) => {
                    let t = parse_time_of_day(text)?;
                    let date = schedule_date(t, Local::now().naive_local());
                    Some(RecurrenceExpander::local().scheduled_instant(date, t))
                }
            };
            let patch = TaskPatch {
                title,
                estimated_secs: estimate.as_deref().map(parse_duration).transpose()?,
                location: location.map(Some),
                purpose: purpose.map(Some),
                scheduled_at,
            };
            let estimate_changed = patch.estimated_secs.is_some();
            patch.apply(&mut task)?;
            app.db.update_task(&task)?;

            if estimate_changed && app.load_engine().active_task_id() == Some(task.id.as_str()) {
                println!("The current countdown keeps its estimate until the task is started again.");
            }

            if json {
                print_json(&task)?;
            } else {
                println!("Task updated: {}", task.id);
            }
        }
        TaskAction::Delete { id } => {
            let task = app.resolve_task(&id)?;
            let mut engine = app.load_engine();
            if engine.active_task_id() == Some(task.id.as_str()) {
                if let Some(dropped) = engine.cancel() {
                    warn!(task_id = %dropped.task_id, elapsed_secs = dropped.elapsed_secs, "countdown cancelled with deleted task");
                }
                app.save_engine(&engine)?;
            }
            app.db.delete_task(&task.id)?;
            println!("Task deleted: {}", task.id);
        }
        TaskAction::Done { id, undo } => {
            let task = app.resolve_task(&id)?;
            if undo {
                app.db.set_completed(&task.id, false)?;
                println!("Task reopened: {}", task.id);
                return Ok(());
            }

            let mut engine = app.load_engine();
            let completion = if engine.active_task_id() == Some(task.id.as_str()) {
                engine.mark_done().and_then(|e| e.completion().cloned())
            } else {
                None
            };
            match completion {
                Some(completion) => {
                    let report = app.record(&completion);
                    app.save_engine(&engine)?;
                    println!(
                        "Task completed: {} ({} focused)",
                        task.id,
                        format_duration(report.elapsed_secs)
                    );
                }
                None => {
                    app.db.set_completed(&task.id, true)?;
                    println!("Task completed: {}", task.id);
                }
            }
        }
        TaskAction::FinishDay => {
            let removed = shell::finish_day(&app.db)?;
            println!("Cleared {removed} completed task(s).");
        }
    }

    Ok(())
}

/// The date a wall-clock time refers to: today, or tomorrow once it has passed.
fn schedule_date(time: NaiveTime, now: NaiveDateTime) -> NaiveDate {
    let date = now.date();
    if time <= now.time() {
        date.succ_opt().unwrap_or(date)
    } else {
        date
    }
}

fn list_line(task: &Task, active: bool) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let pointer = if active { ">" } else { " " };
    let estimate = if task.is_timed() {
        format_duration(task.estimated_secs)
    } else {
        "open".to_string()
    };
    let mut line = format!(
        "{pointer}{mark} {}  {}  {estimate}",
        short_id(&task.id),
        task.title
    );
    if task.time_spent_secs > 0 {
        line.push_str(&format!("  spent {}", format_duration(task.time_spent_secs)));
    }
    if let Some(location) = &task.location {
        line.push_str(&format!("  @ {location}"));
    }
    if task.habit_id.is_some() {
        line.push_str("  (habit)");
    }
    line
}

fn print_details(task: &Task) {
    println!("ID:        {}", task.id);
    println!("Title:     {}", task.title);
    println!("Status:    {}", if task.completed { "completed" } else { "open" });
    if task.is_timed() {
        println!("Estimate:  {}", format_duration(task.estimated_secs));
    } else {
        println!("Estimate:  none (stopwatch)");
    }
    println!("Spent:     {}", format_duration(task.time_spent_secs));
    if let Some(location) = &task.location {
        println!("Location:  {location}");
    }
    if let Some(purpose) = &task.purpose {
        println!("Purpose:   {purpose}");
    }
    if let Some(at) = task.scheduled_at {
        println!("Scheduled: {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    if let Some(habit_id) = &task.habit_id {
        println!("Habit:     {habit_id}");
    }
}
