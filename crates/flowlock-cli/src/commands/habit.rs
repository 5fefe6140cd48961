//! Habit template commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use flowlock_core::shell;
use flowlock_core::time::format_duration;
use flowlock_core::{HabitTemplate, RecurrenceExpander, TaskStore};

use crate::app::{print_json, short_id, today, App, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// List habit templates
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a habit template; tasks it already produced are kept
    Delete {
        /// Habit ID or unique prefix
        id: String,
    },
    /// Generate the habit tasks due on a date up to today (default: today)
    Generate {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: HabitAction) -> CliResult {
    let app = App::open()?;

    match action {
        HabitAction::List { json } => {
            let habits = app.db.list_habits()?;
            if json {
                print_json(&habits)?;
            } else if habits.is_empty() {
                println!("No habits.");
            } else {
                let today = today();
                for habit in &habits {
                    println!("{}", list_line(habit, today));
                }
            }
        }
        HabitAction::Delete { id } => {
            let habit = app.resolve_habit(&id)?;
            app.db.delete_habit(&habit.id)?;
            println!("Habit deleted: {}", habit.id);
        }
        HabitAction::Generate { date, json } => {
            let today = today();
            let date = date.unwrap_or(today);
            if date > today {
                return Err(format!("cannot generate habits for {date}: it is after today ({today})").into());
            }
            let report = shell::generate_today(&app.db, &RecurrenceExpander::local(), date)?;
            if json {
                print_json(&report)?;
            } else {
                println!("Generated {} task(s) for {date}.", report.created.len());
                for task in &report.created {
                    println!("  {}  {}", short_id(&task.id), task.title);
                }
                for id in &report.failed {
                    eprintln!("warning: could not create a task for habit {id}");
                }
                for id in &report.unmarked {
                    eprintln!("warning: habit {id} may be generated again today");
                }
            }
        }
    }

    Ok(())
}

fn list_line(habit: &HabitTemplate, today: NaiveDate) -> String {
    let estimate = if habit.estimated_secs > 0 {
        format_duration(habit.estimated_secs)
    } else {
        "open".to_string()
    };
    let mut line = format!(
        "{}  {}  {estimate}  {}",
        short_id(&habit.id),
        habit.title,
        habit.repeat.describe()
    );
    if let Some(time) = habit.scheduled_time {
        line.push_str(&format!(" at {}", time.format("%H:%M")));
    }
    if habit.is_due(today) {
        line.push_str("  (due)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flowlock_core::RepeatRule;

    fn habit(estimated_secs: u64) -> HabitTemplate {
        HabitTemplate {
            id: "0123456789abcdef".into(),
            title: "Journal".into(),
            estimated_secs,
            location: None,
            purpose: None,
            repeat: RepeatRule::Daily,
            scheduled_time: None,
            last_generated_date: None,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    #[test]
    fn untimed_habit_is_listed_as_open() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let line = list_line(&habit(0), today);
        assert!(line.contains("Journal  open  every day"), "{line}");
        assert!(!line.contains("0m"));
        assert!(line.ends_with("(due)"));
    }

    #[test]
    fn timed_habit_shows_its_estimate() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut timed = habit(1800);
        timed.last_generated_date = Some(today);
        let line = list_line(&timed, today);
        assert!(line.contains("Journal  30m  every day"), "{line}");
        assert!(!line.contains("(due)"));
    }
}
