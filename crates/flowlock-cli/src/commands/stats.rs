use chrono::NaiveTime;
use clap::Subcommand;
use flowlock_core::time::format_duration;
use flowlock_core::{FocusStats, RecurrenceExpander, TaskStore};

use crate::app::{print_json, today, App, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today {
        #[arg(long)]
        json: bool,
    },
    /// All-time stats
    All {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let app = App::open()?;

    let (label, stats, json) = match action {
        StatsAction::Today { json } => {
            let midnight = RecurrenceExpander::local().scheduled_instant(today(), NaiveTime::MIN);
            ("Today", app.db.focus_stats(midnight)?, json)
        }
        StatsAction::All { json } => ("All time", app.db.focus_stats(None)?, json),
    };

    if json {
        print_json(&stats)
    } else {
        print_summary(label, &stats);
        Ok(())
    }
}

fn print_summary(label: &str, stats: &FocusStats) {
    println!("{label}");
    println!("  Focus:      {}", format_duration(stats.focus_minutes * 60));
    println!("  Sessions:   {}", stats.sessions);
    println!("  Completed:  {}", stats.completed_tasks);
    println!("  Open:       {}", stats.open_tasks);
}
