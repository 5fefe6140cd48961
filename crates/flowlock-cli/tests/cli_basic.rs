//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::Command;

use chrono::{Datelike, Local};
use serde_json::Value;
use tempfile::TempDir;

/// Today's weekday as the CLI numbers it, 0 = Sunday.
fn today_weekday() -> u32 {
    Local::now().date_naive().weekday().num_days_from_sunday()
}

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_flowlock"))
            .args(args)
            .env("FLOWLOCK_DATA_DIR", self.dir.path())
            .env_remove("FLOWLOCK_LOG")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        (stdout, stderr, code)
    }

    fn ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> Value {
        let stdout = self.ok(args);
        serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON from {args:?}: {e}\n{stdout}"))
    }

    fn add(&self, title: &str, extra: &[&str]) -> String {
        let mut args = vec!["task", "add", title, "--json"];
        args.extend_from_slice(extra);
        let task = self.json(&args);
        task["id"].as_str().expect("id").to_string()
    }
}

#[test]
fn test_task_add_and_list() {
    let cli = Cli::new();
    let id = cli.add("Write report", &["--estimate", "45m", "--location", "Office"]);

    let tasks = cli.json(&["task", "list", "--json"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], id.as_str());
    assert_eq!(tasks[0]["estimated_secs"], 2700);
    assert_eq!(tasks[0]["location"], "Office");
    assert_eq!(tasks[0]["completed"], false);

    let human = cli.ok(&["task", "list"]);
    assert!(human.contains("Write report"));
    assert!(human.contains("45m"));
}

#[test]
fn test_task_add_rejects_short_estimate_and_blank_title() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["task", "add", "Quick", "--estimate", "2m"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, _, code) = cli.run(&["task", "add", "   "]);
    assert_eq!(code, 1);

    let tasks = cli.json(&["task", "list", "--json"]);
    assert!(tasks.as_array().unwrap().is_empty());
}

#[test]
fn test_task_show_by_prefix_and_edit() {
    let cli = Cli::new();
    let id = cli.add("Draft", &["--purpose", "ship it"]);

    let shown = cli.json(&["task", "show", &id[..8], "--json"]);
    assert_eq!(shown["id"], id.as_str());

    let edited = cli.json(&[
        "task", "edit", &id, "--title", "Final draft", "--purpose", "", "--json",
    ]);
    assert_eq!(edited["title"], "Final draft");
    assert!(edited["purpose"].is_null());
}

#[test]
fn test_timer_start_pause_done() {
    let cli = Cli::new();
    let id = cli.add("Focus", &["--estimate", "25m"]);

    let started = cli.json(&["timer", "start", &id]);
    assert_eq!(started["type"], "timer_started");
    assert_eq!(started["estimated_secs"], 1500);

    let status = cli.json(&["timer", "status"]);
    assert_eq!(status["type"], "state_snapshot");
    assert_eq!(status["status"], "running");
    assert_eq!(status["active_task_id"], id.as_str());

    let paused = cli.json(&["timer", "toggle"]);
    assert_eq!(paused["type"], "timer_paused");

    let done = cli.json(&["timer", "done"]);
    assert_eq!(done["type"], "completed");
    assert_eq!(done["reason"], "marked_done");
    assert_eq!(done["task_id"], id.as_str());

    let task = cli.json(&["task", "show", &id, "--json"]);
    assert_eq!(task["completed"], true);

    let status = cli.json(&["timer", "status"]);
    assert_eq!(status["status"], "idle");
    assert!(status["active_task_id"].is_null());
}

#[test]
fn test_timer_without_task_is_a_no_op() {
    let cli = Cli::new();
    let toggled = cli.json(&["timer", "toggle"]);
    assert_eq!(toggled["type"], "state_snapshot");
    assert_eq!(toggled["status"], "idle");

    let done = cli.json(&["timer", "done"]);
    assert_eq!(done["type"], "state_snapshot");
}

#[test]
fn test_switching_tasks_discards_previous_session() {
    let cli = Cli::new();
    let first = cli.add("First", &[]);
    let second = cli.add("Second", &[]);

    cli.ok(&["timer", "start", &first]);
    let started = cli.json(&["timer", "start", &second]);
    assert_eq!(started["task_id"], second.as_str());

    let first_task = cli.json(&["task", "show", &first, "--json"]);
    assert_eq!(first_task["completed"], false);
    assert_eq!(first_task["time_spent_secs"], 0);
}

#[test]
fn test_completed_task_cannot_be_started() {
    let cli = Cli::new();
    let id = cli.add("Done already", &[]);
    cli.ok(&["task", "done", &id]);
    let (_, stderr, code) = cli.run(&["timer", "start", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already completed"));
}

#[test]
fn test_untimed_task_counts_up() {
    let cli = Cli::new();
    let id = cli.add("Inbox", &["--estimate", "0"]);
    let started = cli.json(&["timer", "start", &id]);
    assert_eq!(started["estimated_secs"], 0);

    let status = cli.json(&["timer", "status"]);
    assert_eq!(status["status"], "running");
    assert_eq!(status["remaining_secs"], 0);

    let done = cli.json(&["timer", "done"]);
    assert_eq!(done["type"], "completed");
}

#[test]
fn test_repeating_task_creates_habit_once_per_day() {
    let cli = Cli::new();
    let id = cli.add("Stretch", &["--estimate", "10m", "--repeat", "daily"]);

    let habits = cli.json(&["habit", "list", "--json"]);
    let habits = habits.as_array().unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0]["repeat"]["type"], "daily");

    let task = cli.json(&["task", "show", &id, "--json"]);
    assert_eq!(task["habit_id"], habits[0]["id"]);

    // Today's instance is the task just created.
    let report = cli.json(&["habit", "generate", "--json"]);
    assert!(report["created"].as_array().unwrap().is_empty());
    let tasks = cli.json(&["task", "list", "--json"]);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

#[test]
fn test_habit_generate_rejects_future_dates() {
    let cli = Cli::new();
    cli.add("Stretch", &["--repeat", "daily"]);
    let (_, stderr, code) = cli.run(&["habit", "generate", "--date", "2099-01-01"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("after today"), "{stderr}");
}

#[test]
fn test_backfilling_a_past_day_does_not_reopen_today() {
    let cli = Cli::new();
    cli.add("Stretch", &["--repeat", "daily"]);

    let past = cli.json(&["habit", "generate", "--date", "2000-01-01", "--json"]);
    assert_eq!(past["created"].as_array().unwrap().len(), 1);
    let again = cli.json(&["habit", "generate", "--json"]);
    assert!(again["created"].as_array().unwrap().is_empty());

    let tasks = cli.json(&["task", "list", "--json"]);
    assert_eq!(tasks.as_array().unwrap().len(), 2);
}

#[test]
fn test_weekly_habit_requires_valid_day() {
    let cli = Cli::new();
    let (_, _, code) = cli.run(&["task", "add", "Review", "--repeat", "weekly", "--day", "7"]);
    assert_eq!(code, 1);

    let today = today_weekday();
    cli.add("Review", &["--repeat", "weekly", "--day", &today.to_string()]);
    let habits = cli.json(&["habit", "list", "--json"]);
    assert_eq!(habits[0]["repeat"]["day_of_week"], today);

    let tasks = cli.json(&["task", "list", "--json"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["habit_id"], habits[0]["id"]);
}

#[test]
fn test_weekly_habit_for_another_day_waits() {
    let cli = Cli::new();
    let other_day = (today_weekday() + 1) % 7;
    let (stdout, stderr, code) = cli.run(&[
        "task", "add", "Review", "--repeat", "weekly", "--day", &other_day.to_string(),
    ]);
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("Habit created"));
    assert!(!stdout.contains("Task created"));

    let tasks = cli.json(&["task", "list", "--json"]);
    assert!(tasks.as_array().unwrap().is_empty());
    let report = cli.json(&["habit", "generate", "--json"]);
    assert!(report["created"].as_array().unwrap().is_empty());
    let habits = cli.json(&["habit", "list", "--json"]);
    assert_eq!(habits.as_array().unwrap().len(), 1);
}

#[test]
fn test_break_replaces_focus_and_can_be_skipped() {
    let cli = Cli::new();
    let id = cli.add("Focus", &[]);
    cli.ok(&["timer", "start", &id]);

    let started = cli.json(&["timer", "break", "--activity", "stretches"]);
    assert_eq!(started["type"], "break_started");
    assert_eq!(started["activity"], "stretches");
    assert_eq!(started["duration_secs"], 120);

    let status = cli.json(&["timer", "status"]);
    assert_eq!(status["kind"], "break");
    assert_eq!(status["status"], "running");
    assert!(status["active_task_id"].is_null());

    // Task commands leave a break alone.
    let toggled = cli.json(&["timer", "toggle"]);
    assert_eq!(toggled["type"], "state_snapshot");
    assert_eq!(toggled["status"], "running");

    let skipped = cli.json(&["timer", "skip"]);
    assert_eq!(skipped["type"], "break_ended");
    assert_eq!(skipped["skipped"], true);

    let status = cli.json(&["timer", "status"]);
    assert_eq!(status["status"], "idle");
    assert_eq!(status["kind"], "focus");
    let skipped = cli.json(&["timer", "skip"]);
    assert_eq!(skipped["type"], "state_snapshot");

    let task = cli.json(&["task", "show", &id, "--json"]);
    assert_eq!(task["time_spent_secs"], 0);
}

#[test]
fn test_break_length_sources() {
    let cli = Cli::new();
    let started = cli.json(&["timer", "break", "--minutes", "1", "--activity", "breathing"]);
    assert_eq!(started["duration_secs"], 60);

    cli.ok(&["config", "set", "timer.break_minutes", "10"]);
    let started = cli.json(&["timer", "break"]);
    assert_eq!(started["duration_secs"], 600);
    assert!(started["activity"].is_null());

    let (_, _, code) = cli.run(&["timer", "break", "--minutes", "0"]);
    assert_ne!(code, 0);
    let (_, _, code) = cli.run(&["timer", "break", "--activity", "yoga"]);
    assert_ne!(code, 0);
}

#[test]
fn test_finish_day_clears_completed() {
    let cli = Cli::new();
    let keep = cli.add("Keep", &[]);
    let drop = cli.add("Drop", &[]);
    cli.ok(&["task", "done", &drop]);

    cli.ok(&["task", "finish-day"]);
    let tasks = cli.json(&["task", "list", "--json"]);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], keep.as_str());
}

#[test]
fn test_delete_active_task_cancels_timer() {
    let cli = Cli::new();
    let id = cli.add("Short lived", &[]);
    cli.ok(&["timer", "start", &id]);
    cli.ok(&["task", "delete", &id]);

    let status = cli.json(&["timer", "status"]);
    assert_eq!(status["status"], "idle");
    assert!(status["active_task_id"].is_null());
}

#[test]
fn test_stats_all_json() {
    let cli = Cli::new();
    let stats = cli.json(&["stats", "all", "--json"]);
    assert_eq!(stats["sessions"], 0);
    assert_eq!(stats["focus_minutes"], 0);
}

#[test]
fn test_config_get_set() {
    let cli = Cli::new();
    assert_eq!(cli.ok(&["config", "get", "timer.tick_interval_ms"]).trim(), "250");

    cli.ok(&["config", "set", "timer.bell", "false"]);
    assert_eq!(cli.ok(&["config", "get", "timer.bell"]).trim(), "false");

    let (_, _, code) = cli.run(&["config", "set", "timer.tick_interval_ms", "1"]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["config", "get", "timer.nope"]);
    assert_eq!(code, 1);

    assert_eq!(cli.ok(&["config", "get", "timer.auto_break"]).trim(), "false");
    let (_, _, code) = cli.run(&["config", "set", "timer.break_minutes", "90"]);
    assert_eq!(code, 1);

    cli.ok(&["config", "reset"]);
    assert_eq!(cli.ok(&["config", "get", "timer.bell"]).trim(), "true");
}
