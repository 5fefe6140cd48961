//! Integration tests for driving the countdown and persisting its completions.

mod common;

use chrono::{TimeZone, Utc};
use common::FlakyStore;
use flowlock_core::shell::{self, CompletionStep};
use flowlock_core::{
    CompletionReason, CountdownEngine, Database, Event, ManualClock, NewTask, TaskStore,
};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap())
}

#[test]
fn natural_expiry_credits_full_estimate() {
    let db = Database::open_memory().unwrap();
    let task = db.create_task(&NewTask::new("Draft", 1500)).unwrap();
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());

    engine.start(task.id.clone(), task.estimated_secs);
    clock.advance_secs(1501);
    let event = engine.tick().unwrap();
    let completion = event.completion().unwrap();
    assert_eq!(completion.reason, CompletionReason::Expired);

    let report = shell::record_completion(&db, completion);
    assert!(report.is_complete());
    assert_eq!(report.time_spent_secs, Some(1500));
    assert_eq!(report.focus_session.as_ref().unwrap().duration_minutes, 25);

    let stored = db.get_task(&task.id).unwrap().unwrap();
    assert!(stored.completed);
    assert_eq!(stored.time_spent_secs, 1500);
}

#[test]
fn early_finish_credits_used_time_only() {
    let db = Database::open_memory().unwrap();
    let task = db.create_task(&NewTask::new("Email", 1800)).unwrap();
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());

    engine.start(task.id.clone(), 1800);
    clock.advance_secs(700);
    let event = engine.mark_done().unwrap();
    let report = shell::record_completion(&db, event.completion().unwrap());

    assert_eq!(report.elapsed_secs, 700);
    assert_eq!(report.focus_session.unwrap().duration_minutes, 11);
    assert_eq!(db.get_task(&task.id).unwrap().unwrap().time_spent_secs, 700);
}

#[test]
fn sub_minute_sessions_are_not_logged() {
    let db = Database::open_memory().unwrap();
    let task = db.create_task(&NewTask::new("Quick", 600)).unwrap();
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());

    engine.start(task.id.clone(), 600);
    clock.advance_secs(45);
    let event = engine.mark_done().unwrap();
    let report = shell::record_completion(&db, event.completion().unwrap());

    assert!(report.is_complete());
    assert!(report.focus_session.is_none());
    assert_eq!(db.focus_stats(None).unwrap().sessions, 0);
    assert!(db.get_task(&task.id).unwrap().unwrap().completed);
}

#[test]
fn focus_log_failure_keeps_completion() {
    let store = FlakyStore::new();
    let task = store.create_task(&NewTask::new("Report", 900)).unwrap();
    store.fail_focus_log.set(true);
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());

    engine.start(task.id.clone(), 900);
    clock.advance_secs(900);
    let event = engine.resync().unwrap();
    let report = shell::record_completion(&store, event.completion().unwrap());

    assert!(report.marked_completed);
    assert_eq!(report.time_spent_secs, Some(900));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].step, CompletionStep::LogFocusSession);
    assert!(store.get_task(&task.id).unwrap().unwrap().completed);
}

#[test]
fn each_write_is_attempted_even_after_a_failure() {
    let store = FlakyStore::new();
    let task = store.create_task(&NewTask::new("Plan", 600)).unwrap();
    store.fail_set_completed.set(true);
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());

    engine.start(task.id.clone(), 600);
    clock.advance_secs(300);
    let event = engine.mark_done().unwrap();
    let report = shell::record_completion(&store, event.completion().unwrap());

    assert!(!report.marked_completed);
    assert_eq!(report.time_spent_secs, Some(300));
    assert!(report.focus_session.is_some());
    assert_eq!(report.failures[0].step, CompletionStep::MarkCompleted);
}

#[test]
fn time_spent_accumulates_across_sessions() {
    let db = Database::open_memory().unwrap();
    let task = db.create_task(&NewTask::new("Thesis", 0)).unwrap();
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());

    for minutes in [20, 40] {
        engine.start(task.id.clone(), 0);
        clock.advance_secs(minutes * 60);
        let event = engine.mark_done().unwrap();
        shell::record_completion(&db, event.completion().unwrap());
    }

    assert_eq!(db.get_task(&task.id).unwrap().unwrap().time_spent_secs, 3600);
    assert_eq!(db.focus_stats(None).unwrap().focus_minutes, 60);
}

#[test]
fn finish_day_clears_completed_tasks() {
    let db = Database::open_memory().unwrap();
    let done = db.create_task(&NewTask::new("Done", 0)).unwrap();
    db.create_task(&NewTask::new("Open", 0)).unwrap();
    db.set_completed(&done.id, true).unwrap();

    assert_eq!(shell::finish_day(&db).unwrap(), 1);
    let remaining = db.list_tasks().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Open");
}

#[test]
fn events_render_as_tagged_json() {
    let clock = clock();
    let mut engine = CountdownEngine::new(clock.clone());
    engine.start("t-1", 300);
    clock.advance_secs(300);
    let event = engine.tick().unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "completed");
    assert_eq!(json["task_id"], "t-1");
    assert_eq!(json["elapsed_secs"], 300);
    assert_eq!(json["reason"], "expired");

    let snapshot = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(snapshot["type"], "state_snapshot");
    assert_eq!(snapshot["status"], "idle");
    assert!(snapshot["active_task_id"].is_null());
    assert!(matches!(engine.snapshot(), Event::StateSnapshot(_)));
}
