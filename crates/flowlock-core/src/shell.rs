//! Glue between the pure core and a [`TaskStore`].
//!
//! Completion is three separate writes: mark completed, add time spent,
//! log the focus session. A failure in one is logged and reported but does
//! not undo or skip the others; the completed flag is the record the user
//! cares about most.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::Completion;
use crate::recurrence::{HabitTemplate, NewHabit, RecurrenceExpander, RepeatRule};
use crate::store::TaskStore;
use crate::task::{FocusSession, NewFocusSession, NewTask, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStep {
    MarkCompleted,
    AddTimeSpent,
    LogFocusSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub step: CompletionStep,
    pub message: String,
}

/// Outcome of [`record_completion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub task_id: String,
    pub elapsed_secs: u64,
    pub marked_completed: bool,
    /// New `time_spent_secs` total, when that write succeeded.
    pub time_spent_secs: Option<u64>,
    /// `None` when the session was under a minute or the write failed.
    pub focus_session: Option<FocusSession>,
    pub failures: Vec<WriteFailure>,
}

impl CompletionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn record_completion<S: TaskStore + ?Sized>(
    store: &S,
    completion: &Completion,
) -> CompletionReport {
    let task_id = completion.task_id.as_str();
    let mut report = CompletionReport {
        task_id: task_id.to_string(),
        elapsed_secs: completion.elapsed_secs,
        marked_completed: false,
        time_spent_secs: None,
        focus_session: None,
        failures: Vec::new(),
    };

    match store.set_completed(task_id, true) {
        Ok(()) => report.marked_completed = true,
        Err(e) => {
            warn!(%task_id, error = %e, "failed to mark task completed");
            report.failures.push(WriteFailure {
                step: CompletionStep::MarkCompleted,
                message: e.to_string(),
            });
        }
    }

    match store.add_time_spent(task_id, completion.elapsed_secs) {
        Ok(total) => report.time_spent_secs = Some(total),
        Err(e) => {
            warn!(%task_id, error = %e, "failed to credit time spent");
            report.failures.push(WriteFailure {
                step: CompletionStep::AddTimeSpent,
                message: e.to_string(),
            });
        }
    }

    if let Some(entry) = NewFocusSession::from_elapsed(
        Some(task_id.to_string()),
        completion.elapsed_secs,
        completion.at,
    ) {
        match store.log_focus_session(&entry) {
            Ok(logged) => report.focus_session = Some(logged),
            Err(e) => {
                warn!(%task_id, error = %e, "failed to log focus session");
                report.failures.push(WriteFailure {
                    step: CompletionStep::LogFocusSession,
                    message: e.to_string(),
                });
            }
        }
    }

    report
}

/// Outcome of [`generate_today`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub created: Vec<Task>,
    /// Templates whose task could not be inserted; they stay eligible.
    pub failed: Vec<String>,
    /// Templates whose task was inserted but whose `last_generated_date`
    /// write-back failed. The next run on the same day duplicates them.
    pub unmarked: Vec<String>,
}

/// Materialize today's habit instances and record that they were generated.
///
/// Each task is inserted before its template is marked, so a crash between
/// the two produces a duplicate later rather than a lost instance.
pub fn generate_today<S, Tz>(
    store: &S,
    expander: &RecurrenceExpander<Tz>,
    today: NaiveDate,
) -> Result<GenerationReport>
where
    S: TaskStore + ?Sized,
    Tz: TimeZone,
{
    let templates = store.list_habits()?;
    let expansion = expander.expand(&templates, today);
    let mut report = GenerationReport::default();

    for (task, mark) in expansion.into_pairs() {
        let created = match store.create_task(&task) {
            Ok(created) => created,
            Err(e) => {
                warn!(template_id = %mark.template_id, error = %e, "failed to create habit task");
                report.failed.push(mark.template_id);
                continue;
            }
        };
        if let Err(e) = store.set_last_generated(&mark.template_id, mark.date) {
            warn!(
                template_id = %mark.template_id,
                error = %e,
                "habit task created but generation date not saved; it may be generated again today"
            );
            report.unmarked.push(mark.template_id);
        }
        info!(task_id = %created.id, title = %created.title, "generated habit task");
        report.created.push(created);
    }

    Ok(report)
}

/// Repeat settings supplied when a task is created as a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repeat {
    pub rule: RepeatRule,
    pub scheduled_time: Option<NaiveTime>,
}

/// Outcome of [`create_task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    /// `None` when a habit's first occurrence falls on a later day.
    pub task: Option<Task>,
    pub habit: Option<HabitTemplate>,
}

/// Validate and store a task. With `repeat`, store the habit template
/// instead and create today's instance only when the rule matches today
/// and its scheduled time has not passed yet. Either way today counts as
/// generated, so the first later instance comes from [`generate_today`].
pub fn create_task<S, Tz>(
    store: &S,
    expander: &RecurrenceExpander<Tz>,
    task: NewTask,
    repeat: Option<Repeat>,
    now: DateTime<Utc>,
) -> Result<Created>
where
    S: TaskStore + ?Sized,
    Tz: TimeZone,
{
    let mut task = task.validate()?;
    let Some(repeat) = repeat else {
        return Ok(Created {
            task: Some(store.create_task(&task)?),
            habit: None,
        });
    };

    let local_now = expander.local_now(now);
    let today = local_now.date();
    let due_today = repeat.rule.matches(today)
        && repeat
            .scheduled_time
            .map_or(true, |time| time > local_now.time());

    let habit = NewHabit::from_task(&task, repeat.rule, repeat.scheduled_time).validate()?;
    let mut habit = store.create_habit(&habit)?;

    let first = if due_today {
        task.habit_id = Some(habit.id.clone());
        task.scheduled_at = repeat
            .scheduled_time
            .and_then(|time| expander.scheduled_instant(today, time));
        Some(store.create_task(&task)?)
    } else {
        info!(habit_id = %habit.id, "first habit instance deferred to its next day");
        None
    };

    match store.set_last_generated(&habit.id, today) {
        Ok(()) => habit.last_generated_date = Some(today),
        Err(e) => warn!(habit_id = %habit.id, error = %e, "failed to record first habit instance"),
    }
    Ok(Created {
        task: first,
        habit: Some(habit),
    })
}

/// Clear the finished tasks off the list.
pub fn finish_day<S: TaskStore + ?Sized>(store: &S) -> Result<usize> {
    let removed = store.delete_completed()?;
    info!(removed, "finished day");
    Ok(removed)
}
