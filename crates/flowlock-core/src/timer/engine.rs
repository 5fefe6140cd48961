//! Countdown engine implementation.
//!
//! The engine is a deadline-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically
//! (every 200-300 ms works well) and `resync()` when the host wakes up.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Idle              (deadline reached: Completed event)
//! Running | Paused -> Idle     (mark_done: Completed event)
//! any -> Idle                  (reset keeps the task, cancel drops it)
//! any -> Running break         (start_break replaces the slot)
//! Running break -> Idle        (deadline or skip_break: BreakEnded event)
//! ```
//!
//! A break occupies the same slot as a focus session but has no task, so
//! `toggle`, `reset` and `mark_done` leave it alone.
//!
//! Remaining time is always `deadline - now`, rounded up to whole seconds,
//! so throttled or dropped ticks cannot make the countdown drift.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(SystemClock);
//! engine.start("task-1", 25 * 60);
//! // In a loop:
//! if let Some(Event::Completed(c)) = engine.tick() { /* persist c */ }
//! ```

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::breaks::{BreakActivity, SessionKind};
use super::session::{SessionId, TimerSession, TimerStatus};
use crate::clock::{Clock, SystemClock};
use crate::events::{Completion, CompletionReason, Event, TimerView};
use crate::time::ceil_secs;

/// A session thrown away by `cancel` or by starting another task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discarded {
    pub session_id: SessionId,
    pub task_id: String,
    pub elapsed_secs: u64,
}

/// Owns the single active countdown.
#[derive(Debug, Clone)]
pub struct CountdownEngine<C: Clock = SystemClock> {
    session: TimerSession,
    clock: C,
}

impl<C: Clock> CountdownEngine<C> {
    pub fn new(clock: C) -> Self {
        Self::with_session(TimerSession::default(), clock)
    }

    /// Rebuild an engine around a previously saved session.
    pub fn with_session(session: TimerSession, clock: C) -> Self {
        Self { session, clock }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn status(&self) -> TimerStatus {
        self.session.status
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.session.task_id()
    }

    pub fn remaining_secs(&self) -> u64 {
        ceil_secs(self.remaining_ms_at(&self.clock.now()))
    }

    /// Wall-clock focus time of this session so far.
    pub fn elapsed_secs(&self) -> u64 {
        let ms = self.elapsed_ms_at(&self.clock.now());
        u64::try_from(ms / 1000).unwrap_or(0)
    }

    pub fn view(&self) -> TimerView {
        let now = self.clock.now();
        TimerView {
            status: self.session.status,
            kind: self.session.kind,
            activity: self.session.activity,
            session_id: self.session.id,
            active_task_id: self.session.task_id.clone(),
            estimated_secs: self.session.estimated_secs,
            remaining_secs: ceil_secs(self.remaining_ms_at(&now)),
            elapsed_secs: u64::try_from(self.elapsed_ms_at(&now) / 1000).unwrap_or(0),
            at: now,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot(self.view())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down `estimated_secs` for `task_id`.
    ///
    /// Any other live session is discarded without crediting its progress.
    /// Starting the task that is already running or paused does nothing.
    /// `estimated_secs == 0` runs an untimed session that only `mark_done`
    /// can finish.
    pub fn start(&mut self, task_id: impl Into<String>, estimated_secs: u64) -> Option<Event> {
        let task_id = task_id.into();
        if self.session.task_id.as_deref() == Some(task_id.as_str())
            && self.session.status != TimerStatus::Idle
        {
            return None;
        }
        if let Some(dropped) = self.discard() {
            debug!(
                session = %dropped.session_id,
                task_id = %dropped.task_id,
                elapsed_secs = dropped.elapsed_secs,
                "discarding session on start"
            );
        }

        let now = self.clock.now();
        let id = self.session.id.next();
        self.session = TimerSession {
            id,
            task_id: Some(task_id.clone()),
            status: TimerStatus::Running,
            estimated_secs,
            remaining_ms: 0,
            deadline: None,
            banked_ms: 0,
            running_since: Some(now),
            kind: SessionKind::Focus,
            activity: None,
        };
        self.session.remaining_ms = self.session.estimate_ms();
        if self.session.is_timed() {
            self.session.deadline = Some(deadline_after(now, self.session.remaining_ms));
        }
        debug!(session = %id, %task_id, estimated_secs, "timer started");

        Some(Event::TimerStarted {
            session_id: id,
            task_id,
            estimated_secs,
            at: now,
        })
    }

    /// Pause a running session or resume a paused/reset one.
    ///
    /// No-op without an active task. Resuming always computes a fresh
    /// deadline from the frozen remaining time.
    pub fn toggle(&mut self) -> Option<Event> {
        let task_id = self.session.task_id.clone()?;
        let now = self.clock.now();

        match self.session.status {
            TimerStatus::Running => {
                let remaining_ms = self.remaining_ms_at(&now);
                if self.session.is_timed() && remaining_ms <= 0 {
                    return Some(self.expire(now));
                }
                self.session.remaining_ms = remaining_ms;
                self.session.deadline = None;
                self.session.banked_ms = self.elapsed_ms_at(&now);
                self.session.running_since = None;
                self.session.status = TimerStatus::Paused;
                debug!(session = %self.session.id, remaining_ms, "timer paused");
                Some(Event::TimerPaused {
                    session_id: self.session.id,
                    task_id,
                    remaining_secs: ceil_secs(remaining_ms),
                    at: now,
                })
            }
            TimerStatus::Paused | TimerStatus::Idle => {
                if self.session.is_timed() {
                    self.session.deadline = Some(deadline_after(now, self.session.remaining_ms));
                }
                self.session.running_since = Some(now);
                self.session.status = TimerStatus::Running;
                debug!(session = %self.session.id, deadline = ?self.session.deadline, "timer resumed");
                Some(Event::TimerResumed {
                    session_id: self.session.id,
                    task_id,
                    remaining_secs: ceil_secs(self.session.remaining_ms),
                    at: now,
                })
            }
        }
    }

    /// Re-evaluate the deadline. Returns the completion event on the tick
    /// that first finds no time left; later ticks return `None`.
    pub fn tick(&mut self) -> Option<Event> {
        if self.session.status != TimerStatus::Running || !self.session.is_timed() {
            return None;
        }
        let now = self.clock.now();
        if self.remaining_ms_at(&now) <= 0 {
            return Some(self.expire(now));
        }
        None
    }

    /// `tick()` for a callback scheduled by a particular session.
    /// Ticks from a cancelled or replaced session are ignored.
    pub fn tick_session(&mut self, session_id: SessionId) -> Option<Event> {
        if session_id != self.session.id || !self.session.is_active() {
            return None;
        }
        self.tick()
    }

    /// Host returned from suspension (tab hidden, laptop lid, process not
    /// running). Handled exactly like a tick.
    pub fn resync(&mut self) -> Option<Event> {
        self.tick()
    }

    /// Stop and rewind to the full estimate, keeping the task selected.
    pub fn reset(&mut self) -> Option<Event> {
        let task_id = self.session.task_id.clone()?;
        let now = self.clock.now();
        self.session.status = TimerStatus::Idle;
        self.session.remaining_ms = self.session.estimate_ms();
        self.session.deadline = None;
        self.session.banked_ms = 0;
        self.session.running_since = None;
        debug!(session = %self.session.id, "timer reset");
        Some(Event::TimerReset {
            session_id: self.session.id,
            task_id,
            remaining_secs: self.session.estimated_secs,
            at: now,
        })
    }

    /// Finish now, crediting only the time actually used.
    ///
    /// Timed sessions credit `estimate - remaining`; untimed sessions credit
    /// their wall-clock running time.
    pub fn mark_done(&mut self) -> Option<Event> {
        self.session.task_id.as_ref()?;
        let now = self.clock.now();
        let elapsed_secs = if self.session.is_timed() {
            let remaining = ceil_secs(self.remaining_ms_at(&now));
            self.session.estimated_secs.saturating_sub(remaining)
        } else {
            u64::try_from(self.elapsed_ms_at(&now) / 1000).unwrap_or(0)
        };
        Some(self.complete(CompletionReason::MarkedDone, elapsed_secs, now))
    }

    /// Drop the current session without any event.
    pub fn cancel(&mut self) -> Option<Discarded> {
        let dropped = self.discard();
        if let Some(d) = &dropped {
            debug!(session = %d.session_id, task_id = %d.task_id, "timer cancelled");
        }
        dropped
    }

    /// Cancel the current session and start another task.
    pub fn switch_to(
        &mut self,
        task_id: impl Into<String>,
        estimated_secs: u64,
    ) -> (Option<Discarded>, Option<Event>) {
        let task_id = task_id.into();
        if self.session.task_id.as_deref() == Some(task_id.as_str())
            && self.session.status != TimerStatus::Idle
        {
            return (None, None);
        }
        let dropped = self.cancel();
        (dropped, self.start(task_id, estimated_secs))
    }

    /// Count down a break of `duration_secs`, replacing whatever holds the
    /// slot. A focus session in progress is discarded without credit.
    ///
    /// A zero-length break does nothing.
    pub fn start_break(
        &mut self,
        duration_secs: u64,
        activity: Option<BreakActivity>,
    ) -> Option<Event> {
        if duration_secs == 0 {
            return None;
        }
        if let Some(dropped) = self.discard() {
            debug!(
                session = %dropped.session_id,
                task_id = %dropped.task_id,
                elapsed_secs = dropped.elapsed_secs,
                "discarding session for a break"
            );
        }

        let now = self.clock.now();
        let id = self.session.id.next();
        self.session = TimerSession {
            id,
            task_id: None,
            status: TimerStatus::Running,
            estimated_secs: duration_secs,
            remaining_ms: 0,
            deadline: None,
            banked_ms: 0,
            running_since: Some(now),
            kind: SessionKind::Break,
            activity,
        };
        self.session.remaining_ms = self.session.estimate_ms();
        self.session.deadline = Some(deadline_after(now, self.session.remaining_ms));
        debug!(session = %id, ?activity, duration_secs, "break started");

        Some(Event::BreakStarted {
            session_id: id,
            activity,
            duration_secs,
            at: now,
        })
    }

    /// End the running break early. No-op unless a break holds the slot.
    pub fn skip_break(&mut self) -> Option<Event> {
        if !self.session.is_break() {
            return None;
        }
        let now = self.clock.now();
        Some(self.end_break(true, now))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn remaining_ms_at(&self, now: &DateTime<Utc>) -> i64 {
        match (self.session.status, self.session.deadline) {
            (TimerStatus::Running, Some(deadline)) => (deadline - *now)
                .num_milliseconds()
                .min(self.session.estimate_ms()),
            _ => self.session.remaining_ms,
        }
    }

    fn elapsed_ms_at(&self, now: &DateTime<Utc>) -> i64 {
        let running = self
            .session
            .running_since
            .map(|since| (*now - since).num_milliseconds().max(0))
            .unwrap_or(0);
        self.session.banked_ms.saturating_add(running)
    }

    fn expire(&mut self, now: DateTime<Utc>) -> Event {
        if self.session.is_break() {
            return self.end_break(false, now);
        }
        let elapsed = self.session.estimated_secs;
        self.complete(CompletionReason::Expired, elapsed, now)
    }

    /// Emit the completion and leave `Running`/`Paused` in the same step,
    /// which is what keeps the event from firing twice.
    fn complete(
        &mut self,
        reason: CompletionReason,
        elapsed_secs: u64,
        now: DateTime<Utc>,
    ) -> Event {
        let completion = Completion {
            session_id: self.session.id,
            task_id: self.session.task_id.clone().unwrap_or_default(),
            elapsed_secs,
            reason,
            at: now,
        };
        self.session.clear();
        debug!(
            session = %completion.session_id,
            task_id = %completion.task_id,
            elapsed_secs,
            ?reason,
            "session completed"
        );
        Event::Completed(completion)
    }

    fn end_break(&mut self, skipped: bool, now: DateTime<Utc>) -> Event {
        let session_id = self.session.id;
        let elapsed_secs = if skipped {
            u64::try_from(self.elapsed_ms_at(&now) / 1000).unwrap_or(0)
        } else {
            self.session.estimated_secs
        };
        self.session.clear();
        debug!(session = %session_id, skipped, elapsed_secs, "break ended");
        Event::BreakEnded {
            session_id,
            skipped,
            elapsed_secs,
            at: now,
        }
    }

    /// Clear the slot. Only a focus session is reported; a break has
    /// nothing to credit.
    fn discard(&mut self) -> Option<Discarded> {
        if self.session.is_break() {
            debug!(session = %self.session.id, "break dropped");
            self.session.clear();
            return None;
        }
        let task_id = self.session.task_id.clone()?;
        let elapsed_secs = u64::try_from(self.elapsed_ms_at(&self.clock.now()) / 1000).unwrap_or(0);
        let dropped = Discarded {
            session_id: self.session.id,
            task_id,
            elapsed_secs,
        };
        self.session.clear();
        Some(dropped)
    }
}

/// `now + ms`, saturating at the latest representable instant.
fn deadline_after(now: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
    now.checked_add_signed(Duration::milliseconds(ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
