//! Persistent state of the single active countdown.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::breaks::{BreakActivity, SessionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        })
    }
}

/// Identifies one `start`. Ticks carrying an older id are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One countdown run against a task, or a break with no task.
///
/// Remaining time is never stored while running: it is derived from
/// `deadline`. While paused or idle the frozen value lives in `remaining_ms`.
/// The session id survives after the task is cleared so the next `start`
/// can issue a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub(crate) id: SessionId,
    pub(crate) task_id: Option<String>,
    pub(crate) status: TimerStatus,
    pub(crate) estimated_secs: u64,
    pub(crate) remaining_ms: i64,
    /// Set only while running a timed session.
    pub(crate) deadline: Option<DateTime<Utc>>,
    /// Focus time from earlier running stretches of this session.
    #[serde(default)]
    pub(crate) banked_ms: i64,
    #[serde(default)]
    pub(crate) running_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) kind: SessionKind,
    #[serde(default)]
    pub(crate) activity: Option<BreakActivity>,
}

impl TimerSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn estimated_secs(&self) -> u64 {
        self.estimated_secs
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn activity(&self) -> Option<BreakActivity> {
        self.activity
    }

    pub fn is_break(&self) -> bool {
        self.kind == SessionKind::Break
    }

    pub fn is_active(&self) -> bool {
        self.task_id.is_some() || self.is_break()
    }

    pub fn is_timed(&self) -> bool {
        self.estimated_secs > 0
    }

    pub(crate) fn estimate_ms(&self) -> i64 {
        i64::try_from(self.estimated_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    /// Drop the task but keep the id counter.
    pub(crate) fn clear(&mut self) {
        *self = TimerSession {
            id: self.id,
            ..TimerSession::default()
        };
    }
}
