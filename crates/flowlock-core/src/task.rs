//! Tasks and the focus-session log.
//!
//! A [`Task`] is the unit of work the countdown runs against. Tasks produced
//! by habit expansion carry a `habit_id` back-reference; one-off tasks do not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Shortest countdown a timed task may be configured with.
pub const MIN_ESTIMATE_SECS: u64 = 5 * 60;

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    /// Seconds of focused work credited across all sessions. Never decreases.
    pub time_spent_secs: u64,
    /// Countdown length; `0` means untimed.
    pub estimated_secs: u64,
    pub location: Option<String>,
    pub purpose: Option<String>,
    /// Intended start. Advisory only.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub habit_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_timed(&self) -> bool {
        self.estimated_secs > 0
    }
}

/// A task that has not been persisted yet; the store assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub estimated_secs: u64,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub habit_id: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, estimated_secs: u64) -> Self {
        Self {
            title: title.into(),
            estimated_secs,
            location: None,
            purpose: None,
            scheduled_at: None,
            habit_id: None,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = non_blank(location);
        self
    }

    pub fn with_purpose(mut self, purpose: Option<String>) -> Self {
        self.purpose = non_blank(purpose);
        self
    }

    pub fn with_scheduled_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.scheduled_at = at;
        self
    }

    /// Trim text fields and check the creation-time invariants.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        validate_estimate(self.estimated_secs)?;
        self.location = non_blank(self.location);
        self.purpose = non_blank(self.purpose);
        Ok(self)
    }
}

/// Partial update applied by `task edit`. `None` leaves a field unchanged;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub estimated_secs: Option<u64>,
    pub location: Option<Option<String>>,
    pub purpose: Option<Option<String>>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ValidationError::EmptyTitle);
            }
            task.title = title;
        }
        if let Some(secs) = self.estimated_secs {
            validate_estimate(secs)?;
            task.estimated_secs = secs;
        }
        if let Some(location) = self.location {
            task.location = non_blank(location);
        }
        if let Some(purpose) = self.purpose {
            task.purpose = non_blank(purpose);
        }
        if let Some(at) = self.scheduled_at {
            task.scheduled_at = at;
        }
        Ok(())
    }
}

pub fn validate_estimate(secs: u64) -> Result<(), ValidationError> {
    if secs != 0 && secs < MIN_ESTIMATE_SECS {
        return Err(ValidationError::EstimateTooShort {
            secs,
            min: MIN_ESTIMATE_SECS,
        });
    }
    Ok(())
}

/// Empty or whitespace-only text means "absent".
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// An entry in the append-only focus log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: String,
    pub task_id: Option<String>,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFocusSession {
    pub task_id: Option<String>,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

impl NewFocusSession {
    /// Whole minutes of `elapsed_secs`, or `None` when under one minute
    /// (such sessions are not logged).
    pub fn from_elapsed(
        task_id: Option<String>,
        elapsed_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Option<Self> {
        let minutes = elapsed_secs / 60;
        if minutes < 1 {
            return None;
        }
        Some(Self {
            task_id,
            duration_minutes: u32::try_from(minutes).unwrap_or(u32::MAX),
            completed_at,
        })
    }
}
