//! Habit templates and their repeat rules.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::{non_blank, validate_estimate, NewTask};

/// Day of the week, `0` = Sunday through `6` = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub fn new(n: u8) -> Result<Self, ValidationError> {
        if n > 6 {
            return Err(ValidationError::InvalidDayOfWeek(n));
        }
        Ok(Self(n))
    }

    pub fn of(date: NaiveDate) -> Self {
        Self(date.weekday().num_days_from_sunday() as u8)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "Sunday",
            1 => "Monday",
            2 => "Tuesday",
            3 => "Wednesday",
            4 => "Thursday",
            5 => "Friday",
            _ => "Saturday",
        }
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = ValidationError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(d: DayOfWeek) -> u8 {
        d.0
    }
}

/// How often a habit produces a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepeatRule {
    Daily,
    Weekly { day_of_week: DayOfWeek },
}

impl RepeatRule {
    /// Build a rule from its textual kind. A weekly rule with no explicit
    /// day repeats on the weekday of `today`.
    pub fn parse(kind: &str, day: Option<u8>, today: NaiveDate) -> Result<Self, ValidationError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RepeatRule::Daily),
            "weekly" => {
                let day_of_week = match day {
                    Some(n) => DayOfWeek::new(n)?,
                    None => DayOfWeek::of(today),
                };
                Ok(RepeatRule::Weekly { day_of_week })
            }
            other => Err(ValidationError::InvalidValue {
                field: "repeat".into(),
                message: format!("expected 'daily' or 'weekly', got '{other}'"),
            }),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            RepeatRule::Daily => true,
            RepeatRule::Weekly { day_of_week } => *day_of_week == DayOfWeek::of(date),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RepeatRule::Daily => "every day".into(),
            RepeatRule::Weekly { day_of_week } => format!("every {}", day_of_week.name()),
        }
    }
}

/// A recurring task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitTemplate {
    pub id: String,
    pub title: String,
    pub estimated_secs: u64,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub repeat: RepeatRule,
    /// Time of day combined with the generation date to give `scheduled_at`.
    pub scheduled_time: Option<NaiveTime>,
    /// Calendar date of the most recent expansion, if any.
    pub last_generated_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl HabitTemplate {
    /// Eligible when not yet generated on `today` and the rule matches.
    ///
    /// The gate compares dates only: editing the template later the same
    /// day does not make it eligible again.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.last_generated_date != Some(today) && self.repeat.matches(today)
    }
}

/// A habit template that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHabit {
    pub title: String,
    pub estimated_secs: u64,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub repeat: RepeatRule,
    pub scheduled_time: Option<NaiveTime>,
    pub last_generated_date: Option<NaiveDate>,
}

impl NewHabit {
    /// Template for a task marked as repeating when it was created.
    ///
    /// `last_generated_date` starts empty; the caller records the first
    /// instance's date once that task has been stored.
    pub fn from_task(task: &NewTask, repeat: RepeatRule, scheduled_time: Option<NaiveTime>) -> Self {
        Self {
            title: task.title.clone(),
            estimated_secs: task.estimated_secs,
            location: task.location.clone(),
            purpose: task.purpose.clone(),
            repeat,
            scheduled_time,
            last_generated_date: None,
        }
    }

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
