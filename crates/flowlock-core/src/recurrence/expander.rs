//! Expansion of habit templates into today's task instances.
//!
//! [`RecurrenceExpander::expand`] is a pure function of the templates and
//! the date. Callers persist the returned tasks and then write back each
//! [`GeneratedMark`]. If a write-back is lost, the next expansion on the same
//! date regenerates that template's task: delivery is at-least-once.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::habit::HabitTemplate;
use crate::task::NewTask;

/// `last_generated_date` update for one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMark {
    pub template_id: String,
    pub date: NaiveDate,
}

/// Result of one expansion. `tasks[i]` was produced by `marks[i]`'s template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub tasks: Vec<NewTask>,
    pub marks: Vec<GeneratedMark>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Each new task paired with the write-back that must follow it.
    pub fn into_pairs(self) -> impl Iterator<Item = (NewTask, GeneratedMark)> {
        self.tasks.into_iter().zip(self.marks)
    }
}

/// Turns habit templates into concrete tasks for a given day.
///
/// `tz` is the zone in which a template's `scheduled_time` is read.
#[derive(Debug, Clone)]
pub struct RecurrenceExpander<Tz: TimeZone = Local> {
    tz: Tz,
}

impl RecurrenceExpander<Local> {
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl<Tz: TimeZone> RecurrenceExpander<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn expand(&self, templates: &[HabitTemplate], today: NaiveDate) -> Expansion {
        let mut expansion = Expansion::default();
        for template in templates.iter().filter(|t| t.is_due(today)) {
            expansion.tasks.push(NewTask {
                title: template.title.clone(),
                estimated_secs: template.estimated_secs,
                location: template.location.clone(),
                purpose: template.purpose.clone(),
                scheduled_at: template
                    .scheduled_time
                    .and_then(|time| self.scheduled_instant(today, time)),
                habit_id: Some(template.id.clone()),
            });
            expansion.marks.push(GeneratedMark {
                template_id: template.id.clone(),
                date: today,
            });
        }
        expansion
    }

    /// Wall-clock reading of `now` in this expander's zone.
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.tz).naive_local()
    }

    /// `date` at `time` in this expander's zone, as an absolute instant.
    ///
    /// An ambiguous local time (clocks going back) resolves to the earlier
    /// instant; a skipped one (clocks going forward) moves one hour later.
    pub fn scheduled_instant(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        let naive = date.and_time(time);
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
    }
}
