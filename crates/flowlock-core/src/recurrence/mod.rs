mod expander;
mod habit;

pub use expander::{Expansion, GeneratedMark, RecurrenceExpander};
pub use habit::{DayOfWeek, HabitTemplate, NewHabit, RepeatRule};
