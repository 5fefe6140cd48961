//! Rest countdowns taken between focus sessions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What the single countdown slot is timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Work on a task; completions are credited to it.
    #[default]
    Focus,
    /// A rest with no task attached; nothing is credited.
    Break,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionKind::Focus => "focus",
            SessionKind::Break => "break",
        })
    }
}

/// Guided activity offered for a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakActivity {
    Breathing,
    Doodling,
    Stretches,
}

impl BreakActivity {
    pub const ALL: [BreakActivity; 3] = [
        BreakActivity::Breathing,
        BreakActivity::Doodling,
        BreakActivity::Stretches,
    ];

    /// Length of the break when none is given explicitly.
    pub fn default_secs(self) -> u64 {
        match self {
            BreakActivity::Stretches => 2 * 60,
            BreakActivity::Breathing | BreakActivity::Doodling => 5 * 60,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            BreakActivity::Breathing => "Box Breathing",
            BreakActivity::Doodling => "Doodling",
            BreakActivity::Stretches => "Desk Stretches",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BreakActivity::Breathing => "breathing",
            BreakActivity::Doodling => "doodling",
            BreakActivity::Stretches => "stretches",
        }
    }
}

impl fmt::Display for BreakActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreakActivity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "activity".into(),
                message: format!("'{s}' is not one of breathing, doodling, stretches"),
            })
    }
}
