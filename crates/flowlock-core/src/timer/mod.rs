mod breaks;
mod engine;
mod session;

pub use breaks::{BreakActivity, SessionKind};
pub use engine::{CountdownEngine, Discarded};
pub use session::{SessionId, TimerSession, TimerStatus};
