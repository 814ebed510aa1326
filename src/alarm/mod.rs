//! Inactivity alarm: the escalation engine and the clock it runs on.

mod clock;
mod engine;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::ManualClock;
pub use engine::{AutoMoveReport, EngineSettings, EscalationEngine, MAX_DINGS_PER_CYCLE};
