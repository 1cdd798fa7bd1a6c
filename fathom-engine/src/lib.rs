//! Fathom Engine - two-phase research orchestration
//!
//! The engine runs each research session as a resumable state machine:
//! sessions suspend while they wait for a topic or an approval decision,
//! and a resume call with the matching input moves them forward. A research
//! run is two bounded passes: planned initial queries, then one query per
//! distinct follow-up question the first pass raised. Progress streams
//! through per-session broadcast channels; suspended and finished sessions
//! are persisted so they survive a restart.

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod phase;
pub mod progress;
pub mod session;
pub mod store;

pub use dispatcher::{DispatchOutcome, SearchDispatcher};
pub use engine::{EngineBuilder, ResearchEngine};
pub use error::{EngineError, EngineResult};
pub use ledger::DedupLedger;
pub use phase::{collect_follow_ups, PhaseReport, PhaseRunner};
pub use progress::{ProgressEmitter, ProgressEvent};
pub use session::{
    ResumePayload, SessionRecord, SessionSnapshot, SessionStatus, APPROVAL_PROMPT, TOPIC_PROMPT,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
