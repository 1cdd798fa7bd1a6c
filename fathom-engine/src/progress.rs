//! Typed progress notifications for running sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::broadcast;

/// One progress notification from a research session.
///
/// Events for a session arrive in the order they were emitted, and a
/// terminal event (`Complete` or `Error`) is always the last one a run
/// produces. `Step` events are advisory pacing hints; consumers must not
/// treat step arithmetic as a completion guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The session moved to a new stage of work.
    Status {
        session_id: String,
        stage: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Advisory tick inside a run. `step` increases monotonically up to
    /// `total`.
    Step {
        session_id: String,
        step: u32,
        total: u32,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// The run reached a terminal state without an internal failure.
    Complete {
        session_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// The run aborted. Per-provider failures degrade silently and do not
    /// produce this; only engine-level faults do.
    Error {
        session_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    pub fn session_id(&self) -> &str {
        match self {
            ProgressEvent::Status { session_id, .. }
            | ProgressEvent::Step { session_id, .. }
            | ProgressEvent::Complete { session_id, .. }
            | ProgressEvent::Error { session_id, .. } => session_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
        )
    }
}

/// Emits ordered progress events for one session run.
///
/// `finish` and `fail` consume the emitter, which keeps the terminal event
/// last by construction. Sending never blocks and never fails; events for
/// sessions nobody subscribed to are dropped.
pub struct ProgressEmitter {
    session_id: String,
    sender: broadcast::Sender<ProgressEvent>,
    step: AtomicU32,
    total_steps: u32,
}

impl ProgressEmitter {
    pub fn new(
        session_id: impl Into<String>,
        sender: broadcast::Sender<ProgressEvent>,
        total_steps: u32,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
            step: AtomicU32::new(0),
            total_steps,
        }
    }

    pub fn status(&self, stage: &str, message: impl Into<String>) {
        let _ = self.sender.send(ProgressEvent::Status {
            session_id: self.session_id.clone(),
            stage: stage.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn step(&self, message: impl Into<String>) {
        let step = self
            .step
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1)
            .min(self.total_steps);

        let _ = self.sender.send(ProgressEvent::Step {
            session_id: self.session_id.clone(),
            step,
            total: self.total_steps,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn finish(self, message: impl Into<String>) {
        let _ = self.sender.send(ProgressEvent::Complete {
            session_id: self.session_id,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn fail(self, message: impl Into<String>) {
        let _ = self.sender.send(ProgressEvent::Error {
            session_id: self.session_id,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}
