//! Session state machine types

use crate::ledger::DedupLedger;
use chrono::{DateTime, Utc};
use fathom_core::{Learning, Query, ResearchPhase, SearchResult};
use serde::{Deserialize, Serialize};

/// Prompt shown while a session waits for its topic.
pub const TOPIC_PROMPT: &str = "What would you like to research?";

/// Prompt shown while a session waits for an approval decision.
pub const APPROVAL_PROMPT: &str =
    "Is this research sufficient? If not, provide additional guidance.";

/// Lifecycle states of a research session.
///
/// The two `Awaiting*` states are suspend points: the session holds no task
/// and waits for a `resume` call. `Completed` and `Declined` are terminal.
/// Transitions are monotonic except for the single controlled loop from
/// `AwaitingApproval` back to `AwaitingTopic` on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingTopic,
    Researching,
    AwaitingApproval,
    Completed,
    Declined,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Declined)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(
            self,
            SessionStatus::AwaitingTopic | SessionStatus::AwaitingApproval
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::AwaitingTopic => "awaiting_topic",
            SessionStatus::Researching => "researching",
            SessionStatus::AwaitingApproval => "awaiting_approval",
            SessionStatus::Completed => "completed",
            SessionStatus::Declined => "declined",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input supplied when resuming a suspended session.
///
/// The payload shape must match the pending suspend point; a mismatch is
/// rejected without touching session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResumePayload {
    /// Answer to `TOPIC_PROMPT`.
    Topic { query: String },
    /// Answer to `APPROVAL_PROMPT`. Guidance accompanies a rejection and
    /// becomes the topic of the next research pass.
    Approval {
        approved: bool,
        #[serde(default)]
        guidance: Option<String>,
    },
}

impl ResumePayload {
    pub fn topic(query: impl Into<String>) -> Self {
        ResumePayload::Topic {
            query: query.into(),
        }
    }

    pub fn approve() -> Self {
        ResumePayload::Approval {
            approved: true,
            guidance: None,
        }
    }

    pub fn reject(guidance: Option<String>) -> Self {
        ResumePayload::Approval {
            approved: false,
            guidance,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResumePayload::Topic { .. } => "topic",
            ResumePayload::Approval { .. } => "approval",
        }
    }
}

/// The aggregate root: everything one research session has accumulated.
///
/// Mutated only by the engine's driver task and the resume handlers, and
/// persisted whole at every suspend boundary. The ledger and learnings
/// survive approval rejections; nothing here is ever reset while the
/// session lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// The topic of the most recent research pass. Rejection guidance
    /// replaces it for the next pass.
    pub topic: Option<String>,
    pub status: SessionStatus,
    /// Stays `Initial` when phase 1 produced no follow-ups and the
    /// follow-up pass was skipped.
    pub phase: ResearchPhase,
    /// How many approval rejections have looped this session back.
    pub revision: u32,
    /// `None` until an approval decision resolves the workflow.
    pub approved: Option<bool>,
    pub ledger: DedupLedger,
    /// Insertion order preserved; feeds follow-up planning and the report.
    pub learnings: Vec<Learning>,
    /// Every query that ran to completion, including zero-result ones.
    /// Duplicate-skipped queries are not re-appended.
    pub completed_queries: Vec<Query>,
    /// Summarized results that passed URL dedup, across all passes.
    pub search_results: Vec<SearchResult>,
    pub report: Option<String>,
    /// The prompt for whatever input the session currently awaits.
    pub prompt: Option<String>,
    /// Marker for an internal failure during a research pass. The session
    /// still reaches its decision point when this is set.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a fresh session parked at topic intake.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: None,
            status: SessionStatus::AwaitingTopic,
            phase: ResearchPhase::Initial,
            revision: 0,
            approved: None,
            ledger: DedupLedger::new(),
            learnings: Vec::new(),
            completed_queries: Vec::new(),
            search_results: Vec::new(),
            report: None,
            prompt: Some(TOPIC_PROMPT.to_string()),
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Check a resume payload against the pending suspend point.
    ///
    /// Returns the rejection reason on mismatch; the record itself is never
    /// mutated here.
    pub fn validate_resume(&self, payload: &ResumePayload) -> Result<(), String> {
        match (self.status, payload) {
            (SessionStatus::AwaitingTopic, ResumePayload::Topic { .. }) => Ok(()),
            (SessionStatus::AwaitingApproval, ResumePayload::Approval { .. }) => Ok(()),
            (SessionStatus::AwaitingTopic, other) => Err(format!(
                "session awaits a topic, got a {} payload",
                other.kind()
            )),
            (SessionStatus::AwaitingApproval, other) => Err(format!(
                "session awaits an approval decision, got a {} payload",
                other.kind()
            )),
            (SessionStatus::Researching, _) => {
                Err("session is researching and cannot be resumed".to_string())
            }
            (status, _) => Err(format!("session already finished as {}", status)),
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a session for external consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionSnapshot {
    pub id: String,
    pub topic: Option<String>,
    pub status: SessionStatus,
    pub phase: ResearchPhase,
    pub revision: u32,
    pub approved: Option<bool>,
    pub prompt: Option<String>,
    pub learnings: Vec<Learning>,
    pub completed_queries: Vec<Query>,
    pub search_results: Vec<SearchResult>,
    pub report: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionSnapshot {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            topic: record.topic.clone(),
            status: record.status,
            phase: record.phase,
            revision: record.revision,
            approved: record.approved,
            prompt: record.prompt.clone(),
            learnings: record.learnings.clone(),
            completed_queries: record.completed_queries.clone(),
            search_results: record.search_results.clone(),
            report: record.report.clone(),
            last_error: record.last_error.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_awaits_topic_with_prompt() {
        let record = SessionRecord::new();
        assert_eq!(record.status, SessionStatus::AwaitingTopic);
        assert_eq!(record.prompt.as_deref(), Some(TOPIC_PROMPT));
        assert_eq!(record.revision, 0);
        assert!(record.approved.is_none());
    }

    #[test]
    fn resume_validation_accepts_matching_shapes() {
        let mut record = SessionRecord::new();
        assert!(record.validate_resume(&ResumePayload::topic("solar")).is_ok());

        record.status = SessionStatus::AwaitingApproval;
        assert!(record.validate_resume(&ResumePayload::approve()).is_ok());
        assert!(record
            .validate_resume(&ResumePayload::reject(Some("go deeper".into())))
            .is_ok());
    }

    #[test]
    fn resume_validation_rejects_mismatched_shapes() {
        let mut record = SessionRecord::new();
        assert!(record.validate_resume(&ResumePayload::approve()).is_err());

        record.status = SessionStatus::AwaitingApproval;
        assert!(record.validate_resume(&ResumePayload::topic("x")).is_err());

        record.status = SessionStatus::Researching;
        assert!(record.validate_resume(&ResumePayload::topic("x")).is_err());

        record.status = SessionStatus::Completed;
        assert!(record.validate_resume(&ResumePayload::approve()).is_err());
    }

    #[test]
    fn payload_wire_shape_is_tagged() {
        let json = serde_json::to_value(ResumePayload::reject(Some("more".into()))).unwrap();
        assert_eq!(json["kind"], "approval");
        assert_eq!(json["approved"], false);
        assert_eq!(json["guidance"], "more");

        let parsed: ResumePayload =
            serde_json::from_str(r#"{"kind":"topic","query":"wind power"}"#).unwrap();
        assert!(matches!(parsed, ResumePayload::Topic { query } if query == "wind power"));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::AwaitingApproval).unwrap(),
            "\"awaiting_approval\""
        );
    }
}
