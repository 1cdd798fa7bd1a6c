//! Engine façade: session registry, lifecycle, and background research runs

use crate::dispatcher::SearchDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::ledger::DedupLedger;
use crate::phase::{collect_follow_ups, PhaseRunner};
use crate::progress::{ProgressEmitter, ProgressEvent};
use crate::session::{
    ResumePayload, SessionRecord, SessionSnapshot, SessionStatus, APPROVAL_PROMPT, TOPIC_PROMPT,
};
use crate::store::{FileSessionStore, MemorySessionStore, SessionStore};
use fathom_agents::{
    build_chat_client, ContentSummarizer, InsightExtractor, QueryPlanner, ReportSynthesizer,
    ResultEvaluator, SharedChatClient,
};
use fathom_core::{FathomConfig, ResearchPhase};
use fathom_search::{ExaProvider, SearchProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

/// Progress channel capacity per session. Slow subscribers drop the oldest
/// events first; the terminal event still arrives as long as they keep up
/// at all.
const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// Advisory step total for one full research run: four stages per pass,
/// two passes.
const RUN_TOTAL_STEPS: u32 = 8;

struct SessionEntry {
    record: SessionRecord,
    events: broadcast::Sender<ProgressEvent>,
}

impl SessionEntry {
    fn new(record: SessionRecord) -> Self {
        let (events, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self { record, events }
    }
}

type SessionRegistry = Arc<RwLock<HashMap<String, SessionEntry>>>;

/// What a successful resume call leaves to do after the registry lock is
/// released.
enum PostResume {
    Research { focus: String },
    Synthesize,
    Suspend,
    Decline,
}

/// The research engine.
///
/// Owns a per-instance session registry; there is no global state, so
/// multiple engines can coexist in one process. Research runs execute in
/// background tasks and report through per-session broadcast channels.
pub struct ResearchEngine {
    config: FathomConfig,
    chat_client: SharedChatClient,
    search_provider: Arc<dyn SearchProvider>,
    store: Arc<dyn SessionStore>,
    sessions: SessionRegistry,
}

impl ResearchEngine {
    pub fn builder(config: FathomConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Create a session parked at topic intake.
    pub async fn create_session(&self) -> EngineResult<SessionSnapshot> {
        let record = SessionRecord::new();
        let snapshot = SessionSnapshot::from(&record);

        self.store.save(&record).await?;
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(record.id.clone(), SessionEntry::new(record));
        }

        info!(session_id = %snapshot.id, "Created research session");
        Ok(snapshot)
    }

    /// Create a session and immediately resume it with a topic.
    pub async fn start_research(&self, topic: impl Into<String>) -> EngineResult<SessionSnapshot> {
        let created = self.create_session().await?;
        self.resume(&created.id, ResumePayload::topic(topic)).await
    }

    /// Resume a suspended session with the input it is waiting for.
    ///
    /// Validation and the state transition happen under one registry lock,
    /// so concurrent resumes cannot both claim a session. A payload that
    /// does not match the pending suspend point is rejected without any
    /// state change.
    pub async fn resume(
        &self,
        session_id: &str,
        payload: ResumePayload,
    ) -> EngineResult<SessionSnapshot> {
        let (snapshot, action, events) = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions
                .get_mut(session_id)
                .ok_or_else(|| EngineError::session_not_found(session_id))?;

            entry
                .record
                .validate_resume(&payload)
                .map_err(|reason| EngineError::invalid_resume(session_id, reason))?;

            let record = &mut entry.record;
            let action = match payload {
                ResumePayload::Topic { query } => {
                    record.topic = Some(query.clone());
                    record.status = SessionStatus::Researching;
                    record.prompt = None;
                    PostResume::Research { focus: query }
                }
                ResumePayload::Approval { approved: true, .. } => {
                    record.approved = Some(true);
                    record.status = SessionStatus::Researching;
                    record.prompt = None;
                    PostResume::Synthesize
                }
                ResumePayload::Approval {
                    approved: false,
                    guidance,
                } => {
                    record.revision += 1;
                    if record.revision > self.config.research.max_revisions {
                        info!(
                            session_id = %session_id,
                            revision = record.revision,
                            max_revisions = self.config.research.max_revisions,
                            "Rejection exceeded the revision budget, declining session"
                        );
                        record.status = SessionStatus::Declined;
                        record.approved = Some(false);
                        record.prompt = None;
                        PostResume::Decline
                    } else {
                        match guidance.filter(|g| !g.trim().is_empty()) {
                            Some(guidance) => {
                                record.topic = Some(guidance.clone());
                                record.status = SessionStatus::Researching;
                                record.prompt = None;
                                PostResume::Research { focus: guidance }
                            }
                            None => {
                                record.status = SessionStatus::AwaitingTopic;
                                record.prompt = Some(TOPIC_PROMPT.to_string());
                                PostResume::Suspend
                            }
                        }
                    }
                }
            };
            record.touch();

            (
                SessionSnapshot::from(&entry.record),
                action,
                entry.events.clone(),
            )
        };

        match action {
            PostResume::Research { focus } => {
                self.spawn_research(session_id.to_string(), focus);
            }
            PostResume::Synthesize => {
                self.spawn_synthesis(session_id.to_string());
            }
            PostResume::Suspend => {
                self.persist(session_id).await;
                ProgressEmitter::new(session_id, events, 0).status("awaiting_topic", TOPIC_PROMPT);
            }
            PostResume::Decline => {
                self.persist(session_id).await;
                ProgressEmitter::new(session_id, events, 0)
                    .finish("Research declined after exceeding the revision budget");
            }
        }

        Ok(snapshot)
    }

    pub async fn get_session(&self, session_id: &str) -> EngineResult<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| EngineError::session_not_found(session_id))?;
        Ok(SessionSnapshot::from(&entry.record))
    }

    /// Snapshots of every known session, oldest first.
    pub async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        let mut snapshots: Vec<SessionSnapshot> = sessions
            .values()
            .map(|entry| SessionSnapshot::from(&entry.record))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.created_at);
        snapshots
    }

    /// Remove a session from the registry and the store. Abandoning a
    /// suspended or running session this way is allowed; an in-flight run
    /// discovers the removal when it tries to write back and gives up.
    pub async fn delete_session(&self, session_id: &str) -> EngineResult<()> {
        {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(session_id)
                .ok_or_else(|| EngineError::session_not_found(session_id))?;
        }
        self.store.delete(session_id).await?;

        info!(session_id = %session_id, "Deleted session");
        Ok(())
    }

    /// Subscribe to a session's progress events. No history replay: events
    /// emitted before the subscription are gone.
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> EngineResult<broadcast::Receiver<ProgressEvent>> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| EngineError::session_not_found(session_id))?;
        Ok(entry.events.subscribe())
    }

    fn spawn_research(&self, session_id: String, focus: String) {
        let sessions = Arc::clone(&self.sessions);
        let store = Arc::clone(&self.store);
        let chat_client = Arc::clone(&self.chat_client);
        let provider = Arc::clone(&self.search_provider);
        let config = self.config.clone();

        tokio::spawn(async move {
            Self::drive_research(sessions, store, chat_client, provider, config, session_id, focus)
                .await;
        });
    }

    fn spawn_synthesis(&self, session_id: String) {
        let sessions = Arc::clone(&self.sessions);
        let store = Arc::clone(&self.store);
        let chat_client = Arc::clone(&self.chat_client);

        tokio::spawn(async move {
            Self::drive_synthesis(sessions, store, chat_client, session_id).await;
        });
    }

    /// One full research run: initial pass, follow-up pass, suspend at the
    /// approval prompt. Never fails; provider trouble degrades inside the
    /// passes and persistence trouble is recorded on the session.
    async fn drive_research(
        sessions: SessionRegistry,
        store: Arc<dyn SessionStore>,
        chat_client: SharedChatClient,
        provider: Arc<dyn SearchProvider>,
        config: FathomConfig,
        session_id: String,
        focus: String,
    ) {
        let (mut record, events) = match Self::checkout(&sessions, &session_id).await {
            Some(parts) => parts,
            None => return,
        };

        let emitter = ProgressEmitter::new(&session_id, events, RUN_TOTAL_STEPS);
        info!(
            session_id = %session_id,
            topic = %focus,
            revision = record.revision,
            "Starting research run"
        );

        record.phase = ResearchPhase::Initial;
        record.last_error = None;

        let ledger = Arc::new(Mutex::new(record.ledger.clone()));
        let runner = Self::build_runner(&chat_client, &provider, &config, Arc::clone(&ledger));

        let phase1 = runner.run_initial(&focus, &emitter).await;
        let follow_ups = collect_follow_ups(&phase1.learnings);
        let mut problems = phase1.errors;
        record.completed_queries.extend(phase1.completed_queries);
        record.search_results.extend(phase1.search_results);
        record.learnings.extend(phase1.learnings);

        if follow_ups.is_empty() {
            info!(session_id = %session_id, "No follow-up questions raised, skipping follow-up pass");
        } else {
            record.phase = ResearchPhase::FollowUp;
            let phase2 = runner
                .run_follow_up(follow_ups, &record.completed_queries, &emitter)
                .await;
            // Follow-ups raised by this pass's learnings are deliberately
            // not collected; research runs exactly two passes.
            problems.extend(phase2.errors);
            record.completed_queries.extend(phase2.completed_queries);
            record.search_results.extend(phase2.search_results);
            record.learnings.extend(phase2.learnings);
        }

        if !problems.is_empty() {
            warn!(
                session_id = %session_id,
                count = problems.len(),
                first = %problems[0],
                "Some queries ended without usable results"
            );
        }

        record.ledger = ledger.lock().await.clone();
        record.status = SessionStatus::AwaitingApproval;
        record.prompt = Some(APPROVAL_PROMPT.to_string());
        record.touch();

        if let Err(e) = store.save(&record).await {
            warn!(session_id = %session_id, error = %e, "Failed to persist suspended session");
            record.last_error = Some(format!("Failed to persist session: {}", e));
        }

        let summary = if problems.is_empty() {
            format!(
                "Collected {} learnings from {} queries. {}",
                record.learnings.len(),
                record.completed_queries.len(),
                APPROVAL_PROMPT
            )
        } else {
            format!(
                "Collected {} learnings from {} queries ({} had problems). {}",
                record.learnings.len(),
                record.completed_queries.len(),
                problems.len(),
                APPROVAL_PROMPT
            )
        };

        Self::write_back(&sessions, &session_id, record).await;
        emitter.status("awaiting_approval", summary);
    }

    /// Approval aftermath: write the final report and complete the session.
    async fn drive_synthesis(
        sessions: SessionRegistry,
        store: Arc<dyn SessionStore>,
        chat_client: SharedChatClient,
        session_id: String,
    ) {
        let (mut record, events) = match Self::checkout(&sessions, &session_id).await {
            Some(parts) => parts,
            None => return,
        };

        let emitter = ProgressEmitter::new(&session_id, events, 1);
        emitter.status("synthesizing", "Writing the final report");

        let reporter = ReportSynthesizer::new(chat_client);
        let topic = record.topic.clone().unwrap_or_default();
        let queries: Vec<String> = record
            .completed_queries
            .iter()
            .map(|q| q.text.clone())
            .collect();
        let report = reporter
            .synthesize(&topic, &record.learnings, &queries)
            .await;

        record.report = Some(report);
        record.status = SessionStatus::Completed;
        record.prompt = None;
        record.touch();
        emitter.step("Report ready");

        if let Err(e) = store.save(&record).await {
            warn!(session_id = %session_id, error = %e, "Failed to persist completed session");
            record.last_error = Some(format!("Failed to persist session: {}", e));
        }

        let learning_count = record.learnings.len();
        Self::write_back(&sessions, &session_id, record).await;
        emitter.finish(format!(
            "Research completed with {} learnings",
            learning_count
        ));
    }

    fn build_runner(
        chat_client: &SharedChatClient,
        provider: &Arc<dyn SearchProvider>,
        config: &FathomConfig,
        ledger: Arc<Mutex<DedupLedger>>,
    ) -> PhaseRunner {
        PhaseRunner::new(
            QueryPlanner::new(
                Arc::clone(chat_client),
                config.research.initial_query_count,
            ),
            SearchDispatcher::new(
                Arc::clone(provider),
                ContentSummarizer::new(Arc::clone(chat_client)),
                ledger,
                config.search.clone(),
                config.research.clone(),
            ),
            ResultEvaluator::new(Arc::clone(chat_client)),
            InsightExtractor::new(Arc::clone(chat_client)),
            config.research.concurrency,
        )
    }

    /// Clone a session's working state for a background run.
    async fn checkout(
        sessions: &SessionRegistry,
        session_id: &str,
    ) -> Option<(SessionRecord, broadcast::Sender<ProgressEvent>)> {
        let sessions_guard = sessions.read().await;
        match sessions_guard.get(session_id) {
            Some(entry) => Some((entry.record.clone(), entry.events.clone())),
            None => {
                warn!(session_id = %session_id, "Session vanished before its run started");
                None
            }
        }
    }

    async fn write_back(sessions: &SessionRegistry, session_id: &str, record: SessionRecord) {
        let mut sessions_guard = sessions.write().await;
        match sessions_guard.get_mut(session_id) {
            Some(entry) => entry.record = record,
            None => {
                warn!(session_id = %session_id, "Session deleted while its run was in flight")
            }
        }
    }

    async fn persist(&self, session_id: &str) {
        let record = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).map(|entry| entry.record.clone())
        };
        if let Some(record) = record {
            if let Err(e) = self.store.save(&record).await {
                warn!(session_id = %session_id, error = %e, "Failed to persist session");
            }
        }
    }

    /// Rehydrate the registry from the store.
    async fn restore_sessions(&self) -> EngineResult<()> {
        let records = self.store.list().await?;
        let count = records.len();

        let mut sessions = self.sessions.write().await;
        for mut record in records {
            // A running session cannot survive a restart; park it back at
            // topic intake so it can be resumed.
            if record.status == SessionStatus::Researching {
                record.status = SessionStatus::AwaitingTopic;
                record.prompt = Some(TOPIC_PROMPT.to_string());
                record.last_error = Some("Research run interrupted by restart".to_string());
            }
            sessions.insert(record.id.clone(), SessionEntry::new(record));
        }

        if count > 0 {
            info!(count = count, "Restored sessions from storage");
        }
        Ok(())
    }
}

/// Builds a `ResearchEngine`, defaulting any collaborator that was not
/// injected. Tests swap in mock providers and stores through the same
/// methods production code uses.
pub struct EngineBuilder {
    config: FathomConfig,
    chat_client: Option<SharedChatClient>,
    search_provider: Option<Arc<dyn SearchProvider>>,
    store: Option<Arc<dyn SessionStore>>,
}

impl EngineBuilder {
    pub fn new(config: FathomConfig) -> Self {
        Self {
            config,
            chat_client: None,
            search_provider: None,
            store: None,
        }
    }

    pub fn with_chat_client(mut self, client: SharedChatClient) -> Self {
        self.chat_client = Some(client);
        self
    }

    pub fn with_search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search_provider = Some(provider);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> EngineResult<ResearchEngine> {
        self.config.validate()?;

        let chat_client = match self.chat_client {
            Some(client) => client,
            None => build_chat_client(&self.config.llm).await?,
        };

        let search_provider = match self.search_provider {
            Some(provider) => provider,
            None => Arc::new(ExaProvider::new(self.config.search.clone())?),
        };

        let store: Arc<dyn SessionStore> = match self.store {
            Some(store) => store,
            None if self.config.storage.persist_sessions => {
                Arc::new(FileSessionStore::new(&self.config.storage.data_dir)?)
            }
            None => Arc::new(MemorySessionStore::new()),
        };

        let engine = ResearchEngine {
            config: self.config,
            chat_client,
            search_provider,
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        };
        engine.restore_sessions().await?;

        Ok(engine)
    }
}
