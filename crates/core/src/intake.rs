use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::lead::{BriefAnswers, ChatIdentity, Lead, LeadId, NewLead};
use crate::segment::Segment;

/// Persistence collaborator boundary: an append-only store for captured leads
/// and their secondary brief-answer events. No query surface is needed here.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn insert_lead(&self, record: &NewLead) -> Result<LeadId, StoreError>;
    async fn insert_lead_event(
        &self,
        lead_id: &LeadId,
        answers: &BriefAnswers,
    ) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("lead store unavailable: {0}")]
    Unavailable(String),
    #[error("lead store rejected the write: {0}")]
    Rejected(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("unknown segment `{0}`")]
    UnknownSegment(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Completed conversational brief, pre-validated by the dialogue flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotSubmission {
    pub segment: Segment,
    pub answers: BriefAnswers,
    pub sender: ChatIdentity,
}

/// Raw web-form payload. The segment arrives as an untrusted string and is
/// validated here, not at the HTTP boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SiteSubmission {
    pub segment: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub honeypot: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored(Lead),
    /// Honeypot hit: the submission is dropped without persistence or
    /// notification while the caller reports an ordinary success, so the
    /// sender cannot tell it was detected.
    Discarded,
}

#[derive(Clone)]
pub struct LeadIngestService {
    store: Arc<dyn LeadStore>,
}

impl LeadIngestService {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    pub async fn ingest_bot(&self, submission: BotSubmission) -> Result<Lead, IngestError> {
        let record = NewLead::from_bot(submission.segment, &submission.answers, &submission.sender);
        let id = self.store.insert_lead(&record).await?;
        // Secondary audit row; its failure never disturbs the captured lead.
        let _ = self.store.insert_lead_event(&id, &submission.answers).await;
        Ok(Lead { id, record })
    }

    pub async fn ingest_site(
        &self,
        submission: SiteSubmission,
    ) -> Result<IngestOutcome, IngestError> {
        if submission.honeypot.as_deref().is_some_and(|value| !value.trim().is_empty()) {
            return Ok(IngestOutcome::Discarded);
        }

        let segment = Segment::parse(&submission.segment)
            .ok_or_else(|| IngestError::UnknownSegment(submission.segment.clone()))?;
        let record = NewLead::from_site(
            segment,
            submission.name,
            submission.phone,
            submission.email,
            submission.message,
            submission.utm_source,
            submission.utm_medium,
            submission.utm_campaign,
        );
        let id = self.store.insert_lead(&record).await?;
        Ok(IngestOutcome::Stored(Lead { id, record }))
    }
}

/// In-memory lead store with scripted failures. Backs wiring without a
/// database and the state-machine tests across the workspace.
#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    state: Arc<Mutex<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    leads: Vec<(LeadId, NewLead)>,
    events: Vec<(LeadId, BriefAnswers)>,
    fail_inserts: bool,
    fail_events: bool,
    sequence: u64,
}

impl InMemoryLeadStore {
    pub fn leads(&self) -> Vec<(LeadId, NewLead)> {
        self.lock().leads.clone()
    }

    pub fn events(&self) -> Vec<(LeadId, BriefAnswers)> {
        self.lock().events.clone()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.lock().fail_inserts = fail;
    }

    pub fn fail_events(&self, fail: bool) {
        self.lock().fail_events = fail;
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn insert_lead(&self, record: &NewLead) -> Result<LeadId, StoreError> {
        let mut state = self.lock();
        if state.fail_inserts {
            return Err(StoreError::Unavailable("scripted insert failure".to_owned()));
        }
        state.sequence += 1;
        let id = LeadId(format!("LD-{:04}", state.sequence));
        state.leads.push((id.clone(), record.clone()));
        Ok(id)
    }

    async fn insert_lead_event(
        &self,
        lead_id: &LeadId,
        answers: &BriefAnswers,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_events {
            return Err(StoreError::Rejected("scripted event failure".to_owned()));
        }
        state.events.push((lead_id.clone(), answers.clone()));
        Ok(())
    }
}
