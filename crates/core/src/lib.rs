pub mod config;
pub mod dialogue;
pub mod domain;
pub mod intake;
pub mod notify;
pub mod segment;
pub mod session;

pub use dialogue::{
    advance, ChatEvent, DialogueEngine, MenuKind, Reply, TurnOutcome, TurnReport,
};
pub use domain::lead::{BriefAnswers, ChatId, ChatIdentity, Lead, LeadId, LeadSource, NewLead};
pub use intake::{
    BotSubmission, InMemoryLeadStore, IngestError, IngestOutcome, LeadIngestService, LeadStore,
    SiteSubmission, StoreError,
};
pub use notify::{AlertDetails, LeadAlert, NotifyError, OperatorNotifier, RecordingNotifier};
pub use segment::Segment;
pub use session::{Brief, BriefStep, Session, SessionStore};
