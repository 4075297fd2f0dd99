use std::sync::Arc;

use crate::domain::lead::{BriefAnswers, ChatId, ChatIdentity};
use crate::intake::{BotSubmission, IngestError, LeadIngestService};
use crate::notify::{LeadAlert, NotifyError, OperatorNotifier};
use crate::segment::Segment;
use crate::session::{Brief, BriefStep, Session, SessionStore};

/// One inbound chat interaction, already decoded and validated at the
/// transport boundary. Unknown segment selections never reach this enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Start { segment_hint: Option<Segment> },
    SelectSegment(Segment),
    BackToSegments,
    StartBrief,
    Text(String),
}

/// Menus the flow can ask the boundary to render; the transport decides what
/// a menu looks like on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuKind {
    Segments,
    BriefConfirm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Menu { text: String, menu: MenuKind },
}

/// Brief ready for ingestion. The effective segment falls back to
/// [`Segment::FALLBACK`] when the conversation never picked one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedBrief {
    pub segment: Segment,
    pub answers: BriefAnswers,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    pub replies: Vec<Reply>,
    pub completed: Option<CompletedBrief>,
}

pub const WELCOME_TEXT: &str = "Welcome to the studio.\n\
    I'm the agency's intake assistant: I'll ask a few quick questions and hand \
    your request to our producer personally.";
pub const SEGMENT_MENU_TEXT: &str = "Choose a direction:";
pub const GOAL_PROMPT: &str = "1/3. In one phrase, what do you need (goal / task)?";
pub const DEADLINE_PROMPT: &str = "2/3. Timing: when do you need the result?";
pub const CONTACT_PROMPT: &str = "3/3. Contact: a phone number or @handle, whichever works.";
pub const DONE_TEXT: &str = "Request received ✅ Our producer will contact you personally.";

/// Apply one event to a session. Pure: every side effect happens in
/// [`DialogueEngine::handle_event`] around this function.
pub fn advance(session: &mut Session, event: &ChatEvent) -> TurnOutcome {
    match event {
        ChatEvent::Start { segment_hint } => {
            let mut replies = vec![Reply::Text(WELCOME_TEXT.to_owned())];
            if let Some(segment) = segment_hint {
                session.segment = Some(*segment);
                replies.push(Reply::Text(format!("You picked: {}.", segment.title())));
            }
            replies.push(Reply::Menu {
                text: SEGMENT_MENU_TEXT.to_owned(),
                menu: MenuKind::Segments,
            });
            TurnOutcome { replies, completed: None }
        }
        ChatEvent::SelectSegment(segment) => {
            session.segment = Some(*segment);
            session.step = BriefStep::None;
            session.brief = Brief::default();
            TurnOutcome {
                replies: vec![Reply::Menu {
                    text: format!(
                        "Got it: {}.\nReady to put a request together in 60 seconds?",
                        segment.title()
                    ),
                    menu: MenuKind::BriefConfirm,
                }],
                completed: None,
            }
        }
        ChatEvent::BackToSegments => {
            session.step = BriefStep::None;
            session.brief = Brief::default();
            TurnOutcome {
                replies: vec![Reply::Menu {
                    text: SEGMENT_MENU_TEXT.to_owned(),
                    menu: MenuKind::Segments,
                }],
                completed: None,
            }
        }
        ChatEvent::StartBrief => {
            session.step = BriefStep::AwaitingGoal;
            session.brief = Brief::default();
            TurnOutcome { replies: vec![Reply::Text(GOAL_PROMPT.to_owned())], completed: None }
        }
        ChatEvent::Text(raw) => advance_text(session, raw),
    }
}

fn advance_text(session: &mut Session, raw: &str) -> TurnOutcome {
    let text = raw.trim().to_owned();
    match session.step {
        // Text outside an active flow is not part of any step; ignore it.
        BriefStep::None => TurnOutcome::default(),
        BriefStep::AwaitingGoal => {
            session.brief.goal = Some(text);
            session.step = BriefStep::AwaitingDeadline;
            TurnOutcome { replies: vec![Reply::Text(DEADLINE_PROMPT.to_owned())], completed: None }
        }
        BriefStep::AwaitingDeadline => {
            session.brief.deadline = Some(text);
            session.step = BriefStep::AwaitingContact;
            TurnOutcome { replies: vec![Reply::Text(CONTACT_PROMPT.to_owned())], completed: None }
        }
        BriefStep::AwaitingContact => {
            let answers = BriefAnswers {
                goal: session.brief.goal.take().unwrap_or_default(),
                deadline: session.brief.deadline.take().unwrap_or_default(),
                contact: text,
            };
            session.step = BriefStep::None;
            session.brief = Brief::default();
            let segment = session.segment.unwrap_or(Segment::FALLBACK);
            TurnOutcome {
                replies: vec![Reply::Text(DONE_TEXT.to_owned())],
                completed: Some(CompletedBrief { segment, answers }),
            }
        }
    }
}

/// What happened while handling one event. The boundary decides how to log
/// the faults; the user-facing replies are delivered either way.
#[derive(Clone, Debug, Default)]
pub struct TurnReport {
    pub replies: Vec<Reply>,
    pub persistence_error: Option<IngestError>,
    pub notify_error: Option<NotifyError>,
}

/// Drives the brief-collection flow, one event at a time per conversation.
/// On completion it persists the lead and alerts the operator, in that order;
/// a failed persistence still produces an alert (without an id), because the
/// operator is the fallback of last resort.
pub struct DialogueEngine {
    sessions: SessionStore,
    intake: LeadIngestService,
    notifier: Arc<dyn OperatorNotifier>,
}

impl DialogueEngine {
    pub fn new(
        sessions: SessionStore,
        intake: LeadIngestService,
        notifier: Arc<dyn OperatorNotifier>,
    ) -> Self {
        Self { sessions, intake, notifier }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle_event(
        &self,
        chat: ChatId,
        sender: &ChatIdentity,
        event: ChatEvent,
    ) -> TurnReport {
        let cell = self.sessions.entry(chat);
        // Held across the persistence and notification awaits: two events on
        // the same chat can never interleave session mutations.
        let mut session = cell.lock().await;
        let TurnOutcome { replies, completed } = advance(&mut session, &event);
        let mut report = TurnReport { replies, ..TurnReport::default() };

        if let Some(done) = completed {
            let submission = BotSubmission {
                segment: done.segment,
                answers: done.answers.clone(),
                sender: sender.clone(),
            };
            let lead_id = match self.intake.ingest_bot(submission).await {
                Ok(lead) => Some(lead.id),
                Err(error) => {
                    report.persistence_error = Some(error);
                    None
                }
            };
            let alert = LeadAlert::from_bot(done.segment, &done.answers, sender, lead_id);
            if let Err(error) = self.notifier.notify(&alert).await {
                report.notify_error = Some(error);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{
        advance, ChatEvent, DialogueEngine, MenuKind, Reply, CONTACT_PROMPT, DEADLINE_PROMPT,
        DONE_TEXT, GOAL_PROMPT, SEGMENT_MENU_TEXT,
    };
    use crate::domain::lead::{BriefAnswers, ChatId, ChatIdentity, LeadId, NewLead};
    use crate::intake::{InMemoryLeadStore, LeadIngestService, LeadStore, StoreError};
    use crate::notify::{LeadAlert, NotifyError, OperatorNotifier, RecordingNotifier};
    use crate::segment::Segment;
    use crate::session::{BriefStep, Session, SessionStore};

    fn sender() -> ChatIdentity {
        ChatIdentity {
            user_id: 42,
            first_name: Some("Alice".to_owned()),
            username: Some("alice".to_owned()),
        }
    }

    fn engine_with(
        store: InMemoryLeadStore,
        notifier: RecordingNotifier,
    ) -> DialogueEngine {
        DialogueEngine::new(
            SessionStore::new(),
            LeadIngestService::new(Arc::new(store)),
            Arc::new(notifier),
        )
    }

    fn text(value: &str) -> ChatEvent {
        ChatEvent::Text(value.to_owned())
    }

    #[test]
    fn start_without_hint_greets_and_shows_segment_menu() {
        let mut session = Session::default();

        let outcome = advance(&mut session, &ChatEvent::Start { segment_hint: None });

        assert_eq!(outcome.replies.len(), 2);
        assert!(matches!(
            &outcome.replies[1],
            Reply::Menu { text, menu: MenuKind::Segments } if text == SEGMENT_MENU_TEXT
        ));
        assert_eq!(session.segment, None);
    }

    #[test]
    fn start_with_valid_hint_preselects_segment_and_confirms() {
        let mut session = Session::default();

        let outcome = advance(
            &mut session,
            &ChatEvent::Start { segment_hint: Some(Segment::Event) },
        );

        assert_eq!(session.segment, Some(Segment::Event));
        assert_eq!(outcome.replies.len(), 3);
        assert!(matches!(
            &outcome.replies[1],
            Reply::Text(text) if text.contains("Event")
        ));
    }

    #[test]
    fn step_sequence_is_a_prefix_of_the_canonical_order() {
        let mut session = Session::default();
        let events = [
            ChatEvent::SelectSegment(Segment::Business),
            ChatEvent::StartBrief,
            text("launch site"),
            text("next month"),
            text("+1000"),
        ];
        let mut observed = vec![session.step];

        for event in &events {
            advance(&mut session, event);
            observed.push(session.step);
        }

        assert_eq!(
            observed,
            vec![
                BriefStep::None,
                BriefStep::None,
                BriefStep::AwaitingGoal,
                BriefStep::AwaitingDeadline,
                BriefStep::AwaitingContact,
                BriefStep::None,
            ]
        );
    }

    #[test]
    fn brief_prompts_follow_the_one_to_three_numbering() {
        let mut session = Session::default();

        let first = advance(&mut session, &ChatEvent::StartBrief);
        let second = advance(&mut session, &text("goal"));
        let third = advance(&mut session, &text("deadline"));
        let done = advance(&mut session, &text("contact"));

        assert_eq!(first.replies, vec![Reply::Text(GOAL_PROMPT.to_owned())]);
        assert_eq!(second.replies, vec![Reply::Text(DEADLINE_PROMPT.to_owned())]);
        assert_eq!(third.replies, vec![Reply::Text(CONTACT_PROMPT.to_owned())]);
        assert_eq!(done.replies, vec![Reply::Text(DONE_TEXT.to_owned())]);
    }

    #[test]
    fn text_outside_a_flow_is_ignored_entirely() {
        let mut session = Session { segment: Some(Segment::Business), ..Session::default() };
        let before = session.clone();

        let outcome = advance(&mut session, &text("stray message"));

        assert!(outcome.replies.is_empty());
        assert!(outcome.completed.is_none());
        assert_eq!(session, before);
    }

    #[test]
    fn answers_are_trimmed_and_empty_answers_are_accepted() {
        let mut session = Session::default();
        advance(&mut session, &ChatEvent::StartBrief);
        advance(&mut session, &text("  launch site  "));
        advance(&mut session, &text("   "));
        let done = advance(&mut session, &text(" @alice "));

        let completed = done.completed.expect("flow must complete");
        assert_eq!(completed.answers.goal, "launch site");
        assert_eq!(completed.answers.deadline, "");
        assert_eq!(completed.answers.contact, "@alice");
    }

    #[test]
    fn completion_without_segment_falls_back_to_specialist() {
        let mut session = Session::default();
        advance(&mut session, &ChatEvent::StartBrief);
        advance(&mut session, &text("goal"));
        advance(&mut session, &text("deadline"));

        let done = advance(&mut session, &text("contact"));

        assert_eq!(done.completed.expect("completed").segment, Segment::Specialist);
    }

    #[test]
    fn completion_clears_the_brief_but_keeps_the_segment() {
        let mut session = Session::default();
        advance(&mut session, &ChatEvent::SelectSegment(Segment::Teambuilding));
        advance(&mut session, &ChatEvent::StartBrief);
        advance(&mut session, &text("goal"));
        advance(&mut session, &text("deadline"));
        advance(&mut session, &text("contact"));

        assert_eq!(session.step, BriefStep::None);
        assert_eq!(session.brief, crate::session::Brief::default());
        assert_eq!(session.segment, Some(Segment::Teambuilding));
    }

    #[test]
    fn back_navigation_resets_the_flow_mid_brief() {
        let mut session = Session::default();
        advance(&mut session, &ChatEvent::SelectSegment(Segment::Event));
        advance(&mut session, &ChatEvent::StartBrief);
        advance(&mut session, &text("half an answer"));

        let outcome = advance(&mut session, &ChatEvent::BackToSegments);

        assert_eq!(session.step, BriefStep::None);
        assert_eq!(session.brief, crate::session::Brief::default());
        assert_eq!(session.segment, Some(Segment::Event), "segment is retained");
        assert!(matches!(
            &outcome.replies[0],
            Reply::Menu { menu: MenuKind::Segments, .. }
        ));
    }

    #[tokio::test]
    async fn completed_flow_persists_one_lead_and_sends_one_alert() {
        let store = InMemoryLeadStore::default();
        let notifier = RecordingNotifier::default();
        let engine = engine_with(store.clone(), notifier.clone());
        let chat = ChatId(1);
        let sender = sender();

        engine
            .handle_event(chat, &sender, ChatEvent::SelectSegment(Segment::Business))
            .await;
        engine.handle_event(chat, &sender, ChatEvent::StartBrief).await;
        engine.handle_event(chat, &sender, text("launch site")).await;
        engine.handle_event(chat, &sender, text("next month")).await;
        let report = engine.handle_event(chat, &sender, text("+1000")).await;

        assert!(report.persistence_error.is_none());
        assert!(report.notify_error.is_none());

        let leads = store.leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].1.segment, Segment::Business);
        assert_eq!(
            leads[0].1.note.as_deref(),
            Some("goal: launch site\ndeadline: next month\ncontact: +1000")
        );

        let alerts = notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].lead_id.as_ref(), Some(&leads[0].0));
        assert!(alerts[0].render().contains("Business"));
    }

    #[tokio::test]
    async fn text_outside_a_flow_triggers_no_persistence_or_alert() {
        let store = InMemoryLeadStore::default();
        let notifier = RecordingNotifier::default();
        let engine = engine_with(store.clone(), notifier.clone());

        let report = engine.handle_event(ChatId(1), &sender(), text("hello there")).await;

        assert!(report.replies.is_empty());
        assert!(store.leads().is_empty());
        assert!(notifier.alerts().is_empty());
    }

    /// Store/notifier pair sharing one journal, to observe call ordering.
    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<&'static str>>>);

    impl Journal {
        fn entries(&self) -> Vec<&'static str> {
            self.0.lock().expect("journal lock").clone()
        }

        fn record(&self, entry: &'static str) {
            self.0.lock().expect("journal lock").push(entry);
        }
    }

    struct JournalingStore {
        journal: Journal,
        fail: bool,
    }

    #[async_trait]
    impl LeadStore for JournalingStore {
        async fn insert_lead(&self, _record: &NewLead) -> Result<LeadId, StoreError> {
            self.journal.record("persist");
            if self.fail {
                return Err(StoreError::Unavailable("down".to_owned()));
            }
            Ok(LeadId("LD-0001".to_owned()))
        }

        async fn insert_lead_event(
            &self,
            _lead_id: &LeadId,
            _answers: &BriefAnswers,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct JournalingNotifier {
        journal: Journal,
    }

    #[async_trait]
    impl OperatorNotifier for JournalingNotifier {
        async fn notify(&self, _alert: &LeadAlert) -> Result<(), NotifyError> {
            self.journal.record("notify");
            Ok(())
        }
    }

    async fn run_flow_to_completion(engine: &DialogueEngine, chat: ChatId) {
        let sender = sender();
        engine.handle_event(chat, &sender, ChatEvent::StartBrief).await;
        engine.handle_event(chat, &sender, text("goal")).await;
        engine.handle_event(chat, &sender, text("deadline")).await;
        engine.handle_event(chat, &sender, text("contact")).await;
    }

    #[tokio::test]
    async fn completion_persists_before_notifying() {
        let journal = Journal::default();
        let engine = DialogueEngine::new(
            SessionStore::new(),
            LeadIngestService::new(Arc::new(JournalingStore {
                journal: journal.clone(),
                fail: false,
            })),
            Arc::new(JournalingNotifier { journal: journal.clone() }),
        );

        run_flow_to_completion(&engine, ChatId(1)).await;

        assert_eq!(journal.entries(), vec!["persist", "notify"]);
    }

    #[tokio::test]
    async fn failed_persistence_still_notifies_without_an_id() {
        let journal = Journal::default();
        let engine = DialogueEngine::new(
            SessionStore::new(),
            LeadIngestService::new(Arc::new(JournalingStore {
                journal: journal.clone(),
                fail: true,
            })),
            Arc::new(JournalingNotifier { journal: journal.clone() }),
        );
        let sender = sender();
        let chat = ChatId(1);

        engine.handle_event(chat, &sender, ChatEvent::StartBrief).await;
        engine.handle_event(chat, &sender, text("goal")).await;
        engine.handle_event(chat, &sender, text("deadline")).await;
        let report = engine.handle_event(chat, &sender, text("contact")).await;

        assert_eq!(journal.entries(), vec!["persist", "notify"]);
        assert!(report.persistence_error.is_some());
        assert!(report.notify_error.is_none());
        assert_eq!(report.replies, vec![Reply::Text(DONE_TEXT.to_owned())]);
    }

    #[tokio::test]
    async fn failed_persistence_alert_has_no_lead_id() {
        let store = InMemoryLeadStore::default();
        store.fail_inserts(true);
        let notifier = RecordingNotifier::default();
        let engine = engine_with(store, notifier.clone());

        run_flow_to_completion(&engine, ChatId(5)).await;

        let alerts = notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].lead_id.is_none());
    }

    #[tokio::test]
    async fn notify_failure_is_reported_but_replies_survive() {
        let store = InMemoryLeadStore::default();
        let notifier = RecordingNotifier::default();
        notifier.fail_deliveries(true);
        let engine = engine_with(store.clone(), notifier);
        let sender = sender();
        let chat = ChatId(3);

        engine.handle_event(chat, &sender, ChatEvent::StartBrief).await;
        engine.handle_event(chat, &sender, text("goal")).await;
        engine.handle_event(chat, &sender, text("deadline")).await;
        let report = engine.handle_event(chat, &sender, text("contact")).await;

        assert!(report.notify_error.is_some());
        assert_eq!(store.leads().len(), 1, "the lead is persisted regardless");
        assert_eq!(report.replies, vec![Reply::Text(DONE_TEXT.to_owned())]);
    }

    #[tokio::test]
    async fn concurrent_completions_on_distinct_chats_never_cross_write() {
        let store = InMemoryLeadStore::default();
        let notifier = RecordingNotifier::default();
        let engine = Arc::new(engine_with(store.clone(), notifier));
        let sender = sender();

        for (chat, goal) in [(ChatId(1), "site for alice"), (ChatId(2), "site for bob")] {
            engine.handle_event(chat, &sender, ChatEvent::StartBrief).await;
            engine.handle_event(chat, &sender, text(goal)).await;
            engine.handle_event(chat, &sender, text("soon")).await;
        }

        let first = {
            let engine = engine.clone();
            let sender = sender.clone();
            tokio::spawn(async move {
                engine.handle_event(ChatId(1), &sender, text("contact-one")).await
            })
        };
        let second = {
            let engine = engine.clone();
            let sender = sender.clone();
            tokio::spawn(async move {
                engine.handle_event(ChatId(2), &sender, text("contact-two")).await
            })
        };
        first.await.expect("task one");
        second.await.expect("task two");

        let mut notes: Vec<String> =
            store.leads().into_iter().filter_map(|(_, lead)| lead.note).collect();
        notes.sort();
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("site for alice") && notes[0].contains("contact-one"));
        assert!(notes[1].contains("site for bob") && notes[1].contains("contact-two"));
    }
}
