use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::domain::lead::ChatId;
use crate::segment::Segment;

/// Position inside the brief-collection flow. `AwaitingDeadline` is only ever
/// reached with a goal already recorded, and `AwaitingContact` with a deadline
/// recorded; the dialogue engine is the only writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BriefStep {
    #[default]
    None,
    AwaitingGoal,
    AwaitingDeadline,
    AwaitingContact,
}

/// Partially collected brief answers for an in-progress flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Brief {
    pub goal: Option<String>,
    pub deadline: Option<String>,
    pub contact: Option<String>,
}

/// Per-conversation dialogue state. Created lazily on first interaction and
/// kept for the process lifetime; idle sessions have no correctness cost.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub segment: Option<Segment>,
    pub step: BriefStep,
    pub brief: Brief,
}

/// Map of conversation id to session with get-or-create semantics.
///
/// The outer lock guards only map access. Each entry is an async mutex that
/// callers hold for the whole of one event's processing, including the
/// persistence and notification awaits, so events on the same chat are
/// strictly serialized while distinct chats proceed concurrently.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<ChatId, Arc<AsyncMutex<Session>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session cell for a conversation, created with defaults when absent.
    pub fn entry(&self, chat: ChatId) -> Arc<AsyncMutex<Session>> {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(chat).or_default().clone()
    }

    /// Point-in-time copy of a session, mainly for inspection in tests.
    pub async fn snapshot(&self, chat: ChatId) -> Session {
        let cell = self.entry(chat);
        let session = cell.lock().await;
        session.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{BriefStep, Session, SessionStore};
    use crate::domain::lead::ChatId;
    use crate::segment::Segment;

    #[tokio::test]
    async fn entry_creates_a_default_session_once() {
        let store = SessionStore::new();
        let chat = ChatId(7);

        assert_eq!(store.snapshot(chat).await, Session::default());

        {
            let cell = store.entry(chat);
            let mut session = cell.lock().await;
            session.segment = Some(Segment::Event);
            session.step = BriefStep::AwaitingGoal;
        }

        let observed = store.snapshot(chat).await;
        assert_eq!(observed.segment, Some(Segment::Event));
        assert_eq!(observed.step, BriefStep::AwaitingGoal);
    }

    #[tokio::test]
    async fn sessions_are_independent_per_chat() {
        let store = SessionStore::new();

        {
            let cell = store.entry(ChatId(1));
            cell.lock().await.segment = Some(Segment::Business);
        }

        assert_eq!(store.snapshot(ChatId(2)).await, Session::default());
        assert_eq!(store.snapshot(ChatId(1)).await.segment, Some(Segment::Business));
    }
}
